//! Core library for fundwatch.
//!
//! - `api`: HTTP verb client and the token-authenticated portal client
//! - `auth`: cached portal token and login
//! - `cache`: in-process fund target cache
//! - `config`: settings loaded once at startup
//! - `scraper`: latest net worth from fund quote pages
//! - `report`: daily dividend records
//! - `notify`, `receivers`: chat notifications to portal receivers

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod models;
pub mod notify;
pub mod receivers;
pub mod report;
pub mod scraper;
pub mod utils;

pub use api::{ApiError, Outcome, PortalApi};
pub use config::Config;
