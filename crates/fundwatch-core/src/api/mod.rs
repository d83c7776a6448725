//! REST client module for the fund portal.
//!
//! `HttpClient` is a thin verb layer over one base URL. `PortalApi` adds
//! `Authorization: Token <token>` headers obtained through the
//! `LoginManager` and classifies failures into an `Outcome`.

pub mod client;
pub mod error;
pub mod portal;

pub use client::{Body, HttpClient, RequestOptions};
pub use error::ApiError;
pub use portal::{Outcome, PortalApi};
