//! In-process caching of portal data.
//!
//! `FundTargetCache` memoises the portal's fund targets for the lifetime of
//! one run. The caller owns it and passes it to whatever needs lookups.

pub mod manager;

pub use manager::FundTargetCache;
