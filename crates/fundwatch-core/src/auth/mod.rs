//! Portal authentication: token cache and login.
//!
//! This module provides:
//! - `CredentialCache`: the single cached token in `<cache_dir>/portal.json`
//! - `LoginManager`: returns the cached token or logs in for a new one
//!
//! Tokens are reused for one week after the login that issued them.

pub mod login;
pub mod session;

pub use login::{LoginCredentials, LoginManager, TokenOrigin};
pub use session::{Credential, CredentialCache};
