//! Data models for fund reporting.
//!
//! - `FundSource`, `UserData`, `FundRecord`: local report inputs and output
//! - `FundTarget`, `Receiver`, `ReceiverTarget`: portal resources

pub mod fund;
pub mod receiver;

pub use fund::{FundRecord, FundSource, FundTarget, UserData};
pub use receiver::{Receiver, ReceiverTarget};
