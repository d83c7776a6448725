//! Utility functions for HTML extraction and string formatting.

pub mod format;
pub mod html;

// Re-export commonly used functions at module level
pub use format::{parse_amount, truncate_string};
pub use html::{elements, Element};
