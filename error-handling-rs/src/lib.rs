//! # Error Handling
//!
//! Shared error plumbing for the API quality pipeline:
//!
//! - Standardized error type with kinds for the ambient layer
//! - Structured logging initialization (text or JSON, optional rolling file)
//! - The fail-soft wrapper every external dependency is called through
//!

pub mod fail_soft;
pub mod logging;
pub mod types;

pub use fail_soft::{FailSoft, FailSoftResult};
pub use logging::{init_logging, LoggingConfig};
pub use types::{Error, ErrorKind, Result};
