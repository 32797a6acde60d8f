//! opsreport-core - Core library for the opsreport CLI
//!
//! This crate provides shared functionality for:
//! - Configuration and credential-profile enumeration
//! - Error handling and SDK error classification
//! - Resilient calls with exponential backoff
//! - Bounded fan-out over profile/region tasks
//! - Report rows and CSV/workbook writers
//! - One module per operational report

pub mod aws;
pub mod config;
pub mod error;
pub mod export;
pub mod fanout;
pub mod profiles;
pub mod reports;
pub mod retry;
pub mod rows;
pub mod utils;

// Re-exports for convenience
pub use config::AppConfig;
pub use error::{ReportError, Result};
pub use export::WrittenReport;
pub use fanout::{collect_rows, DispatchDelay, FanoutOptions, FanoutOutcome, TaskKey};
pub use retry::{with_backoff, RetryPolicy};
pub use rows::{Row, MISSING};
