//! Shared domain types for the monthly clip progress report.
//!
//! Holds the record and ID models, the error taxonomy, settings, session
//! values and the lenient conversion and formatting helpers used by every
//! other clip crate.

pub mod conversions;
pub mod error;
pub mod formatting;
pub mod models;
pub mod session;
pub mod settings;

pub use error::{ReportError, Result};
