//! Data layer for the monthly clip progress report.
//!
//! Parses viewing records, collects the IDs that need names, aggregates
//! records per month and renders the final CSV report.

pub mod aggregator;
pub mod ids;
pub mod reader;
pub mod report;

pub use clip_core as core;
