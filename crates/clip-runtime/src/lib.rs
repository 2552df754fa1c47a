//! Runtime layer for the monthly clip progress report.
//!
//! Wires the parser, aggregator, resolver and formatter into one pipeline
//! run per user action, and sets up logging for the host application.

pub mod artifact;
pub mod bootstrap;
pub mod pipeline;

pub use artifact::{ReportArtifact, RunStats};
pub use clip_core as core;
pub use clip_data as data;
pub use clip_remote as remote;
pub use pipeline::{HttpReportPipeline, ReportInput, ReportPipeline};
