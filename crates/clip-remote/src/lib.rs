//! Remote collaborators for the clip progress report.
//!
//! Back-office authentication, the progress record source, the metadata
//! service and the resolver that turns IDs into names. Every authenticated
//! call takes an explicit [`clip_core::session::Session`].

pub mod auth;
pub mod http;
pub mod metadata;
pub mod resolver;
pub mod source;

pub use clip_core as core;
