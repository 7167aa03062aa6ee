//! Best-effort side stages
//!
//! Failures here are logged by the caller and never stop a release.

pub mod changelog;
pub mod images;
pub mod vcs;
