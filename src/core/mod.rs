//! Core building blocks shared by every stage
//!
//! - **config**: update.config loading, defaults and validation
//! - **context**: release context built once and passed to every stage
//! - **error**: error types with contextual help messages and exit codes
//! - **version**: dotted-numeric version comparison

pub mod config;
pub mod context;
pub mod error;
pub mod version;
