//! CLI commands for plugin-release
//!
//! - **release**: extract, patch, archive, persist and publish one plugin
//!   release, then run the optional side stages

pub mod release;

pub use release::run_release;
