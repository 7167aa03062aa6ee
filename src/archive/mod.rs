//! Release archive assembly
//!
//! - **exclude**: built-in and configured exclusion globs
//! - **builder**: deterministic zip writer with SHA-256 digest

pub mod builder;
pub mod exclude;

pub use builder::{ArchiveBuilder, ArchiveSummary};
pub use exclude::ExclusionSet;
