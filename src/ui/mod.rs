//! User-facing output: the run log and progress bars

pub mod log;
pub mod progress;
