//! Plugin source handling
//!
//! - **extract**: version declarations and the winning version
//! - **patch**: in-place rewrite of versions, `Last-Update:` and the update-checker call
//! - **edit**: byte-span splicing shared by the patcher

pub mod edit;
pub mod extract;
pub mod patch;
