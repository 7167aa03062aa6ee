//! Update descriptor (Updates/update_info.json)
//!
//! - **model**: typed view of the known fields plus naming helpers
//! - **store**: load / reconcile / persist with unknown-key preservation
//! - **sections**: changelog text to descriptor HTML and back

pub mod model;
pub mod sections;
pub mod store;
