//! End-to-end tests driving the compiled plugin-release binary

mod helpers;
mod test_changelog;
mod test_config;
mod test_release;
