//! Archive exclusion patterns
//!
//! A path is excluded when its basename or any segment of its path relative
//! to the project root matches one of the globs.

use crate::core::error::{ConfigError, ReleaseResult};
use glob::Pattern;
use std::path::Path;

/// Patterns that always apply
pub const DEFAULT_PATTERNS: &[&str] = &[
  "Updates",
  "update.config",
  "update.log",
  "*.code-workspace",
  "*.bak",
  "composer.lock",
  "Thumbs.db",
  ".DS_Store",
];

#[derive(Debug, Clone)]
pub struct ExclusionSet {
  patterns: Vec<Pattern>,
}

impl ExclusionSet {
  /// Built-in defaults followed by `extra`; an invalid glob is a config error
  pub fn new<S: AsRef<str>>(extra: &[S]) -> ReleaseResult<Self> {
    let mut patterns = Vec::with_capacity(DEFAULT_PATTERNS.len() + extra.len());
    for raw in DEFAULT_PATTERNS.iter().copied().chain(extra.iter().map(AsRef::as_ref)) {
      let pattern = Pattern::new(raw).map_err(|e| ConfigError::InvalidPattern {
        pattern: raw.to_string(),
        reason: e.msg.to_string(),
      })?;
      patterns.push(pattern);
    }
    Ok(Self { patterns })
  }

  /// Pattern strings in match order
  pub fn patterns(&self) -> impl Iterator<Item = &str> {
    self.patterns.iter().map(Pattern::as_str)
  }

  /// Whether a path relative to the project root is excluded
  pub fn is_excluded(&self, relative: &Path) -> bool {
    relative.components().any(|segment| {
      let segment = segment.as_os_str().to_string_lossy();
      self.patterns.iter().any(|p| p.matches(&segment))
    })
  }
}
