//! Progress indicators for long-running operations
//!
//! Uses `linya` for allocation-free progress bars. Bars are drawn on stderr and
//! only when stderr is a terminal, so redirected runs and tests stay clean.

use linya::{Bar, Progress};
use std::io::IsTerminal;

/// Progress bar for per-file work such as archive writing
pub struct FileProgress {
  inner: Option<(Progress, Bar)>,
}

impl FileProgress {
  /// Create a new progress bar; hidden when stderr is not a terminal
  pub fn new(total: usize, label: impl Into<String>) -> Self {
    if total == 0 || !std::io::stderr().is_terminal() {
      return Self::hidden();
    }
    let mut progress = Progress::new();
    let bar = progress.bar(total, label.into());
    Self {
      inner: Some((progress, bar)),
    }
  }

  /// A bar that never draws
  pub fn hidden() -> Self {
    Self { inner: None }
  }

  /// Increment progress by 1
  pub fn inc(&mut self) {
    if let Some((progress, bar)) = &mut self.inner {
      progress.inc_and_draw(bar, 1);
    }
  }
}
