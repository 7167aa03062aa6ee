//! Run log: console progress lines mirrored into update.log
//!
//! There is no global logger. `main` creates one [`RunLog`] and it travels
//! inside the release context to every stage.

use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Severity tag written in front of every log-file line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
  Info,
  Warn,
  Error,
  Detail,
}

impl Level {
  fn tag(self) -> &'static str {
    match self {
      Level::Info => "INFO",
      Level::Warn => "WARN",
      Level::Error => "ERROR",
      Level::Detail => "DETAIL",
    }
  }
}

/// Progress sink for one release run
#[derive(Debug, Clone)]
pub struct RunLog {
  file: Option<PathBuf>,
  console: bool,
}

impl RunLog {
  /// Log to stdout and append to `path`
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      file: Some(path.into()),
      console: true,
    }
  }

  /// Log to the file only (`Some`) or nowhere (`None`)
  pub fn sink(path: Option<&Path>) -> Self {
    Self {
      file: path.map(Path::to_path_buf),
      console: false,
    }
  }

  /// Path of the log file, if any
  pub fn path(&self) -> Option<&Path> {
    self.file.as_deref()
  }

  pub fn info(&self, message: impl AsRef<str>) {
    let message = message.as_ref();
    if self.console {
      println!("{}", message);
    }
    self.append(Level::Info, message);
  }

  pub fn warn(&self, message: impl AsRef<str>) {
    let message = message.as_ref();
    if self.console {
      println!("⚠️  {}", message);
    }
    self.append(Level::Warn, message);
  }

  /// Record an error; console rendering is left to `print_error`
  pub fn error(&self, message: impl AsRef<str>) {
    self.append(Level::Error, message.as_ref());
  }

  /// File-only line (per-file and per-command detail)
  pub fn detail(&self, message: impl AsRef<str>) {
    self.append(Level::Detail, message.as_ref());
  }

  fn append(&self, level: Level, message: &str) {
    let Some(path) = &self.file else {
      return;
    };

    let mut options = OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    {
      use std::os::unix::fs::OpenOptionsExt;
      options.mode(0o600);
    }

    // A log that cannot be written must never break the release itself
    if let Ok(mut file) = options.open(path) {
      let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
      for line in message.lines() {
        let _ = writeln!(file, "[{}] {:<6} {}", timestamp, level.tag(), line);
      }
    }
  }
}
