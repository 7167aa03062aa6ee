//! Release context - build once, pass everywhere
//!
//! Holds everything the stages share: the working directory, the loaded
//! configuration, the run log and the CLI switches. Built once in `main.rs`
//! and passed by reference.

use crate::core::config::{LOG_FILE, LoadedConfig, ReleaseConfig};
use crate::core::error::{ConfigError, ReleaseError, ReleaseResult, log_error};
use crate::ui::log::RunLog;
use std::path::{Path, PathBuf};

/// Directory holding the descriptor, archives and image assets
pub const UPDATES_DIR: &str = "Updates";

/// Descriptor file name inside [`UPDATES_DIR`]
pub const DESCRIPTOR_FILE: &str = "update_info.json";

/// Stage switches from the command line
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
  pub upload: bool,
  pub changelog: bool,
  pub images: bool,
  pub git: bool,
  /// Pre-approve the git bookkeeping prompt
  pub assume_yes: bool,
}

impl RunOptions {
  /// Every stage enabled, nothing pre-approved
  pub fn all() -> Self {
    Self {
      upload: true,
      changelog: true,
      images: true,
      git: true,
      assume_yes: false,
    }
  }
}

/// Shared state of one release run
pub struct ReleaseContext {
  /// Plugin working directory (absolute path)
  pub root: PathBuf,

  /// Loaded update.config
  pub config: ReleaseConfig,

  /// Progress sink (stdout + update.log)
  pub log: RunLog,

  pub options: RunOptions,
}

impl ReleaseContext {
  /// Build the context for a working directory
  ///
  /// Fails when the directory or its update.config is missing. Unknown config
  /// keys and the redacted config summary go to the run log.
  pub fn build(work_dir: &Path, options: RunOptions) -> ReleaseResult<Self> {
    if !work_dir.is_dir() {
      return Err(ReleaseError::Config(ConfigError::WorkDirMissing {
        path: work_dir.to_path_buf(),
      }));
    }
    let root = work_dir.canonicalize()?;
    let log = RunLog::new(root.join(LOG_FILE));
    Self::with_log(root, options, log)
  }

  /// Build the context with an explicit log sink
  pub fn with_log(root: PathBuf, options: RunOptions, log: RunLog) -> ReleaseResult<Self> {
    let LoadedConfig {
      config,
      path,
      unknown_keys,
    } = ReleaseConfig::load(&root).inspect_err(|err| log_error(&log, err))?;

    log.detail(format!("Config loaded from {}", path.display()));
    for key in &unknown_keys {
      log.warn(format!("Unknown config key '{}' ignored", key));
    }
    for (key, value) in config.redacted_summary() {
      log.detail(format!("  {} = {}", key, value));
    }

    Ok(Self {
      root,
      config,
      log,
      options,
    })
  }

  /// Path of the main plugin source file
  pub fn main_file(&self) -> PathBuf {
    self.root.join(&self.config.main_php_file)
  }

  /// Path of the Updates directory
  pub fn updates_dir(&self) -> PathBuf {
    self.root.join(UPDATES_DIR)
  }

  /// Path of the update descriptor
  pub fn descriptor_path(&self) -> PathBuf {
    self.updates_dir().join(DESCRIPTOR_FILE)
  }
}
