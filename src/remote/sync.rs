//! Skip-if-current upload of release artifacts
//!
//! A file is transferred unless the remote copy exists and is not older than
//! the local one. Secondary image assets are best effort: a malformed URL or a
//! missing local file only produces a warning for that entry.

use crate::core::error::ReleaseResult;
use crate::remote::target::{RemoteTarget, url_file_name};
use crate::ui::log::RunLog;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;
use std::time::SystemTime;

/// Move bytes to a named remote path and query its modification time
pub trait RemoteBackend {
  /// Modification time of a remote file, `None` when it does not exist
  fn modified(&mut self, path: &str) -> ReleaseResult<Option<SystemTime>>;

  /// Create a remote directory and its parents
  fn ensure_dir(&mut self, dir: &str) -> ReleaseResult<()>;

  /// Stream `reader` into a remote file; returns the bytes written
  fn put(&mut self, path: &str, reader: &mut dyn Read) -> ReleaseResult<u64>;
}

impl<B: RemoteBackend + ?Sized> RemoteBackend for Box<B> {
  fn modified(&mut self, path: &str) -> ReleaseResult<Option<SystemTime>> {
    (**self).modified(path)
  }

  fn ensure_dir(&mut self, dir: &str) -> ReleaseResult<()> {
    (**self).ensure_dir(dir)
  }

  fn put(&mut self, path: &str, reader: &mut dyn Read) -> ReleaseResult<u64> {
    (**self).put(path, reader)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
  Uploaded { bytes: u64 },
  /// The remote copy is not older than the local file
  Current,
}

/// Per-asset result of [`RemoteSync::upload_assets`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetOutcome {
  Uploaded(UploadOutcome),
  InvalidUrl,
  MissingLocal,
}

pub struct RemoteSync<'a, B: RemoteBackend> {
  backend: B,
  target: RemoteTarget,
  log: &'a RunLog,
}

impl<'a, B: RemoteBackend> RemoteSync<'a, B> {
  pub fn new(backend: B, target: RemoteTarget, log: &'a RunLog) -> Self {
    Self { backend, target, log }
  }

  /// Create the target directory; failure is logged, not returned
  pub fn prepare(&mut self) {
    if self.target.dir.is_empty() {
      return;
    }
    match self.backend.ensure_dir(&self.target.dir) {
      Ok(()) => self.log.detail(format!("remote directory ready: {}", self.target.dir)),
      Err(e) => self.log.warn(format!("Could not create remote directory {}: {}", self.target.dir, e)),
    }
  }

  /// Upload a local file into the target directory under its own name
  pub fn upload(&mut self, local: &Path) -> ReleaseResult<UploadOutcome> {
    let name = local
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_default();
    self.upload_as(local, &name)
  }

  /// Upload a local file into the target directory as `name`
  pub fn upload_as(&mut self, local: &Path, name: &str) -> ReleaseResult<UploadOutcome> {
    let remote = self.target.file(name);
    let local_modified = fs::metadata(local)?.modified()?;

    let remote_modified = match self.backend.modified(&remote) {
      Ok(modified) => modified,
      Err(e) => {
        self.log.warn(format!("Could not check {} on the server ({}); uploading", remote, e));
        None
      }
    };

    if let Some(remote_modified) = remote_modified
      && local_modified <= remote_modified
    {
      self.log.info(format!("⏭️  {} is already current on the server", name));
      return Ok(UploadOutcome::Current);
    }

    self.log.detail(format!("uploading {} -> {}", local.display(), remote));
    let mut file = File::open(local)?;
    let bytes = self.backend.put(&remote, &mut file)?;
    self.log.info(format!("⬆️  Uploaded {} ({} bytes)", name, bytes));
    Ok(UploadOutcome::Uploaded { bytes })
  }

  /// Upload banner/icon assets found next to the descriptor
  ///
  /// `assets` holds `(label, url)` pairs. Each URL must be well formed and its
  /// file name must exist in `local_dir`; otherwise the entry is skipped with a
  /// warning. Transfer errors are returned.
  pub fn upload_assets(
    &mut self,
    assets: &[(String, String)],
    local_dir: &Path,
  ) -> ReleaseResult<Vec<(String, AssetOutcome)>> {
    let mut results = Vec::with_capacity(assets.len());

    for (label, url) in assets {
      let Some(name) = url_file_name(url) else {
        self.log.warn(format!("{}: '{}' is not a valid URL, skipped", label, url));
        results.push((label.clone(), AssetOutcome::InvalidUrl));
        continue;
      };

      let local = local_dir.join(&name);
      if !local.is_file() {
        self.log.warn(format!("{}: {} not found, skipped", label, local.display()));
        results.push((label.clone(), AssetOutcome::MissingLocal));
        continue;
      }

      let outcome = self.upload_as(&local, &name)?;
      results.push((label.clone(), AssetOutcome::Uploaded(outcome)));
    }

    Ok(results)
  }
}
