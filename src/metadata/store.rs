//! Load, reconcile and persist the update descriptor
//!
//! The descriptor is read twice: once into an open JSON map that keeps every
//! key, and once into the typed [`ReleaseMetadata`] view. On persist the typed
//! view is overlaid onto the open map, so keys unknown to the schema pass
//! through untouched while known fields always win.

use crate::core::error::{DescriptorError, ReleaseResult};
use crate::core::version::VersionPolicy;
use crate::metadata::model::ReleaseMetadata;
use crate::utils::replace_with_backup;
use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub struct MetadataStore {
  path: PathBuf,
  raw: Map<String, Value>,
  /// Bytes last read from or written to disk
  on_disk: Vec<u8>,
  pub metadata: ReleaseMetadata,
}

impl MetadataStore {
  /// Read the descriptor at `path`
  pub fn load(path: &Path) -> ReleaseResult<Self> {
    let bytes = fs::read(path).map_err(|e| match e.kind() {
      io::ErrorKind::NotFound => DescriptorError::Missing { path: path.to_path_buf() },
      _ => DescriptorError::Unreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
      },
    })?;

    let raw: Map<String, Value> = serde_json::from_slice(&bytes).map_err(|e| DescriptorError::Malformed {
      path: path.to_path_buf(),
      reason: e.to_string(),
    })?;

    let metadata: ReleaseMetadata = serde_json::from_slice(&bytes).map_err(|e| DescriptorError::SchemaMismatch {
      path: path.to_path_buf(),
      reason: e.to_string(),
    })?;

    Ok(Self {
      path: path.to_path_buf(),
      raw,
      on_disk: bytes,
      metadata,
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Raise the descriptor version to `winner` when it is strictly lower
  ///
  /// Returns whether anything changed. `timestamp` becomes `last_updated`
  /// only together with a version change.
  pub fn reconcile(&mut self, winner: &str, timestamp: &str, policy: VersionPolicy) -> bool {
    let current = self.metadata.version.as_str();
    if current == winner || policy.higher(current, winner) != winner {
      return false;
    }
    self.metadata.version = winner.to_string();
    self.metadata.last_updated = timestamp.to_string();
    true
  }

  /// Serialized document: typed view overlaid on the open map
  pub fn render(&self) -> ReleaseResult<Vec<u8>> {
    let mut merged = self.raw.clone();
    if let Value::Object(typed) = serde_json::to_value(&self.metadata)? {
      merged.extend(typed);
    }

    let mut out = serde_json::to_vec_pretty(&Value::Object(merged))?;
    out.push(b'\n');
    Ok(out)
  }

  /// Write the document if it differs from the file on disk
  ///
  /// The previous file is kept as `<file>.bak`. Returns the backup path, or
  /// `None` when the content was unchanged and nothing was written.
  pub fn persist(&mut self) -> ReleaseResult<Option<PathBuf>> {
    let rendered = self.render()?;
    if rendered == self.on_disk {
      return Ok(None);
    }

    let backup = replace_with_backup(&self.path, &rendered).map_err(|e| DescriptorError::WriteFailed {
      path: self.path.clone(),
      reason: e.to_string(),
    })?;

    if let Value::Object(map) = serde_json::from_slice(&rendered)? {
      self.raw = map;
    }
    self.on_disk = rendered;
    Ok(Some(backup))
  }
}
