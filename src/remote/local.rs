//! Filesystem backend
//!
//! Used for `transport = "local"`: the "server" directory is a path on this
//! machine, for example a mounted share or a staging tree.

use crate::core::error::ReleaseResult;
use crate::remote::sync::RemoteBackend;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;
use std::time::SystemTime;

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalBackend;

impl RemoteBackend for LocalBackend {
  fn modified(&mut self, path: &str) -> ReleaseResult<Option<SystemTime>> {
    match fs::metadata(path) {
      Ok(metadata) => Ok(Some(metadata.modified()?)),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
      Err(e) => Err(e.into()),
    }
  }

  fn ensure_dir(&mut self, dir: &str) -> ReleaseResult<()> {
    fs::create_dir_all(dir)?;
    Ok(())
  }

  fn put(&mut self, path: &str, reader: &mut dyn Read) -> ReleaseResult<u64> {
    if let Some(parent) = Path::new(path).parent()
      && !parent.as_os_str().is_empty()
    {
      fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    Ok(io::copy(reader, &mut file)?)
  }
}
