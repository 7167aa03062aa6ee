//! Deterministic zip assembly
//!
//! Entries are visited depth-first in file-name order and named
//! `<slug>/<relative path>` with forward slashes. Timestamps come from the file
//! modification time and permissions are fixed, so an unchanged tree always
//! produces the same bytes.

use crate::archive::exclude::ExclusionSet;
use crate::core::error::{ArchiveError, ReleaseResult};
use crate::ui::log::RunLog;
use crate::ui::progress::FileProgress;
use crate::utils::path_to_slash;
use chrono::{DateTime, Datelike, Timelike, Utc};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Result of a successful build
#[derive(Debug, Clone)]
pub struct ArchiveSummary {
  pub path: PathBuf,
  pub files: usize,
  /// Uncompressed bytes added
  pub bytes: u64,
  /// Hex SHA-256 of the archive file
  pub sha256: String,
}

pub struct ArchiveBuilder<'a> {
  root: &'a Path,
  slug: &'a str,
  exclusions: &'a ExclusionSet,
  log: &'a RunLog,
}

struct Entry {
  path: PathBuf,
  name: String,
}

impl<'a> ArchiveBuilder<'a> {
  pub fn new(root: &'a Path, slug: &'a str, exclusions: &'a ExclusionSet, log: &'a RunLog) -> Self {
    Self {
      root,
      slug,
      exclusions,
      log,
    }
  }

  /// Write the archive to `dest`
  ///
  /// The first walk or write error aborts the build and the partial file is
  /// removed.
  pub fn build(&self, dest: &Path) -> ReleaseResult<ArchiveSummary> {
    let entries = self.collect()?;

    if let Some(parent) = dest.parent() {
      fs::create_dir_all(parent).map_err(|source| ArchiveError::Write {
        path: parent.to_path_buf(),
        source,
      })?;
    }

    match self.write(dest, &entries) {
      Ok(bytes) => {
        let sha256 = digest(dest).map_err(|source| ArchiveError::Write {
          path: dest.to_path_buf(),
          source,
        })?;
        Ok(ArchiveSummary {
          path: dest.to_path_buf(),
          files: entries.len(),
          bytes,
          sha256,
        })
      }
      Err(err) => {
        let _ = fs::remove_file(dest);
        Err(err.into())
      }
    }
  }

  fn collect(&self) -> Result<Vec<Entry>, ArchiveError> {
    let mut entries = Vec::new();
    let mut skipped = Vec::new();

    let walker = WalkDir::new(self.root)
      .min_depth(1)
      .sort_by_file_name()
      .into_iter()
      .filter_entry(|e| {
        let relative = e.path().strip_prefix(self.root).unwrap_or(e.path());
        let excluded = self.exclusions.is_excluded(relative);
        if excluded {
          skipped.push(relative.to_path_buf());
        }
        !excluded
      });

    for item in walker {
      let entry = item.map_err(|e| ArchiveError::Write {
        path: e.path().map(Path::to_path_buf).unwrap_or_else(|| self.root.to_path_buf()),
        source: e.into(),
      })?;

      // Symlinked files are followed, directories only give structure
      if !entry.path().is_file() {
        continue;
      }

      let relative = entry.path().strip_prefix(self.root).unwrap_or(entry.path());
      entries.push(Entry {
        path: entry.path().to_path_buf(),
        name: format!("{}/{}", self.slug, path_to_slash(relative)),
      });
    }

    for path in skipped {
      self.log.detail(format!("skipped {}", path_to_slash(&path)));
    }
    Ok(entries)
  }

  fn write(&self, dest: &Path, entries: &[Entry]) -> Result<u64, ArchiveError> {
    let fail = |path: &Path| {
      let path = path.to_path_buf();
      move |source: io::Error| ArchiveError::Write { path, source }
    };

    let file = File::create(dest).map_err(fail(dest))?;
    let mut zip = ZipWriter::new(file);
    let mut progress = FileProgress::new(entries.len(), "Packing");
    let mut total = 0u64;

    for entry in entries {
      let metadata = fs::metadata(&entry.path).map_err(fail(&entry.path))?;
      let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644)
        .last_modified_time(zip_time(metadata.modified().ok()));

      zip
        .start_file(entry.name.as_str(), options)
        .map_err(|e| ArchiveError::Write {
          path: entry.path.clone(),
          source: io::Error::other(e),
        })?;

      let mut source = File::open(&entry.path).map_err(fail(&entry.path))?;
      total += io::copy(&mut source, &mut zip).map_err(fail(&entry.path))?;

      self.log.detail(format!("added {}", entry.name));
      progress.inc();
    }

    zip.finish().map_err(|e| ArchiveError::Write {
      path: dest.to_path_buf(),
      source: io::Error::other(e),
    })?;
    Ok(total)
  }
}

/// Zip timestamp (UTC, 2-second resolution) for a modification time
fn zip_time(modified: Option<std::time::SystemTime>) -> zip::DateTime {
  let Some(modified) = modified else {
    return zip::DateTime::default();
  };
  let t: DateTime<Utc> = modified.into();
  zip::DateTime::from_date_and_time(
    t.year().clamp(1980, 2107) as u16,
    t.month() as u8,
    t.day() as u8,
    t.hour() as u8,
    t.minute() as u8,
    t.second().min(59) as u8,
  )
  .unwrap_or_default()
}

/// Hex SHA-256 of a file
pub fn digest(path: &Path) -> io::Result<String> {
  let mut hasher = Sha256::new();
  let mut file = File::open(path)?;
  io::copy(&mut file, &mut hasher)?;
  Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Read;

  fn project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::write(root.join("my-plugin.php"), "<?php\n").unwrap();
    fs::write(root.join("b.log"), "log").unwrap();
    fs::write(root.join("update.config"), "{}").unwrap();
    fs::create_dir_all(root.join("includes/sub")).unwrap();
    fs::write(root.join("includes/a.php"), "a").unwrap();
    fs::write(root.join("includes/sub/Thumbs.db"), "x").unwrap();
    fs::write(root.join("includes/sub/z.php"), "z").unwrap();
    fs::create_dir_all(root.join("Updates")).unwrap();
    fs::write(root.join("Updates/update_info.json"), "{}").unwrap();
    dir
  }

  fn names(path: &Path) -> Vec<String> {
    let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    (0..archive.len())
      .map(|i| archive.by_index(i).unwrap().name().to_string())
      .collect()
  }

  #[test]
  fn test_entries_are_prefixed_ordered_and_filtered() {
    let dir = project();
    let out = tempfile::tempdir().unwrap();
    let dest = out.path().join("my-plugin-v1.0.zip");
    let exclusions = ExclusionSet::new(&["*.log"]).unwrap();
    let log = RunLog::sink(None);

    let summary = ArchiveBuilder::new(dir.path(), "my-plugin", &exclusions, &log)
      .build(&dest)
      .unwrap();

    assert_eq!(
      names(&dest),
      vec!["my-plugin/includes/a.php", "my-plugin/includes/sub/z.php", "my-plugin/my-plugin.php"]
    );
    assert_eq!(summary.files, 3);
    assert_eq!(summary.sha256.len(), 64);
  }

  #[test]
  fn test_content_survives() {
    let dir = project();
    let out = tempfile::tempdir().unwrap();
    let dest = out.path().join("p.zip");
    let exclusions = ExclusionSet::new::<&str>(&[]).unwrap();
    let log = RunLog::sink(None);
    ArchiveBuilder::new(dir.path(), "p", &exclusions, &log).build(&dest).unwrap();

    let mut archive = zip::ZipArchive::new(File::open(&dest).unwrap()).unwrap();
    let mut content = String::new();
    archive.by_name("p/my-plugin.php").unwrap().read_to_string(&mut content).unwrap();
    assert_eq!(content, "<?php\n");
    assert!(archive.by_name("p/b.log").is_ok());
  }

  #[test]
  fn test_rebuild_is_byte_identical() {
    let dir = project();
    let out = tempfile::tempdir().unwrap();
    let exclusions = ExclusionSet::new::<&str>(&[]).unwrap();
    let log = RunLog::sink(None);
    let builder = ArchiveBuilder::new(dir.path(), "my-plugin", &exclusions, &log);

    let first = builder.build(&out.path().join("a.zip")).unwrap();
    let second = builder.build(&out.path().join("b.zip")).unwrap();
    assert_eq!(first.sha256, second.sha256);
    assert_eq!(
      fs::read(out.path().join("a.zip")).unwrap(),
      fs::read(out.path().join("b.zip")).unwrap()
    );
  }

  #[test]
  fn test_unwritable_destination() {
    let dir = project();
    let exclusions = ExclusionSet::new::<&str>(&[]).unwrap();
    let log = RunLog::sink(None);
    // A regular file where the parent directory should be
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "").unwrap();
    let err = ArchiveBuilder::new(dir.path(), "p", &exclusions, &log)
      .build(&blocker.join("out.zip"))
      .unwrap_err();
    assert!(matches!(err, crate::core::error::ReleaseError::Archive(_)));
  }
}
