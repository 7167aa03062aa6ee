//! Utility functions for path handling, backups and shell quoting

use std::fs;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

/// Convert a relative path to archive format (always forward slashes)
///
/// Archive entry names use `/` regardless of the host convention.
pub fn path_to_slash(path: &Path) -> String {
  path
    .components()
    .map(|c| c.as_os_str().to_string_lossy())
    .collect::<Vec<_>>()
    .join("/")
}

/// Sibling backup path: `<file>.bak`
pub fn backup_path(path: &Path) -> PathBuf {
  let mut name = path.as_os_str().to_os_string();
  name.push(".bak");
  PathBuf::from(name)
}

/// Rename `path` to its `.bak` sibling, then write `content` to `path`
///
/// An existing backup is replaced. If the rename fails nothing is written and
/// the original stays untouched.
pub fn replace_with_backup(path: &Path, content: &[u8]) -> io::Result<PathBuf> {
  let backup = backup_path(path);
  fs::rename(path, &backup)?;
  fs::write(path, content)?;
  Ok(backup)
}

/// Quote a string for a POSIX shell (single quotes, `'` escaped as `'\''`)
pub fn shell_quote(value: &str) -> String {
  format!("'{}'", value.replace('\'', r"'\''"))
}

/// Whether stdin is attached to a terminal
pub fn is_interactive() -> bool {
  io::stdin().is_terminal()
}

/// Whether an environment variable is set to a non-empty value
pub fn env_flag(name: &str) -> bool {
  std::env::var(name).is_ok_and(|v| !v.trim().is_empty())
}
