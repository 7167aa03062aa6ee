//! File transfer over a plain remote shell
//!
//! The server only needs `mkdir -p`, `cat` and `stat`:
//!
//! ```text
//! stat -c %Y '<path>' 2>/dev/null || stat -f %m '<path>' 2>/dev/null || echo
//! mkdir -p '<dir>' && cat > '<path>'          (file bytes on stdin)
//! ```

use crate::core::error::{ReleaseResult, RemoteError};
use crate::remote::sync::RemoteBackend;
use crate::utils::shell_quote;
use std::io::Read;
use std::time::{Duration, SystemTime};

/// Result of one remote command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
  /// Exit status; `None` when terminated by a signal
  pub status: Option<i32>,
  pub stdout: String,
  pub stderr: String,
}

impl CommandOutput {
  pub fn success(&self) -> bool {
    self.status == Some(0)
  }

  fn into_error(self, command: &str) -> RemoteError {
    RemoteError::CommandFailed {
      command: command.to_string(),
      status: self.status,
      stderr: self.stderr,
    }
  }
}

/// Runs command lines on the remote host
pub trait RemoteShell {
  fn exec(&mut self, command: &str) -> ReleaseResult<CommandOutput>;

  /// Run `command` with `input` streamed to its stdin, then close stdin
  ///
  /// Returns the output and the number of bytes streamed.
  fn exec_with_input(&mut self, command: &str, input: &mut dyn Read) -> ReleaseResult<(CommandOutput, u64)>;
}

/// [`RemoteBackend`] speaking the shell-command protocol
pub struct ShellBackend<S: RemoteShell> {
  shell: S,
}

impl<S: RemoteShell> ShellBackend<S> {
  pub fn new(shell: S) -> Self {
    Self { shell }
  }
}

/// Modification-time probe with GNU, then BSD flavour, then empty output
pub fn stat_command(path: &str) -> String {
  let quoted = shell_quote(path);
  format!(
    "stat -c %Y {q} 2>/dev/null || stat -f %m {q} 2>/dev/null || echo",
    q = quoted
  )
}

/// Directory creation plus stdin-to-file copy
pub fn put_command(path: &str) -> String {
  match path.rsplit_once('/') {
    Some((dir, _)) if !dir.is_empty() => {
      format!("mkdir -p {} && cat > {}", shell_quote(dir), shell_quote(path))
    }
    _ => format!("cat > {}", shell_quote(path)),
  }
}

impl<S: RemoteShell> RemoteBackend for ShellBackend<S> {
  fn modified(&mut self, path: &str) -> ReleaseResult<Option<SystemTime>> {
    let command = stat_command(path);
    let output = self.shell.exec(&command)?;
    if !output.success() {
      return Err(output.into_error(&command).into());
    }

    let text = output.stdout.trim();
    if text.is_empty() {
      return Ok(None);
    }
    let seconds: u64 = text.parse().map_err(|_| RemoteError::BadTimestamp {
      path: path.to_string(),
      output: output.stdout.clone(),
    })?;
    Ok(Some(SystemTime::UNIX_EPOCH + Duration::from_secs(seconds)))
  }

  fn ensure_dir(&mut self, dir: &str) -> ReleaseResult<()> {
    let command = format!("mkdir -p {}", shell_quote(dir));
    let output = self.shell.exec(&command)?;
    if !output.success() {
      return Err(output.into_error(&command).into());
    }
    Ok(())
  }

  fn put(&mut self, path: &str, reader: &mut dyn Read) -> ReleaseResult<u64> {
    let command = put_command(path);
    let (output, bytes) = self.shell.exec_with_input(&command, reader)?;
    if !output.success() {
      return Err(output.into_error(&command).into());
    }
    Ok(bytes)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::error::ReleaseError;
  use std::collections::VecDeque;

  /// Scripted shell: answers commands from a queue and records them
  #[derive(Default)]
  struct ScriptedShell {
    replies: VecDeque<CommandOutput>,
    commands: Vec<String>,
    received: Vec<u8>,
  }

  impl ScriptedShell {
    fn reply(mut self, status: i32, stdout: &str) -> Self {
      self.replies.push_back(CommandOutput {
        status: Some(status),
        stdout: stdout.to_string(),
        stderr: String::new(),
      });
      self
    }
  }

  impl RemoteShell for ScriptedShell {
    fn exec(&mut self, command: &str) -> ReleaseResult<CommandOutput> {
      self.commands.push(command.to_string());
      Ok(self.replies.pop_front().unwrap_or_default())
    }

    fn exec_with_input(&mut self, command: &str, input: &mut dyn Read) -> ReleaseResult<(CommandOutput, u64)> {
      self.commands.push(command.to_string());
      let bytes = input.read_to_end(&mut self.received)? as u64;
      Ok((self.replies.pop_front().unwrap_or_default(), bytes))
    }
  }

  #[test]
  fn test_stat_command_falls_back() {
    assert_eq!(
      stat_command("/var/www/a b/p.zip"),
      "stat -c %Y '/var/www/a b/p.zip' 2>/dev/null || stat -f %m '/var/www/a b/p.zip' 2>/dev/null || echo"
    );
  }

  #[test]
  fn test_put_command() {
    assert_eq!(put_command("/var/www/u/p.zip"), "mkdir -p '/var/www/u' && cat > '/var/www/u/p.zip'");
    assert_eq!(put_command("p.zip"), "cat > 'p.zip'");
  }

  #[test]
  fn test_modified_parses_seconds() {
    let mut backend = ShellBackend::new(ScriptedShell::default().reply(0, "1700000000\n"));
    let time = backend.modified("/x").unwrap().unwrap();
    assert_eq!(time, SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000));
  }

  #[test]
  fn test_empty_output_means_absent() {
    let mut backend = ShellBackend::new(ScriptedShell::default().reply(0, "\n"));
    assert_eq!(backend.modified("/x").unwrap(), None);
  }

  #[test]
  fn test_garbage_output_is_an_error() {
    let mut backend = ShellBackend::new(ScriptedShell::default().reply(0, "stat: weird\n"));
    let err = backend.modified("/x").unwrap_err();
    assert!(matches!(err, ReleaseError::Remote(RemoteError::BadTimestamp { .. })));
  }

  #[test]
  fn test_put_streams_bytes() {
    let mut backend = ShellBackend::new(ScriptedShell::default().reply(0, ""));
    let bytes = backend.put("/srv/u/p.zip", &mut &b"payload"[..]).unwrap();
    assert_eq!(bytes, 7);
    assert_eq!(backend.shell.received, b"payload");
    assert_eq!(backend.shell.commands, vec!["mkdir -p '/srv/u' && cat > '/srv/u/p.zip'"]);
  }

  #[test]
  fn test_put_failure_reports_command() {
    let mut backend = ShellBackend::new(ScriptedShell::default().reply(1, ""));
    let err = backend.put("/srv/u/p.zip", &mut &b"x"[..]).unwrap_err();
    assert!(matches!(
      err,
      ReleaseError::Remote(RemoteError::CommandFailed { status: Some(1), .. })
    ));
  }
}
