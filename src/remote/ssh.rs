//! Remote shell over the system `ssh` client
//!
//! No SSH library is linked: commands run through the user's `ssh` binary
//! (with `sshpass -e` for password authentication), the same way git is
//! driven through the system `git`.

use crate::core::config::ReleaseConfig;
use crate::core::error::{AuthError, NetworkError, ReleaseError, ReleaseResult};
use crate::remote::shell::{CommandOutput, RemoteShell};
use crate::ui::log::RunLog;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Output, Stdio};
use std::thread::{self, JoinHandle};

/// ssh reserves exit status 255 for its own (connection) errors
const SSH_ERROR_STATUS: i32 = 255;

/// Credentials usable for one connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshAuth {
  pub key_file: Option<PathBuf>,
  pub password: Option<String>,
}

impl SshAuth {
  /// Select the credential methods from the config
  ///
  /// An unreadable key file is dropped with a warning. With no method left
  /// this fails with `NoAuthMethod` before any process is started.
  pub fn from_config(config: &ReleaseConfig, log: &RunLog) -> ReleaseResult<Self> {
    let mut key_file = None;
    if !config.ssh_key_file.is_empty() {
      let path = expand_home(&config.ssh_key_file);
      match File::open(&path) {
        Ok(_) => {
          log.detail(format!("ssh key: {}", path.display()));
          key_file = Some(path);
        }
        Err(e) => log.warn(format!("SSH key {} is not readable: {}", path.display(), e)),
      }
    }

    let password = (!config.ssh_password.is_empty()).then(|| config.ssh_password.clone());

    if key_file.is_none() && password.is_none() {
      return Err(AuthError::NoAuthMethod.into());
    }
    Ok(Self { key_file, password })
  }
}

fn expand_home(path: &str) -> PathBuf {
  if let Some(rest) = path.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  PathBuf::from(path)
}

/// [`RemoteShell`] backed by the `ssh` binary
pub struct SshShell {
  host: String,
  port: String,
  user: String,
  auth: SshAuth,
  timeout: i64,
  /// Run ssh under `sshpass -e`
  use_sshpass: bool,
}

impl SshShell {
  pub fn new(config: &ReleaseConfig, auth: SshAuth, log: &RunLog) -> ReleaseResult<Self> {
    let mut auth = auth;
    let mut use_sshpass = false;

    if auth.password.is_some() {
      if which::which("sshpass").is_ok() {
        use_sshpass = true;
      } else if auth.key_file.is_some() {
        log.warn("sshpass not found on PATH; using the key file only");
        auth.password = None;
      } else {
        return Err(
          NetworkError::Launch {
            program: "sshpass".to_string(),
            reason: "not found on PATH".to_string(),
          }
          .into(),
        );
      }
    }

    Ok(Self {
      host: config.ssh_host.clone(),
      port: config.port().to_string(),
      user: config.ssh_user.clone(),
      auth,
      timeout: config.ssh_timeout.max(1),
      use_sshpass,
    })
  }

  /// `user@host:port`, for messages
  pub fn address(&self) -> String {
    format!("{}@{}:{}", self.user, self.host, self.port)
  }

  /// Check that a session can be opened
  pub fn connect(&mut self) -> ReleaseResult<()> {
    let output = self.exec("true")?;
    if !output.success() {
      return Err(ReleaseError::message(format!(
        "SSH connection test on {} failed: {}",
        self.address(),
        output.stderr.trim()
      )));
    }
    Ok(())
  }

  /// Arguments passed to `ssh`, without the remote command
  pub fn ssh_args(&self) -> Vec<String> {
    let mut args = vec![
      "-p".to_string(),
      self.port.clone(),
      "-o".to_string(),
      format!("ConnectTimeout={}", self.timeout),
      "-o".to_string(),
      "StrictHostKeyChecking=accept-new".to_string(),
    ];
    if let Some(key) = &self.auth.key_file {
      args.extend([
        "-i".to_string(),
        key.to_string_lossy().into_owned(),
        "-o".to_string(),
        "IdentitiesOnly=yes".to_string(),
      ]);
    }
    if !self.use_sshpass {
      args.extend(["-o".to_string(), "BatchMode=yes".to_string()]);
    }
    args.push(format!("{}@{}", self.user, self.host));
    args
  }

  fn command(&self, remote: &str) -> Command {
    let mut cmd = if self.use_sshpass {
      let mut cmd = Command::new("sshpass");
      cmd.arg("-e").arg("ssh");
      if let Some(password) = &self.auth.password {
        cmd.env("SSHPASS", password);
      }
      cmd
    } else {
      Command::new("ssh")
    };
    cmd.args(self.ssh_args()).arg(remote);
    cmd
  }

  fn program(&self) -> &'static str {
    if self.use_sshpass { "sshpass" } else { "ssh" }
  }

  fn spawn(&self, cmd: &mut Command) -> ReleaseResult<Child> {
    cmd.spawn().map_err(|e| {
      NetworkError::Launch {
        program: self.program().to_string(),
        reason: e.to_string(),
      }
      .into()
    })
  }

  fn finish(&self, output: Output) -> ReleaseResult<CommandOutput> {
    let result = CommandOutput {
      status: output.status.code(),
      stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
      stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };
    if result.status == Some(SSH_ERROR_STATUS) {
      return Err(
        NetworkError::Connect {
          address: self.address(),
          stderr: result.stderr,
        }
        .into(),
      );
    }
    Ok(result)
  }
}

/// Write `input` to the child's stdin while stdout and stderr drain on helper
/// threads, then wait for it
///
/// The copy result is returned separately: a remote side that exits early
/// breaks the pipe, and its exit status explains that better.
fn feed(mut child: Child, input: &mut dyn Read) -> io::Result<(Output, io::Result<u64>)> {
  let stdout = child.stdout.take().map(drain);
  let stderr = child.stderr.take().map(drain);

  let copied = match child.stdin.take() {
    Some(mut stdin) => {
      let copied = io::copy(input, &mut stdin).and_then(|n| stdin.flush().map(|_| n));
      // Dropping stdin closes the pipe and signals end of input
      drop(stdin);
      copied
    }
    None => Err(io::Error::other("stdin not captured")),
  };

  let status = child.wait()?;
  let output = Output {
    status,
    stdout: collect(stdout)?,
    stderr: collect(stderr)?,
  };
  Ok((output, copied))
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<io::Result<Vec<u8>>> {
  thread::spawn(move || {
    let mut buf = Vec::new();
    pipe.read_to_end(&mut buf)?;
    Ok(buf)
  })
}

fn collect(reader: Option<JoinHandle<io::Result<Vec<u8>>>>) -> io::Result<Vec<u8>> {
  match reader {
    Some(handle) => handle.join().map_err(|_| io::Error::other("output reader panicked"))?,
    None => Ok(Vec::new()),
  }
}

impl RemoteShell for SshShell {
  fn exec(&mut self, command: &str) -> ReleaseResult<CommandOutput> {
    let mut cmd = self.command(command);
    cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
    let child = self.spawn(&mut cmd)?;
    let output = child.wait_with_output()?;
    self.finish(output)
  }

  fn exec_with_input(&mut self, command: &str, input: &mut dyn Read) -> ReleaseResult<(CommandOutput, u64)> {
    let mut cmd = self.command(command);
    cmd.stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::piped());
    let child = self.spawn(&mut cmd)?;

    let (output, copied) = feed(child, input)?;
    let output = self.finish(output)?;
    match copied {
      Ok(bytes) => Ok((output, bytes)),
      Err(e) if output.success() => Err(
        crate::core::error::RemoteError::Stream {
          path: command.to_string(),
          reason: e.to_string(),
        }
        .into(),
      ),
      // The remote side exited early; its status explains the failure
      Err(_) => Ok((output, 0)),
    }
  }
}
