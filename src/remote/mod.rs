//! Upload of release artifacts to the update server

pub mod local;
pub mod shell;
pub mod ssh;
pub mod sync;
pub mod target;

pub use local::LocalBackend;
pub use shell::ShellBackend;
pub use ssh::{SshAuth, SshShell};
pub use sync::{AssetOutcome, RemoteBackend, RemoteSync, UploadOutcome};
pub use target::RemoteTarget;

use crate::core::config::{ReleaseConfig, Transport};
use crate::core::error::ReleaseResult;
use crate::ui::log::RunLog;

/// Open the backend selected by `transport`
///
/// For ssh this selects the credentials and runs one connection probe, so
/// authentication and network problems surface before any transfer.
pub fn open_backend(config: &ReleaseConfig, log: &RunLog) -> ReleaseResult<Box<dyn RemoteBackend>> {
  match config.transport {
    Transport::Local => {
      log.detail(format!("local transport, base {}", config.ssh_dir_base));
      Ok(Box::new(LocalBackend))
    }
    Transport::Ssh => {
      let auth = SshAuth::from_config(config, log)?;
      let mut shell = SshShell::new(config, auth, log)?;
      log.info(format!("🔌 Connecting to {}...", shell.address()));
      shell.connect()?;
      Ok(Box::new(ShellBackend::new(shell)))
    }
  }
}
