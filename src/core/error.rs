//! Error types for plugin-release with contextual messages and exit codes
//!
//! Every failure of the pipeline lands in one of the categories below. Each
//! category knows how to describe itself and, where it can, suggests a fix.

use crate::ui::log::RunLog;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for plugin-release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (config, source markers, descriptor content)
  User = 1,
  /// System error (I/O, network, remote commands)
  System = 2,
  /// Validation failure (credentials, URLs)
  Validation = 3,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for plugin-release
#[derive(Debug)]
pub enum ReleaseError {
  /// Configuration errors
  Config(ConfigError),

  /// Version or integration markers missing from the plugin source
  Source(SourceError),

  /// Update descriptor errors
  Descriptor(DescriptorError),

  /// Archive assembly errors
  Archive(ArchiveError),

  /// No usable remote credential
  Auth(AuthError),

  /// Dial, handshake or session failures
  Network(NetworkError),

  /// Remote command, stream or target failures
  Remote(RemoteError),

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl ReleaseError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    ReleaseError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Add context to an existing error
  ///
  /// Categorized errors keep their category; the context is folded into a
  /// message wrapper only for I/O and free-form errors.
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      ReleaseError::Message { message, context, help } => ReleaseError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      ReleaseError::Io(e) => ReleaseError::Message {
        message: ctx_str,
        context: Some(format!("I/O error: {}", e)),
        help: None,
      },
      _ => self,
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      ReleaseError::Config(_) => ExitCode::User,
      ReleaseError::Source(_) => ExitCode::User,
      ReleaseError::Descriptor(_) => ExitCode::User,
      ReleaseError::Archive(_) => ExitCode::System,
      ReleaseError::Auth(_) => ExitCode::Validation,
      ReleaseError::Network(_) => ExitCode::System,
      ReleaseError::Remote(RemoteError::UrlEndsInDirectory { .. } | RemoteError::UrlHasNoFilename { .. }) => {
        ExitCode::Validation
      }
      ReleaseError::Remote(_) => ExitCode::System,
      ReleaseError::Io(_) => ExitCode::System,
      ReleaseError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      ReleaseError::Config(e) => e.help_message(),
      ReleaseError::Source(e) => e.help_message(),
      ReleaseError::Descriptor(e) => e.help_message(),
      ReleaseError::Auth(e) => e.help_message(),
      ReleaseError::Network(e) => e.help_message(),
      ReleaseError::Remote(e) => e.help_message(),
      ReleaseError::Message { help, .. } => help.clone(),
      _ => None,
    }
  }
}

impl fmt::Display for ReleaseError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ReleaseError::Config(e) => write!(f, "{}", e),
      ReleaseError::Source(e) => write!(f, "{}", e),
      ReleaseError::Descriptor(e) => write!(f, "{}", e),
      ReleaseError::Archive(e) => write!(f, "{}", e),
      ReleaseError::Auth(e) => write!(f, "{}", e),
      ReleaseError::Network(e) => write!(f, "{}", e),
      ReleaseError::Remote(e) => write!(f, "{}", e),
      ReleaseError::Io(e) => write!(f, "I/O error: {}", e),
      ReleaseError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for ReleaseError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      ReleaseError::Io(e) => Some(e),
      ReleaseError::Archive(ArchiveError::Write { source, .. }) => Some(source),
      _ => None,
    }
  }
}

impl From<io::Error> for ReleaseError {
  fn from(err: io::Error) -> Self {
    ReleaseError::Io(err)
  }
}

impl From<String> for ReleaseError {
  fn from(msg: String) -> Self {
    ReleaseError::message(msg)
  }
}

impl From<serde_json::Error> for ReleaseError {
  fn from(err: serde_json::Error) -> Self {
    ReleaseError::message(format!("JSON error: {}", err))
  }
}

impl From<toml_edit::de::Error> for ReleaseError {
  fn from(err: toml_edit::de::Error) -> Self {
    ReleaseError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<ConfigError> for ReleaseError {
  fn from(err: ConfigError) -> Self {
    ReleaseError::Config(err)
  }
}

impl From<SourceError> for ReleaseError {
  fn from(err: SourceError) -> Self {
    ReleaseError::Source(err)
  }
}

impl From<DescriptorError> for ReleaseError {
  fn from(err: DescriptorError) -> Self {
    ReleaseError::Descriptor(err)
  }
}

impl From<ArchiveError> for ReleaseError {
  fn from(err: ArchiveError) -> Self {
    ReleaseError::Archive(err)
  }
}

impl From<AuthError> for ReleaseError {
  fn from(err: AuthError) -> Self {
    ReleaseError::Auth(err)
  }
}

impl From<NetworkError> for ReleaseError {
  fn from(err: NetworkError) -> Self {
    ReleaseError::Network(err)
  }
}

impl From<RemoteError> for ReleaseError {
  fn from(err: RemoteError) -> Self {
    ReleaseError::Remote(err)
  }
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
  /// Working directory does not exist
  WorkDirMissing { path: PathBuf },

  /// update.config not found
  NotFound { work_dir: PathBuf },

  /// Config file exists but could not be parsed
  Invalid { path: PathBuf, reason: String },

  /// Missing required field
  MissingField { field: String },

  /// A field holds a value outside its domain
  InvalidValue { field: String, value: String },

  /// An exclusion pattern is not a valid glob
  InvalidPattern { pattern: String, reason: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::WorkDirMissing { .. } => {
        Some("Pass the plugin directory as the first argument or run from inside it.".to_string())
      }
      ConfigError::NotFound { .. } => Some(
        "Create update.config with at least {\"main_php_file\": \"my-plugin.php\"} in the plugin directory."
          .to_string(),
      ),
      ConfigError::MissingField { field } => Some(format!("Add \"{}\" to update.config.", field)),
      ConfigError::InvalidPattern { .. } => {
        Some("skip_pattern entries use shell glob syntax, e.g. \"*.log\" or \"node_modules\".".to_string())
      }
      _ => None,
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::WorkDirMissing { path } => {
        write!(f, "Working directory does not exist: {}", path.display())
      }
      ConfigError::NotFound { work_dir } => {
        write!(
          f,
          "No plugin-release configuration found.\nExpected file: {}",
          work_dir.join(super::config::CONFIG_FILE).display()
        )
      }
      ConfigError::Invalid { path, reason } => {
        write!(f, "Failed to parse config {}: {}", path.display(), reason)
      }
      ConfigError::MissingField { field } => {
        write!(f, "Missing required field in config: {}", field)
      }
      ConfigError::InvalidValue { field, value } => {
        write!(f, "Invalid value for config field {}: '{}'", field, value)
      }
      ConfigError::InvalidPattern { pattern, reason } => {
        write!(f, "Invalid skip pattern '{}': {}", pattern, reason)
      }
    }
  }
}

/// Plugin source format errors
#[derive(Debug)]
pub enum SourceError {
  /// No version declaration anywhere in the source
  NoVersionFound { path: PathBuf },

  /// The update-checker registration call is absent or has an empty URL
  MissingIntegration { path: PathBuf },

  /// Two edits of one pass touch the same bytes
  OverlappingEdits { first: String, second: String },
}

impl SourceError {
  fn help_message(&self) -> Option<String> {
    match self {
      SourceError::NoVersionFound { .. } => Some(
        "Declare the version in the plugin header (` * Version: 1.0.0`), a `private $version = '1.0.0';` field or a \
         `define('MY_PLUGIN_VERSION', '1.0.0');` constant."
          .to_string(),
      ),
      SourceError::MissingIntegration { .. } => Some(
        "Register the update checker, e.g. `PucFactory::buildUpdateChecker('https://example.com/updates/update_info.json', \
         __FILE__, 'my-plugin');`"
          .to_string(),
      ),
      SourceError::OverlappingEdits { .. } => None,
    }
  }
}

impl fmt::Display for SourceError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SourceError::NoVersionFound { path } => {
        write!(f, "No valid version declaration found in {}", path.display())
      }
      SourceError::MissingIntegration { path } => {
        write!(f, "No valid update-checker registration found in {}", path.display())
      }
      SourceError::OverlappingEdits { first, second } => {
        write!(f, "Source edits overlap: {} and {}", first, second)
      }
    }
  }
}

/// Update descriptor errors
#[derive(Debug)]
pub enum DescriptorError {
  /// Descriptor file does not exist
  Missing { path: PathBuf },

  /// Descriptor exists but could not be read
  Unreadable { path: PathBuf, reason: String },

  /// Descriptor is not valid JSON
  Malformed { path: PathBuf, reason: String },

  /// Descriptor is valid JSON but does not fit the known fields
  SchemaMismatch { path: PathBuf, reason: String },

  /// Neither a slug nor a download file name to derive one from
  NoSlug { path: PathBuf },

  /// Descriptor could not be written back
  WriteFailed { path: PathBuf, reason: String },
}

impl DescriptorError {
  fn help_message(&self) -> Option<String> {
    match self {
      DescriptorError::Missing { .. } => Some(
        "Create Updates/update_info.json with at least {\"version\": \"0.0.0\", \"download_url\": \
         \"https://example.com/updates/my-plugin.zip\"}."
          .to_string(),
      ),
      DescriptorError::NoSlug { .. } => Some(
        "Set \"slug\" or a \"download_url\" ending in the archive name, e.g. \
         \"https://example.com/updates/my-plugin.zip\"."
          .to_string(),
      ),
      DescriptorError::WriteFailed { path, .. } => Some(format!(
        "The previous descriptor is kept as {}.bak; restore it manually if needed.",
        path.display()
      )),
      _ => None,
    }
  }
}

impl fmt::Display for DescriptorError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DescriptorError::Missing { path } => write!(f, "Update descriptor not found: {}", path.display()),
      DescriptorError::Unreadable { path, reason } => {
        write!(f, "Update descriptor {} could not be read: {}", path.display(), reason)
      }
      DescriptorError::Malformed { path, reason } => {
        write!(f, "Update descriptor {} is not valid JSON: {}", path.display(), reason)
      }
      DescriptorError::SchemaMismatch { path, reason } => {
        write!(f, "Update descriptor {} has an unexpected structure: {}", path.display(), reason)
      }
      DescriptorError::NoSlug { path } => {
        write!(f, "Update descriptor {} yields no plugin slug", path.display())
      }
      DescriptorError::WriteFailed { path, reason } => {
        write!(f, "Update descriptor {} could not be written: {}", path.display(), reason)
      }
    }
  }
}

/// Archive assembly errors
#[derive(Debug)]
pub enum ArchiveError {
  /// The first I/O error during walk or write
  Write { path: PathBuf, source: io::Error },
}

impl fmt::Display for ArchiveError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ArchiveError::Write { path, source } => {
        write!(f, "Failed to write archive {}: {}", path.display(), source)
      }
    }
  }
}

/// Remote credential errors
#[derive(Debug)]
pub enum AuthError {
  /// Neither a private key nor a password is configured
  NoAuthMethod,
}

impl AuthError {
  fn help_message(&self) -> Option<String> {
    match self {
      AuthError::NoAuthMethod => {
        Some("Set ssh_key_file to a readable private key or ssh_password in update.config.".to_string())
      }
    }
  }
}

impl fmt::Display for AuthError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      AuthError::NoAuthMethod => write!(f, "No SSH authentication method available"),
    }
  }
}

/// Dial, handshake and session errors
#[derive(Debug)]
pub enum NetworkError {
  /// The transport client could not be started
  Launch { program: String, reason: String },

  /// The connection or authentication failed
  Connect { address: String, stderr: String },
}

impl NetworkError {
  fn help_message(&self) -> Option<String> {
    match self {
      NetworkError::Launch { program, .. } if program == "sshpass" => {
        Some("Password authentication needs `sshpass` on PATH; install it or use ssh_key_file.".to_string())
      }
      NetworkError::Launch { program, .. } => Some(format!("Make sure `{}` is installed and on PATH.", program)),
      NetworkError::Connect { stderr, .. } => {
        if stderr.contains("Permission denied") {
          Some("Check ssh_user and the configured key or password.".to_string())
        } else {
          Some("Check ssh_host, ssh_port and that the server is reachable.".to_string())
        }
      }
    }
  }
}

impl fmt::Display for NetworkError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      NetworkError::Launch { program, reason } => write!(f, "Failed to start {}: {}", program, reason),
      NetworkError::Connect { address, stderr } => {
        write!(f, "SSH connection to {} failed: {}", address, stderr.trim())
      }
    }
  }
}

/// Remote command, stream and target errors
#[derive(Debug)]
pub enum RemoteError {
  /// Download URL path ends in a separator
  UrlEndsInDirectory { url: String },

  /// Download URL has no filename segment
  UrlHasNoFilename { url: String },

  /// A remote command exited unsuccessfully
  CommandFailed { command: String, status: Option<i32>, stderr: String },

  /// Streaming bytes to or from the remote side failed
  Stream { path: String, reason: String },

  /// A remote status probe returned something that is not a timestamp
  BadTimestamp { path: String, output: String },
}

impl RemoteError {
  fn help_message(&self) -> Option<String> {
    match self {
      RemoteError::UrlEndsInDirectory { .. } | RemoteError::UrlHasNoFilename { .. } => Some(
        "download_url in update_info.json must point at the archive file, e.g. https://example.com/updates/my-plugin.zip"
          .to_string(),
      ),
      _ => None,
    }
  }
}

impl fmt::Display for RemoteError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RemoteError::UrlEndsInDirectory { url } => write!(f, "Download URL ends in a directory: {}", url),
      RemoteError::UrlHasNoFilename { url } => write!(f, "Download URL has no filename: {}", url),
      RemoteError::CommandFailed { command, status, stderr } => {
        let status = status.map(|s| s.to_string()).unwrap_or_else(|| "signal".to_string());
        write!(f, "Remote command failed (exit {}): {}\n{}", status, command, stderr.trim())
      }
      RemoteError::Stream { path, reason } => write!(f, "Transfer to {} failed: {}", path, reason),
      RemoteError::BadTimestamp { path, output } => {
        write!(f, "Unexpected modification time for {}: '{}'", path, output.trim())
      }
    }
  }
}

/// Result type alias for plugin-release
pub type ReleaseResult<T> = Result<T, ReleaseError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> ReleaseResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> ReleaseResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<ReleaseError>,
{
  fn context(self, ctx: impl Into<String>) -> ReleaseResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> ReleaseResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &ReleaseError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}

/// Append an error and its help text to the run log
pub fn log_error(log: &RunLog, error: &ReleaseError) {
  log.error(error.to_string());
  if let Some(help) = error.help_message() {
    log.error(format!("help: {}", help));
  }
}

/// Side-stage collaborators report through anyhow
impl From<anyhow::Error> for ReleaseError {
  fn from(err: anyhow::Error) -> Self {
    ReleaseError::message(format!("{:#}", err))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_exit_codes_by_category() {
    assert_eq!(ReleaseError::from(AuthError::NoAuthMethod).exit_code(), ExitCode::Validation);
    assert_eq!(
      ReleaseError::from(SourceError::NoVersionFound { path: "p.php".into() }).exit_code(),
      ExitCode::User
    );
    assert_eq!(
      ReleaseError::from(RemoteError::UrlEndsInDirectory { url: "https://x/".into() }).exit_code(),
      ExitCode::Validation
    );
    assert_eq!(
      ReleaseError::from(io::Error::other("boom")).exit_code(),
      ExitCode::System
    );
  }

  #[test]
  fn test_context_keeps_category() {
    let err = ReleaseError::from(AuthError::NoAuthMethod).context("while uploading");
    assert!(matches!(err, ReleaseError::Auth(AuthError::NoAuthMethod)));
  }

  #[test]
  fn test_context_wraps_io() {
    let result: Result<(), io::Error> = Err(io::Error::other("disk full"));
    let err = result.context("Failed to write x").unwrap_err();
    let text = err.to_string();
    assert!(text.starts_with("Failed to write x"));
    assert!(text.contains("disk full"));
  }

  #[test]
  fn test_help_for_missing_integration() {
    let err = ReleaseError::from(SourceError::MissingIntegration { path: "plugin.php".into() });
    assert!(err.to_string().contains("plugin.php"));
    assert!(err.help_message().unwrap_or_default().contains("buildUpdateChecker"));
  }
}
