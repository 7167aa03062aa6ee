//! Release configuration (update.config)
//!
//! The file lives next to the plugin source. JSON is the native format; a TOML
//! rendition is accepted as well. Defaults and secret flags are declared once in
//! [`FIELD_SPECS`] and applied to the raw document before the typed decode, so
//! the rest of the pipeline only ever sees a fully populated [`ReleaseConfig`].

use crate::core::error::{ConfigError, ReleaseError, ReleaseResult};
use crate::core::version::VersionPolicy;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Config file name inside the working directory
pub const CONFIG_FILE: &str = "update.config";

/// Run log file name inside the working directory
pub const LOG_FILE: &str = "update.log";

/// Environment variable that overrides `ssh_password`
pub const PASSWORD_ENV: &str = "PLUGIN_RELEASE_SSH_PASSWORD";

/// Current config schema version, written as the default of `version`
pub const SCHEMA_VERSION: i64 = 2;

/// Value kind of a config field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
  Int,
  Str,
  List,
  /// String restricted to the listed spellings
  Choice(&'static [&'static str]),
}

/// Default of a config field; `None` in [`FieldSpec`] means required
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
  Int(i64),
  Str(&'static str),
  EmptyList,
}

impl FieldDefault {
  fn to_value(self) -> Value {
    match self {
      FieldDefault::Int(n) => Value::from(n),
      FieldDefault::Str(s) => Value::from(s),
      FieldDefault::EmptyList => Value::Array(Vec::new()),
    }
  }
}

/// Schema descriptor for one config field
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
  pub name: &'static str,
  pub kind: FieldKind,
  pub default: Option<FieldDefault>,
  pub secret: bool,
}

const fn field(name: &'static str, kind: FieldKind, default: Option<FieldDefault>) -> FieldSpec {
  FieldSpec {
    name,
    kind,
    default,
    secret: false,
  }
}

/// Every field of update.config, in display order
pub const FIELD_SPECS: &[FieldSpec] = &[
  field("version", FieldKind::Int, Some(FieldDefault::Int(SCHEMA_VERSION))),
  field("main_php_file", FieldKind::Str, None),
  field("skip_pattern", FieldKind::List, Some(FieldDefault::EmptyList)),
  field(
    "transport",
    FieldKind::Choice(&["ssh", "local"]),
    Some(FieldDefault::Str("ssh")),
  ),
  field("ssh_host", FieldKind::Str, Some(FieldDefault::Str(""))),
  field("ssh_port", FieldKind::Str, Some(FieldDefault::Str("22"))),
  field("ssh_dir_base", FieldKind::Str, Some(FieldDefault::Str(""))),
  field("ssh_user", FieldKind::Str, Some(FieldDefault::Str(""))),
  field("ssh_key_file", FieldKind::Str, Some(FieldDefault::Str(""))),
  FieldSpec {
    name: "ssh_password",
    kind: FieldKind::Str,
    default: Some(FieldDefault::Str("")),
    secret: true,
  },
  field("ssh_timeout", FieldKind::Int, Some(FieldDefault::Int(30))),
  field(
    "version_policy",
    FieldKind::Choice(&["longer-wins", "zero-padded"]),
    Some(FieldDefault::Str("longer-wins")),
  ),
];

/// How archives and the descriptor reach the update server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
  /// Shell commands over the system ssh client
  Ssh,
  /// A directory on a local or mounted filesystem
  Local,
}

/// Populated settings for one release run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseConfig {
  /// Config schema version
  pub version: i64,
  /// Main plugin file, relative to the working directory
  pub main_php_file: String,
  /// Extra archive exclusion globs
  pub skip_pattern: Vec<String>,
  pub transport: Transport,
  pub ssh_host: String,
  pub ssh_port: String,
  /// Remote directory that corresponds to the web root of the download URL
  #[serde(alias = "remote_dir_base")]
  pub ssh_dir_base: String,
  pub ssh_user: String,
  pub ssh_key_file: String,
  pub ssh_password: String,
  /// Connection handshake timeout in seconds
  pub ssh_timeout: i64,
  pub version_policy: VersionPolicy,
}

/// Result of loading update.config
#[derive(Debug, Clone)]
pub struct LoadedConfig {
  pub config: ReleaseConfig,
  /// Path the config was read from
  pub path: PathBuf,
  /// Top-level keys not described by [`FIELD_SPECS`]
  pub unknown_keys: Vec<String>,
}

impl ReleaseConfig {
  /// Path of update.config inside a working directory
  pub fn config_path(work_dir: &Path) -> PathBuf {
    work_dir.join(CONFIG_FILE)
  }

  /// Load update.config from the working directory
  pub fn load(work_dir: &Path) -> ReleaseResult<LoadedConfig> {
    let path = Self::config_path(work_dir);
    if !path.is_file() {
      return Err(ReleaseError::Config(ConfigError::NotFound {
        work_dir: work_dir.to_path_buf(),
      }));
    }

    let content = fs::read_to_string(&path).map_err(|e| {
      ReleaseError::Config(ConfigError::Invalid {
        path: path.clone(),
        reason: e.to_string(),
      })
    })?;

    let (config, unknown_keys) = Self::parse(&content).map_err(|err| match err {
      ReleaseError::Message { message, .. } => ReleaseError::Config(ConfigError::Invalid {
        path: path.clone(),
        reason: message,
      }),
      other => other,
    })?;

    Ok(LoadedConfig {
      config: config.with_env_overrides(),
      path,
      unknown_keys,
    })
  }

  /// Parse config text (JSON, or TOML when it does not start with `{`)
  pub fn parse(content: &str) -> ReleaseResult<(Self, Vec<String>)> {
    let raw: Value = if content.trim_start().starts_with('{') {
      serde_json::from_str(content)?
    } else {
      toml_edit::de::from_str(content)?
    };

    let Value::Object(mut map) = raw else {
      return Err(ReleaseError::message("config must be a JSON object or a TOML table"));
    };

    let unknown_keys = map
      .keys()
      .filter(|k| !FIELD_SPECS.iter().any(|spec| spec.name == k.as_str()))
      .cloned()
      .collect();

    apply_defaults(&mut map)?;
    validate_choices(&map)?;

    let config: ReleaseConfig = serde_json::from_value(Value::Object(map))?;
    Ok((config, unknown_keys))
  }

  fn with_env_overrides(mut self) -> Self {
    if let Ok(password) = std::env::var(PASSWORD_ENV)
      && !password.is_empty()
    {
      self.ssh_password = password;
    }
    self
  }

  /// Whether an upload target is configured for the selected transport
  pub fn upload_enabled(&self) -> bool {
    match self.transport {
      Transport::Ssh => !self.ssh_host.is_empty() && !self.ssh_user.is_empty(),
      Transport::Local => !self.ssh_dir_base.is_empty(),
    }
  }

  /// SSH port, falling back to 22 for an empty value
  pub fn port(&self) -> &str {
    if self.ssh_port.trim().is_empty() { "22" } else { self.ssh_port.trim() }
  }

  /// Field/value pairs for logging, secrets masked
  pub fn redacted_summary(&self) -> Vec<(String, String)> {
    let Ok(Value::Object(map)) = serde_json::to_value(self) else {
      return Vec::new();
    };

    FIELD_SPECS
      .iter()
      .filter_map(|spec| {
        let value = map.get(spec.name)?;
        let shown = match value {
          Value::String(s) if spec.secret && !s.is_empty() => "********".to_string(),
          Value::String(s) => s.clone(),
          other => other.to_string(),
        };
        Some((spec.name.to_string(), shown))
      })
      .collect()
  }
}

fn apply_defaults(map: &mut Map<String, Value>) -> ReleaseResult<()> {
  for spec in FIELD_SPECS {
    let present = map.get(spec.name).is_some_and(|v| !v.is_null());
    if present {
      continue;
    }
    match spec.default {
      Some(default) => {
        map.insert(spec.name.to_string(), default.to_value());
      }
      None => {
        return Err(ReleaseError::Config(ConfigError::MissingField {
          field: spec.name.to_string(),
        }));
      }
    }
  }

  // Required strings must not be blank either
  for spec in FIELD_SPECS.iter().filter(|s| s.default.is_none() && s.kind == FieldKind::Str) {
    if map.get(spec.name).and_then(Value::as_str).is_some_and(|s| s.trim().is_empty()) {
      return Err(ReleaseError::Config(ConfigError::MissingField {
        field: spec.name.to_string(),
      }));
    }
  }

  Ok(())
}

fn validate_choices(map: &Map<String, Value>) -> ReleaseResult<()> {
  for spec in FIELD_SPECS {
    let FieldKind::Choice(allowed) = spec.kind else {
      continue;
    };
    let value = map.get(spec.name).and_then(Value::as_str).unwrap_or_default();
    if !allowed.contains(&value) {
      return Err(ReleaseError::Config(ConfigError::InvalidValue {
        field: spec.name.to_string(),
        value: value.to_string(),
      }));
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults_applied() {
    let (config, unknown) = ReleaseConfig::parse(r#"{"main_php_file": "my-plugin.php"}"#).unwrap();
    assert_eq!(config.main_php_file, "my-plugin.php");
    assert_eq!(config.version, SCHEMA_VERSION);
    assert_eq!(config.ssh_port, "22");
    assert_eq!(config.ssh_timeout, 30);
    assert_eq!(config.transport, Transport::Ssh);
    assert_eq!(config.version_policy, VersionPolicy::LongerWins);
    assert!(config.skip_pattern.is_empty());
    assert!(unknown.is_empty());
    assert!(!config.upload_enabled());
  }

  #[test]
  fn test_missing_main_file_is_rejected() {
    let err = ReleaseConfig::parse(r#"{"ssh_host": "example.com"}"#).unwrap_err();
    assert!(matches!(
      err,
      ReleaseError::Config(ConfigError::MissingField { ref field }) if field == "main_php_file"
    ));
  }

  #[test]
  fn test_null_counts_as_missing() {
    let (config, _) = ReleaseConfig::parse(r#"{"main_php_file": "p.php", "ssh_port": null}"#).unwrap();
    assert_eq!(config.ssh_port, "22");
  }

  #[test]
  fn test_unknown_keys_reported() {
    let (_, unknown) =
      ReleaseConfig::parse(r#"{"main_php_file": "p.php", "ssh_secure_password": "x", "legacy": 1}"#).unwrap();
    assert_eq!(unknown, vec!["legacy".to_string(), "ssh_secure_password".to_string()]);
  }

  #[test]
  fn test_invalid_choice() {
    let err = ReleaseConfig::parse(r#"{"main_php_file": "p.php", "transport": "ftp"}"#).unwrap_err();
    assert!(matches!(err, ReleaseError::Config(ConfigError::InvalidValue { .. })));
  }

  #[test]
  fn test_toml_rendition() {
    let toml = r#"
main_php_file = "p.php"
transport = "local"
ssh_dir_base = "/srv/www"
skip_pattern = ["*.log", "node_modules"]
version_policy = "zero-padded"
"#;
    let (config, _) = ReleaseConfig::parse(toml).unwrap();
    assert_eq!(config.transport, Transport::Local);
    assert_eq!(config.skip_pattern, vec!["*.log", "node_modules"]);
    assert_eq!(config.version_policy, VersionPolicy::ZeroPadded);
    assert!(config.upload_enabled());
  }

  #[test]
  fn test_redacted_summary_masks_password() {
    let (config, _) =
      ReleaseConfig::parse(r#"{"main_php_file": "p.php", "ssh_user": "deploy", "ssh_password": "hunter2"}"#)
        .unwrap();
    let summary = config.redacted_summary();
    let password = summary.iter().find(|(k, _)| k == "ssh_password").map(|(_, v)| v.as_str());
    assert_eq!(password, Some("********"));
    let user = summary.iter().find(|(k, _)| k == "ssh_user").map(|(_, v)| v.as_str());
    assert_eq!(user, Some("deploy"));
    assert!(summary.iter().all(|(_, v)| !v.contains("hunter2")));
  }

  #[test]
  fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = ReleaseConfig::load(dir.path()).unwrap_err();
    assert!(matches!(err, ReleaseError::Config(ConfigError::NotFound { .. })));
  }

  #[test]
  fn test_load_malformed_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(CONFIG_FILE), "{ not json").unwrap();
    let err = ReleaseConfig::load(dir.path()).unwrap_err();
    assert!(matches!(err, ReleaseError::Config(ConfigError::Invalid { .. })));
  }
}
