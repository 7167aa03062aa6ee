//! Tests for working directory and update.config handling

use crate::helpers::*;
use anyhow::Result;

#[test]
fn test_missing_config_fails_and_is_logged() -> Result<()> {
  let temp = tempfile::TempDir::new()?;

  let output = release_command(temp.path(), &[]).output()?;
  assert_eq!(output.status.code(), Some(1));
  assert!(String::from_utf8_lossy(&output.stderr).contains("update.config"));
  let logged = std::fs::read_to_string(temp.path().join("update.log"))?;
  assert!(logged.contains("ERROR"));
  Ok(())
}

#[test]
fn test_missing_work_dir_fails() -> Result<()> {
  let temp = tempfile::TempDir::new()?;
  let output = release_command(&temp.path().join("nope"), &[]).output()?;
  assert_eq!(output.status.code(), Some(1));
  Ok(())
}

#[test]
fn test_invalid_transport_is_rejected() -> Result<()> {
  let project = PluginProject::new()?;
  project.write_config(serde_json::json!({
    "main_php_file": "demo-plugin.php",
    "transport": "ftp",
  }))?;

  let output = release_command(&project.path, &["--no-changelog"]).output()?;
  assert_eq!(output.status.code(), Some(1));
  assert!(String::from_utf8_lossy(&output.stderr).contains("transport"));
  // Nothing touched before the config was accepted, but the failure is logged
  assert_eq!(project.read_file("demo-plugin.php")?, PLUGIN_SOURCE);
  assert!(project.read_file("update.log")?.contains("ERROR"));
  Ok(())
}

#[test]
fn test_toml_config_is_accepted() -> Result<()> {
  let project = PluginProject::new()?;
  project.write_file(
    "update.config",
    "main_php_file = \"demo-plugin.php\"\nskip_pattern = [\"*.log\", \"readme.txt\"]\n",
  )?;

  run_plugin_release(&project.path, &["--no-changelog"])?;
  assert_eq!(
    project.archive_entries("demo-plugin-v1.1.0.zip")?,
    vec!["demo-plugin/demo-plugin.php", "demo-plugin/includes/admin.php"]
  );
  Ok(())
}
