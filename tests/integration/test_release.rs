//! Tests for a full release run

use crate::helpers::*;
use anyhow::Result;

#[test]
fn test_release_builds_patches_and_uploads() -> Result<()> {
  let project = PluginProject::new()?;
  let output = run_plugin_release(&project.path, &["--no-changelog"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("1.1.0"), "stdout: {}", stdout);

  // Source: every declaration at the winning version, registration repointed
  let source = project.read_file("demo-plugin.php")?;
  assert!(source.contains(" * Version: 1.1.0\n"));
  assert!(source.contains("define('DEMO_PLUGIN_VERSION', '1.1.0');"));
  assert!(source.contains("private $version = '1.1.0';"));
  assert!(source.contains("'https://updates.example.com/plugins/demo/update_info.json',\n  __FILE__, // update checker\n  'demo-plugin'"));
  assert!(!source.contains("Last-Update: 2024-01-01 00:00:00"));
  assert_eq!(project.read_file("demo-plugin.php.bak")?, PLUGIN_SOURCE);

  // Archive: slug prefix, exclusions honoured
  assert_eq!(
    project.archive_entries("demo-plugin-v1.1.0.zip")?,
    vec![
      "demo-plugin/demo-plugin.php",
      "demo-plugin/includes/admin.php",
      "demo-plugin/readme.txt"
    ]
  );

  // Descriptor: reconciled, unknown keys kept, HTML left unescaped
  let descriptor = project.descriptor()?;
  assert_eq!(descriptor["version"], "1.1.0");
  assert_eq!(descriptor["slug"], "demo-plugin");
  assert_eq!(
    descriptor["download_url"],
    "https://updates.example.com/plugins/demo/demo-plugin-v1.1.0.zip"
  );
  assert_eq!(descriptor["vendor_extra"]["tier"], 3);
  assert!(project.read_file("Updates/update_info.json")?.contains("<p>Demo & more</p>"));
  assert_eq!(project.read_file("Updates/update_info.json.bak")?, DESCRIPTOR);

  // Server: derived directory holds archive, descriptor and banner
  let remote = project.server.join("plugins/demo");
  assert!(remote.join("demo-plugin-v1.1.0.zip").is_file());
  assert!(remote.join("banner-772x250.png").is_file());
  assert_eq!(
    std::fs::read_to_string(remote.join("update_info.json"))?,
    project.read_file("Updates/update_info.json")?
  );

  // Run log written next to the config
  assert!(project.read_file("update.log")?.contains("INFO"));
  Ok(())
}

#[test]
fn test_second_run_leaves_descriptor_alone() -> Result<()> {
  let project = PluginProject::new()?;
  run_plugin_release(&project.path, &["--no-changelog"])?;
  let first = project.read_file("Updates/update_info.json")?;

  let output = run_plugin_release(&project.path, &["--no-changelog"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);

  assert_eq!(project.read_file("Updates/update_info.json")?, first);
  // No second backup: the .bak still holds the original descriptor
  assert_eq!(project.read_file("Updates/update_info.json.bak")?, DESCRIPTOR);
  assert!(stdout.contains("update_info.json unchanged"), "stdout: {}", stdout);
  assert!(
    stdout.contains("update_info.json is already current on the server"),
    "stdout: {}",
    stdout
  );
  Ok(())
}

#[test]
fn test_no_upload_flag() -> Result<()> {
  let project = PluginProject::new()?;
  run_plugin_release(&project.path, &["--no-changelog", "--no-upload"])?;

  assert!(project.file_exists("Updates/demo-plugin-v1.1.0.zip"));
  assert!(!project.server.join("plugins").exists());
  Ok(())
}

#[test]
fn test_missing_integration_call_fails() -> Result<()> {
  let project = PluginProject::new()?;
  project.write_file("demo-plugin.php", "<?php\n/**\n * Version: 2.0.0\n */\n")?;

  let output = release_command(&project.path, &["--no-changelog"]).output()?;
  assert_eq!(output.status.code(), Some(1));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("demo-plugin.php"), "stderr: {}", stderr);

  // Fail-fast: nothing archived, descriptor untouched, error logged
  assert!(!project.file_exists("Updates/demo-plugin-v2.0.0.zip"));
  assert_eq!(project.read_file("Updates/update_info.json")?, DESCRIPTOR);
  assert!(project.read_file("update.log")?.contains("ERROR"));
  Ok(())
}

#[test]
fn test_unreachable_server_is_not_fatal() -> Result<()> {
  let project = PluginProject::new()?;
  // ssh transport with no credentials: upload fails, the release still succeeds
  project.write_config(serde_json::json!({
    "main_php_file": "demo-plugin.php",
    "ssh_host": "updates.invalid",
    "ssh_user": "deploy",
    "ssh_dir_base": "/var/www",
  }))?;

  let output = run_plugin_release(&project.path, &["--no-changelog"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("upload stage failed"), "stdout: {}", stdout);
  assert!(project.file_exists("Updates/demo-plugin-v1.1.0.zip"));
  Ok(())
}
