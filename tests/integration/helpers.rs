//! Test helpers for integration tests

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

pub const PLUGIN_SOURCE: &str = r#"<?php
/**
 * Plugin Name: Demo Plugin
 * Version: 1.0.0
 * Last-Update: 2024-01-01 00:00:00
 */

define('DEMO_PLUGIN_VERSION', '1.0.0');

class Demo_Plugin {
  private $version = '1.1.0';
}

$checker = YahnisElsts\PluginUpdateChecker\v5\PucFactory::buildUpdateChecker(
  'https://updates.example.com/old/update_info.json',
  __FILE__, // update checker
  'demo-plugin'
);
"#;

pub const DESCRIPTOR: &str = r#"{
  "name": "Demo Plugin",
  "version": "1.0.0",
  "download_url": "https://updates.example.com/plugins/demo/demo-plugin-v1.0.0.zip",
  "sections": {
    "description": "<p>Demo & more</p>"
  },
  "banners": {
    "low": "https://updates.example.com/plugins/demo/banner-772x250.png"
  },
  "vendor_extra": {"tier": 3}
}
"#;

/// A plugin directory plus a local "server" directory
pub struct PluginProject {
  _root: TempDir,
  _server: TempDir,
  pub path: PathBuf,
  pub server: PathBuf,
}

impl PluginProject {
  /// Create a plugin with update.config using the local transport
  pub fn new() -> Result<Self> {
    let root = TempDir::new()?;
    let server = TempDir::new()?;
    let path = root.path().to_path_buf();
    let server_path = server.path().to_path_buf();

    std::fs::write(path.join("demo-plugin.php"), PLUGIN_SOURCE)?;
    std::fs::create_dir_all(path.join("includes"))?;
    std::fs::write(path.join("includes/admin.php"), "<?php\n// admin\n")?;
    std::fs::write(path.join("readme.txt"), "=== Demo Plugin ===\n")?;
    std::fs::write(path.join("debug.log"), "noise\n")?;
    std::fs::write(path.join(".DS_Store"), "")?;

    std::fs::create_dir_all(path.join("Updates"))?;
    std::fs::write(path.join("Updates/update_info.json"), DESCRIPTOR)?;
    std::fs::write(path.join("Updates/banner-772x250.png"), b"\x89PNG banner")?;

    let project = Self {
      _root: root,
      _server: server,
      path,
      server: server_path,
    };
    project.write_config(serde_json::json!({
      "version": 2,
      "main_php_file": "demo-plugin.php",
      "skip_pattern": ["*.log"],
      "transport": "local",
      "ssh_dir_base": project.server.to_string_lossy(),
    }))?;
    Ok(project)
  }

  /// Replace update.config
  pub fn write_config(&self, config: serde_json::Value) -> Result<()> {
    std::fs::write(self.path.join("update.config"), serde_json::to_string_pretty(&config)?)?;
    Ok(())
  }

  /// Check if a file exists
  pub fn file_exists(&self, path: &str) -> bool {
    self.path.join(path).exists()
  }

  /// Read a file
  pub fn read_file(&self, path: &str) -> Result<String> {
    Ok(std::fs::read_to_string(self.path.join(path))?)
  }

  /// Write a file
  pub fn write_file(&self, path: &str, content: &str) -> Result<()> {
    Ok(std::fs::write(self.path.join(path), content)?)
  }

  /// Parsed Updates/update_info.json
  pub fn descriptor(&self) -> Result<serde_json::Value> {
    Ok(serde_json::from_str(&self.read_file("Updates/update_info.json")?)?)
  }

  /// Entry names of an archive in Updates/
  pub fn archive_entries(&self, name: &str) -> Result<Vec<String>> {
    let file = std::fs::File::open(self.path.join("Updates").join(name))?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut names = Vec::new();
    for i in 0..archive.len() {
      names.push(archive.by_index(i)?.name().to_string());
    }
    Ok(names)
  }
}

/// Run plugin-release without side stages that need a terminal or network
pub fn release_command(work_dir: &Path, args: &[&str]) -> Command {
  let bin = env!("CARGO_BIN_EXE_plugin-release");
  let mut cmd = Command::new(bin);
  cmd
    .arg(work_dir)
    .args(["--no-git", "--no-images"])
    .args(args)
    .env_remove("PLUGIN_RELEASE_SSH_PASSWORD")
    .env_remove("AUTO_GITHUB_UPDATE");
  cmd
}

/// Run plugin-release and require success
pub fn run_plugin_release(work_dir: &Path, args: &[&str]) -> Result<Output> {
  let output = release_command(work_dir, args)
    .output()
    .context("Failed to run plugin-release")?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    anyhow::bail!(
      "plugin-release failed: {}\nstdout: {}\nstderr: {}",
      args.join(" "),
      stdout,
      stderr
    );
  }

  Ok(output)
}
