//! Version-control bookkeeping through the system git binary
//!
//! After a release the working tree is committed, tagged `v<version>` and
//! pushed, for projects hosted on GitHub. Every step shells out to `git` with
//! an isolated environment.

use crate::ui::log::RunLog;
use crate::utils::{env_flag, is_interactive};
use anyhow::{Context, Result, bail};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Answers that approve the prompt (English and German)
const APPROVALS: &[&str] = &["y", "yes", "j", "ja"];

/// Thin wrapper around `git -C <dir>`
pub struct Git {
  work_dir: PathBuf,
}

impl Git {
  /// Open the working directory if it has its own `.git`
  pub fn open(work_dir: &Path) -> Option<Self> {
    work_dir.join(".git").exists().then(|| Self {
      work_dir: work_dir.to_path_buf(),
    })
  }

  /// Build a git command with an isolated environment
  fn git_cmd(&self) -> Command {
    let mut cmd = Command::new("git");
    cmd.arg("-C").arg(&self.work_dir);

    // Don't trust the caller's environment; keep what push and commit need
    cmd.env_clear();
    for key in ["PATH", "HOME", "SSH_AUTH_SOCK"] {
      if let Ok(value) = std::env::var(key) {
        cmd.env(key, value);
      }
    }

    cmd.arg("-c").arg("advice.detachedHead=false");
    cmd.arg("-c").arg("core.quotePath=false");
    cmd
  }

  fn output(&self, args: &[&str]) -> Result<Output> {
    self
      .git_cmd()
      .args(args)
      .output()
      .with_context(|| format!("Failed to execute git {}", args.join(" ")))
  }

  /// Run git and fail on a non-zero exit
  fn run(&self, args: &[&str]) -> Result<String> {
    let output = self.output(args)?;
    if !output.status.success() {
      bail!(
        "git {} failed: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stderr).trim()
      );
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
  }

  /// Files changed since the last tag (or uncommitted changes without one)
  ///
  /// Any git failure yields an empty list.
  pub fn changed_files(&self) -> Vec<String> {
    let args: Vec<String> = match self.run(&["describe", "--tags", "--abbrev=0"]) {
      Ok(tag) => vec!["diff".into(), "--name-only".into(), tag.trim().to_string(), "HEAD".into()],
      Err(_) => vec!["diff".into(), "--name-only".into(), "HEAD".into()],
    };
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    match self.run(&args) {
      Ok(out) => out.lines().filter(|l| !l.is_empty()).map(str::to_string).collect(),
      Err(_) => Vec::new(),
    }
  }

  /// Whether `.git/config` points at GitHub
  pub fn is_github(&self) -> bool {
    let Ok(config) = fs::read_to_string(self.work_dir.join(".git").join("config")) else {
      return false;
    };
    let config = config.to_lowercase();
    config.contains("github.com") || config.contains("githubusercontent.com")
  }

  pub fn tag_exists(&self, tag: &str) -> Result<bool> {
    let out = self.run(&["tag", "-l", tag])?;
    Ok(out.trim() == tag)
  }

  /// Stage everything and commit; an empty index is not an error
  pub fn commit_all(&self, message: &str) -> Result<bool> {
    self.run(&["add", "-A"])?;
    let commit = self.output(&["commit", "-m", message])?;
    if commit.status.success() {
      return Ok(true);
    }

    let clean = self.output(&["diff", "--cached", "--quiet"])?;
    if clean.status.success() {
      return Ok(false);
    }
    bail!("git commit failed: {}", String::from_utf8_lossy(&commit.stderr).trim())
  }

  /// Create an annotated tag, replacing an existing one locally and remotely
  pub fn retag(&self, tag: &str, message: &str) -> Result<()> {
    let existed = self.tag_exists(tag)?;
    if existed {
      let _ = self.output(&["tag", "-d", tag]);
    }
    self.run(&["tag", "-a", tag, "-m", message])?;
    if existed {
      let _ = self.output(&["push", "origin", &format!(":refs/tags/{}", tag)]);
    }
    self.run(&["push", "origin", tag])?;
    Ok(())
  }

  pub fn push(&self) -> Result<()> {
    self.run(&["push"])?;
    Ok(())
  }
}

/// Whether the bookkeeping is approved for this run
pub fn approved(assume_yes: bool, log: &RunLog) -> bool {
  if assume_yes {
    return true;
  }
  if let Ok(auto) = std::env::var("AUTO_GITHUB_UPDATE")
    && APPROVALS.contains(&auto.trim().to_lowercase().as_str())
  {
    log.info("Auto-approving GitHub update (AUTO_GITHUB_UPDATE is set)");
    return true;
  }
  if env_flag("SKIP_GITHUB_UPDATE") {
    log.info("Skipping GitHub update (SKIP_GITHUB_UPDATE is set)");
    return false;
  }
  if !is_interactive() {
    log.info("Non-interactive terminal, skipping GitHub update");
    return false;
  }

  print!("Commit, tag and push this release to GitHub? [y/N] ");
  let _ = io::stdout().flush();
  let mut answer = String::new();
  if io::stdin().lock().read_line(&mut answer).is_err() {
    return false;
  }
  APPROVALS.contains(&answer.trim().to_lowercase().as_str())
}

/// Commit/tag message for a release
pub fn release_message(changelog: Option<&str>, version: &str) -> String {
  match changelog.map(str::trim) {
    Some(text) if !text.is_empty() => text.to_string(),
    _ => format!("Release version {}", version),
  }
}

/// Commit, tag and push the release
///
/// `changelog` is the plain-text changelog of this version, if any.
pub fn run(work_dir: &Path, version: &str, changelog: Option<&str>, assume_yes: bool, log: &RunLog) -> Result<()> {
  let Some(git) = Git::open(work_dir).filter(Git::is_github) else {
    log.info("No GitHub repository detected, skipping git bookkeeping");
    return Ok(());
  };
  log.info("🐙 GitHub repository detected");

  if !approved(assume_yes, log) {
    log.info("GitHub update skipped");
    return Ok(());
  }

  let message = release_message(changelog, version);
  let tag = format!("v{}", version);

  log.info("📝 Committing changes...");
  if !git.commit_all(&message)? {
    log.detail("nothing to commit");
  }

  log.info(format!("🏷️  Tagging {}...", tag));
  git.retag(&tag, &message)?;

  log.info("⬆️  Pushing...");
  git.push()?;

  log.info(format!("✅ Pushed {} to GitHub", tag));
  Ok(())
}
