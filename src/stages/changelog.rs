//! CHANGELOG.md capture for the released version
//!
//! The text for a version comes from its existing CHANGELOG.md section plus the
//! files git reports as changed, or from a line typed at the prompt. Accepted
//! text is written back to CHANGELOG.md and returned so the caller can store it
//! in the descriptor.

use crate::stages::vcs::Git;
use crate::ui::log::RunLog;
use crate::utils::{env_flag, is_interactive};
use anyhow::{Context, Result};
use regex::Regex;
use std::fs;
use std::io::{self, BufRead, Write};
use std::ops::Range;
use std::path::Path;

pub const CHANGELOG_FILE: &str = "CHANGELOG.md";

/// Header of the section for `version`: `## [1.2.3]`, `## 1.2.3 - date`, ...
fn section_header(version: &str) -> Result<Regex> {
  let pattern = format!(r"(?im)^##[ \t]*\[?{}\]?(?:[^0-9.\n]|$)", regex::escape(version));
  Regex::new(&pattern).context("invalid changelog header pattern")
}

/// Byte range of the whole section (header line included) for `version`
fn section_range(content: &str, version: &str) -> Result<Option<Range<usize>>> {
  let Some(header) = section_header(version)?.find(content) else {
    return Ok(None);
  };
  let start = header.start();

  // The section ends where the next line starting with `##` begins
  let mut end = content.len();
  let mut offset = content[start..].find('\n').map_or(content.len(), |i| start + i + 1);
  while offset < content.len() {
    if content[offset..].starts_with("##") {
      end = offset;
      break;
    }
    offset = content[offset..].find('\n').map_or(content.len(), |i| offset + i + 1);
  }
  Ok(Some(start..end))
}

/// Body of the section for `version`, without its header line
pub fn read_section(content: &str, version: &str) -> Result<Option<String>> {
  let Some(range) = section_range(content, version)? else {
    return Ok(None);
  };
  let section = &content[range];
  let body = section.split_once('\n').map_or("", |(_, body)| body).trim();
  Ok((!body.is_empty()).then(|| body.to_string()))
}

/// CHANGELOG.md content with the section for `version` set to `text`
///
/// An existing section is replaced in place. A new one goes right after the
/// `# Changelog` title, which is created when missing.
pub fn write_section(content: Option<&str>, version: &str, date: &str, text: &str) -> Result<String> {
  let entry = format!("## [{}] - {}\n\n{}\n", version, date, text.trim());

  let Some(content) = content else {
    return Ok(format!("# Changelog\n\n{}", entry));
  };

  if let Some(range) = section_range(content, version)? {
    let separator = if range.end < content.len() { "\n" } else { "" };
    return Ok(format!(
      "{}{}{}{}",
      &content[..range.start],
      entry,
      separator,
      &content[range.end..]
    ));
  }

  let title = Regex::new(r"(?i)\A#[ \t]*Changelog[ \t]*\n").context("invalid changelog title pattern")?;
  match title.find(content) {
    Some(m) => {
      let rest = content[m.end()..].trim_start_matches('\n');
      let separator = if rest.is_empty() { "" } else { "\n" };
      Ok(format!("{}\n{}{}{}", &content[..m.end()], entry, separator, rest))
    }
    None => Ok(format!("# Changelog\n\n{}\n{}", entry, content)),
  }
}

/// Proposed changelog text: the existing section, then changed files that it
/// does not mention yet
pub fn preview(existing: Option<&str>, changed_files: &[String]) -> String {
  let existing = existing.unwrap_or_default().trim();
  let new_files: Vec<&String> = changed_files.iter().filter(|f| !existing.contains(f.as_str())).collect();

  let mut text = existing.to_string();
  if !new_files.is_empty() {
    if !text.is_empty() {
      text.push_str("\n\n");
    }
    text.push_str("Changed files:");
    for file in new_files {
      text.push_str("\n- ");
      text.push_str(file);
    }
  }
  text
}

/// Pick the changelog text: preview when unattended, otherwise the prompt
fn choose_text(version: &str, preview: String, log: &RunLog) -> String {
  if !preview.is_empty() {
    println!("Changelog preview:\n{}\n", preview);
  }

  if env_flag("SKIP_CHANGELOG_INPUT") || env_flag("AUTO_CHANGELOG") {
    log.info("Using the generated changelog (SKIP_CHANGELOG_INPUT or AUTO_CHANGELOG is set)");
    return preview;
  }
  if !is_interactive() {
    log.info("Non-interactive terminal, using the generated changelog");
    return preview;
  }

  print!("Changelog for {} (Enter keeps the preview): ", version);
  let _ = io::stdout().flush();
  let mut answer = String::new();
  if io::stdin().lock().read_line(&mut answer).is_err() {
    log.warn("Could not read the changelog input, using the preview");
    return preview;
  }

  let answer = answer.trim();
  if answer.is_empty() { preview } else { answer.to_string() }
}

/// Capture the changelog of `version`
///
/// Returns the accepted text, or `None` when there is nothing to record.
pub fn run(work_dir: &Path, version: &str, log: &RunLog) -> Result<Option<String>> {
  log.info(format!("📒 Reading changelog for {}...", version));
  let path = work_dir.join(CHANGELOG_FILE);

  let content = match fs::read_to_string(&path) {
    Ok(content) => Some(content),
    Err(e) if e.kind() == io::ErrorKind::NotFound => None,
    Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
  };

  let existing = match &content {
    Some(content) => read_section(content, version)?,
    None => None,
  };

  let changed = Git::open(work_dir).map(|git| git.changed_files()).unwrap_or_default();
  log.detail(format!("{} changed file(s) detected", changed.len()));

  let text = choose_text(version, preview(existing.as_deref(), &changed), log);
  if text.trim().is_empty() {
    log.info("No changelog text for this release");
    return Ok(None);
  }

  let date = chrono::Local::now().format("%Y-%m-%d").to_string();
  let updated = write_section(content.as_deref(), version, &date, &text)?;
  if content.as_deref() != Some(updated.as_str()) {
    fs::write(&path, &updated).with_context(|| format!("Failed to write {}", path.display()))?;
    log.info(format!("✅ {} updated", CHANGELOG_FILE));
  }

  Ok(Some(text.trim().to_string()))
}

#[cfg(test)]
mod tests {
  use super::*;

  const LOG: &str = "# Changelog\n\n## [1.2.0] - 2024-05-01\n\n- Faster sync\n\n## [1.1.0] - 2024-04-01\n\n- First\n";

  #[test]
  fn test_read_section() {
    assert_eq!(read_section(LOG, "1.2.0").unwrap().as_deref(), Some("- Faster sync"));
    assert_eq!(read_section(LOG, "1.1.0").unwrap().as_deref(), Some("- First"));
    assert_eq!(read_section(LOG, "1.2").unwrap(), None);
    assert_eq!(read_section("## 2.0\nplain header\n", "2.0").unwrap().as_deref(), Some("plain header"));
  }

  #[test]
  fn test_replace_existing_section() {
    let out = write_section(Some(LOG), "1.2.0", "2024-06-01", "- Rewritten").unwrap();
    assert_eq!(
      out,
      "# Changelog\n\n## [1.2.0] - 2024-06-01\n\n- Rewritten\n\n## [1.1.0] - 2024-04-01\n\n- First\n"
    );
  }

  #[test]
  fn test_insert_after_title() {
    let out = write_section(Some(LOG), "1.3.0", "2024-07-01", "- New").unwrap();
    assert!(out.starts_with("# Changelog\n\n## [1.3.0] - 2024-07-01\n\n- New\n\n## [1.2.0]"));
  }

  #[test]
  fn test_create_and_prepend() {
    assert_eq!(
      write_section(None, "1.0", "2024-01-01", "Hello").unwrap(),
      "# Changelog\n\n## [1.0] - 2024-01-01\n\nHello\n"
    );
    let out = write_section(Some("Old notes\n"), "1.0", "2024-01-01", "Hello").unwrap();
    assert!(out.starts_with("# Changelog\n\n## [1.0] - 2024-01-01\n\nHello\n\nOld notes"));
  }

  #[test]
  fn test_rewrite_is_stable() {
    let once = write_section(Some(LOG), "1.2.0", "2024-05-01", "- Faster sync").unwrap();
    assert_eq!(once, LOG);
  }

  #[test]
  fn test_preview_lists_new_files_only() {
    let files = vec!["src/a.php".to_string(), "readme.txt".to_string()];
    assert_eq!(preview(None, &files), "Changed files:\n- src/a.php\n- readme.txt");
    assert_eq!(
      preview(Some("Changed files:\n- src/a.php"), &files),
      "Changed files:\n- src/a.php\n\nChanged files:\n- readme.txt"
    );
    assert_eq!(preview(Some("- a"), &[]), "- a");
  }
}
