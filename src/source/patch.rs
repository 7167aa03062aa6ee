//! In-place rewrite of the plugin source
//!
//! One pass aligns every version declaration with the winner, refreshes (or
//! inserts) the `Last-Update:` marker and repoints the update-checker
//! registration:
//!
//! ```text
//! PucFactory::buildUpdateChecker(
//!   'https://example.com/updates/update_info.json',   <- descriptor URL
//!   __FILE__, // optional comment
//!   'my-plugin'                                       <- slug
//! );
//! ```

use crate::core::error::{ReleaseResult, ResultExt, SourceError};
use crate::source::edit::{Edit, apply_edits};
use crate::source::extract::{Extraction, compile};
use crate::utils::replace_with_backup;
use regex::Regex;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Timestamp format of the `Last-Update:` marker
pub const MARKER_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static LAST_UPDATE: LazyLock<Regex> = LazyLock::new(|| {
  compile(
    r"(?is)(?:/\*.*?\bLast-Update:\s*|//\s*Last-Update:\s*)([0-9]{4}-[0-9]{2}-[0-9]{2}(?: [0-9]{2}:[0-9]{2}(?::[0-9]{2})?)?)",
  )
});

static UPDATE_CHECKER: LazyLock<Regex> = LazyLock::new(|| {
  compile(
    r"(?s)\$?[a-zA-Z0-9_]*::buildUpdateChecker\(\s*'([^']*)'\s*,\s*__FILE__,\s*(//[^\n]*)?\s*'([-_a-zA-Z0-9]*)'\s*\)",
  )
});

/// The update-checker registration as found in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrationCall {
  pub url: String,
  pub url_span: Range<usize>,
  pub comment: Option<String>,
  pub slug: String,
  pub slug_span: Range<usize>,
}

impl IntegrationCall {
  /// Locate the registration call; absent or empty URL is `MissingIntegration`
  pub fn find(path: &Path, text: &str) -> ReleaseResult<Self> {
    let missing = || SourceError::MissingIntegration { path: path.to_path_buf() };

    let caps = UPDATE_CHECKER.captures(text).ok_or_else(missing)?;
    let (Some(url), Some(slug)) = (caps.get(1), caps.get(3)) else {
      return Err(missing().into());
    };
    if url.as_str().is_empty() {
      return Err(missing().into());
    }

    Ok(Self {
      url: url.as_str().to_string(),
      url_span: url.range(),
      comment: caps.get(2).map(|c| c.as_str().trim().to_string()),
      slug: slug.as_str().to_string(),
      slug_span: slug.range(),
    })
  }
}

/// Values the registration call must reference after the patch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrationTarget {
  /// Public URL of the update descriptor
  pub url: String,
  pub slug: String,
}

/// Patched source text plus a description of every change
#[derive(Debug, Clone)]
pub struct PatchOutcome {
  pub text: String,
  pub integration: IntegrationCall,
  pub changes: Vec<String>,
}

/// Rewrites the plugin source for a release
pub struct SourcePatcher<'a> {
  path: &'a Path,
  timestamp: String,
}

impl<'a> SourcePatcher<'a> {
  /// `timestamp` is written into the `Last-Update:` marker verbatim
  pub fn new(path: &'a Path, timestamp: impl Into<String>) -> Self {
    Self {
      path,
      timestamp: timestamp.into(),
    }
  }

  /// Compute the patched text; nothing is written
  pub fn patch(&self, text: &str, extraction: &Extraction, target: &IntegrationTarget) -> ReleaseResult<PatchOutcome> {
    let integration = IntegrationCall::find(self.path, text)?;

    let mut edits = Vec::new();
    let mut changes = Vec::new();

    for decl in extraction.stale() {
      edits.push(Edit::replace(decl.span.clone(), extraction.winner.clone(), decl.kind.to_string()));
      changes.push(format!("{} {} -> {}", decl.kind, decl.value, extraction.winner));
    }

    if let Some(m) = LAST_UPDATE.captures(text).and_then(|c| c.get(1)) {
      edits.push(Edit::replace(m.range(), self.timestamp.clone(), "Last-Update"));
      changes.push(format!("Last-Update -> {}", self.timestamp));
    } else if let Some(doc) = extraction.doc_comment() {
      let prefix = marker_prefix(text, doc.span.start);
      edits.push(Edit::insert(
        doc.span.end,
        format!("\n{}Last-Update: {}", prefix, self.timestamp),
        "Last-Update",
      ));
      changes.push(format!("Last-Update added: {}", self.timestamp));
    }

    if integration.slug != target.slug {
      edits.push(Edit::replace(integration.slug_span.clone(), target.slug.clone(), "update-checker slug"));
      changes.push(format!("update-checker slug '{}' -> '{}'", integration.slug, target.slug));
    }
    if integration.url != target.url {
      edits.push(Edit::replace(integration.url_span.clone(), target.url.clone(), "update-checker URL"));
      changes.push(format!("update-checker URL {} -> {}", integration.url, target.url));
    }

    let text = apply_edits(text, edits)?;
    Ok(PatchOutcome {
      text,
      integration,
      changes,
    })
  }

  /// Rename the source to `<file>.bak` and write the patched text
  pub fn write(&self, text: &str) -> ReleaseResult<PathBuf> {
    replace_with_backup(self.path, text.as_bytes())
      .with_context(|| format!("Failed to replace {} (backup: {}.bak)", self.path.display(), self.path.display()))
  }
}

/// Leading decoration of the doc-comment version line (e.g. ` * `)
fn marker_prefix(text: &str, value_start: usize) -> &str {
  let line_start = text[..value_start].rfind('\n').map(|i| i + 1).unwrap_or(0);
  let line = &text[line_start..value_start];
  match line.to_ascii_lowercase().rfind("version:") {
    Some(at) => &line[..at],
    None => "",
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::error::ReleaseError;
  use crate::source::extract::VersionExtractor;
  use std::fs;

  const NOW: &str = "2025-11-06 10:20:30";

  fn target() -> IntegrationTarget {
    IntegrationTarget {
      url: "https://example.com/updates/update_info.json".to_string(),
      slug: "my-plugin".to_string(),
    }
  }

  fn patch(text: &str) -> ReleaseResult<PatchOutcome> {
    let path = Path::new("my-plugin.php");
    let extraction = VersionExtractor::default().extract(path, text)?;
    SourcePatcher::new(path, NOW).patch(text, &extraction, &target())
  }

  const SOURCE: &str = r#"<?php
/**
 * Plugin Name: My Plugin
 * Version: 1.0.0
 * Last-Update: 2024-01-01
 */
class My_Plugin {
  private $version = '1.2.0';
}
$checker = PucFactory::buildUpdateChecker('https://example.com/updates/update_info.json', __FILE__, 'my-plugin');
"#;

  #[test]
  fn test_versions_converge_and_other_bytes_survive() {
    let source = SOURCE.replace(" * Last-Update: 2024-01-01\n", "");
    let source = source.replace(" * Version: 1.0.0\n", " * Version: 1.0.0\n * Last-Update: 2024-01-01 09:00\n");
    let outcome = patch(&source).unwrap();

    let expected = source
      .replace("Version: 1.0.0", "Version: 1.2.0")
      .replace("2024-01-01 09:00", NOW);
    assert_eq!(outcome.text, expected);
  }

  #[test]
  fn test_only_value_spans_change() {
    let text = "<?php\n/* Version: 1.0.0\n   Last-Update: 2024-01-01 00:00:00 */\n// keep me\nclass A { private $version = '1.2.0'; }\n\\Puc::buildUpdateChecker('https://example.com/updates/update_info.json', __FILE__, 'my-plugin');\n";
    let outcome = patch(text).unwrap();
    let decls = VersionExtractor::declarations(&outcome.text);
    assert!(decls.iter().all(|d| d.value == "1.2.0"));

    let comment = VersionExtractor::declarations(text)[0].span.clone();
    assert_eq!(&outcome.text[..comment.start], &text[..comment.start]);
    assert_eq!(&outcome.text[comment.clone()], "1.2.0");

    // Both replacements keep their length, so offsets line up
    let date_at = text.find("2024-01-01").unwrap();
    assert_eq!(&outcome.text[comment.end..date_at], &text[comment.end..date_at]);
    assert_eq!(&outcome.text[date_at..date_at + NOW.len()], NOW);
    assert_eq!(&outcome.text[date_at + NOW.len()..], &text[date_at + NOW.len()..]);
  }

  #[test]
  fn test_last_update_inserted_after_version_line() {
    let text = SOURCE.replace(" * Last-Update: 2024-01-01\n", "");
    let outcome = patch(&text).unwrap();
    assert!(outcome.text.contains(&format!(" * Version: 1.2.0\n * Last-Update: {}\n */", NOW)));
  }

  #[test]
  fn test_integration_rewritten() {
    let text = SOURCE.replace(
      "'https://example.com/updates/update_info.json', __FILE__, 'my-plugin'",
      "'https://old.example.com/x/update_info.json',\n  __FILE__, // keep\n  'old-slug'",
    );
    let outcome = patch(&text).unwrap();
    assert_eq!(outcome.integration.comment.as_deref(), Some("// keep"));
    assert!(outcome.text.contains(
      "'https://example.com/updates/update_info.json',\n  __FILE__, // keep\n  'my-plugin'"
    ));
    assert_eq!(outcome.changes.iter().filter(|c| c.starts_with("update-checker")).count(), 2);
  }

  #[test]
  fn test_missing_integration() {
    let text = "<?php\n/* Version: 1.0 */\n";
    let err = patch(text).unwrap_err();
    assert!(matches!(
      err,
      ReleaseError::Source(SourceError::MissingIntegration { ref path }) if path == Path::new("my-plugin.php")
    ));
  }

  #[test]
  fn test_empty_integration_url() {
    let text = "<?php\n/* Version: 1.0 */\nPuc::buildUpdateChecker('', __FILE__, 'x');\n";
    assert!(matches!(
      patch(text).unwrap_err(),
      ReleaseError::Source(SourceError::MissingIntegration { .. })
    ));
  }

  #[test]
  fn test_write_keeps_backup() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("my-plugin.php");
    fs::write(&path, SOURCE).unwrap();

    let extraction = VersionExtractor::default().extract(&path, SOURCE).unwrap();
    let patcher = SourcePatcher::new(&path, NOW);
    let outcome = patcher.patch(SOURCE, &extraction, &target()).unwrap();
    let backup = patcher.write(&outcome.text).unwrap();

    assert_eq!(fs::read_to_string(&backup).unwrap(), SOURCE);
    assert_eq!(fs::read_to_string(&path).unwrap(), outcome.text);
  }
}
