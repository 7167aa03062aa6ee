//! Typed view of the update descriptor (Updates/update_info.json)
//!
//! Only the fields the release pipeline knows about are modelled here; the
//! store keeps the full document and overlays this view on write. `version`,
//! `last_updated` and `download_url` are always written; everything else is
//! written only when present.

use crate::core::context::DESCRIPTOR_FILE;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Trailing version suffix of an archive name (`-v1.2.3.zip`, `-1.2.zip`)
static ARCHIVE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| crate::source::extract::compile(r"-v?[0-9.]*\.zip$"));

/// Key of the changelog entry in `sections`
pub const CHANGELOG_SECTION: &str = "changelog";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReleaseMetadata {
  #[serde(default)]
  pub version: String,
  #[serde(default)]
  pub last_updated: String,
  #[serde(default)]
  pub download_url: String,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub slug: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub author: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none", rename = "author_homepage")]
  pub author_profile: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub homepage: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub details: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub details_url: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub upgrade_notice: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tested: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub requires: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub requires_php: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub added: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub donate_link: Option<String>,

  /// Free-text sections keyed by name (`description`, `changelog`, ...)
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sections: Option<BTreeMap<String, String>>,
  /// Banner URLs keyed by size (`low`, `high`)
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub banners: Option<BTreeMap<String, String>>,
  /// Icon URLs keyed by size (`1x`, `2x`, `svg`)
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub icons: Option<BTreeMap<String, String>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub screenshots: Option<Vec<BTreeMap<String, String>>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub contributors: Option<BTreeMap<String, String>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tags: Option<Vec<String>>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub ratings: Option<BTreeMap<String, i64>>,
  /// Kept as a JSON number so `4` is not rewritten as `4.0`
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub rating: Option<Number>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub num_ratings: Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub downloaded: Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub active_installs: Option<i64>,
}

impl ReleaseMetadata {
  /// Last path segment of the download URL
  pub fn download_file_name(&self) -> &str {
    last_segment(&self.download_url)
  }

  /// Archive base name: download file name without version suffix and `.zip`
  pub fn archive_base(&self) -> String {
    let name = self.download_file_name();
    let base = ARCHIVE_SUFFIX.replace(name, "");
    base.strip_suffix(".zip").unwrap_or(&base).to_string()
  }

  /// Declared slug, or the archive base when none is declared
  pub fn effective_slug(&self) -> String {
    match self.slug.as_deref() {
      Some(slug) if !slug.is_empty() => slug.to_string(),
      _ => self.archive_base(),
    }
  }

  /// Public URL of the descriptor: download URL with its file name replaced
  pub fn descriptor_url(&self) -> String {
    replace_last_segment(&self.download_url, DESCRIPTOR_FILE)
  }

  /// Point the download URL at a new archive file name
  pub fn set_download_file(&mut self, file_name: &str) {
    self.download_url = replace_last_segment(&self.download_url, file_name);
  }

  /// Changelog section (escaped HTML), if any
  pub fn changelog(&self) -> Option<&str> {
    self
      .sections
      .as_ref()
      .and_then(|s| s.get(CHANGELOG_SECTION))
      .map(String::as_str)
      .filter(|s| !s.is_empty())
  }

  /// Store changelog HTML in `sections`
  pub fn set_changelog(&mut self, html: String) {
    self
      .sections
      .get_or_insert_with(BTreeMap::new)
      .insert(CHANGELOG_SECTION.to_string(), html);
  }

  /// Banner and icon URLs in key order, labelled `banners.<key>` / `icons.<key>`
  pub fn assets(&self) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for (group, map) in [("banners", &self.banners), ("icons", &self.icons)] {
      if let Some(map) = map {
        out.extend(map.iter().map(|(k, v)| (format!("{}.{}", group, k), v.clone())));
      }
    }
    out
  }
}

fn last_segment(url: &str) -> &str {
  url.rsplit_once('/').map(|(_, name)| name).unwrap_or(url)
}

fn replace_last_segment(url: &str, name: &str) -> String {
  match url.rsplit_once('/') {
    Some((head, _)) => format!("{}/{}", head, name),
    None => name.to_string(),
  }
}
