//! Changelog text <-> descriptor HTML
//!
//! The descriptor's `sections.changelog` holds escaped HTML. Conversion is
//! line based: blank lines separate blocks, `- item` lines become a list and
//! any other line break becomes `<br/>`.

use regex::Regex;
use std::sync::LazyLock;

static TAG: LazyLock<Regex> = LazyLock::new(|| crate::source::extract::compile(r"<[^>]*>"));

/// Escape text for embedding in HTML
pub fn escape_html(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  for c in text.chars() {
    match c {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&#34;"),
      '\'' => out.push_str("&#39;"),
      other => out.push(other),
    }
  }
  out
}

fn unescape_html(text: &str) -> String {
  text
    .replace("&lt;", "<")
    .replace("&gt;", ">")
    .replace("&#34;", "\"")
    .replace("&quot;", "\"")
    .replace("&#39;", "'")
    .replace("&amp;", "&")
}

/// Convert plain changelog text to the descriptor's HTML form
pub fn changelog_html(text: &str) -> String {
  let mut html = String::new();
  let mut block: Vec<&str> = Vec::new();

  for line in text.trim().lines().chain(std::iter::once("")) {
    if line.trim().is_empty() {
      render_block(&block, &mut html);
      block.clear();
    } else {
      block.push(line.trim_end());
    }
  }
  html
}

fn render_block(lines: &[&str], html: &mut String) {
  let mut paragraph: Vec<String> = Vec::new();
  let mut items: Vec<String> = Vec::new();

  for line in lines {
    match line.trim_start().strip_prefix("- ") {
      Some(item) => {
        flush_paragraph(&mut paragraph, html);
        items.push(escape_html(item.trim()));
      }
      None => {
        flush_list(&mut items, html);
        paragraph.push(escape_html(line));
      }
    }
  }
  flush_paragraph(&mut paragraph, html);
  flush_list(&mut items, html);
}

fn flush_paragraph(lines: &mut Vec<String>, html: &mut String) {
  if !lines.is_empty() {
    html.push_str(&format!("<p>{}</p>", lines.join("<br/>")));
    lines.clear();
  }
}

fn flush_list(items: &mut Vec<String>, html: &mut String) {
  if !items.is_empty() {
    html.push_str("<ul>");
    for item in items.iter() {
      html.push_str(&format!("<li>{}</li>", item));
    }
    html.push_str("</ul>");
    items.clear();
  }
}

/// Plain text of a changelog HTML section (tags removed, entities decoded)
///
/// Block boundaries become line breaks so the result reads well as a commit
/// message.
pub fn changelog_plain(html: &str) -> String {
  let spaced = html
    .replace("</p>", "</p>\n\n")
    .replace("<br/>", "\n")
    .replace("<li>", "- ")
    .replace("</li>", "\n");
  let stripped = TAG.replace_all(&spaced, "");
  let lines: Vec<&str> = stripped.lines().map(str::trim_end).collect();
  unescape_html(lines.join("\n").trim())
}
