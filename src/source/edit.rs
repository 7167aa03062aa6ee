//! Byte-span splicing
//!
//! All edits of one pass are collected first and applied in descending offset
//! order, so a length change never shifts a span that is still pending.

use crate::core::error::{ReleaseResult, SourceError};
use std::ops::Range;

/// One replacement of a byte span (empty span = insertion)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
  pub span: Range<usize>,
  pub replacement: String,
  /// What the edit changes, for logs and overlap errors
  pub label: String,
}

impl Edit {
  pub fn replace(span: Range<usize>, replacement: impl Into<String>, label: impl Into<String>) -> Self {
    Self {
      span,
      replacement: replacement.into(),
      label: label.into(),
    }
  }

  pub fn insert(at: usize, text: impl Into<String>, label: impl Into<String>) -> Self {
    Self::replace(at..at, text, label)
  }
}

/// Apply all edits to `text`
///
/// Bytes outside the edited spans are copied unchanged. Overlapping spans
/// are rejected before anything is applied.
pub fn apply_edits(text: &str, mut edits: Vec<Edit>) -> ReleaseResult<String> {
  edits.sort_by(|a, b| (a.span.start, a.span.end).cmp(&(b.span.start, b.span.end)));

  for pair in edits.windows(2) {
    let (first, second) = (&pair[0], &pair[1]);
    // Two insertions at one offset would have an undefined order
    let same_point = first.span.is_empty() && second.span.is_empty() && first.span.start == second.span.start;
    if first.span.end > second.span.start || same_point {
      return Err(
        SourceError::OverlappingEdits {
          first: first.label.clone(),
          second: second.label.clone(),
        }
        .into(),
      );
    }
  }

  if let Some(last) = edits.last()
    && last.span.end > text.len()
  {
    return Err(
      SourceError::OverlappingEdits {
        first: last.label.clone(),
        second: "end of file".to_string(),
      }
      .into(),
    );
  }

  let mut out = text.to_string();
  for edit in edits.iter().rev() {
    out.replace_range(edit.span.clone(), &edit.replacement);
  }
  Ok(out)
}
