//! Version declarations in the plugin source
//!
//! Three independent markers may carry the version:
//!
//! ```text
//!  * Version: 1.2.0                              doc comment / line comment
//! private $version = '1.2.0';                    class field
//! define('MY_PLUGIN_VERSION', '1.2.0');          named constant
//! ```
//!
//! Each declaration records the byte span of the value only, so the patcher can
//! replace exactly those bytes.

use crate::core::error::{ReleaseResult, SourceError};
use crate::core::version::VersionPolicy;
use regex::Regex;
use std::fmt;
use std::ops::Range;
use std::path::Path;
use std::sync::LazyLock;

const VERSION_VALUE: &str = r"[0-9]+\.[0-9]+(?:\.[0-9]+)*";

static DOC_COMMENT: LazyLock<Regex> = LazyLock::new(|| {
  compile(&format!(
    r"(?is)(?:/\*.*?\bVersion:\s*|//\s*Version:\s*)({})",
    VERSION_VALUE
  ))
});

static FIELD: LazyLock<Regex> = LazyLock::new(|| {
  compile(&format!(
    r#"private\s+\$version\s*=\s*['"]+({})['"]+"#,
    VERSION_VALUE
  ))
});

static CONSTANT: LazyLock<Regex> = LazyLock::new(|| {
  compile(&format!(
    r#"define\s*\(\s*['"]([A-Z_]+)_VERSION['"]\s*,\s*['"]({})['"]\s*\)"#,
    VERSION_VALUE
  ))
});

/// Compile a built-in pattern; the patterns are constants covered by tests
pub(crate) fn compile(pattern: &str) -> Regex {
  match Regex::new(pattern) {
    Ok(re) => re,
    Err(e) => panic!("built-in pattern {:?} does not compile: {}", pattern, e),
  }
}

/// Where a version declaration lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclarationKind {
  DocComment,
  Field,
  /// `define('<PREFIX>_VERSION', ...)`; holds the prefix
  Constant(String),
}

impl fmt::Display for DeclarationKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DeclarationKind::DocComment => write!(f, "comment version"),
      DeclarationKind::Field => write!(f, "class version"),
      DeclarationKind::Constant(prefix) => write!(f, "{}_VERSION", prefix),
    }
  }
}

/// One version marker found in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionDeclaration {
  pub kind: DeclarationKind,
  /// Byte span of the value inside the source text
  pub span: Range<usize>,
  pub value: String,
}

/// Declarations plus the winning version
#[derive(Debug, Clone)]
pub struct Extraction {
  pub declarations: Vec<VersionDeclaration>,
  pub winner: String,
}

impl Extraction {
  /// Declarations whose value differs from the winner
  pub fn stale(&self) -> impl Iterator<Item = &VersionDeclaration> {
    self.declarations.iter().filter(|d| d.value != self.winner)
  }

  /// The doc-comment declaration, if present
  pub fn doc_comment(&self) -> Option<&VersionDeclaration> {
    self.declarations.iter().find(|d| d.kind == DeclarationKind::DocComment)
  }
}

/// Finds version declarations and picks the highest
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionExtractor {
  policy: VersionPolicy,
}

impl VersionExtractor {
  pub fn new(policy: VersionPolicy) -> Self {
    Self { policy }
  }

  /// All declarations in source order of kind: comment, field, constant
  pub fn declarations(text: &str) -> Vec<VersionDeclaration> {
    let mut found = Vec::new();

    if let Some(m) = DOC_COMMENT.captures(text).and_then(|c| c.get(1)) {
      found.push(VersionDeclaration {
        kind: DeclarationKind::DocComment,
        span: m.range(),
        value: m.as_str().to_string(),
      });
    }

    if let Some(m) = FIELD.captures(text).and_then(|c| c.get(1)) {
      found.push(VersionDeclaration {
        kind: DeclarationKind::Field,
        span: m.range(),
        value: m.as_str().to_string(),
      });
    }

    if let Some(caps) = CONSTANT.captures(text)
      && let (Some(prefix), Some(m)) = (caps.get(1), caps.get(2))
    {
      found.push(VersionDeclaration {
        kind: DeclarationKind::Constant(prefix.as_str().to_string()),
        span: m.range(),
        value: m.as_str().to_string(),
      });
    }

    found
  }

  /// Extract declarations and the winning version
  ///
  /// Fails with `NoVersionFound` when the source declares no version at all.
  pub fn extract(&self, path: &Path, text: &str) -> ReleaseResult<Extraction> {
    let declarations = Self::declarations(text);

    let winner = declarations
      .iter()
      .fold("", |best, d| self.policy.higher(best, &d.value))
      .to_string();

    if winner.is_empty() {
      return Err(SourceError::NoVersionFound { path: path.to_path_buf() }.into());
    }

    Ok(Extraction { declarations, winner })
  }
}
