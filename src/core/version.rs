//! Dotted-numeric version comparison
//!
//! Plugin versions are not semver: `1.2`, `1.2.3` and `1.2.3.4` all occur in
//! the wild. Components are compared left to right as integers; a component
//! that is not a number counts as 0.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// How to order two versions whose common prefix is equal but whose
/// segment counts differ (`1.2` vs `1.2.0`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VersionPolicy {
  /// The value with more segments is higher
  #[default]
  LongerWins,
  /// Treat missing segments as 0, so `1.2` == `1.2.0`
  ZeroPadded,
}

impl VersionPolicy {
  /// Compare two dotted versions under this policy
  pub fn compare(self, a: &str, b: &str) -> Ordering {
    let pa: Vec<u64> = a.split('.').map(component).collect();
    let pb: Vec<u64> = b.split('.').map(component).collect();

    for (x, y) in pa.iter().zip(pb.iter()) {
      match x.cmp(y) {
        Ordering::Equal => continue,
        other => return other,
      }
    }

    match self {
      VersionPolicy::LongerWins => pa.len().cmp(&pb.len()),
      VersionPolicy::ZeroPadded => {
        let rest = if pa.len() > pb.len() { &pa[pb.len()..] } else { &pb[pa.len()..] };
        if rest.iter().all(|n| *n == 0) {
          Ordering::Equal
        } else {
          pa.len().cmp(&pb.len())
        }
      }
    }
  }

  /// The higher of two versions; equal values return the first operand
  ///
  /// Empty strings stand for "no declaration" and lose against anything.
  pub fn higher<'a>(self, a: &'a str, b: &'a str) -> &'a str {
    if a.is_empty() {
      return b;
    }
    if b.is_empty() {
      return a;
    }
    match self.compare(a, b) {
      Ordering::Less => b,
      _ => a,
    }
  }
}

fn component(part: &str) -> u64 {
  part.trim().parse().unwrap_or(0)
}
