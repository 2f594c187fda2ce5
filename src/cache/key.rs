//! Cache key derivation.

use std::fmt;

/// Which upstream data domain a request concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
  /// Raw profile statistics
  Profile,
  /// Computed profile analysis
  Analysis,
}

impl Kind {
  /// Namespace tag used as the key prefix.
  pub fn namespace(self) -> &'static str {
    match self {
      Self::Profile => "profile",
      Self::Analysis => "analysis",
    }
  }
}

impl fmt::Display for Kind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.namespace())
  }
}

/// Store key for a `(kind, subject)` pair.
///
/// The subject is used verbatim: no trimming, no case folding. Two kinds
/// never share a key because the namespace tag always comes first.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
  pub fn new(kind: Kind, subject: &str) -> Self {
    Self(format!("{}:{}", kind.namespace(), subject))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for CacheKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}
