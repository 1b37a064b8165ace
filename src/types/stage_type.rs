//! Stage flavour: spine (STEM) or fork leg (BRANCH).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Whether a stage sits on the main spine or inside a fork leg.
///
/// BRANCH parents only ever produce BRANCH children, so fork legs never re-fork.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageType {
  Stem,
  Branch,
}

impl StageType {
  /// Type of a stage appended below a parent of this type.
  pub fn child_type(self) -> StageType {
    self
  }
}

impl fmt::Display for StageType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      StageType::Stem => write!(f, "stem"),
      StageType::Branch => write!(f, "branch"),
    }
  }
}
