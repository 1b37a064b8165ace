//! Node taxonomy: start, end, or a typed stage.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{PortRole, StageType};

const START_PORTS: &[PortRole] = &[PortRole::Out];
const END_PORTS: &[PortRole] = &[PortRole::In];
const STAGE_PORTS: &[PortRole] = &[PortRole::Top, PortRole::Bottom];

/// Kind of a node in the pipeline graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "stage", rename_all = "lowercase")]
pub enum NodeKind {
  Start,
  End,
  Stage(StageType),
}

impl NodeKind {
  /// Port roles exposed by nodes of this kind, one port per role.
  pub fn ports(self) -> &'static [PortRole] {
    match self {
      NodeKind::Start => START_PORTS,
      NodeKind::End => END_PORTS,
      NodeKind::Stage(_) => STAGE_PORTS,
    }
  }

  pub fn exposes(self, role: PortRole) -> bool {
    self.ports().contains(&role)
  }

  pub fn stage_type(self) -> Option<StageType> {
    match self {
      NodeKind::Stage(t) => Some(t),
      _ => None,
    }
  }

  pub fn is_stem(self) -> bool {
    self == NodeKind::Stage(StageType::Stem)
  }

  pub fn is_branch(self) -> bool {
    self == NodeKind::Stage(StageType::Branch)
  }
}

impl fmt::Display for NodeKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      NodeKind::Start => write!(f, "start"),
      NodeKind::End => write!(f, "end"),
      NodeKind::Stage(t) => write!(f, "stage({})", t),
    }
  }
}
