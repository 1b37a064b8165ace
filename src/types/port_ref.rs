//! Reference to one port of one node.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{NodeId, PortRole};

/// A port, identified by its owning node and role. Link endpoints are ports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRef {
  pub node: NodeId,
  pub role: PortRole,
}

impl PortRef {
  pub fn new(node: impl Into<NodeId>, role: PortRole) -> Self {
    Self {
      node: node.into(),
      role,
    }
  }
}

impl fmt::Display for PortRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}.{}", self.node, self.role)
  }
}
