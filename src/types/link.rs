//! A directed link between two ports.

use serde::{Deserialize, Serialize};

use super::{LinkId, PortRef};

/// One edge of pipeline flow, directed from `source` to `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
  pub id: LinkId,
  pub source: PortRef,
  pub target: PortRef,
}

impl Link {
  pub fn new(id: LinkId, source: PortRef, target: PortRef) -> Self {
    Self { id, source, target }
  }

  /// True if this link connects exactly `source` to `target`.
  pub fn connects(&self, source: &PortRef, target: &PortRef) -> bool {
    &self.source == source && &self.target == target
  }
}
