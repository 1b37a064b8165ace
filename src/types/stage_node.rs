//! A node in the pipeline stage graph.

use serde::{Deserialize, Serialize};

use super::{ForkId, NodeId, NodeKind, PortRole, Position, StageType};

/// A node in the pipeline stage graph.
///
/// Fork membership (`fork_id`, `fork_end`) is fixed when the node is built and
/// has no setter afterwards. Position and `has_child` are updated by the graph
/// model while committing a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageNode {
  id: NodeId,
  kind: NodeKind,
  position: Position,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  fork_id: Option<ForkId>,
  #[serde(default)]
  fork_end: bool,
  /// Set once the node has been extended; the editor offers no further append/fork on it.
  #[serde(default)]
  has_child: bool,
}

impl StageNode {
  pub fn start(id: impl Into<NodeId>, position: Position) -> Self {
    Self::with_kind(id, NodeKind::Start, position)
  }

  pub fn end(id: impl Into<NodeId>, position: Position) -> Self {
    Self::with_kind(id, NodeKind::End, position)
  }

  pub fn stage(id: impl Into<NodeId>, stage_type: StageType, position: Position) -> Self {
    Self::with_kind(id, NodeKind::Stage(stage_type), position)
  }

  fn with_kind(id: impl Into<NodeId>, kind: NodeKind, position: Position) -> Self {
    Self {
      id: id.into(),
      kind,
      position,
      fork_id: None,
      fork_end: false,
      has_child: false,
    }
  }

  /// Makes this node a leg member of fork group `fork_id`.
  pub fn in_fork(mut self, fork_id: ForkId) -> Self {
    self.fork_id = Some(fork_id);
    self
  }

  /// Makes this node the convergence (`fork_end`) member of fork group `fork_id`.
  pub fn converging(mut self, fork_id: ForkId) -> Self {
    self.fork_id = Some(fork_id);
    self.fork_end = true;
    self
  }

  /// Marks the node as already extended at construction time (used for `start`).
  pub fn extended(mut self) -> Self {
    self.has_child = true;
    self
  }

  pub fn id(&self) -> &NodeId {
    &self.id
  }

  pub fn kind(&self) -> NodeKind {
    self.kind
  }

  pub fn stage_type(&self) -> Option<StageType> {
    self.kind.stage_type()
  }

  pub fn is_stem(&self) -> bool {
    self.kind.is_stem()
  }

  pub fn is_branch(&self) -> bool {
    self.kind.is_branch()
  }

  pub fn position(&self) -> Position {
    self.position
  }

  pub fn fork_id(&self) -> Option<ForkId> {
    self.fork_id
  }

  pub fn is_fork_end(&self) -> bool {
    self.fork_end
  }

  pub fn has_child(&self) -> bool {
    self.has_child
  }

  pub fn exposes(&self, role: PortRole) -> bool {
    self.kind.exposes(role)
  }

  pub(crate) fn set_position(&mut self, position: Position) {
    self.position = position;
  }

  pub(crate) fn mark_has_child(&mut self) {
    self.has_child = true;
  }
}
