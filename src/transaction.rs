//! Staged change sets committed atomically against a [crate::PipelineGraph].
//!
//! A transaction records nodes and links to add, links to remove, layout
//! moves, and child marks. [crate::PipelineGraph::commit] checks the whole set
//! before touching the model, so a failed commit leaves the graph unchanged.

use serde::Serialize;

use crate::types::{LinkId, NodeId, PortRef, Position, StageNode};

/// Changes to apply to the graph as one unit.
#[derive(Debug, Clone, Default)]
pub struct Transaction {
  pub(crate) nodes: Vec<StageNode>,
  pub(crate) links: Vec<(PortRef, PortRef)>,
  pub(crate) removals: Vec<LinkId>,
  pub(crate) moves: Vec<(NodeId, Position)>,
  pub(crate) child_marks: Vec<NodeId>,
}

impl Transaction {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add_node(&mut self, node: StageNode) -> &mut Self {
    self.nodes.push(node);
    self
  }

  /// Stages a link; ids are assigned in staging order at commit time.
  pub fn add_link(&mut self, source: PortRef, target: PortRef) -> &mut Self {
    self.links.push((source, target));
    self
  }

  pub fn remove_link(&mut self, id: LinkId) -> &mut Self {
    self.removals.push(id);
    self
  }

  /// Stages a layout move. Later moves of the same node win.
  pub fn move_node(&mut self, id: NodeId, position: Position) -> &mut Self {
    self.moves.push((id, position));
    self
  }

  pub fn mark_has_child(&mut self, id: NodeId) -> &mut Self {
    self.child_marks.push(id);
    self
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
      && self.links.is_empty()
      && self.removals.is_empty()
      && self.moves.is_empty()
      && self.child_marks.is_empty()
  }

  /// Staged node with `id`, if this transaction creates it.
  pub(crate) fn pending_node(&self, id: &str) -> Option<&StageNode> {
    self.nodes.iter().find(|n| n.id().as_str() == id)
  }
}

/// What a committed transaction changed, for the collaborator to redraw.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MutationReport {
  /// Created nodes in staging order.
  pub created_nodes: Vec<NodeId>,
  /// Created links in staging order.
  pub created_links: Vec<LinkId>,
  pub removed_links: Vec<LinkId>,
  /// Nodes whose position changed.
  pub moved_nodes: Vec<NodeId>,
}
