//! Graph model: stage nodes, their ports, and the links between them.
//!
//! The model enforces endpoint validity only. Pipeline shape (single spine,
//! fork/join pairing, terminal link) is the editor's job; see
//! [crate::editor] and [crate::invariants].

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::GraphError;
use crate::transaction::{MutationReport, Transaction};
use crate::types::{Link, LinkId, NodeId, NodeKind, PortRef, PortRole, StageNode};

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Structural dump of a graph: nodes (with fork metadata and positions) and links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
  pub version: u32,
  pub nodes: Vec<StageNode>,
  pub links: Vec<Link>,
  /// Next id the model will hand out, so reconstructed graphs never reuse ids.
  pub next_link_id: u64,
}

/// Nodes and links of one editing session, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct PipelineGraph {
  nodes: Vec<StageNode>,
  node_index: HashMap<NodeId, usize>,
  links: Vec<Link>,
  next_link_id: u64,
}

impl PipelineGraph {
  pub fn new() -> Self {
    Self::default()
  }

  /// Inserts a node. Fails with `DuplicateId` if the id is taken.
  #[instrument(level = "trace", skip(self, node), fields(node = %node.id()))]
  pub fn add_node(&mut self, node: StageNode) -> Result<(), GraphError> {
    if self.node_index.contains_key(node.id()) {
      return Err(GraphError::DuplicateId(node.id().clone()));
    }
    self.node_index.insert(node.id().clone(), self.nodes.len());
    self.nodes.push(node);
    Ok(())
  }

  /// Inserts a link from `source` to `target` and returns its id.
  ///
  /// Fails with `InvalidEndpoint` if either owning node is absent or both ports
  /// sit on the same node, and with `UnknownPort` if a node lacks the role.
  #[instrument(level = "trace", skip(self, source, target), fields(source = %source, target = %target))]
  pub fn add_link(&mut self, source: PortRef, target: PortRef) -> Result<LinkId, GraphError> {
    self.check_link(&source, &target, &[])?;
    self.reserve_link_ids(1)?;
    let id = self.allocate_link_id();
    self.links.push(Link::new(id, source, target));
    Ok(id)
  }

  /// Removes the link with `id`. Removing it twice fails with `LinkNotFound`.
  #[instrument(level = "trace", skip(self))]
  pub fn remove_link(&mut self, id: LinkId) -> Result<Link, GraphError> {
    let pos = self
      .links
      .iter()
      .position(|l| l.id == id)
      .ok_or(GraphError::LinkNotFound(id))?;
    Ok(self.links.remove(pos))
  }

  /// Returns the port of `node` with `role`.
  pub fn get_port(&self, node: &str, role: PortRole) -> Result<PortRef, GraphError> {
    let n = self
      .node(node)
      .ok_or_else(|| GraphError::UnknownNode(NodeId::from(node)))?;
    if !n.exposes(role) {
      return Err(GraphError::UnknownPort {
        node: n.id().clone(),
        role,
      });
    }
    Ok(PortRef::new(n.id().clone(), role))
  }

  pub fn node(&self, id: &str) -> Option<&StageNode> {
    self.node_index.get(id).map(|&i| &self.nodes[i])
  }

  pub fn contains_node(&self, id: &str) -> bool {
    self.node_index.contains_key(id)
  }

  /// All nodes in insertion order.
  pub fn nodes(&self) -> &[StageNode] {
    &self.nodes
  }

  pub fn links(&self) -> &[Link] {
    &self.links
  }

  pub fn link(&self, id: LinkId) -> Option<&Link> {
    self.links.iter().find(|l| l.id == id)
  }

  pub fn node_count(&self) -> usize {
    self.nodes.len()
  }

  pub fn link_count(&self) -> usize {
    self.links.len()
  }

  pub fn find_start(&self) -> Option<&StageNode> {
    self.nodes.iter().find(|n| n.kind() == NodeKind::Start)
  }

  pub fn find_end(&self) -> Option<&StageNode> {
    self.nodes.iter().find(|n| n.kind() == NodeKind::End)
  }

  /// Links leaving `port`.
  pub fn links_from(&self, port: &PortRef) -> impl Iterator<Item = &Link> {
    self.links.iter().filter(move |l| &l.source == port)
  }

  /// Links arriving at `port`.
  pub fn links_into(&self, port: &PortRef) -> impl Iterator<Item = &Link> {
    self.links.iter().filter(move |l| &l.target == port)
  }

  /// Links whose source port belongs to `node`.
  pub fn outgoing(&self, node: &str) -> impl Iterator<Item = &Link> {
    self.links.iter().filter(move |l| l.source.node == node)
  }

  /// Links whose target port belongs to `node`.
  pub fn incoming(&self, node: &str) -> impl Iterator<Item = &Link> {
    self.links.iter().filter(move |l| l.target.node == node)
  }

  /// Produces a structural snapshot sufficient to rebuild this graph.
  #[instrument(level = "trace", skip(self))]
  pub fn serialize(&self) -> GraphSnapshot {
    GraphSnapshot {
      version: SNAPSHOT_VERSION,
      nodes: self.nodes.clone(),
      links: self.links.clone(),
      next_link_id: self.next_link_id,
    }
  }

  /// Rebuilds a graph from a snapshot, applying the same endpoint checks as
  /// [PipelineGraph::add_node] and [PipelineGraph::add_link]. Link ids are kept.
  #[instrument(level = "trace", skip(snapshot))]
  pub fn reconstruct(snapshot: &GraphSnapshot) -> Result<Self, GraphError> {
    if snapshot.version != SNAPSHOT_VERSION {
      return Err(GraphError::InvalidSnapshot(format!(
        "unsupported snapshot version {}",
        snapshot.version
      )));
    }
    let mut graph = PipelineGraph::new();
    for node in &snapshot.nodes {
      graph.add_node(node.clone())?;
    }
    let mut seen = HashSet::new();
    for link in &snapshot.links {
      if !seen.insert(link.id) {
        return Err(GraphError::InvalidSnapshot(format!(
          "duplicate link id {}",
          link.id
        )));
      }
      graph.check_link(&link.source, &link.target, &[])?;
      graph.links.push(link.clone());
    }
    let past_max = match snapshot.links.iter().map(|l| l.id.0).max() {
      Some(max) => max.checked_add(1).ok_or_else(|| {
        GraphError::InvalidSnapshot(format!("link id {} leaves no room for new links", max))
      })?,
      None => 0,
    };
    graph.next_link_id = snapshot.next_link_id.max(past_max);
    Ok(graph)
  }

  /// Applies `tx` as one unit.
  ///
  /// Every staged change is checked against the current model first; the model
  /// is only touched once the whole transaction is known to apply. Removals
  /// are applied before additions.
  #[instrument(level = "trace", skip(self, tx))]
  pub fn commit(&mut self, tx: Transaction) -> Result<MutationReport, GraphError> {
    let removed = self.check_transaction(&tx)?;

    let mut report = MutationReport {
      removed_links: tx.removals,
      ..MutationReport::default()
    };
    self.links.retain(|l| !removed.contains(&l.id));

    for node in tx.nodes {
      report.created_nodes.push(node.id().clone());
      self.node_index.insert(node.id().clone(), self.nodes.len());
      self.nodes.push(node);
    }
    for (source, target) in tx.links {
      let id = self.allocate_link_id();
      self.links.push(Link::new(id, source, target));
      report.created_links.push(id);
    }
    for (id, position) in tx.moves {
      let i = self.node_index[&id];
      self.nodes[i].set_position(position);
      if !report.moved_nodes.contains(&id) {
        report.moved_nodes.push(id);
      }
    }
    for id in tx.child_marks {
      let i = self.node_index[&id];
      self.nodes[i].mark_has_child();
    }

    debug!(
      nodes = report.created_nodes.len(),
      links = report.created_links.len(),
      removed = report.removed_links.len(),
      "transaction committed"
    );
    Ok(report)
  }

  /// Checks `tx` against the model without changing it. Returns the set of
  /// link ids it removes.
  fn check_transaction(&self, tx: &Transaction) -> Result<HashSet<LinkId>, GraphError> {
    let mut new_ids = HashSet::new();
    for node in &tx.nodes {
      if self.contains_node(node.id().as_str()) || !new_ids.insert(node.id().as_str()) {
        return Err(GraphError::DuplicateId(node.id().clone()));
      }
    }
    let mut removed = HashSet::new();
    for &id in &tx.removals {
      if self.link(id).is_none() || !removed.insert(id) {
        return Err(GraphError::LinkNotFound(id));
      }
    }
    for (source, target) in &tx.links {
      self.check_link(source, target, &tx.nodes)?;
    }
    self.reserve_link_ids(tx.links.len())?;
    for id in tx.moves.iter().map(|(id, _)| id).chain(&tx.child_marks) {
      if !self.contains_node(id.as_str()) && tx.pending_node(id.as_str()).is_none() {
        return Err(GraphError::UnknownNode(id.clone()));
      }
    }
    Ok(removed)
  }

  fn check_link(
    &self,
    source: &PortRef,
    target: &PortRef,
    pending: &[StageNode],
  ) -> Result<(), GraphError> {
    self.check_endpoint(source, pending)?;
    self.check_endpoint(target, pending)?;
    if source.node == target.node {
      return Err(GraphError::InvalidEndpoint {
        port: target.clone(),
        reason: "source and target belong to the same node".to_string(),
      });
    }
    Ok(())
  }

  fn check_endpoint(&self, port: &PortRef, pending: &[StageNode]) -> Result<(), GraphError> {
    let kind = self
      .node(port.node.as_str())
      .or_else(|| pending.iter().find(|n| n.id() == &port.node))
      .map(StageNode::kind)
      .ok_or_else(|| GraphError::InvalidEndpoint {
        port: port.clone(),
        reason: "node is not in the model".to_string(),
      })?;
    if !kind.exposes(port.role) {
      return Err(GraphError::UnknownPort {
        node: port.node.clone(),
        role: port.role,
      });
    }
    Ok(())
  }

  /// Fails unless `count` more link ids can be handed out.
  fn reserve_link_ids(&self, count: usize) -> Result<(), GraphError> {
    u64::try_from(count)
      .ok()
      .and_then(|n| self.next_link_id.checked_add(n))
      .map(|_| ())
      .ok_or(GraphError::IdSpaceExhausted("link"))
  }

  /// Callers reserve first, so the increment cannot overflow.
  fn allocate_link_id(&mut self) -> LinkId {
    let id = LinkId(self.next_link_id);
    self.next_link_id += 1;
    id
  }
}
