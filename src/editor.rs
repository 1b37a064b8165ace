//! Pipeline mutation engine.
//!
//! [PipelineEditor] owns the graph model and the fork index and exposes the two
//! user gestures: append a stage below a node, or fork below a node into
//! parallel legs that reconverge. Each gesture stages all of its node, link,
//! and layout changes in one [Transaction] and commits it atomically, so the
//! graph is never observed with a new node whose links are missing.
//!
//! The terminal link (the single link into `end.in`) is not stored; it is
//! looked up from the graph whenever it has to move.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, info, instrument};

use crate::config::EditorConfig;
use crate::error::GraphError;
use crate::fork_groups::ForkIndex;
use crate::graph_model::{GraphSnapshot, PipelineGraph};
use crate::invariants::check_invariants;
use crate::transaction::{MutationReport, Transaction};
use crate::types::{
  EditAction, EditCommand, ForkId, Link, NodeId, NodeKind, PortRef, PortRole, Position, StageNode,
  StageType,
};

/// Id of the start node.
pub const START_NODE_ID: &str = "start";
/// Id of the end node.
pub const END_NODE_ID: &str = "end";
/// Prefix of generated stage ids (`stage_0`, `stage_1`, ...).
pub const STAGE_ID_PREFIX: &str = "stage_";

/// The graph construction and rewiring engine for one editing session.
#[derive(Debug, Clone)]
pub struct PipelineEditor {
  graph: PipelineGraph,
  forks: ForkIndex,
  config: EditorConfig,
  start: NodeId,
  end: NodeId,
  next_stage: u64,
}

impl PipelineEditor {
  /// Creates `start -> stage_0 -> end`, with `stage_0 -> end` as the terminal link.
  #[instrument(level = "trace", skip(config))]
  pub fn new(config: EditorConfig) -> Result<Self, GraphError> {
    config.validate()?;
    let placement = &config.placement;
    let start = NodeId::from(START_NODE_ID);
    let end = NodeId::from(END_NODE_ID);
    let first = NodeId::new(format!("{}0", STAGE_ID_PREFIX));

    let mut graph = PipelineGraph::new();
    graph.add_node(StageNode::start(start.clone(), placement.start()).extended())?;
    graph.add_node(StageNode::stage(
      first.clone(),
      StageType::Stem,
      placement.first_stage(),
    ))?;
    graph.add_node(StageNode::end(end.clone(), placement.end()))?;
    graph.add_link(
      PortRef::new(start.clone(), PortRole::Out),
      PortRef::new(first.clone(), PortRole::Top),
    )?;
    graph.add_link(
      PortRef::new(first, PortRole::Bottom),
      PortRef::new(end.clone(), PortRole::In),
    )?;

    Ok(Self {
      graph,
      forks: ForkIndex::new(),
      config,
      start,
      end,
      next_stage: 1,
    })
  }

  /// Restores an editor from a snapshot. The snapshot must satisfy every
  /// structural invariant; the fork index is rebuilt by scanning the graph.
  #[instrument(level = "trace", skip(snapshot, config))]
  pub fn from_snapshot(snapshot: &GraphSnapshot, config: EditorConfig) -> Result<Self, GraphError> {
    config.validate()?;
    let graph = PipelineGraph::reconstruct(snapshot)?;
    check_invariants(&graph).map_err(GraphError::InvalidSnapshot)?;
    let forks = ForkIndex::rebuild(&graph)?;
    let start = graph
      .find_start()
      .map(|n| n.id().clone())
      .ok_or_else(|| GraphError::InvalidSnapshot("missing start node".to_string()))?;
    let end = graph
      .find_end()
      .map(|n| n.id().clone())
      .ok_or_else(|| GraphError::InvalidSnapshot("missing end node".to_string()))?;
    let next_stage = match graph
      .nodes()
      .iter()
      .filter_map(|n| n.id().as_str().strip_prefix(STAGE_ID_PREFIX))
      .filter_map(|suffix| suffix.parse::<u64>().ok())
      .max()
    {
      Some(max) => max.checked_add(1).ok_or_else(|| {
        GraphError::InvalidSnapshot(format!(
          "stage id {}{} leaves no room for new stages",
          STAGE_ID_PREFIX, max
        ))
      })?,
      None => 0,
    };
    info!(
      nodes = graph.node_count(),
      links = graph.link_count(),
      forks = forks.len(),
      "editor restored from snapshot"
    );
    Ok(Self {
      graph,
      forks,
      config,
      start,
      end,
      next_stage,
    })
  }

  pub fn graph(&self) -> &PipelineGraph {
    &self.graph
  }

  pub fn forks(&self) -> &ForkIndex {
    &self.forks
  }

  pub fn config(&self) -> &EditorConfig {
    &self.config
  }

  pub fn start_id(&self) -> &NodeId {
    &self.start
  }

  pub fn end_id(&self) -> &NodeId {
    &self.end
  }

  /// The single link into `end.in`.
  pub fn terminal_link(&self) -> Option<&Link> {
    self
      .graph
      .links_into(&PortRef::new(self.end.clone(), PortRole::In))
      .next()
  }

  /// Source node of the terminal link: the current spine tail.
  pub fn spine_tail(&self) -> Option<&NodeId> {
    self.terminal_link().map(|l| &l.source.node)
  }

  /// Structural snapshot of the current graph.
  pub fn snapshot(&self) -> GraphSnapshot {
    self.graph.serialize()
  }

  /// Checks that `node` may receive `action` without changing anything.
  pub fn check_action(&self, node: &str, action: EditAction) -> Result<(), GraphError> {
    let parent = self
      .graph
      .node(node)
      .ok_or_else(|| GraphError::UnknownNode(NodeId::from(node)))?;
    if matches!(parent.kind(), NodeKind::Start | NodeKind::End) {
      return Err(GraphError::NotExtendable(parent.id().clone()));
    }
    if parent.has_child() {
      return Err(GraphError::AlreadyExtended(parent.id().clone()));
    }
    if action == EditAction::AddFork && parent.is_branch() {
      return Err(GraphError::NestedFork(parent.id().clone()));
    }
    if parent.is_branch() && self.forks.leg_of(node).is_none() {
      return Err(GraphError::NotExtendable(parent.id().clone()));
    }
    Ok(())
  }

  /// Runs `command` against the graph.
  pub fn apply(&mut self, command: &EditCommand) -> Result<MutationReport, GraphError> {
    match command.action {
      EditAction::AppendStage => self.append_stage(command.target.as_str()),
      EditAction::AddFork => self.add_fork(command.target.as_str()),
    }
  }

  /// Appends one stage directly below `parent`.
  ///
  /// STEM parents get a STEM child and the terminal link moves to it. BRANCH
  /// parents get a BRANCH child in the same fork leg: the leg's join link moves
  /// to the child, the terminal link is untouched, and the convergence node
  /// (with everything downstream of it, `end` included) is pushed below the
  /// deepest leg.
  #[instrument(level = "trace", skip(self))]
  pub fn append_stage(&mut self, parent: &str) -> Result<MutationReport, GraphError> {
    self.check_action(parent, EditAction::AppendStage)?;
    let parent = self
      .graph
      .node(parent)
      .cloned()
      .ok_or_else(|| GraphError::UnknownNode(NodeId::from(parent)))?;
    let stage_type = parent
      .stage_type()
      .map(StageType::child_type)
      .unwrap_or(StageType::Stem);
    let h = self.config.stage_height;

    let mut next_stage = self.next_stage;
    let child_id = self.fresh_stage_id(&mut next_stage)?;
    let child_pos = parent.position().below(h);
    let leg_fork = self.forks.leg_of(parent.id().as_str()).map(|(f, _)| f);

    let mut child = StageNode::stage(child_id.clone(), stage_type, child_pos);
    if let Some(fork_id) = leg_fork {
      child = child.in_fork(fork_id);
    }

    let mut tx = Transaction::new();
    tx.add_node(child)
      .add_link(
        PortRef::new(parent.id().clone(), PortRole::Bottom),
        PortRef::new(child_id.clone(), PortRole::Top),
      )
      .mark_has_child(parent.id().clone());

    match (stage_type, leg_fork) {
      (StageType::Stem, _) => {
        let terminal = self.terminal_link().ok_or(GraphError::TerminalLinkMissing)?;
        tx.remove_link(terminal.id).add_link(
          PortRef::new(child_id.clone(), PortRole::Bottom),
          PortRef::new(self.end.clone(), PortRole::In),
        );
        let moves = HashMap::from([(child_id.clone(), child_pos)]);
        self.stage_end_below_tail(&mut tx, &child_id, &moves);
      }
      (StageType::Branch, Some(fork_id)) => {
        self.stage_leg_growth(&mut tx, fork_id, &parent, &child_id, child_pos)?;
      }
      (StageType::Branch, None) => {
        return Err(GraphError::NotExtendable(parent.id().clone()));
      }
    }

    let report = self.graph.commit(tx)?;
    self.next_stage = next_stage;
    if leg_fork.is_some() {
      self.forks.extend_leg(parent.id().as_str(), child_id.clone());
    }
    debug!(
      parent = %parent.id(),
      child = %child_id,
      stage_type = %stage_type,
      nodes = self.graph.node_count(),
      links = self.graph.link_count(),
      "stage appended"
    );
    Ok(report)
  }

  /// Forks below `parent` into `fork_width` BRANCH legs that reconverge at a
  /// new STEM convergence node, which becomes the source of the terminal link.
  #[instrument(level = "trace", skip(self))]
  pub fn add_fork(&mut self, parent: &str) -> Result<MutationReport, GraphError> {
    self.check_action(parent, EditAction::AddFork)?;
    let parent = self
      .graph
      .node(parent)
      .cloned()
      .ok_or_else(|| GraphError::UnknownNode(NodeId::from(parent)))?;
    let h = self.config.stage_height;
    let fork_id = ForkId::generate();
    let mut next_stage = self.next_stage;

    let convergence_id = self.fresh_stage_id(&mut next_stage)?;
    let convergence_pos = parent.position().below(2.0 * h);
    let mut tx = Transaction::new();
    tx.add_node(
      StageNode::stage(convergence_id.clone(), StageType::Stem, convergence_pos)
        .converging(fork_id),
    );

    let mut legs = Vec::with_capacity(self.config.fork_width);
    for i in 0..self.config.fork_width {
      let leg_id = self.fresh_stage_id(&mut next_stage)?;
      let leg_pos = parent.position().offset(self.config.leg_offset(i), h);
      tx.add_node(StageNode::stage(leg_id.clone(), StageType::Branch, leg_pos).in_fork(fork_id));
      legs.push(leg_id);
    }
    for leg in &legs {
      tx.add_link(
        PortRef::new(parent.id().clone(), PortRole::Bottom),
        PortRef::new(leg.clone(), PortRole::Top),
      )
      .add_link(
        PortRef::new(leg.clone(), PortRole::Bottom),
        PortRef::new(convergence_id.clone(), PortRole::Bottom),
      );
    }

    let terminal = self.terminal_link().ok_or(GraphError::TerminalLinkMissing)?;
    tx.remove_link(terminal.id)
      .add_link(
        PortRef::new(convergence_id.clone(), PortRole::Bottom),
        PortRef::new(self.end.clone(), PortRole::In),
      )
      .mark_has_child(parent.id().clone());
    let moves = HashMap::from([(convergence_id.clone(), convergence_pos)]);
    self.stage_end_below_tail(&mut tx, &convergence_id, &moves);

    let report = self.graph.commit(tx)?;
    self.next_stage = next_stage;
    self
      .forks
      .register_fork(fork_id, convergence_id.clone(), legs);
    debug!(
      parent = %parent.id(),
      fork = %fork_id,
      convergence = %convergence_id,
      legs = self.config.fork_width,
      nodes = self.graph.node_count(),
      links = self.graph.link_count(),
      "fork added"
    );
    Ok(report)
  }

  /// Stages the leg rewiring and layout push for a BRANCH append.
  fn stage_leg_growth(
    &self,
    tx: &mut Transaction,
    fork_id: ForkId,
    parent: &StageNode,
    child_id: &NodeId,
    child_pos: Position,
  ) -> Result<(), GraphError> {
    let group = self
      .forks
      .group(&fork_id)
      .ok_or_else(|| GraphError::NotExtendable(parent.id().clone()))?;
    let convergence = group.convergence().clone();
    let join_target = PortRef::new(convergence.clone(), PortRole::Bottom);
    let join = self
      .graph
      .links_from(&PortRef::new(parent.id().clone(), PortRole::Bottom))
      .find(|l| l.target == join_target)
      .ok_or_else(|| GraphError::NotExtendable(parent.id().clone()))?;
    tx.remove_link(join.id).add_link(
      PortRef::new(child_id.clone(), PortRole::Bottom),
      join_target,
    );

    // Deepest leg after this append; the parent's leg now ends at the child.
    let h = self.config.stage_height;
    let deepest_y = group
      .legs()
      .iter()
      .filter(|leg| leg.tail() != parent.id())
      .filter_map(|leg| self.graph.node(leg.tail().as_str()))
      .map(|n| n.position().y)
      .fold(child_pos.y, f64::max);
    let convergence_y = self
      .graph
      .node(convergence.as_str())
      .map(|n| n.position().y)
      .unwrap_or(deepest_y + h);
    let delta = deepest_y + h - convergence_y;
    let mut moves = HashMap::new();
    if delta > 0.0 {
      for id in self.downstream_of(&convergence) {
        if let Some(n) = self.graph.node(id.as_str()) {
          let moved = n.position().below(delta);
          tx.move_node(id.clone(), moved);
          moves.insert(id, moved);
        }
      }
    }
    if let Some(tail) = self.spine_tail().cloned() {
      self.stage_end_below_tail(tx, &tail, &moves);
    }
    Ok(())
  }

  /// Stages a move of `end` so it sits at least one stage height below `tail`.
  /// `moves` holds positions already staged in this transaction.
  fn stage_end_below_tail(
    &self,
    tx: &mut Transaction,
    tail: &NodeId,
    moves: &HashMap<NodeId, Position>,
  ) {
    let Some(tail_pos) = moves
      .get(tail)
      .copied()
      .or_else(|| self.graph.node(tail.as_str()).map(StageNode::position))
    else {
      return;
    };
    let Some(end_pos) = moves
      .get(&self.end)
      .copied()
      .or_else(|| self.graph.node(self.end.as_str()).map(StageNode::position))
    else {
      return;
    };
    let wanted = tail_pos.y + self.config.stage_height;
    if end_pos.y < wanted {
      tx.move_node(self.end.clone(), Position::new(end_pos.x, wanted));
    }
  }

  /// `from` and every node reachable from it along outgoing links.
  fn downstream_of(&self, from: &NodeId) -> Vec<NodeId> {
    let mut seen = HashSet::from([from.clone()]);
    let mut order = vec![from.clone()];
    let mut queue = VecDeque::from([from.clone()]);
    while let Some(id) = queue.pop_front() {
      for link in self.graph.outgoing(id.as_str()) {
        let next = &link.target.node;
        if seen.insert(next.clone()) {
          order.push(next.clone());
          queue.push_back(next.clone());
        }
      }
    }
    order
  }

  /// Next unused `stage_N` id, advancing `counter` past it.
  fn fresh_stage_id(&self, counter: &mut u64) -> Result<NodeId, GraphError> {
    loop {
      let id = NodeId::new(format!("{}{}", STAGE_ID_PREFIX, *counter));
      *counter = counter
        .checked_add(1)
        .ok_or(GraphError::IdSpaceExhausted("stage"))?;
      if !self.graph.contains_node(id.as_str()) {
        return Ok(id);
      }
    }
  }
}
