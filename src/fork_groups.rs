//! Fork group tracking.
//!
//! A fork group is every node sharing one [ForkId]: the BRANCH legs plus the
//! single convergence (`fork_end`) node. The index is updated incrementally by
//! the editor on every fork and leg append, and can be rebuilt from a graph by
//! a linear scan after snapshot reconstruction.

use std::collections::HashMap;

use tracing::instrument;

use crate::error::GraphError;
use crate::graph_model::PipelineGraph;
use crate::types::{ForkId, NodeId, PortRole};

/// One parallel leg of a fork: a chain of BRANCH stages from `head` to `tail`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForkLeg {
  head: NodeId,
  tail: NodeId,
  depth: usize,
}

impl ForkLeg {
  fn new(head: NodeId) -> Self {
    Self {
      tail: head.clone(),
      head,
      depth: 1,
    }
  }

  /// First stage of the leg, linked from the fork's parent.
  pub fn head(&self) -> &NodeId {
    &self.head
  }

  /// Last stage of the leg; its bottom port feeds the convergence node.
  pub fn tail(&self) -> &NodeId {
    &self.tail
  }

  /// Number of stages in the leg.
  pub fn depth(&self) -> usize {
    self.depth
  }
}

/// Members of one fork group.
#[derive(Debug, Clone)]
pub struct ForkGroup {
  id: ForkId,
  convergence: NodeId,
  legs: Vec<ForkLeg>,
  /// All members in creation order, convergence first.
  members: Vec<NodeId>,
}

impl ForkGroup {
  pub fn id(&self) -> ForkId {
    self.id
  }

  pub fn convergence(&self) -> &NodeId {
    &self.convergence
  }

  pub fn legs(&self) -> &[ForkLeg] {
    &self.legs
  }

  pub fn members(&self) -> &[NodeId] {
    &self.members
  }

  /// Leg with the most stages; ties go to the earliest leg.
  pub fn deepest_leg(&self) -> Option<&ForkLeg> {
    self
      .legs
      .iter()
      .reduce(|best, leg| if leg.depth > best.depth { leg } else { best })
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Membership {
  Convergence,
  Leg(usize),
}

/// Index from fork id to its group, and from node id to its group and leg.
#[derive(Debug, Clone, Default)]
pub struct ForkIndex {
  groups: HashMap<ForkId, ForkGroup>,
  order: Vec<ForkId>,
  membership: HashMap<NodeId, (ForkId, Membership)>,
}

impl ForkIndex {
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of fork groups.
  pub fn len(&self) -> usize {
    self.order.len()
  }

  pub fn is_empty(&self) -> bool {
    self.order.is_empty()
  }

  /// Fork ids in creation order.
  pub fn fork_ids(&self) -> impl Iterator<Item = &ForkId> {
    self.order.iter()
  }

  pub fn group(&self, fork_id: &ForkId) -> Option<&ForkGroup> {
    self.groups.get(fork_id)
  }

  /// Every node sharing `fork_id`, legs and convergence alike.
  pub fn legs_of(&self, fork_id: &ForkId) -> Vec<&NodeId> {
    self
      .groups
      .get(fork_id)
      .map(|g| g.members.iter().collect())
      .unwrap_or_default()
  }

  /// The unique `fork_end` member of `fork_id`.
  pub fn convergence_of(&self, fork_id: &ForkId) -> Option<&NodeId> {
    self.groups.get(fork_id).map(|g| &g.convergence)
  }

  /// Tail of the deepest leg of `fork_id`.
  pub fn deepest_leg_tail(&self, fork_id: &ForkId) -> Option<&NodeId> {
    self
      .groups
      .get(fork_id)
      .and_then(ForkGroup::deepest_leg)
      .map(ForkLeg::tail)
  }

  /// Group that `node` belongs to, as leg member or convergence.
  pub fn group_of(&self, node: &str) -> Option<&ForkGroup> {
    let (fork_id, _) = self.membership.get(node)?;
    self.groups.get(fork_id)
  }

  /// Leg containing `node`, with its fork id. `None` for convergence nodes.
  pub fn leg_of(&self, node: &str) -> Option<(ForkId, &ForkLeg)> {
    match self.membership.get(node)? {
      (fork_id, Membership::Leg(i)) => {
        let leg = self.groups.get(fork_id)?.legs.get(*i)?;
        Some((*fork_id, leg))
      }
      (_, Membership::Convergence) => None,
    }
  }

  pub fn is_convergence(&self, node: &str) -> bool {
    matches!(self.membership.get(node), Some((_, Membership::Convergence)))
  }

  /// Records a new fork group with one single-stage leg per entry of `legs`.
  pub(crate) fn register_fork(&mut self, fork_id: ForkId, convergence: NodeId, legs: Vec<NodeId>) {
    let mut members = Vec::with_capacity(legs.len() + 1);
    members.push(convergence.clone());
    self
      .membership
      .insert(convergence.clone(), (fork_id, Membership::Convergence));
    for (i, head) in legs.iter().enumerate() {
      self.membership.insert(head.clone(), (fork_id, Membership::Leg(i)));
      members.push(head.clone());
    }
    self.groups.insert(
      fork_id,
      ForkGroup {
        id: fork_id,
        convergence,
        legs: legs.into_iter().map(ForkLeg::new).collect(),
        members,
      },
    );
    self.order.push(fork_id);
  }

  /// Makes `new_tail` the tail of the leg currently ending at `tail`.
  /// Returns the leg's fork id, or `None` if `tail` is not a leg tail.
  pub(crate) fn extend_leg(&mut self, tail: &str, new_tail: NodeId) -> Option<ForkId> {
    let &(fork_id, Membership::Leg(i)) = self.membership.get(tail)? else {
      return None;
    };
    let group = self.groups.get_mut(&fork_id)?;
    let leg = group.legs.get_mut(i)?;
    if leg.tail.as_str() != tail {
      return None;
    }
    leg.tail = new_tail.clone();
    leg.depth += 1;
    group.members.push(new_tail.clone());
    self.membership.insert(new_tail, (fork_id, Membership::Leg(i)));
    Some(fork_id)
  }

  /// Rebuilds the index from `graph` by scanning its nodes and walking each
  /// leg from its head along bottom links.
  #[instrument(level = "trace", skip(graph))]
  pub fn rebuild(graph: &PipelineGraph) -> Result<Self, GraphError> {
    let mut by_fork: HashMap<ForkId, Vec<NodeId>> = HashMap::new();
    let mut order = Vec::new();
    for node in graph.nodes() {
      if let Some(fork_id) = node.fork_id() {
        by_fork
          .entry(fork_id)
          .or_insert_with(|| {
            order.push(fork_id);
            Vec::new()
          })
          .push(node.id().clone());
      }
    }

    let mut index = ForkIndex::new();
    for fork_id in order {
      let members = &by_fork[&fork_id];
      let convergence = single_convergence(graph, fork_id, members)?;
      let is_member = |id: &NodeId| members.contains(id);

      let heads: Vec<NodeId> = members
        .iter()
        .filter(|m| **m != convergence)
        .filter(|m| {
          !graph
            .incoming(m.as_str())
            .any(|l| l.target.role == PortRole::Top && is_member(&l.source.node))
        })
        .cloned()
        .collect();
      if heads.is_empty() {
        return Err(GraphError::InvalidSnapshot(format!(
          "fork {} has no legs",
          fork_id
        )));
      }

      index.register_fork(fork_id, convergence.clone(), heads.clone());
      for head in heads {
        let mut tail = head;
        let mut steps = 0;
        loop {
          let next = next_segment(graph, &tail, &is_member);
          let Some(next) = next else {
            break;
          };
          steps += 1;
          if steps > members.len() {
            return Err(GraphError::InvalidSnapshot(format!(
              "fork {} has a cyclic leg",
              fork_id
            )));
          }
          index.extend_leg(tail.as_str(), next.clone());
          tail = next;
        }
      }

      let tracked = index.legs_of(&fork_id).len();
      if tracked != members.len() {
        return Err(GraphError::InvalidSnapshot(format!(
          "fork {} has {} members but only {} are on a leg",
          fork_id,
          members.len(),
          tracked
        )));
      }
    }
    Ok(index)
  }
}

/// The leg member linked below `tail` (bottom to top), if any.
fn next_segment(
  graph: &PipelineGraph,
  tail: &NodeId,
  is_member: &impl Fn(&NodeId) -> bool,
) -> Option<NodeId> {
  graph
    .outgoing(tail.as_str())
    .find(|l| {
      l.source.role == PortRole::Bottom
        && l.target.role == PortRole::Top
        && is_member(&l.target.node)
    })
    .map(|l| l.target.node.clone())
}

fn single_convergence(
  graph: &PipelineGraph,
  fork_id: ForkId,
  members: &[NodeId],
) -> Result<NodeId, GraphError> {
  let ends: Vec<&NodeId> = members
    .iter()
    .filter(|m| graph.node(m.as_str()).is_some_and(|n| n.is_fork_end()))
    .collect();
  match ends.as_slice() {
    [one] => Ok((*one).clone()),
    _ => Err(GraphError::InvalidSnapshot(format!(
      "fork {} has {} convergence nodes",
      fork_id,
      ends.len()
    ))),
  }
}
