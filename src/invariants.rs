//! Structural invariant checks for a pipeline graph.
//!
//! The editor keeps these invariants by construction; this pass exists for
//! snapshot reconstruction, tests, and the CLI `--check` flag.

use std::collections::{HashMap, VecDeque};

use tracing::instrument;

use crate::graph_model::PipelineGraph;
use crate::types::{ForkId, NodeKind, PortRef, PortRole, StageNode};

/// Returns the first invariant violation found in `graph`, if any.
#[instrument(level = "trace", skip(graph))]
pub fn check_invariants(graph: &PipelineGraph) -> Result<(), String> {
  match collect_violations(graph).into_iter().next() {
    Some(v) => Err(v),
    None => Ok(()),
  }
}

/// Returns every invariant violation found in `graph`.
pub fn collect_violations(graph: &PipelineGraph) -> Vec<String> {
  let mut out = Vec::new();

  let starts: Vec<&StageNode> = nodes_of_kind(graph, NodeKind::Start);
  let ends: Vec<&StageNode> = nodes_of_kind(graph, NodeKind::End);
  if starts.len() != 1 {
    out.push(format!("graph must have exactly one start node, found {}", starts.len()));
  }
  if ends.len() != 1 {
    out.push(format!("graph must have exactly one end node, found {}", ends.len()));
  }
  if !out.is_empty() {
    return out;
  }
  let start = starts[0];
  let end = ends[0];

  check_terminal(graph, start, end, &mut out);
  for node in graph.nodes() {
    check_node(graph, node, &mut out);
  }
  check_fork_groups(graph, &mut out);
  if let Some(v) = find_cycle(graph) {
    out.push(v);
  }
  out
}

fn nodes_of_kind(graph: &PipelineGraph, kind: NodeKind) -> Vec<&StageNode> {
  graph.nodes().iter().filter(|n| n.kind() == kind).collect()
}

fn check_terminal(graph: &PipelineGraph, start: &StageNode, end: &StageNode, out: &mut Vec<String>) {
  let start_out = graph
    .links_from(&PortRef::new(start.id().clone(), PortRole::Out))
    .count();
  if start_out != 1 {
    out.push(format!("start node must have exactly one outgoing link, found {}", start_out));
  }
  if graph.incoming(start.id().as_str()).next().is_some() {
    out.push("start node must have no incoming links".to_string());
  }

  let terminal: Vec<_> = graph
    .links_into(&PortRef::new(end.id().clone(), PortRole::In))
    .collect();
  if terminal.len() != 1 {
    out.push(format!(
      "end node must have exactly one incoming link, found {}",
      terminal.len()
    ));
    return;
  }
  let source = &terminal[0].source;
  let tail = graph.node(source.node.as_str());
  if source.role != PortRole::Bottom || !tail.is_some_and(StageNode::is_stem) {
    out.push(format!("terminal link must leave a stem bottom port, not {}", source));
  }
  if tail.is_some_and(StageNode::has_child) {
    out.push(format!("terminal link source '{}' already has a child", source.node));
  }
  if graph.outgoing(source.node.as_str()).count() != 1 {
    out.push(format!(
      "terminal link source '{}' must have no other outgoing links",
      source.node
    ));
  }
  if graph.outgoing(end.id().as_str()).next().is_some() {
    out.push("end node must have no outgoing links".to_string());
  }
}

fn check_node(graph: &PipelineGraph, node: &StageNode, out: &mut Vec<String>) {
  let id = node.id();
  // A child is always attached at its top port; joins and the terminal link are not.
  let links_a_child = graph
    .outgoing(id.as_str())
    .any(|l| l.target.role == PortRole::Top);
  if node.has_child() != links_a_child {
    out.push(format!(
      "node '{}' has_child is {} but it {} a child link",
      id,
      node.has_child(),
      if links_a_child { "has" } else { "has no" }
    ));
  }
  match node.kind() {
    NodeKind::Start | NodeKind::End => {
      if node.fork_id().is_some() || node.is_fork_end() {
        out.push(format!("{} node '{}' must not belong to a fork", node.kind(), id));
      }
    }
    NodeKind::Stage(_) if node.is_stem() => {
      let spine_out = graph
        .links_from(&PortRef::new(id.clone(), PortRole::Bottom))
        .filter(|l| {
          graph
            .node(l.target.node.as_str())
            .is_some_and(|t| t.is_stem() || t.kind() == NodeKind::End)
        })
        .count();
      if spine_out > 1 {
        out.push(format!("stem node '{}' continues the spine {} times", id, spine_out));
      }
      if node.fork_id().is_some() != node.is_fork_end() {
        out.push(format!(
          "stem node '{}' carries a fork id but is not a convergence node",
          id
        ));
      }
    }
    NodeKind::Stage(_) => check_branch(graph, node, out),
  }

  if node.kind() == NodeKind::Start {
    return;
  }
  let top_side = graph
    .incoming(id.as_str())
    .filter(|l| l.target.role.is_top_side())
    .count();
  if node.is_fork_end() {
    let joins = graph
      .links_into(&PortRef::new(id.clone(), PortRole::Bottom))
      .count();
    if top_side != 0 || joins == 0 {
      out.push(format!(
        "convergence node '{}' must be fed only by leg joins (top: {}, joins: {})",
        id, top_side, joins
      ));
    }
  } else if top_side != 1 {
    out.push(format!(
      "node '{}' must have exactly one parent link, found {}",
      id, top_side
    ));
  }
}

fn check_branch(graph: &PipelineGraph, node: &StageNode, out: &mut Vec<String>) {
  let id = node.id();
  let Some(fork_id) = node.fork_id() else {
    out.push(format!("branch node '{}' has no fork id", id));
    return;
  };
  if node.is_fork_end() {
    out.push(format!("branch node '{}' cannot be a convergence node", id));
  }
  let links: Vec<_> = graph.outgoing(id.as_str()).collect();
  if links.len() != 1 {
    out.push(format!(
      "branch node '{}' must have exactly one outgoing link, found {}",
      id,
      links.len()
    ));
    return;
  }
  let link = links[0];
  let target = graph.node(link.target.node.as_str());
  let same_fork = target.is_some_and(|t| t.fork_id() == Some(fork_id));
  let into_next_segment = link.target.role == PortRole::Top
    && target.is_some_and(StageNode::is_branch);
  let into_convergence = link.target.role == PortRole::Bottom
    && target.is_some_and(StageNode::is_fork_end);
  if link.source.role != PortRole::Bottom || !same_fork || !(into_next_segment || into_convergence)
  {
    out.push(format!(
      "branch node '{}' must feed its own leg or its convergence node, not {}",
      id, link.target
    ));
  }
}

fn check_fork_groups(graph: &PipelineGraph, out: &mut Vec<String>) {
  let mut ends: HashMap<ForkId, usize> = HashMap::new();
  let mut order = Vec::new();
  for node in graph.nodes() {
    if let Some(fork_id) = node.fork_id() {
      let count = ends.entry(fork_id).or_insert_with(|| {
        order.push(fork_id);
        0
      });
      if node.is_fork_end() {
        *count += 1;
      }
    }
  }
  for fork_id in order {
    let n = ends[&fork_id];
    if n != 1 {
      out.push(format!("fork {} has {} convergence nodes", fork_id, n));
    }
  }
}

/// Kahn's algorithm over node-level edges; reports a node left on a cycle.
fn find_cycle(graph: &PipelineGraph) -> Option<String> {
  let mut indegree: HashMap<&str, usize> = graph
    .nodes()
    .iter()
    .map(|n| (n.id().as_str(), 0))
    .collect();
  for link in graph.links() {
    *indegree.entry(link.target.node.as_str()).or_insert(0) += 1;
  }
  let mut queue: VecDeque<&str> = indegree
    .iter()
    .filter(|(_, d)| **d == 0)
    .map(|(id, _)| *id)
    .collect();
  let mut visited = 0;
  while let Some(id) = queue.pop_front() {
    visited += 1;
    for link in graph.outgoing(id) {
      let target = link.target.node.as_str();
      if let Some(d) = indegree.get_mut(target) {
        *d -= 1;
        if *d == 0 {
          queue.push_back(target);
        }
      }
    }
  }
  if visited == indegree.len() {
    return None;
  }
  let mut stuck: Vec<&str> = indegree
    .into_iter()
    .filter(|(_, d)| *d > 0)
    .map(|(id, _)| id)
    .collect();
  stuck.sort_unstable();
  Some(format!("graph has a cycle through '{}'", stuck[0]))
}
