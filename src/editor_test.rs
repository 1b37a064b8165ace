//! Tests for the mutation engine.

use crate::config::EditorConfig;
use crate::editor::PipelineEditor;
use crate::error::GraphError;
use crate::invariants::check_invariants;
use crate::types::{EditCommand, LinkId, NodeId, PortRole, StageType};

fn editor() -> PipelineEditor {
  PipelineEditor::new(EditorConfig::default()).unwrap()
}

fn node_ids(editor: &PipelineEditor) -> Vec<&str> {
  let mut ids: Vec<&str> = editor
    .graph()
    .nodes()
    .iter()
    .map(|n| n.id().as_str())
    .collect();
  ids.sort_unstable();
  ids
}

/// Links as `source -> target` strings, sorted.
fn link_pairs(editor: &PipelineEditor) -> Vec<String> {
  let mut pairs: Vec<String> = editor
    .graph()
    .links()
    .iter()
    .map(|l| format!("{} -> {}", l.source, l.target))
    .collect();
  pairs.sort();
  pairs
}

fn y(editor: &PipelineEditor, id: &str) -> f64 {
  editor.graph().node(id).unwrap().position().y
}

#[test]
fn new_editor_has_start_stem_end() {
  let e = editor();
  assert_eq!(node_ids(&e), vec!["end", "stage_0", "start"]);
  assert_eq!(
    link_pairs(&e),
    vec!["stage_0.bottom -> end.in", "start.out -> stage_0.top"]
  );
  assert_eq!(e.spine_tail().unwrap().as_str(), "stage_0");
  assert_eq!(e.terminal_link().unwrap().id, LinkId(1));
  assert!(e.forks().is_empty());
  check_invariants(e.graph()).unwrap();
}

#[test]
fn new_editor_uses_injected_placement() {
  let mut config = EditorConfig::default();
  config.placement.origin_x = 40.0;
  config.placement.end_y = 1200.0;
  let e = PipelineEditor::new(config).unwrap();
  let end = e.graph().node("end").unwrap();
  assert_eq!(end.position().x, 40.0);
  assert_eq!(end.position().y, 1200.0);
}

#[test]
fn new_editor_rejects_zero_fork_width() {
  let config = EditorConfig {
    fork_width: 0,
    ..EditorConfig::default()
  };
  assert!(matches!(
    PipelineEditor::new(config),
    Err(GraphError::InvalidConfig(_))
  ));
}

#[test]
fn append_then_fork_scenario() {
  let mut e = editor();

  let report = e.append_stage("stage_0").unwrap();
  assert_eq!(node_ids(&e), vec!["end", "stage_0", "stage_1", "start"]);
  assert_eq!(
    link_pairs(&e),
    vec![
      "stage_0.bottom -> stage_1.top",
      "stage_1.bottom -> end.in",
      "start.out -> stage_0.top",
    ]
  );
  assert_eq!(report.created_nodes, vec![NodeId::from("stage_1")]);
  assert_eq!(report.created_links, vec![LinkId(2), LinkId(3)]);
  assert_eq!(report.removed_links, vec![LinkId(1)]);

  let report = e.add_fork("stage_1").unwrap();
  assert_eq!(
    node_ids(&e),
    vec!["end", "stage_0", "stage_1", "stage_2", "stage_3", "stage_4", "start"]
  );
  assert_eq!(
    link_pairs(&e),
    vec![
      "stage_0.bottom -> stage_1.top",
      "stage_1.bottom -> stage_3.top",
      "stage_1.bottom -> stage_4.top",
      "stage_2.bottom -> end.in",
      "stage_3.bottom -> stage_2.bottom",
      "stage_4.bottom -> stage_2.bottom",
      "start.out -> stage_0.top",
    ]
  );
  assert_eq!(report.removed_links, vec![LinkId(3)]);

  let conv = e.graph().node("stage_2").unwrap();
  assert!(conv.is_stem());
  assert!(conv.is_fork_end());
  let fork_id = conv.fork_id().unwrap();
  for leg in ["stage_3", "stage_4"] {
    let n = e.graph().node(leg).unwrap();
    assert!(n.is_branch());
    assert_eq!(n.fork_id(), Some(fork_id));
    assert!(!n.is_fork_end());
  }
  assert_eq!(e.spine_tail().unwrap().as_str(), "stage_2");
  check_invariants(e.graph()).unwrap();
}

#[test]
fn append_on_stem_reanchors_terminal() {
  let mut e = editor();
  e.append_stage("stage_0").unwrap();
  let child = e.graph().node("stage_1").unwrap();
  assert_eq!(child.stage_type(), Some(StageType::Stem));
  assert_eq!(child.position().y, 200.0);
  assert!(e.graph().node("stage_0").unwrap().has_child());
  let terminal = e.terminal_link().unwrap();
  assert_eq!(terminal.source.node, "stage_1");
  assert_eq!(terminal.source.role, PortRole::Bottom);
}

#[test]
fn append_on_branch_keeps_terminal() {
  let mut e = editor();
  e.add_fork("stage_0").unwrap();
  let before = e.terminal_link().unwrap().clone();

  let report = e.append_stage("stage_2").unwrap();
  let child = e.graph().node("stage_4").unwrap();
  assert!(child.is_branch());
  assert_eq!(child.fork_id(), e.graph().node("stage_1").unwrap().fork_id());
  assert_eq!(e.terminal_link().unwrap(), &before);
  assert!(!report.removed_links.contains(&before.id));

  let pairs = link_pairs(&e);
  assert!(pairs.contains(&"stage_2.bottom -> stage_4.top".to_string()));
  assert!(pairs.contains(&"stage_4.bottom -> stage_1.bottom".to_string()));
  assert!(!pairs.contains(&"stage_2.bottom -> stage_1.bottom".to_string()));
  check_invariants(e.graph()).unwrap();
}

#[test]
fn add_fork_counts() {
  let mut e = editor();
  let nodes = e.graph().node_count();
  let links = e.graph().link_count();
  let report = e.add_fork("stage_0").unwrap();
  assert_eq!(report.created_nodes.len(), 3);
  assert_eq!(report.created_links.len(), 5);
  assert_eq!(report.removed_links.len(), 1);
  assert_eq!(e.graph().node_count(), nodes + 3);
  assert_eq!(e.graph().link_count(), links + 4);
}

#[test]
fn add_fork_with_three_legs() {
  let config = EditorConfig {
    fork_width: 3,
    ..EditorConfig::default()
  };
  let mut e = PipelineEditor::new(config).unwrap();
  let report = e.add_fork("stage_0").unwrap();
  assert_eq!(report.created_nodes.len(), 4);
  assert_eq!(report.created_links.len(), 7);
  let xs: Vec<f64> = ["stage_2", "stage_3", "stage_4"]
    .iter()
    .map(|id| e.graph().node(id).unwrap().position().x)
    .collect();
  assert_eq!(xs, vec![-250.0, 0.0, 250.0]);
  check_invariants(e.graph()).unwrap();
}

#[test]
fn fork_places_legs_and_convergence() {
  let mut e = editor();
  e.add_fork("stage_0").unwrap();
  let left = e.graph().node("stage_2").unwrap().position();
  let right = e.graph().node("stage_3").unwrap().position();
  assert_eq!((left.x, left.y), (-250.0, 200.0));
  assert_eq!((right.x, right.y), (250.0, 200.0));
  assert_eq!(y(&e, "stage_1"), 300.0);
  assert_eq!(y(&e, "end"), 700.0);
}

#[test]
fn growing_a_leg_pushes_convergence_and_end() {
  let mut e = editor();
  e.add_fork("stage_0").unwrap();
  // legs at y=200, convergence at 300, end at 700
  e.append_stage("stage_2").unwrap();
  assert_eq!(y(&e, "stage_4"), 300.0);
  assert_eq!(y(&e, "stage_1"), 400.0);
  assert_eq!(y(&e, "end"), 800.0);
  e.append_stage("stage_4").unwrap();
  e.append_stage("stage_5").unwrap();
  e.append_stage("stage_6").unwrap();
  assert_eq!(y(&e, "stage_7"), 600.0);
  assert_eq!(y(&e, "stage_1"), 700.0);
  assert_eq!(y(&e, "end"), 1100.0);

  // The shorter leg does not move anything while it stays shorter.
  let report = e.append_stage("stage_3").unwrap();
  assert!(report.moved_nodes.is_empty());
  assert_eq!(y(&e, "stage_1"), 700.0);

  let (_, leg) = e.forks().leg_of("stage_7").unwrap();
  assert_eq!(leg.depth(), 5);
  check_invariants(e.graph()).unwrap();
}

#[test]
fn leg_growth_moves_nodes_below_convergence() {
  let mut e = editor();
  e.add_fork("stage_0").unwrap();
  e.append_stage("stage_1").unwrap();
  assert_eq!(y(&e, "stage_4"), 400.0);
  e.append_stage("stage_2").unwrap();
  assert_eq!(y(&e, "stage_1"), 400.0);
  assert_eq!(y(&e, "stage_4"), 500.0);
}

#[test]
fn convergence_continues_the_spine() {
  let mut e = editor();
  e.add_fork("stage_0").unwrap();
  e.append_stage("stage_1").unwrap();
  let child = e.graph().node("stage_4").unwrap();
  assert!(child.is_stem());
  assert_eq!(child.fork_id(), None);
  assert_eq!(e.spine_tail().unwrap().as_str(), "stage_4");

  e.add_fork("stage_4").unwrap();
  assert_eq!(e.forks().len(), 2);
  check_invariants(e.graph()).unwrap();
}

#[test]
fn preconditions_are_enforced() {
  let mut e = editor();
  assert_eq!(
    e.append_stage("start"),
    Err(GraphError::NotExtendable("start".into()))
  );
  assert_eq!(
    e.add_fork("end"),
    Err(GraphError::NotExtendable("end".into()))
  );
  assert_eq!(
    e.append_stage("ghost"),
    Err(GraphError::UnknownNode("ghost".into()))
  );

  e.add_fork("stage_0").unwrap();
  assert_eq!(
    e.append_stage("stage_0"),
    Err(GraphError::AlreadyExtended("stage_0".into()))
  );
  assert_eq!(
    e.add_fork("stage_2"),
    Err(GraphError::NestedFork("stage_2".into()))
  );
  e.append_stage("stage_2").unwrap();
  assert_eq!(
    e.append_stage("stage_2"),
    Err(GraphError::AlreadyExtended("stage_2".into()))
  );
}

#[test]
fn rejected_edit_leaves_graph_unchanged() {
  let mut e = editor();
  e.add_fork("stage_0").unwrap();
  let before = e.snapshot();
  assert!(e.add_fork("stage_2").is_err());
  assert!(e.append_stage("stage_0").is_err());
  assert_eq!(e.snapshot(), before);

  // Ids skipped by a rejected edit are not consumed.
  e.append_stage("stage_1").unwrap();
  assert!(e.graph().contains_node("stage_4"));
}

#[test]
fn apply_dispatches_commands() {
  let mut e = editor();
  e.apply(&EditCommand::append("stage_0")).unwrap();
  e.apply(&EditCommand::fork("stage_1")).unwrap();
  assert_eq!(e.graph().node_count(), 7);
  assert_eq!(e.forks().len(), 1);
}

#[test]
fn snapshot_roundtrip_restores_editor() {
  let mut e = editor();
  e.append_stage("stage_0").unwrap();
  e.add_fork("stage_1").unwrap();
  e.append_stage("stage_3").unwrap();

  let snap = e.snapshot();
  let mut restored = PipelineEditor::from_snapshot(&snap, EditorConfig::default()).unwrap();
  assert_eq!(restored.snapshot(), snap);
  assert_eq!(restored.forks().len(), 1);
  assert_eq!(restored.spine_tail().unwrap().as_str(), "stage_2");

  // Both continue identically: same ids, same wiring.
  e.append_stage("stage_5").unwrap();
  restored.append_stage("stage_5").unwrap();
  e.append_stage("stage_2").unwrap();
  restored.append_stage("stage_2").unwrap();
  assert_eq!(link_pairs(&restored), link_pairs(&e));
  assert_eq!(restored.snapshot(), e.snapshot());
}

#[test]
fn from_snapshot_rejects_broken_structure() {
  let mut e = editor();
  e.append_stage("stage_0").unwrap();
  let mut snap = e.snapshot();
  snap.links.retain(|l| l.target.node != "end");
  assert!(matches!(
    PipelineEditor::from_snapshot(&snap, EditorConfig::default()),
    Err(GraphError::InvalidSnapshot(_))
  ));
}

/// Snapshot of a fresh editor with `stage_0` renamed to `name`.
fn renamed_first_stage(name: &str) -> crate::graph_model::GraphSnapshot {
  let json = serde_json::to_string(&editor().snapshot()).unwrap();
  serde_json::from_str(&json.replace("\"stage_0\"", &format!("\"{}\"", name))).unwrap()
}

#[test]
fn from_snapshot_rejects_stage_id_at_max() {
  let snap = renamed_first_stage("stage_18446744073709551615");
  assert!(matches!(
    PipelineEditor::from_snapshot(&snap, EditorConfig::default()),
    Err(GraphError::InvalidSnapshot(_))
  ));
}

#[test]
fn exhausted_stage_ids_fail_without_panicking() {
  let snap = renamed_first_stage("stage_18446744073709551614");
  let mut e = PipelineEditor::from_snapshot(&snap, EditorConfig::default()).unwrap();
  assert_eq!(
    e.append_stage("stage_18446744073709551614"),
    Err(GraphError::IdSpaceExhausted("stage"))
  );
  assert_eq!(e.snapshot(), snap);
}

#[test]
fn from_snapshot_rejects_stale_has_child() {
  let mut e = editor();
  e.append_stage("stage_0").unwrap();
  let mut json = serde_json::to_value(e.snapshot()).unwrap();
  let nodes = json["nodes"].as_array_mut().unwrap();
  let stage_0 = nodes.iter_mut().find(|n| n["id"] == "stage_0").unwrap();
  stage_0["has_child"] = serde_json::Value::Bool(false);
  let snap: crate::graph_model::GraphSnapshot = serde_json::from_value(json).unwrap();

  let err = PipelineEditor::from_snapshot(&snap, EditorConfig::default()).unwrap_err();
  assert!(matches!(err, GraphError::InvalidSnapshot(_)));
  assert!(err.to_string().contains("has_child"), "{}", err);
}
