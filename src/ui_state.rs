//! Per-node, per-port affordance state for an editor front end.
//!
//! Tracks whether the "add" affordance on a node's port is expanded. This
//! lives outside the graph model; the editor never reads it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::editor::PipelineEditor;
use crate::types::{EditAction, NodeId, PortRole};

/// State of one affordance toggle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleState {
  #[default]
  Collapsed,
  Expanded,
}

impl ToggleState {
  pub fn flipped(self) -> Self {
    match self {
      ToggleState::Collapsed => ToggleState::Expanded,
      ToggleState::Expanded => ToggleState::Collapsed,
    }
  }

  pub fn is_expanded(self) -> bool {
    self == ToggleState::Expanded
  }
}

/// Toggle states keyed by `(node, port role)`. Missing keys read as collapsed.
#[derive(Debug, Clone, Default)]
pub struct EditorUiState {
  toggles: HashMap<(NodeId, PortRole), ToggleState>,
}

impl EditorUiState {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, node: &NodeId, role: PortRole) -> ToggleState {
    self
      .toggles
      .get(&(node.clone(), role))
      .copied()
      .unwrap_or_default()
  }

  pub fn set(&mut self, node: NodeId, role: PortRole, state: ToggleState) {
    match state {
      ToggleState::Collapsed => {
        self.toggles.remove(&(node, role));
      }
      ToggleState::Expanded => {
        self.toggles.insert((node, role), state);
      }
    }
  }

  /// Flips the toggle and returns the new state.
  pub fn toggle(&mut self, node: NodeId, role: PortRole) -> ToggleState {
    let next = self.get(&node, role).flipped();
    self.set(node, role, next);
    next
  }

  /// Forgets every toggle on `node`.
  pub fn clear_node(&mut self, node: &NodeId) {
    self.toggles.retain(|(n, _), _| n != node);
  }

  /// Number of expanded toggles.
  pub fn expanded_count(&self) -> usize {
    self.toggles.len()
  }

  /// Collapses toggles on nodes that can no longer be extended (or no
  /// longer exist). Call after each mutation.
  pub fn sync_with(&mut self, editor: &PipelineEditor) {
    self
      .toggles
      .retain(|(node, _), _| !available_actions(editor, node.as_str()).is_empty());
  }
}

/// Actions the editor would accept on `node` right now.
pub fn available_actions(editor: &PipelineEditor, node: &str) -> Vec<EditAction> {
  [EditAction::AppendStage, EditAction::AddFork]
    .into_iter()
    .filter(|&a| editor.check_action(node, a).is_ok())
    .collect()
}
