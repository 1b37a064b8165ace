//! User edit actions directed at an existing node.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::NodeId;

/// The two gestures the editor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditAction {
  /// Append one stage below the target.
  AppendStage,
  /// Fork below the target into parallel legs that reconverge.
  AddFork,
}

impl fmt::Display for EditAction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      EditAction::AppendStage => write!(f, "append"),
      EditAction::AddFork => write!(f, "fork"),
    }
  }
}

/// An edit action aimed at one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditCommand {
  pub action: EditAction,
  pub target: NodeId,
}

impl EditCommand {
  pub fn append(target: impl Into<NodeId>) -> Self {
    Self {
      action: EditAction::AppendStage,
      target: target.into(),
    }
  }

  pub fn fork(target: impl Into<NodeId>) -> Self {
    Self {
      action: EditAction::AddFork,
      target: target.into(),
    }
  }
}

impl fmt::Display for EditCommand {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {}", self.action, self.target)
  }
}
