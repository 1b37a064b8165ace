//! Layout seed position of a node.

use serde::{Deserialize, Serialize};

/// 2D position used only to seed the collaborator's layout.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
  pub x: f64,
  pub y: f64,
}

impl Position {
  pub fn new(x: f64, y: f64) -> Self {
    Self { x, y }
  }

  pub fn offset(self, dx: f64, dy: f64) -> Self {
    Self {
      x: self.x + dx,
      y: self.y + dy,
    }
  }

  pub fn below(self, dy: f64) -> Self {
    self.offset(0.0, dy)
  }
}
