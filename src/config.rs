//! Editor configuration: injected initial placement and layout spacing.
//!
//! Positions are layout hints only; nothing here changes graph structure
//! except `fork_width`, the number of legs materialized per fork.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::GraphError;
use crate::types::Position;

/// Default filename for an editor config file.
pub const CONFIG_FILENAME: &str = "stageweave.json";

/// Where the nodes created at construction are placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialPlacement {
  /// Column of the start node, the initial stage, and the end node.
  pub origin_x: f64,
  pub start_y: f64,
  pub first_stage_y: f64,
  pub end_y: f64,
}

impl Default for InitialPlacement {
  fn default() -> Self {
    Self {
      origin_x: 0.0,
      start_y: 20.0,
      first_stage_y: 100.0,
      end_y: 700.0,
    }
  }
}

impl InitialPlacement {
  pub fn start(&self) -> Position {
    Position::new(self.origin_x, self.start_y)
  }

  pub fn first_stage(&self) -> Position {
    Position::new(self.origin_x, self.first_stage_y)
  }

  pub fn end(&self) -> Position {
    Position::new(self.origin_x, self.end_y)
  }
}

/// Configuration for a [crate::PipelineEditor].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
  pub placement: InitialPlacement,
  /// Vertical distance between a stage and the stage appended below it.
  pub stage_height: f64,
  /// Horizontal distance between a fork's parent column and its outermost leg.
  pub lateral_offset: f64,
  /// Number of legs created per fork.
  pub fork_width: usize,
}

impl Default for EditorConfig {
  fn default() -> Self {
    Self {
      placement: InitialPlacement::default(),
      stage_height: 100.0,
      lateral_offset: 250.0,
      fork_width: 2,
    }
  }
}

impl EditorConfig {
  /// Rejects configs the engine cannot honor.
  pub fn validate(&self) -> Result<(), GraphError> {
    if self.fork_width == 0 {
      return Err(GraphError::InvalidConfig(
        "fork_width must be at least 1".to_string(),
      ));
    }
    if !(self.stage_height.is_finite() && self.stage_height > 0.0) {
      return Err(GraphError::InvalidConfig(format!(
        "stage_height must be positive, got {}",
        self.stage_height
      )));
    }
    if !self.lateral_offset.is_finite() {
      return Err(GraphError::InvalidConfig(
        "lateral_offset must be finite".to_string(),
      ));
    }
    Ok(())
  }

  /// Horizontal offset of leg `index` from its parent's column.
  ///
  /// Legs are spread symmetrically: with two legs they sit at
  /// `-lateral_offset` and `+lateral_offset`.
  pub fn leg_offset(&self, index: usize) -> f64 {
    if self.fork_width < 2 {
      return 0.0;
    }
    let center = (self.fork_width - 1) as f64 / 2.0;
    let step = 2.0 * self.lateral_offset / (self.fork_width - 1) as f64;
    (index as f64 - center) * step
  }
}

/// Loads an editor config from `path`. Missing fields take their defaults.
#[instrument(level = "trace", skip(path))]
pub fn load_config(path: &Path) -> Result<EditorConfig, std::io::Error> {
  let bytes = std::fs::read(path)?;
  serde_json::from_slice(&bytes)
    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}
