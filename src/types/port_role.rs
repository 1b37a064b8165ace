//! Fixed port roles attached to nodes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Role of a port on its node.
///
/// Stage nodes expose `Top` and `Bottom`. `Left` and `Right` are reserved for
/// lateral wiring and not exposed by any node kind yet. `Out` belongs to the
/// start node and `In` to the end node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortRole {
  Top,
  Bottom,
  Left,
  Right,
  In,
  Out,
}

impl PortRole {
  /// True for roles that receive a node's constructional parent link.
  pub fn is_top_side(self) -> bool {
    matches!(self, PortRole::Top | PortRole::In)
  }
}

impl fmt::Display for PortRole {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      PortRole::Top => "top",
      PortRole::Bottom => "bottom",
      PortRole::Left => "left",
      PortRole::Right => "right",
      PortRole::In => "in",
      PortRole::Out => "out",
    };
    f.write_str(s)
  }
}
