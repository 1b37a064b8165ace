//! # stageweave
//!
//! Construction engine for pipeline stage graphs.
//!
//! A pipeline runs from a `start` node down a spine of STEM stages to an `end`
//! node. Any spine stage can be extended with one more stage, or forked into
//! parallel BRANCH legs that reconverge at a convergence node. The single
//! link into `end` (the terminal link) is re-anchored to the new tail on every
//! spine change.
//!
//! ## Architecture
//!
//! - [graph_model]: nodes, ports, links, and atomic [Transaction] commits.
//! - [editor]: the two gestures (`append_stage`, `add_fork`) on top of the model.
//! - [fork_groups]: per-fork leg and convergence bookkeeping.
//! - [invariants]: a diagnostic pass over any graph.
//! - [snapshot_io], [script], [ui_state]: snapshot files, edit scripts, and
//!   front-end toggle state.

pub mod config;
pub mod editor;
#[cfg(test)]
mod editor_test;
pub mod error;
pub mod fork_groups;
pub mod graph_model;
pub mod invariants;
pub mod script;
#[cfg(test)]
mod script_test;
pub mod snapshot_io;
pub mod transaction;
pub mod types;
pub mod ui_state;

pub use config::{EditorConfig, InitialPlacement};
pub use editor::PipelineEditor;
pub use error::GraphError;
pub use fork_groups::{ForkGroup, ForkIndex, ForkLeg};
pub use graph_model::{GraphSnapshot, PipelineGraph};
pub use invariants::check_invariants;
pub use transaction::{MutationReport, Transaction};
pub use types::{
  EditAction, EditCommand, ForkId, Link, LinkId, NodeId, NodeKind, PortRef, PortRole, Position,
  StageNode, StageType,
};
