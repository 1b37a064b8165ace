//! Errors raised by the graph model and the mutation engine.
//!
//! Every variant is a caller error: the operation that hit it is aborted and
//! the graph stays in its last committed state.

use thiserror::Error;

use crate::types::{LinkId, NodeId, PortRef, PortRole};

/// Error returned by graph model and editor operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
  #[error("node id '{0}' already exists")]
  DuplicateId(NodeId),

  #[error("invalid link endpoint {port}: {reason}")]
  InvalidEndpoint { port: PortRef, reason: String },

  #[error("link {0} not found")]
  LinkNotFound(LinkId),

  #[error("node '{node}' has no '{role}' port")]
  UnknownPort { node: NodeId, role: PortRole },

  #[error("node '{0}' not found")]
  UnknownNode(NodeId),

  #[error("node '{0}' cannot be extended")]
  NotExtendable(NodeId),

  #[error("node '{0}' already has a child")]
  AlreadyExtended(NodeId),

  #[error("branch node '{0}' cannot be forked")]
  NestedFork(NodeId),

  #[error("end node has no terminal link")]
  TerminalLinkMissing,

  #[error("no {0} ids left to allocate")]
  IdSpaceExhausted(&'static str),

  #[error("invalid editor config: {0}")]
  InvalidConfig(String),

  #[error("invalid snapshot: {0}")]
  InvalidSnapshot(String),
}
