//! Pipeline stage graph types: identifiers, node taxonomy, ports, and links.
//!
//! Everything here is plain serde data. Structural rules live in
//! [crate::graph_model] and [crate::editor].

mod edit_command;
mod ids;
mod link;
mod node_kind;
mod port_ref;
mod port_role;
mod position;
mod stage_node;
mod stage_type;
#[cfg(test)]
mod stage_type_test;

pub use edit_command::{EditAction, EditCommand};
pub use ids::{ForkId, LinkId, NodeId};
pub use link::Link;
pub use node_kind::NodeKind;
pub use port_ref::PortRef;
pub use port_role::PortRole;
pub use position::Position;
pub use stage_node::StageNode;
pub use stage_type::StageType;
