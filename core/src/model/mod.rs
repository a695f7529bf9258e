//! The graph data model: nodes, values, initializers and sentinels, plus the
//! traversal and resolution passes working on it.
mod attribute;
mod graph;
mod node;
mod options;
mod order;
mod resolve;

pub use self::attribute::{AttributeKind, AttributeValue};
pub use self::graph::{Graph, SINK_NODE_NAME, SOURCE_NODE_NAME};
pub use self::node::{Node, NodeId, ValueId, ValueInfo};
pub use self::options::ResolveOptions;
