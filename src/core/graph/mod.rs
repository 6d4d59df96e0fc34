//! Host object graph: the snapshot document and its arena form.

mod host_graph;
mod snapshot;

#[cfg(test)]
pub(crate) mod test_support;

pub use host_graph::{DataType, HostGraph, Node, NodeId, NodeKind, NodeView};
pub use snapshot::{content_hash, GraphSnapshot, HostId, HostKind, HostNode, RoutineFlavor};
