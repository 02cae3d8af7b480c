//! # kiln-graph
//!
//! Resource graph primitives for the kiln build engine.
//!
//! The crate owns the data model and nothing else: no plugin dispatch, no
//! scheduling, no I/O beyond the [`runtime::Runtime`] abstraction that plugins
//! are handed.
//!
//! ```text
//!            ┌──────────────────────────────┐
//!            │        ResourceGraph         │
//!            │ Arc<RwLock<GraphInner>>      │
//!            └──────┬───────────────┬───────┘
//!                   │               │
//!                   ▼               ▼
//!           ┌──────────────┐ ┌──────────────┐
//!           │ ResourceNode │ │ Edge         │
//!           │ (Arc, CoW)   │ │ Reference +  │
//!           └──────────────┘ │ target url   │
//!                            └──────────────┘
//! ```
//!
//! Nodes are published as `Arc<ResourceNode>` and replaced wholesale on update,
//! so a reader never observes a half-written node.
//!
//! ```rust
//! use kiln_graph::{Edge, Reference, ReferenceKind, ResourceGraph, ResourceKind, ResourceUrl};
//!
//! let graph = ResourceGraph::new();
//! let main = ResourceUrl::new_virtual("/main.js");
//! let util = ResourceUrl::new_virtual("/util.js");
//!
//! graph.mark_entry(&main);
//! graph.upsert_node(main.clone(), ResourceKind::Module);
//! graph.upsert_node(util.clone(), ResourceKind::Module);
//!
//! let import = Reference::new("./util.js", ReferenceKind::ModuleImport).with_source(main.clone());
//! graph.replace_outgoing_references(&main, vec![Edge::new(import, util.clone())])?;
//!
//! assert_eq!(graph.dependents(&util), vec![main.clone()]);
//! assert_eq!(graph.topological_order(&[main.clone()]).order, vec![util, main]);
//! # Ok::<(), kiln_graph::GraphError>(())
//! ```

pub mod graph;
pub mod node;
pub mod reference;
pub mod runtime;
pub mod trace;
pub mod url;

#[cfg(test)]
mod tests;

pub use graph::{Edge, ResourceGraph, TopologicalOrder};
pub use node::{
    Content, HotState, NodeInstance, NodeUpdate, ResourceKind, ResourceNode,
    content_type_for_extension, essence, is_textual,
};
pub use reference::{InlineContent, Reference, ReferenceKind, SourcePosition};
pub use runtime::{MemoryRuntime, NativeRuntime, Runtime, RuntimeError, RuntimeResult};
pub use trace::{ReferenceTrace, TraceFrame};
pub use url::{ResourceUrl, UrlError, UrlScheme};

/// Errors raised by graph operations.
///
/// Any of these reaching a caller means the graph was used inconsistently, for
/// example committing a compute for a node that was collected meanwhile.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("stale node: {url} is not in the graph")]
    MissingNode { url: ResourceUrl },

    #[error("stale node: {url} was replaced (expected instance {expected}, found {found})")]
    InstanceMismatch {
        url: ResourceUrl,
        expected: NodeInstance,
        found: NodeInstance,
    },

    #[error("graph inconsistency: {0}")]
    Inconsistent(String),
}

impl GraphError {
    /// The operation targeted a node that no longer exists in the expected form.
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::MissingNode { .. } | Self::InstanceMismatch { .. })
    }
}

/// Convenience alias for results returned by graph operations.
pub type Result<T> = std::result::Result<T, GraphError>;
