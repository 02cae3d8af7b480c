//! The shared resource graph.
//!
//! `ResourceGraph` is a cheap-to-clone handle over `Arc<RwLock<GraphInner>>`.
//! Methods are split across files by concern; each file adds an `impl` block.

mod mutations;
mod order;
mod queries;
mod store;
mod traversal;

pub use order::TopologicalOrder;
pub use store::{Edge, ResourceGraph};

// These wildcard imports are intentional - they add impl blocks to ResourceGraph
#[allow(unused_imports)]
use mutations::*;
#[allow(unused_imports)]
use queries::*;
#[allow(unused_imports)]
use traversal::*;
