//! The program graph the analysis runs over.
//!
//! The front-end lowers memory-relevant IR instructions into [`DefNode`]s — typed
//! operations carrying their local definition sites — and links them with CFG edges.
//! The [`DefinitionGraph`] owns the nodes in an arena, partitions them into maximal
//! straight-line [`Block`]s, and hands the whole structure to the analysis driver.
//!
//! # Key Components
//!
//! - [`NodeId`] / [`DefNode`] / [`NodeKind`] - Graph vertices and their operations
//! - [`UNKNOWN_MEMORY`] - The sentinel standing for "some unspecified object/writer"
//! - [`BlockId`] / [`Block`] - Basic-block partitioning with cached block state
//! - [`DefinitionGraph`] - Arena owner, factory, and block builder

mod block;
#[allow(clippy::module_inception)]
mod graph;
mod node;

pub use block::{Block, BlockId};
pub use graph::DefinitionGraph;
pub use node::{DefNode, NodeId, NodeKind, UNKNOWN_MEMORY};
