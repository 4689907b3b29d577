//! Convenient re-exports of the most commonly used types and traits.
//!
//! This module provides a curated selection of the most frequently used types
//! from across the defflow library, allowing for convenient glob imports.
//!
//! # Usage Examples
//!
//! ```rust
//! use defflow::prelude::*;
//!
//! let mut graph = DefinitionGraph::new();
//! let root = graph.create(NodeKind::Noop);
//! graph.set_root(root);
//!
//! let mut analysis = ReachingDefinitions::new(graph, AnalysisOptions::default())?;
//! analysis.run()?;
//! # Ok::<(), defflow::Error>(())
//! ```

pub use crate::analysis::{AnalysisOptions, ReachingDefinitions};
pub use crate::graph::{
    Block, BlockId, DefNode, DefinitionGraph, NodeId, NodeKind, UNKNOWN_MEMORY,
};
pub use crate::mem::{DefSite, DefSiteSet, DefinitionsMap, Offset, WriterSet};
pub use crate::{Error, Result};
