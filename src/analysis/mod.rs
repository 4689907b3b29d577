//! The reaching-definitions analysis driver.
//!
//! This module contains the fixpoint engine that turns a linked
//! [`DefinitionGraph`](crate::DefinitionGraph) into per-node reaching-definitions
//! maps. The engine is a standard monotone forward dataflow analysis: block-level
//! work-list iteration with a per-node transfer function, terminating because the
//! definitions-map lattice has finite height under the configured precision cap.
//!
//! # Key Components
//!
//! - [`AnalysisOptions`] - Precision cap and call/store modeling knobs
//! - [`ReachingDefinitions`] - The work-list driver itself
//!
//! # Example
//!
//! ```rust,ignore
//! use defflow::{AnalysisOptions, ReachingDefinitions};
//!
//! let mut analysis = ReachingDefinitions::new(graph, AnalysisOptions::default())?;
//! analysis.run()?;
//!
//! let load = analysis.graph().node(load_id);
//! let writers = load.reaching_definitions(target, offset, len);
//! ```

mod options;
mod solver;

pub use options::AnalysisOptions;
pub use solver::ReachingDefinitions;
