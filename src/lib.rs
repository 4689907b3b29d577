// Copyright 2025-2026 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(dead_code)]

//! # defflow
//!
//! [![Crates.io](https://img.shields.io/crates/v/defflow.svg)](https://crates.io/crates/defflow)
//! [![Documentation](https://docs.rs/defflow/badge.svg)](https://docs.rs/defflow)
//! [![License](https://img.shields.io/badge/license-Apache--2.0-blue.svg)](https://github.com/BinFlip/defflow/blob/main/LICENSE-APACHE)
//!
//! A whole-program reaching-definitions dataflow engine over program graphs abstracted
//! from a compiler intermediate representation. Given a directed graph of
//! memory-relevant operations — allocations, stores, loads, control merges, calls,
//! returns, forks and joins — `defflow` computes, for every node, the set of writer
//! nodes whose effects could still be observed at that node: a sound
//! over-approximation, precise modulo the configured widening.
//!
//! # Architecture
//!
//! The library is organized into three layers that mirror the flow of data through an
//! analysis run:
//!
//! - **Memory Model**: Byte offsets with an unknown top, definition sites, and the
//!   interval-keyed definitions map with its precision cap
//! - **Graph Layer**: The node arena, CFG edges, and basic-block partitioning
//! - **Analysis Layer**: The monotone work-list fixpoint with weak/strong update
//!   semantics and fork/join/call handling
//!
//! ## Key Components
//!
//! - [`DefinitionGraph`] - Owns the nodes and blocks; the front-end builds it
//! - [`DefNode`] / [`NodeKind`] - One graph vertex: a typed memory operation
//! - [`DefSite`] / [`Offset`] - "Which bytes of which object were written"
//! - [`DefinitionsMap`] - Per-object writer sets keyed by byte intervals
//! - [`ReachingDefinitions`] - The fixpoint driver
//! - [`AnalysisOptions`] - Precision cap and call/store modeling knobs
//! - [`crate::prelude`] - Convenient re-exports of commonly used types
//! - [`crate::Error`] and [`crate::Result`] - Comprehensive error handling
//!
//! # Usage Examples
//!
//! ## Quick Start
//!
//! Add `defflow` to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! defflow = "0.3"
//! ```
//!
//! Build a graph, run the analysis, query the results:
//!
//! ```rust
//! use defflow::prelude::*;
//!
//! // A tiny program: allocate, store twice, load.
//! let mut graph = DefinitionGraph::new();
//! let buf = graph.create(NodeKind::Alloc);
//! let s1 = graph.create(NodeKind::Store);
//! let s2 = graph.create(NodeKind::Store);
//! let load = graph.create(NodeKind::Load);
//!
//! graph.node_mut(s1).add_def(DefSite::new(buf, 0u64, 4u64), true);
//! graph.node_mut(s2).add_def(DefSite::new(buf, 0u64, 4u64), true);
//! graph.node_mut(load).add_use(DefSite::new(buf, 0u64, 4u64));
//!
//! graph.add_edge(buf, s1)?;
//! graph.add_edge(s1, s2)?;
//! graph.add_edge(s2, load)?;
//! graph.set_root(buf);
//!
//! let mut analysis = ReachingDefinitions::with_defaults(graph)?;
//! analysis.run()?;
//!
//! // Only the second store reaches the load.
//! let writers = analysis
//!     .graph()
//!     .node(load)
//!     .reaching_definitions(buf, Offset::Byte(0), Offset::Byte(4));
//! assert_eq!(writers.len(), 1);
//! assert!(writers.contains(&s2));
//! # Ok::<(), defflow::Error>(())
//! ```
//!
//! ## Tuning Precision
//!
//! ```rust,no_run
//! use defflow::AnalysisOptions;
//!
//! // Allow larger writer sets before widening to the unknown sentinel, and
//! // trust the front-end to model external calls itself.
//! let options = AnalysisOptions::default()
//!     .with_max_set_size(16)
//!     .with_opaque_call_kills_all(false);
//! ```
//!
//! # The Unknown Sentinel
//!
//! Imprecision is never an error: when the front-end cannot bound an offset, when a
//! callee is opaque, or when a writer set outgrows
//! [`AnalysisOptions::max_set_size`], the analysis answers with the
//! [`graph::UNKNOWN_MEMORY`] sentinel — "some writer" — instead of failing or
//! silently dropping facts. Consumers must treat a result containing the sentinel
//! as "anything may have written this range".
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, Error>`](Result) and fail only on
//! malformed inputs, at the API boundary:
//!
//! ```rust
//! use defflow::{DefinitionGraph, Error, ReachingDefinitions};
//!
//! match ReachingDefinitions::with_defaults(DefinitionGraph::new()) {
//!     Ok(_) => println!("ready to run"),
//!     Err(Error::MissingRoot) => println!("designate an entry node first"),
//!     Err(e) => println!("other error: {}", e),
//! }
//! ```
//!
//! # Thread Safety
//!
//! The analysis itself is a blocking, single-threaded computation: [`ReachingDefinitions::run`]
//! owns the graph for its duration and has no internal parallelism. The `Fork`/`Join`
//! node kinds model the *analyzed* program's concurrency, not the analyzer's — sibling
//! threads are treated as a nondeterministic interleaving with may-analysis semantics.
//! All public types are [`Send`] and [`Sync`].

pub(crate) mod utils;

/// Error types for all operations of this library.
mod error;

/// The definition-site data model: offsets, def-sites, and the definitions map.
///
/// # Key Components
///
/// - [`Offset`] - Non-negative byte offset with a distinguished unknown top
/// - [`DefSite`] - A byte range `(target, offset, length)` of an abstract object
/// - [`DefinitionsMap`] - Interval-keyed writer sets with bounded widening
pub mod mem;

/// The program graph: nodes, blocks, and the owning arena.
///
/// # Key Components
///
/// - [`DefinitionGraph`] - Node factory and owner, block builder, DOT export
/// - [`DefNode`] / [`NodeKind`] - Typed memory operations with local def/use sets
/// - [`graph::UNKNOWN_MEMORY`] - The "some unspecified object/writer" sentinel
pub mod graph;

/// The reaching-definitions fixpoint driver and its configuration.
///
/// # Key Components
///
/// - [`ReachingDefinitions`] - Work-list fixpoint over the block partition
/// - [`AnalysisOptions`] - Precision cap and call/store modeling knobs
pub mod analysis;

/// Convenient re-exports of the most commonly used types.
///
/// # Usage Examples
///
/// ```rust
/// use defflow::prelude::*;
///
/// let mut graph = DefinitionGraph::new();
/// let root = graph.create(NodeKind::Noop);
/// graph.set_root(root);
/// let analysis = ReachingDefinitions::with_defaults(graph)?;
/// # let _ = analysis;
/// # Ok::<(), defflow::Error>(())
/// ```
pub mod prelude;

/// Convenience alias for `Result<T, defflow::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

pub use analysis::{AnalysisOptions, ReachingDefinitions};
pub use error::Error;
pub use graph::{Block, BlockId, DefNode, DefinitionGraph, NodeId, NodeKind};
pub use mem::{DefSite, DefSiteSet, DefinitionsMap, Offset, WriterSet};
