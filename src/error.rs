use thiserror::Error;

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// This enum covers the precondition violations that can occur when constructing or running
/// a reaching-definitions analysis. All of them are reported at the API boundary; a
/// well-formed graph never fails at runtime (imprecision is expressed through the
/// `UNKNOWN_MEMORY` sentinel instead, see [`crate::graph::UNKNOWN_MEMORY`]).
///
/// # Error Categories
///
/// ## Input Validation Errors
/// - [`Error::MissingRoot`] - The graph has no designated root node
/// - [`Error::InvalidOptions`] - Analysis options fail validation
/// - [`Error::GraphError`] - Malformed graph structure
///
/// # Examples
///
/// ```rust
/// use defflow::{AnalysisOptions, DefinitionGraph, Error, ReachingDefinitions};
///
/// let graph = DefinitionGraph::new();
/// match ReachingDefinitions::new(graph, AnalysisOptions::default()) {
///     Ok(_) => println!("analysis constructed"),
///     Err(Error::MissingRoot) => println!("set a root node first"),
///     Err(e) => println!("other error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The graph has no root node set.
    ///
    /// Every analysis run needs a designated entry node (for whole-program analysis,
    /// the entry of `main`). Constructing a [`crate::ReachingDefinitions`] from a
    /// graph without a root, or calling
    /// [`DefinitionGraph::build_blocks`](crate::DefinitionGraph::build_blocks) on one,
    /// reports this error.
    #[error("The graph has no root node set")]
    MissingRoot,

    /// The analysis options failed validation.
    ///
    /// Currently the only rejected configuration is `max_set_size == 0`: with a zero
    /// cap every location would immediately collapse to the unknown sentinel and the
    /// results would be unsound for variadic-style code.
    #[error("Invalid analysis options - {0}")]
    InvalidOptions(String),

    /// The graph structure is malformed.
    ///
    /// Reported when edges reference nodes that do not exist in the graph, or when an
    /// edge endpoint is the reserved [`crate::graph::UNKNOWN_MEMORY`] sentinel, which
    /// must never participate in control flow.
    #[error("{0}")]
    GraphError(String),
}
