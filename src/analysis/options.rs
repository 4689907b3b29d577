//! Configuration for the reaching-definitions analysis.

/// Tunable knobs of the analysis.
///
/// The defaults are the sound, precision-oriented configuration; every field can
/// be adjusted through the builder-style setters.
///
/// # Example
///
/// ```rust
/// use defflow::AnalysisOptions;
///
/// let options = AnalysisOptions::default()
///     .with_max_set_size(8)
///     .with_opaque_call_kills_all(false);
/// assert_eq!(options.max_set_size, 8);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisOptions {
    /// Bound on writer-set cardinality before a set collapses to the
    /// [`UNKNOWN_MEMORY`](crate::graph::UNKNOWN_MEMORY) sentinel.
    ///
    /// Must be at least 1: with a zero cap everything would be defined at an
    /// unknown location, which produces unsound results for variadic-style code.
    /// The analysis constructor rejects 0.
    pub max_set_size: usize,

    /// May a strong update whose byte range has unknown bounds actually kill?
    ///
    /// When `false` (the default), such overwrites are demoted to weak updates:
    /// a store of unknown extent cannot be trusted to overwrite any particular
    /// byte. When `true`, an unknown-extent overwrite clears everything known
    /// about its target.
    pub strong_update_unknown_size: bool,

    /// Does a call to an unanalyzable external function clobber all memory?
    ///
    /// When `true` (the default), every opaque call weak-defines the whole of
    /// [`UNKNOWN_MEMORY`](crate::graph::UNKNOWN_MEMORY), so its writers reach
    /// every subsequent read. When `false`, opaque calls contribute nothing —
    /// only sound if the front-end models their effects explicitly.
    pub opaque_call_kills_all: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            max_set_size: 5,
            strong_update_unknown_size: false,
            opaque_call_kills_all: true,
        }
    }
}

impl AnalysisOptions {
    /// Sets the precision cap.
    #[must_use]
    pub const fn with_max_set_size(mut self, max_set_size: usize) -> Self {
        self.max_set_size = max_set_size;
        self
    }

    /// Sets whether unknown-extent overwrites may kill.
    #[must_use]
    pub const fn with_strong_update_unknown_size(mut self, enabled: bool) -> Self {
        self.strong_update_unknown_size = enabled;
        self
    }

    /// Sets whether opaque calls clobber all memory.
    #[must_use]
    pub const fn with_opaque_call_kills_all(mut self, enabled: bool) -> Self {
        self.opaque_call_kills_all = enabled;
        self
    }
}
