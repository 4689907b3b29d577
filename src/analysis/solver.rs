//! Work-list fixpoint driver for reaching definitions.
//!
//! # Algorithm
//!
//! The driver runs a standard monotone forward dataflow analysis over the block
//! partition of the graph:
//!
//! 1. Normalize allocation nodes (an allocation defines its whole object).
//! 2. Build the basic blocks if the front-end has not done so.
//! 3. Seed the work-list with every block, in BFS-from-root creation order.
//! 4. While the work-list is non-empty: pop a block, form its input state as the
//!    union of its predecessor blocks' cached out-states, walk its nodes applying
//!    the transfer function, and — if the block's out-state changed — enqueue its
//!    successors. A membership set keeps the work-list duplicate-free.
//!
//! Termination follows from the lattice argument: every per-range writer set is
//! bounded by `max_set_size` (past which it collapses to the unknown sentinel and
//! stays there), all transfer functions are monotone, and the byte-range
//! partitions only refine at offsets drawn from the finite set of definition
//! sites. The fixpoint is therefore reached in finitely many iterations.
//!
//! # Calls, forks, and joins
//!
//! Calls with analyzable callees are pre-expanded by the front-end: the `Call`
//! node is wired to the callee's entry and the callee's exits to the
//! `CallReturn` node, so the work-list handles them — including recursion —
//! uniformly. Opaque calls are modeled here, as a weak define of all of
//! [`UNKNOWN_MEMORY`]. `Fork` fans its out-state to every spawned entry plus the
//! sequential successor; `Join` merges them back. Because the merge at a join is
//! a union, a strong update in one thread can never kill a sibling thread's
//! writes — exactly the coarse may-interleaving the analysis promises.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;

use crate::analysis::AnalysisOptions;
use crate::graph::{BlockId, DefinitionGraph, NodeId, NodeKind, UNKNOWN_MEMORY};
use crate::mem::{DefSite, DefinitionsMap, Offset};
use crate::{Error, Result};

/// The reaching-definitions analysis.
///
/// Owns the graph for the duration of the run; external code must not mutate it
/// while [`run`](Self::run) executes (the borrow checker enforces this). `run` is
/// a blocking, single-threaded computation with no suspension points.
///
/// After a run, every node's [`reaching`](crate::DefNode::reaching) map answers
/// "which writers may have produced the bytes this node observes" — consumers
/// such as a def-use edge builder query it once per use site via
/// [`DefNode::reaching_definitions`](crate::DefNode::reaching_definitions).
///
/// # Example
///
/// ```rust
/// use defflow::{
///     AnalysisOptions, DefSite, DefinitionGraph, NodeKind, Offset, ReachingDefinitions,
/// };
///
/// let mut graph = DefinitionGraph::new();
/// let alloc = graph.create(NodeKind::Alloc);
/// let store = graph.create(NodeKind::Store);
/// let load = graph.create(NodeKind::Load);
/// graph.node_mut(store).add_def(DefSite::new(alloc, 0u64, 4u64), true);
/// graph.node_mut(load).add_use(DefSite::new(alloc, 0u64, 4u64));
/// graph.add_edge(alloc, store)?;
/// graph.add_edge(store, load)?;
/// graph.set_root(alloc);
///
/// let mut analysis = ReachingDefinitions::new(graph, AnalysisOptions::default())?;
/// analysis.run()?;
///
/// let writers = analysis
///     .graph()
///     .node(load)
///     .reaching_definitions(alloc, Offset::Byte(0), Offset::Byte(4));
/// assert!(writers.contains(&store));
/// # Ok::<(), defflow::Error>(())
/// ```
pub struct ReachingDefinitions {
    /// The graph under analysis.
    graph: DefinitionGraph,
    /// Validated configuration.
    options: AnalysisOptions,
    /// Number of block visits performed by the last run.
    iterations: usize,
}

impl ReachingDefinitions {
    /// Creates a new analysis over `graph`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingRoot`] if the graph has no designated root,
    /// [`Error::GraphError`] if the root is not a valid node, and
    /// [`Error::InvalidOptions`] if `max_set_size` is zero.
    pub fn new(graph: DefinitionGraph, options: AnalysisOptions) -> Result<Self> {
        let root = graph.root().ok_or(Error::MissingRoot)?;
        if root.is_unknown_memory() || root.index() > graph.node_count() {
            return Err(Error::GraphError(format!(
                "root {root} is not a valid node of the graph"
            )));
        }
        if options.max_set_size == 0 {
            return Err(Error::InvalidOptions(
                "max_set_size must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            graph,
            options,
            iterations: 0,
        })
    }

    /// Creates an analysis with default options.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn with_defaults(graph: DefinitionGraph) -> Result<Self> {
        Self::new(graph, AnalysisOptions::default())
    }

    /// Returns the configuration of this analysis.
    #[must_use]
    pub const fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    /// Returns the analyzed graph.
    #[must_use]
    pub const fn graph(&self) -> &DefinitionGraph {
        &self.graph
    }

    /// Consumes the analysis and returns the graph with its computed maps.
    #[must_use]
    pub fn into_graph(self) -> DefinitionGraph {
        self.graph
    }

    /// Returns the number of block visits performed by the last run.
    #[must_use]
    pub const fn iterations(&self) -> usize {
        self.iterations
    }

    /// Runs the analysis to its fixpoint.
    ///
    /// Idempotent: the computed maps grow monotonically, so a second run leaves
    /// them unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingRoot`] if blocks must be built and the root has
    /// been unset since construction.
    pub fn run(&mut self) -> Result<()> {
        self.normalize_allocations();
        if self.graph.blocks().is_empty() {
            self.graph.build_blocks()?;
        }

        let mut worklist: VecDeque<BlockId> =
            (0..self.graph.block_count()).map(BlockId::new).collect();
        let mut queued: FxHashSet<BlockId> = worklist.iter().copied().collect();

        while let Some(block_id) = worklist.pop_front() {
            queued.remove(&block_id);
            self.iterations += 1;

            // IN(B) = union of the predecessor blocks' cached out-states; the
            // root block keeps an empty input.
            let mut state = DefinitionsMap::new();
            for pred in self.graph.block_predecessors(block_id) {
                state.merge(
                    self.graph.block(pred).definitions(),
                    self.options.max_set_size,
                );
            }

            let nodes = self.graph.block(block_id).nodes().to_vec();
            for n in nodes {
                self.process_node(n, &state);
                state = self.graph.node(n).reaching().clone();
                self.transfer(n, &mut state);
            }

            // OUT(B) changed: successors see new input, revisit them.
            if state != *self.graph.block(block_id).definitions() {
                self.graph.block_mut(block_id).set_definitions(state);
                for succ in self.graph.block_successors(block_id) {
                    if queued.insert(succ) {
                        worklist.push_back(succ);
                    }
                }
            }
        }

        Ok(())
    }

    /// Merges `incoming` into the node's computed IN map.
    ///
    /// Returns `true` iff the node's map changed compared to its previously
    /// recorded value. The maps only ever grow, which is testable property 1
    /// (monotonicity) and the reason run() converges.
    fn process_node(&mut self, n: NodeId, incoming: &DefinitionsMap) -> bool {
        let cap = self.options.max_set_size;
        self.graph.node_mut(n).reaching_mut().merge(incoming, cap)
    }

    /// Applies a node's local effects to `state`.
    ///
    /// Strong updates first (they kill), then weak ones (they union). The
    /// per-kind rules: `Phi`, `Join` and `CallReturn` are pure merge points,
    /// `Fork` fans out, `Return` and `Noop` are identity, `Store`/`Load` act
    /// purely through their declared sites, expanded `Call`s contribute nothing
    /// locally (the callee body does the writing), and opaque `Call`s clobber
    /// unknown memory.
    fn transfer(&self, n: NodeId, state: &mut DefinitionsMap) {
        let cap = self.options.max_set_size;
        let node = self.graph.node(n);

        if node.kind() == NodeKind::Call && node.is_opaque() && self.options.opaque_call_kills_all
        {
            state.add(&DefSite::whole(UNKNOWN_MEMORY), n, cap);
        }

        for ds in node.overwrites() {
            if ds.has_unknown_bounds() && !self.options.strong_update_unknown_size {
                // An overwrite of unknown extent cannot be trusted to kill.
                state.add(ds, n, cap);
            } else {
                state.update(ds, n);
            }
        }
        for ds in node.defs() {
            state.add(ds, n, cap);
        }
    }

    /// Ensures allocation nodes define their whole object.
    ///
    /// Front-ends usually record this themselves; for those that do not, every
    /// `Alloc`/`DynAlloc` node without a self-targeted weak define gets
    /// `(self, 0, unknown)` added before the fixpoint starts.
    fn normalize_allocations(&mut self) {
        let allocs: Vec<NodeId> = self
            .graph
            .nodes()
            .filter(|(_, node)| matches!(node.kind(), NodeKind::Alloc | NodeKind::DynAlloc))
            .map(|(id, _)| id)
            .collect();
        for id in allocs {
            if !self.graph.node(id).defines(id, Offset::Unknown) {
                self.graph.node_mut(id).add_def(DefSite::whole(id), false);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::WriterSet;

    fn strong_store(graph: &mut DefinitionGraph, target: NodeId, off: u64, len: u64) -> NodeId {
        let store = graph.create(NodeKind::Store);
        graph
            .node_mut(store)
            .add_def(DefSite::new(target, off, len), true);
        store
    }

    #[test]
    fn test_construction_requires_root() {
        let graph = DefinitionGraph::new();
        assert!(matches!(
            ReachingDefinitions::with_defaults(graph),
            Err(Error::MissingRoot)
        ));
    }

    #[test]
    fn test_construction_rejects_zero_cap() {
        let mut graph = DefinitionGraph::new();
        let root = graph.create(NodeKind::Noop);
        graph.set_root(root);
        let options = AnalysisOptions::default().with_max_set_size(0);
        assert!(matches!(
            ReachingDefinitions::new(graph, options),
            Err(Error::InvalidOptions(_))
        ));
    }

    #[test]
    fn test_construction_rejects_sentinel_root() {
        let mut graph = DefinitionGraph::new();
        graph.create(NodeKind::Noop);
        graph.set_root(UNKNOWN_MEMORY);
        assert!(matches!(
            ReachingDefinitions::with_defaults(graph),
            Err(Error::GraphError(_))
        ));
    }

    #[test]
    fn test_straight_line_last_writer_wins() {
        let mut graph = DefinitionGraph::new();
        let alloc = graph.create(NodeKind::Alloc);
        let s1 = strong_store(&mut graph, alloc, 0, 4);
        let s2 = strong_store(&mut graph, alloc, 0, 4);
        let load = graph.create(NodeKind::Load);
        graph.node_mut(load).add_use(DefSite::new(alloc, 0u64, 4u64));
        graph.add_edge(alloc, s1).unwrap();
        graph.add_edge(s1, s2).unwrap();
        graph.add_edge(s2, load).unwrap();
        graph.set_root(alloc);

        let mut analysis = ReachingDefinitions::with_defaults(graph).unwrap();
        analysis.run().unwrap();

        let writers = analysis
            .graph()
            .node(load)
            .reaching_definitions(alloc, Offset::Byte(0), Offset::Byte(4));
        assert_eq!(writers, WriterSet::from([s2]));
        assert!(analysis.iterations() > 0);
    }

    #[test]
    fn test_alloc_normalization_adds_whole_object_def() {
        let mut graph = DefinitionGraph::new();
        let alloc = graph.create(NodeKind::Alloc);
        let load = graph.create(NodeKind::Load);
        graph.add_edge(alloc, load).unwrap();
        graph.set_root(alloc);

        let mut analysis = ReachingDefinitions::with_defaults(graph).unwrap();
        analysis.run().unwrap();

        // With no explicit stores, the allocation itself reaches the load.
        let writers = analysis
            .graph()
            .node(load)
            .reaching_definitions(alloc, Offset::Byte(0), Offset::Byte(4));
        assert_eq!(writers, WriterSet::from([alloc]));
    }

    #[test]
    fn test_opaque_call_clobbers_unknown_memory() {
        let mut graph = DefinitionGraph::new();
        let alloc = graph.create(NodeKind::Alloc);
        let s1 = strong_store(&mut graph, alloc, 0, 4);
        let call = graph.create(NodeKind::Call);
        graph.node_mut(call).set_opaque(true);
        let load = graph.create(NodeKind::Load);
        graph.add_edge(alloc, s1).unwrap();
        graph.add_edge(s1, call).unwrap();
        graph.add_edge(call, load).unwrap();
        graph.set_root(alloc);

        let mut analysis = ReachingDefinitions::with_defaults(graph).unwrap();
        analysis.run().unwrap();

        let writers = analysis
            .graph()
            .node(load)
            .reaching_definitions(alloc, Offset::Byte(0), Offset::Byte(4));
        assert!(writers.contains(&s1), "the store is not killed");
        assert!(writers.contains(&call), "the opaque call may have written");
    }

    #[test]
    fn test_opaque_call_can_be_ignored_by_option() {
        let mut graph = DefinitionGraph::new();
        let alloc = graph.create(NodeKind::Alloc);
        let call = graph.create(NodeKind::Call);
        graph.node_mut(call).set_opaque(true);
        let load = graph.create(NodeKind::Load);
        graph.add_edge(alloc, call).unwrap();
        graph.add_edge(call, load).unwrap();
        graph.set_root(alloc);

        let options = AnalysisOptions::default().with_opaque_call_kills_all(false);
        let mut analysis = ReachingDefinitions::new(graph, options).unwrap();
        analysis.run().unwrap();

        let writers = analysis
            .graph()
            .node(load)
            .reaching_definitions(alloc, Offset::Byte(0), Offset::Byte(4));
        assert!(!writers.contains(&call));
    }

    #[test]
    fn test_unknown_extent_overwrite_demoted_by_default() {
        let mut graph = DefinitionGraph::new();
        let alloc = graph.create(NodeKind::Alloc);
        let s1 = strong_store(&mut graph, alloc, 0, 4);
        let s2 = graph.create(NodeKind::Store);
        graph.node_mut(s2).add_overwrite(DefSite::whole(alloc));
        let load = graph.create(NodeKind::Load);
        graph.add_edge(alloc, s1).unwrap();
        graph.add_edge(s1, s2).unwrap();
        graph.add_edge(s2, load).unwrap();
        graph.set_root(alloc);

        let mut analysis = ReachingDefinitions::with_defaults(graph).unwrap();
        analysis.run().unwrap();

        let writers = analysis
            .graph()
            .node(load)
            .reaching_definitions(alloc, Offset::Byte(0), Offset::Byte(4));
        assert!(writers.contains(&s1) && writers.contains(&s2));
    }

    #[test]
    fn test_unknown_extent_overwrite_kills_when_enabled() {
        let mut graph = DefinitionGraph::new();
        let alloc = graph.create(NodeKind::Alloc);
        let s1 = strong_store(&mut graph, alloc, 0, 4);
        let s2 = graph.create(NodeKind::Store);
        graph.node_mut(s2).add_overwrite(DefSite::whole(alloc));
        let load = graph.create(NodeKind::Load);
        graph.add_edge(alloc, s1).unwrap();
        graph.add_edge(s1, s2).unwrap();
        graph.add_edge(s2, load).unwrap();
        graph.set_root(alloc);

        let options = AnalysisOptions::default().with_strong_update_unknown_size(true);
        let mut analysis = ReachingDefinitions::new(graph, options).unwrap();
        analysis.run().unwrap();

        let writers = analysis
            .graph()
            .node(load)
            .reaching_definitions(alloc, Offset::Byte(0), Offset::Byte(4));
        assert_eq!(writers, WriterSet::from([s2]));
    }

    #[test]
    fn test_run_is_idempotent() {
        let mut graph = DefinitionGraph::new();
        let alloc = graph.create(NodeKind::Alloc);
        let s1 = strong_store(&mut graph, alloc, 0, 4);
        let load = graph.create(NodeKind::Load);
        graph.add_edge(alloc, s1).unwrap();
        graph.add_edge(s1, load).unwrap();
        graph.set_root(alloc);

        let mut analysis = ReachingDefinitions::with_defaults(graph).unwrap();
        analysis.run().unwrap();
        let first = analysis.graph().node(load).reaching().clone();
        analysis.run().unwrap();
        assert_eq!(&first, analysis.graph().node(load).reaching());
    }
}
