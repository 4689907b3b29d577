//! Graph vertices: typed memory operations with their definition sites.

use std::fmt;

use strum::{EnumCount, EnumIter};

use crate::graph::BlockId;
use crate::mem::{DefSite, DefSiteSet, DefinitionsMap, Offset, WriterSet};

/// A strongly-typed identifier for nodes within a [`DefinitionGraph`](crate::DefinitionGraph).
///
/// `NodeId` wraps a `usize` arena index. Ids are assigned sequentially when nodes are
/// created and double as the identity of the memory objects the nodes stand for:
/// writer sets and definition sites store `NodeId`s, never references, so the graph
/// can hold its inherently cyclic CFG without ownership cycles.
///
/// Index 0 is reserved for the [`UNKNOWN_MEMORY`] sentinel.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Creates a new `NodeId` from a raw index value.
    ///
    /// Primarily intended for internal use and testing; normal usage obtains ids
    /// from [`DefinitionGraph::create`](crate::DefinitionGraph::create).
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        NodeId(index)
    }

    /// Returns the raw index value of this node identifier.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }

    /// Returns `true` if this is the [`UNKNOWN_MEMORY`] sentinel.
    #[must_use]
    #[inline]
    pub const fn is_unknown_memory(self) -> bool {
        self.0 == UNKNOWN_MEMORY.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// The sentinel node standing for "some unspecified memory object or writer".
///
/// Every graph reserves arena slot 0 for the sentinel: a [`NodeKind::None`] node
/// with no CFG edges. The constant is the identity — writer sets compare it by
/// `NodeId` equality, so the collapsing rule of the precision cap works across maps
/// and graphs. The sentinel is its own target but is never defined or used by
/// front-end code directly.
pub const UNKNOWN_MEMORY: NodeId = NodeId(0);

/// The operation a node performs, as far as memory is concerned.
///
/// The engine dispatches its transfer function on this single enum; there is no
/// per-kind subclassing, which keeps the per-node dispatch a plain jump table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumCount, EnumIter)]
pub enum NodeKind {
    /// Invalid or sentinel node.
    None,
    /// A static allocation site. The node itself names the memory object.
    Alloc,
    /// A dynamic allocation site (heap).
    DynAlloc,
    /// A write to memory.
    Store,
    /// A read from memory.
    Load,
    /// Control-merge point with no local effects.
    Phi,
    /// Return from a subprogram.
    Return,
    /// A call; either expanded into a callee subgraph or opaque.
    Call,
    /// The point in the caller where an expanded call returns.
    CallReturn,
    /// Spawns concurrent successors.
    Fork,
    /// Joins concurrent predecessors.
    Join,
    /// No memory effect.
    Noop,
}

impl NodeKind {
    /// Returns `true` for kinds that force a basic-block boundary.
    ///
    /// These nodes always start (and terminate) their own block: control either
    /// merges into them, leaves through them, or crosses a procedure/thread
    /// boundary at them.
    #[must_use]
    pub const fn is_block_boundary(self) -> bool {
        matches!(
            self,
            NodeKind::Fork
                | NodeKind::Join
                | NodeKind::Phi
                | NodeKind::Call
                | NodeKind::CallReturn
                | NodeKind::Return
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::None => "none",
            NodeKind::Alloc => "alloc",
            NodeKind::DynAlloc => "dyn-alloc",
            NodeKind::Store => "store",
            NodeKind::Load => "load",
            NodeKind::Phi => "phi",
            NodeKind::Return => "return",
            NodeKind::Call => "call",
            NodeKind::CallReturn => "call-return",
            NodeKind::Fork => "fork",
            NodeKind::Join => "join",
            NodeKind::Noop => "noop",
        };
        f.write_str(name)
    }
}

/// One vertex of the program graph.
///
/// A node carries three local fact sets filled in by the front-end — weak defines
/// (`defs`), strong defines (`overwrites`), and reads (`uses`) — plus the CFG links
/// to its neighbors. The `reaching` map is computed by the analysis: for each
/// target, the writers that may have produced the last write observable at this
/// node's entry.
///
/// Nodes are created through [`DefinitionGraph::create`](crate::DefinitionGraph::create)
/// and owned by the graph arena; they are addressed by [`NodeId`] everywhere else.
#[derive(Debug, Clone)]
pub struct DefNode {
    kind: NodeKind,
    /// Weak writes: this node may define these byte ranges.
    defs: DefSiteSet,
    /// Strong writes: this node certainly overwrites these byte ranges.
    overwrites: DefSiteSet,
    /// Reads performed by this node.
    uses: DefSiteSet,
    /// CFG predecessors.
    preds: Vec<NodeId>,
    /// CFG successors.
    succs: Vec<NodeId>,
    /// The block this node belongs to, once blocks are built.
    block: Option<BlockId>,
    /// Computed incoming reaching-definitions map.
    reaching: DefinitionsMap,
    /// For [`NodeKind::Call`]: the callee is external and unanalyzable.
    opaque: bool,
}

impl DefNode {
    /// Creates a detached node. Only the graph arena constructs nodes.
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            defs: DefSiteSet::new(),
            overwrites: DefSiteSet::new(),
            uses: DefSiteSet::new(),
            preds: Vec::new(),
            succs: Vec::new(),
            block: None,
            reaching: DefinitionsMap::new(),
            opaque: false,
        }
    }

    /// Returns the operation kind of this node.
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Returns the weak definition sites of this node.
    #[must_use]
    pub const fn defs(&self) -> &DefSiteSet {
        &self.defs
    }

    /// Returns the strong definition sites of this node.
    #[must_use]
    pub const fn overwrites(&self) -> &DefSiteSet {
        &self.overwrites
    }

    /// Returns the use sites of this node.
    #[must_use]
    pub const fn uses(&self) -> &DefSiteSet {
        &self.uses
    }

    /// Records that this node defines the byte range `ds`.
    ///
    /// A strong definition certainly overwrites the whole range and kills prior
    /// writers; a weak one may or may not.
    pub fn add_def(&mut self, ds: DefSite, strong: bool) {
        if strong {
            self.overwrites.insert(ds);
        } else {
            self.defs.insert(ds);
        }
    }

    /// Records a strong definition. Shorthand for [`add_def`](Self::add_def).
    pub fn add_overwrite(&mut self, ds: DefSite) {
        self.overwrites.insert(ds);
    }

    /// Records that this node reads the byte range `ds`.
    pub fn add_use(&mut self, ds: DefSite) {
        self.uses.insert(ds);
    }

    /// Returns `true` if this node strongly overwrites exactly the site `ds`.
    #[must_use]
    pub fn is_overwritten(&self, ds: &DefSite) -> bool {
        self.overwrites.contains(ds)
    }

    /// Does this node define `target` at `offset`?
    ///
    /// With a finite `offset`, both the weak and strong sites are consulted and
    /// matched against their byte ranges. With [`Offset::Unknown`], only the weak
    /// sites are checked for a matching target: an unknown-offset query must not be
    /// answered from strong-update entries, whose whole point is a precisely
    /// bounded range.
    #[must_use]
    pub fn defines(&self, target: NodeId, offset: Offset) -> bool {
        if offset.is_unknown() {
            self.defs.iter().any(|ds| ds.target == target)
        } else {
            self.defs
                .iter()
                .chain(self.overwrites.iter())
                .any(|ds| ds.target == target && offset.in_range(ds.offset, ds.offset + ds.len))
        }
    }

    /// Returns `true` if any use of this node reads [`UNKNOWN_MEMORY`].
    #[must_use]
    pub fn uses_unknown(&self) -> bool {
        self.uses.iter().any(|ds| ds.target.is_unknown_memory())
    }

    /// Marks a [`NodeKind::Call`] node as calling an unanalyzable external callee.
    pub fn set_opaque(&mut self, opaque: bool) {
        self.opaque = opaque;
    }

    /// Returns `true` if this call node's callee is opaque.
    #[must_use]
    pub const fn is_opaque(&self) -> bool {
        self.opaque
    }

    /// Returns the CFG predecessors of this node.
    #[must_use]
    pub fn preds(&self) -> &[NodeId] {
        &self.preds
    }

    /// Returns the CFG successors of this node.
    #[must_use]
    pub fn succs(&self) -> &[NodeId] {
        &self.succs
    }

    /// Returns the block this node belongs to, once blocks are built.
    #[must_use]
    pub const fn block(&self) -> Option<BlockId> {
        self.block
    }

    /// Returns the computed incoming reaching-definitions map.
    ///
    /// Empty until [`ReachingDefinitions::run`](crate::ReachingDefinitions::run)
    /// has executed; grows monotonically while the fixpoint iterates.
    #[must_use]
    pub const fn reaching(&self) -> &DefinitionsMap {
        &self.reaching
    }

    /// Queries the incoming map: which writers may reach the given byte range at
    /// this node's entry?
    ///
    /// This is what a def-use edge builder calls once per use site.
    #[must_use]
    pub fn reaching_definitions(&self, target: NodeId, offset: Offset, len: Offset) -> WriterSet {
        self.reaching.get(target, offset, len)
    }

    pub(crate) fn preds_mut(&mut self) -> &mut Vec<NodeId> {
        &mut self.preds
    }

    pub(crate) fn succs_mut(&mut self) -> &mut Vec<NodeId> {
        &mut self.succs
    }

    pub(crate) fn set_block(&mut self, block: Option<BlockId>) {
        self.block = block;
    }

    pub(crate) fn reaching_mut(&mut self) -> &mut DefinitionsMap {
        &mut self.reaching
    }
}
