//! The graph arena: node ownership, CFG edges, and block construction.

use std::collections::VecDeque;
use std::fmt::Write as _;

use crate::graph::{Block, BlockId, DefNode, NodeId, NodeKind};
use crate::utils::escape_dot;
use crate::{Error, Result};

/// The program graph the reaching-definitions analysis runs over.
///
/// The graph owns its nodes and blocks by value in arenas and hands out stable
/// [`NodeId`]/[`BlockId`] indices. Arena slot 0 is reserved for the
/// [`UNKNOWN_MEMORY`](crate::graph::UNKNOWN_MEMORY) sentinel, so ids of real nodes
/// start at 1 and grow monotonically with every [`create`](Self::create) call.
///
/// The front-end builds the graph: create nodes, fill their definition and use
/// sites, link them with [`add_edge`](Self::add_edge), and designate the entry with
/// [`set_root`](Self::set_root) (for whole-program analysis, the entry of `main`).
/// [`build_blocks`](Self::build_blocks) then partitions the nodes into maximal
/// straight-line runs; afterwards the node-to-block association is frozen until the
/// next rebuild.
///
/// The graph is movable but deliberately not cloneable: writer sets reference nodes
/// by id, and duplicating the arena would silently alias two graphs' identities.
///
/// # Example
///
/// ```rust
/// use defflow::{DefSite, DefinitionGraph, NodeKind};
///
/// let mut graph = DefinitionGraph::new();
/// let alloc = graph.create(NodeKind::Alloc);
/// let store = graph.create(NodeKind::Store);
/// graph.node_mut(store).add_def(DefSite::new(alloc, 0u64, 4u64), true);
/// graph.add_edge(alloc, store)?;
/// graph.set_root(alloc);
/// # Ok::<(), defflow::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct DefinitionGraph {
    /// Node arena; slot 0 is the sentinel.
    nodes: Vec<DefNode>,
    /// Block arena, in creation (BFS) order.
    blocks: Vec<Block>,
    /// The designated entry node.
    root: Option<NodeId>,
}

impl DefinitionGraph {
    /// Creates an empty graph with the sentinel slot reserved.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![DefNode::new(NodeKind::None)],
            blocks: Vec::new(),
            root: None,
        }
    }

    /// Creates a new node of the given kind and returns its id.
    ///
    /// Ids are assigned monotonically; the node starts with no definition sites and
    /// no CFG edges.
    pub fn create(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(DefNode::new(kind));
        id
    }

    /// Adds a directed CFG edge `from -> to`, maintaining both adjacency lists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphError`] if either endpoint does not exist or is the
    /// [`UNKNOWN_MEMORY`](crate::graph::UNKNOWN_MEMORY) sentinel, which never
    /// participates in control flow.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) -> Result<()> {
        self.check_endpoint(from)?;
        self.check_endpoint(to)?;
        self.nodes[from.0].succs_mut().push(to);
        self.nodes[to.0].preds_mut().push(from);
        Ok(())
    }

    fn check_endpoint(&self, id: NodeId) -> Result<()> {
        if id.is_unknown_memory() {
            return Err(Error::GraphError(format!(
                "the {id} sentinel cannot participate in control flow"
            )));
        }
        if id.0 >= self.nodes.len() {
            return Err(Error::GraphError(format!(
                "node {id} does not exist in the graph"
            )));
        }
        Ok(())
    }

    /// Returns the designated entry node, if one has been set.
    #[must_use]
    pub const fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Designates the entry node of the graph.
    ///
    /// Validation (existence, non-sentinel) happens when an analysis is
    /// constructed over the graph.
    pub fn set_root(&mut self, root: NodeId) {
        self.root = Some(root);
    }

    /// Returns the number of nodes, excluding the sentinel.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len() - 1
    }

    /// Returns a reference to a node.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not name a node of this graph.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &DefNode {
        &self.nodes[id.0]
    }

    /// Returns a mutable reference to a node.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not name a node of this graph.
    pub fn node_mut(&mut self, id: NodeId) -> &mut DefNode {
        &mut self.nodes[id.0]
    }

    /// Returns an iterator over all nodes in id order, excluding the sentinel.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &DefNode)> {
        self.nodes
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, n)| (NodeId(i), n))
    }

    /// Collects the nodes reachable from `start` in breadth-first order.
    ///
    /// Used by block construction; also handy for front-ends that post-process
    /// freshly built graphs.
    #[must_use]
    pub fn bfs_from(&self, start: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        if start.0 >= self.nodes.len() {
            return order;
        }
        let mut visited = vec![false; self.nodes.len()];
        let mut queue = VecDeque::new();
        visited[start.0] = true;
        queue.push_back(start);
        while let Some(n) = queue.pop_front() {
            order.push(n);
            for &s in self.nodes[n.0].succs() {
                if !visited[s.0] {
                    visited[s.0] = true;
                    queue.push_back(s);
                }
            }
        }
        order
    }

    /// Partitions the reachable nodes into maximal straight-line blocks.
    ///
    /// A node starts a new block iff it is the root, has a predecessor count other
    /// than one, its sole predecessor branches, or either it or its sole
    /// predecessor is a boundary kind (see [`NodeKind::is_block_boundary`]). Blocks
    /// are created in BFS order from the root; after this call every reachable node
    /// belongs to exactly one block and unreachable nodes to none.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingRoot`] if no root has been designated.
    pub fn build_blocks(&mut self) -> Result<()> {
        let root = self.root.ok_or(Error::MissingRoot)?;
        for node in &mut self.nodes {
            node.set_block(None);
        }
        self.blocks.clear();

        let order = self.bfs_from(root);
        for &leader in &order {
            if self.nodes[leader.0].block().is_some() || !self.is_block_leader(leader, root) {
                continue;
            }
            let block_id = BlockId(self.blocks.len());
            let mut block = Block::new();
            let mut cur = leader;
            loop {
                block.append(cur);
                self.nodes[cur.0].set_block(Some(block_id));
                let node = &self.nodes[cur.0];
                if node.succs().len() != 1 {
                    break;
                }
                let next = node.succs()[0];
                if self.nodes[next.0].block().is_some() || self.is_block_leader(next, root) {
                    break;
                }
                cur = next;
            }
            self.blocks.push(block);
        }

        debug_assert!(
            order.iter().all(|&n| self.nodes[n.0].block().is_some()),
            "every reachable node must be assigned to a block"
        );
        Ok(())
    }

    /// Does `n` start a new basic block?
    fn is_block_leader(&self, n: NodeId, root: NodeId) -> bool {
        if n == root {
            return true;
        }
        let node = &self.nodes[n.0];
        if node.kind().is_block_boundary() || node.preds().len() != 1 {
            return true;
        }
        let pred = &self.nodes[node.preds()[0].0];
        pred.succs().len() != 1 || pred.kind().is_block_boundary()
    }

    /// Returns the blocks in creation (BFS) order.
    #[must_use]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Returns the number of blocks.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Returns a reference to a block.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not name a block of this graph.
    #[must_use]
    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0]
    }

    pub(crate) fn block_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.blocks[id.0]
    }

    /// Returns the blocks control can come from, in first-seen order.
    ///
    /// Derived from the CFG edges of the block's first node; blocks do not store
    /// their own edge lists.
    #[must_use]
    pub fn block_predecessors(&self, id: BlockId) -> Vec<BlockId> {
        let mut out = Vec::new();
        if let Some(first) = self.blocks[id.0].first() {
            for &p in self.nodes[first.0].preds() {
                if let Some(b) = self.nodes[p.0].block() {
                    if !out.contains(&b) {
                        out.push(b);
                    }
                }
            }
        }
        out
    }

    /// Returns the blocks control can continue to, in first-seen order.
    #[must_use]
    pub fn block_successors(&self, id: BlockId) -> Vec<BlockId> {
        let mut out = Vec::new();
        if let Some(last) = self.blocks[id.0].last() {
            for &s in self.nodes[last.0].succs() {
                if let Some(b) = self.nodes[s.0].block() {
                    if !out.contains(&b) {
                        out.push(b);
                    }
                }
            }
        }
        out
    }

    /// Renders the graph in DOT format for Graphviz.
    ///
    /// Nodes are labeled with their id, kind, and definition sites; useful when
    /// debugging front-end graph construction.
    #[must_use]
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph definitions {\n  node [shape=box];\n");
        for (id, node) in self.nodes() {
            let mut label = format!("{id}: {}", node.kind());
            for ds in node.overwrites() {
                let _ = write!(label, "\nW! {ds}");
            }
            for ds in node.defs() {
                let _ = write!(label, "\nW {ds}");
            }
            for ds in node.uses() {
                let _ = write!(label, "\nR {ds}");
            }
            let _ = writeln!(out, "  {id} [label=\"{}\"];", escape_dot(&label));
        }
        for (id, node) in self.nodes() {
            for &succ in node.succs() {
                let _ = writeln!(out, "  {id} -> {succ};");
            }
        }
        out.push_str("}\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::UNKNOWN_MEMORY;

    /// Links `nodes` into a straight line and returns the graph.
    fn chain(graph: &mut DefinitionGraph, nodes: &[NodeId]) {
        for pair in nodes.windows(2) {
            graph.add_edge(pair[0], pair[1]).unwrap();
        }
    }

    #[test]
    fn test_ids_are_monotone_and_skip_sentinel() {
        let mut graph = DefinitionGraph::new();
        let a = graph.create(NodeKind::Alloc);
        let b = graph.create(NodeKind::Store);
        assert_eq!(a.index(), 1);
        assert_eq!(b.index(), 2);
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn test_add_edge_is_bidirectional() {
        let mut graph = DefinitionGraph::new();
        let a = graph.create(NodeKind::Noop);
        let b = graph.create(NodeKind::Noop);
        graph.add_edge(a, b).unwrap();

        assert_eq!(graph.node(a).succs(), &[b]);
        assert_eq!(graph.node(b).preds(), &[a]);
    }

    #[test]
    fn test_sentinel_edges_rejected() {
        let mut graph = DefinitionGraph::new();
        let a = graph.create(NodeKind::Noop);
        assert!(graph.add_edge(a, UNKNOWN_MEMORY).is_err());
        assert!(graph.add_edge(UNKNOWN_MEMORY, a).is_err());
        assert!(graph.add_edge(a, NodeId::new(99)).is_err());
    }

    #[test]
    fn test_bfs_order() {
        let mut graph = DefinitionGraph::new();
        let a = graph.create(NodeKind::Noop);
        let b = graph.create(NodeKind::Noop);
        let c = graph.create(NodeKind::Noop);
        let d = graph.create(NodeKind::Noop);
        graph.add_edge(a, b).unwrap();
        graph.add_edge(a, c).unwrap();
        graph.add_edge(b, d).unwrap();
        graph.add_edge(c, d).unwrap();

        assert_eq!(graph.bfs_from(a), vec![a, b, c, d]);
    }

    #[test]
    fn test_straight_line_is_one_block() {
        let mut graph = DefinitionGraph::new();
        let nodes: Vec<_> = (0..4).map(|_| graph.create(NodeKind::Store)).collect();
        chain(&mut graph, &nodes);
        graph.set_root(nodes[0]);
        graph.build_blocks().unwrap();

        assert_eq!(graph.block_count(), 1);
        assert_eq!(graph.block(BlockId::new(0)).nodes(), nodes.as_slice());
    }

    #[test]
    fn test_diamond_makes_four_blocks() {
        let mut graph = DefinitionGraph::new();
        let entry = graph.create(NodeKind::Noop);
        let left = graph.create(NodeKind::Store);
        let right = graph.create(NodeKind::Store);
        let merge = graph.create(NodeKind::Noop);
        graph.add_edge(entry, left).unwrap();
        graph.add_edge(entry, right).unwrap();
        graph.add_edge(left, merge).unwrap();
        graph.add_edge(right, merge).unwrap();
        graph.set_root(entry);
        graph.build_blocks().unwrap();

        // left/right start blocks (branching pred), merge starts one (two preds).
        assert_eq!(graph.block_count(), 4);
        let merge_block = graph.node(merge).block().unwrap();
        assert_eq!(graph.block_predecessors(merge_block).len(), 2);
    }

    #[test]
    fn test_boundary_kind_splits_straight_line() {
        let mut graph = DefinitionGraph::new();
        let s1 = graph.create(NodeKind::Store);
        let call = graph.create(NodeKind::Call);
        let s2 = graph.create(NodeKind::Store);
        chain(&mut graph, &[s1, call, s2]);
        graph.set_root(s1);
        graph.build_blocks().unwrap();

        // The call gets its own block even though the line never branches.
        assert_eq!(graph.block_count(), 3);
        assert_ne!(graph.node(s1).block(), graph.node(call).block());
        assert_ne!(graph.node(call).block(), graph.node(s2).block());
    }

    #[test]
    fn test_unreachable_nodes_stay_blockless() {
        let mut graph = DefinitionGraph::new();
        let a = graph.create(NodeKind::Noop);
        let orphan = graph.create(NodeKind::Store);
        graph.set_root(a);
        graph.build_blocks().unwrap();

        assert!(graph.node(a).block().is_some());
        assert!(graph.node(orphan).block().is_none());
    }

    #[test]
    fn test_loop_back_edge_blocks() {
        let mut graph = DefinitionGraph::new();
        let entry = graph.create(NodeKind::Noop);
        let body = graph.create(NodeKind::Store);
        graph.add_edge(entry, body).unwrap();
        graph.add_edge(body, entry).unwrap();
        graph.set_root(entry);
        graph.build_blocks().unwrap();

        // entry has two predecessors' worth of in-edges only after the back
        // edge; it is the root either way, and the self-cycle must terminate.
        assert_eq!(graph.block_count(), 1);
        let b = graph.node(entry).block().unwrap();
        assert_eq!(graph.block_successors(b), vec![b]);
    }

    #[test]
    fn test_build_blocks_requires_root() {
        let mut graph = DefinitionGraph::new();
        graph.create(NodeKind::Noop);
        assert!(matches!(graph.build_blocks(), Err(Error::MissingRoot)));
    }

    #[test]
    fn test_to_dot_contains_nodes_and_edges() {
        let mut graph = DefinitionGraph::new();
        let a = graph.create(NodeKind::Alloc);
        let s = graph.create(NodeKind::Store);
        graph.add_edge(a, s).unwrap();

        let dot = graph.to_dot();
        assert!(dot.contains("n1 [label=\"n1: alloc\"]"));
        assert!(dot.contains("n1 -> n2;"));
    }
}
