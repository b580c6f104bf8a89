//! Vertices of the suffix tree, and the arena that owns them.
//!
//! The tree is cyclic (parent/child, node/suffix-link, queue-cell/node) so
//! it cannot be built from ordinary owned references in safe Rust. We use an
//! arena of node records addressed by a plain integer `NodeId`, with a
//! reserved sentinel standing in for "no such node" — tracking reference
//! counts manually rather than layering them on a language-provided smart
//! pointer, in the same spirit as a persistent trie's hand-rolled refcounts,
//! but without the unsafe raw-pointer bookkeeping those need, since this tree
//! is single-owner and single-threaded rather than a concurrently shared,
//! immutable structure.

use std::collections::HashMap;
use std::rc::Rc;

use super::symbol::Symbol;
use crate::error::EngineError;

/// Index into the node arena. `NodeId::DUMMY` is the sentinel for "absent" —
/// used for unset suffix links, an interior node's missing children, and an
/// empty leaf-queue bucket.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct NodeId(u32);

impl NodeId {
    pub const DUMMY: NodeId = NodeId(u32::MAX);
    /// The tree's distinguished root.
    pub const ROOT: NodeId = NodeId(0);

    #[inline]
    pub fn is_dummy(self) -> bool {
        self == NodeId::DUMMY
    }

    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// An edge label: a slice `array[start..start+len]` shared with whatever
/// insertion created it. Several nodes can point into the same backing
/// `array` after a split.
#[derive(Clone, Debug)]
pub struct EdgeLabel<X: Symbol> {
    array: Rc<[X]>,
    start: u32,
    len: u32,
}

impl<X: Symbol> EdgeLabel<X> {
    fn new(array: Rc<[X]>, start: u32, len: u32) -> Self {
        EdgeLabel { array, start, len }
    }

    /// The cached first symbol, used for child dispatch.
    #[inline]
    pub fn key(&self) -> X {
        self.array[self.start as usize]
    }

    #[inline]
    pub fn len(&self) -> u32 {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The symbol at offset `i` along this edge.
    #[inline]
    pub fn at(&self, i: u32) -> X {
        self.array[(self.start + i) as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = X> + '_ {
        self.array[self.start as usize..(self.start + self.len) as usize]
            .iter()
            .copied()
    }
}

/// The per-node lossy-counting datum, threaded into the depth-indexed leaf
/// queue. `prev`/`next` link to the nodes carrying the neighboring cells at
/// the same depth, not to arbitrary nodes.
#[derive(Debug)]
pub(crate) struct CountCell {
    /// Signed so that the grandparent-via-suffix correction can carry a
    /// transient negative contribution.
    pub count: i64,
    pub prev: NodeId,
    pub next: NodeId,
}

/// Transient accumulator used only while `Engine::output` walks the tree.
/// Cleared at the start of every `output` call.
#[derive(Copy, Clone, Debug, Default)]
pub(crate) struct Output {
    pub descendants_count: i64,
    pub heavy_descendants_count: i64,
}

/// A vertex of the suffix tree.
#[derive(Debug)]
pub(crate) struct Node<X: Symbol> {
    pub edge: EdgeLabel<X>,
    pub parent: NodeId,
    pub suffix_link: NodeId,
    pub first_child: NodeId,
    pub next_sibling: NodeId,
    /// Distance from the root in symbols; cached so depth lookups used by
    /// the cursor and the leaf queue don't need to walk to the root.
    pub depth: u32,
    /// `2 * (incoming suffix links) + 2 * (1 if data.is_some()) + (children)`.
    pub refcount: u32,
    pub data: Option<CountCell>,
    pub output: Output,
    pub max_edge_squashed: i64,
    pub max_child_squashed: i64,
}

enum Slot<X: Symbol> {
    Occupied(Node<X>),
    /// Free-list link to the next free slot, `NodeId::DUMMY` if none.
    Free(NodeId),
}

/// Owns every node. Freed slots are recycled via an intrusive free list so
/// that long-running squash/merge cycles don't grow memory unboundedly.
pub(crate) struct Arena<X: Symbol> {
    slots: Vec<Slot<X>>,
    free_head: NodeId,
}

impl<X: Symbol> Arena<X> {
    fn new() -> Self {
        let root = Node {
            edge: EdgeLabel::new(Rc::from([]), 0, 0),
            parent: NodeId::DUMMY,
            suffix_link: NodeId::DUMMY,
            first_child: NodeId::DUMMY,
            next_sibling: NodeId::DUMMY,
            depth: 0,
            refcount: 0,
            data: None,
            output: Output::default(),
            max_edge_squashed: 0,
            max_child_squashed: 0,
        };
        Arena {
            slots: vec![Slot::Occupied(root)],
            free_head: NodeId::DUMMY,
        }
    }

    /// Allocates a slot for `node`, reusing a freed one if available. Only
    /// the growth path (no free slot to reuse) can fail.
    pub fn alloc(&mut self, node: Node<X>) -> Result<NodeId, EngineError> {
        if self.free_head.is_dummy() {
            self.slots
                .try_reserve(1)
                .map_err(|_| EngineError::ArenaExhausted)?;
            let id = NodeId(self.slots.len() as u32);
            self.slots.push(Slot::Occupied(node));
            Ok(id)
        } else {
            let id = self.free_head;
            let Slot::Free(next) = self.slots[id.index()] else {
                panic!("arena: corrupt free list");
            };
            self.free_head = next;
            self.slots[id.index()] = Slot::Occupied(node);
            Ok(id)
        }
    }

    pub fn free(&mut self, id: NodeId) {
        debug_assert_ne!(id, NodeId::ROOT, "arena: root is never freed");
        self.slots[id.index()] = Slot::Free(self.free_head);
        self.free_head = id;
    }

    pub fn get(&self, id: NodeId) -> &Node<X> {
        match &self.slots[id.index()] {
            Slot::Occupied(n) => n,
            Slot::Free(_) => panic!("arena: use of freed NodeId {:?}", id),
        }
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node<X> {
        match &mut self.slots[id.index()] {
            Slot::Occupied(n) => n,
            Slot::Free(_) => panic!("arena: use of freed NodeId {:?}", id),
        }
    }

    pub fn depth(&self, id: NodeId) -> u32 {
        if id == NodeId::ROOT {
            0
        } else {
            self.get(id).depth
        }
    }
}

/// The tree proper: the node arena plus the root's hash-map child dispatch.
/// Root fan-out is the number of distinct first symbols seen in the whole
/// stream and can be large, so it gets a hash map; every other node's
/// fan-out is small (the live call-site set below one frame) and uses a
/// plain sibling list — a constant-factor choice, not an asymptotic one.
pub(crate) struct Tree<X: Symbol> {
    pub arena: Arena<X>,
    root_children: HashMap<X, NodeId>,
}

impl<X: Symbol> Tree<X> {
    pub fn new() -> Self {
        Tree {
            arena: Arena::new(),
            root_children: HashMap::new(),
        }
    }

    pub fn depth(&self, id: NodeId) -> u32 {
        self.arena.depth(id)
    }

    pub fn find_child(&self, parent: NodeId, sym: X) -> Option<NodeId> {
        if parent == NodeId::ROOT {
            return self.root_children.get(&sym).copied();
        }
        let mut cur = self.arena.get(parent).first_child;
        while !cur.is_dummy() {
            let n = self.arena.get(cur);
            if n.edge.key() == sym {
                return Some(cur);
            }
            cur = n.next_sibling;
        }
        None
    }

    /// Dispatch by first symbol; panics if absent — a missing child where
    /// one is expected is a broken invariant, not a recoverable error.
    pub fn get_child(&self, parent: NodeId, sym: X) -> NodeId {
        self.find_child(parent, sym)
            .unwrap_or_else(|| panic!("get_child: no child for symbol {:?}", sym))
    }

    /// Attaches `child` under `parent` (the root's hash map or a sibling
    /// list). Growing the root's hash map is the other resource-exhaustion
    /// case the arena allocator can hit.
    fn attach_child(&mut self, parent: NodeId, child: NodeId, sym: X) -> Result<(), EngineError> {
        if parent == NodeId::ROOT {
            if !self.root_children.contains_key(&sym) {
                self.root_children
                    .try_reserve(1)
                    .map_err(|_| EngineError::ArenaExhausted)?;
            }
            self.root_children.insert(sym, child);
            return Ok(());
        }
        let old_first = self.arena.get(parent).first_child;
        self.arena.get_mut(child).next_sibling = old_first;
        let p = self.arena.get_mut(parent);
        p.first_child = child;
        p.refcount += 1;
        Ok(())
    }

    pub(crate) fn detach_child(&mut self, parent: NodeId, child: NodeId, sym: X) {
        if parent == NodeId::ROOT {
            self.root_children.remove(&sym);
            return;
        }
        let first = self.arena.get(parent).first_child;
        if first == child {
            let next = self.arena.get(child).next_sibling;
            self.arena.get_mut(parent).first_child = next;
        } else {
            let mut cur = first;
            loop {
                debug_assert!(!cur.is_dummy(), "detach_child: child not in sibling list");
                let next = self.arena.get(cur).next_sibling;
                if next == child {
                    let after = self.arena.get(child).next_sibling;
                    self.arena.get_mut(cur).next_sibling = after;
                    break;
                }
                cur = next;
            }
        }
        self.arena.get_mut(parent).refcount -= 1;
    }

    /// Creates a leaf whose edge is `array[index..]`. The leaf inherits its
    /// parent's `max_child_squashed` as the worst-case delta already
    /// attributable to anything below the parent.
    pub fn add_leaf(
        &mut self,
        parent: NodeId,
        array: Rc<[X]>,
        index: usize,
    ) -> Result<NodeId, EngineError> {
        let len = (array.len() - index) as u32;
        let sym = array[index];
        let inherited = if parent == NodeId::ROOT {
            0
        } else {
            self.arena.get(parent).max_child_squashed
        };
        let depth = self.depth(parent) + len;
        let node = Node {
            edge: EdgeLabel::new(array, index as u32, len),
            parent,
            suffix_link: NodeId::DUMMY,
            first_child: NodeId::DUMMY,
            next_sibling: NodeId::DUMMY,
            depth,
            refcount: 0,
            data: None,
            output: Output::default(),
            max_edge_squashed: inherited,
            max_child_squashed: inherited,
        };
        let id = self.arena.alloc(node)?;
        self.attach_child(parent, id, sym)?;
        Ok(id)
    }

    /// Inserts a new interior node on the edge `parent -> child` whose edge
    /// is the first `len` symbols of `child`'s edge. Returns `parent`
    /// unchanged if `len == 0`.
    pub fn split_edge(
        &mut self,
        parent: NodeId,
        child: NodeId,
        len: u32,
    ) -> Result<NodeId, EngineError> {
        if len == 0 {
            return Ok(parent);
        }
        let child_edge = self.arena.get(child).edge.clone();
        debug_assert!(
            len < child_edge.len(),
            "split_edge: len must fall strictly within child's edge"
        );
        let sym = child_edge.key();
        let inherited = self.arena.get(child).max_edge_squashed;
        let m = Node {
            edge: EdgeLabel::new(child_edge.array.clone(), child_edge.start, len),
            parent,
            suffix_link: NodeId::DUMMY,
            first_child: NodeId::DUMMY,
            next_sibling: NodeId::DUMMY,
            depth: self.depth(parent) + len,
            refcount: 0,
            data: None,
            output: Output::default(),
            max_edge_squashed: inherited,
            max_child_squashed: inherited,
        };
        let m_id = self.arena.alloc(m)?;

        self.detach_child(parent, child, sym);
        self.attach_child(parent, m_id, sym)?;

        let child_tail_sym = {
            let c = self.arena.get_mut(child);
            c.edge.start += len;
            c.edge.len -= len;
            c.parent = m_id;
            c.edge.key()
        };
        self.attach_child(m_id, child, child_tail_sym)?;

        Ok(m_id)
    }

    /// Collapses a degree-1 interior node `t` into its sole child `c`, used
    /// during compression once `t` carries no count and has no incoming
    /// suffix links.
    pub fn merge_child(&mut self, t: NodeId, parent: NodeId) -> Result<NodeId, EngineError> {
        let c = self.arena.get(t).first_child;
        debug_assert!(!c.is_dummy(), "merge_child: t has no child");
        debug_assert!(
            self.arena.get(c).next_sibling.is_dummy(),
            "merge_child: t has more than one child"
        );

        let t_edge = self.arena.get(t).edge.clone();
        let c_edge = self.arena.get(c).edge.clone();
        let t_max_edge_squashed = self.arena.get(t).max_edge_squashed;

        let same_backing =
            Rc::ptr_eq(&t_edge.array, &c_edge.array) && t_edge.start + t_edge.len == c_edge.start;
        let new_edge = if same_backing {
            EdgeLabel::new(t_edge.array.clone(), t_edge.start, t_edge.len + c_edge.len)
        } else {
            let mut v: Vec<X> = Vec::with_capacity((t_edge.len + c_edge.len) as usize);
            v.extend(t_edge.iter());
            v.extend(c_edge.iter());
            EdgeLabel::new(Rc::from(v.into_boxed_slice()), 0, t_edge.len + c_edge.len)
        };

        let sym = t_edge.key();
        self.detach_child(parent, t, sym);
        {
            let cn = self.arena.get_mut(c);
            cn.edge = new_edge;
            cn.parent = parent;
            cn.max_edge_squashed = cn.max_edge_squashed.max(t_max_edge_squashed);
        }
        self.attach_child(parent, c, sym)?;
        self.arena.free(t);
        Ok(c)
    }

    /// Reconstructs the full label of `id` by walking to the root and
    /// concatenating edges in order. Used to save the previous full label at
    /// a bucket boundary and to render report rows.
    pub fn full_label(&self, mut id: NodeId) -> Vec<X> {
        let mut edges = Vec::new();
        while id != NodeId::ROOT {
            let n = self.arena.get(id);
            edges.push(n.edge.clone());
            id = n.parent;
        }
        edges.reverse();
        let mut out = Vec::new();
        for e in edges {
            out.extend(e.iter());
        }
        out
    }

    /// The deepest `depth` value among live, non-root nodes (0 if the tree
    /// is empty).
    pub fn max_depth(&self) -> u32 {
        self.arena
            .slots
            .iter()
            .filter_map(|s| match s {
                Slot::Occupied(n) => Some(n.depth),
                Slot::Free(_) => None,
            })
            .max()
            .unwrap_or(0)
    }

    /// Every live, non-root node whose cached `depth` equals `depth`.
    pub fn nodes_at_depth(&self, depth: u32) -> Vec<NodeId> {
        self.arena
            .slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| match s {
                Slot::Occupied(n) if i != NodeId::ROOT.index() && n.depth == depth => {
                    Some(NodeId(i as u32))
                }
                _ => None,
            })
            .collect()
    }

    /// Visits every live, non-root node by reference.
    pub fn for_each_node(&self, mut f: impl FnMut(NodeId, &Node<X>)) {
        for (i, s) in self.arena.slots.iter().enumerate() {
            if i == NodeId::ROOT.index() {
                continue;
            }
            if let Slot::Occupied(n) = s {
                f(NodeId(i as u32), n);
            }
        }
    }

    /// Visits every live, non-root node by mutable reference.
    pub fn for_each_node_mut(&mut self, mut f: impl FnMut(&mut Node<X>)) {
        for (i, s) in self.arena.slots.iter_mut().enumerate() {
            if i == NodeId::ROOT.index() {
                continue;
            }
            if let Slot::Occupied(n) = s {
                f(n);
            }
        }
    }
}
