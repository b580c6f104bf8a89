//! The depth-indexed leaf queue.
//!
//! `queue[d]` is a doubly linked list of every node at depth `d` that
//! currently carries a `Count` datum. The links live directly on each
//! node's `CountCell` (`prev`/`next` point at other nodes with data, not at
//! a separate cell type), so the queue itself only stores the per-depth
//! head/tail. Squashing walks this structure from the deepest bucket to the
//! shallowest so that, by the time a node is examined, everything below it
//! has already been resolved.

use super::node::{Arena, CountCell, NodeId, Tree};
use super::symbol::Symbol;
use crate::error::EngineError;

#[derive(Copy, Clone)]
struct Bucket {
    head: NodeId,
    tail: NodeId,
}

impl Bucket {
    const EMPTY: Bucket = Bucket {
        head: NodeId::DUMMY,
        tail: NodeId::DUMMY,
    };
}

pub(crate) struct LeafQueue {
    buckets: Vec<Bucket>,
}

impl LeafQueue {
    pub fn new() -> Self {
        LeafQueue { buckets: Vec::new() }
    }

    fn ensure_depth(&mut self, depth: u32) -> Result<(), EngineError> {
        let depth = depth as usize;
        if self.buckets.len() <= depth {
            let additional = depth + 1 - self.buckets.len();
            self.buckets
                .try_reserve(additional)
                .map_err(|_| EngineError::QueueExhausted)?;
            self.buckets.resize(depth + 1, Bucket::EMPTY);
        }
        Ok(())
    }

    /// Links a node that just gained a `Count` datum into `queue[depth]`,
    /// appended at the back (insertion order within a depth).
    pub fn push<X: Symbol>(
        &mut self,
        arena: &mut Arena<X>,
        depth: u32,
        id: NodeId,
        count: i64,
    ) -> Result<(), EngineError> {
        self.ensure_depth(depth)?;
        let bucket = &mut self.buckets[depth as usize];
        let prev = bucket.tail;
        arena.get_mut(id).data = Some(CountCell {
            count,
            prev,
            next: NodeId::DUMMY,
        });
        if prev.is_dummy() {
            bucket.head = id;
        } else {
            arena.get_mut(prev).data.as_mut().unwrap().next = id;
        }
        bucket.tail = id;
        Ok(())
    }

    /// Unlinks `id` from `queue[depth]` and clears its `Count` datum.
    pub fn unlink<X: Symbol>(&mut self, arena: &mut Arena<X>, depth: u32, id: NodeId) {
        let (prev, next) = {
            let cell = arena
                .get(id)
                .data
                .as_ref()
                .expect("queue: unlink on node without data");
            (cell.prev, cell.next)
        };
        if prev.is_dummy() {
            self.buckets[depth as usize].head = next;
        } else {
            arena.get_mut(prev).data.as_mut().unwrap().next = next;
        }
        if next.is_dummy() {
            self.buckets[depth as usize].tail = prev;
        } else {
            arena.get_mut(next).data.as_mut().unwrap().prev = prev;
        }
        arena.get_mut(id).data = None;
    }

    /// Visits every data-bearing node, deepest depth first. `f` may unlink
    /// the node it is currently visiting (or any other node already
    /// visited) — the next pointer is read before `f` runs, so a squash
    /// that removes the current cell doesn't break iteration. `f` receives
    /// the whole tree (not just the arena) because squashing a node may
    /// need to merge it into its sole remaining child.
    pub fn for_each_deep_to_shallow<X: Symbol>(
        &mut self,
        tree: &mut Tree<X>,
        mut f: impl FnMut(&mut Self, &mut Tree<X>, NodeId, u32) -> Result<(), EngineError>,
    ) -> Result<(), EngineError> {
        for depth in (0..self.buckets.len()).rev() {
            let mut cur = self.buckets[depth].head;
            while !cur.is_dummy() {
                let next = tree
                    .arena
                    .get(cur)
                    .data
                    .as_ref()
                    .expect("queue: corrupt bucket, node without data")
                    .next;
                f(self, tree, cur, depth as u32)?;
                cur = next;
            }
        }
        Ok(())
    }
}
