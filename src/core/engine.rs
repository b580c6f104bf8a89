//! Owns the tree, the leaf queue, the active cursor, and the bucket state
//! that ties Ukkonen construction to lossy counting.

use std::rc::Rc;

use super::cursor::Cursor;
use super::node::{NodeId, Tree};
use super::queue::LeafQueue;
use super::symbol::Symbol;
use crate::error::EngineError;

/// What the cursor means going into the next `insert`.
///
/// `Uncompressed` is the common case: the cursor is left exactly where the
/// previous insert ended, and the next call only needs to retract it back to
/// the shared prefix. `Compressed` is entered at a bucket boundary: the
/// compression pass may have deleted or merged the node the cursor was
/// sitting on, so there is nothing safe to retract from. Instead the full
/// label of the previous destination is kept around and the next insert
/// replays `previous_label[0..common_prefix] ++ extension` from the root.
enum Mode<X: Symbol> {
    Uncompressed { previous_len: u32 },
    Compressed { previous_label: Vec<X> },
}

/// One reported heavy hitter: a label and its lower/mid/upper weight
/// estimates.
#[derive(Debug, Clone)]
pub struct HeavyHitter<X: Symbol> {
    pub label: Vec<X>,
    pub light: i64,
    pub total: i64,
    pub upper: i64,
}

/// The result of a call to [`Engine::output`].
#[derive(Debug, Clone)]
pub struct OutputReport<X: Symbol> {
    pub items: Vec<HeavyHitter<X>>,
    pub grand_total: i64,
}

/// The streaming heavy-hitter engine: a suffix tree under online
/// construction, pruned by lossy counting at fixed-size insertion buckets.
pub struct Engine<X: Symbol> {
    tree: Tree<X>,
    queue: LeafQueue,
    cursor: Cursor,
    mode: Mode<X>,
    bucket_size: u32,
    current_bucket: i64,
    remaining_in_current_bucket: u32,
    grand_total: i64,
}

impl<X: Symbol> Engine<X> {
    /// Builds a fresh engine. `error` is the lossy-counting error bound,
    /// `0 < error < 1`; `bucket_size = ceil(1 / error)`.
    pub fn create(error: f64) -> Self {
        debug_assert!(
            error > 0.0 && error < 1.0,
            "Engine::create: error must lie in (0, 1)"
        );
        let bucket_size = (1.0 / error).ceil() as u32;
        debug_assert!(bucket_size >= 1, "Engine::create: degenerate bucket size");
        Engine {
            tree: Tree::new(),
            queue: LeafQueue::new(),
            cursor: Cursor::at_root(),
            mode: Mode::Uncompressed { previous_len: 0 },
            bucket_size,
            current_bucket: 0,
            remaining_in_current_bucket: bucket_size,
            grand_total: 0,
        }
    }

    /// Inserts `previous_label[0..common_prefix] ++ extension` with sample
    /// weight `count`, online-extending the suffix tree and applying lossy
    /// counting at bucket boundaries. `common_prefix` is the number of
    /// leading symbols the new string shares with whatever was inserted
    /// last (`0` on the very first call).
    pub fn insert(
        &mut self,
        common_prefix: u32,
        extension: &[X],
        count: i64,
    ) -> Result<(), EngineError> {
        debug_assert!(count >= 0, "Engine::insert: count must be non-negative");

        let array: Rc<[X]> = match &self.mode {
            Mode::Uncompressed { previous_len } => {
                debug_assert!(
                    common_prefix <= *previous_len,
                    "Engine::insert: common_prefix exceeds previous insert's length"
                );
                self.cursor
                    .retract(&self.tree, previous_len.saturating_sub(common_prefix));
                Rc::from(extension)
            }
            Mode::Compressed { previous_label } => {
                debug_assert!(
                    common_prefix as usize <= previous_label.len(),
                    "Engine::insert: common_prefix exceeds previous label's length"
                );
                let mut full = Vec::with_capacity(common_prefix as usize + extension.len());
                full.extend_from_slice(&previous_label[..common_prefix as usize]);
                full.extend_from_slice(extension);
                self.cursor = Cursor::at_root();
                Rc::from(full.into_boxed_slice())
            }
        };

        let start_depth = self.cursor.depth(&self.tree);
        let total_len = start_depth + array.len() as u32;
        let mut index = 0usize;
        let mut j = start_depth as usize;
        let base = j;

        // The node created by the *first* leaf insertion below is the one
        // for the whole concatenated string: until `j` advances past `base`
        // we are still extending the longest (original) active suffix, and
        // the unique end-of-string symbol guarantees a leaf is created for
        // it at or before the final index.
        let mut destination = None;

        while index < array.len() {
            if j > base + index {
                index += 1;
                continue;
            }
            if self.cursor.scan(&self.tree, &array, index) {
                index += 1;
                continue;
            }
            let parent = self.cursor.split_at(&mut self.tree)?;
            let leaf = self.tree.add_leaf(parent, Rc::clone(&array), index)?;
            if j == base {
                destination = Some(leaf);
            }
            if parent != NodeId::ROOT {
                self.cursor.goto_suffix(&self.tree, parent);
            }
            j += 1;
        }

        debug_assert!(
            destination.is_some(),
            "Engine::insert: no leaf created for the full inserted string"
        );
        let destination = match destination {
            Some(d) => d,
            None => self.cursor.split_at(&mut self.tree)?,
        };
        self.ensure_suffix_links(destination)?;
        add_to_count(&mut self.tree, &mut self.queue, destination, total_len, count)?;
        self.grand_total += count;

        self.remaining_in_current_bucket -= 1;
        if self.remaining_in_current_bucket == 0 {
            self.current_bucket += 1;
            self.remaining_in_current_bucket = self.bucket_size;
            let previous_label = self.tree.full_label(destination);
            self.cursor = Cursor::at_root();
            self.mode = Mode::Compressed { previous_label };
            self.compress()?;
        } else {
            self.mode = Mode::Uncompressed {
                previous_len: total_len,
            };
        }

        #[cfg(debug_assertions)]
        self.debug_check_invariants();

        Ok(())
    }

    /// Walks from `n` up towards the root, splitting edges as needed to
    /// materialize a node at every suffix position and linking each newly
    /// created interior node's `suffix_link` to the node one suffix position
    /// shallower. Recursion bottoms out the moment an already-linked node
    /// (or the root) is reached.
    fn ensure_suffix_links(&mut self, n: NodeId) -> Result<(), EngineError> {
        if n == NodeId::ROOT || !self.tree.arena.get(n).suffix_link.is_dummy() {
            return Ok(());
        }
        let mut probe = Cursor::at_root();
        probe.goto_suffix(&self.tree, n);
        let target = probe.split_at(&mut self.tree)?;
        self.tree.arena.get_mut(n).suffix_link = target;
        self.tree.arena.get_mut(target).refcount += 2;
        self.ensure_suffix_links(target)
    }

    /// The lossy-counting squash pass: walks the leaf queue from the deepest
    /// bucket to the shallowest, deleting any count whose upper bound has
    /// fallen below the current threshold and folding its mass into the
    /// surviving ancestors.
    fn compress(&mut self) -> Result<(), EngineError> {
        let threshold = self.current_bucket;
        self.queue
            .for_each_deep_to_shallow(&mut self.tree, |queue, tree, node, depth| {
                let count = tree.arena.get(node).data.as_ref().unwrap().count;
                let own_bound = tree.arena.get(node).max_edge_squashed;
                let upper_bound = count + own_bound;
                if upper_bound >= threshold {
                    return Ok(());
                }
                queue.unlink(&mut tree.arena, depth, node);
                tree.arena.get_mut(node).refcount -= 2;
                squash(queue, tree, node, depth, count, upper_bound, threshold)
            })
    }

    /// Number of live, non-root nodes with no children. Exposed for tests
    /// that check the tree actually shrinks after compression, not just
    /// that the reported totals stay correct.
    pub fn leaf_count(&self) -> usize {
        let mut n = 0;
        self.tree.for_each_node(|_, node| {
            if node.first_child.is_dummy() {
                n += 1;
            }
        });
        n
    }

    /// Two-pass weight estimation and selection: first a deep-to-shallow
    /// sweep accumulates descendant totals on every node's `output`
    /// accumulator, then a post-order selection walk collects every node
    /// whose lower bound clears the frequency threshold.
    pub fn output(&mut self, frequency: f64) -> OutputReport<X> {
        debug_assert!(
            (0.0..=1.0).contains(&frequency),
            "Engine::output: frequency must lie in [0, 1]"
        );
        let threshold = (frequency * self.grand_total as f64).floor() as i64;

        self.tree.for_each_node_mut(|n| {
            n.output = Default::default();
        });

        let max_depth = self.tree.max_depth();
        for depth in (0..=max_depth).rev() {
            for n in self.tree.nodes_at_depth(depth) {
                let node = self.tree.arena.get(n);
                let own_count = node.data.as_ref().map(|c| c.count).unwrap_or(0);
                let total = own_count + node.output.descendants_count;
                let max_edge_squashed = node.max_edge_squashed;
                let heavy_total = if total - node.output.heavy_descendants_count
                    + max_edge_squashed
                    > threshold
                {
                    total
                } else {
                    node.output.heavy_descendants_count
                };
                let parent = node.parent;
                let suffix = node.suffix_link;

                self.accumulate(parent, total, heavy_total);
                if !suffix.is_dummy() {
                    self.accumulate(suffix, total, heavy_total);
                    if parent != NodeId::ROOT {
                        let grandparent_via_suffix = self.tree.arena.get(parent).suffix_link;
                        if !grandparent_via_suffix.is_dummy() {
                            self.accumulate(grandparent_via_suffix, -total, -heavy_total);
                        }
                    }
                }

                let n_mut = self.tree.arena.get_mut(n);
                n_mut.output.descendants_count = total;
                n_mut.output.heavy_descendants_count = heavy_total;
            }
        }

        let mut items = Vec::new();
        self.select_from(NodeId::ROOT, threshold, &mut items);
        items.sort_by(|a, b| b.light.cmp(&a.light));

        OutputReport {
            items,
            grand_total: self.grand_total,
        }
    }

    fn accumulate(&mut self, node: NodeId, total: i64, heavy_total: i64) {
        if node == NodeId::ROOT {
            return;
        }
        let out = &mut self.tree.arena.get_mut(node).output;
        out.descendants_count += total;
        out.heavy_descendants_count += heavy_total;
    }

    fn select_from(&self, n: NodeId, threshold: i64, out: &mut Vec<HeavyHitter<X>>) {
        let mut child = self.tree.arena.get(n).first_child;
        while !child.is_dummy() {
            self.select_from(child, threshold, out);
            child = self.tree.arena.get(child).next_sibling;
        }
        if n == NodeId::ROOT {
            return;
        }
        let node = self.tree.arena.get(n);
        let own_count = node.data.as_ref().map(|c| c.count).unwrap_or(0);
        let total = own_count + node.output.descendants_count;
        let light_total = total - node.output.heavy_descendants_count;
        let max_edge_squashed = node.max_edge_squashed;
        if light_total + max_edge_squashed > threshold {
            out.push(HeavyHitter {
                label: self.tree.full_label(n),
                light: light_total,
                total,
                upper: total + max_edge_squashed,
            });
        }
    }

    #[cfg(debug_assertions)]
    fn debug_check_invariants(&self) {
        self.tree.for_each_node(|_id, n| {
            let mut children = 0u32;
            let mut c = n.first_child;
            while !c.is_dummy() {
                children += 1;
                c = self.tree.arena.get(c).next_sibling;
            }
            debug_assert!(
                n.refcount >= children,
                "debug_check_invariants: refcount underflows structural contributors"
            );
            if let Some(cell) = &n.data {
                debug_assert!(
                    cell.count >= i64::MIN,
                    "debug_check_invariants: count cell present"
                );
            }
        });
    }
}

/// Adds `delta` to the count at `node` at the given `depth`, creating a
/// fresh `Count` cell and queue entry if it has none. A no-op at the root,
/// which is never counted. Free function (rather than an `Engine` method)
/// so the compression pass's squash recursion can call it through the same
/// `(queue, tree)` pair the leaf queue hands it, without borrowing all of
/// `Engine`.
fn add_to_count<X: Symbol>(
    tree: &mut Tree<X>,
    queue: &mut LeafQueue,
    node: NodeId,
    depth: u32,
    delta: i64,
) -> Result<(), EngineError> {
    if node == NodeId::ROOT {
        return Ok(());
    }
    let has_data = tree.arena.get(node).data.is_some();
    if has_data {
        tree.arena.get_mut(node).data.as_mut().unwrap().count += delta;
    } else {
        queue.push(&mut tree.arena, depth, node, delta)?;
        tree.arena.get_mut(node).refcount += 2;
    }
    Ok(())
}

/// Records a squashed count's mass into the surviving ancestors' bounds,
/// transfers its weight via the grandparent-via-suffix correction, and
/// collapses `node` structurally if it became unreferenced or degree-one.
/// `threshold` is only needed to decide whether losing `node`'s suffix-link
/// referrer cascades into squashing the link's target too.
fn squash<X: Symbol>(
    queue: &mut LeafQueue,
    tree: &mut Tree<X>,
    node: NodeId,
    depth: u32,
    count: i64,
    upper_bound: i64,
    threshold: i64,
) -> Result<(), EngineError> {
    let parent = tree.arena.get(node).parent;
    let edge_len = tree.arena.get(node).edge.len();

    {
        let cur = tree.arena.get(node).max_edge_squashed;
        tree.arena.get_mut(node).max_edge_squashed = cur.max(upper_bound);
    }
    if parent != NodeId::ROOT {
        let cur = tree.arena.get(parent).max_child_squashed;
        tree.arena.get_mut(parent).max_child_squashed = cur.max(upper_bound);
    }

    let parent_depth = depth - edge_len;
    add_to_count(tree, queue, parent, parent_depth, count)?;
    if parent != NodeId::ROOT {
        let suffix_of_parent = tree.arena.get(parent).suffix_link;
        if !suffix_of_parent.is_dummy() {
            add_to_count(
                tree,
                queue,
                suffix_of_parent,
                parent_depth.saturating_sub(1),
                -count,
            )?;
        }
    }
    let suffix = tree.arena.get(node).suffix_link;
    if !suffix.is_dummy() {
        add_to_count(tree, queue, suffix, depth.saturating_sub(1), count)?;
    }

    let refcount = tree.arena.get(node).refcount;
    if refcount == 0 {
        let sym = tree.arena.get(node).edge.key();
        tree.detach_child(parent, node, sym);
        let suffix_target = tree.arena.get(node).suffix_link;
        tree.arena.free(node);
        if !suffix_target.is_dummy() {
            let target_refcount = {
                let t = tree.arena.get_mut(suffix_target);
                t.refcount -= 2;
                t.refcount
            };
            // Losing its last referrer this way leaves `suffix_target` with
            // no data and no children (its only other possible contributors),
            // so it is safe to fold into its own ancestors the same way.
            if target_refcount == 0 {
                let own_bound = tree.arena.get(suffix_target).max_edge_squashed;
                if own_bound < threshold {
                    let target_depth = tree.arena.get(suffix_target).depth;
                    squash(queue, tree, suffix_target, target_depth, 0, own_bound, threshold)?;
                }
            }
        }
    } else if refcount == 1 {
        tree.merge_child(node, parent)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_insert_is_reported_in_full() {
        let mut engine = Engine::<u64>::create(0.5);
        engine.insert(0, &[1, 2, 3, 1000], 7).unwrap();

        let report = engine.output(0.0);
        assert_eq!(report.grand_total, 7);
        assert!(report
            .items
            .iter()
            .any(|h| h.label == vec![1, 2, 3, 1000] && h.total == 7));
    }

    #[test]
    fn grand_total_accumulates_across_inserts() {
        let mut engine = Engine::<u64>::create(0.5);
        engine.insert(0, &[1, 2, 1000], 3).unwrap();
        engine.insert(0, &[3, 4, 1001], 5).unwrap();

        let report = engine.output(0.0);
        assert_eq!(report.grand_total, 8);
    }

    #[test]
    fn shared_prefix_is_not_recounted_twice() {
        let mut engine = Engine::<u64>::create(0.5);
        engine.insert(0, &[1, 2, 1000], 4).unwrap();
        engine.insert(2, &[1001], 6).unwrap();

        let report = engine.output(0.0);
        assert_eq!(report.grand_total, 10);
        let prefix = report
            .items
            .iter()
            .find(|h| h.label == vec![1, 2])
            .expect("shared prefix [1, 2] must be reported as its own node");
        assert_eq!(prefix.total, 10);
    }

    #[test]
    fn high_frequency_threshold_drops_light_leaves() {
        let mut engine = Engine::<u64>::create(0.5);
        engine.insert(0, &[1, 2, 1000], 100).unwrap();
        engine.insert(0, &[1, 3, 1001], 1).unwrap();

        let report = engine.output(0.9);
        assert!(report.items.iter().any(|h| h.label == vec![1, 2, 1000]));
        assert!(!report.items.iter().any(|h| h.label == vec![1, 3, 1001]));
    }

    #[test]
    fn compression_runs_without_losing_the_grand_total() {
        let mut engine = Engine::<u64>::create(0.5);
        for i in 0..20u64 {
            engine.insert(0, &[1, 2, 3, 1000 + i], 1).unwrap();
        }
        let report = engine.output(0.0);
        assert_eq!(report.grand_total, 20);
    }
}
