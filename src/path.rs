//! Reusable descent paths.
//!
//! A [`Path`] records every slot traversed on the way to a leaf: the root
//! slot first, then one [`Level`] per routing octet consumed. Callers keep
//! the path around to reason about ancestors of the found name (delegation
//! points, the closest encloser) without descending again, and may truncate
//! it to an ancestor level to resume a later lookup from there.
//!
//! A path borrows nothing; levels hold arena indices into the owning tree.
//! It is only meaningful against the tree that produced it, and only until
//! that tree's next mutation through a different path.

use arrayvec::ArrayVec;

/// Every level consumes at least one key octet, so key length bounds height.
pub const MAX_HEIGHT: usize = 255;

/// A reference to a tree slot: either an inner node or a leaf.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum NodeRef {
    Inner(u32),
    Leaf(u32),
}

/// One traversed slot. `depth` is the key index of the routing octet that
/// led into this slot; the root level sits at depth 0 without a routing
/// octet of its own.
#[derive(Clone, Copy, Debug)]
pub struct Level {
    pub depth: u8,
    pub node: NodeRef,
}

/// The sequence of slots traversed during one descent.
#[derive(Clone, Default)]
pub struct Path {
    levels: ArrayVec<Level, MAX_HEIGHT>,
}

impl Path {
    pub fn new() -> Self {
        Path {
            levels: ArrayVec::new(),
        }
    }

    /// Forgets the recorded descent so the next lookup starts at the root.
    pub fn reset(&mut self) {
        self.levels.clear();
    }

    /// Drops levels until at most `height` remain. Lookups resume from the
    /// surviving tip, so the retained levels must lie on the new key's path.
    pub fn truncate(&mut self, height: usize) {
        self.levels.truncate(height);
    }

    pub fn height(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    /// The deepest recorded level.
    pub fn top(&self) -> Option<&Level> {
        self.levels.last()
    }

    /// Seeds or resumes a descent; returns the key depth to continue from.
    ///
    /// An empty path starts at the root. A populated one picks up at its tip:
    /// the tip node's own prefix has not been replayed against the new key
    /// yet, so descent restarts just past the tip's routing octet.
    pub(crate) fn descend_from(&mut self, root: NodeRef) -> usize {
        if self.levels.is_empty() {
            self.levels.push(Level {
                depth: 0,
                node: root,
            });
            return 0;
        }
        debug_assert_eq!(self.levels[0].depth, 0);
        debug_assert_eq!(self.levels[0].node, root);
        if self.levels.len() == 1 {
            0
        } else {
            self.tip().depth as usize + 1
        }
    }

    pub(crate) fn tip(&self) -> &Level {
        self.levels.last().expect("descent keeps at least the root level")
    }

    pub(crate) fn push(&mut self, depth: usize, node: NodeRef) {
        self.levels.push(Level {
            depth: depth as u8,
            node,
        });
    }

    pub(crate) fn pop(&mut self) {
        self.levels.pop();
    }

    pub(crate) fn set_tip_node(&mut self, node: NodeRef) {
        let last = self.levels.last_mut().expect("descent keeps at least the root level");
        last.node = node;
    }
}
