//! # nametree
//!
//! An adaptive radix tree keyed by DNS domain names, built to serve as the
//! in-memory zone index of an authoritative name server.
//!
//! ## Features
//!
//! - **Canonical keys**: [`Key`] re-encodes a name so that plain byte order
//!   equals canonical DNS name order, lookups are case-insensitive, and no
//!   key is ever a prefix of another.
//! - **Adaptive nodes**: six node representations, from a four-entry scan up
//!   to a direct table, chosen per node by occupancy; the 16- and 32-wide
//!   layouts search their key vectors with SIMD compares, and a dense
//!   38-entry layout covers names in the preferred hostname syntax.
//! - **Reusable paths**: lookups and inserts record every traversed slot in
//!   a caller-owned [`Path`], so zone loaders and responders can reason
//!   about delegation points and the closest encloser, or resume a descent
//!   from a cached ancestor, without walking the tree again.
//! - **Lazy expansion**: single-leaf subtrees stay a leaf until a second
//!   name forces a split; up to eight octets of shared path compress into
//!   each inner node.
//!
//! ## Example
//!
//! ```rust
//! use nametree::{Key, NameTree, Path};
//!
//! let mut tree = NameTree::new();
//! let mut path = Path::new();
//!
//! let key = Key::from_text("ns1.example.org").unwrap();
//! let leaf = tree.make_path(&mut path, &key);
//! assert!(leaf.data.is_none());
//! leaf.data = Some("192.0.2.53");
//!
//! // Lookups are case-insensitive and record the full descent.
//! path.reset();
//! let key = Key::from_text("NS1.Example.Org").unwrap();
//! let leaf = tree.find_path(&mut path, &key).unwrap();
//! assert_eq!(leaf.data, Some("192.0.2.53"));
//! assert!(path.height() >= 2);
//! ```
//!
//! Mutation is single-writer: a `&mut` borrow guards every insert, and an
//! outstanding [`Path`] is only valid until the tree mutates through some
//! other path. Readers and a writer must be coordinated externally.

mod error;
mod key;
mod name;
mod node;
mod path;
mod simd;

use slab::Slab;
use smallvec::SmallVec;

pub use crate::error::NameError;
pub use crate::key::{Key, MAX_NAME_LEN};
pub use crate::name::{WireName, MAX_LABEL_LEN};
pub use crate::node::NodeKind;
pub use crate::path::{Level, NodeRef, Path, MAX_HEIGHT};

use crate::key::common_prefix;
use crate::node::{Node, Node4, MAX_PREFIX};

/// A payload-carrying leaf. The tree creates leaves with `data` unset;
/// callers store the payload directly, and an unset payload is how a caller
/// tells a leaf just created by [`NameTree::make_path`] from one that
/// already existed.
pub struct Leaf<T> {
    pub data: Option<T>,
    key: SmallVec<[u8; 24]>,
}

impl<T> Leaf<T> {
    fn new(key: &[u8]) -> Self {
        Leaf {
            data: None,
            key: SmallVec::from_slice(key),
        }
    }

    /// The full transformed key this leaf was inserted under.
    pub fn key(&self) -> &[u8] {
        &self.key
    }
}

/// Per-representation node counts, plus the leaf count.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TreeStats {
    pub node4: usize,
    pub node16: usize,
    pub node32: usize,
    pub node38: usize,
    pub node48: usize,
    pub node256: usize,
    pub leaves: usize,
}

/// An adaptive radix tree over domain-name keys.
///
/// Nodes and leaves live in two arenas owned by the tree and are addressed
/// by [`NodeRef`] handles; a [`Path`] is a stack of such handles. Growing a
/// node rewrites it in place at its arena index, so handles recorded in a
/// path stay valid across the very mutation that recorded them.
pub struct NameTree<T> {
    nodes: Slab<Node>,
    leaves: Slab<Leaf<T>>,
    root: u32,
}

impl<T> Default for NameTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> NameTree<T> {
    /// Creates an empty tree. The root is a permanently-inner node; leaves
    /// only ever hang below it.
    pub fn new() -> Self {
        let mut nodes = Slab::with_capacity(1024);
        let root = nodes.insert(Node::empty()) as u32;
        NameTree {
            nodes,
            leaves: Slab::with_capacity(1024),
            root,
        }
    }

    /// Number of names stored.
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Resolves a handle recorded in a [`Path`] to its leaf, if it is one.
    pub fn leaf(&self, node: NodeRef) -> Option<&Leaf<T>> {
        match node {
            NodeRef::Leaf(idx) => self.leaves.get(idx as usize),
            NodeRef::Inner(_) => None,
        }
    }

    /// Mutable variant of [`NameTree::leaf`].
    pub fn leaf_mut(&mut self, node: NodeRef) -> Option<&mut Leaf<T>> {
        match node {
            NodeRef::Leaf(idx) => self.leaves.get_mut(idx as usize),
            NodeRef::Inner(_) => None,
        }
    }

    /// The representation an inner node currently uses, `None` for leaves.
    pub fn kind(&self, node: NodeRef) -> Option<NodeKind> {
        match node {
            NodeRef::Inner(idx) => self.nodes.get(idx as usize).map(Node::kind),
            NodeRef::Leaf(_) => None,
        }
    }

    /// Counts nodes per representation. Nothing is ever unlinked, so the
    /// arenas hold exactly the live tree.
    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats {
            leaves: self.leaves.len(),
            ..TreeStats::default()
        };
        for (_, node) in self.nodes.iter() {
            match node.kind() {
                NodeKind::N4 => stats.node4 += 1,
                NodeKind::N16 => stats.node16 += 1,
                NodeKind::N32 => stats.node32 += 1,
                NodeKind::N38 => stats.node38 += 1,
                NodeKind::N48 => stats.node48 += 1,
                NodeKind::N256 => stats.node256 += 1,
            }
        }
        stats
    }

    /// Looks up the payload for `key` without keeping the descent around.
    pub fn get(&self, key: &Key) -> Option<&T> {
        let mut path = Path::new();
        self.find_path(&mut path, key)?.data.as_ref()
    }

    /// Descends toward `key`, recording every traversed slot in `path`.
    ///
    /// Returns the leaf when the key is present. On a miss the path is left
    /// holding the longest matching descent — the level that failed to match
    /// is popped, the deepest fully-matching one stays on top.
    ///
    /// A non-empty `path` resumes from its tip instead of the root; the
    /// levels already recorded must lie on `key`'s own path (callers cache
    /// an ancestor by truncating a previous descent).
    pub fn find_path(&self, path: &mut Path, key: &Key) -> Option<&Leaf<T>> {
        let octets = key.as_slice();
        let key_len = octets.len();
        let mut depth = path.descend_from(NodeRef::Inner(self.root));
        debug_assert!(depth <= key_len, "resumed path overshoots the key");

        while depth < key_len {
            match path.tip().node {
                NodeRef::Leaf(idx) => {
                    let leaf = &self.leaves[idx as usize];
                    let matched = common_prefix(octets, leaf.key());
                    if matched == key_len && leaf.key().len() == key_len {
                        return Some(leaf);
                    }
                    path.pop();
                    return None;
                }
                NodeRef::Inner(idx) => {
                    let node = &self.nodes[idx as usize];
                    let header = node.header();
                    let prefix_len = header.prefix_len as usize;
                    if prefix_len > 0 {
                        let matched = common_prefix(&octets[depth..], &header.prefix[..prefix_len]);
                        if matched < prefix_len {
                            path.pop();
                            return None;
                        }
                        depth += prefix_len;
                        debug_assert!(depth < key_len, "keys are never prefixes of keys");
                    }
                    match node.find_child(octets[depth]) {
                        Some(child) => {
                            path.push(depth, child);
                            depth += 1;
                        }
                        None => return None,
                    }
                }
            }
        }

        // The terminator edge can only lead to the one leaf carrying this
        // exact key, so reaching full depth is a match.
        match path.tip().node {
            NodeRef::Leaf(idx) => Some(&self.leaves[idx as usize]),
            NodeRef::Inner(_) => None,
        }
    }

    /// Descends toward `key`, inserting whatever the descent is missing, and
    /// returns the leaf — pre-existing or just created. A created leaf has
    /// no payload yet; the caller stores one through `data`.
    ///
    /// Resumption from a non-empty `path` works as in
    /// [`NameTree::find_path`]. Splits and node growth rewrite slots in
    /// place, so the recorded levels stay valid throughout.
    pub fn make_path(&mut self, path: &mut Path, key: &Key) -> &mut Leaf<T> {
        let octets = key.as_slice();
        let key_len = octets.len();
        let mut depth = path.descend_from(NodeRef::Inner(self.root));
        debug_assert!(depth <= key_len, "resumed path overshoots the key");

        while depth < key_len {
            // Settle on the inner node to search, splitting whatever is in
            // the way, with `depth` left at the routing octet.
            let inner = match path.tip().node {
                NodeRef::Leaf(idx) => {
                    let (matched, exact) = {
                        let stored = self.leaves[idx as usize].key();
                        let matched = common_prefix(octets, stored);
                        (matched, matched == key_len && stored.len() == key_len)
                    };
                    if exact {
                        break;
                    }
                    depth = matched;
                    self.split_leaf(path, octets, matched)
                }
                NodeRef::Inner(idx) => {
                    let (prefix_len, matched) = {
                        let header = self.nodes[idx as usize].header();
                        let prefix_len = header.prefix_len as usize;
                        (
                            prefix_len,
                            common_prefix(&octets[depth..], &header.prefix[..prefix_len]),
                        )
                    };
                    if matched < prefix_len {
                        self.split_node(idx, matched);
                    }
                    depth += matched;
                    idx
                }
            };
            debug_assert!(depth < key_len, "keys are never prefixes of keys");

            match self.nodes[inner as usize].find_child(octets[depth]) {
                Some(child) => {
                    path.push(depth, child);
                    depth += 1;
                }
                None => {
                    let leaf = self.leaves.insert(Leaf::new(octets)) as u32;
                    self.add_child(inner, octets[depth], NodeRef::Leaf(leaf));
                    path.push(depth, NodeRef::Leaf(leaf));
                    depth = key_len;
                }
            }
        }

        match path.tip().node {
            NodeRef::Leaf(idx) => &mut self.leaves[idx as usize],
            NodeRef::Inner(_) => unreachable!("descent ends at a leaf"),
        }
    }

    /// Binds `octet -> child` on the node at `inner`, growing it in place
    /// first when the current representation has no room.
    fn add_child(&mut self, inner: u32, octet: u8, child: NodeRef) {
        let node = &mut self.nodes[inner as usize];
        if node.needs_grow(octet) {
            node.grow(octet);
        }
        node.insert_child(octet, child);
    }

    /// The tip of `path` references a leaf whose key diverges from `octets`
    /// at index `diverge`. Replaces the leaf with a chain of minimal inner
    /// nodes spanning the common region — each link consumes one routing
    /// octet plus up to [`MAX_PREFIX`] compressed octets — re-hangs the leaf
    /// under the chain's tip, and appends the chain to `path`. Returns the
    /// tip's arena index; the caller hangs the new leaf there.
    fn split_leaf(&mut self, path: &mut Path, octets: &[u8], diverge: usize) -> u32 {
        let tip = *path.tip();
        let NodeRef::Leaf(leaf) = tip.node else {
            unreachable!("split_leaf runs at a leaf")
        };
        let entry = tip.depth as usize;
        // The routing octet that led here matched, so divergence is deeper.
        debug_assert!(diverge > entry);
        debug_assert!(diverge < octets.len());

        let mut chain: SmallVec<[(usize, u32); 8]> = SmallVec::new();
        let mut depth = entry;
        while depth < diverge {
            let span = diverge - depth;
            // One octet routes into the link; at most MAX_PREFIX more ride
            // along as its prefix.
            let prefix_len = if span > MAX_PREFIX { MAX_PREFIX } else { span - 1 };
            let mut link = Node4::new();
            link.header.prefix_len = prefix_len as u8;
            link.header.prefix[..prefix_len]
                .copy_from_slice(&octets[depth + 1..depth + 1 + prefix_len]);
            let idx = self.nodes.insert(Node::N4(Box::new(link))) as u32;
            if let Some(&(_, prev)) = chain.last() {
                self.add_child(prev, octets[depth], NodeRef::Inner(idx));
            }
            chain.push((depth, idx));
            depth += 1 + prefix_len;
        }
        debug_assert_eq!(depth, diverge);

        // The chain head takes over the slot the leaf occupied; the level
        // that recorded the leaf now records the head.
        let head = chain[0].1;
        let parent = path.levels()[path.height() - 2];
        let NodeRef::Inner(parent_idx) = parent.node else {
            unreachable!("leaves hang under inner nodes")
        };
        self.nodes[parent_idx as usize].replace_child(octets[entry], NodeRef::Inner(head));
        path.set_tip_node(NodeRef::Inner(head));
        for &(link_depth, link) in &chain[1..] {
            path.push(link_depth, NodeRef::Inner(link));
        }

        let chain_tip = chain[chain.len() - 1].1;
        let stored_octet = self.leaves[leaf as usize].key()[diverge];
        self.add_child(chain_tip, stored_octet, NodeRef::Leaf(leaf));
        chain_tip
    }

    /// The node at `inner` stores a prefix that diverges from the key at
    /// offset `diverge`. Splits it: a fresh minimal node keeps the matching
    /// front of the prefix and takes over the arena slot, while the old node
    /// moves aside, loses the matched front plus its new routing octet, and
    /// becomes a child. Parent slots and recorded levels keep pointing at
    /// the same index and now see the split node.
    fn split_node(&mut self, inner: u32, diverge: usize) {
        let (routing, front) = {
            let header = self.nodes[inner as usize].header();
            debug_assert!(diverge < header.prefix_len as usize);
            (header.prefix[diverge], *header)
        };

        let mut split = Node4::new();
        split.header.prefix_len = diverge as u8;
        split.header.prefix[..diverge].copy_from_slice(&front.prefix[..diverge]);

        let mut moved =
            std::mem::replace(&mut self.nodes[inner as usize], Node::N4(Box::new(split)));
        {
            let header = moved.header_mut();
            let remaining = header.prefix_len as usize - (diverge + 1);
            header.prefix.copy_within(diverge + 1..diverge + 1 + remaining, 0);
            header.prefix_len = remaining as u8;
        }
        let moved_idx = self.nodes.insert(moved) as u32;
        self.add_child(inner, routing, NodeRef::Inner(moved_idx));
    }

    /// Every occupied binding of an inner node, for walkers and tests.
    #[cfg(test)]
    pub(crate) fn node_children(&self, inner: u32) -> Vec<(u8, NodeRef)> {
        self.nodes[inner as usize].children().collect()
    }

    #[cfg(test)]
    pub(crate) fn node(&self, inner: u32) -> &Node {
        &self.nodes[inner as usize]
    }

    #[cfg(test)]
    pub(crate) fn root_index(&self) -> u32 {
        self.root
    }
}
