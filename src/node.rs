//! The adaptive node family.
//!
//! Inner nodes come in six representations that differ only in how the
//! `occupied octet -> child` mapping is stored. A node is always held in the
//! smallest representation with room for its children; when an insertion
//! does not fit, [`Node::grow`] rewrites the node in place as the next
//! representation that does.
//!
//! The 38-wide table is special: keys made from names in the preferred
//! hostname syntax (RFC 1035 section 2.3.1) only ever route on 38 distinct
//! octet values (`a-z`, `0-9`, `-`, and the label separator), so a dense
//! 38-entry table indexed by [`host_slot`] covers the common case of a full
//! delegation node without paying for 256 entries.

use std::fmt;

use crate::path::NodeRef;
use crate::simd;

/// Octets of key path stored on a node ahead of its children.
pub(crate) const MAX_PREFIX: usize = 8;

/// Which representation an inner node currently uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    N4,
    N16,
    N32,
    N38,
    N48,
    N256,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::N4 => "node4",
            NodeKind::N16 => "node16",
            NodeKind::N32 => "node32",
            NodeKind::N38 => "node38",
            NodeKind::N48 => "node48",
            NodeKind::N256 => "node256",
        };
        f.write_str(name)
    }
}

/// Header shared by every representation. The prefix holds up to
/// [`MAX_PREFIX`] octets of key path that must match before this node's
/// children are consulted.
#[derive(Clone, Copy, Default)]
pub(crate) struct Header {
    pub width: u8,
    pub prefix_len: u8,
    pub prefix: [u8; MAX_PREFIX],
}

/// Maps a key octet to its dense hostname-table slot, or `None` for octets
/// outside the hostname alphabet.
pub(crate) fn host_slot(octet: u8) -> Option<u8> {
    match octet {
        0x00 => Some(0),                       // label separator
        0x2e => Some(1),                       // '-'
        0x31..=0x3a => Some(octet - 0x2f),     // '0'..'9' -> 2..=11
        0x48..=0x61 => Some(octet - 0x3c),     // 'a'..'z' -> 12..=37
        _ => None,
    }
}

/// Inverse of [`host_slot`].
pub(crate) fn host_octet(slot: u8) -> u8 {
    debug_assert!(slot < 38);
    match slot {
        0 => 0x00,
        1 => 0x2e,
        2..=11 => slot + 0x2f,
        _ => slot + 0x3c,
    }
}

pub(crate) struct Node4 {
    pub header: Header,
    keys: [u8; 4],
    children: [Option<NodeRef>; 4],
}

pub(crate) struct Node16 {
    pub header: Header,
    keys: [u8; 16],
    children: [Option<NodeRef>; 16],
}

pub(crate) struct Node32 {
    pub header: Header,
    keys: [u8; 32],
    children: [Option<NodeRef>; 32],
}

pub(crate) struct Node38 {
    pub header: Header,
    children: [Option<NodeRef>; 38],
}

pub(crate) struct Node48 {
    pub header: Header,
    // 1-based indices into `children`, 0 marks an absent octet. Indexed by
    // raw octet value; every octet up to 0xff must stay in bounds.
    keys: [u8; 256],
    children: [Option<NodeRef>; 48],
}

pub(crate) struct Node256 {
    pub header: Header,
    children: [Option<NodeRef>; 256],
}

pub(crate) enum Node {
    N4(Box<Node4>),
    N16(Box<Node16>),
    N32(Box<Node32>),
    N38(Box<Node38>),
    N48(Box<Node48>),
    N256(Box<Node256>),
}

impl Node4 {
    pub(crate) fn new() -> Self {
        Node4 {
            header: Header::default(),
            keys: [0; 4],
            children: [None; 4],
        }
    }
}

/// Inserts into a sorted keys/children pair, shifting the tail up by one.
fn sorted_insert(
    keys: &mut [u8],
    children: &mut [Option<NodeRef>],
    width: usize,
    at: usize,
    octet: u8,
    child: NodeRef,
) {
    debug_assert!(width < keys.len());
    keys.copy_within(at..width, at + 1);
    children.copy_within(at..width, at + 1);
    keys[at] = octet;
    children[at] = Some(child);
}

/// Re-homes a sorted node's bindings into a dense hostname table. Every key
/// must be in the hostname alphabet.
fn hostname_table<const N: usize>(
    header: Header,
    keys: &[u8; N],
    children: &[Option<NodeRef>; N],
) -> Node38 {
    let mut node = Node38 {
        header,
        children: [None; 38],
    };
    for idx in 0..header.width as usize {
        let slot = host_slot(keys[idx]).expect("hostname table requires hostname octets");
        node.children[slot as usize] = children[idx];
    }
    node
}

/// Re-homes a sorted node's bindings into the 48-wide indexed layout.
fn indexed_table<const N: usize>(
    header: Header,
    keys: &[u8; N],
    children: &[Option<NodeRef>; N],
) -> Node48 {
    let mut node = Node48 {
        header,
        keys: [0; 256],
        children: [None; 48],
    };
    for idx in 0..header.width as usize {
        node.children[idx] = children[idx];
        node.keys[keys[idx] as usize] = idx as u8 + 1;
    }
    node
}

fn all_hostname(keys: &[u8]) -> bool {
    keys.iter().all(|&octet| host_slot(octet).is_some())
}

impl Node {
    pub(crate) fn empty() -> Self {
        Node::N4(Box::new(Node4::new()))
    }

    pub(crate) fn kind(&self) -> NodeKind {
        match self {
            Node::N4(_) => NodeKind::N4,
            Node::N16(_) => NodeKind::N16,
            Node::N32(_) => NodeKind::N32,
            Node::N38(_) => NodeKind::N38,
            Node::N48(_) => NodeKind::N48,
            Node::N256(_) => NodeKind::N256,
        }
    }

    pub(crate) fn header(&self) -> &Header {
        match self {
            Node::N4(n) => &n.header,
            Node::N16(n) => &n.header,
            Node::N32(n) => &n.header,
            Node::N38(n) => &n.header,
            Node::N48(n) => &n.header,
            Node::N256(n) => &n.header,
        }
    }

    pub(crate) fn header_mut(&mut self) -> &mut Header {
        match self {
            Node::N4(n) => &mut n.header,
            Node::N16(n) => &mut n.header,
            Node::N32(n) => &mut n.header,
            Node::N38(n) => &mut n.header,
            Node::N48(n) => &mut n.header,
            Node::N256(n) => &mut n.header,
        }
    }

    /// Looks up the child occupying `octet`.
    pub(crate) fn find_child(&self, octet: u8) -> Option<NodeRef> {
        match self {
            Node::N4(n) => {
                for idx in 0..n.header.width as usize {
                    if n.keys[idx] == octet {
                        return n.children[idx];
                    }
                }
                None
            }
            Node::N16(n) => match simd::v16_findeq(octet, &n.keys, n.header.width) {
                0 => None,
                at => n.children[at as usize - 1],
            },
            Node::N32(n) => match simd::v32_findeq(octet, &n.keys, n.header.width) {
                0 => None,
                at => n.children[at as usize - 1],
            },
            Node::N38(n) => host_slot(octet).and_then(|slot| n.children[slot as usize]),
            Node::N48(n) => match n.keys[octet as usize] {
                0 => None,
                at => n.children[at as usize - 1],
            },
            Node::N256(n) => n.children[octet as usize],
        }
    }

    /// Redirects the binding for `octet` at an occupied slot.
    pub(crate) fn replace_child(&mut self, octet: u8, child: NodeRef) {
        let slot = match self {
            Node::N4(n) => {
                let at = (0..n.header.width as usize)
                    .find(|&idx| n.keys[idx] == octet)
                    .expect("octet is bound");
                &mut n.children[at]
            }
            Node::N16(n) => {
                let at = simd::v16_findeq(octet, &n.keys, n.header.width);
                debug_assert_ne!(at, 0, "octet is bound");
                &mut n.children[at as usize - 1]
            }
            Node::N32(n) => {
                let at = simd::v32_findeq(octet, &n.keys, n.header.width);
                debug_assert_ne!(at, 0, "octet is bound");
                &mut n.children[at as usize - 1]
            }
            Node::N38(n) => {
                let at = host_slot(octet).expect("octet is bound");
                &mut n.children[at as usize]
            }
            Node::N48(n) => {
                let at = n.keys[octet as usize];
                debug_assert_ne!(at, 0, "octet is bound");
                &mut n.children[at as usize - 1]
            }
            Node::N256(n) => &mut n.children[octet as usize],
        };
        debug_assert!(slot.is_some(), "octet is bound");
        *slot = Some(child);
    }

    /// True when `octet` cannot be inserted without growing: either the node
    /// is at capacity, or a hostname-table node is handed an octet its index
    /// cannot express.
    pub(crate) fn needs_grow(&self, octet: u8) -> bool {
        match self {
            Node::N4(n) => n.header.width == 4,
            Node::N16(n) => n.header.width == 16,
            Node::N32(n) => n.header.width == 32,
            Node::N38(n) => n.header.width == 38 || host_slot(octet).is_none(),
            Node::N48(n) => n.header.width == 48,
            Node::N256(_) => false,
        }
    }

    /// Rewrites the node in place as the smallest representation able to take
    /// one more child under `octet`. Bindings and the header, width included,
    /// carry over unchanged.
    pub(crate) fn grow(&mut self, octet: u8) {
        let grown = match &*self {
            Node::N4(n) => {
                let mut wide = Node16 {
                    header: n.header,
                    keys: [0; 16],
                    children: [None; 16],
                };
                wide.keys[..4].copy_from_slice(&n.keys);
                wide.children[..4].copy_from_slice(&n.children);
                Node::N16(Box::new(wide))
            }
            Node::N16(n) => {
                if simd::HAS_WIDE_LANES {
                    let mut wide = Node32 {
                        header: n.header,
                        keys: [0; 32],
                        children: [None; 32],
                    };
                    wide.keys[..16].copy_from_slice(&n.keys);
                    wide.children[..16].copy_from_slice(&n.children);
                    Node::N32(Box::new(wide))
                } else if host_slot(octet).is_some() && all_hostname(&n.keys[..n.header.width as usize]) {
                    Node::N38(Box::new(hostname_table(n.header, &n.keys, &n.children)))
                } else {
                    Node::N48(Box::new(indexed_table(n.header, &n.keys, &n.children)))
                }
            }
            Node::N32(n) => {
                if host_slot(octet).is_some() && all_hostname(&n.keys[..n.header.width as usize]) {
                    Node::N38(Box::new(hostname_table(n.header, &n.keys, &n.children)))
                } else {
                    Node::N48(Box::new(indexed_table(n.header, &n.keys, &n.children)))
                }
            }
            Node::N38(n) => {
                let mut wide = Node48 {
                    header: n.header,
                    keys: [0; 256],
                    children: [None; 48],
                };
                let mut occupied = 0usize;
                for slot in 0..38u8 {
                    if let Some(child) = n.children[slot as usize] {
                        wide.children[occupied] = Some(child);
                        wide.keys[host_octet(slot) as usize] = occupied as u8 + 1;
                        occupied += 1;
                    }
                }
                debug_assert_eq!(occupied, n.header.width as usize);
                Node::N48(Box::new(wide))
            }
            Node::N48(n) => {
                let mut wide = Node256 {
                    header: n.header,
                    children: [None; 256],
                };
                for octet in 0..256usize {
                    match n.keys[octet] {
                        0 => {}
                        at => wide.children[octet] = n.children[at as usize - 1],
                    }
                }
                Node::N256(Box::new(wide))
            }
            Node::N256(_) => unreachable!("node256 holds every octet"),
        };
        *self = grown;
    }

    /// Binds `octet` to `child`. The octet must be absent and the node must
    /// have room for it; callers grow the node first when it does not.
    pub(crate) fn insert_child(&mut self, octet: u8, child: NodeRef) {
        debug_assert!(!self.needs_grow(octet));
        debug_assert!(self.find_child(octet).is_none());
        match self {
            Node::N4(n) => {
                let width = n.header.width as usize;
                let mut at = 0usize;
                while at < width && octet > n.keys[at] {
                    at += 1;
                }
                sorted_insert(&mut n.keys, &mut n.children, width, at, octet, child);
                n.header.width += 1;
            }
            Node::N16(n) => {
                let width = n.header.width as usize;
                let at = match simd::v16_findgt(octet, &n.keys, n.header.width) {
                    0 => width,
                    gt => gt as usize - 1,
                };
                sorted_insert(&mut n.keys, &mut n.children, width, at, octet, child);
                n.header.width += 1;
            }
            Node::N32(n) => {
                let width = n.header.width as usize;
                let at = match simd::v32_findgt(octet, &n.keys, n.header.width) {
                    0 => width,
                    gt => gt as usize - 1,
                };
                sorted_insert(&mut n.keys, &mut n.children, width, at, octet, child);
                n.header.width += 1;
            }
            Node::N38(n) => {
                let slot = host_slot(octet).expect("grown before insert") as usize;
                n.children[slot] = Some(child);
                n.header.width += 1;
            }
            Node::N48(n) => {
                let width = n.header.width as usize;
                n.keys[octet as usize] = width as u8 + 1;
                n.children[width] = Some(child);
                n.header.width += 1;
            }
            Node::N256(n) => {
                n.children[octet as usize] = Some(child);
                n.header.width += 1;
            }
        }
    }

    /// Occupied `(octet, child)` bindings, in no particular order.
    #[cfg(test)]
    pub(crate) fn children(&self) -> Box<dyn Iterator<Item = (u8, NodeRef)> + '_> {
        match self {
            Node::N4(n) => Box::new(sorted_bindings(&n.keys, &n.children, n.header.width)),
            Node::N16(n) => Box::new(sorted_bindings(&n.keys, &n.children, n.header.width)),
            Node::N32(n) => Box::new(sorted_bindings(&n.keys, &n.children, n.header.width)),
            Node::N38(n) => Box::new(n.children.iter().enumerate().filter_map(|(slot, child)| {
                child.map(|child| (host_octet(slot as u8), child))
            })),
            Node::N48(n) => {
                let n = &**n;
                Box::new((0..256usize).filter_map(move |octet| match n.keys[octet] {
                    0 => None,
                    at => n.children[at as usize - 1].map(|child| (octet as u8, child)),
                }))
            }
            Node::N256(n) => Box::new(
                n.children
                    .iter()
                    .enumerate()
                    .filter_map(|(octet, child)| child.map(|child| (octet as u8, child))),
            ),
        }
    }

    /// The sorted key array of a scan-based node, `None` for table layouts.
    #[cfg(test)]
    pub(crate) fn sorted_keys(&self) -> Option<&[u8]> {
        match self {
            Node::N4(n) => Some(&n.keys[..n.header.width as usize]),
            Node::N16(n) => Some(&n.keys[..n.header.width as usize]),
            Node::N32(n) => Some(&n.keys[..n.header.width as usize]),
            _ => None,
        }
    }

    /// The raw 48-wide index table, for invariant checks.
    #[cfg(test)]
    pub(crate) fn indexed_keys(&self) -> Option<&[u8; 256]> {
        match self {
            Node::N48(n) => Some(&n.keys),
            _ => None,
        }
    }
}

#[cfg(test)]
fn sorted_bindings<'a>(
    keys: &'a [u8],
    children: &'a [Option<NodeRef>],
    width: u8,
) -> impl Iterator<Item = (u8, NodeRef)> + 'a {
    keys[..width as usize]
        .iter()
        .zip(&children[..width as usize])
        .map(|(&octet, child)| (octet, child.expect("occupied lanes hold children")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(idx: u32) -> NodeRef {
        NodeRef::Leaf(idx)
    }

    fn add(node: &mut Node, octet: u8, child: NodeRef) {
        if node.needs_grow(octet) {
            node.grow(octet);
        }
        node.insert_child(octet, child);
    }

    fn bindings(node: &Node) -> Vec<(u8, NodeRef)> {
        let mut all: Vec<_> = node.children().collect();
        all.sort_by_key(|&(octet, _)| octet);
        all
    }

    #[test]
    fn host_slot_round_trips() {
        let mut seen = 0;
        for octet in 0u8..=255 {
            if let Some(slot) = host_slot(octet) {
                assert!(slot < 38);
                assert_eq!(host_octet(slot), octet);
                seen += 1;
            }
        }
        assert_eq!(seen, 38);
    }

    #[test]
    fn host_slot_covers_exactly_the_hostname_alphabet() {
        use crate::key::xlat;
        for ascii in b'a'..=b'z' {
            assert!(host_slot(xlat(ascii)).is_some());
            assert!(host_slot(xlat(ascii.to_ascii_uppercase())).is_some());
        }
        for ascii in b'0'..=b'9' {
            assert!(host_slot(xlat(ascii)).is_some());
        }
        assert!(host_slot(xlat(b'-')).is_some());
        assert!(host_slot(0x00).is_some());
        for ascii in [b'_', b'/', b'*', b'~', 0x00u8, 0xffu8] {
            assert!(host_slot(xlat(ascii)).is_none(), "{ascii:#x}");
        }
    }

    #[test]
    fn sorted_nodes_stay_sorted() {
        let mut node = Node::empty();
        for octet in [0x50u8, 0x10, 0xe0, 0x30, 0x90, 0x01, 0x70, 0xb0] {
            add(&mut node, octet, leaf(octet as u32));
        }
        let keys = node.sorted_keys().expect("still a scan-based node");
        assert!(keys.windows(2).all(|pair| pair[0] < pair[1]));
        for octet in [0x50u8, 0x10, 0xe0, 0x30, 0x90, 0x01, 0x70, 0xb0] {
            assert_eq!(node.find_child(octet), Some(leaf(octet as u32)));
        }
        assert_eq!(node.find_child(0x02), None);
    }

    #[test]
    fn growth_ladder_preserves_bindings() {
        let mut node = Node::empty();
        node.header_mut().prefix_len = 3;
        node.header_mut().prefix[..3].copy_from_slice(b"abc");

        let mut expected = Vec::new();
        // 0x01.. are not hostname octets, so the ladder runs through the
        // indexed layouts up to the full table.
        for step in 0..120u32 {
            let octet = (step * 2 + 1) as u8;
            add(&mut node, octet, leaf(step));
            expected.push((octet, leaf(step)));
            expected.sort_by_key(|&(octet, _)| octet);
            assert_eq!(bindings(&node), expected, "after {} inserts", step + 1);
            assert_eq!(node.header().width as usize, expected.len());
            assert_eq!(node.header().prefix_len, 3);
            assert_eq!(&node.header().prefix[..3], b"abc");
        }
        assert_eq!(node.kind(), NodeKind::N256);
    }

    #[test]
    fn hostname_nodes_take_the_dense_layout() {
        let mut node = Node::empty();
        let mut octets: Vec<u8> = (0u8..38).map(host_octet).collect();
        for (idx, &octet) in octets.iter().enumerate() {
            add(&mut node, octet, leaf(idx as u32));
        }
        assert_eq!(node.kind(), NodeKind::N38);
        octets.sort_unstable();
        for &octet in &octets {
            assert!(node.find_child(octet).is_some());
        }
        assert_eq!(node.header().width, 38);
    }

    #[test]
    fn non_hostname_octet_forces_the_indexed_layout() {
        let mut node = Node::empty();
        for slot in 0..17u8 {
            add(&mut node, host_octet(slot), leaf(slot as u32));
        }
        if simd::HAS_WIDE_LANES {
            assert_eq!(node.kind(), NodeKind::N32);
        } else {
            assert_eq!(node.kind(), NodeKind::N38);
        }
        // 0x46 is the image of '_', outside the hostname alphabet. A dense
        // hostname node cannot express it and must fall over to the indexed
        // layout; a 32-wide node simply has room.
        add(&mut node, 0x46, leaf(99));
        if simd::HAS_WIDE_LANES {
            assert_eq!(node.kind(), NodeKind::N32);
        } else {
            assert_eq!(node.kind(), NodeKind::N48);
        }
        assert_eq!(node.find_child(0x46), Some(leaf(99)));
        for slot in 0..17u8 {
            assert_eq!(node.find_child(host_octet(slot)), Some(leaf(slot as u32)));
        }
    }

    #[test]
    fn indexed_layout_accepts_the_highest_octets() {
        let mut node = Node::empty();
        for step in 0..40u8 {
            add(&mut node, 0xe6 - step, leaf(step as u32));
        }
        assert_eq!(node.kind(), NodeKind::N48);
        assert_eq!(node.find_child(0xe6), Some(leaf(0)));
        assert_eq!(node.find_child(0xe6 - 39), Some(leaf(39)));
        assert_eq!(node.find_child(0xe6 - 40), None);
    }

    #[test]
    fn replace_child_redirects_in_every_layout() {
        let mut node = Node::empty();
        for step in 0..49u32 {
            let octet = (step * 3) as u8;
            add(&mut node, octet, leaf(step));
        }
        assert_eq!(node.kind(), NodeKind::N256);
        node.replace_child(9, NodeRef::Inner(7));
        assert_eq!(node.find_child(9), Some(NodeRef::Inner(7)));
        assert_eq!(node.header().width, 49);
    }
}
