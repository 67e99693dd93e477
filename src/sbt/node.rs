//! A single Bloom filter node in the tree. Leaves hold a gene id;
//! inner nodes hold the bitwise union of their children, built bottom-up.

use bitvec::prelude::*;

/// Index of a node inside an [`super::tree::Sbt`]'s arena. Carried instead
/// of raw/parent pointers so the tree can be built bottom-up without
/// `Rc<RefCell<_>>` cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeIndex(pub(crate) usize);

pub struct SimpleBf {
    pub bits: BitVec,
    pub parent: Option<NodeIndex>,
    pub left: Option<NodeIndex>,
    pub right: Option<NodeIndex>,
    /// `Some(gene_index)` on leaves, `None` on inner nodes.
    pub gene_id: Option<usize>,
    /// True when this node's size equals its parent's (no halving across
    /// this edge), which happens when an uneven gene count leaves one
    /// subtree shallower than its sibling. See §4.5's dynamic-mask descent.
    pub support: bool,
}

impl SimpleBf {
    pub fn leaf(size: usize, gene_id: usize) -> Self {
        SimpleBf {
            bits: bitvec![0; size],
            parent: None,
            left: None,
            right: None,
            gene_id: Some(gene_id),
            support: false,
        }
    }

    pub fn inner(size: usize, left: NodeIndex, right: NodeIndex) -> Self {
        SimpleBf {
            bits: bitvec![0; size],
            parent: None,
            left: Some(left),
            right: Some(right),
            gene_id: None,
            support: false,
        }
    }

    pub fn size(&self) -> usize {
        self.bits.len()
    }

    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    /// Sets the bit at `pos`, masked to this node's own size. Used on the
    /// insertion path, which recomputes the mask at every level rather than
    /// threading a shrinking mask the way lookup does (see `tree.rs`).
    pub fn set_masked(&mut self, pos: usize) {
        let mask = self.size() - 1;
        self.bits.set(pos & mask, true);
    }

    /// Checks the bit at `pos & dynamic_mask` — the probe used on the
    /// lookup path, where `dynamic_mask` is threaded down from the root.
    pub fn probe(&self, pos: usize, dynamic_mask: usize) -> bool {
        self.bits[pos & dynamic_mask]
    }
}
