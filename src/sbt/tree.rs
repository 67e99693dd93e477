//! Sequence Bloom Tree: a complete binary tree of [`SimpleBf`] filters,
//! sizes doubling from leaves to root, inner filters the union of their
//! children. Construction pairs leaves FIFO (bottom-up, like a Huffman
//! merge with no weighting) so an uneven gene count still yields a tree
//! of bounded depth; any edge whose child wasn't actually halved relative
//! to its parent is marked `support` and costs one extra mask shift during
//! lookup instead of a halving one (§4.5).

use std::collections::VecDeque;

use log::warn;

use crate::hash::compute_hashes;
use crate::sbt::node::{NodeIndex, SimpleBf};

pub struct Sbt {
    nodes: Vec<SimpleBf>,
    root: NodeIndex,
    leaves: Vec<NodeIndex>,
}

fn ceil_log2(n: usize) -> u32 {
    if n <= 1 {
        0
    } else {
        (n - 1).ilog2() + 1
    }
}

fn resize_node(nodes: &mut [SimpleBf], idx: NodeIndex, target: usize) {
    if nodes[idx.0].size() == target {
        return;
    }
    nodes[idx.0].bits = bitvec::bitvec![0; target];
    let (left, right) = (nodes[idx.0].left, nodes[idx.0].right);
    if let Some(l) = left {
        resize_node(nodes, l, target / 2);
    }
    if let Some(r) = right {
        resize_node(nodes, r, target / 2);
    }
}

impl Sbt {
    /// Builds the empty tree skeleton for `gene_count` leaves under a root
    /// of `bf_size_bits` bits (a power of two). Leaf filters start at
    /// `bf_size_bits >> ceil(log2(gene_count))` bits.
    ///
    /// `bf_size_bits` must budget at least one bit per leaf
    /// (`>= 2^ceil(log2(gene_count))`); a smaller value is rounded up to
    /// that minimum (with a warning) rather than honored, since a leaf
    /// bitvec of length zero would make every bit position an out-of-bounds
    /// index once filled. Bits are all zero; fill with [`Sbt::fill_leaf`].
    pub fn build(gene_count: usize, bf_size_bits: usize) -> Self {
        assert!(gene_count >= 1, "a tree needs at least one gene");
        assert!(bf_size_bits.is_power_of_two(), "bf_size_bits must be a power of two");

        let shift = ceil_log2(gene_count);
        let min_root_bits = 1usize << shift;
        let root_bits = if bf_size_bits < min_root_bits {
            warn!(
                "bf-size of {bf_size_bits} bit(s) is too small for {gene_count} gene(s) \
                 (needs >= {min_root_bits} bits for >= 1 bit per leaf); rounding up to {min_root_bits}"
            );
            min_root_bits
        } else {
            bf_size_bits
        };
        let leaf_size = root_bits >> shift;

        let mut nodes = Vec::new();
        let mut leaves = Vec::with_capacity(gene_count);
        let mut queue: VecDeque<NodeIndex> = VecDeque::with_capacity(gene_count);
        for gene_id in 0..gene_count {
            let idx = NodeIndex(nodes.len());
            nodes.push(SimpleBf::leaf(leaf_size, gene_id));
            leaves.push(idx);
            queue.push_back(idx);
        }

        while queue.len() > 1 {
            let a = queue.pop_front().expect("queue has at least two entries");
            let b = queue.pop_front().expect("queue has at least two entries");
            let size_a = nodes[a.0].size();
            let size_b = nodes[b.0].size();
            let new_size = 2 * size_a.max(size_b);

            let inner_idx = NodeIndex(nodes.len());
            nodes.push(SimpleBf::inner(new_size, a, b));
            nodes[a.0].parent = Some(inner_idx);
            nodes[b.0].parent = Some(inner_idx);
            nodes[a.0].support = new_size / 2 != size_a;
            nodes[b.0].support = new_size / 2 != size_b;
            queue.push_back(inner_idx);
        }

        let root = queue.pop_front().expect("at least one node was built");
        resize_node(&mut nodes, root, root_bits);

        Sbt { nodes, root, leaves }
    }

    pub fn root_size(&self) -> usize {
        self.nodes[self.root.0].size()
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// Sets every position in `positions` at the leaf for `gene_id` and
    /// propagates it up through every ancestor, each level remasking to
    /// its own size (support levels reuse their parent's mask automatically
    /// since their size equals the parent's).
    pub fn fill_leaf(&mut self, gene_id: usize, positions: &[usize]) {
        let mut cur = Some(self.leaves[gene_id]);
        while let Some(idx) = cur {
            let node = &mut self.nodes[idx.0];
            for &p in positions {
                node.set_masked(p);
            }
            cur = node.parent;
        }
    }

    /// Returns every gene id whose leaf-to-root path is still all-ones for
    /// every hash position of `kmer`, via pruning descent from the root.
    /// `hash_scratch` is reused across calls to avoid allocation.
    pub fn classify_kmer(
        &self,
        kmer: u64,
        n_hash: usize,
        hash_scratch: &mut Vec<usize>,
        out_genes: &mut Vec<usize>,
    ) {
        out_genes.clear();
        compute_hashes(kmer, n_hash, self.root_size(), hash_scratch);
        self.descend(self.root, self.root_size() - 1, hash_scratch, out_genes);
    }

    fn descend(&self, idx: NodeIndex, dynamic_mask: usize, hashes: &[usize], out: &mut Vec<usize>) {
        let node = &self.nodes[idx.0];
        if !hashes.iter().all(|&h| node.probe(h, dynamic_mask)) {
            return;
        }
        match (node.left, node.right) {
            (None, None) => out.push(node.gene_id.expect("leaf must carry a gene id")),
            (Some(l), Some(r)) => {
                let lm = dynamic_mask >> (1 + self.nodes[l.0].support as usize);
                let rm = dynamic_mask >> (1 + self.nodes[r.0].support as usize);
                self.descend(l, lm, hashes, out);
                self.descend(r, rm, hashes, out);
            }
            _ => unreachable!("inner node with exactly one child"),
        }
    }

    #[cfg(test)]
    fn size_invariants_hold(&self) -> bool {
        for node in &self.nodes {
            if !node.size().is_power_of_two() {
                return false;
            }
            if let (Some(l), Some(r)) = (node.left, node.right) {
                let expect = 2 * self.nodes[l.0].size().max(self.nodes[r.0].size());
                if node.size() != expect {
                    return false;
                }
                let want_support_l = node.size() / 2 != self.nodes[l.0].size();
                let want_support_r = node.size() / 2 != self.nodes[r.0].size();
                if self.nodes[l.0].support != want_support_l || self.nodes[r.0].support != want_support_r {
                    return false;
                }
            }
        }
        true
    }
}
