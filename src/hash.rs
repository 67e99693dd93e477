//! `n_hash` independent position hashes of a canonical k-mer into a given
//! filter size.
//!
//! Each position is derived by mixing the canonical k-mer with a distinct
//! per-index seed through `xxh64`, a full-avalanche 64-bit finalizer, then
//! masking to the filter size. Masking (not `%`) is required: §4.5's
//! dynamic-mask lookup descends the tree by shrinking the mask, so the hash
//! must stay uniform across every power-of-two suffix of the full 64-bit
//! value, not just the target size.

use xxhash_rust::xxh64::xxh64;

/// Computes `n_hash` hash positions of `canonical_kmer`, each in
/// `[0, filter_size)`, writing them into `scratch` (resized to `n_hash` as
/// needed) to avoid allocation on the hot path.
///
/// `filter_size` must be a power of two.
pub fn compute_hashes(canonical_kmer: u64, n_hash: usize, filter_size: usize, scratch: &mut Vec<usize>) {
    debug_assert!(filter_size.is_power_of_two());
    scratch.clear();
    let mask = (filter_size - 1) as u64;
    let bytes = canonical_kmer.to_le_bytes();
    for i in 0..n_hash {
        let h = xxh64(&bytes, i as u64);
        scratch.push((h & mask) as usize);
    }
}

/// Non-allocating single-hash variant used by the lookup path, where the
/// caller already owns a persistent scratch buffer across many calls.
#[inline]
pub fn hash_one(canonical_kmer: u64, seed: u64) -> u64 {
    xxh64(&canonical_kmer.to_le_bytes(), seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let mut a = Vec::new();
        let mut b = Vec::new();
        compute_hashes(0x1234_5678_9abc, 4, 1024, &mut a);
        compute_hashes(0x1234_5678_9abc, 4, 1024, &mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_seeds_usually_differ() {
        let mut positions = Vec::new();
        compute_hashes(0xdead_beef, 8, 1 << 20, &mut positions);
        let unique: std::collections::HashSet<_> = positions.iter().collect();
        assert!(unique.len() > 1, "all hash positions collided: {positions:?}");
    }

    #[test]
    fn positions_within_bounds() {
        let mut positions = Vec::new();
        for size_log2 in 1..20 {
            let size = 1usize << size_log2;
            compute_hashes(0x0123_4567_89ab_cdef, 3, size, &mut positions);
            for &p in &positions {
                assert!(p < size);
            }
        }
    }

    #[test]
    fn flat_across_power_of_two_suffix() {
        // Sanity check the uniformity property §4.2 relies on: masking a
        // large hash with a smaller power-of-two mask should not bias
        // heavily toward any single bucket over many distinct k-mers.
        let buckets = 16usize;
        let mut counts = vec![0u32; buckets];
        for kmer in 0u64..4096 {
            let h = hash_one(kmer, 0);
            counts[(h & (buckets as u64 - 1)) as usize] += 1;
        }
        let expected = 4096 / buckets as u32;
        for &c in &counts {
            assert!(
                (c as i64 - expected as i64).abs() < expected as i64,
                "bucket count {c} far from expected {expected}"
            );
        }
    }
}
