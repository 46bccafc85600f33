use std::hash::BuildHasher;

use ahash::RandomState;

/// Deterministic hash used for shard partitioning (`modp`/`modrec`).
///
/// Seeded via `RandomState::with_seeds` rather than `ahash`'s usual
/// process-random state, so unlike `std::collections::HashMap`'s
/// `RandomState` this is stable across process runs and machines —
/// required since sharding correctness depends on every shard computing
/// the same hash for the same key.
fn build_hasher() -> RandomState {
    RandomState::with_seeds(0, 0, 0, 0)
}

pub fn hash_str(s: &str) -> u64 {
    build_hasher().hash_one(s)
}

pub fn hash_pair(a: u32, b: u32) -> u64 {
    build_hasher().hash_one((a, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(hash_str("the~quick~brown"), hash_str("the~quick~brown"));
        assert_eq!(hash_pair(1, 2), hash_pair(1, 2));
    }
}
