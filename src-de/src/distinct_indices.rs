use rand::Rng;
use rand::seq::SliceRandom;

/// Draw `count` distinct indices from `0..pool_size`, never returning `exclude`.
pub(crate) fn distinct_indices<R: Rng + ?Sized>(
    exclude: usize,
    count: usize,
    pool_size: usize,
    rng: &mut R,
) -> Vec<usize> {
    debug_assert!(count <= pool_size.saturating_sub(1));
    let mut idxs: Vec<usize> = (0..pool_size).filter(|&idx| idx != exclude).collect();
    idxs.shuffle(rng);
    idxs.truncate(count);
    idxs
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    #[test]
    fn test_distinct_and_exclude_target() {
        let mut rng = StdRng::seed_from_u64(7);
        for npop in 4..12 {
            for target in 0..npop {
                for _ in 0..50 {
                    let idxs = distinct_indices(target, 3, npop, &mut rng);
                    assert_eq!(idxs.len(), 3);
                    assert!(!idxs.contains(&target));
                    let unique: HashSet<_> = idxs.iter().collect();
                    assert_eq!(unique.len(), 3);
                    assert!(idxs.iter().all(|&k| k < npop));
                }
            }
        }
    }

    #[test]
    fn test_minimal_population_uses_all_others() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut idxs = distinct_indices(2, 3, 4, &mut rng);
        idxs.sort_unstable();
        assert_eq!(idxs, vec![0, 1, 3]);
    }
}
