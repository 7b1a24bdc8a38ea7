//! Adversarial perturbation - random substitution over observation traces.

use crate::error::{PipelineError, Result};
use crate::rng::DeterministicRng;

/// Mask flag: position kept as recorded.
pub const MASK_ORIGINAL: u8 = 0;
/// Mask flag: position overwritten by a substituted action.
pub const MASK_MODIFIED: u8 = 1;

/// Outcome of perturbing one observation trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Perturbation {
    /// Modified trace, index-aligned with the input.
    pub observations: Vec<String>,
    /// `MASK_MODIFIED` exactly where a substitution landed.
    pub mask: Vec<u8>,
    /// Number of substituted positions.
    pub substitutions: usize,
}

/// Substitute actions into `trace` at a per-position probability of
/// `rate_percent / 100`, drawing replacements uniformly from `pool`.
///
/// Randomness is consumed in a single position-ordered stream: first one
/// Bernoulli draw per position, then one pool draw per selected position,
/// both in index order, so a fixed seed replays the exact trace. The pool is
/// sampled with replacement and includes every valid action - a draw may
/// re-select the original token, which still counts and masks as modified.
/// Replacements are uppercased; unselected positions pass through untouched.
pub fn perturb<R: DeterministicRng>(
    trace: &[String],
    rate_percent: f64,
    pool: &[String],
    rng: &mut R,
) -> Result<Perturbation> {
    // Selection pass: one independent trial per position. At 100% every
    // draw in [0, 1) clears the threshold, the only rate with a guaranteed
    // outcome.
    let threshold = rate_percent / 100.0;
    let selected: Vec<bool> = trace
        .iter()
        .map(|_| rng.next_f64_unit() < threshold)
        .collect();

    let substitutions = selected.iter().filter(|&&s| s).count();
    if substitutions > 0 && pool.is_empty() {
        return Err(PipelineError::EmptyPool);
    }

    // Substitution pass.
    let mut observations = Vec::with_capacity(trace.len());
    let mut mask = Vec::with_capacity(trace.len());
    for (position, token) in trace.iter().enumerate() {
        if selected[position] {
            let replacement = &pool[rng.next_below(pool.len() as u64) as usize];
            observations.push(replacement.to_uppercase());
            mask.push(MASK_MODIFIED);
        } else {
            observations.push(token.clone());
            mask.push(MASK_ORIGINAL);
        }
    }

    Ok(Perturbation {
        observations,
        mask,
        substitutions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::SplitMix64;
    use proptest::prelude::*;

    fn trace(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_zero_rate_is_identity() {
        let t = trace(&["fly p1 c1 c2", "board p1 a1"]);
        let mut rng = SplitMix64::new(42);
        let result = perturb(&t, 0.0, &[], &mut rng).unwrap();
        assert_eq!(result.observations, t);
        assert_eq!(result.mask, vec![MASK_ORIGINAL, MASK_ORIGINAL]);
        assert_eq!(result.substitutions, 0);
    }

    #[test]
    fn test_full_rate_replaces_every_position() {
        let t = trace(&["fly p1 c1 c2", "board p1 a1"]);
        let pool = trace(&["fly p1 c1 c2", "board p1 a1", "debark p1 a1"]);
        let mut rng = SplitMix64::new(42);
        let result = perturb(&t, 100.0, &pool, &mut rng).unwrap();
        assert_eq!(result.mask, vec![MASK_MODIFIED, MASK_MODIFIED]);
        assert_eq!(result.substitutions, 2);
        for token in &result.observations {
            assert!(pool.iter().any(|p| p.to_uppercase() == *token));
        }
    }

    #[test]
    fn test_empty_pool_with_selection_fails() {
        let t = trace(&["fly p1 c1 c2"]);
        let mut rng = SplitMix64::new(42);
        let err = perturb(&t, 100.0, &[], &mut rng).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyPool));
    }

    #[test]
    fn test_same_seed_same_result() {
        let t = trace(&["a x", "b y", "c z", "d w"]);
        let pool = trace(&["a x", "b y", "c z", "d w", "e v"]);
        let one = perturb(&t, 50.0, &pool, &mut SplitMix64::new(7)).unwrap();
        let two = perturb(&t, 50.0, &pool, &mut SplitMix64::new(7)).unwrap();
        assert_eq!(one, two);
    }

    #[test]
    fn test_empty_trace() {
        let result = perturb(&[], 100.0, &[], &mut SplitMix64::new(1)).unwrap();
        assert!(result.observations.is_empty());
        assert!(result.mask.is_empty());
        assert_eq!(result.substitutions, 0);
    }

    proptest! {
        #[test]
        fn prop_mask_aligned_and_counts_consistent(
            tokens in prop::collection::vec("[a-z]{1,8} [a-z]{1,4}", 0..40),
            rate in 0u8..=100,
            seed in any::<u64>(),
        ) {
            let pool = trace(&["alpha one", "beta two", "gamma three"]);
            let mut rng = SplitMix64::new(seed);
            let result = perturb(&tokens, rate as f64, &pool, &mut rng).unwrap();

            prop_assert_eq!(result.observations.len(), tokens.len());
            prop_assert_eq!(result.mask.len(), tokens.len());
            prop_assert_eq!(
                result.substitutions,
                result.mask.iter().filter(|&&m| m == MASK_MODIFIED).count()
            );
            for (i, flag) in result.mask.iter().enumerate() {
                if *flag == MASK_ORIGINAL {
                    prop_assert_eq!(&result.observations[i], &tokens[i]);
                }
            }
        }

        #[test]
        fn prop_full_rate_marks_everything(
            tokens in prop::collection::vec("[a-z]{1,8}", 1..20),
            seed in any::<u64>(),
        ) {
            let pool = trace(&["alpha one", "beta two"]);
            let mut rng = SplitMix64::new(seed);
            let result = perturb(&tokens, 100.0, &pool, &mut rng).unwrap();
            prop_assert!(result.mask.iter().all(|&m| m == MASK_MODIFIED));
        }
    }
}
