//! Discrete samplers used to resolve one tick of a compartment.
//!
//! All functions take the replica's random stream explicitly. None of them
//! keep state between calls.

use rand::Rng;
use rand_distr::{Binomial, Distribution, Poisson};

/// Draw `Binomial(n, p)`.
///
/// `p <= 0` returns 0 and `p >= 1` returns `n` exactly, without touching
/// the stream. A NaN probability also yields 0.
pub fn binomial<R: Rng + ?Sized>(rng: &mut R, n: u64, p: f64) -> u64 {
    if n == 0 || p.is_nan() || p <= 0.0 {
        return 0;
    }
    if p >= 1.0 {
        return n;
    }
    match Binomial::new(n, p) {
        Ok(dist) => dist.sample(rng),
        Err(_) => 0,
    }
}

/// Largest mean `rand_distr::Poisson` accepts.
pub const POISSON_MAX_MEAN: f64 = 1.844e19;

/// Draw `Poisson(mean)`.
///
/// A mean that is not finite and positive yields 0 without sampling.
/// Means above [`POISSON_MAX_MEAN`] are sampled at that maximum.
pub fn poisson<R: Rng + ?Sized>(rng: &mut R, mean: f64) -> u64 {
    if !mean.is_finite() || mean <= 0.0 {
        return 0;
    }
    match Poisson::new(mean.min(POISSON_MAX_MEAN)) {
        // Float-to-int `as` saturates, so extreme means cannot wrap.
        Ok(dist) => dist.sample(rng) as u64,
        Err(_) => 0,
    }
}

/// Draw one multinomial sample of size `n` over `probabilities`.
///
/// Implemented as a chain of conditional binomials: category `i` receives
/// `Binomial(remaining, p_i / mass_left)`. The last category absorbs
/// whatever is left, so the counts always sum to `n` when the
/// probabilities sum to 1. `counts` must be at least as long as
/// `probabilities`; only the first `probabilities.len()` slots are written.
pub fn multinomial<R: Rng + ?Sized>(
    rng: &mut R,
    n: u64,
    probabilities: &[f64],
    counts: &mut [u64],
) {
    let k = probabilities.len();
    if k == 0 {
        return;
    }
    counts[..k].fill(0);
    let mut remaining = n;
    let mut mass_left = 1.0_f64;
    for i in 0..k - 1 {
        if remaining == 0 {
            return;
        }
        let p = probabilities[i];
        let conditional = if mass_left > 0.0 {
            (p / mass_left).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let drawn = binomial(rng, remaining, conditional);
        counts[i] = drawn;
        remaining = remaining.saturating_sub(drawn);
        mass_left -= p;
    }
    counts[k - 1] = remaining;
}

/// Competing-hazards split of one tick.
///
/// `hazards[i]` is `rate_i * dt`. Writes the probability of leaving
/// through each hazard into `leave` and returns the probability of
/// staying, `exp(-S)` with `S = Σ hazards`. With `S <= 0` nobody leaves:
/// returns 1 and zeroes `leave`.
///
/// `leave[i] = (1 - exp(-S)) * hazards[i] / S` is the probability that
/// clock `i` fires first, given that at least one fires within the tick.
pub fn departure_probabilities(hazards: &[f64], leave: &mut [f64]) -> f64 {
    let leave = &mut leave[..hazards.len()];
    let total: f64 = hazards.iter().sum();
    if !total.is_finite() || total <= 0.0 {
        leave.fill(0.0);
        return 1.0;
    }
    // -expm1(-S) keeps precision when S is tiny.
    let any_leaves = -(-total).exp_m1();
    for (slot, &h) in leave.iter_mut().zip(hazards) {
        *slot = any_leaves * h / total;
    }
    1.0 - any_leaves
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng(seed: u64) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(seed)
    }

    #[test]
    fn binomial_boundaries_are_exact() {
        let mut r = rng(1);
        for n in [0u64, 1, 17, 10_000] {
            for _ in 0..50 {
                assert_eq!(binomial(&mut r, n, 0.0), 0);
                assert_eq!(binomial(&mut r, n, 1.0), n);
            }
        }
    }

    #[test]
    fn binomial_nan_probability_draws_nothing() {
        assert_eq!(binomial(&mut rng(2), 100, f64::NAN), 0);
    }

    #[test]
    fn poisson_non_positive_mean_is_zero() {
        let mut r = rng(3);
        assert_eq!(poisson(&mut r, 0.0), 0);
        assert_eq!(poisson(&mut r, -1.0), 0);
        assert_eq!(poisson(&mut r, f64::INFINITY), 0);
    }

    #[test]
    fn poisson_huge_mean_saturates_instead_of_vanishing() {
        let mut r = rng(6);
        let drawn = poisson(&mut r, 1e20);
        assert!(drawn as f64 > 1e19, "drawn {drawn}");
        assert!(poisson(&mut r, 1e18) as f64 > 9e17);
    }

    #[test]
    fn poisson_mean_matches() {
        let mut r = rng(4);
        let trials = 4000;
        let total: u64 = (0..trials).map(|_| poisson(&mut r, 3.5)).sum();
        let mean = total as f64 / trials as f64;
        assert!((mean - 3.5).abs() < 0.15, "mean {mean}");
    }

    #[test]
    fn multinomial_last_category_absorbs_remainder() {
        let mut counts = [0u64; 3];
        multinomial(&mut rng(5), 500, &[0.0, 0.0, 1.0], &mut counts);
        assert_eq!(counts, [0, 0, 500]);
    }

    #[test]
    fn reference_scenario_probabilities() {
        let hazards = [2.0 * 0.01, 3.0 * 0.01];
        let mut leave = [0.0; 2];
        let stay = departure_probabilities(&hazards, &mut leave);
        assert!((stay - (-0.05f64).exp()).abs() < 1e-12);
        assert!((stay - 0.95123).abs() < 1e-5);
        assert!((leave[0] - 0.019508).abs() < 1e-6);
        assert!((leave[1] - 0.029263).abs() < 1e-6);
    }

    #[test]
    fn zero_hazard_means_nobody_leaves() {
        let mut leave = [9.0; 2];
        assert_eq!(departure_probabilities(&[0.0, 0.0], &mut leave), 1.0);
        assert_eq!(leave, [0.0, 0.0]);
    }

    proptest! {
        #[test]
        fn probability_mass_sums_to_one(
            rates in proptest::collection::vec(0.001f64..50.0, 1..8),
            dt in 0.0001f64..1.0,
        ) {
            let hazards: Vec<f64> = rates.iter().map(|r| r * dt).collect();
            let mut leave = vec![0.0; hazards.len()];
            let stay = departure_probabilities(&hazards, &mut leave);
            let mass = stay + leave.iter().sum::<f64>();
            prop_assert!((mass - 1.0).abs() < 1e-9, "mass {}", mass);
            prop_assert!(leave.iter().all(|p| *p >= 0.0));
        }

        #[test]
        fn multinomial_counts_sum_to_n(
            n in 0u64..5000,
            weights in proptest::collection::vec(0.0f64..1.0, 1..6),
            seed in any::<u64>(),
        ) {
            let total: f64 = weights.iter().sum();
            let probs: Vec<f64> = if total > 0.0 {
                weights.iter().map(|w| w / total).collect()
            } else {
                let mut p = vec![0.0; weights.len()];
                *p.last_mut().unwrap() = 1.0;
                p
            };
            let mut counts = vec![0u64; probs.len()];
            multinomial(&mut rng(seed), n, &probs, &mut counts);
            prop_assert_eq!(counts.iter().sum::<u64>(), n);
        }

        #[test]
        fn binomial_stays_within_bounds(n in 0u64..100_000, p in 0.0f64..=1.0, seed in any::<u64>()) {
            let drawn = binomial(&mut rng(seed), n, p);
            prop_assert!(drawn <= n);
        }
    }
}
