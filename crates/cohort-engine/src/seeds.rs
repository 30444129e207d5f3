//! Seed assignment for replica batches.

use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::coordinator::ReplicationError;

/// How replica `i` of a batch gets its seed.
#[derive(Clone, Debug, PartialEq)]
pub enum SeedPlan {
    /// Replica `i` uses `base + i` (wrapping).
    Sequential {
        /// Seed of replica 0.
        base: u64,
    },
    /// Replica `i` uses `seeds[i]`. Extra seeds are ignored.
    Prespecified(Vec<u64>),
    /// Importance resampling: each replica draws one of `seeds` with
    /// probability proportional to its weight. The draws come from a
    /// stream seeded with `resample_seed`, so the assignment is
    /// reproducible.
    Weighted {
        /// Candidate seeds.
        seeds: Vec<u64>,
        /// One non-negative weight per candidate.
        weights: Vec<f64>,
        /// Seed of the resampling stream.
        resample_seed: u64,
    },
}

impl Default for SeedPlan {
    fn default() -> Self {
        Self::Sequential { base: 0 }
    }
}

impl SeedPlan {
    /// Seeds for replicas `0..replicas`, in replica order.
    pub fn resolve(&self, replicas: usize) -> Result<Vec<u64>, ReplicationError> {
        match self {
            Self::Sequential { base } => Ok((0..replicas as u64)
                .map(|i| base.wrapping_add(i))
                .collect()),
            Self::Prespecified(seeds) => {
                if seeds.len() < replicas {
                    return Err(ReplicationError::TooFewSeeds {
                        needed: replicas,
                        given: seeds.len(),
                    });
                }
                Ok(seeds[..replicas].to_vec())
            }
            Self::Weighted {
                seeds,
                weights,
                resample_seed,
            } => {
                if seeds.len() != weights.len() {
                    return Err(ReplicationError::InvalidWeights {
                        reason: format!(
                            "{} seeds but {} weights",
                            seeds.len(),
                            weights.len()
                        ),
                    });
                }
                let dist = WeightedIndex::new(weights).map_err(|e| {
                    ReplicationError::InvalidWeights {
                        reason: e.to_string(),
                    }
                })?;
                let mut rng = ChaCha8Rng::seed_from_u64(*resample_seed);
                Ok((0..replicas).map(|_| seeds[dist.sample(&mut rng)]).collect())
            }
        }
    }
}
