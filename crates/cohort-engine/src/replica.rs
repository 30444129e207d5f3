//! One independent run's mutable state.

use cohort_core::{CompartmentId, InterventionCombination, TickId};
use cohort_model::{Compartment, ResourceLedger, Transition};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Compartments, transitions, ledger, random stream and clock of one
/// replica.
///
/// Built by [`Blueprint::build_replica`](crate::Blueprint::build_replica)
/// and driven by a [`TickEngine`](crate::TickEngine). Replicas share
/// nothing, so they can run on different threads.
#[derive(Clone, Debug)]
pub struct Replica {
    pub(crate) compartments: Vec<Compartment>,
    pub(crate) transitions: Vec<Transition>,
    pub(crate) ledger: ResourceLedger,
    pub(crate) combination: InterventionCombination,
    pub(crate) rng: ChaCha8Rng,
    pub(crate) seed: u64,
    pub(crate) tick: TickId,
}

impl Replica {
    /// Return to tick 0 with a fresh stream seeded by `seed`.
    ///
    /// Reuses every allocation; the result equals a replica freshly built
    /// from the same blueprint with `seed`.
    pub fn reset(&mut self, seed: u64) {
        for c in &mut self.compartments {
            c.reset();
        }
        for t in &mut self.transitions {
            t.reset();
        }
        self.ledger.reset();
        self.combination = InterventionCombination::all_off(self.combination.len());
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self.seed = seed;
        self.tick = TickId::default();
    }

    /// Seed of the current stream.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Ticks executed so far.
    pub fn current_tick(&self) -> TickId {
        self.tick
    }

    /// All compartments, in id order.
    pub fn compartments(&self) -> &[Compartment] {
        &self.compartments
    }

    /// All transitions, in id order.
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Resource accounts.
    pub fn ledger(&self) -> &ResourceLedger {
        &self.ledger
    }

    /// Combination used by the most recent tick.
    pub fn combination(&self) -> &InterventionCombination {
        &self.combination
    }

    /// Members of `id` (0 for an unknown id).
    pub fn size(&self, id: CompartmentId) -> u64 {
        self.compartments.get(id.index()).map_or(0, Compartment::members)
    }

    /// Members across all compartments.
    pub fn total_members(&self) -> u64 {
        self.compartments.iter().map(Compartment::members).sum()
    }
}
