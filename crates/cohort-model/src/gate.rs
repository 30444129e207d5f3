//! Intervention gating of a compartment's outgoing transitions.
//!
//! A transition is eligible when the bit of its activating intervention is
//! on in the current [`InterventionCombination`]. The gate never decides
//! which interventions are on; it only filters.
//!
//! [`ActiveTransitions`] memoizes the filtered set per compartment, keyed
//! by the last combination it saw. Recomputing on every tick would give
//! the same answer; the cache only saves the work.

use cohort_core::{InterventionCombination, TransitionId};
use smallvec::SmallVec;

use crate::transition::Transition;

/// Whether `transition` may fire under `combination`.
pub fn is_eligible(transition: &Transition, combination: &InterventionCombination) -> bool {
    combination.is_on(transition.intervention())
}

/// Cached eligible subset of one compartment's transitions, plus the
/// scratch buffers the departure sampler needs for that subset.
#[derive(Clone, Debug, Default)]
pub struct ActiveTransitions {
    seen: Option<InterventionCombination>,
    hazards: SmallVec<[TransitionId; 4]>,
    births: SmallVec<[TransitionId; 2]>,
    // Sized `hazards.len() + 1`; the last slot is the "stay" category.
    pub(crate) probabilities: SmallVec<[f64; 5]>,
    pub(crate) counts: SmallVec<[u64; 5]>,
    pub(crate) hazard_scratch: SmallVec<[f64; 4]>,
    recomputes: u64,
}

impl ActiveTransitions {
    /// Bring the active set in line with `combination`.
    ///
    /// No-op when `combination` equals the last one seen. Otherwise
    /// re-filters `attached` and resizes the sampler buffers. Returns
    /// whether a recompute happened.
    pub fn refresh(
        &mut self,
        combination: &InterventionCombination,
        attached: &[TransitionId],
        transitions: &[Transition],
    ) -> bool {
        if self.seen.as_ref() == Some(combination) {
            return false;
        }
        self.hazards.clear();
        self.births.clear();
        for &id in attached {
            let t = &transitions[id.index()];
            if !is_eligible(t, combination) {
                continue;
            }
            if t.kind().is_birth() {
                self.births.push(id);
            } else {
                self.hazards.push(id);
            }
        }
        let k = self.hazards.len();
        self.probabilities.clear();
        self.probabilities.resize(k + 1, 0.0);
        self.counts.clear();
        self.counts.resize(k + 1, 0);
        self.hazard_scratch.clear();
        self.hazard_scratch.resize(k, 0.0);
        self.seen = Some(combination.clone());
        self.recomputes += 1;
        true
    }

    /// Eligible competing-hazard transitions, in attachment order.
    pub fn hazards(&self) -> &[TransitionId] {
        &self.hazards
    }

    /// Eligible birth transitions, in attachment order.
    pub fn births(&self) -> &[TransitionId] {
        &self.births
    }

    /// Whether `id` is currently eligible.
    pub fn contains(&self, id: TransitionId) -> bool {
        self.hazards.contains(&id) || self.births.contains(&id)
    }

    /// The combination the active set was computed from.
    pub fn combination(&self) -> Option<&InterventionCombination> {
        self.seen.as_ref()
    }

    /// Number of times the active set has been recomputed.
    pub fn recomputes(&self) -> u64 {
        self.recomputes
    }
}
