//! Rated edges between compartments.

use cohort_core::{CompartmentId, InterventionId, TransitionId};

/// How a transition draws members.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransitionKind {
    /// Independent arrival process: adds `Poisson(n * rate * dt)` members
    /// to the destination without depleting the source.
    Birth,
    /// Competing hazard whose rate is refreshed each tick from the
    /// epidemic state (force of infection).
    EpidemicDependent,
    /// Competing hazard whose rate does not depend on the epidemic state.
    EpidemicIndependent,
}

impl TransitionKind {
    /// Whether this transition is an arrival process rather than a
    /// competing hazard.
    pub fn is_birth(self) -> bool {
        matches!(self, Self::Birth)
    }
}

/// Configuration of one transition.
#[derive(Clone, Debug, PartialEq)]
pub struct TransitionDef {
    /// Compartment the transition draws from. Must be a Normal compartment.
    pub source: CompartmentId,
    /// Sampling behaviour.
    pub kind: TransitionKind,
    /// Compartment that receives the moved (or born) members.
    pub destination: CompartmentId,
    /// Intervention slot that must be on for the transition to be eligible.
    pub intervention: InterventionId,
    /// Rate per unit time at tick 0. The decision layer may replace it
    /// every tick.
    pub rate: f64,
}

impl TransitionDef {
    /// An unconditional transition (gated on the always-on slot).
    pub fn new(
        source: CompartmentId,
        kind: TransitionKind,
        destination: CompartmentId,
        rate: f64,
    ) -> Self {
        Self {
            source,
            kind,
            destination,
            intervention: InterventionId::ALWAYS_ON,
            rate,
        }
    }

    /// Gate this transition on `intervention`.
    pub fn gated_on(mut self, intervention: InterventionId) -> Self {
        self.intervention = intervention;
        self
    }
}

/// Replica-owned state of one transition.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    id: TransitionId,
    kind: TransitionKind,
    source: CompartmentId,
    destination: CompartmentId,
    intervention: InterventionId,
    initial_rate: f64,
    rate: f64,
    members_out_this_tick: u64,
    members_out_total: u64,
}

impl Transition {
    /// Build the zero state of a transition from its definition.
    pub fn from_def(id: TransitionId, def: &TransitionDef) -> Self {
        Self {
            id,
            kind: def.kind,
            source: def.source,
            destination: def.destination,
            intervention: def.intervention,
            initial_rate: def.rate,
            rate: def.rate,
            members_out_this_tick: 0,
            members_out_total: 0,
        }
    }

    /// This transition's id.
    pub fn id(&self) -> TransitionId {
        self.id
    }

    /// Sampling behaviour.
    pub fn kind(&self) -> TransitionKind {
        self.kind
    }

    /// Compartment the transition draws from.
    pub fn source(&self) -> CompartmentId {
        self.source
    }

    /// Compartment receiving the flow.
    pub fn destination(&self) -> CompartmentId {
        self.destination
    }

    /// Intervention slot gating eligibility.
    pub fn intervention(&self) -> InterventionId {
        self.intervention
    }

    /// Current rate as last supplied.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Rate used for sampling: non-finite or negative rates count as 0.
    pub fn effective_rate(&self) -> f64 {
        if self.rate.is_finite() && self.rate > 0.0 {
            self.rate
        } else {
            0.0
        }
    }

    /// Replace the rate for the coming tick.
    pub fn set_rate(&mut self, rate: f64) {
        self.rate = rate;
    }

    /// Members moved (or born) through this transition in the current tick.
    pub fn members_out_this_tick(&self) -> u64 {
        self.members_out_this_tick
    }

    /// Members moved (or born) through this transition since tick 0.
    pub fn members_out_total(&self) -> u64 {
        self.members_out_total
    }

    pub(crate) fn record_out(&mut self, count: u64) {
        self.members_out_this_tick += count;
        self.members_out_total += count;
    }

    /// Zero the per-tick outflow accumulator.
    pub fn reset_tick_accumulators(&mut self) {
        self.members_out_this_tick = 0;
    }

    /// Restore the configured rate and zero both accumulators.
    pub fn reset(&mut self) {
        self.rate = self.initial_rate;
        self.members_out_this_tick = 0;
        self.members_out_total = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(rate: f64) -> TransitionDef {
        TransitionDef::new(
            CompartmentId(0),
            TransitionKind::EpidemicIndependent,
            CompartmentId(1),
            rate,
        )
    }

    #[test]
    fn effective_rate_sanitizes_bad_values() {
        let mut t = Transition::from_def(TransitionId(0), &def(2.0));
        assert_eq!(t.effective_rate(), 2.0);
        t.set_rate(-1.0);
        assert_eq!(t.effective_rate(), 0.0);
        t.set_rate(f64::NAN);
        assert_eq!(t.effective_rate(), 0.0);
    }

    #[test]
    fn tick_accumulator_resets_but_total_survives() {
        let mut t = Transition::from_def(TransitionId(0), &def(1.0));
        t.record_out(5);
        t.record_out(2);
        assert_eq!(t.members_out_this_tick(), 7);
        t.reset_tick_accumulators();
        assert_eq!(t.members_out_this_tick(), 0);
        assert_eq!(t.members_out_total(), 7);
    }

    #[test]
    fn reset_restores_configured_rate() {
        let mut t = Transition::from_def(TransitionId(0), &def(1.5));
        t.set_rate(9.0);
        t.record_out(3);
        t.reset();
        assert_eq!(t.rate(), 1.5);
        assert_eq!(t.members_out_total(), 0);
    }

    #[test]
    fn gated_on_overrides_default_slot() {
        let d = def(1.0).gated_on(InterventionId(3));
        assert_eq!(d.intervention, InterventionId(3));
        assert!(TransitionKind::Birth.is_birth());
        assert!(!d.kind.is_birth());
    }
}
