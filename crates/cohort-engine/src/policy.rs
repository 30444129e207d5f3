//! Per-tick decision layer.
//!
//! Before each tick the engine hands the active [`Policy`] a
//! [`DecisionContext`]. The policy reads the state left by the previous
//! tick and may:
//!
//! - switch intervention slots on or off,
//! - replace transition rates (e.g. a force of infection computed from
//!   current prevalence),
//! - reject the trajectory, which stops the run at this tick boundary.
//!
//! Whatever the policy leaves in the combination and the rates is what
//! the coming tick samples with. Both persist into later ticks unless
//! changed again.

use cohort_core::{
    CompartmentId, InterventionCombination, InterventionId, ResourceId, TickId, TransitionId,
};
use cohort_model::{Compartment, ResourceLedger, Transition};

use crate::blueprint::Blueprint;

/// Decision-layer collaborator consulted once per tick.
///
/// Shared immutably by every replica of a batch, so it must be
/// `Send + Sync`. Any per-run memory belongs in the replica state the
/// context exposes, not in the policy.
pub trait Policy: Send + Sync {
    /// Inspect the state and set up the coming tick.
    fn decide(&self, ctx: &mut DecisionContext<'_>);
}

impl<F> Policy for F
where
    F: Fn(&mut DecisionContext<'_>) + Send + Sync,
{
    fn decide(&self, ctx: &mut DecisionContext<'_>) {
        self(ctx)
    }
}

/// Leaves every intervention off and every rate as configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct Baseline;

impl Policy for Baseline {
    fn decide(&self, _ctx: &mut DecisionContext<'_>) {}
}

/// View of one replica between two ticks.
pub struct DecisionContext<'a> {
    tick: TickId,
    time: f64,
    blueprint: &'a Blueprint,
    compartments: &'a [Compartment],
    ledger: &'a ResourceLedger,
    transitions: &'a mut [Transition],
    combination: &'a mut InterventionCombination,
    rejection: Option<String>,
}

impl<'a> DecisionContext<'a> {
    pub(crate) fn new(
        tick: TickId,
        blueprint: &'a Blueprint,
        compartments: &'a [Compartment],
        ledger: &'a ResourceLedger,
        transitions: &'a mut [Transition],
        combination: &'a mut InterventionCombination,
    ) -> Self {
        Self {
            tick,
            time: tick.time(blueprint.dt()),
            blueprint,
            compartments,
            ledger,
            transitions,
            combination,
            rejection: None,
        }
    }

    /// The tick about to run.
    pub fn tick(&self) -> TickId {
        self.tick
    }

    /// Epidemic time at the start of the coming tick.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Epidemic time per tick.
    pub fn dt(&self) -> f64 {
        self.blueprint.dt()
    }

    /// Id of the compartment called `name`.
    pub fn compartment_id(&self, name: &str) -> Option<CompartmentId> {
        self.blueprint.compartment_id(name)
    }

    /// Current members of `id` (0 for an unknown id).
    pub fn size(&self, id: CompartmentId) -> u64 {
        self.compartments.get(id.index()).map_or(0, Compartment::members)
    }

    /// Current members of the compartment called `name`.
    pub fn size_of(&self, name: &str) -> Option<u64> {
        self.compartment_id(name).map(|id| self.size(id))
    }

    /// Arrivals into `id` during the previous tick.
    pub fn new_members(&self, id: CompartmentId) -> u64 {
        self.compartments
            .get(id.index())
            .map_or(0, Compartment::new_members_this_tick)
    }

    /// Read-only view of every compartment.
    pub fn compartments(&self) -> &[Compartment] {
        self.compartments
    }

    /// Units of `id` currently available.
    pub fn units_available(&self, id: ResourceId) -> f64 {
        self.ledger.available(id)
    }

    /// Combination the coming tick will use.
    pub fn combination(&self) -> &InterventionCombination {
        self.combination
    }

    /// Mutable access to the combination.
    pub fn combination_mut(&mut self) -> &mut InterventionCombination {
        self.combination
    }

    /// Switch slot `id`. Returns `false` if the slot does not exist or is
    /// the always-on slot.
    pub fn set_intervention(&mut self, id: InterventionId, on: bool) -> bool {
        self.combination.set(id, on)
    }

    /// Current rate of transition `id`.
    pub fn rate(&self, id: TransitionId) -> Option<f64> {
        self.transitions.get(id.index()).map(Transition::rate)
    }

    /// Replace the rate of transition `id` for the coming tick. Returns
    /// `false` for an unknown id. Negative or non-finite rates are
    /// accepted and sample as 0.
    pub fn set_rate(&mut self, id: TransitionId, rate: f64) -> bool {
        match self.transitions.get_mut(id.index()) {
            Some(t) => {
                t.set_rate(rate);
                true
            }
            None => false,
        }
    }

    /// Stop the run before the coming tick with a `Rejected` status.
    pub fn reject(&mut self, reason: impl Into<String>) {
        self.rejection = Some(reason.into());
    }

    /// Whether [`reject`](Self::reject) has been called.
    pub fn is_rejected(&self) -> bool {
        self.rejection.is_some()
    }

    pub(crate) fn into_rejection(self) -> Option<String> {
        self.rejection
    }
}
