//! Population buckets and their per-tick departure resolution.
//!
//! A [`Compartment`] is one of four kinds, modelled as the closed sum
//! type [`CompartmentKind`]:
//!
//! - **Normal**: a stock. Members leave through competing-hazard
//!   transitions; birth transitions add to a destination without
//!   depleting the stock.
//! - **Death**: a flow counter. Arrivals are recorded and the stock is
//!   immediately zeroed.
//! - **Splitting**: a pass-through that routes each arrival to one of two
//!   destinations with a fixed success probability.
//! - **ResourceMonitor**: a pass-through that routes arrivals to a
//!   "served" destination while a resource lasts, and to an "unserved"
//!   destination otherwise.
//!
//! Pass-through compartments hold members only between an arrival and
//! the immediately following [`send_out_members`](Compartment::send_out_members)
//! call, so they are empty at every tick boundary.

use cohort_core::{
    AnomalyKind, CompartmentId, InterventionCombination, ResourceId, SamplingAnomaly,
    TransitionId,
};
use rand::Rng;
use smallvec::{smallvec, SmallVec};

use crate::gate::ActiveTransitions;
use crate::ledger::ResourceLedger;
use crate::sampling;
use crate::transition::Transition;

// ── Definitions ────────────────────────────────────────────────────

/// Configuration of one compartment.
#[derive(Clone, Debug, PartialEq)]
pub enum CompartmentDef {
    /// A stock drained by competing hazards.
    Normal {
        /// Name, unique within a model.
        name: String,
        /// Members at tick 0.
        initial_size: u64,
        /// The run ends as eradicated once every compartment with this
        /// flag is empty.
        empty_to_eradicate: bool,
    },
    /// A flow counter for members leaving the population.
    Death {
        /// Name, unique within a model.
        name: String,
    },
    /// Bernoulli router.
    Splitting {
        /// Name, unique within a model.
        name: String,
        /// Probability that an arrival goes to `on_success`.
        probability: f64,
        /// Destination of successes.
        on_success: CompartmentId,
        /// Destination of failures.
        on_failure: CompartmentId,
    },
    /// Resource-throttled router.
    ResourceMonitor {
        /// Name, unique within a model.
        name: String,
        /// Resource drawn from.
        resource: ResourceId,
        /// Units consumed per served arrival.
        consumption_per_arrival: f64,
        /// Destination of served arrivals.
        on_served: CompartmentId,
        /// Destination of arrivals that could not be served.
        on_unserved: CompartmentId,
    },
}

impl CompartmentDef {
    /// A Normal compartment that does not take part in eradication.
    pub fn normal(name: impl Into<String>, initial_size: u64) -> Self {
        Self::Normal {
            name: name.into(),
            initial_size,
            empty_to_eradicate: false,
        }
    }

    /// A Normal compartment whose emptiness counts towards eradication.
    pub fn eradication_target(name: impl Into<String>, initial_size: u64) -> Self {
        Self::Normal {
            name: name.into(),
            initial_size,
            empty_to_eradicate: true,
        }
    }

    /// A Death compartment.
    pub fn death(name: impl Into<String>) -> Self {
        Self::Death { name: name.into() }
    }

    /// The compartment's name.
    pub fn name(&self) -> &str {
        match self {
            Self::Normal { name, .. }
            | Self::Death { name }
            | Self::Splitting { name, .. }
            | Self::ResourceMonitor { name, .. } => name,
        }
    }

    /// Compartments this one forwards to within the same tick.
    ///
    /// Non-empty only for pass-through kinds.
    pub fn pass_through_destinations(&self) -> SmallVec<[CompartmentId; 2]> {
        match *self {
            Self::Splitting {
                on_success,
                on_failure,
                ..
            } => smallvec![on_success, on_failure],
            Self::ResourceMonitor {
                on_served,
                on_unserved,
                ..
            } => smallvec![on_served, on_unserved],
            Self::Normal { .. } | Self::Death { .. } => SmallVec::new(),
        }
    }
}

// ── Departures ─────────────────────────────────────────────────────

/// Members sent from one compartment to one destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Flow {
    /// Receiving compartment.
    pub destination: CompartmentId,
    /// Number of members.
    pub count: u64,
    /// Transition the flow went through, if it came from a Normal
    /// compartment.
    pub transition: Option<TransitionId>,
    /// Whether the members were born rather than moved.
    pub birth: bool,
}

/// Output buffer of [`Compartment::send_out_members`].
///
/// Reused across calls; every call clears it first.
#[derive(Clone, Debug, Default)]
pub struct Departures {
    /// Non-empty flows, in transition order.
    pub flows: SmallVec<[Flow; 4]>,
    /// Out-of-range draws that were clamped to 0.
    pub anomalies: Vec<SamplingAnomaly>,
    /// Members that left the source (births excluded).
    pub departed: u64,
    /// Members born into destinations.
    pub born: u64,
}

impl Departures {
    /// Empty the buffer.
    pub fn clear(&mut self) {
        self.flows.clear();
        self.anomalies.clear();
        self.departed = 0;
        self.born = 0;
    }

    /// Members sent to `destination` across all flows.
    pub fn total_to(&self, destination: CompartmentId) -> u64 {
        self.flows
            .iter()
            .filter(|f| f.destination == destination)
            .map(|f| f.count)
            .sum()
    }

    fn push(&mut self, flow: Flow) {
        if flow.count == 0 {
            return;
        }
        if flow.birth {
            self.born += flow.count;
        } else {
            self.departed += flow.count;
        }
        self.flows.push(flow);
    }
}

// ── Compartment ────────────────────────────────────────────────────

/// Kind-specific state of a compartment.
#[derive(Clone, Debug)]
pub enum CompartmentKind {
    /// Stock drained by competing hazards.
    Normal {
        /// Every transition originating here, in configuration order.
        transitions: SmallVec<[TransitionId; 4]>,
        /// Memoized eligible subset.
        active: ActiveTransitions,
    },
    /// Flow counter.
    Death,
    /// Bernoulli router.
    Splitting {
        /// Success probability.
        probability: f64,
        /// Destination of successes.
        on_success: CompartmentId,
        /// Destination of failures.
        on_failure: CompartmentId,
    },
    /// Resource-throttled router.
    ResourceMonitor {
        /// Resource drawn from.
        resource: ResourceId,
        /// Units per served arrival.
        consumption_per_arrival: f64,
        /// Destination of served arrivals.
        on_served: CompartmentId,
        /// Destination of unserved arrivals.
        on_unserved: CompartmentId,
    },
}

/// Replica-owned state of one compartment.
#[derive(Clone, Debug)]
pub struct Compartment {
    id: CompartmentId,
    name: String,
    initial_size: u64,
    empty_to_eradicate: bool,
    members: u64,
    new_members_this_tick: u64,
    accumulated_new_members: u64,
    kind: CompartmentKind,
}

impl Compartment {
    /// Build the zero state of a compartment from its definition.
    ///
    /// Transitions are attached separately with
    /// [`attach_transition`](Self::attach_transition).
    pub fn from_def(id: CompartmentId, def: &CompartmentDef) -> Self {
        let (initial_size, empty_to_eradicate, kind) = match *def {
            CompartmentDef::Normal {
                initial_size,
                empty_to_eradicate,
                ..
            } => (
                initial_size,
                empty_to_eradicate,
                CompartmentKind::Normal {
                    transitions: SmallVec::new(),
                    active: ActiveTransitions::default(),
                },
            ),
            CompartmentDef::Death { .. } => (0, false, CompartmentKind::Death),
            CompartmentDef::Splitting {
                probability,
                on_success,
                on_failure,
                ..
            } => (
                0,
                false,
                CompartmentKind::Splitting {
                    probability,
                    on_success,
                    on_failure,
                },
            ),
            CompartmentDef::ResourceMonitor {
                resource,
                consumption_per_arrival,
                on_served,
                on_unserved,
                ..
            } => (
                0,
                false,
                CompartmentKind::ResourceMonitor {
                    resource,
                    consumption_per_arrival,
                    on_served,
                    on_unserved,
                },
            ),
        };
        Self {
            id,
            name: def.name().to_string(),
            initial_size,
            empty_to_eradicate,
            members: initial_size,
            new_members_this_tick: 0,
            accumulated_new_members: 0,
            kind,
        }
    }

    /// Register an outgoing transition. Returns `false` for non-Normal
    /// compartments, which cannot own transitions.
    pub fn attach_transition(&mut self, id: TransitionId) -> bool {
        match &mut self.kind {
            CompartmentKind::Normal { transitions, .. } => {
                transitions.push(id);
                true
            }
            _ => false,
        }
    }

    /// This compartment's id.
    pub fn id(&self) -> CompartmentId {
        self.id
    }

    /// Compartment name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind-specific state.
    pub fn kind(&self) -> &CompartmentKind {
        &self.kind
    }

    /// Members at tick 0.
    pub fn initial_size(&self) -> u64 {
        self.initial_size
    }

    /// Current members.
    pub fn members(&self) -> u64 {
        self.members
    }

    /// Arrivals during the current tick (births included).
    pub fn new_members_this_tick(&self) -> u64 {
        self.new_members_this_tick
    }

    /// Arrivals since tick 0.
    pub fn accumulated_new_members(&self) -> u64 {
        self.accumulated_new_members
    }

    /// Whether this compartment takes part in the eradication check.
    pub fn empty_to_eradicate(&self) -> bool {
        self.empty_to_eradicate
    }

    /// Whether arrivals are forwarded within the same tick.
    pub fn is_pass_through(&self) -> bool {
        matches!(
            self.kind,
            CompartmentKind::Splitting { .. } | CompartmentKind::ResourceMonitor { .. }
        )
    }

    /// The memoized gate of a Normal compartment.
    pub fn active_transitions(&self) -> Option<&ActiveTransitions> {
        match &self.kind {
            CompartmentKind::Normal { active, .. } => Some(active),
            _ => None,
        }
    }

    /// Record `n` arrivals. No-op for `n == 0`.
    ///
    /// Death compartments record the arrivals and drop them immediately.
    pub fn add_members(&mut self, n: u64) {
        if n == 0 {
            return;
        }
        self.members = self.members.saturating_add(n);
        self.new_members_this_tick = self.new_members_this_tick.saturating_add(n);
        self.accumulated_new_members = self.accumulated_new_members.saturating_add(n);
        if matches!(self.kind, CompartmentKind::Death) {
            self.members = 0;
        }
    }

    /// Recompute the eligible transitions if `combination` changed.
    ///
    /// Returns whether a recompute happened. Always `false` for
    /// non-Normal compartments.
    pub fn refresh_active_transitions(
        &mut self,
        combination: &InterventionCombination,
        transitions: &[Transition],
    ) -> bool {
        match &mut self.kind {
            CompartmentKind::Normal {
                transitions: attached,
                active,
            } => active.refresh(combination, attached, transitions),
            _ => false,
        }
    }

    /// Zero the per-tick arrival counter.
    pub fn reset_tick_accumulators(&mut self) {
        self.new_members_this_tick = 0;
    }

    /// Restore the tick-0 state: initial members, zero counters, empty gate.
    pub fn reset(&mut self) {
        self.members = self.initial_size;
        self.new_members_this_tick = 0;
        self.accumulated_new_members = 0;
        if let CompartmentKind::Normal { active, .. } = &mut self.kind {
            *active = ActiveTransitions::default();
        }
    }

    /// Resolve this tick's departures into `out`.
    ///
    /// Normal compartments sample their active transitions against the
    /// current `members` (the caller guarantees that is the tick-start
    /// value). Pass-through compartments forward everything they hold.
    /// Death compartments never send anything.
    ///
    /// `transitions` is the replica's full transition array; per-transition
    /// outflow accumulators are updated in place. `ledger` is debited by
    /// resource monitors.
    pub fn send_out_members<R: Rng + ?Sized>(
        &mut self,
        transitions: &mut [Transition],
        ledger: &mut ResourceLedger,
        dt: f64,
        rng: &mut R,
        out: &mut Departures,
    ) {
        out.clear();
        let n = self.members;
        if n == 0 {
            return;
        }
        let id = self.id;
        match &mut self.kind {
            CompartmentKind::Normal { active, .. } => {
                let departed = compete(id, n, active, transitions, dt, rng, out);
                self.members = n - departed;
                add_births(n, active, transitions, dt, rng, out);
            }
            CompartmentKind::Death => {
                self.members = 0;
            }
            CompartmentKind::Splitting {
                probability,
                on_success,
                on_failure,
            } => {
                let drawn = sampling::binomial(rng, n, *probability);
                let (successes, anomaly) = clamp_draw(AnomalyKind::Split, id, None, drawn, n);
                out.anomalies.extend(anomaly);
                out.push(forward(*on_success, successes));
                out.push(forward(*on_failure, n - successes));
                self.members = 0;
            }
            CompartmentKind::ResourceMonitor {
                resource,
                consumption_per_arrival,
                on_served,
                on_unserved,
            } => {
                let served = n.min(ledger.servable(*resource, *consumption_per_arrival));
                if *consumption_per_arrival > 0.0 {
                    ledger.debit(*resource, served as f64 * *consumption_per_arrival);
                }
                out.push(forward(*on_served, served));
                out.push(forward(*on_unserved, n - served));
                self.members = 0;
            }
        }
    }
}

/// Clamp a drawn count to 0 when it exceeds `bound`, describing the
/// clamp as an anomaly.
fn clamp_draw(
    kind: AnomalyKind,
    compartment: CompartmentId,
    transition: Option<TransitionId>,
    drawn: u64,
    bound: u64,
) -> (u64, Option<SamplingAnomaly>) {
    if drawn <= bound {
        return (drawn, None);
    }
    let anomaly = SamplingAnomaly {
        kind,
        compartment,
        transition,
        drawn,
        bound,
    };
    (0, Some(anomaly))
}

fn forward(destination: CompartmentId, count: u64) -> Flow {
    Flow {
        destination,
        count,
        transition: None,
        birth: false,
    }
}

/// Competing-hazards draw over the active non-birth transitions.
/// Returns the number of members that left.
fn compete<R: Rng + ?Sized>(
    id: CompartmentId,
    n: u64,
    active: &mut ActiveTransitions,
    transitions: &mut [Transition],
    dt: f64,
    rng: &mut R,
    out: &mut Departures,
) -> u64 {
    let k = active.hazards().len();
    if k == 0 {
        return 0;
    }
    for slot in 0..k {
        let tid = active.hazards()[slot];
        active.hazard_scratch[slot] = transitions[tid.index()].effective_rate() * dt;
    }
    let stay = sampling::departure_probabilities(&active.hazard_scratch, &mut active.probabilities);
    if stay >= 1.0 {
        return 0;
    }
    // Departures first, "stay" last so it absorbs the remainder.
    active.probabilities[k] = stay;
    sampling::multinomial(rng, n, &active.probabilities, &mut active.counts);

    let mut departed = 0u64;
    for slot in 0..k {
        let tid = active.hazards()[slot];
        let (count, anomaly) = clamp_draw(
            AnomalyKind::Departure,
            id,
            Some(tid),
            active.counts[slot],
            n - departed,
        );
        out.anomalies.extend(anomaly);
        departed += count;
        let t = &mut transitions[tid.index()];
        t.record_out(count);
        out.push(Flow {
            destination: t.destination(),
            count,
            transition: Some(tid),
            birth: false,
        });
    }
    departed
}

/// Independent Poisson arrivals for each active birth transition, driven
/// by the tick-start population `n`.
fn add_births<R: Rng + ?Sized>(
    n: u64,
    active: &ActiveTransitions,
    transitions: &mut [Transition],
    dt: f64,
    rng: &mut R,
    out: &mut Departures,
) {
    for &tid in active.births() {
        let t = &mut transitions[tid.index()];
        let born = sampling::poisson(rng, n as f64 * t.effective_rate() * dt);
        t.record_out(born);
        out.push(Flow {
            destination: t.destination(),
            count: born,
            transition: Some(tid),
            birth: true,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{Replenishment, ResourceDef};
    use crate::transition::{TransitionDef, TransitionKind};
    use cohort_core::InterventionId;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// Source 0 with hazards to 1 and 2; optional birth back into 0.
    fn setup(n: u64, rates: &[f64], birth: Option<f64>) -> (Compartment, Vec<Transition>) {
        let mut source = Compartment::from_def(CompartmentId(0), &CompartmentDef::normal("S", n));
        let mut transitions = Vec::new();
        for (i, &rate) in rates.iter().enumerate() {
            let def = TransitionDef::new(
                CompartmentId(0),
                TransitionKind::EpidemicIndependent,
                CompartmentId(i as u32 + 1),
                rate,
            );
            let id = TransitionId(transitions.len() as u32);
            transitions.push(Transition::from_def(id, &def));
            source.attach_transition(id);
        }
        if let Some(rate) = birth {
            let def = TransitionDef::new(CompartmentId(0), TransitionKind::Birth, CompartmentId(0), rate);
            let id = TransitionId(transitions.len() as u32);
            transitions.push(Transition::from_def(id, &def));
            source.attach_transition(id);
        }
        source.refresh_active_transitions(&InterventionCombination::all_off(1), &transitions);
        (source, transitions)
    }

    #[test]
    fn add_members_zero_is_noop() {
        let mut c = Compartment::from_def(CompartmentId(0), &CompartmentDef::normal("S", 3));
        c.add_members(0);
        assert_eq!(c.members(), 3);
        assert_eq!(c.new_members_this_tick(), 0);
        c.add_members(4);
        assert_eq!(c.members(), 7);
        assert_eq!(c.new_members_this_tick(), 4);
        assert_eq!(c.accumulated_new_members(), 4);
    }

    #[test]
    fn clamp_draw_passes_legal_counts_through() {
        let (count, anomaly) = clamp_draw(AnomalyKind::Split, CompartmentId(2), None, 7, 7);
        assert_eq!(count, 7);
        assert!(anomaly.is_none());
    }

    #[test]
    fn clamp_draw_zeroes_and_reports_excess() {
        let (count, anomaly) = clamp_draw(
            AnomalyKind::Departure,
            CompartmentId(1),
            Some(TransitionId(3)),
            12,
            10,
        );
        assert_eq!(count, 0);
        let anomaly = anomaly.unwrap();
        assert_eq!(
            anomaly,
            SamplingAnomaly {
                kind: AnomalyKind::Departure,
                compartment: CompartmentId(1),
                transition: Some(TransitionId(3)),
                drawn: 12,
                bound: 10,
            }
        );
        let msg = anomaly.to_string();
        assert!(msg.contains("12") && msg.contains("10"));
    }

    #[test]
    fn add_members_saturates() {
        let mut c = Compartment::from_def(CompartmentId(0), &CompartmentDef::normal("S", u64::MAX - 1));
        c.add_members(5);
        assert_eq!(c.members(), u64::MAX);
    }

    #[test]
    fn death_records_then_zeroes() {
        let mut d = Compartment::from_def(CompartmentId(0), &CompartmentDef::death("D"));
        d.add_members(12);
        assert_eq!(d.members(), 0);
        assert_eq!(d.new_members_this_tick(), 12);
        d.reset_tick_accumulators();
        d.add_members(3);
        assert_eq!(d.new_members_this_tick(), 3);
        assert_eq!(d.accumulated_new_members(), 15);
    }

    #[test]
    fn non_normal_cannot_own_transitions() {
        let mut d = Compartment::from_def(CompartmentId(0), &CompartmentDef::death("D"));
        assert!(!d.attach_transition(TransitionId(0)));
        assert!(d.active_transitions().is_none());
    }

    #[test]
    fn zero_rates_send_nobody() {
        let (mut c, mut ts) = setup(100, &[0.0, 0.0], None);
        let mut ledger = ResourceLedger::default();
        let mut out = Departures::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        c.send_out_members(&mut ts, &mut ledger, 0.1, &mut rng, &mut out);
        assert_eq!(c.members(), 100);
        assert!(out.flows.is_empty());
    }

    #[test]
    fn gated_off_transition_does_not_fire() {
        let (mut c, mut ts) = setup(1000, &[50.0], None);
        ts[0] = Transition::from_def(
            TransitionId(0),
            &TransitionDef::new(
                CompartmentId(0),
                TransitionKind::EpidemicDependent,
                CompartmentId(1),
                50.0,
            )
            .gated_on(InterventionId(1)),
        );
        c.refresh_active_transitions(&InterventionCombination::all_off(2), &ts);
        let mut out = Departures::default();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        c.send_out_members(&mut ts, &mut ResourceLedger::default(), 1.0, &mut rng, &mut out);
        assert_eq!(c.members(), 1000);
        assert_eq!(out.departed, 0);
    }

    #[test]
    fn reference_scenario_mean_departures() {
        let trials = 2000;
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut ledger = ResourceLedger::default();
        let mut out = Departures::default();
        let (mut to_one, mut to_two) = (0u64, 0u64);
        for _ in 0..trials {
            let (mut c, mut ts) = setup(1000, &[2.0, 3.0], None);
            c.send_out_members(&mut ts, &mut ledger, 0.01, &mut rng, &mut out);
            to_one += out.total_to(CompartmentId(1));
            to_two += out.total_to(CompartmentId(2));
        }
        let mean_one = to_one as f64 / f64::from(trials);
        let mean_two = to_two as f64 / f64::from(trials);
        assert!((mean_one - 19.508).abs() < 0.6, "mean to 1: {mean_one}");
        assert!((mean_two - 29.263).abs() < 0.7, "mean to 2: {mean_two}");
    }

    #[test]
    fn births_do_not_deplete_source() {
        let (mut c, mut ts) = setup(1000, &[], Some(5.0));
        let mut out = Departures::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        c.send_out_members(&mut ts, &mut ResourceLedger::default(), 0.1, &mut rng, &mut out);
        assert_eq!(c.members(), 1000);
        assert_eq!(out.departed, 0);
        assert!(out.born > 0);
        assert_eq!(ts[0].members_out_this_tick(), out.born);
    }

    #[test]
    fn splitting_boundaries_are_exact() {
        for (p, expect_success) in [(0.0, 0u64), (1.0, 40u64)] {
            let def = CompartmentDef::Splitting {
                name: "split".into(),
                probability: p,
                on_success: CompartmentId(1),
                on_failure: CompartmentId(2),
            };
            let mut c = Compartment::from_def(CompartmentId(0), &def);
            let mut rng = ChaCha8Rng::seed_from_u64(4);
            let mut out = Departures::default();
            for _ in 0..20 {
                c.add_members(40);
                c.send_out_members(&mut [], &mut ResourceLedger::default(), 0.1, &mut rng, &mut out);
                assert_eq!(c.members(), 0);
                assert_eq!(out.total_to(CompartmentId(1)), expect_success);
                assert_eq!(out.total_to(CompartmentId(2)), 40 - expect_success);
            }
        }
    }

    #[test]
    fn resource_monitor_throttles_and_debits() {
        let mut ledger = ResourceLedger::new(&[ResourceDef {
            name: "beds".into(),
            replenishment: Replenishment::OneTime {
                first_available: 0.0,
                quantity: 10.0,
            },
        }]);
        ledger.replenish(0.0);
        let def = CompartmentDef::ResourceMonitor {
            name: "triage".into(),
            resource: ResourceId(0),
            consumption_per_arrival: 3.0,
            on_served: CompartmentId(1),
            on_unserved: CompartmentId(2),
        };
        let mut c = Compartment::from_def(CompartmentId(0), &def);
        c.add_members(5);
        let mut out = Departures::default();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        c.send_out_members(&mut [], &mut ledger, 0.1, &mut rng, &mut out);
        assert_eq!(c.members(), 0);
        assert_eq!(out.total_to(CompartmentId(1)), 3);
        assert_eq!(out.total_to(CompartmentId(2)), 2);
        assert_eq!(ledger.available(ResourceId(0)), 1.0);
    }

    #[test]
    fn reset_restores_initial_state() {
        let (mut c, mut ts) = setup(50, &[100.0], None);
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let mut out = Departures::default();
        c.send_out_members(&mut ts, &mut ResourceLedger::default(), 1.0, &mut rng, &mut out);
        c.add_members(2);
        c.reset();
        assert_eq!(c.members(), 50);
        assert_eq!(c.accumulated_new_members(), 0);
        assert_eq!(c.active_transitions().map(|a| a.recomputes()), Some(0));
    }

    proptest! {
        #[test]
        fn normal_compartment_conserves_members(
            n in 1u64..20_000,
            rates in proptest::collection::vec(0.0f64..40.0, 1..5),
            dt in 0.001f64..0.5,
            seed in any::<u64>(),
        ) {
            let (mut c, mut ts) = setup(n, &rates, Some(0.5));
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut out = Departures::default();
            c.send_out_members(&mut ts, &mut ResourceLedger::default(), dt, &mut rng, &mut out);
            let moved: u64 = out.flows.iter().filter(|f| !f.birth).map(|f| f.count).sum();
            prop_assert!(c.members() <= n);
            prop_assert_eq!(moved + c.members(), n);
            prop_assert_eq!(moved, out.departed);
            prop_assert!(out.anomalies.is_empty());
        }

        #[test]
        fn pass_through_is_empty_after_send_out(
            n in 1u64..10_000,
            p in 0.0f64..=1.0,
            seed in any::<u64>(),
        ) {
            let def = CompartmentDef::Splitting {
                name: "split".into(),
                probability: p,
                on_success: CompartmentId(1),
                on_failure: CompartmentId(2),
            };
            let mut c = Compartment::from_def(CompartmentId(0), &def);
            c.add_members(n);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut out = Departures::default();
            c.send_out_members(&mut [], &mut ResourceLedger::default(), 0.1, &mut rng, &mut out);
            prop_assert_eq!(c.members(), 0);
            prop_assert_eq!(out.departed, n);
        }
    }
}
