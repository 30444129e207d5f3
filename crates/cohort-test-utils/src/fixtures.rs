//! Reusable model and policy fixtures.
//!
//! Models:
//!
//! - [`sir_config`]: S -> I -> R with eradication on I.
//! - [`hospital_config`]: S -> I -> severity split -> bed-limited admission,
//!   with a quarantine transition gated on intervention slot 1.
//!
//! Policies:
//!
//! - [`FrequencyDependentInfection`]: sets the infection rate to
//!   `beta * I / N` every tick.
//! - [`ScheduledIntervention`]: switches one slot on inside a tick window,
//!   then delegates to an inner policy.
//! - [`RejectAt`]: rejects the trajectory at a fixed tick.
//! - [`CountingPolicy`]: counts how often it is consulted.

use std::sync::atomic::{AtomicUsize, Ordering};

use cohort_core::{CompartmentId, InterventionId, ResourceId, TransitionId};
use cohort_engine::{DecisionContext, ModelConfig, Policy, SummaryDef};
use cohort_model::{CompartmentDef, Replenishment, ResourceDef, TransitionDef, TransitionKind};

/// Ids in [`sir_config`].
#[allow(non_snake_case)]
pub mod SIR {
    use super::*;

    pub const S: CompartmentId = CompartmentId(0);
    pub const I: CompartmentId = CompartmentId(1);
    pub const R: CompartmentId = CompartmentId(2);
    pub const INFECTION: TransitionId = TransitionId(0);
    pub const RECOVERY: TransitionId = TransitionId(1);
}

/// Ids in [`hospital_config`].
#[allow(non_snake_case)]
pub mod HOSPITAL {
    use super::*;

    pub const S: CompartmentId = CompartmentId(0);
    pub const I: CompartmentId = CompartmentId(1);
    pub const SEVERITY: CompartmentId = CompartmentId(2);
    pub const ADMISSION: CompartmentId = CompartmentId(3);
    pub const WARD: CompartmentId = CompartmentId(4);
    pub const TURNED_AWAY: CompartmentId = CompartmentId(5);
    pub const R: CompartmentId = CompartmentId(6);
    pub const Q: CompartmentId = CompartmentId(7);
    pub const INFECTION: TransitionId = TransitionId(0);
    pub const QUARANTINE: TransitionId = TransitionId(3);
    pub const BEDS: ResourceId = ResourceId(0);
    pub const LOCKDOWN: InterventionId = InterventionId(1);
}

/// Closed SIR model. The infection rate starts at `beta * I / N`; pair
/// it with [`FrequencyDependentInfection`] to keep it current.
pub fn sir_config(susceptible: u64, infected: u64, beta: f64, gamma: f64) -> ModelConfig {
    let n = (susceptible + infected).max(1) as f64;
    ModelConfig {
        compartments: vec![
            CompartmentDef::normal("S", susceptible),
            CompartmentDef::eradication_target("I", infected),
            CompartmentDef::normal("R", 0),
        ],
        transitions: vec![
            TransitionDef::new(
                SIR::S,
                TransitionKind::EpidemicDependent,
                SIR::I,
                beta * infected as f64 / n,
            ),
            TransitionDef::new(SIR::I, TransitionKind::EpidemicIndependent, SIR::R, gamma),
        ],
        dt: 0.1,
        horizon: 1_000,
        summaries: vec![
            SummaryDef::size("prevalence", vec![SIR::I]),
            SummaryDef::new_members("incidence", vec![SIR::I]),
        ],
        ..ModelConfig::default()
    }
}

/// SIR with hospitalisation: a share of recoveries needs a bed, beds are
/// delivered periodically, and patients without a bed leave the model.
pub fn hospital_config(population: u64, seeded: u64, beds_per_day: f64) -> ModelConfig {
    ModelConfig {
        compartments: vec![
            CompartmentDef::normal("S", population - seeded.min(population)),
            CompartmentDef::eradication_target("I", seeded.min(population)),
            CompartmentDef::Splitting {
                name: "severity".into(),
                probability: 0.2,
                on_success: HOSPITAL::ADMISSION,
                on_failure: HOSPITAL::R,
            },
            CompartmentDef::ResourceMonitor {
                name: "admission".into(),
                resource: HOSPITAL::BEDS,
                consumption_per_arrival: 1.0,
                on_served: HOSPITAL::WARD,
                on_unserved: HOSPITAL::TURNED_AWAY,
            },
            CompartmentDef::normal("ward", 0),
            CompartmentDef::death("turned away"),
            CompartmentDef::normal("R", 0),
            CompartmentDef::normal("Q", 0),
        ],
        transitions: vec![
            TransitionDef::new(
                HOSPITAL::S,
                TransitionKind::EpidemicDependent,
                HOSPITAL::I,
                0.0,
            ),
            TransitionDef::new(
                HOSPITAL::I,
                TransitionKind::EpidemicIndependent,
                HOSPITAL::SEVERITY,
                0.25,
            ),
            TransitionDef::new(
                HOSPITAL::WARD,
                TransitionKind::EpidemicIndependent,
                HOSPITAL::R,
                0.1,
            ),
            TransitionDef::new(
                HOSPITAL::S,
                TransitionKind::EpidemicIndependent,
                HOSPITAL::Q,
                0.05,
            )
            .gated_on(HOSPITAL::LOCKDOWN),
        ],
        resources: vec![ResourceDef {
            name: "beds".into(),
            replenishment: Replenishment::Periodic {
                first_available: 0.0,
                interval: 1.0,
                quantity: beds_per_day,
            },
        }],
        intervention_slots: 2,
        dt: 0.25,
        horizon: 400,
        summaries: vec![
            SummaryDef::size("hospitalised", vec![HOSPITAL::WARD]),
            SummaryDef::new_members("incidence", vec![HOSPITAL::I]),
        ],
        observation_period: 1,
    }
}

/// Frequency-dependent force of infection: `rate = beta * I / N`, with
/// `N` the sum over `population`.
#[derive(Clone, Debug)]
pub struct FrequencyDependentInfection {
    pub transition: TransitionId,
    pub infectious: Vec<CompartmentId>,
    pub population: Vec<CompartmentId>,
    pub beta: f64,
}

impl FrequencyDependentInfection {
    /// The policy for [`sir_config`].
    pub fn sir(beta: f64) -> Self {
        Self {
            transition: SIR::INFECTION,
            infectious: vec![SIR::I],
            population: vec![SIR::S, SIR::I, SIR::R],
            beta,
        }
    }

    /// The policy for [`hospital_config`].
    pub fn hospital(beta: f64) -> Self {
        Self {
            transition: HOSPITAL::INFECTION,
            infectious: vec![HOSPITAL::I],
            population: vec![HOSPITAL::S, HOSPITAL::I, HOSPITAL::WARD, HOSPITAL::R],
            beta,
        }
    }
}

impl Policy for FrequencyDependentInfection {
    fn decide(&self, ctx: &mut DecisionContext<'_>) {
        let infectious: u64 = self.infectious.iter().map(|&id| ctx.size(id)).sum();
        let n: u64 = self.population.iter().map(|&id| ctx.size(id)).sum();
        let rate = if n == 0 {
            0.0
        } else {
            self.beta * infectious as f64 / n as f64
        };
        ctx.set_rate(self.transition, rate);
    }
}

/// Turns `slot` on for ticks in `[from, until)` and off otherwise, then
/// runs `inner`.
#[derive(Clone, Debug)]
pub struct ScheduledIntervention<P> {
    pub slot: InterventionId,
    pub from: u64,
    pub until: u64,
    pub inner: P,
}

impl<P: Policy> Policy for ScheduledIntervention<P> {
    fn decide(&self, ctx: &mut DecisionContext<'_>) {
        let t = ctx.tick().0;
        ctx.set_intervention(self.slot, (self.from..self.until).contains(&t));
        self.inner.decide(ctx);
    }
}

/// Rejects the trajectory when the clock reaches `tick`.
#[derive(Clone, Copy, Debug)]
pub struct RejectAt {
    pub tick: u64,
}

impl Policy for RejectAt {
    fn decide(&self, ctx: &mut DecisionContext<'_>) {
        if ctx.tick().0 >= self.tick {
            ctx.reject(format!("rejected at tick {}", self.tick));
        }
    }
}

/// Counts decide calls across every replica it is shared with.
#[derive(Debug, Default)]
pub struct CountingPolicy {
    calls: AtomicUsize,
}

impl CountingPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl Policy for CountingPolicy {
    fn decide(&self, _ctx: &mut DecisionContext<'_>) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }
}
