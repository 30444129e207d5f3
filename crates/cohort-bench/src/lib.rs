//! Benchmark profiles for the cohort simulator.
//!
//! Provides pre-built [`ModelConfig`] profiles for benchmarking:
//!
//! - [`reference_profile`]: SEIR with births, deaths and a bed-limited
//!   hospital pathway (11 compartments, one million people)
//! - [`stress_profile`]: a chain of `stages` infectious stages, each with
//!   three competing exits
//! - [`SeirPolicy`]: the frequency-dependent force of infection both
//!   profiles expect

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use cohort_core::{CompartmentId, ResourceId, TransitionId};
use cohort_engine::{DecisionContext, ModelConfig, Policy, SummaryDef};
use cohort_model::{CompartmentDef, Replenishment, ResourceDef, TransitionDef, TransitionKind};

const S: CompartmentId = CompartmentId(0);

/// Reference profile: one million people, SEIR with a hospital pathway.
///
/// S -> E -> I -> {R, severity split}; severe cases ask for a bed
/// (one unit per admission, 200 beds per day) and are turned away into a
/// death compartment without one. Births feed S, background mortality
/// drains S and R. dt = 0.1 days, horizon 3650 ticks.
pub fn reference_profile() -> ModelConfig {
    let (e, i, r) = (CompartmentId(1), CompartmentId(2), CompartmentId(3));
    let (severity, admission, ward) = (CompartmentId(4), CompartmentId(5), CompartmentId(6));
    let (turned_away, dead) = (CompartmentId(7), CompartmentId(8));
    let independent = TransitionKind::EpidemicIndependent;
    ModelConfig {
        compartments: vec![
            CompartmentDef::normal("S", 999_000),
            CompartmentDef::normal("E", 500),
            CompartmentDef::eradication_target("I", 500),
            CompartmentDef::normal("R", 0),
            CompartmentDef::Splitting {
                name: "severity".into(),
                probability: 0.05,
                on_success: admission,
                on_failure: r,
            },
            CompartmentDef::ResourceMonitor {
                name: "admission".into(),
                resource: ResourceId(0),
                consumption_per_arrival: 1.0,
                on_served: ward,
                on_unserved: turned_away,
            },
            CompartmentDef::normal("ward", 0),
            CompartmentDef::death("turned away"),
            CompartmentDef::death("dead"),
        ],
        transitions: vec![
            TransitionDef::new(S, TransitionKind::EpidemicDependent, e, 0.0),
            TransitionDef::new(e, independent, i, 0.2),
            TransitionDef::new(i, independent, severity, 0.1),
            TransitionDef::new(ward, independent, r, 0.07),
            TransitionDef::new(S, TransitionKind::Birth, S, 3.5e-5),
            TransitionDef::new(S, independent, dead, 3.5e-5),
            TransitionDef::new(r, independent, dead, 3.5e-5),
        ],
        resources: vec![ResourceDef {
            name: "beds".into(),
            replenishment: Replenishment::Periodic {
                first_available: 0.0,
                interval: 1.0,
                quantity: 200.0,
            },
        }],
        dt: 0.1,
        horizon: 3_650,
        summaries: vec![
            SummaryDef::size("prevalence", vec![e, i]),
            SummaryDef::new_members("admissions", vec![ward]),
        ],
        ..ModelConfig::default()
    }
}

/// Stress profile: S followed by `stages` infectious stages.
///
/// Every stage has three competing exits (progress, recover, die), so
/// each tick samples `stages` three-way multinomials. Stage 0 is the
/// eradication target.
pub fn stress_profile(stages: usize) -> ModelConfig {
    let stages = stages.max(1);
    let r = CompartmentId(stages as u32 + 1);
    let dead = CompartmentId(stages as u32 + 2);
    let mut compartments = vec![CompartmentDef::normal("S", 10_000_000)];
    for k in 0..stages {
        let seeded = if k == 0 { 1_000 } else { 0 };
        if k == 0 {
            compartments.push(CompartmentDef::eradication_target("I0", seeded));
        } else {
            compartments.push(CompartmentDef::normal(format!("I{k}"), seeded));
        }
    }
    compartments.push(CompartmentDef::normal("R", 0));
    compartments.push(CompartmentDef::death("dead"));

    let independent = TransitionKind::EpidemicIndependent;
    let mut transitions = vec![TransitionDef::new(
        S,
        TransitionKind::EpidemicDependent,
        CompartmentId(1),
        0.0,
    )];
    for k in 0..stages {
        let here = CompartmentId(k as u32 + 1);
        let next = if k + 1 < stages {
            CompartmentId(k as u32 + 2)
        } else {
            r
        };
        transitions.push(TransitionDef::new(here, independent, next, 0.3));
        transitions.push(TransitionDef::new(here, independent, r, 0.05));
        transitions.push(TransitionDef::new(here, independent, dead, 0.001));
    }

    ModelConfig {
        compartments,
        transitions,
        dt: 0.05,
        horizon: 2_000,
        ..ModelConfig::default()
    }
}

/// Force of infection for the bench profiles: `beta * I / N`, with `I`
/// every compartment in `infectious` and `N` every non-death
/// compartment holding members.
#[derive(Clone, Debug)]
pub struct SeirPolicy {
    /// Transmission rate.
    pub beta: f64,
    /// Infectious compartments.
    pub infectious: Vec<CompartmentId>,
}

impl SeirPolicy {
    /// Policy for [`reference_profile`].
    pub fn reference(beta: f64) -> Self {
        Self {
            beta,
            infectious: vec![CompartmentId(2)],
        }
    }

    /// Policy for [`stress_profile`] with `stages` stages.
    pub fn stress(beta: f64, stages: usize) -> Self {
        Self {
            beta,
            infectious: (1..=stages.max(1) as u32).map(CompartmentId).collect(),
        }
    }
}

impl Policy for SeirPolicy {
    fn decide(&self, ctx: &mut DecisionContext<'_>) {
        let infectious: u64 = self.infectious.iter().map(|&id| ctx.size(id)).sum();
        let n: u64 = ctx
            .compartments()
            .iter()
            .filter(|c| !matches!(c.kind(), cohort_model::CompartmentKind::Death))
            .map(|c| c.members())
            .sum();
        let rate = if n == 0 {
            0.0
        } else {
            self.beta * infectious as f64 / n as f64
        };
        ctx.set_rate(TransitionId(0), rate);
    }
}
