//! Cohort quickstart: an SEIR outbreak with a bed-limited hospital and a
//! prevalence-triggered lockdown.
//!
//! Demonstrates:
//!   1. Defining compartments, transitions and a periodic resource
//!   2. Validating a ModelConfig into a Blueprint
//!   3. Writing a Policy that sets a force of infection and toggles an
//!      intervention slot
//!   4. Stepping one replica tick by tick
//!   5. Replicating on a worker pool and reading the collected reports
//!
//! Run with:
//!   cargo run --example quickstart

use std::sync::Arc;

use cohort_core::{CompartmentId, InterventionId, ResourceId, TransitionId};
use cohort_engine::{
    Blueprint, Coordinator, DecisionContext, ModelConfig, Policy, ReplicationConfig,
    ResultsCollector, SeedPlan, SummaryDef, TickEngine,
};
use cohort_model::{CompartmentDef, Replenishment, ResourceDef, TransitionDef, TransitionKind};

// ─── Compartment IDs ────────────────────────────────────────────

const S: CompartmentId = CompartmentId(0);
const E: CompartmentId = CompartmentId(1);
const I: CompartmentId = CompartmentId(2);
const R: CompartmentId = CompartmentId(3);
const SEVERITY: CompartmentId = CompartmentId(4);
const ADMISSION: CompartmentId = CompartmentId(5);
const WARD: CompartmentId = CompartmentId(6);
const TURNED_AWAY: CompartmentId = CompartmentId(7);

const INFECTION: TransitionId = TransitionId(0);
const BEDS: ResourceId = ResourceId(0);
const LOCKDOWN: InterventionId = InterventionId(1);

// ─── Epidemic parameters ────────────────────────────────────────

const BETA: f64 = 0.35;
const LOCKDOWN_FACTOR: f64 = 0.4;
const LOCKDOWN_ON: f64 = 0.01;
const LOCKDOWN_OFF: f64 = 0.002;

fn model() -> ModelConfig {
    let independent = TransitionKind::EpidemicIndependent;
    ModelConfig {
        compartments: vec![
            CompartmentDef::normal("S", 99_900),
            CompartmentDef::normal("E", 0),
            CompartmentDef::eradication_target("I", 100),
            CompartmentDef::normal("R", 0),
            CompartmentDef::Splitting {
                name: "severity".into(),
                probability: 0.04,
                on_success: ADMISSION,
                on_failure: R,
            },
            CompartmentDef::ResourceMonitor {
                name: "admission".into(),
                resource: BEDS,
                consumption_per_arrival: 1.0,
                on_served: WARD,
                on_unserved: TURNED_AWAY,
            },
            CompartmentDef::normal("ward", 0),
            CompartmentDef::death("turned away"),
        ],
        transitions: vec![
            TransitionDef::new(S, TransitionKind::EpidemicDependent, E, 0.0),
            TransitionDef::new(E, independent, I, 0.2),
            TransitionDef::new(I, independent, SEVERITY, 0.14),
            TransitionDef::new(WARD, independent, R, 0.1),
            // Under lockdown some exposed people clear before turning infectious.
            TransitionDef::new(E, independent, R, 0.05).gated_on(LOCKDOWN),
        ],
        resources: vec![ResourceDef {
            name: "beds".into(),
            replenishment: Replenishment::Periodic {
                first_available: 0.0,
                interval: 1.0,
                quantity: 15.0,
            },
        }],
        intervention_slots: 2,
        dt: 0.25,
        horizon: 4 * 365,
        summaries: vec![
            SummaryDef::size("prevalence", vec![E, I]),
            SummaryDef::new_members("turned away", vec![TURNED_AWAY]),
        ],
        observation_period: 4,
    }
}

// ─── Policy ─────────────────────────────────────────────────────
//
// Frequency-dependent infection, reduced while the lockdown slot is on.
// The lockdown switches on above LOCKDOWN_ON prevalence and off below
// LOCKDOWN_OFF, so the decision only depends on state the replica carries.

struct LockdownPolicy;

impl Policy for LockdownPolicy {
    fn decide(&self, ctx: &mut DecisionContext<'_>) {
        let alive = ctx.size(S) + ctx.size(E) + ctx.size(I) + ctx.size(R) + ctx.size(WARD);
        if alive == 0 {
            return;
        }
        let prevalence = ctx.size(I) as f64 / alive as f64;
        let locked = ctx.combination().is_on(LOCKDOWN);
        if !locked && prevalence > LOCKDOWN_ON {
            ctx.set_intervention(LOCKDOWN, true);
        } else if locked && prevalence < LOCKDOWN_OFF {
            ctx.set_intervention(LOCKDOWN, false);
        }
        let factor = if ctx.combination().is_on(LOCKDOWN) {
            LOCKDOWN_FACTOR
        } else {
            1.0
        };
        ctx.set_rate(INFECTION, BETA * factor * prevalence);
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    let blueprint = Arc::new(Blueprint::new(model()).expect("model is valid"));

    // ── One replica, tick by tick ──
    println!("--- single replica ---");
    let mut engine = TickEngine::new(Arc::clone(&blueprint), 2024);
    while let Ok(report) = engine.execute_tick(&LockdownPolicy) {
        let t = report.tick.0;
        if t % 40 == 0 {
            println!(
                "  day {:>5.1}: S={:>6} I={:>5} ward={:>4} beds left={:>5.1}",
                report.tick.time(blueprint.dt()),
                engine.replica().size(S),
                engine.replica().size(I),
                engine.replica().size(WARD),
                engine.replica().ledger().available(BEDS),
            );
        }
        if let Some(status) = report.status {
            println!("  stopped: {status}");
        }
    }

    // ── Many replicas on a worker pool ──
    println!("--- 32 replicas ---");
    let coordinator = Coordinator::new(Arc::clone(&blueprint), Arc::new(LockdownPolicy));
    let batch = ReplicationConfig {
        replicas: 32,
        seeds: SeedPlan::Sequential { base: 1 },
        max_concurrency: None,
    };
    let sink = ResultsCollector::new(batch.replicas);
    let summary = coordinator.run(&batch, &sink).expect("replication failed");
    println!(
        "  eradicated {} / horizon {} / rejected {}",
        summary.eradicated, summary.horizon_reached, summary.rejected
    );

    let reports = sink.into_reports().expect("every replica reports");
    let turned_away: Vec<u64> = reports
        .iter()
        .map(|r| r.trajectory.final_size(TURNED_AWAY).unwrap_or(0))
        .collect();
    let mean = turned_away.iter().sum::<u64>() as f64 / turned_away.len() as f64;
    println!("  mean turned away: {mean:.1}");
    println!(
        "  max turned away:  {}",
        turned_away.iter().max().copied().unwrap_or(0)
    );
}
