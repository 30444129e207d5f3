//! Cohort: a stochastic compartmental simulator for epidemic models with
//! policy-driven interventions.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all cohort sub-crates.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use cohort::prelude::*;
//!
//! let s = CompartmentId(0);
//! let i = CompartmentId(1);
//! let r = CompartmentId(2);
//! let config = ModelConfig {
//!     compartments: vec![
//!         CompartmentDef::normal("S", 990),
//!         CompartmentDef::eradication_target("I", 10),
//!         CompartmentDef::normal("R", 0),
//!     ],
//!     transitions: vec![
//!         TransitionDef::new(s, TransitionKind::EpidemicDependent, i, 0.0),
//!         TransitionDef::new(i, TransitionKind::EpidemicIndependent, r, 0.1),
//!     ],
//!     dt: 0.5,
//!     horizon: 400,
//!     ..ModelConfig::default()
//! };
//! let blueprint = Arc::new(Blueprint::new(config).unwrap());
//!
//! // Frequency-dependent force of infection, updated before every tick.
//! let policy = |ctx: &mut DecisionContext<'_>| {
//!     let n = (ctx.size(s) + ctx.size(i) + ctx.size(r)) as f64;
//!     ctx.set_rate(TransitionId(0), 0.3 * ctx.size(i) as f64 / n);
//! };
//!
//! let mut engine = TickEngine::new(blueprint, 7);
//! let report = engine.run(&policy);
//! assert!(report.status.stop_reason().is_some());
//! assert_eq!(
//!     report.trajectory.final_size(s).unwrap()
//!         + report.trajectory.final_size(i).unwrap()
//!         + report.trajectory.final_size(r).unwrap(),
//!     1000
//! );
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `cohort-core` | IDs, intervention combinations, errors |
//! | [`model`] | `cohort-model` | Compartments, transitions, resources, sampling |
//! | [`engine`] | `cohort-engine` | Tick engine, policies, replication |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types and IDs (`cohort-core`).
///
/// Dense identifiers, [`types::InterventionCombination`], and the
/// configuration and sampling diagnostics.
pub use cohort_core as types;

/// Compartment and transition model (`cohort-model`).
///
/// Compartment variants, competing-hazards departures, the
/// [`model::ResourceLedger`] and the binomial/Poisson samplers.
pub use cohort_model as model;

/// Tick engine and replication (`cohort-engine`).
///
/// [`engine::TickEngine`] for a single replica,
/// [`engine::Coordinator`] for batches on a worker pool.
pub use cohort_engine as engine;

/// Common imports for typical cohort usage.
///
/// ```rust
/// use cohort::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use cohort_core::{
        CompartmentId, InterventionCombination, InterventionId, ResourceId, TickId, TransitionId,
    };

    // Errors and diagnostics
    pub use cohort_core::{ConfigError, SamplingAnomaly};

    // Model definitions
    pub use cohort_model::{
        CompartmentDef, Replenishment, ResourceDef, TransitionDef, TransitionKind,
    };

    // Engine
    pub use cohort_engine::{
        Baseline, Blueprint, Coordinator, DecisionContext, ModelConfig, Policy,
        ReplicationConfig, ReplicationError, ReplicationSummary, ResultsCollector, RunReport,
        RunStatus, SeedPlan, StatisticsSink, StopReason, SummaryDef, TickEngine, TickError,
        Trajectory,
    };
}
