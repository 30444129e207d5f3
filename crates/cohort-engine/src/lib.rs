//! Tick engine and replication coordinator for cohort simulations.
//!
//! A [`ModelConfig`] is validated once into an immutable [`Blueprint`].
//! A [`TickEngine`] drives one [`Replica`] of the blueprint tick by tick,
//! consulting a [`Policy`] before every tick, and produces a
//! [`RunReport`]. The [`Coordinator`] runs many replicas, sequentially or
//! on a worker pool, and hands their reports to a [`StatisticsSink`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod blueprint;
pub mod config;
pub mod coordinator;
pub mod metrics;
pub mod policy;
pub mod replica;
pub mod run;
pub mod seeds;
pub mod sink;
pub mod tick;
pub mod trajectory;

pub use blueprint::Blueprint;
pub use config::{ModelConfig, ReplicationConfig, SummaryDef, SummaryMeasure};
pub use coordinator::{Coordinator, ReplicationError, ReplicationSummary};
pub use metrics::TickMetrics;
pub use policy::{Baseline, DecisionContext, Policy};
pub use replica::Replica;
pub use run::{RunReport, RunStatus, StopReason};
pub use seeds::SeedPlan;
pub use sink::{ResultsCollector, StatisticsSink};
pub use tick::{TickEngine, TickError, TickReport, TickStage};
pub use trajectory::{SummarySeries, Trajectory};
