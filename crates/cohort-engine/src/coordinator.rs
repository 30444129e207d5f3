//! Replication coordinator: many independent replicas of one blueprint.
//!
//! [`Coordinator`] resolves a seed per replica, runs every replica to a
//! terminal status with its own [`TickEngine`], and hands each
//! [`RunReport`](crate::RunReport) to a [`StatisticsSink`].
//!
//! Execution is either sequential on the calling thread or parallel on a
//! scoped worker pool. Workers pull `(replica index, seed)` jobs from a
//! crossbeam channel and reuse one engine each, resetting it between
//! jobs. A replica's report depends only on its seed, so both modes
//! produce identical reports for the same configuration.

use std::fmt;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::Receiver;
use tracing::{debug, info, info_span};

use crate::blueprint::Blueprint;
use crate::config::ReplicationConfig;
use crate::policy::Policy;
use crate::run::{RunStatus, StopReason};
use crate::sink::StatisticsSink;
use crate::tick::TickEngine;

// ── Error type ──────────────────────────────────────────────────

/// Error from a replication batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplicationError {
    /// The batch asks for zero replicas.
    NoReplicas,
    /// A prespecified seed list is shorter than the batch.
    TooFewSeeds {
        /// Replicas requested.
        needed: usize,
        /// Seeds supplied.
        given: usize,
    },
    /// Weighted seed resampling cannot be set up.
    InvalidWeights {
        /// Human-readable description of what's wrong.
        reason: String,
    },
    /// A worker thread could not be spawned.
    WorkerSpawnFailed {
        /// The OS error.
        reason: String,
    },
    /// A worker thread panicked; some replicas may not have reported.
    WorkerPanicked {
        /// Index of the worker.
        worker: usize,
    },
}

impl fmt::Display for ReplicationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoReplicas => write!(f, "replication batch has no replicas"),
            Self::TooFewSeeds { needed, given } => {
                write!(f, "{needed} replicas but only {given} prespecified seeds")
            }
            Self::InvalidWeights { reason } => write!(f, "invalid seed weights: {reason}"),
            Self::WorkerSpawnFailed { reason } => {
                write!(f, "worker thread spawn failed: {reason}")
            }
            Self::WorkerPanicked { worker } => write!(f, "worker {worker} panicked"),
        }
    }
}

impl std::error::Error for ReplicationError {}

// ── ReplicationSummary ──────────────────────────────────────────

/// Outcome counts of a batch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReplicationSummary {
    /// Replicas that reported.
    pub replicas: usize,
    /// Replicas that stopped with [`StopReason::Eradicated`].
    pub eradicated: usize,
    /// Replicas that stopped with [`StopReason::HorizonReached`].
    pub horizon_reached: usize,
    /// Replicas rejected by the policy.
    pub rejected: usize,
    /// Sampling anomalies across all replicas.
    pub anomalies: usize,
    /// Ticks executed across all replicas.
    pub ticks: u64,
}

impl ReplicationSummary {
    fn add(&mut self, status: &RunStatus, anomalies: usize) {
        self.replicas += 1;
        self.anomalies += anomalies;
        self.ticks += status.tick().0;
        match status.stop_reason() {
            Some(StopReason::Eradicated) => self.eradicated += 1,
            Some(StopReason::HorizonReached) => self.horizon_reached += 1,
            None => self.rejected += 1,
        }
    }

    fn merge(&mut self, other: &Self) {
        self.replicas += other.replicas;
        self.eradicated += other.eradicated;
        self.horizon_reached += other.horizon_reached;
        self.rejected += other.rejected;
        self.anomalies += other.anomalies;
        self.ticks += other.ticks;
    }
}

// ── Coordinator ─────────────────────────────────────────────────

/// Runs batches of replicas of one blueprint under one policy.
pub struct Coordinator {
    blueprint: Arc<Blueprint>,
    policy: Arc<dyn Policy>,
}

impl Coordinator {
    /// A coordinator sharing `blueprint` and `policy` across replicas.
    pub fn new(blueprint: Arc<Blueprint>, policy: Arc<dyn Policy>) -> Self {
        Self { blueprint, policy }
    }

    /// The shared blueprint.
    pub fn blueprint(&self) -> &Arc<Blueprint> {
        &self.blueprint
    }

    /// Run the batch, in parallel unless it resolves to one worker.
    pub fn run(
        &self,
        config: &ReplicationConfig,
        sink: &dyn StatisticsSink,
    ) -> Result<ReplicationSummary, ReplicationError> {
        if config.resolved_worker_count() <= 1 {
            self.run_sequential(config, sink)
        } else {
            self.run_parallel(config, sink)
        }
    }

    /// Run every replica on the calling thread, in replica order.
    pub fn run_sequential(
        &self,
        config: &ReplicationConfig,
        sink: &dyn StatisticsSink,
    ) -> Result<ReplicationSummary, ReplicationError> {
        let seeds = self.seeds(config)?;
        info!(replicas = seeds.len(), workers = 1, "replication started");
        let mut engine = TickEngine::new(Arc::clone(&self.blueprint), seeds[0]);
        let mut summary = ReplicationSummary::default();
        for (index, &seed) in seeds.iter().enumerate() {
            run_one(&mut engine, &*self.policy, index, seed, sink, &mut summary);
        }
        log_finished(&summary);
        Ok(summary)
    }

    /// Run the batch on a scoped pool of
    /// [`resolved_worker_count`](ReplicationConfig::resolved_worker_count)
    /// threads.
    pub fn run_parallel(
        &self,
        config: &ReplicationConfig,
        sink: &dyn StatisticsSink,
    ) -> Result<ReplicationSummary, ReplicationError> {
        let seeds = self.seeds(config)?;
        let workers = config.resolved_worker_count().min(seeds.len());
        info!(replicas = seeds.len(), workers, "replication started");

        let (job_tx, job_rx) = crossbeam_channel::unbounded();
        for job in seeds.iter().copied().enumerate() {
            // The receiver is alive until the end of this function.
            let _ = job_tx.send(job);
        }
        drop(job_tx);

        let blueprint = &self.blueprint;
        let policy = &*self.policy;
        let mut summary = ReplicationSummary::default();
        let mut first_error = None;

        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(workers);
            for worker in 0..workers {
                let job_rx = job_rx.clone();
                let spawned = thread::Builder::new()
                    .name(format!("cohort-replica-{worker}"))
                    .spawn_scoped(scope, move || worker_loop(job_rx, blueprint, policy, sink));
                match spawned {
                    Ok(handle) => handles.push((worker, handle)),
                    Err(e) => {
                        first_error.get_or_insert(ReplicationError::WorkerSpawnFailed {
                            reason: e.to_string(),
                        });
                        break;
                    }
                }
            }
            for (worker, handle) in handles {
                match handle.join() {
                    Ok(partial) => summary.merge(&partial),
                    Err(_) => {
                        first_error.get_or_insert(ReplicationError::WorkerPanicked { worker });
                    }
                }
            }
        });

        if let Some(e) = first_error {
            return Err(e);
        }
        log_finished(&summary);
        Ok(summary)
    }

    fn seeds(&self, config: &ReplicationConfig) -> Result<Vec<u64>, ReplicationError> {
        if config.replicas == 0 {
            return Err(ReplicationError::NoReplicas);
        }
        config.seeds.resolve(config.replicas)
    }
}

impl fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("compartments", &self.blueprint.compartments().len())
            .field("horizon", &self.blueprint.horizon())
            .finish_non_exhaustive()
    }
}

/// Main loop of a pool worker. Runs until the job channel is drained.
fn worker_loop(
    job_rx: Receiver<(usize, u64)>,
    blueprint: &Arc<Blueprint>,
    policy: &dyn Policy,
    sink: &dyn StatisticsSink,
) -> ReplicationSummary {
    let mut summary = ReplicationSummary::default();
    let mut engine: Option<TickEngine> = None;
    while let Ok((index, seed)) = job_rx.recv() {
        let engine = engine.get_or_insert_with(|| TickEngine::new(Arc::clone(blueprint), seed));
        run_one(engine, policy, index, seed, sink, &mut summary);
    }
    summary
}

fn run_one(
    engine: &mut TickEngine,
    policy: &dyn Policy,
    index: usize,
    seed: u64,
    sink: &dyn StatisticsSink,
    summary: &mut ReplicationSummary,
) {
    let _span = info_span!("replica", index, seed).entered();
    engine.reset(seed);
    let report = engine.run(policy);
    debug!(status = %report.status, anomalies = report.anomalies.len(), "replica finished");
    summary.add(&report.status, report.anomalies.len());
    sink.record(index, report);
}

fn log_finished(summary: &ReplicationSummary) {
    info!(
        replicas = summary.replicas,
        eradicated = summary.eradicated,
        horizon_reached = summary.horizon_reached,
        rejected = summary.rejected,
        anomalies = summary.anomalies,
        "replication finished"
    );
}
