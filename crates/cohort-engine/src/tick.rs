//! Tick engine: the single-threaded loop driving one replica.
//!
//! [`TickEngine`] owns a [`Replica`] and advances it one tick at a time.
//! Each tick walks a fixed sequence of [`TickStage`]s:
//!
//! 1. the [`Policy`] sets the combination and rates (or rejects the run),
//! 2. resources are replenished for the tick's start time,
//! 3. every Normal compartment refreshes its active transitions,
//! 4. every Normal compartment samples departures against its size at
//!    tick start; flows are buffered, not applied,
//! 5. buffered inflows are applied, then pass-through compartments are
//!    drained in routing order so they end the tick empty.
//!
//! After step 5 the engine records the trajectory and checks the
//! terminal conditions: eradication first, then the horizon.

use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use cohort_core::{SamplingAnomaly, TickId};
use cohort_model::{CompartmentKind, Departures};
use tracing::{debug, warn};

use crate::blueprint::Blueprint;
use crate::metrics::TickMetrics;
use crate::policy::{DecisionContext, Policy};
use crate::replica::Replica;
use crate::run::{RunReport, RunStatus, StopReason};
use crate::trajectory::Trajectory;

// ── TickStage ────────────────────────────────────────────────────

/// Position of the engine within a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TickStage {
    /// Between ticks.
    Idle,
    /// Resource schedules applied.
    ResourceReplenished,
    /// Active transition sets brought in line with the combination.
    TransitionsRefreshed,
    /// Every Normal compartment has drawn its departures.
    DeparturesSampled,
    /// Buffered inflows landed and pass-through compartments drained.
    InflowsApplied,
}

// ── TickReport / TickError ───────────────────────────────────────

/// Result of a successful tick execution.
#[derive(Clone, Debug, PartialEq)]
pub struct TickReport {
    /// The tick that ran.
    pub tick: TickId,
    /// Draws clamped to 0 during the tick.
    pub anomalies: Vec<SamplingAnomaly>,
    /// Counters for the tick.
    pub metrics: TickMetrics,
    /// Terminal status, if this tick ended the run.
    pub status: Option<RunStatus>,
}

/// Error returned from [`TickEngine::execute_tick()`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TickError {
    /// The policy rejected the trajectory; the tick did not run.
    Rejected {
        /// The tick that would have run.
        tick: TickId,
        /// Reason given by the policy.
        reason: String,
    },
    /// The run already reached a terminal status. Call
    /// [`TickEngine::reset`] to start over.
    Stopped {
        /// The terminal status.
        status: RunStatus,
    },
}

impl fmt::Display for TickError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected { tick, reason } => {
                write!(f, "trajectory rejected before tick {tick}: {reason}")
            }
            Self::Stopped { status } => write!(f, "run already stopped: {status}"),
        }
    }
}

impl Error for TickError {}

// ── TickEngine ───────────────────────────────────────────────────

/// Single-threaded engine for one replica.
///
/// Reusable across runs: [`reset`](Self::reset) rewinds the replica and
/// the recorded series without reallocating the model state.
pub struct TickEngine {
    blueprint: Arc<Blueprint>,
    replica: Replica,
    stage: TickStage,
    status: Option<RunStatus>,
    trajectory: Trajectory,
    anomalies: Vec<(TickId, SamplingAnomaly)>,
    inflows: Vec<u64>,
    departures: Departures,
    last_metrics: TickMetrics,
}

impl TickEngine {
    /// An engine at tick 0 whose replica draws from `seed`.
    pub fn new(blueprint: Arc<Blueprint>, seed: u64) -> Self {
        let replica = blueprint.build_replica(seed);
        let trajectory = blueprint.new_trajectory();
        let inflows = vec![0; blueprint.compartments().len()];
        Self {
            blueprint,
            replica,
            stage: TickStage::Idle,
            status: None,
            trajectory,
            anomalies: Vec::new(),
            inflows,
            departures: Departures::default(),
            last_metrics: TickMetrics::default(),
        }
    }

    /// Rewind to tick 0 with a new seed.
    pub fn reset(&mut self, seed: u64) {
        self.replica.reset(seed);
        self.stage = TickStage::Idle;
        self.status = None;
        self.trajectory.clear();
        self.anomalies.clear();
        self.last_metrics = TickMetrics::default();
    }

    /// Execute one tick.
    ///
    /// # Errors
    ///
    /// [`TickError::Rejected`] if the policy rejects the trajectory (the
    /// run is then stopped), [`TickError::Stopped`] if the run had already
    /// stopped.
    pub fn execute_tick(&mut self, policy: &dyn Policy) -> Result<TickReport, TickError> {
        if let Some(status) = &self.status {
            return Err(TickError::Stopped {
                status: status.clone(),
            });
        }
        let start = Instant::now();
        let Self {
            blueprint,
            replica,
            stage,
            status,
            trajectory,
            anomalies: run_anomalies,
            inflows,
            departures,
            last_metrics,
        } = self;
        let blueprint = &**blueprint;
        let tick = replica.tick;
        let dt = blueprint.dt();

        // 0. Decision layer sees the state left by the previous tick.
        let mut ctx = DecisionContext::new(
            tick,
            blueprint,
            &replica.compartments,
            &replica.ledger,
            &mut replica.transitions,
            &mut replica.combination,
        );
        policy.decide(&mut ctx);
        if let Some(reason) = ctx.into_rejection() {
            debug!(tick = tick.0, seed = replica.seed, %reason, "trajectory rejected");
            *status = Some(RunStatus::Rejected {
                tick,
                reason: reason.clone(),
            });
            return Err(TickError::Rejected { tick, reason });
        }

        let mut metrics = TickMetrics::default();
        let mut tick_anomalies = Vec::new();
        for c in &mut replica.compartments {
            c.reset_tick_accumulators();
        }
        for t in &mut replica.transitions {
            t.reset_tick_accumulators();
        }
        replica.ledger.reset_tick_accumulators();

        // 1. Resources.
        metrics.units_replenished = replica.ledger.replenish(tick.time(dt));
        *stage = TickStage::ResourceReplenished;

        // 2. Gates.
        for c in &mut replica.compartments {
            if c.refresh_active_transitions(&replica.combination, &replica.transitions) {
                metrics.gate_recomputes += 1;
            }
        }
        *stage = TickStage::TransitionsRefreshed;

        // 3. Departures, against tick-start sizes.
        inflows.fill(0);
        for c in &mut replica.compartments {
            if !matches!(c.kind(), CompartmentKind::Normal { .. }) {
                continue;
            }
            c.send_out_members(
                &mut replica.transitions,
                &mut replica.ledger,
                dt,
                &mut replica.rng,
                departures,
            );
            for flow in &departures.flows {
                inflows[flow.destination.index()] += flow.count;
            }
            metrics.departures += departures.departed;
            metrics.births += departures.born;
            tick_anomalies.append(&mut departures.anomalies);
        }
        *stage = TickStage::DeparturesSampled;

        // 4. Inflows, then pass-through drain.
        for (c, &n) in replica.compartments.iter_mut().zip(inflows.iter()) {
            c.add_members(n);
        }
        for &id in blueprint.pass_through_order() {
            replica.compartments[id.index()].send_out_members(
                &mut replica.transitions,
                &mut replica.ledger,
                dt,
                &mut replica.rng,
                departures,
            );
            metrics.pass_through_arrivals += departures.departed;
            tick_anomalies.append(&mut departures.anomalies);
            for flow in &departures.flows {
                replica.compartments[flow.destination.index()].add_members(flow.count);
            }
        }
        metrics.units_consumed = replica
            .ledger
            .accounts()
            .iter()
            .map(|a| a.consumed_this_tick())
            .sum();
        *stage = TickStage::InflowsApplied;

        record_anomalies(tick, replica.seed, &tick_anomalies, run_anomalies);
        trajectory.record(&replica.compartments, &replica.ledger);
        replica.tick = tick.next();

        // 5. Terminal conditions.
        let eradication = blueprint.eradication_set();
        let reason = if !eradication.is_empty()
            && eradication
                .iter()
                .all(|id| replica.compartments[id.index()].members() == 0)
        {
            Some(StopReason::Eradicated)
        } else if replica.tick.0 >= blueprint.horizon() {
            Some(StopReason::HorizonReached)
        } else {
            None
        };
        let terminal = reason.map(|reason| RunStatus::Stopped {
            reason,
            tick: replica.tick,
        });
        if let Some(s) = &terminal {
            debug!(seed = replica.seed, status = %s, "run stopped");
            *status = Some(s.clone());
        }

        metrics.anomalies = u32::try_from(tick_anomalies.len()).unwrap_or(u32::MAX);
        metrics.total_us = start.elapsed().as_micros() as u64;
        *last_metrics = metrics.clone();
        *stage = TickStage::Idle;

        Ok(TickReport {
            tick,
            anomalies: tick_anomalies,
            metrics,
            status: terminal,
        })
    }

    /// Execute ticks until the run stops, then build its report.
    ///
    /// The trajectory in the report is folded into the blueprint's
    /// observation periods.
    pub fn run(&mut self, policy: &dyn Policy) -> RunReport {
        let status = loop {
            match self.execute_tick(policy) {
                Ok(TickReport {
                    status: Some(status),
                    ..
                }) => break status,
                Ok(_) => {}
                Err(TickError::Rejected { tick, reason }) => {
                    break RunStatus::Rejected { tick, reason }
                }
                Err(TickError::Stopped { status }) => break status,
            }
        };
        RunReport {
            seed: self.replica.seed(),
            status,
            trajectory: self.trajectory.aggregate(self.blueprint.observation_period()),
            anomalies: self.anomalies.clone(),
        }
    }

    /// The shared template.
    pub fn blueprint(&self) -> &Arc<Blueprint> {
        &self.blueprint
    }

    /// The replica being driven.
    pub fn replica(&self) -> &Replica {
        &self.replica
    }

    /// Current stage. Always [`TickStage::Idle`] between calls.
    pub fn stage(&self) -> TickStage {
        self.stage
    }

    /// Terminal status, once the run has stopped.
    pub fn status(&self) -> Option<&RunStatus> {
        self.status.as_ref()
    }

    /// Ticks executed so far.
    pub fn current_tick(&self) -> TickId {
        self.replica.tick
    }

    /// Per-tick series recorded so far.
    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    /// Anomalies recorded so far.
    pub fn anomalies(&self) -> &[(TickId, SamplingAnomaly)] {
        &self.anomalies
    }

    /// Counters of the most recent tick.
    pub fn last_metrics(&self) -> &TickMetrics {
        &self.last_metrics
    }
}

/// Log each of a tick's anomalies and append them, tagged with `tick`,
/// to the run's list.
fn record_anomalies(
    tick: TickId,
    seed: u64,
    anomalies: &[SamplingAnomaly],
    run: &mut Vec<(TickId, SamplingAnomaly)>,
) {
    for a in anomalies {
        warn!(
            tick = tick.0,
            seed,
            anomaly = %a,
            "sampling anomaly clamped to zero"
        );
        run.push((tick, a.clone()));
    }
}

impl fmt::Debug for TickEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickEngine")
            .field("seed", &self.replica.seed())
            .field("tick", &self.replica.tick)
            .field("stage", &self.stage)
            .field("status", &self.status)
            .field("compartments", &self.replica.compartments.len())
            .field("transitions", &self.replica.transitions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Baseline;
    use crate::ModelConfig;
    use cohort_core::{CompartmentId, InterventionId, ResourceId};
    use cohort_model::{CompartmentDef, Replenishment, ResourceDef, TransitionDef, TransitionKind};

    #[test]
    fn anomalies_are_tagged_with_their_tick() {
        use cohort_core::{AnomalyKind, SamplingAnomaly};

        let anomaly = |drawn| SamplingAnomaly {
            kind: AnomalyKind::Split,
            compartment: CompartmentId(2),
            transition: None,
            drawn,
            bound: 4,
        };
        let mut run = vec![(TickId(1), anomaly(5))];
        record_anomalies(TickId(6), 9, &[anomaly(7), anomaly(8)], &mut run);
        assert_eq!(
            run,
            vec![
                (TickId(1), anomaly(5)),
                (TickId(6), anomaly(7)),
                (TickId(6), anomaly(8)),
            ]
        );
        record_anomalies(TickId(7), 9, &[], &mut run);
        assert_eq!(run.len(), 3);
    }

    fn engine(config: ModelConfig, seed: u64) -> TickEngine {
        TickEngine::new(Arc::new(Blueprint::new(config).unwrap()), seed)
    }

    fn leave(from: u32, to: u32, rate: f64) -> TransitionDef {
        TransitionDef::new(
            CompartmentId(from),
            TransitionKind::EpidemicIndependent,
            CompartmentId(to),
            rate,
        )
    }

    #[test]
    fn eradication_stops_on_first_empty_tick() {
        let mut e = engine(
            ModelConfig {
                compartments: vec![
                    CompartmentDef::eradication_target("I", 50),
                    CompartmentDef::death("D"),
                ],
                transitions: vec![leave(0, 1, 2.0)],
                dt: 0.5,
                horizon: 1_000,
                ..ModelConfig::default()
            },
            11,
        );
        let report = e.run(&Baseline);
        assert_eq!(report.status.stop_reason(), Some(StopReason::Eradicated));
        let sizes = report.trajectory.sizes(CompartmentId(0));
        assert_eq!(report.status.tick().0 as usize, sizes.len());
        assert_eq!(sizes.last(), Some(&0));
        assert!(sizes[..sizes.len() - 1].iter().all(|&n| n > 0));
        let died: u64 = report.trajectory.new_members(CompartmentId(1)).iter().sum();
        assert_eq!(died, 50);
    }

    #[test]
    fn horizon_stops_after_exactly_horizon_ticks() {
        let mut e = engine(
            ModelConfig {
                compartments: vec![CompartmentDef::normal("S", 10)],
                horizon: 5,
                ..ModelConfig::default()
            },
            0,
        );
        let report = e.run(&Baseline);
        assert_eq!(
            report.status,
            RunStatus::Stopped {
                reason: StopReason::HorizonReached,
                tick: TickId(5)
            }
        );
        assert_eq!(report.trajectory.len(), 5);
        assert!(matches!(
            e.execute_tick(&Baseline),
            Err(TickError::Stopped { .. })
        ));
    }

    #[test]
    fn departures_use_tick_start_sizes() {
        // A -> B -> C, both hazards large enough to empty their source.
        let mut e = engine(
            ModelConfig {
                compartments: vec![
                    CompartmentDef::normal("A", 100),
                    CompartmentDef::normal("B", 0),
                    CompartmentDef::normal("C", 0),
                ],
                transitions: vec![leave(0, 1, 60.0), leave(1, 2, 60.0)],
                horizon: 3,
                ..ModelConfig::default()
            },
            5,
        );
        e.execute_tick(&Baseline).unwrap();
        let r = e.replica();
        assert_eq!(r.size(CompartmentId(0)), 0);
        assert_eq!(r.size(CompartmentId(1)), 100);
        assert_eq!(r.size(CompartmentId(2)), 0);
        e.execute_tick(&Baseline).unwrap();
        assert_eq!(e.replica().size(CompartmentId(2)), 100);
    }

    #[test]
    fn pass_through_compartments_end_each_tick_empty() {
        let mut e = engine(
            ModelConfig {
                compartments: vec![
                    CompartmentDef::normal("S", 200),
                    CompartmentDef::Splitting {
                        name: "severity".into(),
                        probability: 0.5,
                        on_success: CompartmentId(2),
                        on_failure: CompartmentId(3),
                    },
                    CompartmentDef::ResourceMonitor {
                        name: "admission".into(),
                        resource: ResourceId(0),
                        consumption_per_arrival: 1.0,
                        on_served: CompartmentId(4),
                        on_unserved: CompartmentId(5),
                    },
                    CompartmentDef::normal("Mild", 0),
                    CompartmentDef::normal("Ward", 0),
                    CompartmentDef::death("Turned away"),
                ],
                transitions: vec![leave(0, 1, 1.0)],
                resources: vec![ResourceDef {
                    name: "beds".into(),
                    replenishment: Replenishment::OneTime {
                        first_available: 0.0,
                        quantity: 10.0,
                    },
                }],
                dt: 0.5,
                horizon: 10,
                ..ModelConfig::default()
            },
            21,
        );
        let mut turned_away = 0;
        for _ in 0..10 {
            let report = e.execute_tick(&Baseline).unwrap();
            let r = e.replica();
            assert_eq!(r.size(CompartmentId(1)), 0);
            assert_eq!(r.size(CompartmentId(2)), 0);
            turned_away += r.compartments()[5].new_members_this_tick();
            assert_eq!(
                r.total_members() + turned_away,
                200,
                "members lost in tick {}",
                report.tick
            );
            assert!(report.anomalies.is_empty());
        }
        assert!(e.replica().size(CompartmentId(4)) <= 10);
        assert!(e.replica().ledger().available(ResourceId(0)) >= 0.0);
    }

    #[test]
    fn rejection_stops_the_run() {
        let mut e = engine(
            ModelConfig {
                compartments: vec![CompartmentDef::normal("S", 10)],
                horizon: 100,
                ..ModelConfig::default()
            },
            0,
        );
        let policy = |ctx: &mut DecisionContext<'_>| {
            if ctx.tick().0 == 3 {
                ctx.reject("calibration target missed");
            }
        };
        let report = e.run(&policy);
        assert_eq!(
            report.status,
            RunStatus::Rejected {
                tick: TickId(3),
                reason: "calibration target missed".into()
            }
        );
        assert_eq!(report.trajectory.len(), 3);
    }

    #[test]
    fn same_seed_same_trajectory() {
        let config = ModelConfig {
            compartments: vec![
                CompartmentDef::normal("S", 500),
                CompartmentDef::eradication_target("I", 20),
                CompartmentDef::normal("R", 0),
            ],
            transitions: vec![leave(0, 1, 0.05), leave(1, 2, 0.2)],
            dt: 0.5,
            horizon: 200,
            ..ModelConfig::default()
        };
        let a = engine(config.clone(), 77).run(&Baseline);
        let b = engine(config.clone(), 77).run(&Baseline);
        let c = engine(config, 78).run(&Baseline);
        assert_eq!(a, b);
        assert_ne!(a.trajectory, c.trajectory);
    }

    #[test]
    fn reset_replays_the_same_run() {
        let config = ModelConfig {
            compartments: vec![CompartmentDef::normal("S", 300), CompartmentDef::normal("R", 0)],
            transitions: vec![leave(0, 1, 0.1)],
            horizon: 20,
            ..ModelConfig::default()
        };
        let mut e = engine(config, 4);
        let first = e.run(&Baseline);
        e.reset(4);
        assert_eq!(e.current_tick(), TickId(0));
        assert!(e.trajectory().is_empty());
        let second = e.run(&Baseline);
        assert_eq!(first, second);
    }

    #[test]
    fn gate_recomputes_only_when_combination_changes() {
        let config = ModelConfig {
            compartments: vec![CompartmentDef::normal("S", 100), CompartmentDef::normal("Q", 0)],
            transitions: vec![leave(0, 1, 0.5).gated_on(InterventionId(1))],
            intervention_slots: 2,
            horizon: 10,
            ..ModelConfig::default()
        };
        let mut e = engine(config, 9);
        let lockdown_from_tick_3 = |ctx: &mut DecisionContext<'_>| {
            let on = ctx.tick().0 >= 3;
            ctx.set_intervention(InterventionId(1), on);
        };
        let recomputes: Vec<u32> = (0..6)
            .map(|_| {
                e.execute_tick(&lockdown_from_tick_3)
                    .unwrap()
                    .metrics
                    .gate_recomputes
            })
            .collect();
        // Two Normal compartments refresh on tick 0 and again on tick 3.
        assert_eq!(recomputes, vec![2, 0, 0, 2, 0, 0]);
        let moved: u64 = e.trajectory().new_members(CompartmentId(1))[..3].iter().sum();
        assert_eq!(moved, 0);
    }

    #[test]
    fn births_grow_the_population() {
        let config = ModelConfig {
            compartments: vec![CompartmentDef::normal("S", 1_000)],
            transitions: vec![TransitionDef::new(
                CompartmentId(0),
                TransitionKind::Birth,
                CompartmentId(0),
                0.5,
            )],
            dt: 0.1,
            horizon: 10,
            ..ModelConfig::default()
        };
        let mut e = engine(config, 2);
        let report = e.execute_tick(&Baseline).unwrap();
        assert!(report.metrics.births > 0);
        assert_eq!(report.metrics.departures, 0);
        assert_eq!(e.replica().size(CompartmentId(0)), 1_000 + report.metrics.births);
    }

    #[test]
    fn observation_period_folds_the_report() {
        let config = ModelConfig {
            compartments: vec![CompartmentDef::normal("S", 10)],
            horizon: 10,
            observation_period: 4,
            ..ModelConfig::default()
        };
        let report = engine(config, 0).run(&Baseline);
        assert_eq!(report.trajectory.period(), 4);
        assert_eq!(report.trajectory.len(), 3);
    }
}
