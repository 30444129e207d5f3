//! Model and replication configuration.
//!
//! [`ModelConfig`] is the builder input for a [`Blueprint`](crate::Blueprint).
//! [`validate()`](ModelConfig::validate) checks every structural invariant
//! and returns the first violation; the blueprint constructor calls it
//! before building anything. [`ReplicationConfig`] tells the
//! [`Coordinator`](crate::Coordinator) how many replicas to run, how to
//! seed them, and on how many threads.

use cohort_core::{CompartmentId, ConfigError, ResourceId, TransitionId};
use cohort_model::{CompartmentDef, ResourceDef, TransitionDef};
use indexmap::IndexSet;

use crate::seeds::SeedPlan;

// ── SummaryDef ─────────────────────────────────────────────────────

/// What a summary series sums.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SummaryMeasure {
    /// End-of-tick members (prevalence).
    Size,
    /// Arrivals during the tick (incidence).
    NewMembers,
}

/// A named sum over a set of compartments, recorded every tick.
#[derive(Clone, Debug, PartialEq)]
pub struct SummaryDef {
    /// Series name, unique among summaries.
    pub name: String,
    /// Compartments summed.
    pub compartments: Vec<CompartmentId>,
    /// Quantity summed.
    pub measure: SummaryMeasure,
}

impl SummaryDef {
    /// A summary of end-of-tick sizes.
    pub fn size(name: impl Into<String>, compartments: Vec<CompartmentId>) -> Self {
        Self {
            name: name.into(),
            compartments,
            measure: SummaryMeasure::Size,
        }
    }

    /// A summary of per-tick arrivals.
    pub fn new_members(name: impl Into<String>, compartments: Vec<CompartmentId>) -> Self {
        Self {
            name: name.into(),
            compartments,
            measure: SummaryMeasure::NewMembers,
        }
    }
}

// ── ModelConfig ────────────────────────────────────────────────────

/// Complete description of a compartmental model.
///
/// `CompartmentId(n)` is `compartments[n]`, `TransitionId(n)` is
/// `transitions[n]` and `ResourceId(n)` is `resources[n]`.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelConfig {
    /// Compartments in id order.
    pub compartments: Vec<CompartmentDef>,
    /// Transitions in id order.
    pub transitions: Vec<TransitionDef>,
    /// Scarce resources in id order.
    pub resources: Vec<ResourceDef>,
    /// Length of the per-tick intervention combination. Slot 0 is the
    /// always-on slot, so this is at least 1.
    pub intervention_slots: usize,
    /// Epidemic time per tick.
    pub dt: f64,
    /// Last tick index; a run stops with `HorizonReached` after this many
    /// ticks.
    pub horizon: u64,
    /// Summary series recorded alongside the per-compartment series.
    pub summaries: Vec<SummaryDef>,
    /// Ticks per observation period in run reports. 1 keeps per-tick
    /// resolution.
    pub observation_period: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            compartments: Vec::new(),
            transitions: Vec::new(),
            resources: Vec::new(),
            intervention_slots: 1,
            dt: 1.0,
            horizon: 100,
            summaries: Vec::new(),
            observation_period: 1,
        }
    }
}

impl ModelConfig {
    /// Validate all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 1. Sizes.
        if self.compartments.is_empty() {
            return Err(ConfigError::NoCompartments);
        }
        check_count("compartments", self.compartments.len())?;
        check_count("transitions", self.transitions.len())?;
        check_count("resources", self.resources.len())?;
        check_count("intervention slots", self.intervention_slots)?;

        // 2. Clock and horizon.
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(ConfigError::InvalidDt { value: self.dt });
        }
        if self.horizon == 0 {
            return Err(ConfigError::ZeroHorizon);
        }
        if self.intervention_slots == 0 {
            return Err(ConfigError::NoInterventionSlots);
        }
        if self.observation_period == 0 {
            return Err(ConfigError::ZeroObservationPeriod);
        }

        // 3. Names.
        unique_names(self.compartments.iter().map(CompartmentDef::name))?;
        unique_names(self.resources.iter().map(|r| r.name.as_str()))?;
        unique_names(self.summaries.iter().map(|s| s.name.as_str()))?;

        // 4. Resources.
        for (i, r) in self.resources.iter().enumerate() {
            r.validate(ResourceId(i as u32))?;
        }

        // 5. Compartment parameters and routing.
        for (i, def) in self.compartments.iter().enumerate() {
            self.validate_compartment(CompartmentId(i as u32), def)?;
        }

        // 6. Transitions.
        for (i, t) in self.transitions.iter().enumerate() {
            self.validate_transition(TransitionId(i as u32), t)?;
        }

        // 7. Summaries.
        for s in &self.summaries {
            if s.compartments.is_empty() {
                return Err(ConfigError::EmptySummary {
                    name: s.name.clone(),
                });
            }
            for &id in &s.compartments {
                self.check_compartment(id, || format!("summary '{}'", s.name))?;
            }
        }

        // 8. Pass-through routing must drain.
        pass_through_order(&self.compartments)?;
        Ok(())
    }

    fn check_compartment(
        &self,
        id: CompartmentId,
        referenced_by: impl FnOnce() -> String,
    ) -> Result<(), ConfigError> {
        if id.index() < self.compartments.len() {
            Ok(())
        } else {
            Err(ConfigError::UnknownCompartment {
                referenced_by: referenced_by(),
                id,
            })
        }
    }

    fn validate_compartment(&self, id: CompartmentId, def: &CompartmentDef) -> Result<(), ConfigError> {
        match *def {
            CompartmentDef::Normal { .. } | CompartmentDef::Death { .. } => Ok(()),
            CompartmentDef::Splitting {
                probability,
                on_success,
                on_failure,
                ..
            } => {
                if !(0.0..=1.0).contains(&probability) {
                    return Err(ConfigError::InvalidProbability {
                        compartment: id,
                        value: probability,
                    });
                }
                self.check_compartment(on_success, || format!("compartment {id} success route"))?;
                self.check_compartment(on_failure, || format!("compartment {id} failure route"))
            }
            CompartmentDef::ResourceMonitor {
                resource,
                consumption_per_arrival,
                on_served,
                on_unserved,
                ..
            } => {
                if resource.index() >= self.resources.len() {
                    return Err(ConfigError::UnknownResource {
                        compartment: id,
                        resource,
                    });
                }
                if !consumption_per_arrival.is_finite() || consumption_per_arrival < 0.0 {
                    return Err(ConfigError::InvalidConsumption {
                        compartment: id,
                        value: consumption_per_arrival,
                    });
                }
                self.check_compartment(on_served, || format!("compartment {id} served route"))?;
                self.check_compartment(on_unserved, || format!("compartment {id} unserved route"))
            }
        }
    }

    fn validate_transition(&self, id: TransitionId, t: &TransitionDef) -> Result<(), ConfigError> {
        self.check_compartment(t.source, || format!("transition {id} source"))?;
        self.check_compartment(t.destination, || format!("transition {id} destination"))?;
        if !matches!(
            self.compartments[t.source.index()],
            CompartmentDef::Normal { .. }
        ) {
            return Err(ConfigError::InvalidSource {
                transition: id,
                source: t.source,
            });
        }
        if t.intervention.index() >= self.intervention_slots {
            return Err(ConfigError::UnknownIntervention {
                transition: id,
                intervention: t.intervention,
                slots: self.intervention_slots,
            });
        }
        if !t.rate.is_finite() || t.rate < 0.0 {
            return Err(ConfigError::InvalidRate {
                transition: id,
                value: t.rate,
            });
        }
        Ok(())
    }
}

fn check_count(what: &'static str, value: usize) -> Result<(), ConfigError> {
    if u32::try_from(value).is_err() {
        return Err(ConfigError::CountOverflow { what, value });
    }
    Ok(())
}

fn unique_names<'a>(names: impl Iterator<Item = &'a str>) -> Result<(), ConfigError> {
    let mut seen = IndexSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(ConfigError::DuplicateName {
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

/// Order in which pass-through compartments are resolved during a tick.
///
/// Every pass-through compartment appears after all pass-through
/// compartments that forward into it, so one sweep drains them all.
/// Routes must already be in range.
///
/// # Errors
///
/// [`ConfigError::PassThroughCycle`] if pass-through compartments forward
/// into each other in a loop.
pub(crate) fn pass_through_order(
    compartments: &[CompartmentDef],
) -> Result<Vec<CompartmentId>, ConfigError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        Open,
        Done,
    }

    let is_pass_through =
        |id: CompartmentId| !compartments[id.index()].pass_through_destinations().is_empty();
    let mut marks = vec![Mark::New; compartments.len()];
    let mut post_order = Vec::new();

    for start in (0..compartments.len()).map(|i| CompartmentId(i as u32)) {
        if !is_pass_through(start) || marks[start.index()] != Mark::New {
            continue;
        }
        // Iterative DFS; each frame is (node, next edge index).
        let mut stack = vec![(start, 0usize)];
        marks[start.index()] = Mark::Open;
        while let Some(frame) = stack.last_mut() {
            let (node, edge) = *frame;
            frame.1 += 1;
            let targets = compartments[node.index()].pass_through_destinations();
            if let Some(&next) = targets.get(edge) {
                if !is_pass_through(next) {
                    continue;
                }
                match marks[next.index()] {
                    Mark::Open => {
                        return Err(ConfigError::PassThroughCycle { compartment: next })
                    }
                    Mark::Done => {}
                    Mark::New => {
                        marks[next.index()] = Mark::Open;
                        stack.push((next, 0));
                    }
                }
            } else {
                marks[node.index()] = Mark::Done;
                post_order.push(node);
                stack.pop();
            }
        }
    }
    post_order.reverse();
    Ok(post_order)
}

// ── ReplicationConfig ──────────────────────────────────────────────

/// How the coordinator runs a batch of replicas.
#[derive(Clone, Debug, PartialEq)]
pub struct ReplicationConfig {
    /// Number of replicas. Must be at least 1.
    pub replicas: usize,
    /// Seed assignment.
    pub seeds: SeedPlan,
    /// Worker threads. `None` = auto-detect (`available_parallelism`,
    /// clamped to `[1, 64]`). `Some(1)` runs on the calling thread.
    pub max_concurrency: Option<usize>,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            replicas: 1,
            seeds: SeedPlan::Sequential { base: 0 },
            max_concurrency: None,
        }
    }
}

impl ReplicationConfig {
    /// Resolve the actual worker count, applying auto-detection if `None`.
    ///
    /// Explicit values are clamped to `[1, 64]`. Never more workers than
    /// replicas.
    pub fn resolved_worker_count(&self) -> usize {
        let workers = match self.max_concurrency {
            Some(n) => n.clamp(1, 64),
            None => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
                .clamp(1, 64),
        };
        workers.min(self.replicas.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cohort_core::InterventionId;
    use cohort_model::{Replenishment, TransitionKind};

    fn valid_config() -> ModelConfig {
        ModelConfig {
            compartments: vec![
                CompartmentDef::normal("S", 90),
                CompartmentDef::eradication_target("I", 10),
                CompartmentDef::death("R"),
            ],
            transitions: vec![
                TransitionDef::new(
                    CompartmentId(0),
                    TransitionKind::EpidemicDependent,
                    CompartmentId(1),
                    0.5,
                ),
                TransitionDef::new(
                    CompartmentId(1),
                    TransitionKind::EpidemicIndependent,
                    CompartmentId(2),
                    0.2,
                ),
            ],
            dt: 0.1,
            horizon: 50,
            ..ModelConfig::default()
        }
    }

    fn splitter(name: &str, a: u32, b: u32) -> CompartmentDef {
        CompartmentDef::Splitting {
            name: name.into(),
            probability: 0.5,
            on_success: CompartmentId(a),
            on_failure: CompartmentId(b),
        }
    }

    #[test]
    fn validate_valid_config_succeeds() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn validate_empty_model_fails() {
        let cfg = ModelConfig::default();
        assert_eq!(cfg.validate(), Err(ConfigError::NoCompartments));
    }

    #[test]
    fn validate_invalid_dt_fails() {
        for dt in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let mut cfg = valid_config();
            cfg.dt = dt;
            match cfg.validate() {
                Err(ConfigError::InvalidDt { .. }) => {}
                other => panic!("expected InvalidDt for {dt}, got {other:?}"),
            }
        }
    }

    #[test]
    fn validate_zero_horizon_fails() {
        let mut cfg = valid_config();
        cfg.horizon = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroHorizon));
    }

    #[test]
    fn validate_zero_slots_fails() {
        let mut cfg = valid_config();
        cfg.intervention_slots = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::NoInterventionSlots));
    }

    #[test]
    fn validate_zero_observation_period_fails() {
        let mut cfg = valid_config();
        cfg.observation_period = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroObservationPeriod));
    }

    #[test]
    fn validate_duplicate_name_fails() {
        let mut cfg = valid_config();
        cfg.compartments.push(CompartmentDef::death("S"));
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::DuplicateName { name: "S".into() })
        );
    }

    #[test]
    fn validate_dangling_destination_fails() {
        let mut cfg = valid_config();
        cfg.transitions[1].destination = CompartmentId(7);
        match cfg.validate() {
            Err(ConfigError::UnknownCompartment { id, .. }) => assert_eq!(id, CompartmentId(7)),
            other => panic!("expected UnknownCompartment, got {other:?}"),
        }
    }

    #[test]
    fn validate_transition_from_death_fails() {
        let mut cfg = valid_config();
        cfg.transitions[1].source = CompartmentId(2);
        match cfg.validate() {
            Err(ConfigError::InvalidSource { source, .. }) => assert_eq!(source, CompartmentId(2)),
            other => panic!("expected InvalidSource, got {other:?}"),
        }
    }

    #[test]
    fn validate_intervention_out_of_range_fails() {
        let mut cfg = valid_config();
        cfg.transitions[0].intervention = InterventionId(3);
        cfg.intervention_slots = 2;
        match cfg.validate() {
            Err(ConfigError::UnknownIntervention { slots, .. }) => assert_eq!(slots, 2),
            other => panic!("expected UnknownIntervention, got {other:?}"),
        }
    }

    #[test]
    fn validate_negative_rate_fails() {
        let mut cfg = valid_config();
        cfg.transitions[0].rate = -0.1;
        match cfg.validate() {
            Err(ConfigError::InvalidRate { transition, .. }) => assert_eq!(transition, TransitionId(0)),
            other => panic!("expected InvalidRate, got {other:?}"),
        }
    }

    #[test]
    fn validate_bad_probability_fails() {
        let mut cfg = valid_config();
        cfg.compartments.push(CompartmentDef::Splitting {
            name: "split".into(),
            probability: 1.5,
            on_success: CompartmentId(1),
            on_failure: CompartmentId(2),
        });
        match cfg.validate() {
            Err(ConfigError::InvalidProbability { value, .. }) => assert_eq!(value, 1.5),
            other => panic!("expected InvalidProbability, got {other:?}"),
        }
    }

    #[test]
    fn validate_unknown_resource_fails() {
        let mut cfg = valid_config();
        cfg.compartments.push(CompartmentDef::ResourceMonitor {
            name: "triage".into(),
            resource: ResourceId(0),
            consumption_per_arrival: 1.0,
            on_served: CompartmentId(1),
            on_unserved: CompartmentId(2),
        });
        match cfg.validate() {
            Err(ConfigError::UnknownResource { resource, .. }) => assert_eq!(resource, ResourceId(0)),
            other => panic!("expected UnknownResource, got {other:?}"),
        }
    }

    #[test]
    fn validate_bad_resource_schedule_fails() {
        let mut cfg = valid_config();
        cfg.resources.push(ResourceDef {
            name: "beds".into(),
            replenishment: Replenishment::Periodic {
                first_available: 0.0,
                interval: -1.0,
                quantity: 1.0,
            },
        });
        match cfg.validate() {
            Err(ConfigError::InvalidResourceSchedule { resource, .. }) => {
                assert_eq!(resource, ResourceId(0))
            }
            other => panic!("expected InvalidResourceSchedule, got {other:?}"),
        }
    }

    #[test]
    fn validate_empty_summary_fails() {
        let mut cfg = valid_config();
        cfg.summaries.push(SummaryDef::size("prevalence", Vec::new()));
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::EmptySummary {
                name: "prevalence".into()
            })
        );
    }

    #[test]
    fn validate_pass_through_cycle_fails() {
        let mut cfg = valid_config();
        // 3 -> 4 -> 3
        cfg.compartments.push(splitter("a", 4, 2));
        cfg.compartments.push(splitter("b", 3, 2));
        match cfg.validate() {
            Err(ConfigError::PassThroughCycle { .. }) => {}
            other => panic!("expected PassThroughCycle, got {other:?}"),
        }
    }

    #[test]
    fn pass_through_order_is_topological() {
        // 3 -> 4 -> 5, with 3 also feeding 5 directly.
        let compartments = vec![
            CompartmentDef::normal("S", 1),
            CompartmentDef::normal("A", 0),
            CompartmentDef::normal("B", 0),
            splitter("first", 4, 5),
            splitter("second", 5, 1),
            splitter("third", 1, 2),
        ];
        let order = pass_through_order(&compartments).unwrap();
        let pos = |id: u32| order.iter().position(|c| *c == CompartmentId(id)).unwrap();
        assert_eq!(order.len(), 3);
        assert!(pos(3) < pos(4));
        assert!(pos(4) < pos(5));
    }

    #[test]
    fn resolved_worker_count_clamps() {
        let mut rc = ReplicationConfig {
            replicas: 100,
            max_concurrency: Some(0),
            ..ReplicationConfig::default()
        };
        assert_eq!(rc.resolved_worker_count(), 1);
        rc.max_concurrency = Some(500);
        assert_eq!(rc.resolved_worker_count(), 64);
        rc.replicas = 3;
        assert_eq!(rc.resolved_worker_count(), 3);
        rc.max_concurrency = None;
        let auto = rc.resolved_worker_count();
        assert!((1..=3).contains(&auto));
    }
}
