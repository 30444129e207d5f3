//! Validated, immutable model template.
//!
//! A [`Blueprint`] is built once from a [`ModelConfig`] and shared by
//! every replica of a batch (behind an `Arc`). It holds the zero state of
//! every compartment, transition and resource; [`Blueprint::build_replica`]
//! value-clones that state and attaches a fresh random stream.

use cohort_core::{CompartmentId, ConfigError, InterventionCombination, TransitionId};
use cohort_model::{Compartment, ResourceLedger, Transition};
use indexmap::IndexMap;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::{pass_through_order, ModelConfig, SummaryDef};
use crate::replica::Replica;
use crate::trajectory::Trajectory;

/// Immutable zero state of a model plus the derived lookup tables the
/// tick engine needs.
#[derive(Clone, Debug)]
pub struct Blueprint {
    compartments: Vec<Compartment>,
    transitions: Vec<Transition>,
    ledger: ResourceLedger,
    names: IndexMap<String, CompartmentId>,
    eradication: Vec<CompartmentId>,
    pass_through_order: Vec<CompartmentId>,
    summaries: Vec<SummaryDef>,
    intervention_slots: usize,
    dt: f64,
    horizon: u64,
    observation_period: u64,
}

impl Blueprint {
    /// Validate `config` and build the template.
    pub fn new(config: ModelConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut compartments: Vec<Compartment> = config
            .compartments
            .iter()
            .enumerate()
            .map(|(i, def)| Compartment::from_def(CompartmentId(i as u32), def))
            .collect();
        let transitions: Vec<Transition> = config
            .transitions
            .iter()
            .enumerate()
            .map(|(i, def)| Transition::from_def(TransitionId(i as u32), def))
            .collect();
        for t in &transitions {
            // validate() guarantees every source is a Normal compartment.
            compartments[t.source().index()].attach_transition(t.id());
        }

        let names = compartments
            .iter()
            .map(|c| (c.name().to_string(), c.id()))
            .collect();
        let eradication = compartments
            .iter()
            .filter(|c| c.empty_to_eradicate())
            .map(Compartment::id)
            .collect();
        let pass_through_order = pass_through_order(&config.compartments)?;

        Ok(Self {
            compartments,
            transitions,
            ledger: ResourceLedger::new(&config.resources),
            names,
            eradication,
            pass_through_order,
            summaries: config.summaries,
            intervention_slots: config.intervention_slots,
            dt: config.dt,
            horizon: config.horizon,
            observation_period: config.observation_period,
        })
    }

    /// A replica at tick 0, drawing from a stream seeded with `seed`.
    pub fn build_replica(&self, seed: u64) -> Replica {
        Replica {
            compartments: self.compartments.clone(),
            transitions: self.transitions.clone(),
            ledger: self.ledger.clone(),
            combination: InterventionCombination::all_off(self.intervention_slots),
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            tick: Default::default(),
        }
    }

    /// An empty trajectory laid out for this model.
    pub fn new_trajectory(&self) -> Trajectory {
        Trajectory::new(&self.compartments, self.ledger.len(), &self.summaries)
    }

    /// Id of the compartment called `name`.
    pub fn compartment_id(&self, name: &str) -> Option<CompartmentId> {
        self.names.get(name).copied()
    }

    /// Compartment names, in id order.
    pub fn compartment_names(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(String::as_str)
    }

    /// Zero-state compartments.
    pub fn compartments(&self) -> &[Compartment] {
        &self.compartments
    }

    /// Zero-state transitions.
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Number of resources.
    pub fn resource_count(&self) -> usize {
        self.ledger.len()
    }

    /// Compartments that must all be empty for the run to count as
    /// eradicated. Empty if the model never eradicates.
    pub fn eradication_set(&self) -> &[CompartmentId] {
        &self.eradication
    }

    /// Pass-through compartments in resolution order.
    pub fn pass_through_order(&self) -> &[CompartmentId] {
        &self.pass_through_order
    }

    /// Summary series definitions.
    pub fn summaries(&self) -> &[SummaryDef] {
        &self.summaries
    }

    /// Length of the intervention combination.
    pub fn intervention_slots(&self) -> usize {
        self.intervention_slots
    }

    /// Epidemic time per tick.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Tick count after which a run stops.
    pub fn horizon(&self) -> u64 {
        self.horizon
    }

    /// Ticks per observation period in run reports.
    pub fn observation_period(&self) -> u64 {
        self.observation_period
    }
}
