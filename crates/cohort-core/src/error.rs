//! Error and diagnostic types shared across the cohort workspace.
//!
//! [`ConfigError`] covers everything detected while a model blueprint is
//! built; it is fatal and never retried. [`SamplingAnomaly`] is not an
//! error: it reports a drawn count that fell outside its legal range and
//! was clamped so the run could continue.

use std::error::Error;
use std::fmt;

use crate::id::{CompartmentId, InterventionId, ResourceId, TransitionId};

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected while validating a model configuration.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// The model has no compartments.
    NoCompartments,
    /// The step length is NaN, infinite, zero, or negative.
    InvalidDt {
        /// The invalid value.
        value: f64,
    },
    /// The horizon tick index is zero, so no tick could ever execute.
    ZeroHorizon,
    /// The model declares no intervention slots (slot 0 is mandatory).
    NoInterventionSlots,
    /// The observation period is zero ticks long.
    ZeroObservationPeriod,
    /// Two compartments, resources or summary series share a name.
    DuplicateName {
        /// The repeated name.
        name: String,
    },
    /// A compartment id does not refer to a configured compartment.
    UnknownCompartment {
        /// Where the dangling id was found.
        referenced_by: String,
        /// The dangling id.
        id: CompartmentId,
    },
    /// A resource monitor refers to a resource that was never defined.
    UnknownResource {
        /// The monitor compartment.
        compartment: CompartmentId,
        /// The dangling resource id.
        resource: ResourceId,
    },
    /// A transition is gated on an intervention slot that does not exist.
    UnknownIntervention {
        /// The offending transition.
        transition: TransitionId,
        /// The requested slot.
        intervention: InterventionId,
        /// Number of configured slots.
        slots: usize,
    },
    /// A transition originates from a compartment that cannot own
    /// transitions (only Normal compartments can).
    InvalidSource {
        /// The offending transition.
        transition: TransitionId,
        /// The non-Normal source compartment.
        source: CompartmentId,
    },
    /// A transition rate is NaN, infinite, or negative.
    InvalidRate {
        /// The offending transition.
        transition: TransitionId,
        /// The invalid value.
        value: f64,
    },
    /// A splitting probability lies outside `[0, 1]`.
    InvalidProbability {
        /// The splitting compartment.
        compartment: CompartmentId,
        /// The invalid value.
        value: f64,
    },
    /// A resource consumption per arrival is NaN, infinite, or negative.
    InvalidConsumption {
        /// The resource monitor compartment.
        compartment: CompartmentId,
        /// The invalid value.
        value: f64,
    },
    /// A resource replenishment schedule is malformed.
    InvalidResourceSchedule {
        /// The offending resource.
        resource: ResourceId,
        /// Which part of the schedule is invalid.
        reason: String,
    },
    /// Splitting and resource monitor compartments forward arrivals within
    /// the same tick, so a loop made only of them would never drain.
    PassThroughCycle {
        /// A compartment on the cycle.
        compartment: CompartmentId,
    },
    /// A summary series sums over no compartments.
    EmptySummary {
        /// Name of the series.
        name: String,
    },
    /// More elements than a `u32` id can address.
    CountOverflow {
        /// What overflowed ("compartments", "transitions", ...).
        what: &'static str,
        /// The count that overflowed.
        value: usize,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCompartments => write!(f, "model has no compartments"),
            Self::InvalidDt { value } => {
                write!(f, "dt must be finite and positive, got {value}")
            }
            Self::ZeroHorizon => write!(f, "horizon must be at least one tick"),
            Self::NoInterventionSlots => {
                write!(f, "at least one intervention slot (always-on) is required")
            }
            Self::ZeroObservationPeriod => {
                write!(f, "observation period must be at least one tick")
            }
            Self::DuplicateName { name } => write!(f, "duplicate name '{name}'"),
            Self::UnknownCompartment { referenced_by, id } => {
                write!(f, "{referenced_by} refers to unknown compartment {id}")
            }
            Self::UnknownResource {
                compartment,
                resource,
            } => write!(
                f,
                "compartment {compartment} monitors unknown resource {resource}"
            ),
            Self::UnknownIntervention {
                transition,
                intervention,
                slots,
            } => write!(
                f,
                "transition {transition} is gated on intervention {intervention}, \
                 but only {slots} slots are configured"
            ),
            Self::InvalidSource { transition, source } => write!(
                f,
                "transition {transition} originates from compartment {source}, \
                 which is not a normal compartment"
            ),
            Self::InvalidRate { transition, value } => write!(
                f,
                "transition {transition} rate must be finite and >= 0, got {value}"
            ),
            Self::InvalidProbability { compartment, value } => write!(
                f,
                "compartment {compartment} probability must be in [0, 1], got {value}"
            ),
            Self::InvalidConsumption { compartment, value } => write!(
                f,
                "compartment {compartment} consumption must be finite and >= 0, got {value}"
            ),
            Self::InvalidResourceSchedule { resource, reason } => {
                write!(f, "resource {resource}: {reason}")
            }
            Self::PassThroughCycle { compartment } => write!(
                f,
                "pass-through compartments form a cycle through compartment {compartment}"
            ),
            Self::EmptySummary { name } => {
                write!(f, "summary series '{name}' has no compartments")
            }
            Self::CountOverflow { what, value } => {
                write!(f, "{what} count {value} exceeds u32::MAX")
            }
        }
    }
}

impl Error for ConfigError {}

// ── SamplingAnomaly ────────────────────────────────────────────────

/// Which draw produced an out-of-range count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnomalyKind {
    /// A competing-hazards departure count exceeded the members available.
    Departure,
    /// A splitting success count exceeded the members available.
    Split,
}

/// A sampled count that fell outside `[0, bound]` and was clamped to 0.
///
/// Unreachable with a correct sampler. Reported instead of being dropped
/// so a broken distribution implementation is visible to the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SamplingAnomaly {
    /// What was being sampled.
    pub kind: AnomalyKind,
    /// Compartment whose members were being resolved.
    pub compartment: CompartmentId,
    /// Transition the count was drawn for, if any.
    pub transition: Option<TransitionId>,
    /// The raw drawn count.
    pub drawn: u64,
    /// The largest legal value (the members at tick start).
    pub bound: u64,
}

impl fmt::Display for SamplingAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} draw of {} exceeds {} members in compartment {}",
            self.kind, self.drawn, self.bound, self.compartment
        )?;
        if let Some(t) = self.transition {
            write!(f, " (transition {t})")?;
        }
        Ok(())
    }
}
