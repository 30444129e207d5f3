//! Core types for the cohort compartmental simulator.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the abstractions shared by the model and engine crates: dense
//! identifiers, the per-tick [`InterventionCombination`], and the
//! configuration and sampling diagnostic types.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod combination;
pub mod error;
pub mod id;

pub use combination::InterventionCombination;
pub use error::{AnomalyKind, ConfigError, SamplingAnomaly};
pub use id::{CompartmentId, InterventionId, ResourceId, TickId, TransitionId};
