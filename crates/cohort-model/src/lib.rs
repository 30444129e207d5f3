//! Compartment and transition model for cohort simulations.
//!
//! A model is a set of dense arrays: [`Compartment`]s, [`Transition`]s and
//! a [`ResourceLedger`]. Compartments and transitions reference each other
//! by id only. Each compartment resolves its own departures for one tick
//! with [`Compartment::send_out_members`], drawing from a caller-supplied
//! random stream; the engine crate decides when that happens and where the
//! resulting flows land.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod compartment;
pub mod gate;
pub mod ledger;
pub mod sampling;
pub mod transition;

pub use compartment::{Compartment, CompartmentDef, CompartmentKind, Departures, Flow};
pub use gate::ActiveTransitions;
pub use ledger::{Replenishment, ResourceAccount, ResourceDef, ResourceLedger};
pub use transition::{Transition, TransitionDef, TransitionKind};
