//! Test fixtures for cohort development.
//!
//! Canned model configurations ([`sir_config`], [`hospital_config`]) and
//! small policies for driving them in engine and coordinator tests.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::{
    hospital_config, sir_config, CountingPolicy, FrequencyDependentInfection, RejectAt,
    ScheduledIntervention, HOSPITAL, SIR,
};
