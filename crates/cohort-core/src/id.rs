//! Strongly-typed dense identifiers.
//!
//! Compartments, transitions and resources live in flat arrays owned by a
//! replica; an identifier is the index of its element in that array.
//! Nodes refer to each other only through these ids, never by reference,
//! which keeps a replica a plain value that can be cloned and moved to a
//! worker thread.

use std::fmt;

macro_rules! dense_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            /// Position of the identified element in its owning array.
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u32> for $name {
            fn from(v: u32) -> Self {
                Self(v)
            }
        }
    };
}

dense_id! {
    /// Identifies a compartment within a model.
    ///
    /// `CompartmentId(n)` corresponds to the n-th compartment in the model
    /// configuration.
    CompartmentId
}

dense_id! {
    /// Identifies a transition within a model.
    ///
    /// Transitions are numbered globally across all source compartments in
    /// configuration order.
    TransitionId
}

dense_id! {
    /// Identifies a scarce resource tracked by the resource ledger.
    ResourceId
}

dense_id! {
    /// Identifies an intervention slot in an
    /// [`InterventionCombination`](crate::InterventionCombination).
    InterventionId
}

impl InterventionId {
    /// Reserved slot for unconditional transitions.
    ///
    /// A transition gated on this slot is eligible under every
    /// combination, whatever the stored bit says.
    pub const ALWAYS_ON: InterventionId = InterventionId(0);
}

/// Monotonically increasing tick counter.
///
/// Tick 0 is the zero state of a replica; the first executed step
/// produces tick 1.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TickId(pub u64);

impl TickId {
    /// The tick following this one.
    #[inline]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Epidemic time after this many ticks of length `dt`.
    #[inline]
    pub fn time(self, dt: f64) -> f64 {
        self.0 as f64 * dt
    }
}

impl fmt::Display for TickId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TickId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}
