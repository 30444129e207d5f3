//! Outcome of one replica run.

use std::fmt;

use cohort_core::{SamplingAnomaly, TickId};

use crate::trajectory::Trajectory;

/// Why a run stopped normally.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// Every eradication-target compartment reached zero.
    Eradicated,
    /// The horizon tick was reached.
    HorizonReached,
}

/// Terminal status of a run.
///
/// `tick` is the replica clock when the run stopped, which equals the
/// number of ticks executed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunStatus {
    /// The run reached a terminal condition.
    Stopped {
        /// Which condition.
        reason: StopReason,
        /// Clock at the stop.
        tick: TickId,
    },
    /// The policy rejected the trajectory before a tick.
    Rejected {
        /// Clock at the rejection; that tick never ran.
        tick: TickId,
        /// Reason given by the policy.
        reason: String,
    },
}

impl RunStatus {
    /// Clock value at the stop.
    pub fn tick(&self) -> TickId {
        match self {
            Self::Stopped { tick, .. } | Self::Rejected { tick, .. } => *tick,
        }
    }

    /// Stop reason, if the run was not rejected.
    pub fn stop_reason(&self) -> Option<StopReason> {
        match self {
            Self::Stopped { reason, .. } => Some(*reason),
            Self::Rejected { .. } => None,
        }
    }

    /// Whether the policy rejected the run.
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped { reason, tick } => write!(f, "{reason:?} at tick {tick}"),
            Self::Rejected { tick, reason } => write!(f, "rejected at tick {tick}: {reason}"),
        }
    }
}

/// Everything a statistics sink receives about one run.
#[derive(Clone, Debug, PartialEq)]
pub struct RunReport {
    /// Seed of the replica's random stream.
    pub seed: u64,
    /// How the run ended.
    pub status: RunStatus,
    /// Recorded series, folded into observation periods.
    pub trajectory: Trajectory,
    /// Every clamped draw, tagged with the tick it occurred in.
    pub anomalies: Vec<(TickId, SamplingAnomaly)>,
}
