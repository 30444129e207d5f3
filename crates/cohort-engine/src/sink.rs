//! Destination of finished run reports.

use std::sync::{Mutex, PoisonError};

use crate::run::RunReport;

/// Statistics collaborator receiving one report per replica.
///
/// Called from worker threads during parallel execution; implementations
/// serialise their own writes.
pub trait StatisticsSink: Send + Sync {
    /// Accept the report of replica `replica` (its index in the batch).
    fn record(&self, replica: usize, report: RunReport);
}

/// Collects reports into replica-indexed slots.
///
/// The slot layout makes the collected order independent of which worker
/// finished first.
#[derive(Debug)]
pub struct ResultsCollector {
    slots: Mutex<Vec<Option<RunReport>>>,
}

impl ResultsCollector {
    /// A collector with `replicas` empty slots.
    pub fn new(replicas: usize) -> Self {
        Self {
            slots: Mutex::new(vec![None; replicas]),
        }
    }

    /// Number of slots filled so far.
    pub fn filled(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.iter().filter(|s| s.is_some()).count()
    }

    /// All slots, in replica order. `None` marks a replica that never
    /// reported.
    pub fn into_slots(self) -> Vec<Option<RunReport>> {
        self.slots
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// All reports in replica order, or the index of the first replica
    /// that never reported.
    pub fn into_reports(self) -> Result<Vec<RunReport>, usize> {
        self.into_slots()
            .into_iter()
            .enumerate()
            .map(|(i, slot)| slot.ok_or(i))
            .collect()
    }
}

impl StatisticsSink for ResultsCollector {
    fn record(&self, replica: usize, report: RunReport) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if replica >= slots.len() {
            slots.resize(replica + 1, None);
        }
        slots[replica] = Some(report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::{RunStatus, StopReason};
    use crate::trajectory::Trajectory;
    use cohort_core::TickId;

    fn report(seed: u64) -> RunReport {
        RunReport {
            seed,
            status: RunStatus::Stopped {
                reason: StopReason::HorizonReached,
                tick: TickId(1),
            },
            trajectory: Trajectory::default(),
            anomalies: Vec::new(),
        }
    }

    #[test]
    fn reports_come_back_in_replica_order() {
        let c = ResultsCollector::new(3);
        c.record(2, report(12));
        c.record(0, report(10));
        c.record(1, report(11));
        assert_eq!(c.filled(), 3);
        let seeds: Vec<u64> = c.into_reports().unwrap().iter().map(|r| r.seed).collect();
        assert_eq!(seeds, vec![10, 11, 12]);
    }

    #[test]
    fn missing_slot_is_reported() {
        let c = ResultsCollector::new(2);
        c.record(0, report(1));
        assert_eq!(c.into_reports(), Err(1));
    }

    #[test]
    fn out_of_range_index_grows_the_slots() {
        let c = ResultsCollector::new(0);
        c.record(1, report(5));
        let slots = c.into_slots();
        assert_eq!(slots.len(), 2);
        assert!(slots[0].is_none());
    }
}
