//! Per-tick counters for the tick engine.
//!
//! [`TickMetrics`] captures timing and flow totals for a single tick.
//! The engine fills one after every tick; callers read the most recent
//! one from [`TickEngine::last_metrics`](crate::TickEngine::last_metrics)
//! or from the returned [`TickReport`](crate::TickReport).

/// Timing and flow counters collected during a single tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickMetrics {
    /// Wall-clock time for the entire tick, in microseconds.
    pub total_us: u64,
    /// Members that left Normal compartments through competing hazards.
    pub departures: u64,
    /// Members added by birth transitions.
    pub births: u64,
    /// Members forwarded by Splitting and ResourceMonitor compartments.
    pub pass_through_arrivals: u64,
    /// Resource units debited by resource monitors.
    pub units_consumed: f64,
    /// Resource units granted by replenishment.
    pub units_replenished: f64,
    /// Sampling anomalies reported during the tick.
    pub anomalies: u32,
    /// Normal compartments whose active transition set was recomputed.
    pub gate_recomputes: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = TickMetrics::default();
        assert_eq!(m.total_us, 0);
        assert_eq!(m.departures, 0);
        assert_eq!(m.births, 0);
        assert_eq!(m.pass_through_arrivals, 0);
        assert_eq!(m.units_consumed, 0.0);
        assert_eq!(m.units_replenished, 0.0);
        assert_eq!(m.anomalies, 0);
        assert_eq!(m.gate_recomputes, 0);
    }
}
