//! Time series recorded over one run.
//!
//! A [`Trajectory`] holds one entry per executed tick for every series:
//! end-of-tick compartment sizes, arrivals per compartment, resource
//! units consumed, and the configured summary series. Entry `k` describes
//! tick `k` (epidemic time `k * dt` to `(k + 1) * dt`).
//!
//! [`Trajectory::aggregate`] folds the per-tick series into observation
//! periods: counts of arrivals and consumption are summed, sizes keep the
//! value at the end of the period.

use cohort_core::{CompartmentId, ResourceId};
use cohort_model::{Compartment, ResourceLedger};
use indexmap::IndexMap;

use crate::config::{SummaryDef, SummaryMeasure};

/// One named summary series.
#[derive(Clone, Debug, PartialEq)]
pub struct SummarySeries {
    /// Compartments summed.
    pub compartments: Vec<CompartmentId>,
    /// What is summed.
    pub measure: SummaryMeasure,
    /// One value per tick (or observation period).
    pub values: Vec<u64>,
}

/// Recorded series of a run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Trajectory {
    period: u64,
    initial_sizes: Vec<u64>,
    sizes: Vec<Vec<u64>>,
    new_members: Vec<Vec<u64>>,
    consumed: Vec<Vec<f64>>,
    summaries: IndexMap<String, SummarySeries>,
}

impl Trajectory {
    /// An empty trajectory sized for the given model.
    pub fn new(compartments: &[Compartment], resources: usize, summaries: &[SummaryDef]) -> Self {
        Self {
            period: 1,
            initial_sizes: compartments.iter().map(Compartment::initial_size).collect(),
            sizes: vec![Vec::new(); compartments.len()],
            new_members: vec![Vec::new(); compartments.len()],
            consumed: vec![Vec::new(); resources],
            summaries: summaries
                .iter()
                .map(|s| {
                    (
                        s.name.clone(),
                        SummarySeries {
                            compartments: s.compartments.clone(),
                            measure: s.measure,
                            values: Vec::new(),
                        },
                    )
                })
                .collect(),
        }
    }

    /// Append the state at the end of a tick.
    pub fn record(&mut self, compartments: &[Compartment], ledger: &ResourceLedger) {
        for (c, (sizes, arrivals)) in compartments
            .iter()
            .zip(self.sizes.iter_mut().zip(self.new_members.iter_mut()))
        {
            sizes.push(c.members());
            arrivals.push(c.new_members_this_tick());
        }
        for (account, series) in ledger.accounts().iter().zip(self.consumed.iter_mut()) {
            series.push(account.consumed_this_tick());
        }
        for series in self.summaries.values_mut() {
            let total: u64 = series
                .compartments
                .iter()
                .map(|id| {
                    let c = &compartments[id.index()];
                    match series.measure {
                        SummaryMeasure::Size => c.members(),
                        SummaryMeasure::NewMembers => c.new_members_this_tick(),
                    }
                })
                .sum();
            series.values.push(total);
        }
    }

    /// Drop every recorded entry, keeping the layout.
    pub fn clear(&mut self) {
        self.period = 1;
        self.sizes.iter_mut().for_each(Vec::clear);
        self.new_members.iter_mut().for_each(Vec::clear);
        self.consumed.iter_mut().for_each(Vec::clear);
        for s in self.summaries.values_mut() {
            s.values.clear();
        }
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.sizes.first().map_or(0, Vec::len)
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ticks per entry (1 unless this trajectory came from
    /// [`aggregate`](Self::aggregate)).
    pub fn period(&self) -> u64 {
        self.period
    }

    /// Compartment sizes before the first tick.
    pub fn initial_sizes(&self) -> &[u64] {
        &self.initial_sizes
    }

    /// End-of-entry sizes of `id`.
    pub fn sizes(&self, id: CompartmentId) -> &[u64] {
        self.sizes.get(id.index()).map(Vec::as_slice).unwrap_or_default()
    }

    /// Arrivals into `id` per entry.
    pub fn new_members(&self, id: CompartmentId) -> &[u64] {
        self.new_members.get(id.index()).map(Vec::as_slice).unwrap_or_default()
    }

    /// Units of `id` consumed per entry.
    pub fn consumed(&self, id: ResourceId) -> &[f64] {
        self.consumed.get(id.index()).map(Vec::as_slice).unwrap_or_default()
    }

    /// Summary series by name.
    pub fn summary(&self, name: &str) -> Option<&SummarySeries> {
        self.summaries.get(name)
    }

    /// All summary series, in configuration order.
    pub fn summaries(&self) -> impl Iterator<Item = (&str, &SummarySeries)> {
        self.summaries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Size of `id` after the last recorded entry.
    pub fn final_size(&self, id: CompartmentId) -> Option<u64> {
        self.sizes(id).last().copied()
    }

    /// Fold entries into periods of `period_ticks` entries each.
    ///
    /// A trailing partial period is kept. `period_ticks <= 1` returns a
    /// clone.
    pub fn aggregate(&self, period_ticks: u64) -> Self {
        if period_ticks <= 1 {
            return self.clone();
        }
        let chunk = usize::try_from(period_ticks).unwrap_or(usize::MAX);
        Self {
            period: self.period.saturating_mul(period_ticks),
            initial_sizes: self.initial_sizes.clone(),
            sizes: self.sizes.iter().map(|s| last_of_each(s, chunk)).collect(),
            new_members: self.new_members.iter().map(|s| sum_of_each(s, chunk)).collect(),
            consumed: self.consumed.iter().map(|s| sum_of_each(s, chunk)).collect(),
            summaries: self
                .summaries
                .iter()
                .map(|(name, s)| {
                    let values = match s.measure {
                        SummaryMeasure::Size => last_of_each(&s.values, chunk),
                        SummaryMeasure::NewMembers => sum_of_each(&s.values, chunk),
                    };
                    (
                        name.clone(),
                        SummarySeries {
                            compartments: s.compartments.clone(),
                            measure: s.measure,
                            values,
                        },
                    )
                })
                .collect(),
        }
    }
}

fn last_of_each(series: &[u64], chunk: usize) -> Vec<u64> {
    series.chunks(chunk).filter_map(|c| c.last().copied()).collect()
}

fn sum_of_each<T: Copy + std::iter::Sum<T>>(series: &[T], chunk: usize) -> Vec<T> {
    series.chunks(chunk).map(|c| c.iter().copied().sum()).collect()
}
