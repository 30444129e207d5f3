//! Scarce-resource bookkeeping.
//!
//! Each [`ResourceAccount`] holds the units currently available for one
//! resource. The tick engine calls [`ResourceLedger::replenish`] once per
//! tick before any resource monitor draws from the ledger; monitors then
//! [`debit`](ResourceLedger::debit) what they serve. Unused units carry
//! over to later ticks.

use cohort_core::{ConfigError, ResourceId};

// Absorbs rounding in `available / per_arrival` (0.3 / 0.1 == 2.999...).
const SERVABLE_EPSILON: f64 = 1e-9;

/// When and how many units a resource receives.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Replenishment {
    /// `quantity` units granted once, on the first tick whose start time is
    /// at or after `first_available`.
    OneTime {
        /// Epidemic time the units become available.
        first_available: f64,
        /// Units granted.
        quantity: f64,
    },
    /// `quantity` units granted at `first_available + k * interval`.
    ///
    /// At most one boundary is granted per tick. When a tick spans several
    /// intervals the schedule falls behind and catches up one interval per
    /// tick.
    Periodic {
        /// Epidemic time of the first grant.
        first_available: f64,
        /// Time between grants. Must be positive.
        interval: f64,
        /// Units per grant.
        quantity: f64,
    },
}

impl Replenishment {
    fn first_available(&self) -> f64 {
        match *self {
            Self::OneTime {
                first_available, ..
            }
            | Self::Periodic {
                first_available, ..
            } => first_available,
        }
    }
}

/// Configuration of one resource.
#[derive(Clone, Debug, PartialEq)]
pub struct ResourceDef {
    /// Human-readable name, unique within a model.
    pub name: String,
    /// Replenishment schedule.
    pub replenishment: Replenishment,
}

impl ResourceDef {
    /// Check the schedule for non-finite or negative values.
    pub fn validate(&self, id: ResourceId) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidResourceSchedule {
            resource: id,
            reason,
        };
        let (first, quantity) = match self.replenishment {
            Replenishment::OneTime {
                first_available,
                quantity,
            } => (first_available, quantity),
            Replenishment::Periodic {
                first_available,
                interval,
                quantity,
            } => {
                if !interval.is_finite() || interval <= 0.0 {
                    return Err(invalid(format!(
                        "interval must be finite and positive, got {interval}"
                    )));
                }
                (first_available, quantity)
            }
        };
        if !first.is_finite() {
            return Err(invalid(format!(
                "first available time must be finite, got {first}"
            )));
        }
        if !quantity.is_finite() || quantity < 0.0 {
            return Err(invalid(format!(
                "quantity must be finite and >= 0, got {quantity}"
            )));
        }
        Ok(())
    }
}

/// Replica-owned state of one resource.
#[derive(Clone, Debug, PartialEq)]
pub struct ResourceAccount {
    id: ResourceId,
    name: String,
    replenishment: Replenishment,
    units_available: f64,
    next_grant_time: f64,
    ever_replenished: bool,
    consumed_this_tick: f64,
    consumed_total: f64,
}

impl ResourceAccount {
    /// Zero state of a resource: nothing available until the first grant.
    pub fn from_def(id: ResourceId, def: &ResourceDef) -> Self {
        Self {
            id,
            name: def.name.clone(),
            replenishment: def.replenishment,
            units_available: 0.0,
            next_grant_time: def.replenishment.first_available(),
            ever_replenished: false,
            consumed_this_tick: 0.0,
            consumed_total: 0.0,
        }
    }

    /// This resource's id.
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Resource name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Units currently available.
    pub fn units_available(&self) -> f64 {
        self.units_available
    }

    /// Whether any grant has happened yet.
    pub fn ever_replenished(&self) -> bool {
        self.ever_replenished
    }

    /// Units debited during the current tick.
    pub fn consumed_this_tick(&self) -> f64 {
        self.consumed_this_tick
    }

    /// Units debited since tick 0.
    pub fn consumed_total(&self) -> f64 {
        self.consumed_total
    }

    /// Apply the schedule at epidemic time `now`. Returns the units granted.
    pub fn replenish(&mut self, now: f64) -> f64 {
        match self.replenishment {
            Replenishment::OneTime { quantity, .. } => {
                if self.ever_replenished || now < self.next_grant_time {
                    return 0.0;
                }
                self.units_available += quantity;
                self.ever_replenished = true;
                quantity
            }
            Replenishment::Periodic {
                interval, quantity, ..
            } => {
                if now < self.next_grant_time {
                    return 0.0;
                }
                self.units_available += quantity;
                self.next_grant_time += interval;
                self.ever_replenished = true;
                quantity
            }
        }
    }

    /// How many arrivals the available units can serve at `per_arrival`
    /// units each. A non-positive consumption serves everyone.
    pub fn servable(&self, per_arrival: f64) -> u64 {
        if per_arrival <= 0.0 {
            return u64::MAX;
        }
        let slots = (self.units_available / per_arrival + SERVABLE_EPSILON).floor();
        if slots <= 0.0 {
            0
        } else {
            slots as u64
        }
    }

    /// Remove `units` from the available pool, never going below zero.
    pub fn debit(&mut self, units: f64) {
        if units <= 0.0 {
            return;
        }
        let taken = units.min(self.units_available);
        self.units_available -= taken;
        self.consumed_this_tick += taken;
        self.consumed_total += taken;
    }

    /// Zero the per-tick consumption counter.
    pub fn reset_tick_accumulators(&mut self) {
        self.consumed_this_tick = 0.0;
    }

    /// Return to the zero state: no units, schedule rewound.
    pub fn reset(&mut self) {
        self.units_available = 0.0;
        self.next_grant_time = self.replenishment.first_available();
        self.ever_replenished = false;
        self.consumed_this_tick = 0.0;
        self.consumed_total = 0.0;
    }
}

/// All resource accounts of a replica, indexed by [`ResourceId`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResourceLedger {
    accounts: Vec<ResourceAccount>,
}

impl ResourceLedger {
    /// Build the zero-state ledger. `ResourceId(n)` is `defs[n]`.
    pub fn new(defs: &[ResourceDef]) -> Self {
        let accounts = defs
            .iter()
            .enumerate()
            .map(|(i, d)| ResourceAccount::from_def(ResourceId(i as u32), d))
            .collect();
        Self { accounts }
    }

    /// Apply every schedule at epidemic time `now`. Returns the total
    /// units granted across resources.
    pub fn replenish(&mut self, now: f64) -> f64 {
        self.accounts.iter_mut().map(|a| a.replenish(now)).sum()
    }

    /// Account for `id`, if it exists.
    pub fn get(&self, id: ResourceId) -> Option<&ResourceAccount> {
        self.accounts.get(id.index())
    }

    /// Units available for `id` (0 for an unknown id).
    pub fn available(&self, id: ResourceId) -> f64 {
        self.get(id).map_or(0.0, ResourceAccount::units_available)
    }

    /// Arrivals servable from `id` at `per_arrival` units each
    /// (0 for an unknown id).
    pub fn servable(&self, id: ResourceId, per_arrival: f64) -> u64 {
        self.get(id).map_or(0, |a| a.servable(per_arrival))
    }

    /// Debit `units` from `id`. Unknown ids are ignored.
    pub fn debit(&mut self, id: ResourceId, units: f64) {
        if let Some(account) = self.accounts.get_mut(id.index()) {
            account.debit(units);
        }
    }

    /// Zero every per-tick consumption counter.
    pub fn reset_tick_accumulators(&mut self) {
        for a in &mut self.accounts {
            a.reset_tick_accumulators();
        }
    }

    /// Rewind every account to its zero state.
    pub fn reset(&mut self) {
        for a in &mut self.accounts {
            a.reset();
        }
    }

    /// All accounts, in id order.
    pub fn accounts(&self) -> &[ResourceAccount] {
        &self.accounts
    }

    /// Number of resources.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Whether the ledger tracks no resources.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}
