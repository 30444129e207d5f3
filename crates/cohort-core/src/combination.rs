//! The per-tick intervention on/off vector.

use std::fmt;

use smallvec::SmallVec;

use crate::id::InterventionId;

const WORD_BITS: usize = 64;

/// Fixed-length bit vector with one bit per intervention slot.
///
/// Supplied once per tick by the decision layer. Compared by value:
/// two combinations are equal when they have the same length and the
/// same bits set, which is what the per-compartment gate cache keys on.
///
/// Slot 0 is [`InterventionId::ALWAYS_ON`]. Its bit is set on
/// construction and cannot be cleared.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct InterventionCombination {
    len: usize,
    // Bits at positions >= len are always zero so derived equality is exact.
    words: SmallVec<[u64; 2]>,
}

impl InterventionCombination {
    /// A combination of `len` slots with every intervention switched off
    /// except the always-on slot.
    pub fn all_off(len: usize) -> Self {
        let mut words = SmallVec::new();
        words.resize(len.div_ceil(WORD_BITS), 0);
        let mut combo = Self { len, words };
        combo.force_always_on();
        combo
    }

    /// Build a combination from explicit per-slot values.
    ///
    /// `bits[0]` is ignored: the always-on slot is always set.
    pub fn from_bits(bits: &[bool]) -> Self {
        let mut combo = Self::all_off(bits.len());
        for (i, &on) in bits.iter().enumerate() {
            if on {
                combo.set_raw(i, true);
            }
        }
        combo
    }

    /// Number of intervention slots, including the always-on slot.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the combination has no slots at all.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether `id` is switched on.
    ///
    /// Slots beyond [`len()`](Self::len) read as off.
    pub fn is_on(&self, id: InterventionId) -> bool {
        if id == InterventionId::ALWAYS_ON {
            return true;
        }
        let i = id.index();
        i < self.len && self.words[i / WORD_BITS] & (1u64 << (i % WORD_BITS)) != 0
    }

    /// Switch `id` on or off.
    ///
    /// Returns `false` (and changes nothing) if `id` is out of range.
    /// Clearing the always-on slot is accepted and ignored.
    pub fn set(&mut self, id: InterventionId, on: bool) -> bool {
        let i = id.index();
        if i >= self.len {
            return false;
        }
        if id != InterventionId::ALWAYS_ON {
            self.set_raw(i, on);
        }
        true
    }

    /// Iterate over the slots that are switched on, in ascending order.
    pub fn iter_on(&self) -> impl Iterator<Item = InterventionId> + '_ {
        (0..self.len)
            .map(|i| InterventionId(i as u32))
            .filter(|id| self.is_on(*id))
    }

    /// Number of slots switched on, including the always-on slot.
    pub fn count_on(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    fn set_raw(&mut self, i: usize, on: bool) {
        let mask = 1u64 << (i % WORD_BITS);
        let word = &mut self.words[i / WORD_BITS];
        if on {
            *word |= mask;
        } else {
            *word &= !mask;
        }
    }

    fn force_always_on(&mut self) {
        if self.len > 0 {
            self.set_raw(InterventionId::ALWAYS_ON.index(), true);
        }
    }
}

impl fmt::Debug for InterventionCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InterventionCombination(")?;
        for i in 0..self.len {
            let on = self.is_on(InterventionId(i as u32));
            write!(f, "{}", if on { '1' } else { '0' })?;
        }
        write!(f, ")")
    }
}
