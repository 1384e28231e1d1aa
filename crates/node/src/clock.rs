//! Wall-clock to slot conversion (spec.md §6: `Clock`). Grounded on the retrieval pack's
//! `SlotClock` trait usage (`slot_clock.slot_of(time)` / `.start_of(slot)`), reduced here to the
//! one query the orchestrator actually needs: "what slot is it right now".

use std::time::{SystemTime, UNIX_EPOCH};

use phase0_ssz::Slot;

pub trait Clock: Send + Sync {
    fn now_slot(&self) -> Slot;
}

/// Derives the current slot from the system clock and a genesis time, per the standard
/// `(now - genesis_time) / seconds_per_slot` beacon-chain slot arithmetic.
pub struct SystemClock {
    genesis_time: u64,
    seconds_per_slot: u64,
}

impl SystemClock {
    pub fn new(genesis_time: u64, seconds_per_slot: u64) -> Self {
        Self {
            genesis_time,
            seconds_per_slot,
        }
    }
}

impl Clock for SystemClock {
    fn now_slot(&self) -> Slot {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(self.genesis_time);
        let elapsed = now.saturating_sub(self.genesis_time);
        Slot::new(elapsed / self.seconds_per_slot.max(1))
    }
}

/// A clock driven explicitly by the caller, for orchestrator tests that need to control slot
/// ticks rather than wait on the system clock.
pub struct ManualClock {
    slot: std::sync::atomic::AtomicU64,
}

impl ManualClock {
    pub fn new(slot: Slot) -> Self {
        Self {
            slot: std::sync::atomic::AtomicU64::new(slot.as_u64()),
        }
    }

    pub fn set(&self, slot: Slot) {
        self.slot.store(slot.as_u64(), std::sync::atomic::Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_slot(&self) -> Slot {
        Slot::new(self.slot.load(std::sync::atomic::Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_reports_the_slot_it_was_set_to() {
        let clock = ManualClock::new(Slot::new(5));
        assert_eq!(clock.now_slot(), Slot::new(5));
        clock.set(Slot::new(9));
        assert_eq!(clock.now_slot(), Slot::new(9));
    }
}
