//! Latest-scan buffer shared between the sampling task and an output task.
//!
//! The producer publishes after each pass; readers copy a [`Snapshot`] out. The critical
//! section covers only the copy, never a bus transaction.

use core::cell::Cell;

use critical_section::Mutex;

use crate::constants::NUM_CHANNELS;
use crate::sample::Scan;
use crate::scheduler::DeadlineMissed;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Most recent pass, `None` if that pass faulted
    pub scan: Option<Scan>,
    /// Incremented on every publish, faulted passes included
    pub sequence: u32,
    pub missed_deadlines: u32,
    pub last_overrun_us: u64,
    pub faults: u32,
}

impl Snapshot {
    const EMPTY: Snapshot = Snapshot {
        scan: None,
        sequence: 0,
        missed_deadlines: 0,
        last_overrun_us: 0,
        faults: 0,
    };
}

pub struct LatestCodes {
    inner: Mutex<Cell<Snapshot>>,
}

impl LatestCodes {
    pub const fn new() -> Self {
        LatestCodes {
            inner: Mutex::new(Cell::new(Snapshot::EMPTY)),
        }
    }

    fn update(&self, f: impl FnOnce(&mut Snapshot)) {
        critical_section::with(|cs| {
            let cell = self.inner.borrow(cs);
            let mut snapshot = cell.get();
            f(&mut snapshot);
            cell.set(snapshot);
        });
    }

    pub fn publish(&self, scan: Scan) {
        self.update(|s| {
            s.scan = Some(scan);
            s.sequence = s.sequence.wrapping_add(1);
        });
    }

    /// Records a faulted pass; readers see no codes rather than the previous ones
    pub fn mark_missing(&self) {
        self.update(|s| {
            s.scan = None;
            s.sequence = s.sequence.wrapping_add(1);
            s.faults = s.faults.wrapping_add(1);
        });
    }

    pub fn record_missed_deadline(&self, missed: DeadlineMissed) {
        self.update(|s| {
            s.missed_deadlines = missed.count;
            s.last_overrun_us = missed.overrun_us;
        });
    }

    pub fn snapshot(&self) -> Snapshot {
        critical_section::with(|cs| self.inner.borrow(cs).get())
    }

    pub fn latest_codes(&self) -> Option<[i16; NUM_CHANNELS]> {
        self.snapshot().scan.map(|scan| scan.codes)
    }
}

impl Default for LatestCodes {
    fn default() -> Self {
        Self::new()
    }
}
