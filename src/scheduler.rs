//! Fixed-period sampling loop.
//!
//! Deadlines advance additively: each one is the previous deadline plus one period, not "now"
//! plus one period, so late iterations do not accumulate phase error. An iteration that ends
//! past its deadline is reported as [`DeadlineMissed`] and the schedule restarts from the
//! completion time; there is no catch-up burst.

use crate::config::Config;
use crate::constants::NUM_CHANNELS;
use crate::driver::Ads8688;
use crate::error::Ads8688Error;
use crate::sample::Scan;
use crate::shared::LatestCodes;
use crate::transport::FrameTransport;

use embedded_hal::delay::DelayNs;

/// Monotonic time source with microsecond resolution
pub trait Clock {
    fn now_us(&mut self) -> u64;

    /// Blocks until `deadline_us`; returns immediately if it already passed
    fn sleep_until_us(&mut self, deadline_us: u64);
}

/// Anything that can produce one pass over all channels
pub trait ScanSource {
    type Error: core::fmt::Debug;

    fn scan(&mut self) -> Result<[i16; NUM_CHANNELS], Self::Error>;
}

impl<T, DELAY> ScanSource for Ads8688<T, DELAY>
where
    T: FrameTransport,
    DELAY: DelayNs,
{
    type Error = Ads8688Error<T::Error>;

    fn scan(&mut self) -> Result<[i16; NUM_CHANNELS], Self::Error> {
        self.scan_all()
    }
}

/// A sampling iteration finished at or after its deadline
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeadlineMissed {
    /// How far past the deadline the iteration finished
    pub overrun_us: u64,
    /// Misses so far, this one included
    pub count: u32,
}

/// What to do once an iteration's work is done
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Wait {
    Sleep { until_us: u64, duration_us: u64 },
    Missed(DeadlineMissed),
}

/// Absolute deadline bookkeeping for a fixed period
#[derive(Clone, Copy, Debug)]
pub struct DeadlineClock {
    period_us: u64,
    deadline_us: u64,
    missed: u32,
}

impl DeadlineClock {
    pub fn new(period_us: u32) -> Self {
        DeadlineClock {
            period_us: period_us.max(1) as u64,
            deadline_us: 0,
            missed: 0,
        }
    }

    /// Anchors the schedule at `now_us`
    pub fn start(&mut self, now_us: u64) {
        self.deadline_us = now_us;
    }

    pub fn deadline_us(&self) -> u64 {
        self.deadline_us
    }

    pub fn period_us(&self) -> u64 {
        self.period_us
    }

    pub fn missed(&self) -> u32 {
        self.missed
    }

    /// Moves the deadline one period forward and decides whether to sleep or report a miss
    pub fn advance(&mut self, now_us: u64) -> Wait {
        self.deadline_us += self.period_us;
        if self.deadline_us > now_us {
            Wait::Sleep {
                until_us: self.deadline_us,
                duration_us: self.deadline_us - now_us,
            }
        } else {
            self.missed = self.missed.wrapping_add(1);
            let missed = DeadlineMissed {
                overrun_us: now_us - self.deadline_us,
                count: self.missed,
            };
            self.deadline_us = now_us;
            Wait::Missed(missed)
        }
    }
}

/// Result of one sampling iteration
#[derive(Clone, Copy, Debug)]
pub struct Tick<E> {
    pub scan: Result<Scan, E>,
    pub missed: Option<DeadlineMissed>,
}

/// Drives a [`ScanSource`] at a fixed period and publishes every pass to a [`LatestCodes`]
pub struct Sampler {
    deadline: DeadlineClock,
    started: bool,
    iterations: u64,
}

impl Sampler {
    pub fn new(period_us: u32) -> Self {
        Sampler {
            deadline: DeadlineClock::new(period_us),
            started: false,
            iterations: 0,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.sample_period_us)
    }

    pub fn deadline(&self) -> &DeadlineClock {
        &self.deadline
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Runs one iteration: scan, publish, then sleep to the next deadline or report a miss.
    ///
    /// A failed scan is published as missing and the loop carries on with the next deadline.
    pub fn step<S, C>(&mut self, source: &mut S, clock: &mut C, shared: &LatestCodes) -> Tick<S::Error>
    where
        S: ScanSource,
        C: Clock,
    {
        let started_us = clock.now_us();
        if !self.started {
            self.deadline.start(started_us);
            self.started = true;
        }
        self.iterations += 1;

        let scan = source.scan().map(|codes| Scan {
            timestamp_us: started_us,
            codes,
        });
        match &scan {
            Ok(scan) => shared.publish(*scan),
            Err(e) => {
                log::warn!("scan {} failed: {:?}", self.iterations, e);
                shared.mark_missing();
            }
        }

        let missed = match self.deadline.advance(clock.now_us()) {
            Wait::Sleep { until_us, .. } => {
                clock.sleep_until_us(until_us);
                None
            }
            Wait::Missed(missed) => {
                log::warn!(
                    "sampling deadline missed by {} us ({} total)",
                    missed.overrun_us,
                    missed.count
                );
                shared.record_missed_deadline(missed);
                Some(missed)
            }
        };

        Tick { scan, missed }
    }

    /// Runs `iterations` steps, handing each result to `on_tick`
    pub fn run_for<S, C, F>(
        &mut self,
        iterations: u64,
        source: &mut S,
        clock: &mut C,
        shared: &LatestCodes,
        mut on_tick: F,
    ) where
        S: ScanSource,
        C: Clock,
        F: FnMut(&Tick<S::Error>),
    {
        for _ in 0..iterations {
            let tick = self.step(source, clock, shared);
            on_tick(&tick);
        }
    }

    /// Samples forever
    pub fn run<S, C, F>(&mut self, source: &mut S, clock: &mut C, shared: &LatestCodes, mut on_tick: F) -> !
    where
        S: ScanSource,
        C: Clock,
        F: FnMut(&Tick<S::Error>),
    {
        loop {
            let tick = self.step(source, clock, shared);
            on_tick(&tick);
        }
    }
}

/// Host clock backed by `std::time::Instant` and `thread::sleep`
#[cfg(feature = "std")]
pub struct StdClock {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl StdClock {
    pub fn new() -> Self {
        StdClock {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Clock for StdClock {
    fn now_us(&mut self) -> u64 {
        self.origin.elapsed().as_micros() as u64
    }

    fn sleep_until_us(&mut self, deadline_us: u64) {
        let now = self.now_us();
        if deadline_us > now {
            std::thread::sleep(std::time::Duration::from_micros(deadline_us - now));
        }
    }
}
