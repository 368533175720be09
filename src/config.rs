use crate::constants::{Range, ScanMode, NUM_CHANNELS};

/// Acquisition settings: per-channel input range, scan strategy and sampling period
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    pub ranges: [Range; NUM_CHANNELS],
    pub scan_mode: ScanMode,
    pub sample_period_us: u32,
}

impl Config {
    /// 1 kHz sampling
    pub const DEFAULT_SAMPLE_PERIOD_US: u32 = 1000;

    pub fn with_ranges(mut self, range: Range) -> Self {
        self.ranges = [range; NUM_CHANNELS];
        self
    }

    /// Sets one channel's range. A channel past the last input leaves the config unchanged
    /// and logs a warning; `Ads8688::set_range` is the checked path.
    pub fn with_range(mut self, channel: u8, range: Range) -> Self {
        match self.ranges.get_mut(channel as usize) {
            Some(slot) => *slot = range,
            None => log::warn!("config: no channel {}, range {:?} ignored", channel, range),
        }
        self
    }

    pub fn with_scan_mode(mut self, scan_mode: ScanMode) -> Self {
        self.scan_mode = scan_mode;
        self
    }

    pub fn with_sample_period_us(mut self, period_us: u32) -> Self {
        self.sample_period_us = period_us;
        self
    }

    pub fn sample_rate_hz(&self) -> f32 {
        1_000_000.0 / self.sample_period_us.max(1) as f32
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            ranges: [Range::default(); NUM_CHANNELS],
            scan_mode: ScanMode::default(),
            sample_period_us: Self::DEFAULT_SAMPLE_PERIOD_US,
        }
    }
}
