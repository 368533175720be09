use crate::constants::{Range, NUM_CHANNELS};
use crate::convert;

/// One channel's conversion result
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sample {
    pub channel: u8,
    pub code: i16,
    pub timestamp_us: u64,
}

/// Codes from one pass over all channels, in ascending channel order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Scan {
    /// Time the pass started
    pub timestamp_us: u64,
    pub codes: [i16; NUM_CHANNELS],
}

impl Scan {
    pub fn samples(&self) -> impl Iterator<Item = Sample> + '_ {
        self.codes
            .iter()
            .enumerate()
            .map(move |(channel, code)| Sample {
                channel: channel as u8,
                code: *code,
                timestamp_us: self.timestamp_us,
            })
    }

    pub fn voltages(&self, ranges: &[Range; NUM_CHANNELS]) -> [f32; NUM_CHANNELS] {
        convert::to_voltages(&self.codes, ranges)
    }
}
