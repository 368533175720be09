//! Code-to-voltage conversion for the ADS8688 input ranges.
//!
//! Bipolar codes are read as two's-complement (`0x0000` is 0 V); unipolar codes are the same
//! 16 bits read unsigned.

use crate::constants::Range;

/// Converts a raw conversion code to volts for the given range
pub fn to_voltage(code: i16, range: Range) -> f32 {
    let full_scale = range.full_scale();
    if range.is_bipolar() {
        code as f32 * full_scale / 32768.0
    } else {
        code as u16 as f32 * full_scale / 65536.0
    }
}

/// Converts a code using a raw range register value. Unknown range codes fall back to the
/// widest bipolar span instead of failing.
pub fn code_to_voltage(code: i16, range_code: u8) -> f32 {
    let range = Range::from_code(range_code).unwrap_or_else(|| {
        log::debug!("range code 0x{:02X} out of table, using ±10.24V", range_code);
        Range::default()
    });
    to_voltage(code, range)
}

/// Converts a whole scan, pairing each code with its channel's range
pub fn to_voltages<const N: usize>(codes: &[i16; N], ranges: &[Range; N]) -> [f32; N] {
    let mut volts = [0.0f32; N];
    for ((v, code), range) in volts.iter_mut().zip(codes).zip(ranges) {
        *v = to_voltage(*code, *range);
    }
    volts
}
