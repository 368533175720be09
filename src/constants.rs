/// Number of analog input channels on the ADS8688
pub const NUM_CHANNELS: usize = 8;

/// ADS8688 Commands (upper 16 bits of a command frame)
pub const CMD_NO_OP: u16 = 0x0000;
pub const CMD_STDBY: u16 = 0x8200;
pub const CMD_PWR_DN: u16 = 0x8300;
pub const CMD_RST: u16 = 0x8500;
pub const CMD_AUTO_RST: u16 = 0xA000;
pub const CMD_MAN_CH_0: u16 = 0xC000;

/// Manual channel select command for `channel` (MAN_Ch_0 .. MAN_Ch_7)
pub const fn cmd_man_ch(channel: u8) -> u16 {
    CMD_MAN_CH_0 | (((channel & 0x07) as u16) << 10)
}

/// ADS8688 Program Registers
pub const REG_AUTO_SEQ_EN: u8 = 0x01;
pub const REG_CH_PWR_DN: u8 = 0x02;
/// Range register of channel 0; channel N lives at `REG_RANGE_CH0 + N`
pub const REG_RANGE_CH0: u8 = 0x05;

/// Power-up wait before the first frame after chip-select release
pub const POWER_UP_DELAY_MS: u32 = 10;
/// Settling time after RST while the device reloads its calibration
pub const RESET_SETTLE_MS: u32 = 20;
/// Quiet time held after every frame before the next one may start
pub const FRAME_SETTLE_US: u32 = 2;

/// Input range settings for the ADS8688 channel range registers
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Range {
    /// ±2.5 × VREF = ±10.24V
    #[default]
    Bipolar10V24 = 0x00,
    /// ±1.25 × VREF = ±5.12V
    Bipolar5V12 = 0x01,
    /// ±0.625 × VREF = ±2.56V
    Bipolar2V56 = 0x02,
    /// ±0.3125 × VREF = ±1.28V
    Bipolar1V28 = 0x03,
    /// ±0.15625 × VREF = ±0.64V
    Bipolar0V64 = 0x04,
    /// 0 to 2.5 × VREF = 0-10.24V
    Unipolar10V24 = 0x05,
    /// 0 to 1.25 × VREF = 0-5.12V
    Unipolar5V12 = 0x06,
}

impl Range {
    pub const ALL: [Range; 7] = [
        Range::Bipolar10V24,
        Range::Bipolar5V12,
        Range::Bipolar2V56,
        Range::Bipolar1V28,
        Range::Bipolar0V64,
        Range::Unipolar10V24,
        Range::Unipolar5V12,
    ];

    /// Decodes a range register value, `None` for anything past 0x06
    pub const fn from_code(code: u8) -> Option<Range> {
        match code {
            0x00 => Some(Range::Bipolar10V24),
            0x01 => Some(Range::Bipolar5V12),
            0x02 => Some(Range::Bipolar2V56),
            0x03 => Some(Range::Bipolar1V28),
            0x04 => Some(Range::Bipolar0V64),
            0x05 => Some(Range::Unipolar10V24),
            0x06 => Some(Range::Unipolar5V12),
            _ => None,
        }
    }

    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Full-scale span in volts
    pub fn full_scale(self) -> f32 {
        match self {
            Range::Bipolar10V24 | Range::Unipolar10V24 => 10.24,
            Range::Bipolar5V12 | Range::Unipolar5V12 => 5.12,
            Range::Bipolar2V56 => 2.56,
            Range::Bipolar1V28 => 1.28,
            Range::Bipolar0V64 => 0.64,
        }
    }

    pub fn is_bipolar(self) -> bool {
        !matches!(self, Range::Unipolar10V24 | Range::Unipolar5V12)
    }
}

/// Strategy used to read the whole channel array in one pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScanMode {
    /// Device-internal round robin restarted with AUTO_RST after every pass
    #[default]
    AutoSequence,
    /// Host-driven round robin with MAN_Ch_n select commands
    Manual,
}
