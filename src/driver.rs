use crate::config::Config;
use crate::constants::*;
use crate::convert;
use crate::error::Ads8688Error;
use crate::transport::{command_frame, conversion_data, FrameTransport, FrameWidth};
use core::result::Result;
use core::result::Result::Ok;

use embedded_hal::delay::DelayNs;

/// Lifecycle of a device session. Conversions are only accepted in `Ready`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceState {
    Uninitialized,
    Resetting,
    Configuring,
    Ready,
}

/// ADS8688 driver
pub struct Ads8688<T, DELAY> {
    transport: T,
    delay: DELAY,
    state: DeviceState,
    scan_mode: ScanMode,
    /// Ranges the device has accepted since its last reset
    ranges: [Range; NUM_CHANNELS],
    /// Ranges `init` applies after the reset
    requested: [Range; NUM_CHANNELS],
    /// The device's conversion pipeline holds channel 0 of an auto-sequence pass
    primed: bool,
    latest: Option<[i16; NUM_CHANNELS]>,
}

type DriverResult<T, E> = Result<T, Ads8688Error<E>>;

impl<T, DELAY> Ads8688<T, DELAY>
where
    T: FrameTransport,
    DELAY: DelayNs,
{
    /// Creates a new ADS8688 driver instance. No frames are sent until `init` or `reset`.
    pub fn new(transport: T, delay: DELAY, scan_mode: ScanMode) -> Self {
        Ads8688 {
            transport,
            delay,
            state: DeviceState::Uninitialized,
            scan_mode,
            ranges: [Range::default(); NUM_CHANNELS],
            requested: [Range::default(); NUM_CHANNELS],
            primed: false,
            latest: None,
        }
    }

    /// Creates a driver whose `init` applies the configured ranges and scan mode
    pub fn from_config(transport: T, delay: DELAY, config: &Config) -> Self {
        let mut adc = Self::new(transport, delay, config.scan_mode);
        adc.requested = config.ranges;
        adc
    }

    /// Runs the startup sequence: reset, apply the requested ranges, power on every channel and
    /// enter the configured scan mode.
    ///
    /// Any failure leaves the session `Uninitialized`; the requested ranges are kept for a retry.
    pub fn init(&mut self) -> DriverResult<(), T::Error> {
        let requested = self.requested;
        let result = self.reset().and_then(|_| {
            for (channel, range) in requested.iter().enumerate() {
                self.set_range(channel as u8, *range)?;
            }
            self.enter_scan_mode()
        });

        if let Err(e) = &result {
            log::error!("ADS8688 startup aborted: {}", e);
            self.state = DeviceState::Uninitialized;
            self.primed = false;
        }
        result
    }

    /// Resets the device and powers all channels on, leaving it in `Configuring`.
    ///
    /// The device returns every program register to its default, so the session's ranges go
    /// back to ±10.24V as well.
    pub fn reset(&mut self) -> DriverResult<(), T::Error> {
        if !self.transport.bus_ready() {
            log::error!("SPI bus not ready");
            self.state = DeviceState::Uninitialized;
            return Err(Ads8688Error::BusNotReady);
        }

        self.state = DeviceState::Resetting;
        self.primed = false;
        self.latest = None;

        let result = self.reset_sequence();
        self.state = match result {
            Ok(()) => DeviceState::Configuring,
            Err(_) => DeviceState::Uninitialized,
        };
        result
    }

    fn reset_sequence(&mut self) -> DriverResult<(), T::Error> {
        self.transport.release().map_err(Ads8688Error::BusFault)?;
        self.delay.delay_ms(POWER_UP_DELAY_MS);

        self.send_command(CMD_RST)?;
        self.delay.delay_ms(RESET_SETTLE_MS);
        self.ranges = [Range::default(); NUM_CHANNELS];

        self.power_on_all_channels()?;
        log::info!("ADS8688 reset complete");
        Ok(())
    }

    /// Powers every channel on through the channel power-down register
    pub fn power_on_all_channels(&mut self) -> DriverResult<(), T::Error> {
        self.write_register(REG_CH_PWR_DN, 0x00)
    }

    /// Sets the input range of a channel. The session records it only once the write went
    /// through, and the next `init` applies it again.
    pub fn set_range(&mut self, channel: u8, range: Range) -> DriverResult<(), T::Error> {
        let index = Self::channel_index(channel)?;
        self.write_register(REG_RANGE_CH0 + channel, range.code())?;
        self.ranges[index] = range;
        self.requested[index] = range;
        log::debug!("channel {} range set to {:?}", channel, range);
        Ok(())
    }

    /// Sets the input range of a channel from a raw range register code
    pub fn set_range_code(&mut self, channel: u8, code: u8) -> DriverResult<(), T::Error> {
        Self::channel_index(channel)?;
        let range = Range::from_code(code).ok_or(Ads8688Error::InvalidRange(code))?;
        self.set_range(channel, range)
    }

    /// Range the device is currently configured with for a channel
    pub fn range(&self, channel: u8) -> DriverResult<Range, T::Error> {
        Ok(self.ranges[Self::channel_index(channel)?])
    }

    pub fn ranges(&self) -> &[Range; NUM_CHANNELS] {
        &self.ranges
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn scan_mode(&self) -> ScanMode {
        self.scan_mode
    }

    /// Switches scan strategy; the next scan primes the new mode
    pub fn set_scan_mode(&mut self, scan_mode: ScanMode) {
        if self.scan_mode != scan_mode {
            self.scan_mode = scan_mode;
            self.primed = false;
        }
    }

    /// Arms the configured scan mode and moves to `Ready`
    pub fn enter_scan_mode(&mut self) -> DriverResult<(), T::Error> {
        match self.state {
            DeviceState::Configuring | DeviceState::Ready => {}
            _ => return Err(Ads8688Error::NotInitialized),
        }
        if self.scan_mode == ScanMode::AutoSequence {
            self.arm_auto_sequence()?;
        }
        self.state = DeviceState::Ready;
        log::info!("ADS8688 ready, {:?} scan", self.scan_mode);
        Ok(())
    }

    /// Enables every channel in the sequence and issues the priming AUTO_RST, dropping its
    /// response since it belongs to the previous command
    fn arm_auto_sequence(&mut self) -> DriverResult<(), T::Error> {
        self.write_register(REG_AUTO_SEQ_EN, 0xFF)?;
        self.convert(CMD_AUTO_RST)?;
        self.primed = true;
        Ok(())
    }

    /// Reads one channel in manual mode: select it, then clock out its result
    pub fn read_channel(&mut self, channel: u8) -> DriverResult<i16, T::Error> {
        self.ensure_ready()?;
        Self::channel_index(channel)?;

        // Leaves the device in manual mode; an auto-sequence scan must re-arm afterwards
        self.primed = false;
        self.convert(cmd_man_ch(channel))?;
        self.convert(CMD_NO_OP)
    }

    /// Reads all channels in ascending order with the configured strategy
    pub fn scan_all(&mut self) -> DriverResult<[i16; NUM_CHANNELS], T::Error> {
        self.ensure_ready()?;

        let result = match self.scan_mode {
            ScanMode::AutoSequence => self.scan_auto_sequence(),
            ScanMode::Manual => self.scan_manual(),
        };
        match result {
            Ok(codes) => {
                self.latest = Some(codes);
                Ok(codes)
            }
            Err(e) => {
                // A lost frame desynchronizes the pipeline; nothing from this pass is kept
                self.latest = None;
                self.primed = false;
                Err(e)
            }
        }
    }

    fn scan_auto_sequence(&mut self) -> DriverResult<[i16; NUM_CHANNELS], T::Error> {
        if !self.primed {
            self.arm_auto_sequence()?;
        }

        let mut codes = [0i16; NUM_CHANNELS];
        for channel in 0..NUM_CHANNELS - 1 {
            codes[channel] = self
                .convert(CMD_NO_OP)
                .inspect_err(|_| log::warn!("auto-sequence read of channel {} failed", channel))?;
        }
        // Collects the last channel and restarts the sequence for the next pass
        codes[NUM_CHANNELS - 1] = self.convert(CMD_AUTO_RST)?;
        Ok(codes)
    }

    fn scan_manual(&mut self) -> DriverResult<[i16; NUM_CHANNELS], T::Error> {
        self.primed = false;
        self.convert(cmd_man_ch(0))?;

        let mut codes = [0i16; NUM_CHANNELS];
        for channel in 1..NUM_CHANNELS {
            codes[channel - 1] = self
                .convert(cmd_man_ch(channel as u8))
                .inspect_err(|_| log::warn!("manual read of channel {} failed", channel - 1))?;
        }
        codes[NUM_CHANNELS - 1] = self.convert(CMD_NO_OP)?;
        Ok(codes)
    }

    /// Codes of the last successful scan, `None` after a fault or reset
    pub fn latest_codes(&self) -> Option<[i16; NUM_CHANNELS]> {
        self.latest
    }

    /// Last scan converted with the session's ranges
    pub fn latest_voltages(&self) -> Option<[f32; NUM_CHANNELS]> {
        self.latest
            .map(|codes| convert::to_voltages(&codes, &self.ranges))
    }

    /// Reads back a program register
    pub fn read_register(&mut self, address: u8) -> DriverResult<u8, T::Error> {
        self.transport
            .read_register(address)
            .map_err(Ads8688Error::BusFault)
    }

    /// Puts the device in standby; `enter_scan_mode` wakes it
    pub fn standby(&mut self) -> DriverResult<(), T::Error> {
        self.ensure_ready()?;
        self.send_command(CMD_STDBY)?;
        self.primed = false;
        self.state = DeviceState::Configuring;
        Ok(())
    }

    /// Powers the device down; `init` is required before the next conversion
    pub fn power_down(&mut self) -> DriverResult<(), T::Error> {
        self.send_command(CMD_PWR_DN)?;
        self.primed = false;
        self.latest = None;
        self.state = DeviceState::Uninitialized;
        Ok(())
    }

    pub fn free(self) -> (T, DELAY) {
        (self.transport, self.delay)
    }

    fn ensure_ready(&self) -> DriverResult<(), T::Error> {
        if self.state == DeviceState::Ready {
            Ok(())
        } else {
            Err(Ads8688Error::NotInitialized)
        }
    }

    fn channel_index(channel: u8) -> DriverResult<usize, T::Error> {
        if (channel as usize) < NUM_CHANNELS {
            Ok(channel as usize)
        } else {
            Err(Ads8688Error::InvalidChannel(channel))
        }
    }

    /// Sends a 16-bit command frame
    fn send_command(&mut self, command: u16) -> DriverResult<(), T::Error> {
        log::debug!("Sending command: 0x{:04X}", command);
        self.transport
            .transact(command as u32, FrameWidth::Bits16)
            .map_err(Ads8688Error::BusFault)?;
        Ok(())
    }

    /// Sends a 32-bit conversion command and returns the result of the previous one
    fn convert(&mut self, command: u16) -> DriverResult<i16, T::Error> {
        let response = self
            .transport
            .transact(command_frame(command), FrameWidth::Bits32)
            .map_err(Ads8688Error::BusFault)?;
        Ok(conversion_data(response))
    }

    fn write_register(&mut self, address: u8, value: u8) -> DriverResult<(), T::Error> {
        log::debug!("Writing register 0x{:02X} = 0x{:02X}", address, value);
        self.transport
            .write_register(address, value)
            .map_err(Ads8688Error::BusFault)
    }
}
