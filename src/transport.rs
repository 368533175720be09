use crate::constants::FRAME_SETTLE_US;
use crate::error::TransportError;

use embedded_hal::{
    delay::DelayNs,
    digital::OutputPin,
    spi::{SpiBus, SpiDevice},
};

/// Width of one chip-select window on the bus
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameWidth {
    Bits16,
    Bits24,
    Bits32,
}

impl FrameWidth {
    pub const fn bytes(self) -> usize {
        match self {
            FrameWidth::Bits16 => 2,
            FrameWidth::Bits24 => 3,
            FrameWidth::Bits32 => 4,
        }
    }
}

/// Builds the 24-bit program register write frame `[addr << 1 | W][value][0x00]`
pub const fn register_write_frame(address: u8, value: u8) -> u32 {
    ((((address & 0x7F) << 1) | 0x01) as u32) << 16 | (value as u32) << 8
}

/// Builds the 24-bit program register read frame `[addr << 1 | R][0x00][0x00]`
pub const fn register_read_frame(address: u8) -> u32 {
    (((address & 0x7F) << 1) as u32) << 16
}

/// Builds the 32-bit conversion command frame: command word followed by 16 clocks of data
pub const fn command_frame(command: u16) -> u32 {
    (command as u32) << 16
}

/// Conversion data carried in the lower half of a 32-bit response
pub const fn conversion_data(response: u32) -> i16 {
    response as u16 as i16
}

fn encode(bits: u32, width: FrameWidth, buffer: &mut [u8; 4]) -> usize {
    let n = width.bytes();
    buffer[..n].copy_from_slice(&bits.to_be_bytes()[4 - n..]);
    n
}

fn decode(buffer: &[u8]) -> u32 {
    buffer.iter().fold(0u32, |acc, b| (acc << 8) | *b as u32)
}

/// One bus transaction with the ADS8688: a fixed-width frame inside a chip-select window.
///
/// Frames are right-aligned in a `u32` and clocked most significant bit first. The response
/// to a conversion command belongs to the previous command; the transport does not hide that.
pub trait FrameTransport {
    type Error: core::fmt::Debug;

    /// Whether the bus can accept frames
    fn bus_ready(&mut self) -> bool {
        true
    }

    /// Deasserts chip select outside of any frame
    fn release(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Clocks `bits` out and returns the bits captured in the same window
    fn transact(&mut self, bits: u32, width: FrameWidth) -> Result<u32, Self::Error>;

    /// Writes a program register, discarding the echoed response
    fn write_register(&mut self, address: u8, value: u8) -> Result<(), Self::Error> {
        self.transact(register_write_frame(address, value), FrameWidth::Bits24)?;
        Ok(())
    }

    /// Reads a program register back
    fn read_register(&mut self, address: u8) -> Result<u8, Self::Error> {
        let response = self.transact(register_read_frame(address), FrameWidth::Bits24)?;
        Ok(response as u8)
    }
}

/// Transport over an `SpiDevice` that drives chip select itself (hardware PCS or a shared-bus
/// device wrapper). The whole frame goes out in a single transfer.
pub struct HardwareCs<SPI, DELAY> {
    spi: SPI,
    delay: DELAY,
}

impl<SPI, DELAY> HardwareCs<SPI, DELAY>
where
    SPI: SpiDevice,
    DELAY: DelayNs,
{
    pub fn new(spi: SPI, delay: DELAY) -> Self {
        HardwareCs { spi, delay }
    }

    pub fn free(self) -> (SPI, DELAY) {
        (self.spi, self.delay)
    }
}

impl<SPI, DELAY> FrameTransport for HardwareCs<SPI, DELAY>
where
    SPI: SpiDevice,
    DELAY: DelayNs,
{
    type Error = SPI::Error;

    fn transact(&mut self, bits: u32, width: FrameWidth) -> Result<u32, Self::Error> {
        let mut buffer = [0u8; 4];
        let n = encode(bits, width, &mut buffer);
        let clocked = self.spi.transfer_in_place(&mut buffer[..n]);
        // The gap before the next frame is held after a failed one too
        self.delay.delay_us(FRAME_SETTLE_US);
        clocked?;

        let response = decode(&buffer[..n]);
        log::debug!(
            "frame tx=0x{:0w$X} rx=0x{:0w$X}",
            bits,
            response,
            w = n * 2
        );
        Ok(response)
    }
}

/// Transport over a raw `SpiBus` with chip select on a GPIO, clocking each frame as a
/// sequence of 8-bit transfers.
pub struct SoftwareCs<BUS, CS, DELAY> {
    bus: BUS,
    cs: CS,
    delay: DELAY,
}

impl<BUS, CS, DELAY, SpiError, GpioError> SoftwareCs<BUS, CS, DELAY>
where
    BUS: SpiBus<Error = SpiError>,
    CS: OutputPin<Error = GpioError>,
    DELAY: DelayNs,
{
    pub fn new(bus: BUS, cs: CS, delay: DELAY) -> Self {
        SoftwareCs { bus, cs, delay }
    }

    pub fn free(self) -> (BUS, CS, DELAY) {
        (self.bus, self.cs, self.delay)
    }

    fn clock_bytes(&mut self, buffer: &mut [u8]) -> Result<(), TransportError<SpiError, GpioError>> {
        for byte in buffer.chunks_mut(1) {
            self.bus
                .transfer_in_place(byte)
                .map_err(TransportError::Spi)?;
        }
        self.bus.flush().map_err(TransportError::Spi)
    }
}

impl<BUS, CS, DELAY, SpiError, GpioError> FrameTransport for SoftwareCs<BUS, CS, DELAY>
where
    BUS: SpiBus<Error = SpiError>,
    CS: OutputPin<Error = GpioError>,
    DELAY: DelayNs,
    SpiError: core::fmt::Debug,
    GpioError: core::fmt::Debug,
{
    type Error = TransportError<SpiError, GpioError>;

    fn release(&mut self) -> Result<(), Self::Error> {
        self.cs.set_high().map_err(TransportError::Gpio)
    }

    fn transact(&mut self, bits: u32, width: FrameWidth) -> Result<u32, Self::Error> {
        let mut buffer = [0u8; 4];
        let n = encode(bits, width, &mut buffer);

        self.cs.set_low().map_err(TransportError::Gpio)?;
        let clocked = self.clock_bytes(&mut buffer[..n]);
        // Chip select goes back high even when the bus failed mid-frame
        let released = self.cs.set_high().map_err(TransportError::Gpio);
        self.delay.delay_us(FRAME_SETTLE_US);
        clocked?;
        released?;

        let response = decode(&buffer[..n]);
        log::debug!(
            "frame tx=0x{:0w$X} rx=0x{:0w$X}",
            bits,
            response,
            w = n * 2
        );
        Ok(response)
    }
}
