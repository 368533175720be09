//! Simulated ADS8688 for driver tests.
//!
//! The device answers each 32-bit conversion command with the result of the previous one,
//! keeps a program register file, and records every frame, delay and chip-select edge so
//! tests can assert on the exact sequence the driver produced.
#![allow(dead_code)]

use std::cell::RefCell;
use std::convert::Infallible;
use std::rc::Rc;

use ads8688::{Ads8688, HardwareCs, ScanMode, SoftwareCs};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, OutputPin};
use embedded_hal::spi::{self, ErrorKind, Operation, SpiBus, SpiDevice};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimError;

impl spi::Error for SimError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Frame(Vec<u8>),
    FailedFrame,
    Delay(u64),
    CsHigh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Idle,
    Auto,
    Manual,
}

pub struct Device {
    /// Conversion result per channel, as raw 16-bit words
    pub codes: [u16; 8],
    pub registers: [u8; 64],
    pub events: Vec<Event>,
    /// Zero-based frame indices that fail with a bus error
    pub fail_frames: Vec<usize>,
    frame_count: usize,
    mode: Mode,
    current: usize,
    output: u16,
    cs_low: bool,
    frame: Vec<u8>,
    frame_failed: bool,
}

impl Device {
    pub fn new() -> Self {
        let mut device = Device {
            codes: [0; 8],
            registers: [0; 64],
            events: Vec::new(),
            fail_frames: Vec::new(),
            frame_count: 0,
            mode: Mode::Idle,
            current: 0,
            output: 0,
            cs_low: false,
            frame: Vec::new(),
            frame_failed: false,
        };
        device.load_defaults();
        device
    }

    pub fn with_codes(codes: [u16; 8]) -> Self {
        let mut device = Self::new();
        device.codes = codes;
        device
    }

    fn load_defaults(&mut self) {
        self.registers = [0; 64];
        self.registers[0x01] = 0xFF;
        self.mode = Mode::Idle;
        self.current = 0;
        self.output = 0;
    }

    /// Every frame the device accepted, in order
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Frame(f) => Some(f.clone()),
                _ => None,
            })
            .collect()
    }

    /// Command words of the accepted 32-bit frames
    pub fn conversion_commands(&self) -> Vec<u16> {
        self.frames()
            .iter()
            .filter(|f| f.len() == 4)
            .map(|f| u16::from_be_bytes([f[0], f[1]]))
            .collect()
    }

    /// Makes the `n`th frame from now (zero-based) fail
    pub fn fail_frame_from_now(&mut self, n: usize) {
        self.fail_frames.push(self.frame_count + n);
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    fn begin_frame(&mut self) -> Result<(), SimError> {
        let index = self.frame_count;
        self.frame_count += 1;
        self.frame.clear();
        if self.fail_frames.contains(&index) {
            self.frame_failed = true;
            self.events.push(Event::FailedFrame);
            Err(SimError)
        } else {
            self.frame_failed = false;
            Ok(())
        }
    }

    fn is_command(&self) -> bool {
        self.frame.first().map_or(true, |b| *b == 0x00 || *b >= 0x80)
    }

    fn clock(&mut self, tx: u8) -> u8 {
        let rx = match self.frame.len() {
            2 if self.is_command() => (self.output >> 8) as u8,
            3 if self.is_command() => self.output as u8,
            2 => {
                let address = (self.frame[0] >> 1) as usize;
                if self.frame[0] & 0x01 != 0 {
                    self.frame[1]
                } else {
                    self.registers[address]
                }
            }
            _ => 0,
        };
        self.frame.push(tx);
        rx
    }

    fn end_frame(&mut self) {
        let frame = std::mem::take(&mut self.frame);
        match frame.len() {
            2 => match u16::from_be_bytes([frame[0], frame[1]]) {
                0x8500 => self.load_defaults(),
                0x8200 | 0x8300 => self.mode = Mode::Idle,
                _ => {}
            },
            3 => {
                if frame[0] & 0x01 != 0 {
                    self.registers[(frame[0] >> 1) as usize] = frame[1];
                }
            }
            4 => self.convert(u16::from_be_bytes([frame[0], frame[1]])),
            n => panic!("unexpected {}-byte frame {:02X?}", n, frame),
        }
        self.events.push(Event::Frame(frame));
    }

    fn convert(&mut self, command: u16) {
        match command {
            0x0000 => {
                if self.mode == Mode::Auto {
                    self.current = self.next_enabled(self.current);
                }
            }
            0xA000 => {
                self.mode = Mode::Auto;
                self.current = self.next_enabled(7);
            }
            c if c & 0xE300 == 0xC000 => {
                self.mode = Mode::Manual;
                self.current = ((c >> 10) & 0x07) as usize;
            }
            _ => {}
        }
        self.output = if self.registers[0x02] & (1 << self.current) != 0 {
            0
        } else {
            self.codes[self.current]
        };
    }

    fn next_enabled(&self, from: usize) -> usize {
        let mask = self.registers[0x01];
        (1..=8)
            .map(|step| (from + step) % 8)
            .find(|ch| mask & (1 << ch) != 0)
            .unwrap_or(from)
    }
}

pub type Shared = Rc<RefCell<Device>>;

pub fn device(codes: [u16; 8]) -> Shared {
    Rc::new(RefCell::new(Device::with_codes(codes)))
}

/// `SpiDevice` view: every transaction is one chip-select window
pub struct SimSpi(pub Shared);

impl spi::ErrorType for SimSpi {
    type Error = SimError;
}

impl SpiDevice for SimSpi {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), SimError> {
        let mut dev = self.0.borrow_mut();
        dev.begin_frame()?;
        for op in operations.iter_mut() {
            match op {
                Operation::TransferInPlace(buf) => {
                    for b in buf.iter_mut() {
                        *b = dev.clock(*b);
                    }
                }
                Operation::Write(buf) => {
                    for b in buf.iter() {
                        dev.clock(*b);
                    }
                }
                Operation::Read(buf) => {
                    for b in buf.iter_mut() {
                        *b = dev.clock(0);
                    }
                }
                Operation::Transfer(read, write) => {
                    for i in 0..read.len().max(write.len()) {
                        let rx = dev.clock(write.get(i).copied().unwrap_or(0));
                        if let Some(r) = read.get_mut(i) {
                            *r = rx;
                        }
                    }
                }
                Operation::DelayNs(_) => {}
            }
        }
        dev.end_frame();
        Ok(())
    }
}

/// `SpiBus` view: frames are delimited by [`SimCs`]
pub struct SimBus(pub Shared);

impl spi::ErrorType for SimBus {
    type Error = SimError;
}

impl SimBus {
    fn exchange(&mut self, tx: u8) -> Result<u8, SimError> {
        let mut dev = self.0.borrow_mut();
        assert!(dev.cs_low, "byte clocked with chip select high");
        if dev.frame_failed {
            return Err(SimError);
        }
        if dev.frame.is_empty() {
            dev.begin_frame()?;
        }
        Ok(dev.clock(tx))
    }
}

impl SpiBus for SimBus {
    fn read(&mut self, words: &mut [u8]) -> Result<(), SimError> {
        for w in words.iter_mut() {
            *w = self.exchange(0)?;
        }
        Ok(())
    }

    fn write(&mut self, words: &[u8]) -> Result<(), SimError> {
        for w in words {
            self.exchange(*w)?;
        }
        Ok(())
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), SimError> {
        for i in 0..read.len().max(write.len()) {
            let rx = self.exchange(write.get(i).copied().unwrap_or(0))?;
            if let Some(r) = read.get_mut(i) {
                *r = rx;
            }
        }
        Ok(())
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), SimError> {
        for w in words.iter_mut() {
            *w = self.exchange(*w)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SimError> {
        Ok(())
    }
}

/// Software chip-select line
pub struct SimCs(pub Shared);

impl digital::ErrorType for SimCs {
    type Error = Infallible;
}

impl OutputPin for SimCs {
    fn set_low(&mut self) -> Result<(), Infallible> {
        let mut dev = self.0.borrow_mut();
        dev.cs_low = true;
        dev.frame.clear();
        dev.frame_failed = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        let mut dev = self.0.borrow_mut();
        if dev.cs_low && !dev.frame.is_empty() && !dev.frame_failed {
            dev.end_frame();
        }
        dev.cs_low = false;
        dev.frame_failed = false;
        dev.events.push(Event::CsHigh);
        Ok(())
    }
}

/// Delay provider that records requested waits on the device timeline
#[derive(Clone)]
pub struct SimDelay(pub Shared);

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        let mut dev = self.0.borrow_mut();
        if let Some(Event::Delay(total)) = dev.events.last_mut() {
            *total += ns as u64;
        } else {
            dev.events.push(Event::Delay(ns as u64));
        }
    }
}

pub type HardwareAdc = Ads8688<HardwareCs<SimSpi, SimDelay>, SimDelay>;
pub type SoftwareAdc = Ads8688<SoftwareCs<SimBus, SimCs, SimDelay>, SimDelay>;

pub fn hardware_adc(dev: &Shared, mode: ScanMode) -> HardwareAdc {
    let transport = HardwareCs::new(SimSpi(dev.clone()), SimDelay(dev.clone()));
    Ads8688::new(transport, SimDelay(dev.clone()), mode)
}

pub fn software_adc(dev: &Shared, mode: ScanMode) -> SoftwareAdc {
    let transport = SoftwareCs::new(
        SimBus(dev.clone()),
        SimCs(dev.clone()),
        SimDelay(dev.clone()),
    );
    Ads8688::new(transport, SimDelay(dev.clone()), mode)
}

/// Distinct code per channel so ordering mistakes show up
pub fn ramp_codes() -> [u16; 8] {
    [0x0100, 0x0201, 0x0302, 0x0403, 0x0504, 0x0605, 0x0706, 0x0807]
}
