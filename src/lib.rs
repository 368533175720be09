#![cfg_attr(not(any(test, feature = "std")), no_std)]

mod config;
mod constants;
mod convert;
mod driver;
mod error;
mod sample;
mod scheduler;
mod shared;
mod transport;

pub use config::Config;
pub use constants::{Range, ScanMode, NUM_CHANNELS};
pub use convert::{code_to_voltage, to_voltage, to_voltages};
pub use driver::{Ads8688, DeviceState};
pub use error::{Ads8688Error, TransportError};
pub use sample::{Sample, Scan};
pub use scheduler::{Clock, DeadlineClock, DeadlineMissed, Sampler, ScanSource, Tick, Wait};
pub use shared::{LatestCodes, Snapshot};
pub use transport::{FrameTransport, FrameWidth, HardwareCs, SoftwareCs};

#[cfg(feature = "std")]
pub use scheduler::StdClock;
