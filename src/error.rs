use thiserror::Error;

/// Errors returned by the ADS8688 driver, generic over the frame transport error
#[derive(Debug, Error)]
pub enum Ads8688Error<BusError> {
    /// The transport failed mid-frame; the frame's response is lost
    #[error("bus fault: {0:?}")]
    BusFault(BusError),
    #[error("bus not ready")]
    BusNotReady,
    /// Conversion requested outside the `Ready` state
    #[error("device not initialized")]
    NotInitialized,
    #[error("invalid channel {0}")]
    InvalidChannel(u8),
    #[error("invalid range code 0x{0:02X}")]
    InvalidRange(u8),
}

impl<BusError> Ads8688Error<BusError> {
    /// True for the caller-side argument errors (bad channel or range code)
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            Ads8688Error::InvalidChannel(_) | Ads8688Error::InvalidRange(_)
        )
    }
}

/// Errors from the software chip-select transport
#[derive(Debug, Error)]
pub enum TransportError<SpiError, GpioError> {
    #[error("spi: {0:?}")]
    Spi(SpiError),
    #[error("chip select: {0:?}")]
    Gpio(GpioError),
}
