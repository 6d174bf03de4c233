mod aggregator;
mod aht20;
pub mod bmp180;
mod reading;

use thiserror_no_std::Error;

pub use aggregator::*;
pub use aht20::*;
pub use bmp180::{Bmp180, Bmp180Readings, CalibrationCoefficients};
pub use reading::*;

/// Errors raised by the sensor drivers.
///
/// None of these escape the [`SensorAggregator`]; they are logged and turned
/// into an availability flag on the reading.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// A transaction timed out or was not acknowledged.
    #[error("{sensor}: I2C transaction failed during {operation}")]
    Bus {
        sensor: &'static str,
        operation: &'static str,
    },
    /// The identification register did not hold the expected signature.
    #[error("{sensor}: expected chip id {expected:#04x}, found {found:#04x}")]
    DeviceNotPresent {
        sensor: &'static str,
        expected: u8,
        found: u8,
    },
    /// The calibration block carries the unprogrammed-device signature.
    #[error("{sensor}: calibration block is not programmed")]
    InvalidCalibration { sensor: &'static str },
    /// The calibration constants drove the compensation into a zero divisor.
    #[error("{sensor}: compensation hit a zero divisor")]
    Compensation { sensor: &'static str },
}

/// The closed set of devices this node knows how to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownDevice {
    /// AHT20 humidity/temperature sensor.
    Aht20,
    /// BMP180 pressure/temperature sensor.
    Bmp180,
}

impl KnownDevice {
    pub const ALL: [KnownDevice; 2] = [KnownDevice::Aht20, KnownDevice::Bmp180];

    /// 7-bit bus address of the device.
    pub const fn address(self) -> u8 {
        match self {
            Self::Aht20 => 0x38,
            Self::Bmp180 => 0x77,
        }
    }

    /// Look up the device answering at `address`.
    pub fn from_address(address: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|device| device.address() == address)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Aht20 => "AHT20",
            Self::Bmp180 => "BMP180",
        }
    }
}

/// Trait for sensors that produce typed readings.
pub trait Sensor {
    /// The type of readings this sensor produces.
    type Readings;

    /// Which device the driver talks to.
    const DEVICE: KnownDevice;

    /// Run one complete measurement and return decoded readings.
    fn read(&mut self) -> Result<Self::Readings, SensorError>;
}

/// Monotonic millisecond counter used to timestamp readings.
pub trait TickSource {
    fn now_ms(&self) -> u32;
}
