use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use super::{KnownDevice, Sensor, SensorError};

const SENSOR: &str = "AHT20";

/// Start-measurement command.
const TRIGGER_MEASUREMENT: [u8; 3] = [0xAC, 0x33, 0x00];
/// The datasheet asks for 75 ms; the extra margin covers slow parts.
const MEASUREMENT_SETTLE_MS: u32 = 100;
const POWER_UP_MS: u32 = 500;

const STATUS_BUSY: u8 = 0x80;
const FULL_SCALE: f64 = 1_048_576.0; // 2^20

/// Typed readings from the AHT20 sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aht20Readings {
    pub temperature_celsius: f32,
    pub humidity_percent: f32,
}

/// Relative humidity from the 20-bit raw field.
pub fn humidity_percent(raw: u32) -> f32 {
    (raw as f64 / FULL_SCALE * 100.0) as f32
}

/// Temperature from the 20-bit raw field.
pub fn temperature_celsius(raw: u32) -> f32 {
    (raw as f64 / FULL_SCALE * 200.0 - 50.0) as f32
}

/// Decode the 6-byte measurement frame.
///
/// Layout: status, then humidity in bytes 1..=2 plus the high nibble of
/// byte 3, then temperature in the low nibble of byte 3 plus bytes 4..=5.
pub fn decode_measurement(frame: &[u8; 6]) -> Aht20Readings {
    let humidity_raw =
        (u32::from(frame[1]) << 12) | (u32::from(frame[2]) << 4) | (u32::from(frame[3]) >> 4);
    let temperature_raw =
        (u32::from(frame[3] & 0x0F) << 16) | (u32::from(frame[4]) << 8) | u32::from(frame[5]);

    Aht20Readings {
        temperature_celsius: temperature_celsius(temperature_raw),
        humidity_percent: humidity_percent(humidity_raw),
    }
}

pub struct Aht20<I, D> {
    i2c: I,
    delay: D,
}

impl<I: I2c, D: DelayNs> Aht20<I, D> {
    /// Wait for power-up and wake the sensor with one trigger.
    ///
    /// A failed wake-up is only logged: every read sends its own trigger, so
    /// the first real measurement decides whether the sensor is usable.
    pub fn new(i2c: I, delay: D) -> Self {
        let mut sensor = Self { i2c, delay };
        sensor.delay.delay_ms(POWER_UP_MS);

        match sensor.i2c.write(KnownDevice::Aht20.address(), &TRIGGER_MEASUREMENT) {
            Ok(()) => info!("AHT20 initialized"),
            Err(e) => error!("AHT20 wake-up trigger failed: {:?}", e),
        }

        sensor
    }

    /// Trigger a measurement, wait for the conversion, then read and decode it.
    pub fn trigger_and_read(&mut self) -> Result<Aht20Readings, SensorError> {
        let address = KnownDevice::Aht20.address();

        self.i2c.write(address, &TRIGGER_MEASUREMENT).map_err(|e| {
            error!("AHT20 trigger command failed: {:?}", e);
            SensorError::Bus {
                sensor: SENSOR,
                operation: "trigger measurement",
            }
        })?;

        self.delay.delay_ms(MEASUREMENT_SETTLE_MS);

        let mut frame = [0u8; 6];
        self.i2c.read(address, &mut frame).map_err(|e| {
            error!("AHT20 read data failed: {:?}", e);
            SensorError::Bus {
                sensor: SENSOR,
                operation: "read measurement",
            }
        })?;

        if frame[0] & STATUS_BUSY != 0 {
            warn!("AHT20 still busy after {} ms, data may be stale", MEASUREMENT_SETTLE_MS);
        }

        let readings = decode_measurement(&frame);
        debug!(
            "AHT20: {} C, {} %RH",
            readings.temperature_celsius, readings.humidity_percent
        );
        Ok(readings)
    }

    /// Give the bus handle and delay back.
    pub fn release(self) -> (I, D) {
        (self.i2c, self.delay)
    }
}

impl<I: I2c, D: DelayNs> Sensor for Aht20<I, D> {
    type Readings = Aht20Readings;
    const DEVICE: KnownDevice = KnownDevice::Aht20;

    fn read(&mut self) -> Result<Aht20Readings, SensorError> {
        self.trigger_and_read()
    }
}
