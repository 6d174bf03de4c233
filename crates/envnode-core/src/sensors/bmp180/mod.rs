mod calibration;
pub mod compensation;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{debug, error};
use serde::{Deserialize, Serialize};

use super::{KnownDevice, Sensor, SensorError};

pub use calibration::{CALIBRATION_LEN, CalibrationCoefficients, load_calibration};
pub use compensation::{Compensated, RawPressureTempSample};

const SENSOR: &str = "BMP180";

const REG_CONTROL: u8 = 0xF4;
const REG_DATA: u8 = 0xF6;
const CMD_TEMPERATURE: u8 = 0x2E;
const CMD_PRESSURE: u8 = 0x34 + (compensation::OVERSAMPLING << 6);
/// Both conversions need 4.5 ms at the lowest oversampling setting.
const CONVERSION_SETTLE_MS: u32 = 10;

/// Typed readings from the BMP180 sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bmp180Readings {
    pub temperature_celsius: f32,
    pub pressure_hpa: f32,
}

impl From<Compensated> for Bmp180Readings {
    fn from(value: Compensated) -> Self {
        Self {
            temperature_celsius: (value.temperature_deci_celsius as f64 / 10.0) as f32,
            pressure_hpa: (value.pressure_pa as f64 / 100.0) as f32,
        }
    }
}

/// BMP180 driver owning its calibration constants.
pub struct Bmp180<I, D> {
    i2c: I,
    delay: D,
    calibration: CalibrationCoefficients,
}

impl<I: I2c, D: DelayNs> Bmp180<I, D> {
    /// Identify the part and load its calibration block.
    pub fn new(mut i2c: I, delay: D) -> Result<Self, SensorError> {
        let calibration = load_calibration(&mut i2c)?;
        Ok(Self {
            i2c,
            delay,
            calibration,
        })
    }

    pub fn calibration(&self) -> &CalibrationCoefficients {
        &self.calibration
    }

    fn start_conversion(&mut self, command: u8, operation: &'static str) -> Result<(), SensorError> {
        self.i2c
            .write(KnownDevice::Bmp180.address(), &[REG_CONTROL, command])
            .map_err(|e| {
                error!("BMP180 {} failed: {:?}", operation, e);
                SensorError::Bus {
                    sensor: SENSOR,
                    operation,
                }
            })?;
        self.delay.delay_ms(CONVERSION_SETTLE_MS);
        Ok(())
    }

    fn read_data(&mut self, buf: &mut [u8], operation: &'static str) -> Result<(), SensorError> {
        self.i2c
            .write_read(KnownDevice::Bmp180.address(), &[REG_DATA], buf)
            .map_err(|e| {
                error!("BMP180 {} failed: {:?}", operation, e);
                SensorError::Bus {
                    sensor: SENSOR,
                    operation,
                }
            })
    }

    /// Run both conversions and return the uncompensated values.
    pub fn read_raw(&mut self) -> Result<RawPressureTempSample, SensorError> {
        self.start_conversion(CMD_TEMPERATURE, "start temperature conversion")?;
        let mut temperature = [0u8; 2];
        self.read_data(&mut temperature, "read temperature")?;

        self.start_conversion(CMD_PRESSURE, "start pressure conversion")?;
        let mut pressure = [0u8; 3];
        self.read_data(&mut pressure, "read pressure")?;

        Ok(RawPressureTempSample::from_registers(temperature, pressure))
    }

    /// Measure and compensate temperature (degC) and pressure (hPa).
    pub fn read_temperature_and_pressure(&mut self) -> Result<Bmp180Readings, SensorError> {
        let sample = self.read_raw()?;
        let readings = Bmp180Readings::from(compensation::compensate(&self.calibration, sample)?);
        debug!(
            "BMP180: ut={} up={} -> {} C, {} hPa",
            sample.ut, sample.up, readings.temperature_celsius, readings.pressure_hpa
        );
        Ok(readings)
    }

    /// Give the bus handle and delay back.
    pub fn release(self) -> (I, D) {
        (self.i2c, self.delay)
    }
}

impl<I: I2c, D: DelayNs> Sensor for Bmp180<I, D> {
    type Readings = Bmp180Readings;
    const DEVICE: KnownDevice = KnownDevice::Bmp180;

    fn read(&mut self) -> Result<Bmp180Readings, SensorError> {
        self.read_temperature_and_pressure()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::test_support::{FakeBus, NoDelay};

    /// Worked example from the BMP180 datasheet.
    pub(crate) const DATASHEET_CALIBRATION: CalibrationCoefficients = CalibrationCoefficients {
        ac1: 408,
        ac2: -72,
        ac3: -14383,
        ac4: 32741,
        ac5: 32757,
        ac6: 23153,
        b1: 6190,
        b2: 4,
        mb: -32768,
        mc: -8711,
        md: 2868,
    };

    fn initialized_bus() -> FakeBus {
        let mut bus = FakeBus::default();
        bus.respond(0x77, &[0x55]);
        bus.respond(0x77, &DATASHEET_CALIBRATION.to_bytes());
        bus
    }

    #[test]
    fn test_new_keeps_calibration() {
        let sensor = Bmp180::new(initialized_bus(), NoDelay::default()).unwrap();
        assert_eq!(sensor.calibration(), &DATASHEET_CALIBRATION);
    }

    #[test]
    fn test_measurement_sequence() {
        let mut bus = initialized_bus();
        bus.respond(0x77, &[0x6C, 0xFA]);
        bus.respond(0x77, &[0x5D, 0x23, 0x00]);
        let mut sensor = Bmp180::new(bus, NoDelay::default()).unwrap();

        let readings = sensor.read_temperature_and_pressure().unwrap();
        assert_eq!(readings.temperature_celsius, 15.0);
        assert_eq!(readings.pressure_hpa, (69964.0f64 / 100.0) as f32);

        let (bus, delay) = sensor.release();
        // chip id, calibration, two commands and two data reads
        assert_eq!(bus.writes_to(0x77), 6);
        assert_eq!(bus.last_write(0x77), Some(vec![0xF6]));
        assert_eq!(delay.total_ms, 2 * CONVERSION_SETTLE_MS);
    }

    #[test]
    fn test_bus_failure_mid_measurement() {
        let mut bus = initialized_bus();
        bus.respond(0x77, &[0x6C, 0xFA]);
        // nothing queued for the pressure read
        let mut sensor = Bmp180::new(bus, NoDelay::default()).unwrap();

        assert_eq!(
            sensor.read(),
            Err(SensorError::Bus {
                sensor: "BMP180",
                operation: "read pressure",
            })
        );
    }

    #[test]
    fn test_pressure_command_selects_lowest_oversampling() {
        assert_eq!(CMD_PRESSURE, 0x34);
    }
}
