//! Register-level models of the AHT20 and BMP180 behind one simulated bus.

use core::ops::RangeInclusive;

use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};
use envnode_core::KnownDevice;
use envnode_core::sensors::CalibrationCoefficients;
use envnode_core::sensors::bmp180::compensation::{compensate_pressure, compensate_temperature};
use log::{debug, warn};

const AHT20_TRIGGER: [u8; 3] = [0xAC, 0x33, 0x00];
const AHT20_STATUS_CALIBRATED: u8 = 0x08;
const FULL_SCALE: f64 = (1u32 << 20) as f64;

const BMP180_CHIP_ID: u8 = 0x55;
const BMP180_REG_CHIP_ID: u8 = 0xD0;
const BMP180_REG_CALIBRATION: u8 = 0xAA;
const BMP180_REG_CONTROL: u8 = 0xF4;
const BMP180_REG_DATA: u8 = 0xF6;
const BMP180_CMD_TEMPERATURE: u8 = 0x2E;

/// Temperature sweep bounds, degC.
const SWEEP_MIN: f64 = 20.0;
const SWEEP_MAX: f64 = 35.0;

/// Calibration of the worked example in the BMP180 datasheet.
const DATASHEET_CALIBRATION: CalibrationCoefficients = CalibrationCoefficients {
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

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// The air both sensors sit in. Temperature sweeps up and down between 20
/// and 35 degC so the relay thresholds get crossed in both directions.
pub struct Environment {
    pub temperature: f64,
    pub humidity: f64,
    pub pressure_pa: f64,
    step: f64,
    ticks: u32,
}

impl Environment {
    pub fn new(temperature: f64, step: f64) -> Self {
        Self {
            temperature,
            humidity: 50.0,
            pressure_pa: 101_325.0,
            step,
            ticks: 0,
        }
    }

    fn advance(&mut self) {
        self.ticks += 1;
        self.temperature += self.step;
        if self.temperature >= SWEEP_MAX || self.temperature <= SWEEP_MIN {
            self.step = -self.step;
        }

        let t = f64::from(self.ticks);
        self.humidity = 50.0 + 8.0 * (t / 9.0).sin();
        self.pressure_pa = 101_325.0 + 150.0 * (t / 13.0).cos();
    }
}

// ---------------------------------------------------------------------------
// AHT20
// ---------------------------------------------------------------------------

struct Aht20Model {
    pending: Option<[u8; 6]>,
    triggers: u32,
    /// NACK every n-th trigger.
    fault_every: Option<u32>,
}

impl Aht20Model {
    fn write(&mut self, environment: &mut Environment, bytes: &[u8]) -> Result<(), ErrorKind> {
        if bytes != AHT20_TRIGGER {
            return Ok(());
        }

        environment.advance();
        self.triggers += 1;
        if self.fault_every.is_some_and(|n| n > 0 && self.triggers % n == 0) {
            warn!("Simulated AHT20 fault on trigger {}", self.triggers);
            self.pending = None;
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }

        self.pending = Some(aht20_frame(environment.temperature, environment.humidity));
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<(), ErrorKind> {
        let frame = self.pending.take().ok_or(ErrorKind::Other)?;
        let len = buf.len().min(frame.len());
        buf[..len].copy_from_slice(&frame[..len]);
        Ok(())
    }
}

/// Encode a measurement the way the AHT20 reports it.
fn aht20_frame(temperature: f64, humidity: f64) -> [u8; 6] {
    let scale = |fraction: f64| (fraction.clamp(0.0, 1.0) * FULL_SCALE).round().min(FULL_SCALE - 1.0) as u32;
    let humidity = scale(humidity / 100.0);
    let temperature = scale((temperature + 50.0) / 200.0);

    [
        AHT20_STATUS_CALIBRATED,
        (humidity >> 12) as u8,
        (humidity >> 4) as u8,
        ((humidity << 4) as u8 & 0xF0) | ((temperature >> 16) as u8 & 0x0F),
        (temperature >> 8) as u8,
        temperature as u8,
    ]
}

// ---------------------------------------------------------------------------
// BMP180
// ---------------------------------------------------------------------------

struct Bmp180Model {
    calibration: CalibrationCoefficients,
    register: u8,
    command: u8,
    /// Offset from the AHT20 temperature, degC.
    temperature_offset: f64,
}

impl Bmp180Model {
    fn write(&mut self, bytes: &[u8]) {
        match *bytes {
            [BMP180_REG_CONTROL, command] => self.command = command,
            [register] => self.register = register,
            _ => debug!("Simulated BMP180 ignoring write {:02x?}", bytes),
        }
    }

    fn read(&self, environment: &Environment, buf: &mut [u8]) -> Result<(), ErrorKind> {
        let data = match self.register {
            BMP180_REG_CHIP_ID => vec![BMP180_CHIP_ID],
            BMP180_REG_CALIBRATION => self.calibration.to_bytes().to_vec(),
            BMP180_REG_DATA => {
                let (ut, b5) = self.uncompensated_temperature(environment.temperature + self.temperature_offset);
                if self.command == BMP180_CMD_TEMPERATURE {
                    (ut as u16).to_be_bytes().to_vec()
                } else {
                    let up = self.uncompensated_pressure(environment.pressure_pa, b5);
                    vec![(up >> 8) as u8, up as u8, 0]
                }
            }
            _ => return Err(ErrorKind::Other),
        };

        let len = buf.len().min(data.len());
        buf[..len].copy_from_slice(&data[..len]);
        Ok(())
    }

    /// Raw temperature that compensates to `celsius`, with its `b5`.
    fn uncompensated_temperature(&self, celsius: f64) -> (i32, i32) {
        let target = (celsius * 10.0).round() as i32;
        let ut = lowest_input(0..=0xFFFF, target, |ut| {
            compensate_temperature(&self.calibration, ut).ok().map(|(t, _)| t)
        });
        let b5 = compensate_temperature(&self.calibration, ut).map_or(0, |(_, b5)| b5);
        (ut, b5)
    }

    /// Raw pressure that compensates to `pressure_pa` at `b5`.
    fn uncompensated_pressure(&self, pressure_pa: f64, b5: i32) -> i32 {
        lowest_input(1_000..=0xFFFF, pressure_pa.round() as i32, |up| {
            compensate_pressure(&self.calibration, up, b5).ok()
        })
    }
}

/// Smallest input in `range` whose monotonic `output` reaches `target`.
fn lowest_input(range: RangeInclusive<i32>, target: i32, output: impl Fn(i32) -> Option<i32>) -> i32 {
    let (mut low, mut high) = range.into_inner();
    while low < high {
        let mid = low + (high - low) / 2;
        match output(mid) {
            Some(value) if value >= target => high = mid,
            _ => low = mid + 1,
        }
    }
    low
}

// ---------------------------------------------------------------------------
// Bus
// ---------------------------------------------------------------------------

/// An I2C bus with an AHT20 at 0x38 and a BMP180 at 0x77. Any other address
/// NACKs.
pub struct SimulatedBus {
    environment: Environment,
    aht20: Aht20Model,
    bmp180: Bmp180Model,
}

impl SimulatedBus {
    pub fn new(environment: Environment, aht20_fault_every: Option<u32>) -> Self {
        Self {
            environment,
            aht20: Aht20Model {
                pending: None,
                triggers: 0,
                fault_every: aht20_fault_every,
            },
            bmp180: Bmp180Model {
                calibration: DATASHEET_CALIBRATION,
                register: 0,
                command: 0,
                temperature_offset: 0.3,
            },
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }
}

impl ErrorType for SimulatedBus {
    type Error = ErrorKind;
}

impl I2c for SimulatedBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let device = KnownDevice::from_address(address)
            .ok_or(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address))?;

        for operation in operations {
            match (device, operation) {
                (KnownDevice::Aht20, Operation::Write(bytes)) => {
                    self.aht20.write(&mut self.environment, bytes)?
                }
                (KnownDevice::Aht20, Operation::Read(buf)) => self.aht20.read(buf)?,
                (KnownDevice::Bmp180, Operation::Write(bytes)) => self.bmp180.write(bytes),
                (KnownDevice::Bmp180, Operation::Read(buf)) => {
                    self.bmp180.read(&self.environment, buf)?
                }
            }
        }
        Ok(())
    }
}
