//! BMP180 factory calibration block.
//!
//! Binary format (big-endian, 22 bytes starting at register `0xAA`):
//! - ac1, ac2, ac3: 3 x i16
//! - ac4, ac5, ac6: 3 x u16
//! - b1, b2, mb, mc, md: 5 x i16

use embedded_hal::i2c::I2c;
use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::sensors::{KnownDevice, SensorError};

use super::SENSOR;

/// Size of the calibration block in bytes.
pub const CALIBRATION_LEN: usize = 22;

const REG_CHIP_ID: u8 = 0xD0;
const REG_CALIBRATION: u8 = 0xAA;
const CHIP_ID: u8 = 0x55;

/// Per-device compensation constants, programmed at manufacture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationCoefficients {
    pub ac1: i16,
    pub ac2: i16,
    pub ac3: i16,
    pub ac4: u16,
    pub ac5: u16,
    pub ac6: u16,
    pub b1: i16,
    pub b2: i16,
    pub mb: i16,
    pub mc: i16,
    pub md: i16,
}

impl CalibrationCoefficients {
    /// Parse the raw block as read from the device.
    pub fn from_bytes(bytes: &[u8; CALIBRATION_LEN]) -> Self {
        let word = |i: usize| [bytes[2 * i], bytes[2 * i + 1]];

        Self {
            ac1: i16::from_be_bytes(word(0)),
            ac2: i16::from_be_bytes(word(1)),
            ac3: i16::from_be_bytes(word(2)),
            ac4: u16::from_be_bytes(word(3)),
            ac5: u16::from_be_bytes(word(4)),
            ac6: u16::from_be_bytes(word(5)),
            b1: i16::from_be_bytes(word(6)),
            b2: i16::from_be_bytes(word(7)),
            mb: i16::from_be_bytes(word(8)),
            mc: i16::from_be_bytes(word(9)),
            md: i16::from_be_bytes(word(10)),
        }
    }

    /// Encode back into the device layout.
    pub fn to_bytes(&self) -> [u8; CALIBRATION_LEN] {
        let words = [
            self.ac1.to_be_bytes(),
            self.ac2.to_be_bytes(),
            self.ac3.to_be_bytes(),
            self.ac4.to_be_bytes(),
            self.ac5.to_be_bytes(),
            self.ac6.to_be_bytes(),
            self.b1.to_be_bytes(),
            self.b2.to_be_bytes(),
            self.mb.to_be_bytes(),
            self.mc.to_be_bytes(),
            self.md.to_be_bytes(),
        ];

        let mut bytes = [0u8; CALIBRATION_LEN];
        for (chunk, word) in bytes.chunks_exact_mut(2).zip(words) {
            chunk.copy_from_slice(&word);
        }
        bytes
    }

    /// An unprogrammed part reads back zero for `ac1..ac3`.
    pub fn is_programmed(&self) -> bool {
        !(self.ac1 == 0 && self.ac2 == 0 && self.ac3 == 0)
    }
}

/// Identify the device and read its calibration block.
///
/// Runs once at startup. Nothing is retried: a part that fails here stays
/// unavailable until the next boot.
pub fn load_calibration<I: I2c>(i2c: &mut I) -> Result<CalibrationCoefficients, SensorError> {
    let address = KnownDevice::Bmp180.address();

    let mut chip_id = [0u8; 1];
    i2c.write_read(address, &[REG_CHIP_ID], &mut chip_id)
        .map_err(|e| {
            error!("Failed to read BMP180 chip id: {:?}", e);
            SensorError::Bus {
                sensor: SENSOR,
                operation: "read chip id",
            }
        })?;

    if chip_id[0] != CHIP_ID {
        error!("Expected BMP180 ({:#04x}), got {:#04x}", CHIP_ID, chip_id[0]);
        return Err(SensorError::DeviceNotPresent {
            sensor: SENSOR,
            expected: CHIP_ID,
            found: chip_id[0],
        });
    }

    let mut block = [0u8; CALIBRATION_LEN];
    i2c.write_read(address, &[REG_CALIBRATION], &mut block)
        .map_err(|e| {
            error!("Failed to read BMP180 calibration data: {:?}", e);
            SensorError::Bus {
                sensor: SENSOR,
                operation: "read calibration block",
            }
        })?;

    let calibration = CalibrationCoefficients::from_bytes(&block);
    if !calibration.is_programmed() {
        error!("BMP180 calibration data invalid, ac1..ac3 are all zero");
        return Err(SensorError::InvalidCalibration { sensor: SENSOR });
    }

    info!("BMP180 calibration coefficients loaded");
    Ok(calibration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::bmp180::tests::DATASHEET_CALIBRATION;
    use crate::test_support::FakeBus;

    #[test]
    fn test_round_trip_preserves_all_fields() {
        let bytes = DATASHEET_CALIBRATION.to_bytes();
        assert_eq!(CalibrationCoefficients::from_bytes(&bytes), DATASHEET_CALIBRATION);

        let extremes = CalibrationCoefficients {
            ac1: i16::MIN,
            ac2: i16::MAX,
            ac3: -1,
            ac4: u16::MAX,
            ac5: 0x8000,
            ac6: 1,
            b1: -2,
            b2: 0x0102,
            mb: i16::MIN,
            mc: 0x7F00,
            md: -256,
        };
        assert_eq!(CalibrationCoefficients::from_bytes(&extremes.to_bytes()), extremes);
    }

    #[test]
    fn test_layout_is_big_endian_in_device_order() {
        let bytes = DATASHEET_CALIBRATION.to_bytes();
        // ac1 = 408
        assert_eq!(&bytes[0..2], &[0x01, 0x98]);
        // ac4 = 32741
        assert_eq!(&bytes[6..8], &[0x7F, 0xE5]);
        // md = 2868
        assert_eq!(&bytes[20..22], &[0x0B, 0x34]);
    }

    #[test]
    fn test_unsigned_fields_keep_high_bit() {
        let mut bytes = [0u8; CALIBRATION_LEN];
        bytes[0] = 0x01;
        bytes[8] = 0xFF;
        bytes[9] = 0xFE;
        let calibration = CalibrationCoefficients::from_bytes(&bytes);
        assert_eq!(calibration.ac5, 0xFFFE);
        assert_eq!(calibration.ac1, 0x0100);
    }

    #[test]
    fn test_zeroed_leading_coefficients_are_rejected() {
        let mut bus = FakeBus::default();
        bus.respond(0x77, &[0x55]);
        let mut block = DATASHEET_CALIBRATION.to_bytes();
        block[..6].fill(0);
        bus.respond(0x77, &block);

        assert_eq!(
            load_calibration(&mut bus),
            Err(SensorError::InvalidCalibration { sensor: "BMP180" })
        );
    }

    #[test]
    fn test_any_leading_coefficient_marks_programmed() {
        let mut block = [0u8; CALIBRATION_LEN];
        assert!(!CalibrationCoefficients::from_bytes(&block).is_programmed());
        block[5] = 1;
        assert!(CalibrationCoefficients::from_bytes(&block).is_programmed());
    }

    #[test]
    fn test_wrong_chip_id_is_not_retried() {
        let mut bus = FakeBus::default();
        bus.respond(0x77, &[0x58]);
        bus.respond(0x77, &DATASHEET_CALIBRATION.to_bytes());

        assert_eq!(
            load_calibration(&mut bus),
            Err(SensorError::DeviceNotPresent {
                sensor: "BMP180",
                expected: 0x55,
                found: 0x58,
            })
        );
        // only the identification read went out
        assert_eq!(bus.writes_to(0x77), 1);
    }

    #[test]
    fn test_missing_device_is_a_bus_error() {
        let mut bus = FakeBus::default();
        bus.fail_address(0x77);

        assert_eq!(
            load_calibration(&mut bus),
            Err(SensorError::Bus {
                sensor: "BMP180",
                operation: "read chip id",
            })
        );
    }
}
