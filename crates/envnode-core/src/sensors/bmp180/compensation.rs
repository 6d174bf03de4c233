//! Datasheet fixed-point compensation for the BMP180.
//!
//! Every step uses the same integer widths and shift amounts as the reference
//! algorithm: 32-bit signed intermediates, 32-bit unsigned `b4`/`b7`. Overflow
//! wraps exactly as it does on the 32-bit reference implementation.

use crate::sensors::SensorError;

use super::{CalibrationCoefficients, SENSOR};

/// Oversampling setting. Fixed at "ultra low power".
pub const OVERSAMPLING: u8 = 0;

const ZERO_DIVISOR: SensorError = SensorError::Compensation { sensor: SENSOR };

/// Uncompensated values as read from the data registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawPressureTempSample {
    pub ut: i32,
    pub up: i32,
}

impl RawPressureTempSample {
    pub fn from_registers(temperature: [u8; 2], pressure: [u8; 3]) -> Self {
        let ut = i32::from(u16::from_be_bytes(temperature));
        let up = ((i32::from(pressure[0]) << 16)
            | (i32::from(pressure[1]) << 8)
            | i32::from(pressure[2]))
            >> (8 - OVERSAMPLING);
        Self { ut, up }
    }
}

/// Compensated output in the device's native units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compensated {
    /// Temperature in 0.1 degC.
    pub temperature_deci_celsius: i32,
    /// Pressure in Pa.
    pub pressure_pa: i32,
}

/// First stage: true temperature plus the shared intermediate `b5`.
pub fn compensate_temperature(
    calibration: &CalibrationCoefficients,
    ut: i32,
) -> Result<(i32, i32), SensorError> {
    let x1 = ut
        .wrapping_sub(i32::from(calibration.ac6))
        .wrapping_mul(i32::from(calibration.ac5))
        >> 15;
    let x2 = (i32::from(calibration.mc) << 11)
        .checked_div(x1.wrapping_add(i32::from(calibration.md)))
        .ok_or(ZERO_DIVISOR)?;
    let b5 = x1.wrapping_add(x2);
    let temperature = b5.wrapping_add(8) >> 4;

    Ok((temperature, b5))
}

/// Second stage: true pressure in Pa.
pub fn compensate_pressure(
    calibration: &CalibrationCoefficients,
    up: i32,
    b5: i32,
) -> Result<i32, SensorError> {
    let b6 = b5.wrapping_sub(4000);
    let b6_squared = b6.wrapping_mul(b6) >> 12;

    let x1 = i32::from(calibration.b2).wrapping_mul(b6_squared) >> 11;
    let x2 = i32::from(calibration.ac2).wrapping_mul(b6) >> 11;
    let x3 = x1.wrapping_add(x2);
    let b3 = ((i32::from(calibration.ac1).wrapping_mul(4).wrapping_add(x3) << OVERSAMPLING)
        .wrapping_add(2))
        >> 2;

    let x1 = i32::from(calibration.ac3).wrapping_mul(b6) >> 13;
    let x2 = i32::from(calibration.b1).wrapping_mul(b6_squared) >> 16;
    let x3 = x1.wrapping_add(x2).wrapping_add(2) >> 2;
    let b4 = u32::from(calibration.ac4).wrapping_mul(x3.wrapping_add(32768) as u32) >> 15;
    let b7 = (up as u32)
        .wrapping_sub(b3 as u32)
        .wrapping_mul(50000 >> OVERSAMPLING);

    if b4 == 0 {
        return Err(ZERO_DIVISOR);
    }

    // Keep the quotient inside 32 bits: multiply first only while b7 * 2
    // cannot carry out.
    let p = (if b7 < 0x8000_0000 {
        (b7 * 2) / b4
    } else {
        (b7 / b4).wrapping_mul(2)
    }) as i32;

    let x1 = (p >> 8).wrapping_mul(p >> 8);
    let x1 = x1.wrapping_mul(3038) >> 16;
    let x2 = (-7357i32).wrapping_mul(p) >> 16;

    Ok(p.wrapping_add(x1.wrapping_add(x2).wrapping_add(3791) >> 4))
}

/// Run both stages on one raw sample.
pub fn compensate(
    calibration: &CalibrationCoefficients,
    sample: RawPressureTempSample,
) -> Result<Compensated, SensorError> {
    let (temperature_deci_celsius, b5) = compensate_temperature(calibration, sample.ut)?;
    let pressure_pa = compensate_pressure(calibration, sample.up, b5)?;

    Ok(Compensated {
        temperature_deci_celsius,
        pressure_pa,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::bmp180::tests::DATASHEET_CALIBRATION;

    const DATASHEET_SAMPLE: RawPressureTempSample = RawPressureTempSample { ut: 27898, up: 23843 };

    #[test]
    fn test_datasheet_vector() {
        let (temperature, b5) = compensate_temperature(&DATASHEET_CALIBRATION, 27898).unwrap();
        assert_eq!(b5, 2400);
        assert_eq!(temperature, 150);

        let result = compensate(&DATASHEET_CALIBRATION, DATASHEET_SAMPLE).unwrap();
        assert_eq!(
            result,
            Compensated {
                temperature_deci_celsius: 150,
                pressure_pa: 69964,
            }
        );
    }

    #[test]
    fn test_repeated_calls_are_identical() {
        let first = compensate(&DATASHEET_CALIBRATION, DATASHEET_SAMPLE).unwrap();
        for _ in 0..16 {
            assert_eq!(compensate(&DATASHEET_CALIBRATION, DATASHEET_SAMPLE).unwrap(), first);
        }
    }

    #[test]
    fn test_high_b7_takes_divide_first_branch() {
        // up > b3 by enough that b7 crosses 2^31
        let pressure = compensate_pressure(&DATASHEET_CALIBRATION, 60000, 2400).unwrap();
        assert_eq!(pressure, 178458);
    }

    #[test]
    fn test_wrapped_b7_matches_reference() {
        // up < b3 wraps b7 around in unsigned arithmetic
        let pressure = compensate_pressure(&DATASHEET_CALIBRATION, 0, 2400).unwrap();
        assert_eq!(pressure, 252712);
    }

    #[test]
    fn test_zero_divisor_is_an_error() {
        // x1 + md == 0 when ut == ac6
        let calibration = CalibrationCoefficients {
            md: 0,
            ..DATASHEET_CALIBRATION
        };
        assert_eq!(
            compensate_temperature(&calibration, i32::from(calibration.ac6)),
            Err(SensorError::Compensation { sensor: "BMP180" })
        );

        let calibration = CalibrationCoefficients {
            ac4: 0,
            ..DATASHEET_CALIBRATION
        };
        assert_eq!(
            compensate_pressure(&calibration, 23843, 2400),
            Err(SensorError::Compensation { sensor: "BMP180" })
        );
    }

    #[test]
    fn test_raw_pressure_drops_low_byte_at_lowest_oversampling() {
        let sample = RawPressureTempSample::from_registers([0x6C, 0xFA], [0x5D, 0x23, 0xFF]);
        assert_eq!(sample, DATASHEET_SAMPLE);
    }
}
