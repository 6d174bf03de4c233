use serde::{Deserialize, Serialize};

use super::{Aht20Readings, Bmp180Readings};

/// Substituted when no sensor supplied a temperature.
pub const DEFAULT_TEMPERATURE_CELSIUS: f32 = 25.0;
/// Substituted when the AHT20 is unavailable.
pub const DEFAULT_HUMIDITY_PERCENT: f32 = 50.0;
/// Substituted when the BMP180 is unavailable.
pub const DEFAULT_PRESSURE_HPA: f32 = 1013.2;

/// Which device the combined temperature came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemperatureSource {
    Aht20,
    Bmp180,
    /// Neither sensor answered; the value is the documented default.
    Default,
}

/// One combined acquisition.
///
/// The top-level fields always hold a usable value: real data where a sensor
/// answered, the documented default otherwise. The availability flags say
/// which is which; the per-device blocks keep each sensor's own output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub temperature: f32,
    pub humidity: f32,
    pub pressure: f32,
    pub temperature_source: TemperatureSource,
    pub aht20_available: bool,
    pub bmp180_available: bool,
    pub aht20: Option<Aht20Readings>,
    pub bmp180: Option<Bmp180Readings>,
    /// Milliseconds since boot when the acquisition started.
    pub timestamp: u32,
}

impl SensorReading {
    /// Combine per-device results, applying the fallback rules.
    pub fn combine(
        aht20: Option<Aht20Readings>,
        bmp180: Option<Bmp180Readings>,
        timestamp: u32,
    ) -> Self {
        let (temperature, temperature_source) = match (aht20, bmp180) {
            (Some(aht), _) => (aht.temperature_celsius, TemperatureSource::Aht20),
            (None, Some(bmp)) => (bmp.temperature_celsius, TemperatureSource::Bmp180),
            (None, None) => (DEFAULT_TEMPERATURE_CELSIUS, TemperatureSource::Default),
        };

        Self {
            temperature,
            humidity: aht20.map_or(DEFAULT_HUMIDITY_PERCENT, |r| r.humidity_percent),
            pressure: bmp180.map_or(DEFAULT_PRESSURE_HPA, |r| r.pressure_hpa),
            temperature_source,
            aht20_available: aht20.is_some(),
            bmp180_available: bmp180.is_some(),
            aht20,
            bmp180,
            timestamp,
        }
    }

    /// Humidity, or `None` when the value is a substituted default.
    pub fn humidity(&self) -> Option<f32> {
        self.aht20_available.then_some(self.humidity)
    }

    /// Pressure, or `None` when the value is a substituted default.
    pub fn pressure(&self) -> Option<f32> {
        self.bmp180_available.then_some(self.pressure)
    }

    /// True when the temperature is a real measurement.
    pub fn has_measured_temperature(&self) -> bool {
        self.temperature_source != TemperatureSource::Default
    }
}

/// Humidity device block of a [`ReadingReport`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HumidityBlock {
    pub temperature: f32,
    pub humidity: f32,
    pub available: bool,
}

/// Pressure device block of a [`ReadingReport`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PressureBlock {
    pub temperature: f32,
    pub pressure: f32,
    pub available: bool,
}

/// Per-device view of a reading, shaped for the sensor endpoint.
///
/// An unavailable device reports zeros with `available: false`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReadingReport {
    pub aht20: HumidityBlock,
    pub bmp180: PressureBlock,
    pub timestamp: u32,
}

impl From<&SensorReading> for ReadingReport {
    fn from(reading: &SensorReading) -> Self {
        let (temperature, humidity) = reading
            .aht20
            .map_or((0.0, 0.0), |r| (r.temperature_celsius, r.humidity_percent));
        let aht20 = HumidityBlock {
            temperature,
            humidity,
            available: reading.aht20_available,
        };

        let (temperature, pressure) = reading
            .bmp180
            .map_or((0.0, 0.0), |r| (r.temperature_celsius, r.pressure_hpa));
        let bmp180 = PressureBlock {
            temperature,
            pressure,
            available: reading.bmp180_available,
        };

        Self {
            aht20,
            bmp180,
            timestamp: reading.timestamp,
        }
    }
}
