//! Combines both sensors into one reading per acquisition cycle.

use log::{info, warn};

use super::{Aht20Readings, Bmp180Readings, Sensor, SensorError, SensorReading, TickSource};

/// Holds whichever sensors initialized and reads them in a fixed order.
///
/// A sensor that failed initialization is passed as `None` and stays
/// unavailable for the life of the aggregator.
pub struct SensorAggregator<H, P, C> {
    humidity_sensor: Option<H>,
    pressure_sensor: Option<P>,
    clock: C,
}

impl<H, P, C> SensorAggregator<H, P, C>
where
    H: Sensor<Readings = Aht20Readings>,
    P: Sensor<Readings = Bmp180Readings>,
    C: TickSource,
{
    pub fn new(humidity_sensor: Option<H>, pressure_sensor: Option<P>, clock: C) -> Self {
        if humidity_sensor.is_none() {
            warn!("{} not initialized, humidity will be reported as default", H::DEVICE.name());
        }
        if pressure_sensor.is_none() {
            warn!("{} not initialized, pressure will be reported as default", P::DEVICE.name());
        }

        Self {
            humidity_sensor,
            pressure_sensor,
            clock,
        }
    }

    /// Build from driver constructors that may have failed.
    pub fn from_init_results(
        humidity_sensor: Result<H, SensorError>,
        pressure_sensor: Result<P, SensorError>,
        clock: C,
    ) -> Self {
        Self::new(
            humidity_sensor.map_err(|e| warn!("{}", e)).ok(),
            pressure_sensor.map_err(|e| warn!("{}", e)).ok(),
            clock,
        )
    }

    /// Read both sensors, humidity device first. Never fails.
    pub fn acquire(&mut self) -> SensorReading {
        let timestamp = self.clock.now_ms();

        let aht20 = read_optional(self.humidity_sensor.as_mut());
        let bmp180 = read_optional(self.pressure_sensor.as_mut());

        let reading = SensorReading::combine(aht20, bmp180, timestamp);
        info!(
            "Sensor data - temp: {} C, humidity: {} %, pressure: {} hPa",
            reading.temperature, reading.humidity, reading.pressure
        );
        reading
    }

    pub fn humidity_sensor_present(&self) -> bool {
        self.humidity_sensor.is_some()
    }

    pub fn pressure_sensor_present(&self) -> bool {
        self.pressure_sensor.is_some()
    }
}

fn read_optional<S: Sensor>(sensor: Option<&mut S>) -> Option<S::Readings> {
    let sensor = sensor?;
    match sensor.read() {
        Ok(readings) => Some(readings),
        Err(e) => {
            warn!("Failed to read {}: {}", S::DEVICE.name(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::{KnownDevice, TemperatureSource};
    use crate::test_support::FixedTicks;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    const BUS_ERROR: SensorError = SensorError::Bus {
        sensor: "fake",
        operation: "read",
    };

    /// Sensor returning scripted results and logging the read order.
    struct ScriptedSensor<R> {
        results: VecDeque<Result<R, SensorError>>,
        order: Rc<RefCell<Vec<KnownDevice>>>,
    }

    impl<R> ScriptedSensor<R> {
        fn new(order: &Rc<RefCell<Vec<KnownDevice>>>, results: Vec<Result<R, SensorError>>) -> Self {
            Self {
                results: results.into(),
                order: Rc::clone(order),
            }
        }
    }

    impl Sensor for ScriptedSensor<Aht20Readings> {
        type Readings = Aht20Readings;
        const DEVICE: KnownDevice = KnownDevice::Aht20;

        fn read(&mut self) -> Result<Aht20Readings, SensorError> {
            self.order.borrow_mut().push(Self::DEVICE);
            self.results.pop_front().unwrap_or(Err(BUS_ERROR))
        }
    }

    impl Sensor for ScriptedSensor<Bmp180Readings> {
        type Readings = Bmp180Readings;
        const DEVICE: KnownDevice = KnownDevice::Bmp180;

        fn read(&mut self) -> Result<Bmp180Readings, SensorError> {
            self.order.borrow_mut().push(Self::DEVICE);
            self.results.pop_front().unwrap_or(Err(BUS_ERROR))
        }
    }

    const AHT: Aht20Readings = Aht20Readings {
        temperature_celsius: 22.5,
        humidity_percent: 41.0,
    };
    const BMP: Bmp180Readings = Bmp180Readings {
        temperature_celsius: 23.1,
        pressure_hpa: 1001.5,
    };

    type Aggregator =
        SensorAggregator<ScriptedSensor<Aht20Readings>, ScriptedSensor<Bmp180Readings>, FixedTicks>;

    fn aggregator(
        aht: Vec<Result<Aht20Readings, SensorError>>,
        bmp: Vec<Result<Bmp180Readings, SensorError>>,
    ) -> (Aggregator, Rc<RefCell<Vec<KnownDevice>>>) {
        let order = Rc::new(RefCell::new(Vec::new()));
        let aggregator = SensorAggregator::new(
            Some(ScriptedSensor::new(&order, aht)),
            Some(ScriptedSensor::new(&order, bmp)),
            FixedTicks(4242),
        );
        (aggregator, order)
    }

    #[test]
    fn test_humidity_device_temperature_wins() {
        let (mut aggregator, order) = aggregator(vec![Ok(AHT)], vec![Ok(BMP)]);
        let reading = aggregator.acquire();

        assert_eq!(reading.temperature, 22.5);
        assert_eq!(reading.temperature_source, TemperatureSource::Aht20);
        assert_eq!(reading.humidity(), Some(41.0));
        assert_eq!(reading.pressure(), Some(1001.5));
        assert_eq!(reading.timestamp, 4242);
        assert_eq!(*order.borrow(), vec![KnownDevice::Aht20, KnownDevice::Bmp180]);
    }

    #[test]
    fn test_humidity_failure_falls_back_to_pressure_device() {
        let (mut aggregator, _) = aggregator(vec![Err(BUS_ERROR)], vec![Ok(BMP)]);
        let reading = aggregator.acquire();

        assert!(!reading.aht20_available);
        assert!(reading.bmp180_available);
        assert_eq!(reading.humidity(), None);
        assert_eq!(reading.humidity, 50.0);
        assert_eq!(reading.temperature, 23.1);
        assert_eq!(reading.temperature_source, TemperatureSource::Bmp180);
        assert_eq!(reading.pressure, 1001.5);
    }

    #[test]
    fn test_pressure_failure_keeps_humidity_data() {
        let (mut aggregator, _) = aggregator(vec![Ok(AHT)], vec![Err(BUS_ERROR)]);
        let reading = aggregator.acquire();

        assert_eq!(reading.temperature, 22.5);
        assert_eq!(reading.humidity(), Some(41.0));
        assert_eq!(reading.pressure(), None);
        assert_eq!(reading.pressure, 1013.2);
    }

    #[test]
    fn test_both_failing_yields_defaults() {
        let (mut aggregator, _) = aggregator(vec![Err(BUS_ERROR)], vec![Err(BUS_ERROR)]);
        let reading = aggregator.acquire();

        assert_eq!(reading.temperature, 25.0);
        assert_eq!(reading.humidity, 50.0);
        assert_eq!(reading.pressure, 1013.2);
        assert_eq!(reading.temperature_source, TemperatureSource::Default);
        assert!(!reading.has_measured_temperature());
    }

    #[test]
    fn test_uninitialized_sensor_is_never_read() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut aggregator: Aggregator = SensorAggregator::from_init_results(
            Err(BUS_ERROR),
            Ok(ScriptedSensor::new(&order, vec![Ok(BMP), Ok(BMP)])),
            FixedTicks(0),
        );

        assert!(!aggregator.humidity_sensor_present());
        for _ in 0..2 {
            let reading = aggregator.acquire();
            assert!(!reading.aht20_available);
            assert_eq!(reading.temperature, 23.1);
        }
        assert_eq!(*order.borrow(), vec![KnownDevice::Bmp180, KnownDevice::Bmp180]);
    }

    #[test]
    fn test_transient_failure_recovers_next_cycle() {
        let (mut aggregator, _) = aggregator(vec![Err(BUS_ERROR), Ok(AHT)], vec![Ok(BMP), Ok(BMP)]);

        assert!(!aggregator.acquire().aht20_available);
        assert!(aggregator.acquire().aht20_available);
    }
}
