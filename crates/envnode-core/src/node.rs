//! One acquisition-and-control cycle.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal::digital::OutputPin;
use log::{error, warn};

use crate::control::{ControlError, RelayState, SharedRelayController};
use crate::sensors::{Aht20Readings, Bmp180Readings, Sensor, SensorAggregator, SensorReading, TickSource};
use crate::storage::ConfigStore;

/// What one cycle observed and did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleReport {
    pub reading: SensorReading,
    /// Set when the controller switched the relay.
    pub transition: Option<RelayState>,
    pub control_error: Option<ControlError>,
}

/// Acquire a reading and feed its temperature to the controller.
///
/// Never fails: control errors are logged and reported in the result, and the
/// next cycle runs as usual.
pub fn run_cycle<H, P, C, M, S, O>(
    sensors: &mut SensorAggregator<H, P, C>,
    relay: &SharedRelayController<M, S, O>,
) -> CycleReport
where
    H: Sensor<Readings = Aht20Readings>,
    P: Sensor<Readings = Bmp180Readings>,
    C: TickSource,
    M: RawMutex,
    S: ConfigStore,
    O: OutputPin,
{
    let reading = sensors.acquire();
    if !reading.has_measured_temperature() {
        warn!("No sensor supplied a temperature, controlling on the default value");
    }

    let (transition, control_error) = match relay.apply_reading(reading.temperature) {
        Ok(transition) => (transition, None),
        Err(e) => {
            error!("Relay control failed: {}", e);
            (None, Some(e))
        }
    };

    CycleReport {
        reading,
        transition,
        control_error,
    }
}
