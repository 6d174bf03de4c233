//! Desktop simulator for the envnode sensing and relay control node.
//!
//! Runs the real drivers, aggregator and relay controller from `envnode-core`
//! against a simulated I2C bus, a logging relay output and a file-backed
//! configuration store. The simulated air temperature sweeps between 20 and
//! 35 degC so the auto-mode hysteresis switches the relay both ways.
//!
//! # Environment variables
//!
//! | Variable                   | Default              | Meaning                         |
//! |----------------------------|----------------------|---------------------------------|
//! | `ENVNODE_CYCLES`           | `40`                 | Acquisition cycles to run       |
//! | `ENVNODE_INTERVAL_MS`      | `500`                | Time between cycles             |
//! | `ENVNODE_STORE`            | `envnode-store.bin`  | Configuration blob path         |
//! | `ENVNODE_TEMP_HIGH`        | `30.0`               | Default high threshold          |
//! | `ENVNODE_TEMP_LOW`         | `25.0`               | Default low threshold           |
//! | `ENVNODE_AHT20_FAULT_EVERY`| `7`                  | NACK every n-th AHT20 trigger   |
//!
//! Logging is configured through `RUST_LOG` (default `info`).

mod devices;
mod hardware;

use std::cell::RefCell;
use std::str::FromStr;
use std::thread;
use std::time::Duration;

use critical_section::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embedded_hal_bus::i2c::CriticalSectionDevice;
use log::{error, info, warn};

use envnode_core::{
    Aht20, Bmp180, ControlMode, NodeConfig, PostcardStore, ReadingReport, RelayController,
    RelayDefaults, SensorAggregator, SharedRelayController, run_cycle,
};

use devices::{Environment, SimulatedBus};
use hardware::{FileBlob, MonotonicClock, SimulatedRelay, StdDelay};

/// Read and parse an environment variable, keeping `default` when it is
/// unset or malformed.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("Ignoring malformed {}={:?}", name, raw);
            default
        }),
        Err(_) => default,
    }
}

fn config_from_env() -> NodeConfig {
    let defaults = RelayDefaults::default();
    NodeConfig {
        acquisition_interval_ms: env_or("ENVNODE_INTERVAL_MS", 500),
        relay: RelayDefaults {
            high_threshold: env_or("ENVNODE_TEMP_HIGH", defaults.high_threshold),
            low_threshold: env_or("ENVNODE_TEMP_LOW", defaults.low_threshold),
            ..defaults
        },
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = config_from_env();
    let cycles: u32 = env_or("ENVNODE_CYCLES", 40);
    let store_path: String = env_or("ENVNODE_STORE", "envnode-store.bin".to_owned());
    let fault_every: u32 = env_or("ENVNODE_AHT20_FAULT_EVERY", 7);

    info!("Starting envnode simulator with {:?}", config);

    let bus: Mutex<RefCell<SimulatedBus>> = Mutex::new(RefCell::new(SimulatedBus::new(
        Environment::new(26.0, 1.0),
        Some(fault_every),
    )));

    let aht20 = Aht20::new(CriticalSectionDevice::new(&bus), StdDelay);
    let bmp180 = Bmp180::new(CriticalSectionDevice::new(&bus), StdDelay);
    let mut sensors = SensorAggregator::from_init_results(Ok(aht20), bmp180, MonotonicClock::new());

    let store = PostcardStore::open(FileBlob::new(store_path));
    let controller = match RelayController::load(store, SimulatedRelay::default(), &config.relay) {
        Ok(controller) => controller,
        Err(e) => {
            error!("Relay controller failed to start: {}", e);
            std::process::exit(1);
        }
    };
    let relay: SharedRelayController<CriticalSectionRawMutex, _, _> =
        SharedRelayController::new(controller);

    if let Err(e) = relay.set_relay(None, Some(ControlMode::Auto)) {
        warn!("Could not switch to auto mode: {}", e);
    }

    for cycle in 1..=cycles {
        let report = run_cycle(&mut sensors, &relay);
        let view = ReadingReport::from(&report.reading);
        let actual = critical_section::with(|cs| bus.borrow_ref(cs).environment().temperature);
        info!(
            "Cycle {}: actual={:.1} C aht20={:?} bmp180={:?} relay={:?}",
            cycle,
            actual,
            view.aht20,
            view.bmp180,
            relay.get_relay_status().state
        );
        if let Some(state) = report.transition {
            info!("Cycle {}: relay switched {:?}", cycle, state);
        }

        thread::sleep(Duration::from_millis(u64::from(config.acquisition_interval_ms)));
    }

    info!("Final relay status: {:?}", relay.get_relay_status());
}
