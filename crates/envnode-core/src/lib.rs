//! Hardware-independent core library for envnode
//!
//! This crate contains all platform-agnostic logic for the envnode sensing and
//! actuation node: the AHT20 and BMP180 drivers with their raw-sample decoding,
//! the sensor aggregator, the hysteresis relay controller and the persisted
//! configuration format.
//!
//! It is `#![no_std]` so it compiles on both embedded targets (ESP32-S3) and
//! desktop hosts (for the simulator and tests). Hardware is reached only
//! through the `embedded-hal` traits and the small ports defined here
//! ([`storage::BlobStorage`], [`sensors::TickSource`]). The two drivers share
//! one bus through any `embedded-hal` device wrapper, such as those in
//! `embedded-hal-bus`.

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod control;
pub mod node;
pub mod sensors;
pub mod storage;

#[cfg(test)]
mod test_support;

pub use config::{NodeConfig, RelayDefaults};
pub use control::{
    ControlError, ControlMode, RelayController, RelayState, RelayStatus, SharedRelayController,
    Thresholds, ValidationError,
};
pub use node::{CycleReport, run_cycle};
pub use sensors::{
    Aht20, Bmp180, KnownDevice, ReadingReport, SensorAggregator, SensorError, SensorReading,
    TickSource,
};
pub use storage::{BlobStorage, ConfigStore, MemoryBlob, PostcardStore, StoreError};
