//! ESP32-S3 specific pieces of the envnode firmware
//!
//! Peripheral setup, the embassy-backed tick source and the build-time
//! configuration overrides. Everything else lives in `envnode-core`.

#![no_std]

pub mod config;
pub mod hardware;
