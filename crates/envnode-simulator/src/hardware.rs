//! Host stand-ins for the node's remaining hardware.

use std::convert::Infallible;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};
use envnode_core::{BlobStorage, StoreError, TickSource};
use log::{error, info};

/// Relay output that logs every level change.
#[derive(Default)]
pub struct SimulatedRelay {
    energized: bool,
}

impl ErrorType for SimulatedRelay {
    type Error = Infallible;
}

impl OutputPin for SimulatedRelay {
    fn set_low(&mut self) -> Result<(), Infallible> {
        if self.energized {
            info!("Relay output LOW");
        }
        self.energized = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        if !self.energized {
            info!("Relay output HIGH");
        }
        self.energized = true;
        Ok(())
    }
}

/// Blocking delay backed by `thread::sleep`.
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(u64::from(ns)));
    }
}

/// Milliseconds since the simulator started. Wraps like a hardware counter.
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl TickSource for MonotonicClock {
    fn now_ms(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }
}

/// Configuration blob kept in a file, so settings survive simulator restarts.
pub struct FileBlob {
    path: PathBuf,
}

impl FileBlob {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl BlobStorage for FileBlob {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                error!("Failed to read {}: {}", self.path.display(), e);
                return Err(StoreError::Backend {
                    operation: "read file",
                });
            }
        };

        buf.get_mut(..bytes.len())
            .ok_or(StoreError::Capacity)?
            .copy_from_slice(&bytes);
        Ok(bytes.len())
    }

    fn write(&mut self, data: &[u8]) -> Result<(), StoreError> {
        fs::write(&self.path, data).map_err(|e| {
            error!("Failed to write {}: {}", self.path.display(), e);
            StoreError::Backend {
                operation: "write file",
            }
        })
    }
}
