//! Persistent key-value configuration.
//!
//! [`ConfigStore`] is the interface the relay controller sees. It is backed
//! here by [`PostcardStore`], which keeps a small typed table in RAM and
//! writes it as one framed blob to any [`BlobStorage`].

mod blob;
mod flash;
mod postcard_store;

use log::warn;
use thiserror_no_std::Error;

pub use blob::*;
pub use flash::*;
pub use postcard_store::*;

/// Relay output level, stored as 0/1.
pub const KEY_RELAY_STATE: &str = "relay_state";
/// Control mode, stored as 0 (manual) / 1 (auto).
pub const KEY_AUTO_MODE: &str = "auto_mode";
pub const KEY_TEMP_HIGH: &str = "temp_high";
pub const KEY_TEMP_LOW: &str = "temp_low";

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// The storage medium rejected a read or write.
    #[error("storage backend failed to {operation}")]
    Backend { operation: &'static str },
    #[error("failed to encode configuration table")]
    Encode,
    /// Stored bytes are not a valid table, or a key holds the wrong type.
    #[error("failed to decode configuration table")]
    Decode,
    /// Too many keys, a key that is too long, or a frame that does not fit.
    #[error("configuration table is full")]
    Capacity,
}

/// Typed key to value store with defaults on miss.
///
/// `set_*` only stage a value; it becomes durable once `commit` succeeds.
/// A failed `commit` discards everything staged since the last successful one.
pub trait ConfigStore {
    fn get_u8(&self, key: &str) -> Result<Option<u8>, StoreError>;
    fn get_f32(&self, key: &str) -> Result<Option<f32>, StoreError>;
    fn set_u8(&mut self, key: &str, value: u8) -> Result<(), StoreError>;
    fn set_f32(&mut self, key: &str, value: f32) -> Result<(), StoreError>;
    fn commit(&mut self) -> Result<(), StoreError>;
    /// Drop staged values, back to the last successful commit.
    fn rollback(&mut self);

    /// Stored value, or `default` when the key is missing or unreadable.
    fn get_u8_or(&self, key: &str, default: u8) -> u8 {
        match self.get_u8(key) {
            Ok(Some(value)) => value,
            Ok(None) => default,
            Err(e) => {
                warn!("Failed to load {}: {}, using default {}", key, e, default);
                default
            }
        }
    }

    /// Both stored values, or `defaults` unless both keys load.
    fn get_f32_pair_or(&self, first_key: &str, second_key: &str, defaults: (f32, f32)) -> (f32, f32) {
        match (self.get_f32(first_key), self.get_f32(second_key)) {
            (Ok(Some(first)), Ok(Some(second))) => (first, second),
            (Ok(None), Ok(None)) => defaults,
            (first, second) => {
                warn!(
                    "Incomplete {}/{} pair ({:?}, {:?}), using defaults {:?}",
                    first_key, second_key, first, second, defaults
                );
                defaults
            }
        }
    }

    /// Stage and commit one byte.
    fn persist_u8(&mut self, key: &str, value: u8) -> Result<(), StoreError> {
        let result = self.set_u8(key, value).and_then(|()| self.commit());
        if result.is_err() {
            self.rollback();
        }
        result
    }
}
