//! Configuration table persisted as a postcard-encoded frame.
//!
//! Frame layout:
//! - magic: 1 byte (`0xE5`)
//! - payload length: 2 bytes (u16, little-endian)
//! - payload: postcard encoding of the entry table

use heapless::{String, Vec};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use super::{BLOB_CAPACITY, BlobStorage, ConfigStore, StoreError};

const FRAME_MAGIC: u8 = 0xE5;
const HEADER_LEN: usize = 3;

/// Maximum number of distinct keys.
pub const MAX_ENTRIES: usize = 8;
/// Maximum key length in bytes.
pub const MAX_KEY_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
enum StoredValue {
    U8(u8),
    F32(f32),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Entry {
    key: String<MAX_KEY_LEN>,
    value: StoredValue,
}

type Table = Vec<Entry, MAX_ENTRIES>;

/// [`ConfigStore`] over a single blob.
///
/// `table` holds staged values; `committed` mirrors what the blob holds.
pub struct PostcardStore<B> {
    backend: B,
    table: Table,
    committed: Table,
}

impl<B: BlobStorage> PostcardStore<B> {
    /// Load the table from `backend`.
    ///
    /// Never fails: an empty, unreadable or corrupt blob starts an empty
    /// table, so every key falls back to its default.
    pub fn open(mut backend: B) -> Self {
        let mut buf = [0u8; BLOB_CAPACITY];
        let table = match backend.read(&mut buf) {
            Ok(0) => {
                info!("No stored configuration, starting empty");
                Table::new()
            }
            Ok(len) => decode_frame(&buf[..len]).unwrap_or_else(|e| {
                warn!("Stored configuration unreadable ({}), starting empty", e);
                Table::new()
            }),
            Err(e) => {
                error!("Failed to read stored configuration: {}", e);
                Table::new()
            }
        };

        debug!("Opened configuration table with {} entries", table.len());
        Self {
            backend,
            committed: table.clone(),
            table,
        }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Give the backend back, dropping staged changes.
    pub fn into_backend(self) -> B {
        self.backend
    }

    fn lookup(&self, key: &str) -> Option<StoredValue> {
        self.table
            .iter()
            .find(|entry| entry.key.as_str() == key)
            .map(|entry| entry.value)
    }

    fn stage(&mut self, key: &str, value: StoredValue) -> Result<(), StoreError> {
        if let Some(entry) = self.table.iter_mut().find(|entry| entry.key.as_str() == key) {
            entry.value = value;
            return Ok(());
        }

        let key = String::try_from(key).map_err(|_| StoreError::Capacity)?;
        self.table
            .push(Entry { key, value })
            .map_err(|_| StoreError::Capacity)
    }
}

impl<B: BlobStorage> ConfigStore for PostcardStore<B> {
    fn get_u8(&self, key: &str) -> Result<Option<u8>, StoreError> {
        match self.lookup(key) {
            None => Ok(None),
            Some(StoredValue::U8(value)) => Ok(Some(value)),
            Some(StoredValue::F32(_)) => Err(StoreError::Decode),
        }
    }

    fn get_f32(&self, key: &str) -> Result<Option<f32>, StoreError> {
        match self.lookup(key) {
            None => Ok(None),
            Some(StoredValue::F32(value)) => Ok(Some(value)),
            Some(StoredValue::U8(_)) => Err(StoreError::Decode),
        }
    }

    fn set_u8(&mut self, key: &str, value: u8) -> Result<(), StoreError> {
        self.stage(key, StoredValue::U8(value))
    }

    fn set_f32(&mut self, key: &str, value: f32) -> Result<(), StoreError> {
        self.stage(key, StoredValue::F32(value))
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        let mut frame = [0u8; BLOB_CAPACITY];
        let result = encode_frame(&self.table, &mut frame)
            .and_then(|len| self.backend.write(&frame[..len]));

        match result {
            Ok(()) => self.committed = self.table.clone(),
            Err(e) => {
                warn!("Commit failed ({}), discarding staged values", e);
                self.rollback();
            }
        }
        result
    }

    fn rollback(&mut self) {
        self.table = self.committed.clone();
    }
}

fn encode_frame(table: &Table, frame: &mut [u8]) -> Result<usize, StoreError> {
    let (header, body) = frame
        .split_at_mut_checked(HEADER_LEN)
        .ok_or(StoreError::Capacity)?;
    let payload_len = postcard::to_slice(table, body)
        .map_err(|e| match e {
            postcard::Error::SerializeBufferFull => StoreError::Capacity,
            _ => StoreError::Encode,
        })?
        .len();
    let encoded_len = u16::try_from(payload_len).map_err(|_| StoreError::Capacity)?;

    header[0] = FRAME_MAGIC;
    header[1..].copy_from_slice(&encoded_len.to_le_bytes());
    Ok(HEADER_LEN + payload_len)
}

fn decode_frame(frame: &[u8]) -> Result<Table, StoreError> {
    let (header, body) = frame.split_at_checked(HEADER_LEN).ok_or(StoreError::Decode)?;
    if header[0] != FRAME_MAGIC {
        return Err(StoreError::Decode);
    }

    let payload_len = usize::from(u16::from_le_bytes([header[1], header[2]]));
    let payload = body.get(..payload_len).ok_or(StoreError::Decode)?;
    postcard::from_bytes(payload).map_err(|_| StoreError::Decode)
}
