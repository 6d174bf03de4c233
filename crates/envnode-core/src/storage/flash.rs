use embedded_storage::Storage;
use log::error;

use super::{BLOB_CAPACITY, BlobStorage, StoreError};

/// Length prefix of an erased sector.
const ERASED: u16 = 0xFFFF;
const PREFIX_LEN: usize = 2;

/// Blob stored at a fixed offset of a flash region.
///
/// Layout: u16 little-endian length followed by the data. An erased region
/// reads back as an empty blob.
pub struct FlashBlob<F> {
    flash: F,
    offset: u32,
}

impl<F> FlashBlob<F>
where
    F: Storage,
    F::Error: core::fmt::Debug,
{
    pub fn new(flash: F, offset: u32) -> Self {
        Self { flash, offset }
    }

    pub fn release(self) -> F {
        self.flash
    }

    fn read_at(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), StoreError> {
        self.flash.read(offset, buf).map_err(|e| {
            error!("Flash read at {:#x} failed: {:?}", offset, e);
            StoreError::Backend {
                operation: "read flash",
            }
        })
    }
}

impl<F> BlobStorage for FlashBlob<F>
where
    F: Storage,
    F::Error: core::fmt::Debug,
{
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, StoreError> {
        let mut prefix = [0u8; PREFIX_LEN];
        self.read_at(self.offset, &mut prefix)?;

        let len = u16::from_le_bytes(prefix);
        if len == ERASED {
            return Ok(0);
        }

        let len = usize::from(len);
        let data = buf.get_mut(..len).ok_or(StoreError::Capacity)?;
        self.read_at(self.offset + PREFIX_LEN as u32, data)?;
        Ok(len)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), StoreError> {
        let mut record = [0u8; PREFIX_LEN + BLOB_CAPACITY];
        let len = u16::try_from(data.len()).map_err(|_| StoreError::Capacity)?;
        record
            .get_mut(PREFIX_LEN..PREFIX_LEN + data.len())
            .ok_or(StoreError::Capacity)?
            .copy_from_slice(data);
        record[..PREFIX_LEN].copy_from_slice(&len.to_le_bytes());

        let record = &record[..PREFIX_LEN + data.len()];
        self.flash.write(self.offset, record).map_err(|e| {
            error!("Flash write at {:#x} failed: {:?}", self.offset, e);
            StoreError::Backend {
                operation: "write flash",
            }
        })
    }
}
