use heapless::Vec;

use super::StoreError;

/// Largest blob the configuration table is ever written as.
pub const BLOB_CAPACITY: usize = 256;

/// Raw storage for one opaque blob.
pub trait BlobStorage {
    /// Copy the stored blob into `buf` and return its length. An empty medium
    /// returns `Ok(0)`.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, StoreError>;

    /// Replace the stored blob.
    fn write(&mut self, data: &[u8]) -> Result<(), StoreError>;
}

/// Blob kept in RAM. Survives a [`PostcardStore`](super::PostcardStore)
/// being dropped and reopened, which is how tests model a reboot.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlob {
    data: Vec<u8, BLOB_CAPACITY>,
}

impl MemoryBlob {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl BlobStorage for MemoryBlob {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, StoreError> {
        let len = self.data.len();
        buf.get_mut(..len)
            .ok_or(StoreError::Capacity)?
            .copy_from_slice(&self.data);
        Ok(len)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), StoreError> {
        self.data = Vec::from_slice(data).map_err(|_| StoreError::Capacity)?;
        Ok(())
    }
}

impl<B: BlobStorage + ?Sized> BlobStorage for &mut B {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, StoreError> {
        (**self).read(buf)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), StoreError> {
        (**self).write(data)
    }
}
