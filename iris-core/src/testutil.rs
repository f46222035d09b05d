//! Test doubles shared by the unit tests

use heapless::Vec;
use iris_hal::{FrameSink, RecordStorage, StorageError};

/// In-memory stand-in for the flash record area. Starts erased
/// (all 0xFF) like real flash.
pub(crate) struct MemStorage {
    data: [u8; 256],
}

impl MemStorage {
    pub(crate) fn erased() -> Self {
        Self { data: [0xFF; 256] }
    }
}

impl RecordStorage for MemStorage {
    fn read_record(&mut self, offset: u32, buffer: &mut [u8]) -> Result<(), StorageError> {
        let start = offset as usize;
        if start + buffer.len() > self.data.len() {
            return Err(StorageError::NotFound);
        }
        buffer.copy_from_slice(&self.data[start..start + buffer.len()]);
        Ok(())
    }

    fn write_record(&mut self, offset: u32, data: &[u8]) -> Result<(), StorageError> {
        let start = offset as usize;
        if start + data.len() > self.data.len() {
            return Err(StorageError::Flash);
        }
        self.data[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }
}

/// Sink that records every transmitted byte.
pub(crate) struct VecSink {
    pub(crate) bytes: Vec<u8, 512>,
}

impl VecSink {
    pub(crate) fn new() -> Self {
        Self { bytes: Vec::new() }
    }
}

impl FrameSink for VecSink {
    type Error = ();

    fn write(&mut self, data: &[u8]) -> Result<usize, ()> {
        self.bytes.extend_from_slice(data).map_err(|_| ())?;
        Ok(data.len())
    }
}
