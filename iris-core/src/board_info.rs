//! Persisted board identity record
//!
//! One small record in flash holds the board's identity: a magic number,
//! the hardware version string, and the serial number. The software
//! version is a compile-time constant and is never persisted. On load, a
//! missing, unreadable, or magic-mismatched record is replaced with the
//! defaults and written back, so first boot and corrupted flash behave
//! the same way.

use heapless::String;
use iris_hal::{RecordStorage, StorageError};
use serde::{Deserialize, Serialize};

/// Software version, baked into the binary at build time.
pub const SW_VERSION: &str = "0.0.0.0";

/// Capacity of each persisted string field.
pub const FIELD_CAP: usize = 32;

const BOARD_INFO_MAGIC: u64 = 0xFFDD_FFDD_FFDD_FFDD;
const BOARD_INFO_OFFSET: u32 = 0;
const RECORD_BUF: usize = 96;

const HW_VERSION_DEFAULT: &str = "0.0.0.0";
const SERIAL_DEFAULT: &str = "SN0000000000";

/// The record as stored in flash (postcard-encoded).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardInfo {
    /// Magic number marking an initialized record
    pub magic: u64,
    /// Hardware version string, `X.Y.Z.B`
    pub hw_version: String<FIELD_CAP>,
    /// Serial number, `SNYYMMDDNNNN`
    pub serial_number: String<FIELD_CAP>,
}

impl Default for BoardInfo {
    fn default() -> Self {
        Self {
            magic: BOARD_INFO_MAGIC,
            hw_version: bounded(HW_VERSION_DEFAULT),
            serial_number: bounded(SERIAL_DEFAULT),
        }
    }
}

/// Build a bounded string field, truncating at capacity.
fn bounded(s: &str) -> String<FIELD_CAP> {
    let mut out = String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

/// Errors from the record accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RecordError {
    /// New value exceeds the stored field capacity
    TooLong,
    /// Underlying storage failed
    Storage(StorageError),
}

impl From<StorageError> for RecordError {
    fn from(e: StorageError) -> Self {
        RecordError::Storage(e)
    }
}

/// Owner of the board record: reads it at startup, serves the getters,
/// and flushes every mutation straight back to storage.
pub struct DataManager<S> {
    storage: S,
    info: BoardInfo,
}

impl<S: RecordStorage> DataManager<S> {
    /// Load the record, seeding defaults when it is absent or invalid.
    pub fn load(mut storage: S) -> Result<Self, RecordError> {
        let mut buf = [0u8; RECORD_BUF];
        let stored = match storage.read_record(BOARD_INFO_OFFSET, &mut buf) {
            Ok(()) => postcard::from_bytes::<BoardInfo>(&buf)
                .ok()
                .filter(|info| info.magic == BOARD_INFO_MAGIC),
            Err(_) => None,
        };
        match stored {
            Some(info) => Ok(Self { storage, info }),
            None => {
                let mut mgr = Self {
                    storage,
                    info: BoardInfo::default(),
                };
                mgr.flush()?;
                Ok(mgr)
            }
        }
    }

    /// The compile-time software version.
    pub fn software_version(&self) -> &'static str {
        SW_VERSION
    }

    /// The persisted hardware version.
    pub fn hardware_version(&self) -> &str {
        &self.info.hw_version
    }

    /// The persisted serial number.
    pub fn serial_number(&self) -> &str {
        &self.info.serial_number
    }

    /// Replace the hardware version and persist the record.
    pub fn set_hardware_version(&mut self, value: &str) -> Result<(), RecordError> {
        self.info.hw_version = String::try_from(value).map_err(|_| RecordError::TooLong)?;
        self.flush()
    }

    /// Replace the serial number and persist the record.
    pub fn set_serial_number(&mut self, value: &str) -> Result<(), RecordError> {
        self.info.serial_number = String::try_from(value).map_err(|_| RecordError::TooLong)?;
        self.flush()
    }

    /// Give the storage back (for shutdown or tests).
    pub fn release(self) -> S {
        self.storage
    }

    fn flush(&mut self) -> Result<(), RecordError> {
        let mut buf = [0u8; RECORD_BUF];
        let used = postcard::to_slice(&self.info, &mut buf)
            .map_err(|_| RecordError::Storage(StorageError::BufferTooSmall))?
            .len();
        self.storage
            .write_record(BOARD_INFO_OFFSET, &buf[..used])
            .map_err(RecordError::Storage)
    }
}
