//! Persistent record storage
//!
//! Flash-backed storage for small fixed-size records such as the board
//! identity block. Implementations handle erase granularity and data
//! integrity; callers see whole-record reads and writes at fixed offsets.

/// Errors from storage operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// Underlying flash operation failed
    Flash,
    /// No record at the requested offset
    NotFound,
    /// Buffer too small for the stored record
    BufferTooSmall,
    /// Record present but failed its integrity check
    Corrupted,
}

/// Whole-record storage at fixed offsets.
pub trait RecordStorage {
    /// Read `buffer.len()` bytes starting at `offset`.
    fn read_record(&mut self, offset: u32, buffer: &mut [u8]) -> Result<(), StorageError>;

    /// Write `data` starting at `offset`, replacing what was there.
    fn write_record(&mut self, offset: u32, data: &[u8]) -> Result<(), StorageError>;
}
