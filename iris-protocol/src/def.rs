//! Protocol definitions
//!
//! A [`ProtocolDefinition`] is an immutable, declarative description of one
//! wire format: header and tail bytes, the framing shape, checksum, and
//! timing/size limits. It is constructed once at startup and shared by the
//! parse and encode paths. Multiple concrete protocols are just multiple
//! definitions driving the same engine.

use crate::checksum::ChecksumKind;

/// Byte order of multi-byte wire fields (length and checksum).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Endianness {
    /// Least-significant byte first (wire default)
    Little,
    /// Most-significant byte first
    Big,
}

/// How the end of a frame is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameShape {
    /// Every frame has the same total length.
    FixedLength {
        /// Total frame length including header, checksum, and tail
        total: usize,
    },
    /// A length field inside the frame states the frame size.
    LengthPrefixed {
        /// Offset of the length field from the frame start
        offset: usize,
        /// Size of the length field in bytes (1, 2, or 4)
        size: usize,
        /// True when the field value is the total frame length; false when
        /// it counts payload bytes only
        len_includes_all: bool,
        /// Bytes between header and checksum not counted by a payload-only
        /// length field (the length field itself plus addressing bytes).
        /// Ignored when `len_includes_all` is true.
        len_extra: usize,
    },
    /// The tail byte sequence itself marks the end of the frame.
    DelimiterTerminated,
}

/// How much to discard when a multi-byte header stops matching.
///
/// `DiscardOne` restarts the scan one byte after the presumed start, so a
/// header byte embedded inside header bytes is not skipped over.
/// `DiscardHeader` drops the whole matched prefix, trading resync
/// precision for fewer rescans on chatty lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResyncPolicy {
    /// Discard exactly the presumed start byte
    DiscardOne,
    /// Discard the full header length
    DiscardHeader,
}

/// Problems detected while validating a [`ProtocolDefinition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DefinitionError {
    /// Header byte sequence is empty
    EmptyHeader,
    /// Delimiter-terminated shape requires a non-empty tail
    EmptyTail,
    /// Length field offset/size do not fit the frame bounds
    BadLengthField,
    /// min/max/total frame lengths are inconsistent
    BadBounds,
    /// A timeout is zero
    BadTimeout,
}

/// Immutable description of one wire format.
///
/// The checksum window spans from immediately after the header to
/// immediately before the checksum field. Invariant:
/// `header + tail + checksum <= min_frame_len <= max_frame_len`, and
/// `max_frame_len` must not exceed the receive buffer capacity.
#[derive(Debug, Clone, Copy)]
pub struct ProtocolDefinition {
    /// Framing strategy
    pub shape: FrameShape,
    /// Fixed byte sequence marking the frame start
    pub header: &'static [u8],
    /// Fixed byte sequence at the frame end (may be empty unless the shape
    /// is delimiter-terminated)
    pub tail: &'static [u8],
    /// Checksum algorithm, if any
    pub checksum: Option<ChecksumKind>,
    /// Byte order for the length and checksum fields
    pub endianness: Endianness,
    /// Smallest legal total frame length
    pub min_frame_len: usize,
    /// Largest legal total frame length
    pub max_frame_len: usize,
    /// Ticks allowed between header bytes while the header is arriving;
    /// exceeding it times the candidate out
    pub inter_byte_timeout: u32,
    /// Ticks allowed for the rest of the frame once the header is locked;
    /// exceeding it times the candidate out
    pub frame_timeout: u32,
    /// Resync behavior on multi-byte header mismatch
    pub header_mismatch: ResyncPolicy,
}

impl ProtocolDefinition {
    /// Size of the checksum field in bytes (0 when no checksum).
    pub fn checksum_size(&self) -> usize {
        self.checksum.map_or(0, ChecksumKind::size)
    }

    /// Fixed per-frame overhead: header + checksum + tail.
    pub fn overhead(&self) -> usize {
        self.header.len() + self.checksum_size() + self.tail.len()
    }

    /// Check the definition for internal consistency.
    ///
    /// Mirrors the init-time asserts of the driver layer: a bad definition
    /// is a programming error caught at startup, never mid-stream.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.header.is_empty() {
            return Err(DefinitionError::EmptyHeader);
        }
        if self.inter_byte_timeout == 0 || self.frame_timeout == 0 {
            return Err(DefinitionError::BadTimeout);
        }
        if self.min_frame_len < self.overhead() || self.min_frame_len > self.max_frame_len {
            return Err(DefinitionError::BadBounds);
        }
        match self.shape {
            FrameShape::FixedLength { total } => {
                if total != self.min_frame_len || total > self.max_frame_len {
                    return Err(DefinitionError::BadBounds);
                }
            }
            FrameShape::LengthPrefixed { offset, size, .. } => {
                if !matches!(size, 1 | 2 | 4) {
                    return Err(DefinitionError::BadLengthField);
                }
                if offset < self.header.len() || offset + size > self.min_frame_len {
                    return Err(DefinitionError::BadLengthField);
                }
            }
            FrameShape::DelimiterTerminated => {
                if self.tail.is_empty() {
                    return Err(DefinitionError::EmptyTail);
                }
            }
        }
        Ok(())
    }
}

/// Decode a multi-byte field from the stream per the configured byte order.
pub(crate) fn read_field(bytes: &[u8], endianness: Endianness) -> u32 {
    let mut value: u32 = 0;
    match endianness {
        Endianness::Little => {
            for (i, &b) in bytes.iter().enumerate() {
                value |= (b as u32) << (i * 8);
            }
        }
        Endianness::Big => {
            for &b in bytes {
                value = (value << 8) | b as u32;
            }
        }
    }
    value
}

/// Encode a multi-byte field into the stream per the configured byte order.
pub(crate) fn write_field(value: u32, bytes: &mut [u8], endianness: Endianness) {
    match endianness {
        Endianness::Little => {
            for (i, slot) in bytes.iter_mut().enumerate() {
                *slot = (value >> (i * 8)) as u8;
            }
        }
        Endianness::Big => {
            let n = bytes.len();
            for (i, slot) in bytes.iter_mut().enumerate() {
                *slot = (value >> ((n - 1 - i) * 8)) as u8;
            }
        }
    }
}
