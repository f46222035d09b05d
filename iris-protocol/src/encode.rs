//! Outbound frame assembly
//!
//! [`encode_frame`] wraps a body in the shape described by a
//! [`ProtocolDefinition`]: header, length field, checksum, tail. The same
//! definition drives parse and encode, so a frame produced here is always
//! accepted by a parser built from that definition.
//!
//! `body` is every byte between the header and the checksum except the
//! length field; command/addressing assembly happens in the layer above.

use crate::def::{write_field, FrameShape, ProtocolDefinition};

/// Errors from the encode path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncodeError {
    /// Output buffer cannot hold the assembled frame
    BufferTooSmall,
    /// Body size produces a frame outside the definition's bounds, or a
    /// length value that does not fit the length field
    BadLength,
}

/// Assemble one frame around `body` into `out`; returns the frame length.
pub fn encode_frame(
    def: &ProtocolDefinition,
    body: &[u8],
    out: &mut [u8],
) -> Result<usize, EncodeError> {
    let head_len = def.header.len();
    let chk_size = def.checksum_size();
    let tail_len = def.tail.len();

    let total = match def.shape {
        FrameShape::FixedLength { total } => {
            if head_len + body.len() + chk_size + tail_len != total {
                return Err(EncodeError::BadLength);
            }
            total
        }
        FrameShape::LengthPrefixed { size, .. } => {
            head_len + size + body.len() + chk_size + tail_len
        }
        FrameShape::DelimiterTerminated => head_len + body.len() + chk_size + tail_len,
    };
    if total < def.min_frame_len || total > def.max_frame_len {
        return Err(EncodeError::BadLength);
    }
    if out.len() < total {
        return Err(EncodeError::BufferTooSmall);
    }

    out[..head_len].copy_from_slice(def.header);
    let mut at = head_len;

    if let FrameShape::LengthPrefixed {
        offset,
        size,
        len_includes_all,
        len_extra,
    } = def.shape
    {
        // Body bytes that sit between the header and the length field
        // (a module or address byte in some formats).
        let pre = offset.checked_sub(head_len).ok_or(EncodeError::BadLength)?;
        if body.len() < pre {
            return Err(EncodeError::BadLength);
        }
        out[at..at + pre].copy_from_slice(&body[..pre]);
        let value = if len_includes_all {
            total
        } else {
            // Payload-only count: strip everything the field does not cover.
            total
                .checked_sub(head_len + len_extra + chk_size + tail_len)
                .ok_or(EncodeError::BadLength)?
        };
        if size < 4 && value >= 1usize << (8 * size) {
            return Err(EncodeError::BadLength);
        }
        write_field(value as u32, &mut out[offset..offset + size], def.endianness);
        out[offset + size..offset + size + body.len() - pre].copy_from_slice(&body[pre..]);
        at = offset + size + body.len() - pre;
    } else {
        out[at..at + body.len()].copy_from_slice(body);
        at += body.len();
    }

    if let Some(kind) = def.checksum {
        let value = kind.compute(&out[head_len..at]);
        write_field(value, &mut out[at..at + chk_size], def.endianness);
        at += chk_size;
    }

    out[at..at + tail_len].copy_from_slice(def.tail);
    Ok(total)
}
