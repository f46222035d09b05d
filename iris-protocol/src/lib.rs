//! Serial frame protocol engine
//!
//! This crate recovers discrete, validated frames from a continuous serial
//! byte stream. It is built around three pieces:
//!
//! - [`ByteSource`]: a capability contract for the receive reservoir (a
//!   wrapping ring buffer filled from the UART ISR). The parser never owns
//!   the storage; it peeks, validates, and consumes.
//! - [`ProtocolDefinition`]: an immutable description of one wire format -
//!   header/tail bytes, framing shape, checksum, size and timing limits.
//!   Distinct protocols are distinct definitions; the engine is generic
//!   over them.
//! - [`FrameParser`]: the finite-state machine that pumps the byte source
//!   according to a definition, emits validated payloads, and recovers
//!   locally from noise, truncation, and corruption.
//!
//! The general frame layout (field presence depends on the definition):
//!
//! ```text
//! ┌────────┬─────────┬──────────────────────┬──────────┬──────┐
//! │ HEADER │ LENGTH? │ BODY (addr/cmd/data) │ CHECKSUM │ TAIL │
//! └────────┴─────────┴──────────────────────┴──────────┴──────┘
//! ```
//!
//! The encode path ([`encode_frame`]) wraps an outbound body in the same
//! definition's shape; any frame it produces is accepted by a parser
//! built from the same definition.

#![no_std]
#![deny(unsafe_code)]

pub mod checksum;
pub mod def;
pub mod encode;
pub mod parser;
pub mod source;

pub use checksum::ChecksumKind;
pub use def::{DefinitionError, Endianness, FrameShape, ProtocolDefinition, ResyncPolicy};
pub use encode::{encode_frame, EncodeError};
pub use parser::{FrameError, FrameEvent, FrameParser};
pub use source::{ByteSource, RingBuffer};
