//! Iris hardware boundary traits
//!
//! This crate defines the traits the protocol engine needs from the
//! platform: somewhere to send assembled frames and somewhere to persist
//! the board record. Chip-specific crates implement them; the engine and
//! its tests only ever see the traits.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application / firmware binary          │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  iris-core (link, dispatch, records)    │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  iris-hal (this crate - traits)         │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`sink::FrameSink`] - Outbound frame bytes (UART TX side)
//! - [`storage::RecordStorage`] - Persistent record storage (flash)

#![no_std]
#![deny(unsafe_code)]

pub mod sink;
pub mod storage;

pub use sink::FrameSink;
pub use storage::{RecordStorage, StorageError};
