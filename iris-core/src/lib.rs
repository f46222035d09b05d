//! Command/response layer for the Iris serial link
//!
//! This crate sits on top of `iris-protocol` and gives the validated
//! frame payloads meaning:
//!
//! - Command and acknowledge code sets of the device link
//! - A registration-based dispatcher with a power-on handshake gate
//! - The link driver: decode, dispatch, encode the reply, plus the
//!   periodic handshake announcement until the host answers
//! - The persisted board identity record (versions, serial number)

#![no_std]
#![deny(unsafe_code)]

pub mod board_info;
pub mod command;
pub mod dispatch;
pub mod handlers;
pub mod link;

#[cfg(test)]
mod testutil;

pub use board_info::{BoardInfo, DataManager, RecordError, SW_VERSION};
pub use command::{AckCode, Command};
pub use dispatch::{DispatchError, Dispatcher, Reply, MAX_REPLY_DATA};
pub use link::{AddressCheckOrder, Addressing, Link, LinkConfig, LinkStats, SendError};
