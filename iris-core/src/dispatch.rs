//! Command dispatch table
//!
//! Handlers are registered against command bytes at startup; incoming
//! frames are routed by command once the power-on handshake has been
//! seen. Until then every other command is refused with `SystemLock`.

use crate::command::{AckCode, Command};
use heapless::Vec;

/// Capacity of a reply's data field.
pub const MAX_REPLY_DATA: usize = 32;

/// What a handler wants sent back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Nothing; the request is consumed silently
    None,
    /// Reply frame carrying this data under the request's own command
    Data(Vec<u8, MAX_REPLY_DATA>),
    /// Universal acknowledge with this code
    Status(AckCode),
}

impl Reply {
    /// Build a data reply; oversize data becomes a `DataAbnormal` status.
    pub fn data(bytes: &[u8]) -> Self {
        match Vec::from_slice(bytes) {
            Ok(v) => Reply::Data(v),
            Err(()) => Reply::Status(AckCode::DataAbnormal),
        }
    }
}

/// A command handler: context plus request data, returns the reply.
pub type Handler<C> = fn(&mut C, &[u8]) -> Reply;

/// Registration failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DispatchError {
    /// No free slot in the table
    TableFull,
    /// Command already has a handler
    Duplicate,
}

/// Command router with the power-on handshake gate.
///
/// `N` is the table capacity. The gate opens when the handshake command
/// arrives and stays open for the life of the dispatcher.
pub struct Dispatcher<C, const N: usize> {
    handlers: Vec<(u8, Handler<C>), N>,
    handshaken: bool,
    /// Unknown commands: nack with `OperateInvalid` (true) or drop (false)
    nack_unknown: bool,
}

impl<C, const N: usize> Dispatcher<C, N> {
    pub fn new(nack_unknown: bool) -> Self {
        Self {
            handlers: Vec::new(),
            handshaken: false,
            nack_unknown,
        }
    }

    /// Register a handler for a command byte.
    pub fn register(&mut self, cmd: u8, handler: Handler<C>) -> Result<(), DispatchError> {
        if self.handlers.iter().any(|(c, _)| *c == cmd) {
            return Err(DispatchError::Duplicate);
        }
        self.handlers
            .push((cmd, handler))
            .map_err(|_| DispatchError::TableFull)
    }

    /// True once the handshake command has been seen.
    pub fn handshake_done(&self) -> bool {
        self.handshaken
    }

    /// Route one decoded request.
    pub fn dispatch(&mut self, ctx: &mut C, cmd: u8, data: &[u8]) -> Reply {
        if !self.handshaken {
            if cmd == Command::Handshake.as_u8() {
                self.handshaken = true;
            } else {
                return Reply::Status(AckCode::SystemLock);
            }
        }
        match self.handlers.iter().find(|(c, _)| *c == cmd) {
            Some((_, handler)) => handler(ctx, data),
            None if self.nack_unknown => Reply::Status(AckCode::OperateInvalid),
            None => Reply::None,
        }
    }
}
