//! Frame parser state machine
//!
//! The parser incrementally consumes a [`ByteSource`] according to a
//! [`ProtocolDefinition`], emits fully validated frame payloads, and
//! recovers locally from noise, truncation, and corruption.
//!
//! State flow:
//!
//! ```text
//! SyncSearch -> ReceivingHeader -> (LenExtract) -> ReceivingPayload
//!      ^                                                 |
//!      '--------------------- Validate <-----------------'
//! ```
//!
//! The candidate frame always starts at the source front: `SyncSearch`
//! consumes junk eagerly, so every later state can count bytes from
//! offset zero. Each step either makes progress (`Again`) or signals that
//! more input is needed (`Wait`); the pump loops until `Wait`.
//!
//! Validation never reads the (possibly wrapping) source directly: the
//! candidate frame is linearized into the scratch buffer first, and the
//! tail/checksum checks plus the payload emission all happen against that
//! single contiguous copy.

use crate::def::{read_field, DefinitionError, FrameShape, ProtocolDefinition, ResyncPolicy};
use crate::source::ByteSource;

/// Errors reported while parsing. All of them are locally recovered: the
/// engine discards the presumed frame start and resumes scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// No progress within the configured timeout window
    Timeout,
    /// Declared frame length is zero or outside `[min, max]`
    InvalidLength,
    /// Frame tail bytes did not match
    BadTail,
    /// Computed checksum differs from the received one
    BadChecksum,
}

/// Parser output, delivered through the pump callback.
///
/// A `Frame` payload borrows the parser scratch buffer and is valid only
/// during the callback; copy it into owned storage before returning if it
/// must outlive the call.
#[derive(Debug, PartialEq, Eq)]
pub enum FrameEvent<'a> {
    /// A validated payload: the bytes between header end and checksum (or
    /// tail) start
    Frame(&'a [u8]),
    /// A recoverable parse error
    Error(FrameError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    SyncSearch,
    ReceivingHeader,
    LenExtract,
    ReceivingPayload,
    Validate,
}

/// Outcome of one state-machine step.
enum Step {
    /// Progress was made; step again
    Again,
    /// Nothing more can be done without new input
    Wait,
}

/// Finite-state frame parser for one stream.
///
/// `MAX` bounds the scratch buffer and must be at least the definition's
/// `max_frame_len`. One instance per stream; reset happens implicitly on
/// error, timeout, and successful emission.
pub struct FrameParser<'p, const MAX: usize> {
    def: &'p ProtocolDefinition,
    state: State,
    /// Tick of the last state progress, for timeout detection
    last_progress: u32,
    /// Expected total frame length once known
    expected_len: usize,
    /// Linearized copy of the candidate frame for validation
    scratch: [u8; MAX],
}

impl<'p, const MAX: usize> FrameParser<'p, MAX> {
    /// Create a parser for the given protocol definition.
    ///
    /// Fails when the definition is inconsistent or its `max_frame_len`
    /// exceeds the scratch capacity `MAX`.
    pub fn new(def: &'p ProtocolDefinition) -> Result<Self, DefinitionError> {
        def.validate()?;
        if def.max_frame_len > MAX {
            return Err(DefinitionError::BadBounds);
        }
        Ok(Self {
            def,
            state: State::SyncSearch,
            last_progress: 0,
            expected_len: 0,
            scratch: [0; MAX],
        })
    }

    /// The protocol definition this parser was built with.
    pub fn definition(&self) -> &ProtocolDefinition {
        self.def
    }

    /// Abandon any in-flight candidate and resume header search.
    pub fn reset(&mut self, now: u32) {
        self.state = State::SyncSearch;
        self.expected_len = 0;
        self.last_progress = now;
    }

    /// Drive the parser over the currently buffered bytes.
    ///
    /// Called periodically from the main loop with the current tick.
    /// Checks the timeout once, then applies state steps until no further
    /// progress is possible without more input. Validated payloads and
    /// parse errors are delivered through `on_event`.
    pub fn pump<S, F>(&mut self, source: &mut S, now: u32, mut on_event: F)
    where
        S: ByteSource,
        F: FnMut(FrameEvent<'_>),
    {
        self.check_timeout(source, now, &mut on_event);

        loop {
            match self.step(source, now, &mut on_event) {
                Step::Again => continue,
                Step::Wait => break,
            }
        }
    }

    /// Timeout policy: evaluated once per pump. Unsigned subtraction keeps
    /// the comparison correct across tick wraparound.
    fn check_timeout<S, F>(&mut self, source: &mut S, now: u32, on_event: &mut F)
    where
        S: ByteSource,
        F: FnMut(FrameEvent<'_>),
    {
        if self.state == State::SyncSearch {
            return;
        }
        let threshold = if self.state == State::ReceivingHeader {
            self.def.inter_byte_timeout
        } else {
            self.def.frame_timeout
        };
        if now.wrapping_sub(self.last_progress) > threshold {
            on_event(FrameEvent::Error(FrameError::Timeout));
            // Discard the whole header if it already arrived, otherwise
            // just the presumed start byte.
            let head_len = self.def.header.len();
            let discard = if source.len() >= head_len { head_len } else { 1 };
            source.consume(core::cmp::min(discard, source.len()));
            self.reset(now);
        }
    }

    fn step<S, F>(&mut self, source: &mut S, now: u32, on_event: &mut F) -> Step
    where
        S: ByteSource,
        F: FnMut(FrameEvent<'_>),
    {
        match self.state {
            State::SyncSearch => self.sync_search(source, now),
            State::ReceivingHeader => self.receive_header(source, now),
            State::LenExtract => self.extract_length(source, now, on_event),
            State::ReceivingPayload => self.receive_payload(source, now, on_event),
            State::Validate => self.validate(source, now, on_event),
        }
    }

    /// Scan the first contiguous run for the header start byte. Junk in
    /// front of it cannot begin a frame and is consumed outright; when the
    /// storage wraps, the next iteration sees the remainder.
    fn sync_search<S: ByteSource>(&mut self, source: &mut S, now: u32) -> Step {
        let run = source.peek();
        if run.is_empty() {
            return Step::Wait;
        }
        match run.iter().position(|&b| b == self.def.header[0]) {
            Some(junk) => {
                source.consume(junk);
                self.state = State::ReceivingHeader;
                self.last_progress = now;
                Step::Again
            }
            None => {
                let n = run.len();
                source.consume(n);
                Step::Again
            }
        }
    }

    /// Confirm the remaining header bytes at the source front. A mismatch
    /// resynchronizes per the configured policy: discarding one byte keeps
    /// a header byte embedded inside header bytes findable.
    fn receive_header<S: ByteSource>(&mut self, source: &mut S, now: u32) -> Step {
        let head_len = self.def.header.len();
        if source.len() < head_len {
            return Step::Wait;
        }
        source.peek_into(&mut self.scratch[..head_len]);
        if self.scratch[..head_len] != *self.def.header {
            let discard = match self.def.header_mismatch {
                ResyncPolicy::DiscardOne => 1,
                ResyncPolicy::DiscardHeader => head_len,
            };
            source.consume(core::cmp::min(discard, source.len()));
            self.reset(now);
            return Step::Again;
        }
        match self.def.shape {
            FrameShape::FixedLength { total } => {
                self.expected_len = total;
                self.state = State::ReceivingPayload;
            }
            FrameShape::LengthPrefixed { .. } => self.state = State::LenExtract,
            FrameShape::DelimiterTerminated => {
                self.expected_len = 0;
                self.state = State::ReceivingPayload;
            }
        }
        self.last_progress = now;
        Step::Again
    }

    /// Read the length field and compute the expected total frame length.
    fn extract_length<S, F>(&mut self, source: &mut S, now: u32, on_event: &mut F) -> Step
    where
        S: ByteSource,
        F: FnMut(FrameEvent<'_>),
    {
        let FrameShape::LengthPrefixed {
            offset,
            size,
            len_includes_all,
            len_extra,
        } = self.def.shape
        else {
            // Unreachable by construction; resync defensively.
            self.reset(now);
            return Step::Again;
        };
        let needed = offset + size;
        if source.len() < needed {
            return Step::Wait;
        }
        source.peek_into(&mut self.scratch[..needed]);
        let value = read_field(&self.scratch[offset..needed], self.def.endianness) as usize;
        let total = if len_includes_all {
            value
        } else {
            self.def.header.len() + value + len_extra + self.def.checksum_size()
                + self.def.tail.len()
        };
        if total == 0 || total < self.def.min_frame_len || total > self.def.max_frame_len {
            on_event(FrameEvent::Error(FrameError::InvalidLength));
            source.consume(1);
            self.reset(now);
            return Step::Again;
        }
        self.expected_len = total;
        self.state = State::ReceivingPayload;
        self.last_progress = now;
        Step::Again
    }

    /// Wait until the whole candidate frame is buffered. For delimiter
    /// framing this is where the tail search happens.
    fn receive_payload<S, F>(&mut self, source: &mut S, now: u32, on_event: &mut F) -> Step
    where
        S: ByteSource,
        F: FnMut(FrameEvent<'_>),
    {
        if !matches!(self.def.shape, FrameShape::DelimiterTerminated) {
            if source.len() < self.expected_len {
                return Step::Wait;
            }
            self.state = State::Validate;
            return Step::Again;
        }

        let head_len = self.def.header.len();
        let tail = self.def.tail;
        if source.len() < head_len + tail.len() {
            return Step::Wait;
        }
        let avail = core::cmp::min(source.len(), MAX);
        source.peek_into(&mut self.scratch[..avail]);
        for i in head_len..=avail - tail.len() {
            if &self.scratch[i..i + tail.len()] == tail {
                let total = i + tail.len();
                if total < self.def.min_frame_len || total > self.def.max_frame_len {
                    on_event(FrameEvent::Error(FrameError::InvalidLength));
                    source.consume(1);
                    self.reset(now);
                    return Step::Again;
                }
                self.expected_len = total;
                self.state = State::Validate;
                return Step::Again;
            }
        }
        // No tail found. A full reservoir with no frame must not stall
        // forever: evict the oldest byte to make room.
        if source.len() >= source.capacity() {
            source.consume(1);
        }
        Step::Wait
    }

    /// Linearize the candidate into scratch and run the final checks.
    /// On success the payload is emitted and the whole frame consumed; on
    /// failure only the start byte is discarded, so a header-like sequence
    /// inside the bad frame can still be found.
    fn validate<S, F>(&mut self, source: &mut S, now: u32, on_event: &mut F) -> Step
    where
        S: ByteSource,
        F: FnMut(FrameEvent<'_>),
    {
        let total = self.expected_len;
        let head_len = self.def.header.len();
        let tail = self.def.tail;
        let chk_size = self.def.checksum_size();

        source.peek_into(&mut self.scratch[..total]);

        // Tail check; delimiter frames end in the tail by construction.
        if !matches!(self.def.shape, FrameShape::DelimiterTerminated)
            && !tail.is_empty()
            && &self.scratch[total - tail.len()..total] != tail
        {
            on_event(FrameEvent::Error(FrameError::BadTail));
            source.consume(1);
            self.reset(now);
            return Step::Again;
        }

        let payload_end = total - tail.len() - chk_size;
        if let Some(kind) = self.def.checksum {
            let calculated = kind.compute(&self.scratch[head_len..payload_end]);
            let received = read_field(
                &self.scratch[payload_end..payload_end + chk_size],
                self.def.endianness,
            );
            if calculated != received {
                on_event(FrameEvent::Error(FrameError::BadChecksum));
                source.consume(1);
                self.reset(now);
                return Step::Again;
            }
        }

        on_event(FrameEvent::Frame(&self.scratch[head_len..payload_end]));
        source.consume(total);
        self.reset(now);
        Step::Again
    }
}
