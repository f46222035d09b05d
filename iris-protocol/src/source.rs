//! Byte source abstraction and the bounded receive ring buffer
//!
//! The parser consumes bytes through [`ByteSource`] rather than owning the
//! receive storage. The ISR (or DMA completion) side only deposits bytes;
//! the parser side peeks, validates, and consumes from the periodic pump
//! call. No operation blocks and none allocates.

/// A reservoir of received bytes that the parser can inspect and drain.
///
/// `peek` exposes only the first physically contiguous run; a frame that
/// straddles the wrap point is never visible in one `peek`. `peek_into` is
/// the copying peek used to linearize such a frame into the parser scratch
/// buffer without consuming it.
pub trait ByteSource {
    /// Number of bytes currently buffered.
    fn len(&self) -> usize;

    /// True when no bytes are buffered.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total capacity of the reservoir.
    fn capacity(&self) -> usize;

    /// Contiguous read-only view starting at the logical front.
    ///
    /// If the underlying storage wraps, only the first contiguous run is
    /// returned; the remainder becomes visible after that run is consumed.
    fn peek(&self) -> &[u8];

    /// Copy up to `buf.len()` bytes from the logical front into `buf`
    /// without consuming them, spanning the wrap point if necessary.
    ///
    /// Returns the number of bytes copied (limited by `len()`).
    fn peek_into(&self, buf: &mut [u8]) -> usize;

    /// Discard the first `n` logically-front bytes. `n` must not exceed
    /// `len()`.
    fn consume(&mut self, n: usize);
}

/// Bounded wrapping byte buffer, the default [`ByteSource`] implementation.
///
/// Writer side (`push`/`push_slice`) is meant to be called from the byte
/// arrival context; reader side is the parser pump. The buffer holds at
/// most `N` bytes; excess pushed bytes are rejected, not overwritten.
#[derive(Debug)]
pub struct RingBuffer<const N: usize> {
    buf: [u8; N],
    /// Index of the logical front.
    head: usize,
    /// Number of valid bytes starting at `head`.
    used: usize,
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RingBuffer<N> {
    /// Create an empty ring buffer.
    pub const fn new() -> Self {
        Self {
            buf: [0; N],
            head: 0,
            used: 0,
        }
    }

    /// True when the buffer cannot accept another byte.
    pub fn is_full(&self) -> bool {
        self.used == N
    }

    /// Append a single byte. Returns `false` when the buffer is full.
    pub fn push(&mut self, byte: u8) -> bool {
        if self.used == N {
            return false;
        }
        let idx = (self.head + self.used) % N;
        self.buf[idx] = byte;
        self.used += 1;
        true
    }

    /// Append as many bytes of `data` as fit; returns the accepted count.
    pub fn push_slice(&mut self, data: &[u8]) -> usize {
        let mut accepted = 0;
        for &b in data {
            if !self.push(b) {
                break;
            }
            accepted += 1;
        }
        accepted
    }

    /// Drop all buffered bytes.
    pub fn clear(&mut self) {
        self.head = 0;
        self.used = 0;
    }
}

impl<const N: usize> ByteSource for RingBuffer<N> {
    fn len(&self) -> usize {
        self.used
    }

    fn capacity(&self) -> usize {
        N
    }

    fn peek(&self) -> &[u8] {
        let run = core::cmp::min(self.used, N - self.head);
        &self.buf[self.head..self.head + run]
    }

    fn peek_into(&self, buf: &mut [u8]) -> usize {
        let n = core::cmp::min(buf.len(), self.used);
        for (i, slot) in buf[..n].iter_mut().enumerate() {
            *slot = self.buf[(self.head + i) % N];
        }
        n
    }

    fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.used);
        let n = core::cmp::min(n, self.used);
        self.head = (self.head + n) % N;
        self.used -= n;
    }
}
