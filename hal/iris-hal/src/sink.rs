//! Outbound byte sink
//!
//! The transmit side of the serial link. The link layer hands a fully
//! assembled frame to the sink; how the bytes leave the board (blocking
//! UART write, DMA, a test buffer) is the implementation's business.

/// Destination for assembled outbound frames.
pub trait FrameSink {
    /// Error type for transmit operations
    type Error;

    /// Write as much of `data` as the sink will take right now.
    ///
    /// Returns the number of bytes accepted. A short write means the
    /// frame was not sent atomically; the caller decides whether that is
    /// an error (the link layer treats it as one and drops the frame).
    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error>;

    /// Write all of `data` or fail.
    fn write_all(&mut self, data: &[u8]) -> Result<(), WriteAllError<Self::Error>> {
        let mut sent = 0;
        while sent < data.len() {
            match self.write(&data[sent..]) {
                Ok(0) => return Err(WriteAllError::Incomplete { sent }),
                Ok(n) => sent += n,
                Err(e) => return Err(WriteAllError::Sink(e)),
            }
        }
        Ok(())
    }
}

/// Failure of [`FrameSink::write_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAllError<E> {
    /// The sink stopped accepting bytes mid-frame
    Incomplete {
        /// Bytes accepted before the sink stalled
        sent: usize,
    },
    /// The sink reported an error
    Sink(E),
}
