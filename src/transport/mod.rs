//! # Printer Transport Layer
//!
//! This module defines the byte transport the protocol session runs over,
//! and the backends that implement it.
//!
//! ## Available Transports
//!
//! - [`serial`]: serial TTY devices (USB-serial adapters, RS-232)
//!
//! The session only needs three things from a transport: write a request,
//! read whatever bytes have arrived, and bound how long a read may block.
//! Connection lifecycle (open/close, reconnects) stays with the caller.

#[cfg(unix)]
pub mod serial;

#[cfg(unix)]
pub use serial::SerialTransport;

use std::time::Duration;

use crate::error::PosnetError;

/// A byte-stream connection to a printer.
///
/// Implementations are duplex and unbuffered: bytes written go to the
/// device as-is, and [`read`](Transport::read) returns whatever the device
/// has produced so far, up to the buffer size. A return of `0` means the
/// read timed out (or the stream ended) with nothing available.
pub trait Transport {
    /// Write the entire buffer to the device.
    fn write_all(&mut self, data: &[u8]) -> Result<(), PosnetError>;

    /// Read up to `buf.len()` bytes, blocking at most the configured
    /// timeout. Returns the number of bytes read; `0` on timeout or EOF.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, PosnetError>;

    /// Bound how long a single [`read`](Transport::read) may block.
    fn set_timeout(&mut self, timeout: Duration) -> Result<(), PosnetError>;
}
