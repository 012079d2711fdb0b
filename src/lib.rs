//! # Posnet - Fiscal Printer Protocol Driver
//!
//! Posnet is a Rust library for driving POSNET fiscal printers over a
//! serial line. It provides:
//!
//! - **Frame codec**: encode/decode of the tab-terminated, checksummed
//!   wire format
//! - **Protocol session**: request/response exchanges with typed
//!   classification of error replies
//! - **Printer operations**: clock, VAT rates, customer display, QR codes
//! - **Transport**: serial TTY communication
//!
//! ## Quick Start
//!
//! ```no_run
//! use posnet::{printer::Printer, transport::SerialTransport};
//!
//! // Open the serial connection to the printer
//! let transport = SerialTransport::open("/dev/ttyUSB0")?;
//! let mut printer = Printer::new(transport);
//!
//! // Sync the printer's clock with the host
//! printer.set_time_now()?;
//!
//! // Greet the customer
//! printer.show_on_display(0, 1, "WELCOME")?;
//!
//! # Ok::<(), posnet::PosnetError>(())
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`protocol`] | Frame codec: framing, checksum, parameters |
//! | [`session`] | One request/response exchange, reply classification |
//! | [`printer`] | High-level printer operations |
//! | [`transport`] | Communication backends |
//! | [`error`] | Error types |
//!
//! ## Concurrency
//!
//! Everything is synchronous and blocking. A transport carries one
//! exchange at a time; interleaving calls from several threads would mix
//! bytes on the shared serial line, so callers sharing a printer must
//! serialize access themselves.

pub mod error;
pub mod printer;
pub mod protocol;
pub mod session;
pub mod transport;

// Re-exports for convenience
pub use error::{PosnetError, ProtocolError};
pub use printer::Printer;
pub use protocol::Frame;
#[cfg(unix)]
pub use transport::SerialTransport;
