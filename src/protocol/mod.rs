//! # POSNET Wire Protocol
//!
//! This module implements the frame codec for the POSNET fiscal-printer
//! protocol: the byte-level format every request and response travels in.
//!
//! ## Module Structure
//!
//! - [`frame`]: frame encode/decode, parameters, reserved names
//! - [`crc`]: CRC-16/XMODEM checksum and its wire rendering
//!
//! ## Usage Example
//!
//! ```
//! use posnet::protocol::Frame;
//!
//! // Build and encode a clock-set request
//! let request = Frame::build("rtcset", &[("da", "2016-09-22,12:05")])?;
//! let wire = request.encode()?;
//!
//! // Decode a printer reply
//! let reply = Frame::decode(&wire)?;
//! assert_eq!(reply.instruction, "rtcset");
//! # Ok::<(), posnet::PosnetError>(())
//! ```
//!
//! Grammar and semantics are deliberately separated: decoding always
//! produces a uniform parameter list, even for `ERR` replies. Deciding
//! what a reply *means* is the session layer's job.

pub mod crc;
pub mod frame;

pub use frame::{ETX, Frame, ParamName, Parameter, STX, TAB};
