//! # Protocol Session
//!
//! One request/response exchange with the printer: encode, write, read
//! until a complete frame has arrived, decode, classify.
//!
//! ## Exchange Flow
//!
//! ```text
//! ┌────────┐    ┌─────────┐    ┌───────────┐    ┌──────────┐
//! │ encode │ ─► │  write  │ ─► │ read loop │ ─► │ classify │
//! │ (frame)│    │(request)│    │ (chunks)  │    │ (reply)  │
//! └────────┘    └─────────┘    └───────────┘    └──────────┘
//! ```
//!
//! The read loop accumulates chunks until one contains the ETX end marker
//! or a read comes back empty (transport timeout or EOF). An unterminated
//! stream from a peer that keeps producing bytes without ever sending ETX
//! is bounded only by the transport's own timeout contract.
//!
//! Classification is a pure function over the decoded frame: a reply
//! matching the expected instruction succeeds (a *standard* reply must
//! also carry zero parameters), an `ERR` reply becomes a
//! [`ProtocolError`], and anything else is an unexpected response.
//!
//! Sessions are stateless between calls and never retry; retry policy
//! belongs to the caller, who owns the transport.

use std::time::Duration;

use tracing::{debug, trace};

use crate::error::{PosnetError, ProtocolError};
use crate::protocol::{ETX, Frame, ParamName, Parameter};
use crate::transport::Transport;

/// Instruction tag the printer uses for protocol-level error replies
pub const ERR_INSTRUCTION: &str = "ERR";

/// Default per-read timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Default number of bytes requested per read
pub const DEFAULT_CHUNK_SIZE: usize = 10;

/// # Protocol Session
///
/// Drives request/response exchanges over a borrowed transport. The
/// transport stays owned by the caller; the session merely uses it, one
/// exchange at a time.
///
/// ## Example
///
/// ```no_run
/// use posnet::session::Session;
/// use posnet::transport::SerialTransport;
///
/// let mut transport = SerialTransport::open("/dev/ttyUSB0")?;
/// let mut session = Session::new(&mut transport);
///
/// // Set the printer clock and require the bare acknowledgment echo.
/// let params = [("da", "2024-03-01;09:30")];
/// session.send_and_receive("rtcset", &params, "rtcset", true)?;
/// # Ok::<(), posnet::PosnetError>(())
/// ```
pub struct Session<'a> {
    transport: &'a mut dyn Transport,
    timeout: Duration,
    chunk_size: usize,
}

impl<'a> Session<'a> {
    /// Create a session over a borrowed transport with default timing.
    pub fn new(transport: &'a mut dyn Transport) -> Self {
        Self {
            transport,
            timeout: DEFAULT_TIMEOUT,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Set the per-read timeout applied before each exchange.
    ///
    /// This bounds each individual read, not the whole accumulation loop.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Set how many bytes each read requests. Default is 10.
    pub fn set_chunk_size(&mut self, size: usize) {
        self.chunk_size = size.max(1);
    }

    /// Run one full exchange: send `instruction` with `params`, read the
    /// reply, and classify it against `expected`.
    ///
    /// With `standard` set, the reply must be a bare acknowledgment: the
    /// expected instruction echoed back with no parameters.
    ///
    /// ## Errors
    ///
    /// - [`PosnetError::Protocol`] if the printer replied with `ERR`
    /// - [`PosnetError::UnexpectedResponse`] if the reply instruction
    ///   differs from `expected`, or a standard reply carried parameters
    /// - codec and transport errors from the underlying layers
    pub fn send_and_receive(
        &mut self,
        instruction: &str,
        params: &[(&str, &str)],
        expected: &str,
        standard: bool,
    ) -> Result<Frame, PosnetError> {
        let request = Frame::build(instruction, params)?;
        self.transport.set_timeout(self.timeout)?;
        self.send(&request)?;
        let reply = self.read_response()?;
        classify(reply, expected, standard)
    }

    /// Encode a frame and write it to the transport.
    pub fn send(&mut self, frame: &Frame) -> Result<(), PosnetError> {
        let wire = frame.encode()?;
        debug!(instruction = %frame.instruction, bytes = wire.len(), "sending request");
        self.transport.write_all(&wire)
    }

    /// Read one whole response frame from the transport and decode it.
    ///
    /// Accumulates chunked reads until a chunk carries the ETX end marker
    /// or a read returns empty.
    pub fn read_response(&mut self) -> Result<Frame, PosnetError> {
        let mut buffer = Vec::new();
        let mut chunk = vec![0u8; self.chunk_size];

        loop {
            let n = self.transport.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..n]);
            if chunk[..n].contains(&ETX) {
                break;
            }
        }

        trace!(bytes = buffer.len(), "response accumulated");
        Frame::decode(&buffer)
    }
}

/// Classify a decoded reply against the instruction the caller expects.
///
/// Pure function: grammar lives in the codec, meaning lives here. An
/// `ERR` reply is only an error when the caller wasn't asking for one.
pub fn classify(reply: Frame, expected: &str, standard: bool) -> Result<Frame, PosnetError> {
    if reply.instruction == expected {
        if standard && !reply.parameters.is_empty() {
            return Err(PosnetError::UnexpectedResponse {
                expected: expected.to_string(),
                frame: reply,
            });
        }
        return Ok(reply);
    }

    if reply.instruction == ERR_INSTRUCTION {
        return Err(error_fields(&reply.parameters).into());
    }

    Err(PosnetError::UnexpectedResponse {
        expected: expected.to_string(),
        frame: reply,
    })
}

/// Map an `ERR` reply's parameters onto the four named error attributes.
///
/// Unknown parameter names are ignored; every attribute is optional.
fn error_fields(parameters: &[Parameter]) -> ProtocolError {
    let mut error = ProtocolError::default();
    for parameter in parameters {
        let value = Some(parameter.value().to_string());
        match parameter.name() {
            ParamName::Reserved(b'@') => error.token = value,
            ParamName::Reserved(b'?') => error.error_number = value,
            ParamName::Named([b'c', b'm']) => error.instruction = value,
            ParamName::Named([b'f', b'd']) => error.field = value,
            _ => {}
        }
    }
    error
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(instruction: &str, params: &[(&str, &str)]) -> Frame {
        Frame::build(instruction, params).unwrap()
    }

    #[test]
    fn test_classify_expected_reply() {
        let reply = frame("rtcget", &[("da", "2016-09-22;12:05")]);
        let classified = classify(reply.clone(), "rtcget", false).unwrap();
        assert_eq!(classified, reply);
    }

    #[test]
    fn test_classify_standard_reply_must_be_bare() {
        let reply = frame("rtcset", &[]);
        assert!(classify(reply, "rtcset", true).is_ok());

        let reply = frame("rtcset", &[("da", "2016-09-22;12:05")]);
        match classify(reply, "rtcset", true) {
            Err(PosnetError::UnexpectedResponse { expected, frame }) => {
                assert_eq!(expected, "rtcset");
                assert_eq!(frame.instruction, "rtcset");
            }
            other => panic!("expected unexpected-response failure, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_mismatched_instruction() {
        let reply = frame("vatget", &[]);
        match classify(reply, "rtcset", false) {
            Err(PosnetError::UnexpectedResponse { expected, frame }) => {
                assert_eq!(expected, "rtcset");
                assert_eq!(frame.instruction, "vatget");
            }
            other => panic!("expected unexpected-response failure, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_error_reply_extracts_all_fields() {
        let reply = frame(
            "ERR",
            &[("@", "TOK1"), ("?", "5"), ("cm", "rtcset"), ("fd", "da")],
        );
        match classify(reply, "rtcset", false) {
            Err(PosnetError::Protocol(error)) => {
                assert_eq!(error.token.as_deref(), Some("TOK1"));
                assert_eq!(error.error_number.as_deref(), Some("5"));
                assert_eq!(error.instruction.as_deref(), Some("rtcset"));
                assert_eq!(error.field.as_deref(), Some("da"));
            }
            other => panic!("expected protocol failure, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_error_reply_with_sparse_fields() {
        let reply = frame("ERR", &[("?", "5")]);
        match classify(reply, "rtcget", false) {
            Err(PosnetError::Protocol(error)) => {
                assert_eq!(error.error_number.as_deref(), Some("5"));
                assert_eq!(error.token, None);
                assert_eq!(error.instruction, None);
                assert_eq!(error.field, None);
            }
            other => panic!("expected protocol failure, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_error_reply_ignores_unknown_parameters() {
        let reply = frame("ERR", &[("?", "5"), ("zz", "noise")]);
        match classify(reply, "rtcget", false) {
            Err(PosnetError::Protocol(error)) => {
                assert_eq!(error.error_number.as_deref(), Some("5"));
            }
            other => panic!("expected protocol failure, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_expected_err_is_success() {
        let reply = frame("ERR", &[("?", "5")]);
        assert!(classify(reply, "ERR", false).is_ok());
    }
}
