//! # Exchange Tests
//!
//! These tests drive full request/response exchanges through a scripted
//! in-memory transport: every printer operation's happy path, chunked
//! reply reassembly, and each classification failure.
//!
//! The mock plays the printer's side from a queue of read chunks; an
//! exhausted queue behaves like a read timeout (empty read).

use std::collections::VecDeque;
use std::time::Duration;

use pretty_assertions::assert_eq;

use chrono::{NaiveDate, NaiveDateTime};
use posnet::error::PosnetError;
use posnet::printer::Printer;
use posnet::protocol::Frame;
use posnet::session::Session;
use posnet::transport::Transport;

// ============================================================================
// MOCK TRANSPORT
// ============================================================================

/// In-memory transport scripted with the chunks the printer will "send".
#[derive(Default)]
struct MockTransport {
    written: Vec<u8>,
    replies: VecDeque<Vec<u8>>,
    timeout: Option<Duration>,
}

impl MockTransport {
    /// Script a reply delivered in one read.
    fn reply_with(wire: Vec<u8>) -> Self {
        Self {
            replies: VecDeque::from([wire]),
            ..Self::default()
        }
    }

    /// Script a reply delivered across reads of at most `chunk` bytes.
    fn reply_chunked(wire: &[u8], chunk: usize) -> Self {
        Self {
            replies: wire.chunks(chunk).map(<[u8]>::to_vec).collect(),
            ..Self::default()
        }
    }
}

impl Transport for MockTransport {
    fn write_all(&mut self, data: &[u8]) -> Result<(), PosnetError> {
        self.written.extend_from_slice(data);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, PosnetError> {
        match self.replies.pop_front() {
            Some(chunk) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                if n < chunk.len() {
                    self.replies.push_front(chunk[n..].to_vec());
                }
                Ok(n)
            }
            // Queue exhausted: behave like a timed-out read.
            None => Ok(0),
        }
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<(), PosnetError> {
        self.timeout = Some(timeout);
        Ok(())
    }
}

fn wire(instruction: &str, params: &[(&str, &str)]) -> Vec<u8> {
    Frame::build(instruction, params).unwrap().encode().unwrap()
}

fn sample_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2016, 9, 22)
        .unwrap()
        .and_hms_opt(12, 5, 0)
        .unwrap()
}

// ============================================================================
// PRINTER OPERATIONS
// ============================================================================

#[test]
fn get_time_parses_the_clock_reply() {
    let mock = MockTransport::reply_with(wire("rtcget", &[("da", "2016-09-22;12:05")]));
    let mut printer = Printer::new(mock);

    assert_eq!(printer.get_time().unwrap(), sample_time());

    let mock = printer.into_transport();
    assert_eq!(mock.written, wire("rtcget", &[]));
}

#[test]
fn get_time_rejects_an_unparseable_timestamp() {
    let mock = MockTransport::reply_with(wire("rtcget", &[("da", "not-a-time")]));
    let mut printer = Printer::new(mock);

    assert!(matches!(
        printer.get_time(),
        Err(PosnetError::UnexpectedResponse { .. })
    ));
}

#[test]
fn get_time_rejects_a_reply_without_the_clock_parameter() {
    let mock = MockTransport::reply_with(wire("rtcget", &[]));
    let mut printer = Printer::new(mock);

    assert!(matches!(
        printer.get_time(),
        Err(PosnetError::UnexpectedResponse { .. })
    ));
}

#[test]
fn set_time_sends_the_formatted_clock_and_accepts_the_echo() {
    let mock = MockTransport::reply_with(wire("rtcset", &[]));
    let mut printer = Printer::new(mock);

    printer.set_time(sample_time()).unwrap();

    let mock = printer.into_transport();
    assert_eq!(mock.written, wire("rtcset", &[("da", "2016-09-22;12:05")]));
}

#[test]
fn set_time_rejects_an_echo_carrying_parameters() {
    let mock = MockTransport::reply_with(wire("rtcset", &[("da", "2016-09-22;12:05")]));
    let mut printer = Printer::new(mock);

    assert!(matches!(
        printer.set_time(sample_time()),
        Err(PosnetError::UnexpectedResponse { .. })
    ));
}

#[test]
fn get_vat_rates_maps_classes_to_percentages() {
    let mock = MockTransport::reply_with(wire(
        "vatget",
        &[("va", "23,00"), ("vb", "8,00"), ("vc", "5,00"), ("vd", "0,00")],
    ));
    let mut printer = Printer::new(mock);

    let rates = printer.get_vat_rates().unwrap();
    let summary: Vec<(&str, f64)> = rates.iter().map(|r| (r.class.as_str(), r.rate)).collect();
    assert_eq!(
        summary,
        vec![("va", 23.0), ("vb", 8.0), ("vc", 5.0), ("vd", 0.0)]
    );
}

#[test]
fn get_vat_rates_rejects_a_non_numeric_rate() {
    let mock = MockTransport::reply_with(wire("vatget", &[("va", "high")]));
    let mut printer = Printer::new(mock);

    assert!(matches!(
        printer.get_vat_rates(),
        Err(PosnetError::UnexpectedResponse { .. })
    ));
}

#[test]
fn show_on_display_sends_id_line_and_text() {
    let mock = MockTransport::reply_with(wire("dsptxtline", &[]));
    let mut printer = Printer::new(mock);

    printer.show_on_display(0, 1, "WELCOME").unwrap();

    let mock = printer.into_transport();
    assert_eq!(
        mock.written,
        wire("dsptxtline", &[("id", "0"), ("no", "1"), ("ln", "WELCOME")])
    );
}

#[test]
fn prepare_qr_code_ships_the_text() {
    let mock = MockTransport::reply_with(wire("qrcode", &[]));
    let mut printer = Printer::new(mock);

    printer
        .prepare_qr_code("https://example.com/receipt/42")
        .unwrap();

    let mock = printer.into_transport();
    assert_eq!(
        mock.written,
        wire("qrcode", &[("tx", "https://example.com/receipt/42")])
    );
}

// ============================================================================
// SESSION BEHAVIOR
// ============================================================================

#[test]
fn a_reply_split_across_short_reads_is_reassembled() {
    let reply = wire("rtcget", &[("da", "2016-09-22;12:05")]);
    let mut mock = MockTransport::reply_chunked(&reply, 3);

    let mut session = Session::new(&mut mock);
    let frame = session.send_and_receive("rtcget", &[], "rtcget", false).unwrap();

    assert_eq!(frame.instruction, "rtcget");
    assert_eq!(frame.parameters[0].value(), "2016-09-22;12:05");
}

#[test]
fn the_session_applies_its_timeout_to_the_transport() {
    let mut mock = MockTransport::reply_with(wire("rtcset", &[]));

    let mut session = Session::new(&mut mock);
    session.set_timeout(Duration::from_millis(250));
    session
        .send_and_receive("rtcset", &[("da", "2016-09-22;12:05")], "rtcset", true)
        .unwrap();

    assert_eq!(mock.timeout, Some(Duration::from_millis(250)));
}

#[test]
fn an_err_reply_becomes_a_protocol_error() {
    let mut mock = MockTransport::reply_with(wire(
        "ERR",
        &[("@", "TOK1"), ("?", "5"), ("cm", "rtcset"), ("fd", "da")],
    ));

    let mut session = Session::new(&mut mock);
    let result = session.send_and_receive("rtcset", &[("da", "bad")], "rtcset", true);

    match result {
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
fn a_mismatched_instruction_is_an_unexpected_response() {
    let mut mock = MockTransport::reply_with(wire("vatget", &[]));

    let mut session = Session::new(&mut mock);
    let result = session.send_and_receive("rtcset", &[], "rtcset", true);

    match result {
        Err(PosnetError::UnexpectedResponse { expected, frame }) => {
            assert_eq!(expected, "rtcset");
            assert_eq!(frame.instruction, "vatget");
        }
        other => panic!("expected unexpected-response failure, got {other:?}"),
    }
}

#[test]
fn a_corrupted_reply_fails_the_checksum() {
    let mut reply = wire("rtcset", &[]);
    // Flip one checksum character.
    let index = reply.len() - 3;
    reply[index] ^= 0x01;
    let mut mock = MockTransport::reply_with(reply);

    let mut session = Session::new(&mut mock);
    assert!(matches!(
        session.send_and_receive("rtcset", &[], "rtcset", true),
        Err(PosnetError::Checksum { .. })
    ));
}

#[test]
fn a_silent_printer_is_a_framing_failure() {
    // No scripted replies: the first read times out with nothing buffered.
    let mut mock = MockTransport::default();

    let mut session = Session::new(&mut mock);
    assert!(matches!(
        session.send_and_receive("rtcget", &[], "rtcget", false),
        Err(PosnetError::Framing(_))
    ));
}

#[test]
fn a_truncated_reply_is_a_framing_failure() {
    let reply = wire("rtcget", &[("da", "2016-09-22;12:05")]);
    // Deliver all but the final ETX, then time out.
    let mut mock = MockTransport::reply_with(reply[..reply.len() - 1].to_vec());

    let mut session = Session::new(&mut mock);
    assert!(matches!(
        session.send_and_receive("rtcget", &[], "rtcget", false),
        Err(PosnetError::Framing(_))
    ));
}
