//! # Printer Operations
//!
//! High-level operations built on the frame codec and session layer.
//!
//! ## Supported Operations
//!
//! | Operation           | Instruction  | Request params | Reply            |
//! |---------------------|--------------|----------------|------------------|
//! | [`Printer::get_time`]        | `rtcget`     | none           | `da` timestamp   |
//! | [`Printer::set_time`]        | `rtcset`     | `da`           | bare echo        |
//! | [`Printer::get_vat_rates`]   | `vatget`     | none           | one param per class |
//! | [`Printer::show_on_display`] | `dsptxtline` | `id` `no` `ln` | bare echo        |
//! | [`Printer::prepare_qr_code`] | `qrcode`     | `tx`           | bare echo        |
//!
//! Each call is one synchronous exchange; nothing is retried. The printer
//! renders QR codes itself, so [`Printer::prepare_qr_code`] only ships the
//! text to encode.

use std::time::Duration;

use chrono::NaiveDateTime;

use crate::error::PosnetError;
use crate::protocol::{Frame, ParamName, Parameter};
use crate::session::{DEFAULT_CHUNK_SIZE, DEFAULT_TIMEOUT, Session};
use crate::transport::Transport;

/// Timestamp format of the printer's real-time clock
pub const TIME_FORMAT: &str = "%Y-%m-%d;%H:%M";

const RTC_GET: &str = "rtcget";
const RTC_SET: &str = "rtcset";
const VAT_GET: &str = "vatget";
const DISPLAY_LINE: &str = "dsptxtline";
const QR_CODE: &str = "qrcode";

/// One VAT class and its percentage rate, as reported by the printer.
#[derive(Debug, Clone, PartialEq)]
pub struct VatRate {
    /// VAT class code (the reply's parameter name)
    pub class: String,
    /// Percentage rate
    pub rate: f64,
}

/// # POSNET Printer
///
/// Owns a transport and exposes the printer's operations as typed calls.
/// One session drives each call; the transport is reused across calls.
///
/// ## Example
///
/// ```no_run
/// use posnet::printer::Printer;
/// use posnet::transport::SerialTransport;
///
/// let transport = SerialTransport::open("/dev/ttyUSB0")?;
/// let mut printer = Printer::new(transport);
///
/// let clock = printer.get_time()?;
/// println!("printer clock: {clock}");
/// # Ok::<(), posnet::PosnetError>(())
/// ```
pub struct Printer<T: Transport> {
    transport: T,
    timeout: Duration,
    chunk_size: usize,
}

impl<T: Transport> Printer<T> {
    /// Wrap a transport with default exchange timing.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            timeout: DEFAULT_TIMEOUT,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Set the per-read timeout used for every exchange.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Set how many bytes each read requests.
    pub fn set_chunk_size(&mut self, size: usize) {
        self.chunk_size = size;
    }

    /// Give the transport back to the caller.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Read the printer's real-time clock.
    ///
    /// Sends `rtcget` and parses the `da` parameter of the reply as a
    /// `YYYY-MM-DD;HH:MM` timestamp.
    pub fn get_time(&mut self) -> Result<NaiveDateTime, PosnetError> {
        let reply = self.exchange(RTC_GET, &[], false)?;
        let clock = reply
            .parameters
            .first()
            .filter(|p| p.name() == ParamName::Named([b'd', b'a']))
            .and_then(|p| NaiveDateTime::parse_from_str(p.value(), TIME_FORMAT).ok());
        match clock {
            Some(time) => Ok(time),
            None => Err(PosnetError::UnexpectedResponse {
                expected: RTC_GET.to_string(),
                frame: reply,
            }),
        }
    }

    /// Set the printer's real-time clock.
    ///
    /// Sends `rtcset` with the formatted timestamp and requires the bare
    /// acknowledgment echo.
    pub fn set_time(&mut self, time: NaiveDateTime) -> Result<(), PosnetError> {
        let stamp = time.format(TIME_FORMAT).to_string();
        self.exchange(RTC_SET, &[("da", stamp.as_str())], true)?;
        Ok(())
    }

    /// Set the printer's clock to the host's current local time.
    pub fn set_time_now(&mut self) -> Result<(), PosnetError> {
        self.set_time(chrono::Local::now().naive_local())
    }

    /// Query the configured VAT rates.
    ///
    /// Sends `vatget`; each reply parameter maps a VAT class code to a
    /// percentage. The printer writes rates with `,` as the decimal
    /// separator, converted here before parsing.
    pub fn get_vat_rates(&mut self) -> Result<Vec<VatRate>, PosnetError> {
        let reply = self.exchange(VAT_GET, &[], false)?;
        match parse_vat_rates(&reply.parameters) {
            Some(rates) => Ok(rates),
            None => Err(PosnetError::UnexpectedResponse {
                expected: VAT_GET.to_string(),
                frame: reply,
            }),
        }
    }

    /// Show a line of text on a customer or operator display.
    ///
    /// Sends `dsptxtline` with the display id (`id`), line number (`no`)
    /// and text (`ln`).
    pub fn show_on_display(&mut self, display: u8, line: u8, text: &str) -> Result<(), PosnetError> {
        let display = display.to_string();
        let line = line.to_string();
        self.exchange(
            DISPLAY_LINE,
            &[("id", display.as_str()), ("no", line.as_str()), ("ln", text)],
            true,
        )?;
        Ok(())
    }

    /// Load text for the QR code printed with the next receipt.
    ///
    /// Sends `qrcode` with the text in `tx`; the printer renders the code
    /// itself.
    pub fn prepare_qr_code(&mut self, text: &str) -> Result<(), PosnetError> {
        self.exchange(QR_CODE, &[("tx", text)], true)?;
        Ok(())
    }

    /// Run one exchange expecting the echoed instruction back.
    fn exchange(
        &mut self,
        instruction: &str,
        params: &[(&str, &str)],
        standard: bool,
    ) -> Result<Frame, PosnetError> {
        let mut session = Session::new(&mut self.transport);
        session.set_timeout(self.timeout);
        session.set_chunk_size(self.chunk_size);
        session.send_and_receive(instruction, params, instruction, standard)
    }
}

/// Interpret a `vatget` reply's parameters as VAT rates.
///
/// Returns `None` if any rate fails to parse as a decimal number.
fn parse_vat_rates(parameters: &[Parameter]) -> Option<Vec<VatRate>> {
    parameters
        .iter()
        .map(|p| {
            let rate = p.value().replace(',', ".").parse::<f64>().ok()?;
            Some(VatRate {
                class: p.name().to_string(),
                rate,
            })
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
