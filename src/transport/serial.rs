//! # Serial TTY Transport
//!
//! This module provides communication with POSNET fiscal printers over a
//! serial line (USB-serial adapter or a real RS-232 port).
//!
//! ## TTY Configuration
//!
//! The device is opened read/write and configured in raw mode so protocol
//! bytes pass through unmodified:
//!
//! - **No input processing**: disable IGNBRK, BRKINT, PARMRK, ISTRIP, etc.
//! - **No output processing**: disable OPOST (no CR/LF translation)
//! - **8-bit characters**: CS8, no parity
//! - **No echo**: disable ECHO, ECHONL
//! - **Non-canonical mode**: disable ICANON (no line buffering)
//!
//! IXON/IXOFF/IXANY are cleared as well: XON (0x11) and XOFF (0x13) are
//! ordinary payload bytes in this protocol, and software flow control
//! would swallow them.
//!
//! ## Read Timeouts
//!
//! Reads use the termios VMIN/VTIME mechanism: VMIN=0 with a nonzero
//! VTIME makes each `read(2)` return as soon as any bytes are available,
//! or with 0 bytes after the timeout elapses. The session layer treats an
//! empty read as end-of-response.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::error::PosnetError;
use crate::transport::Transport;

/// Default serial device path
pub const DEFAULT_DEVICE: &str = "/dev/ttyUSB0";

/// Default baud rate for POSNET printers
pub const DEFAULT_BAUD: u32 = 9600;

/// # Serial Printer Transport
///
/// Manages a connection to a POSNET printer over a serial TTY.
///
/// ## Example
///
/// ```no_run
/// use std::time::Duration;
/// use posnet::transport::{SerialTransport, Transport};
///
/// let mut transport = SerialTransport::open("/dev/ttyUSB0")?;
/// transport.set_timeout(Duration::from_secs(1))?;
/// # Ok::<(), posnet::PosnetError>(())
/// ```
pub struct SerialTransport {
    file: File,
}

impl SerialTransport {
    /// Open a serial connection to the printer at the default baud rate.
    ///
    /// ## Errors
    ///
    /// Returns an error if:
    /// - The device doesn't exist
    /// - Permission denied (may need the dialout group)
    /// - TTY configuration fails
    pub fn open<P: AsRef<Path>>(device: P) -> Result<Self, PosnetError> {
        Self::open_with_baud(device, DEFAULT_BAUD)
    }

    /// Open a serial connection at an explicit baud rate.
    ///
    /// Supported rates: 9600, 19200, 38400, 57600, 115200.
    pub fn open_with_baud<P: AsRef<Path>>(device: P, baud: u32) -> Result<Self, PosnetError> {
        let path = device.as_ref();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| {
                PosnetError::Transport(format!("Failed to open {}: {}", path.display(), e))
            })?;

        configure_tty_raw(file.as_raw_fd(), baud)?;
        debug!(device = %path.display(), baud, "serial transport opened");

        Ok(Self { file })
    }

    /// Open with the default device path (/dev/ttyUSB0)
    pub fn open_default() -> Result<Self, PosnetError> {
        Self::open(DEFAULT_DEVICE)
    }
}

impl Transport for SerialTransport {
    fn write_all(&mut self, data: &[u8]) -> Result<(), PosnetError> {
        self.file
            .write_all(data)
            .map_err(|e| PosnetError::Transport(format!("Write failed: {}", e)))?;
        self.file
            .flush()
            .map_err(|e| PosnetError::Transport(format!("Flush failed: {}", e)))
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, PosnetError> {
        // With VMIN=0/VTIME set, a timed-out read reports 0 bytes rather
        // than an error.
        Ok(self.file.read(buf)?)
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<(), PosnetError> {
        set_read_timeout(self.file.as_raw_fd(), timeout)
    }
}

/// Map a baud rate to its termios speed constant.
fn baud_constant(baud: u32) -> Result<libc::speed_t, PosnetError> {
    match baud {
        9600 => Ok(libc::B9600),
        19200 => Ok(libc::B19200),
        38400 => Ok(libc::B38400),
        57600 => Ok(libc::B57600),
        115_200 => Ok(libc::B115200),
        other => Err(PosnetError::Transport(format!(
            "Unsupported baud rate: {}",
            other
        ))),
    }
}

/// Configure a file descriptor for raw serial communication.
///
/// This disables all input/output processing so protocol bytes pass
/// through unmodified, sets 8N1 framing, and enables the receiver.
fn configure_tty_raw(fd: i32, baud: u32) -> Result<(), PosnetError> {
    use std::mem::MaybeUninit;

    let speed = baud_constant(baud)?;

    // Get current terminal attributes
    let mut termios = MaybeUninit::uninit();
    let result = unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) };
    if result != 0 {
        return Err(PosnetError::Transport(format!(
            "tcgetattr failed: {}",
            io::Error::last_os_error()
        )));
    }
    let mut termios = unsafe { termios.assume_init() };

    // Input flags: disable all processing.
    // IXON/IXOFF/IXANY: XON/XOFF flow control is off because 0x11/0x13 are
    // legal payload bytes.
    termios.c_iflag &= !(libc::IGNBRK
        | libc::BRKINT
        | libc::PARMRK
        | libc::ISTRIP
        | libc::INLCR
        | libc::IGNCR
        | libc::ICRNL
        | libc::IXON
        | libc::IXOFF
        | libc::IXANY);

    // Output flags: disable post-processing
    termios.c_oflag &= !libc::OPOST;

    // Local flags: disable echo, canonical mode, signals
    termios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);

    // Control flags: 8-bit characters, no parity, receiver on, modem
    // status lines ignored
    termios.c_cflag &= !(libc::CSIZE | libc::PARENB);
    termios.c_cflag |= libc::CS8 | libc::CREAD | libc::CLOCAL;

    // Reads return as soon as bytes arrive; the timeout starts at 1 s and
    // is adjusted per exchange via set_timeout.
    termios.c_cc[libc::VMIN] = 0;
    termios.c_cc[libc::VTIME] = 10;

    let result = unsafe {
        libc::cfsetispeed(&mut termios, speed);
        libc::cfsetospeed(&mut termios, speed);
        libc::tcsetattr(fd, libc::TCSANOW, &termios)
    };
    if result != 0 {
        return Err(PosnetError::Transport(format!(
            "tcsetattr failed: {}",
            io::Error::last_os_error()
        )));
    }

    Ok(())
}

/// Update VTIME so each read blocks at most `timeout`.
///
/// VTIME is measured in deciseconds; sub-decisecond timeouts round up to
/// one (a zero VTIME with VMIN=0 would busy-poll).
fn set_read_timeout(fd: i32, timeout: Duration) -> Result<(), PosnetError> {
    use std::mem::MaybeUninit;

    let deciseconds = (timeout.as_millis() / 100).clamp(1, 255) as libc::cc_t;

    let mut termios = MaybeUninit::uninit();
    let result = unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) };
    if result != 0 {
        return Err(PosnetError::Transport(format!(
            "tcgetattr failed: {}",
            io::Error::last_os_error()
        )));
    }
    let mut termios = unsafe { termios.assume_init() };

    termios.c_cc[libc::VMIN] = 0;
    termios.c_cc[libc::VTIME] = deciseconds;

    let result = unsafe { libc::tcsetattr(fd, libc::TCSANOW, &termios) };
    if result != 0 {
        return Err(PosnetError::Transport(format!(
            "tcsetattr failed: {}",
            io::Error::last_os_error()
        )));
    }

    Ok(())
}
