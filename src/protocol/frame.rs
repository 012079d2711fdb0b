//! # POSNET Frame Codec
//!
//! This module implements the framing format used by POSNET fiscal
//! printers over their serial link, in both directions.
//!
//! ## Wire Format
//!
//! ```text
//! STX instruction TAB { name value TAB }* '#' checksum ETX
//! ```
//!
//! | Field       | Bytes                                        |
//! |-------------|----------------------------------------------|
//! | STX         | 0x02                                         |
//! | instruction | variable, tab-terminated                     |
//! | name        | 1 byte for `@`/`?`, otherwise exactly 2      |
//! | value       | variable, tab-terminated                     |
//! | `#`         | 0x23, checksum marker                        |
//! | checksum    | CRC-16/XMODEM as 4 uppercase hex characters  |
//! | ETX         | 0x03                                         |
//!
//! The checksum covers everything between STX and `#`: the instruction,
//! its terminator, and all parameter bytes. Because the checksum is always
//! exactly four characters, a frame parses unambiguously backward from its
//! end even though every other field is variable-length.
//!
//! ## Reserved Parameter Names
//!
//! Ordinary parameter names are two characters (`da`, `va`, `tx`, ...).
//! The two single-character names `@` (request token) and `?` (error
//! number) are reserved: a field whose first byte is one of them carries a
//! one-byte name. [`ParamName`] models this distinction as a tagged union
//! so the decode grammar's branch is explicit.
//!
//! ## Usage Example
//!
//! ```
//! use posnet::protocol::Frame;
//!
//! let request = Frame::build("rtcset", &[("da", "2016-09-22,12:05")])?;
//! let wire = request.encode()?;
//! assert_eq!(wire, b"\x02rtcset\tda2016-09-22,12:05\t#8534\x03");
//!
//! let reply = Frame::decode(&wire)?;
//! assert_eq!(reply, request);
//! # Ok::<(), posnet::PosnetError>(())
//! ```

use std::fmt;

use crate::error::PosnetError;

use super::crc::crc16_hex;

/// STX (Start of Text) - frame start marker
pub const STX: u8 = 0x02;

/// ETX (End of Text) - frame end marker
pub const ETX: u8 = 0x03;

/// TAB - terminator for the instruction and every parameter value
pub const TAB: u8 = 0x09;

/// `#` - separates the summed region from the checksum
pub const CHECKSUM_MARKER: u8 = b'#';

/// Length of the fixed frame tail: `#` + 4 checksum characters + ETX
const CHECKSUM_SUFFIX_LEN: usize = 6;

/// Smallest structurally valid frame: STX + empty summed region + tail
const MIN_FRAME_LEN: usize = 1 + CHECKSUM_SUFFIX_LEN;

// ============================================================================
// PARAMETER NAMES
// ============================================================================

/// A parameter name as it appears on the wire.
///
/// The grammar admits two shapes: the reserved single-byte names `@` and
/// `?`, and ordinary two-byte codes. Keeping them as distinct variants
/// makes the one-versus-two byte decode branch a type, not a slicing
/// convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamName {
    /// One of the reserved single-byte names, `@` (token) or `?` (error
    /// number)
    Reserved(u8),
    /// An ordinary two-byte name such as `da` or `tx`
    Named([u8; 2]),
}

impl ParamName {
    /// Reserved name `@`: the request token echoed in error replies.
    pub const TOKEN: ParamName = ParamName::Reserved(b'@');

    /// Reserved name `?`: the error number in `ERR` replies.
    pub const ERROR_NUMBER: ParamName = ParamName::Reserved(b'?');

    /// Parse a name from text.
    ///
    /// Accepts exactly `@`, `?`, or a two-character code. Anything else
    /// fails with [`PosnetError::Encoding`].
    pub fn parse(name: &str) -> Result<Self, PosnetError> {
        match *name.as_bytes() {
            [byte @ (b'@' | b'?')] => Ok(ParamName::Reserved(byte)),
            // A two-character name opening with a reserved byte would decode
            // back as the one-byte reserved name, breaking round-trips.
            [b'@' | b'?', _] => Err(PosnetError::Encoding(format!(
                "parameter name {name:?} starts with a reserved character"
            ))),
            [_, _] if name.as_bytes().contains(&TAB) => Err(PosnetError::Encoding(format!(
                "parameter name {name:?} contains the tab terminator"
            ))),
            [first, second] => Ok(ParamName::Named([first, second])),
            _ => Err(PosnetError::Encoding(format!(
                "parameter name {name:?} must be `@`, `?`, or exactly two characters"
            ))),
        }
    }

    /// Number of bytes this name occupies on the wire (1 or 2).
    pub fn wire_len(&self) -> usize {
        match self {
            ParamName::Reserved(_) => 1,
            ParamName::Named(_) => 2,
        }
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            ParamName::Reserved(byte) => out.push(*byte),
            ParamName::Named(bytes) => out.extend_from_slice(bytes),
        }
    }
}

impl fmt::Display for ParamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamName::Reserved(byte) => write!(f, "{}", *byte as char),
            ParamName::Named(bytes) => {
                write!(f, "{}", String::from_utf8_lossy(bytes))
            }
        }
    }
}

// ============================================================================
// PARAMETERS
// ============================================================================

/// A single named value attached to an instruction.
///
/// Parameters are immutable once constructed; [`Parameter::new`] enforces
/// the wire invariants (valid name shape, no tab byte in the value), so a
/// `Parameter` in hand always encodes cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    name: ParamName,
    value: String,
}

impl Parameter {
    /// Create a parameter, validating name and value.
    ///
    /// ## Errors
    ///
    /// [`PosnetError::Encoding`] if the name is not `@`, `?`, or a
    /// two-character code, or if the value contains the tab terminator.
    ///
    /// ## Example
    ///
    /// ```
    /// use posnet::protocol::Parameter;
    ///
    /// let param = Parameter::new("da", "20160101")?;
    /// assert_eq!(param.value(), "20160101");
    /// # Ok::<(), posnet::PosnetError>(())
    /// ```
    pub fn new(name: &str, value: impl Into<String>) -> Result<Self, PosnetError> {
        Self::with_name(ParamName::parse(name)?, value)
    }

    /// Create a parameter from an already-typed name.
    pub fn with_name(name: ParamName, value: impl Into<String>) -> Result<Self, PosnetError> {
        let value = value.into();
        if value.as_bytes().contains(&TAB) {
            return Err(PosnetError::Encoding(format!(
                "value for parameter `{name}` contains the tab terminator"
            )));
        }
        Ok(Self { name, value })
    }

    /// The parameter's name.
    pub fn name(&self) -> ParamName {
        self.name
    }

    /// The parameter's value text.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Append this parameter's wire form (name + value + TAB) to a buffer.
    ///
    /// ## Example
    ///
    /// ```
    /// use posnet::protocol::Parameter;
    ///
    /// let mut wire = Vec::new();
    /// Parameter::new("da", "20160101")?.encode_into(&mut wire);
    /// assert_eq!(wire, b"da20160101\t");
    /// # Ok::<(), posnet::PosnetError>(())
    /// ```
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        self.name.encode_into(out);
        out.extend_from_slice(self.value.as_bytes());
        out.push(TAB);
    }
}

// ============================================================================
// FRAMES
// ============================================================================

/// One complete protocol message: an instruction and its ordered
/// parameters.
///
/// The same shape serves requests and responses; error replies are
/// ordinary frames whose instruction is `ERR`, classified one layer up in
/// the session. Encode and decode are exact inverses for every valid
/// frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Command code naming the request or response type
    pub instruction: String,
    /// Parameters in wire order
    pub parameters: Vec<Parameter>,
}

impl Frame {
    /// Create a frame from an instruction and pre-built parameters.
    pub fn new(instruction: impl Into<String>, parameters: Vec<Parameter>) -> Self {
        Self {
            instruction: instruction.into(),
            parameters,
        }
    }

    /// Build a frame from an instruction and `(name, value)` pairs.
    ///
    /// Parameter names arrive as text here because the protocol reserves
    /// characters (`@`, `?`) that could not be expressed as identifiers.
    ///
    /// ## Example
    ///
    /// ```
    /// use posnet::protocol::Frame;
    ///
    /// let frame = Frame::build("rtcset", &[("da", "2016-09-22,12:05")])?;
    /// assert_eq!(frame.instruction, "rtcset");
    /// # Ok::<(), posnet::PosnetError>(())
    /// ```
    pub fn build(instruction: &str, params: &[(&str, &str)]) -> Result<Self, PosnetError> {
        let parameters = params
            .iter()
            .map(|(name, value)| Parameter::new(name, *value))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(instruction, parameters))
    }

    /// Encode this frame into its wire form.
    ///
    /// Deterministic and side-effect free: the same frame always encodes
    /// to the same bytes.
    ///
    /// ## Errors
    ///
    /// [`PosnetError::Encoding`] if the instruction contains the tab
    /// terminator. Parameter invariants are enforced at construction.
    pub fn encode(&self) -> Result<Vec<u8>, PosnetError> {
        if self.instruction.as_bytes().contains(&TAB) {
            return Err(PosnetError::Encoding(format!(
                "instruction {:?} contains the tab terminator",
                self.instruction
            )));
        }

        let mut summed = Vec::with_capacity(self.instruction.len() + 16);
        summed.extend_from_slice(self.instruction.as_bytes());
        summed.push(TAB);
        for parameter in &self.parameters {
            parameter.encode_into(&mut summed);
        }

        let checksum = crc16_hex(&summed);

        let mut wire = Vec::with_capacity(summed.len() + MIN_FRAME_LEN);
        wire.push(STX);
        wire.extend_from_slice(&summed);
        wire.push(CHECKSUM_MARKER);
        wire.extend_from_slice(checksum.as_bytes());
        wire.push(ETX);
        Ok(wire)
    }

    /// Decode a raw frame, validating framing and checksum.
    ///
    /// The checksum is always recomputed over the summed region and
    /// compared (case-insensitively) against the four embedded characters;
    /// it is never trusted verbatim.
    ///
    /// ## Errors
    ///
    /// - [`PosnetError::Framing`] if the start/end markers or the checksum
    ///   marker are missing
    /// - [`PosnetError::Checksum`] if the recomputed checksum does not
    ///   match the embedded one
    /// - [`PosnetError::MalformedField`] if a field cannot be split into
    ///   name and value, or lacks its tab terminator
    pub fn decode(raw: &[u8]) -> Result<Self, PosnetError> {
        if raw.len() < MIN_FRAME_LEN {
            return Err(PosnetError::Framing(format!(
                "{} bytes is too short for a frame",
                raw.len()
            )));
        }
        if raw[0] != STX {
            return Err(PosnetError::Framing("missing STX start marker".into()));
        }
        if raw[raw.len() - 1] != ETX {
            return Err(PosnetError::Framing("missing ETX end marker".into()));
        }

        let marker_pos = raw.len() - CHECKSUM_SUFFIX_LEN;
        if raw[marker_pos] != CHECKSUM_MARKER {
            return Err(PosnetError::Framing(
                "checksum marker `#` not found before the trailing checksum".into(),
            ));
        }

        let summed = &raw[1..marker_pos];
        let received = &raw[marker_pos + 1..raw.len() - 1];
        let computed = crc16_hex(summed);
        if !received.eq_ignore_ascii_case(computed.as_bytes()) {
            return Err(PosnetError::Checksum {
                computed,
                received: String::from_utf8_lossy(received).into_owned(),
            });
        }

        if summed.is_empty() {
            return Err(PosnetError::MalformedField("frame body is empty".into()));
        }
        let body = summed
            .strip_suffix(&[TAB])
            .ok_or_else(|| PosnetError::MalformedField("field is missing its tab terminator".into()))?;

        let mut fields = body.split(|&byte| byte == TAB);
        // split always yields at least one element
        let instruction = field_text(fields.next().unwrap_or_default())?;
        let parameters = fields.map(parse_parameter).collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            instruction,
            parameters,
        })
    }
}

/// Split one tab-delimited field into a parameter.
fn parse_parameter(field: &[u8]) -> Result<Parameter, PosnetError> {
    match *field {
        [] => Err(PosnetError::MalformedField(
            "parameter field is empty".into(),
        )),
        [byte @ (b'@' | b'?'), ref value @ ..] => Ok(Parameter {
            name: ParamName::Reserved(byte),
            value: field_text(value)?,
        }),
        [first, second, ref value @ ..] => Ok(Parameter {
            name: ParamName::Named([first, second]),
            value: field_text(value)?,
        }),
        [_] => Err(PosnetError::MalformedField(format!(
            "field {:?} is too short to carry a parameter name",
            String::from_utf8_lossy(field)
        ))),
    }
}

fn field_text(bytes: &[u8]) -> Result<String, PosnetError> {
    String::from_utf8(bytes.to_vec()).map_err(|_| {
        PosnetError::MalformedField(format!(
            "field text {:?} is not valid UTF-8",
            String::from_utf8_lossy(bytes)
        ))
    })
}

// ============================================================================
// TESTS
// ============================================================================
