/*!
    wire protocol of the link: newline-delimited ascii text, one message per line.

    | line | direction | meaning |
    |------|-----------|---------|
    | `SET:<float, 2dp>` | either | commanded duty-cycle percentage |
    | `MEAS:<float, 2dp>` | receiver → transmitter | estimated duty-cycle percentage |
    | `hello world` (case-insensitive) | transmitter → receiver | handshake greeting |
    | `ACK:hello` | receiver → transmitter | handshake acknowledgement |
    | anything else | either | unclassified, logged or ignored |

    no binary framing, no checksums, no length prefixes. [LineParser] turns raw
    uart bytes into [Message]s, the `encode_*` functions produce the outgoing lines.
*/

use core::fmt::{self, Write};

use thiserror::Error;

/// longest accepted line, terminator included
pub const MAX_LINE: usize = 64;

/// one newline-terminated outgoing line
pub type Line = heapless::Vec<u8, MAX_LINE>;

/// one classified incoming line
#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    /// commanded duty-cycle percentage
    Setpoint(f32),
    /// duty-cycle percentage estimated on the far side
    Measurement(f32),
    /// handshake greeting
    Greeting,
    /// handshake acknowledgement
    Acknowledge,
    /// anything that matches no known form, kept for diagnostics
    Unknown(heapless::String<MAX_LINE>),
}

/// why a received line could not be classified
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// recognized prefix but the payload does not parse as a number
    #[error("malformed numeric payload")]
    BadNumber,
    /// the line is not valid utf-8
    #[error("line is not valid utf-8")]
    BadEncoding,
    /// no terminator arrived within [MAX_LINE] bytes
    #[error("line exceeds maximum length")]
    Overflow,
}

/**
    reassembles incoming bytes into complete lines and classifies them.

    bytes may arrive in any chunking, partial lines are buffered across
    [feed](Self::feed) calls. A malformed line is reported once and never
    desynchronizes the following lines.
*/
#[derive(Default)]
pub struct LineParser {
    buffer: heapless::Vec<u8, MAX_LINE>,
    overflowed: bool,
    dropped: u16,
}

impl LineParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// append received bytes and iterate over the lines they complete
    pub fn feed<'p>(&'p mut self, bytes: &'p [u8]) -> Messages<'p> {
        Messages {parser: self, input: bytes}
    }

    /// number of lines dropped as malformed since creation
    pub fn dropped(&self) -> u16 {
        self.dropped
    }

    /// classify the buffered line and reset for the next one, `None` for blank lines
    fn complete(&mut self) -> Option<Result<Message, ParseError>> {
        let result = if core::mem::take(&mut self.overflowed) {
            Err(ParseError::Overflow)
        }
        else {
            match core::str::from_utf8(&self.buffer) {
                Err(_) => Err(ParseError::BadEncoding),
                Ok(text) => {
                    let text = text.trim();
                    if text.is_empty() {
                        self.buffer.clear();
                        return None
                    }
                    classify(text)
                },
            }
        };
        self.buffer.clear();
        if result.is_err() {
            self.dropped = self.dropped.saturating_add(1);
        }
        Some(result)
    }
}

/// iterator over the messages completed by one [LineParser::feed]
pub struct Messages<'p> {
    parser: &'p mut LineParser,
    input: &'p [u8],
}

impl Iterator for Messages<'_> {
    type Item = Result<Message, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((&byte, rest)) = self.input.split_first() {
            self.input = rest;
            if byte != b'\n' {
                if self.parser.buffer.push(byte).is_err() {
                    self.parser.overflowed = true;
                }
                continue
            }
            if let Some(result) = self.parser.complete() {
                return Some(result)
            }
        }
        None
    }
}

/// classify one trimmed, non-empty line
pub fn classify(line: &str) -> Result<Message, ParseError> {
    if let Some(payload) = line.strip_prefix("SET:") {
        parse_percent(payload).map(Message::Setpoint)
    }
    else if let Some(payload) = line.strip_prefix("MEAS:") {
        parse_percent(payload).map(Message::Measurement)
    }
    else if line.eq_ignore_ascii_case("hello world") {
        Ok(Message::Greeting)
    }
    else if line == "ACK:hello" {
        Ok(Message::Acknowledge)
    }
    else {
        line.try_into()
            .map(Message::Unknown)
            .map_err(|_| ParseError::Overflow)
    }
}

fn parse_percent(payload: &str) -> Result<f32, ParseError> {
    payload.trim().parse()
        .map_err(|_| ParseError::BadNumber)
}

/// spelling of the handshake greeting, both variants exist in the field
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum GreetingStyle {
    /// `hello world`
    #[default]
    Plain,
    /// `Hello World`
    Capitalized,
}
impl GreetingStyle {
    pub const fn text(self) -> &'static str {
        match self {
            Self::Plain => "hello world",
            Self::Capitalized => "Hello World",
        }
    }
}

pub fn encode_setpoint(percent: f32) -> Line {
    encode_line(format_args!("SET:{:.2}", percent))
}
pub fn encode_measurement(percent: f32) -> Line {
    encode_line(format_args!("MEAS:{:.2}", percent))
}
pub fn encode_greeting(style: GreetingStyle) -> Line {
    encode_line(format_args!("{}", style.text()))
}
pub fn encode_ack() -> Line {
    encode_line(format_args!("ACK:hello"))
}

fn encode_line(args: fmt::Arguments) -> Line {
    let mut line = heapless::String::<MAX_LINE>::new();
    // capacity is sized for the longest payload, a clamped percent always fits
    let _ = write!(line, "{args}\n");
    line.into_bytes()
}
