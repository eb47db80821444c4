//! Two-line control protocol between the sensing and rendering boards.
//!
//! A message is a label line followed by a value line. Each field is padded
//! with `X` to a fixed width and terminated by `\n`:
//!
//! ```text
//! XXXXXXXXXBrightness\n
//! XXXXXXXXXXXXXXXXX42\n
//! ```
//!
//! The receiver strips every `X`, so padding on either side is accepted.

use std::io::{self, Write};

use super::params::ControlKind;
use crate::error::{Error, Result};

/// Padding byte of both fields.
pub const PAD: u8 = b'X';

/// Default field width, excluding the newline.
pub const DEFAULT_FIELD_WIDTH: usize = 19;

/// Bytes of one complete message with fields of `field_width`.
#[inline]
pub const fn payload_width(field_width: usize) -> usize {
    2 * (field_width + 1)
}

/// One decoded control update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlMessage {
    pub kind: ControlKind,
    pub value: i64,
}

impl ControlMessage {
    pub fn new(kind: ControlKind, value: i64) -> Self {
        Self { kind, value }
    }

    /// Wire form with fields of `field_width`.
    pub fn encode(&self, field_width: usize) -> Vec<u8> {
        encode_message(self.kind, self.value, field_width)
    }
}

fn pad_field(text: &str, field_width: usize, out: &mut Vec<u8>) {
    let padding = field_width.saturating_sub(text.len());
    out.extend(std::iter::repeat_n(PAD, padding));
    out.extend_from_slice(text.as_bytes());
    out.push(b'\n');
}

/// Encode a label line and a value line. Fields longer than `field_width`
/// are sent unpadded.
pub fn encode_message(kind: ControlKind, value: i64, field_width: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload_width(field_width));
    pad_field(kind.label(), field_width, &mut out);
    pad_field(&value.to_string(), field_width, &mut out);
    out
}

/// Write one message to a serial port.
pub fn send_message<W: Write + ?Sized>(
    port: &mut W,
    message: ControlMessage,
    field_width: usize,
) -> io::Result<()> {
    port.write_all(&message.encode(field_width))?;
    port.flush()
}

/// Strip padding, line endings and surrounding whitespace.
fn clean_field(line: &[u8]) -> String {
    String::from_utf8_lossy(line)
        .chars()
        .filter(|&c| c != PAD as char)
        .collect::<String>()
        .trim()
        .to_string()
}

fn parse_pair(label: &str, value: &str) -> Option<ControlMessage> {
    Some(ControlMessage {
        kind: ControlKind::from_label(label)?,
        value: value.parse().ok()?,
    })
}

/// Incremental receiver.
///
/// Bytes are buffered until two complete lines are present. If a full
/// payload's worth of bytes accumulates without that, those bytes are
/// dropped so malformed input can never stall the receiver.
#[derive(Debug, Clone)]
pub struct SerialReceiver {
    buffer: Vec<u8>,
    payload_width: usize,
}

impl Default for SerialReceiver {
    fn default() -> Self {
        Self::new(DEFAULT_FIELD_WIDTH)
    }
}

impl SerialReceiver {
    pub fn new(field_width: usize) -> Self {
        let payload_width = payload_width(field_width);
        Self {
            buffer: Vec::with_capacity(2 * payload_width),
            payload_width,
        }
    }

    pub fn payload_width(&self) -> usize {
        self.payload_width
    }

    /// Bytes waiting for a complete message.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Decode the next message, if one is complete.
    ///
    /// Lines are tried as label then value, and then swapped. When neither
    /// order parses, only the first line is dropped and reported as
    /// [`Error::TransportCorruption`], so a lost line costs one message.
    pub fn poll(&mut self) -> Option<Result<ControlMessage>> {
        let first = self.buffer.iter().position(|&b| b == b'\n');
        let second = first.and_then(|first| {
            self.buffer[first + 1..]
                .iter()
                .position(|&b| b == b'\n')
                .map(|offset| first + 1 + offset)
        });

        match (first, second) {
            (Some(first), Some(second)) => {
                let label = clean_field(&self.buffer[..first]);
                let value = clean_field(&self.buffer[first + 1..second]);

                match parse_pair(&label, &value).or_else(|| parse_pair(&value, &label)) {
                    Some(message) => {
                        self.buffer.drain(..=second);
                        Some(Ok(message))
                    }
                    None => {
                        // The second line may start the next message.
                        self.buffer.drain(..=first);
                        Some(Err(Error::TransportCorruption(format!(
                            "unparseable fields {:?} / {:?}",
                            label, value
                        ))))
                    }
                }
            }
            _ if self.buffer.len() >= self.payload_width => {
                self.buffer.drain(..self.payload_width);
                Some(Err(Error::TransportCorruption(format!(
                    "no complete message in {} bytes",
                    self.payload_width
                ))))
            }
            _ => None,
        }
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode() {
        let bytes = encode_message(ControlKind::Brightness, 42, DEFAULT_FIELD_WIDTH);
        assert_eq!(bytes, b"XXXXXXXXXBrightness\nXXXXXXXXXXXXXXXXX42\n".to_vec());
        assert_eq!(bytes.len(), payload_width(DEFAULT_FIELD_WIDTH));
    }

    #[test]
    fn test_trailing_padding() {
        let mut receiver = SerialReceiver::default();
        receiver.push(b"BrightnessXXXXX\n");
        assert!(receiver.poll().is_none());
        receiver.push(b"42XXXXXXXXXXXXXXX\n");
        let message = receiver.poll().unwrap().unwrap();
        assert_eq!(message, ControlMessage::new(ControlKind::Brightness, 42));
        assert_eq!(receiver.buffered(), 0);
    }

    #[test]
    fn test_swapped_lines() {
        let mut receiver = SerialReceiver::default();
        receiver.push(b"XXXXXXXXXXXXXXXXXX3\nXXXXXXXXXXXXChannel\n");
        assert_eq!(
            receiver.poll().unwrap().unwrap(),
            ControlMessage::new(ControlKind::Channel, 3)
        );
    }

    #[test]
    fn test_corrupt_message_dropped() {
        let mut receiver = SerialReceiver::default();
        receiver.push(b"XXXXXXXXXXXXXXXXBr?\nXXXXXXXXXXXXXXXXX4!\n");
        receiver.push(&encode_message(ControlKind::Speed, -7, DEFAULT_FIELD_WIDTH));
        // Each bad line is dropped on its own.
        for _ in 0..2 {
            assert!(matches!(
                receiver.poll(),
                Some(Err(Error::TransportCorruption(_)))
            ));
        }
        assert_eq!(
            receiver.poll().unwrap().unwrap(),
            ControlMessage::new(ControlKind::Speed, -7)
        );
        assert!(receiver.poll().is_none());
    }

    #[test]
    fn test_resyncs_after_lost_value_line() {
        let mut receiver = SerialReceiver::default();
        // The value line of a Channel message never arrived.
        receiver.push(b"XXXXXXXXXXXXChannel\n");
        for (kind, value) in [
            (ControlKind::Brightness, 7),
            (ControlKind::Speed, 3),
            (ControlKind::Channel, 1),
        ] {
            receiver.push(&encode_message(kind, value, DEFAULT_FIELD_WIDTH));
        }

        let mut received = Vec::new();
        while let Some(message) = receiver.poll() {
            received.push(message);
        }
        assert_eq!(received.len(), 4);
        assert!(matches!(received[0], Err(Error::TransportCorruption(_))));
        let messages: Vec<ControlMessage> =
            received.into_iter().skip(1).map(|m| m.unwrap()).collect();
        assert_eq!(
            messages,
            vec![
                ControlMessage::new(ControlKind::Brightness, 7),
                ControlMessage::new(ControlKind::Speed, 3),
                ControlMessage::new(ControlKind::Channel, 1),
            ]
        );
        assert_eq!(receiver.buffered(), 0);
    }

    #[test]
    fn test_unterminated_garbage_is_bounded() {
        let mut receiver = SerialReceiver::new(4);
        receiver.push(&[b'?'; 25]);
        assert!(matches!(
            receiver.poll(),
            Some(Err(Error::TransportCorruption(_)))
        ));
        assert_eq!(receiver.buffered(), 25 - payload_width(4));
        assert!(matches!(receiver.poll(), Some(Err(_))));
        assert_eq!(receiver.buffered(), 5);
        assert!(receiver.poll().is_none());
    }

    #[test]
    fn test_crlf_line_endings() {
        let mut receiver = SerialReceiver::default();
        receiver.push(b"Speed\r\n15\r\n");
        assert_eq!(
            receiver.poll().unwrap().unwrap(),
            ControlMessage::new(ControlKind::Speed, 15)
        );
    }

    #[test]
    fn test_send_message() {
        let mut port = Vec::new();
        send_message(&mut port, ControlMessage::new(ControlKind::Channel, 1), 8).unwrap();
        assert_eq!(port, b"XChannel\nXXXXXXX1\n".to_vec());
    }
}
