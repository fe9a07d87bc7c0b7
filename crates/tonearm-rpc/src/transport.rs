//! Newline-delimited transport codec for the MPD text protocol.
//!
//! Frame format:
//! ```text
//! +--------------------------+------+
//! |  N bytes (UTF-8 text)    | '\n' |
//! +--------------------------+------+
//! ```
//!
//! Reads accumulate across socket reads until a newline arrives. A line longer
//! than the configured maximum is a protocol violation and fails the decode.

use bytes::{BufMut, BytesMut};
use std::io;
use tokio_util::codec::{Decoder, Encoder};

use crate::protocol::Command;

/// Default maximum line length in bytes, excluding the newline
pub const DEFAULT_MAX_LINE_LENGTH: usize = 1024;

/// Codec for newline-terminated protocol lines
#[derive(Debug)]
pub struct MpdLineCodec {
    max_length: usize,
    /// Bytes already scanned for a newline
    next_index: usize,
}

impl MpdLineCodec {
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_length(DEFAULT_MAX_LINE_LENGTH)
    }

    #[must_use]
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            max_length,
            next_index: 0,
        }
    }

    #[must_use]
    pub fn max_length(&self) -> usize {
        self.max_length
    }
}

impl Default for MpdLineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for MpdLineCodec {
    type Item = String;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let newline = src[self.next_index..]
            .iter()
            .position(|b| *b == b'\n')
            .map(|offset| self.next_index + offset);

        let Some(newline) = newline else {
            // A trailing `\r` may still be followed by its `\n`
            let pending = src.len() - usize::from(src.last() == Some(&b'\r'));
            if pending > self.max_length {
                return Err(CodecError::LineTooLong(self.max_length));
            }
            self.next_index = src.len();
            return Ok(None);
        };

        self.next_index = 0;

        let mut line = src.split_to(newline + 1);
        line.truncate(newline);
        if line.last() == Some(&b'\r') {
            line.truncate(line.len() - 1);
        }

        if line.len() > self.max_length {
            return Err(CodecError::LineTooLong(self.max_length));
        }

        let text = std::str::from_utf8(&line)?;
        Ok(Some(text.to_string()))
    }

    /// A partial line left in the buffer when the peer closes is dropped, so the
    /// stream ends cleanly and the reader sees end-of-stream.
    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(line) = self.decode(buf)? {
            return Ok(Some(line));
        }

        if !buf.is_empty() {
            tracing::trace!("Dropping {} bytes of unterminated line at EOF", buf.len());
            buf.clear();
        }
        self.next_index = 0;
        Ok(None)
    }
}

impl Encoder<Command> for MpdLineCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Command, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let line = item.as_str().as_bytes();
        dst.reserve(line.len() + 1);
        dst.put_slice(line);
        dst.put_u8(b'\n');
        Ok(())
    }
}

/// Errors that can occur during codec operations
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("Line too long (max: {0} bytes)")]
    LineTooLong(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_single_line() {
        let mut codec = MpdLineCodec::new();
        let mut buf = BytesMut::from("volume: 80\n");

        let line = codec.decode(&mut buf).unwrap();
        assert_eq!(line.as_deref(), Some("volume: 80"));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_empty_buffer() {
        let mut codec = MpdLineCodec::new();
        let mut buf = BytesMut::new();

        let result = codec.decode(&mut buf).unwrap();
        assert!(result.is_none(), "Empty buffer should return None");
    }

    #[test]
    fn test_partial_decode() {
        let mut codec = MpdLineCodec::new();
        let mut buf = BytesMut::from("file: a/b");

        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b".mp3\nOK");
        assert_eq!(
            codec.decode(&mut buf).unwrap().as_deref(),
            Some("file: a/b.mp3")
        );
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"\n");
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("OK"));
    }

    #[test]
    fn test_multiple_lines_in_buffer() {
        let mut codec = MpdLineCodec::new();
        let mut buf = BytesMut::from("file: a.mp3\nfile: c.mp3\nOK\n");

        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("file: a.mp3"));
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("file: c.mp3"));
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("OK"));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_carriage_return_is_stripped() {
        let mut codec = MpdLineCodec::new();
        let mut buf = BytesMut::from("OK\r\n");

        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("OK"));
    }

    #[test]
    fn test_line_too_long_without_newline() {
        let mut codec = MpdLineCodec::with_max_length(8);
        let mut buf = BytesMut::from("file: way/too/long");

        let result = codec.decode(&mut buf);
        assert!(matches!(result, Err(CodecError::LineTooLong(8))));
    }

    #[test]
    fn test_line_too_long_with_newline() {
        let mut codec = MpdLineCodec::with_max_length(8);
        let mut buf = BytesMut::from("file: way/too/long\n");

        let result = codec.decode(&mut buf);
        assert!(matches!(result, Err(CodecError::LineTooLong(8))));
    }

    #[test]
    fn test_line_at_max_length_is_accepted() {
        let mut codec = MpdLineCodec::with_max_length(2);
        let mut buf = BytesMut::from("OK\n");

        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("OK"));
    }

    #[test]
    fn test_crlf_split_across_reads_at_max_length() {
        let mut codec = MpdLineCodec::with_max_length(2);
        let mut buf = BytesMut::from("OK\r");

        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"\n");
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("OK"));
    }

    #[test]
    fn test_invalid_utf8() {
        let mut codec = MpdLineCodec::new();
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&[0xff, 0xfe, b'\n']);

        let result = codec.decode(&mut buf);
        assert!(matches!(result, Err(CodecError::Utf8(_))));
    }

    #[test]
    fn test_decode_eof_drops_partial_line() {
        let mut codec = MpdLineCodec::new();
        let mut buf = BytesMut::from("file: a.mp3\nfile: trunc");

        assert_eq!(
            codec.decode_eof(&mut buf).unwrap().as_deref(),
            Some("file: a.mp3")
        );
        assert!(codec.decode_eof(&mut buf).unwrap().is_none());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_encode_appends_newline() {
        let mut codec = MpdLineCodec::new();
        let mut buf = BytesMut::new();

        codec.encode(Command::status(), &mut buf).unwrap();
        codec.encode(Command::set_volume(5), &mut buf).unwrap();

        assert_eq!(&buf[..], b"status\nsetvol 5 \n");
    }

    #[test]
    fn test_codec_error_display() {
        let err = CodecError::LineTooLong(1024);
        let msg = err.to_string();
        assert!(msg.contains("1024"));
        assert!(msg.contains("too long"));

        let io_err = io::Error::new(io::ErrorKind::ConnectionReset, "connection reset");
        let msg = CodecError::Io(io_err).to_string();
        assert!(msg.contains("I/O error"));
        assert!(msg.contains("connection reset"));
    }
}
