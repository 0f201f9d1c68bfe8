//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Line framing for command sessions
//!
//! Inbound bytes are split on `\n` with a trailing `\r` removed and decoded
//! as lossy UTF-8. Lines longer than the configured limit are dropped in
//! full and surface as a single [`InboundLine::Overflow`]. Outbound replies
//! are either response text, terminated with `\r\n`, or the raw prompt.

use bytes::{Buf, BufMut, BytesMut};
use std::io;
use std::sync::Arc;
use tokio_util::codec::{Decoder, Encoder};

/// A decoded unit of client input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundLine {
    /// A complete line without its terminator
    Line(String),
    /// A line exceeded the length limit and was discarded
    Overflow,
}

/// A unit of server output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Response text, written with `\r\n` line endings
    Line(String),
    /// Prompt, written verbatim with no terminator
    Prompt(Arc<str>),
}

/// Codec turning a byte stream into command lines
#[derive(Debug, Clone)]
pub struct LineCodec {
    max_length: usize,
    /// Where the next newline search resumes
    next_index: usize,
    /// Set while skipping the rest of an overlong line
    discarding: bool,
}

impl LineCodec {
    /// Create a codec accepting lines up to `max_length` bytes
    pub fn new(max_length: usize) -> Self {
        Self {
            max_length,
            next_index: 0,
            discarding: false,
        }
    }

    /// Longest accepted line, excluding the terminator
    pub fn max_length(&self) -> usize {
        self.max_length
    }
}

fn strip_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

impl Decoder for LineCodec {
    type Item = InboundLine;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<InboundLine>, io::Error> {
        let newline = src[self.next_index..]
            .iter()
            .position(|b| *b == b'\n')
            .map(|offset| self.next_index + offset);

        match newline {
            Some(index) => {
                self.next_index = 0;
                let frame = src.split_to(index + 1);
                if std::mem::take(&mut self.discarding) {
                    return Ok(Some(InboundLine::Overflow));
                }
                let line = strip_cr(&frame[..index]);
                if line.len() > self.max_length {
                    return Ok(Some(InboundLine::Overflow));
                }
                Ok(Some(InboundLine::Line(
                    String::from_utf8_lossy(line).into_owned(),
                )))
            }
            // One extra byte leaves room for a trailing '\r'.
            None if src.len() > self.max_length.saturating_add(1) => {
                self.discarding = true;
                self.next_index = 0;
                src.advance(src.len());
                Ok(None)
            }
            None => {
                self.next_index = src.len();
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<InboundLine>, io::Error> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        self.next_index = 0;
        if std::mem::take(&mut self.discarding) {
            src.clear();
            return Ok(Some(InboundLine::Overflow));
        }
        if src.is_empty() {
            return Ok(None);
        }
        let frame = src.split();
        let line = strip_cr(&frame);
        if line.len() > self.max_length {
            return Ok(Some(InboundLine::Overflow));
        }
        Ok(Some(InboundLine::Line(
            String::from_utf8_lossy(line).into_owned(),
        )))
    }
}

impl Encoder<Reply> for LineCodec {
    type Error = io::Error;

    fn encode(&mut self, item: Reply, dst: &mut BytesMut) -> Result<(), io::Error> {
        match item {
            Reply::Line(text) => {
                let body = text.strip_suffix('\n').unwrap_or(&text);
                dst.reserve(body.len() + 2);
                for line in body.split('\n') {
                    dst.put_slice(strip_cr(line.as_bytes()));
                    dst.put_slice(b"\r\n");
                }
            }
            Reply::Prompt(prompt) => dst.put_slice(prompt.as_bytes()),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str) -> Option<InboundLine> {
        Some(InboundLine::Line(text.to_string()))
    }

    #[test]
    fn test_decode_lines() {
        let mut codec = LineCodec::new(64);
        let mut buf = BytesMut::from("add 2 3\r\nlist\n");

        assert_eq!(codec.decode(&mut buf).unwrap(), line("add 2 3"));
        assert_eq!(codec.decode(&mut buf).unwrap(), line("list"));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_unbounded_max_length() {
        let mut codec = LineCodec::new(usize::MAX);
        let mut buf = BytesMut::from("add 2");
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert_eq!(buf.len(), 5);

        buf.extend_from_slice(b" 3\n");
        assert_eq!(codec.decode(&mut buf).unwrap(), line("add 2 3"));
    }

    #[test]
    fn test_decode_partial_line() {
        let mut codec = LineCodec::new(64);
        let mut buf = BytesMut::from("ad");
        assert_eq!(codec.decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(b"d 1 2\r");
        assert_eq!(codec.decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(b"\n");
        assert_eq!(codec.decode(&mut buf).unwrap(), line("add 1 2"));
    }

    #[test]
    fn test_decode_lossy_utf8() {
        let mut codec = LineCodec::new(64);
        let mut buf = BytesMut::from(&b"get \xff\r\n"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), line("get \u{fffd}"));
    }

    #[test]
    fn test_overflow_discards_whole_line() {
        let mut codec = LineCodec::new(4);
        let mut buf = BytesMut::from("abcdefgh");
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert!(buf.is_empty());

        buf.extend_from_slice(b"ijk\r\nok\r\n");
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(InboundLine::Overflow));
        assert_eq!(codec.decode(&mut buf).unwrap(), line("ok"));
    }

    #[test]
    fn test_overflow_in_single_chunk() {
        let mut codec = LineCodec::new(4);
        let mut buf = BytesMut::from("abcde\nabcd\r\n");
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(InboundLine::Overflow));
        assert_eq!(codec.decode(&mut buf).unwrap(), line("abcd"));
    }

    #[test]
    fn test_decode_eof() {
        let mut codec = LineCodec::new(64);
        let mut buf = BytesMut::from("date");
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), line("date"));
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_encode_replies() {
        let mut codec = LineCodec::new(64);
        let mut buf = BytesMut::new();

        codec.encode(Reply::Line("5".to_string()), &mut buf).unwrap();
        codec.encode(Reply::Line("a\nb\r\nc".to_string()), &mut buf).unwrap();
        codec.encode(Reply::Prompt(Arc::from("t>")), &mut buf).unwrap();

        assert_eq!(&buf[..], b"5\r\na\r\nb\r\nc\r\nt>");
    }

    #[test]
    fn test_encode_trailing_newline_not_doubled() {
        let mut codec = LineCodec::new(64);
        let mut buf = BytesMut::new();
        codec.encode(Reply::Line("hello\r\n".to_string()), &mut buf).unwrap();
        assert_eq!(&buf[..], b"hello\r\n");
    }

    #[test]
    fn test_encode_empty_line() {
        let mut codec = LineCodec::new(64);
        let mut buf = BytesMut::new();
        codec.encode(Reply::Line(String::new()), &mut buf).unwrap();
        assert_eq!(&buf[..], b"\r\n");
    }
}
