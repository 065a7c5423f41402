//! Message framing for the raw TCP stream
//!
//! `Line` framing cuts at `\n` and keeps the delimiter, so a relayed
//! message is byte-for-byte what the author sent. `Chunk` framing treats
//! whatever one read returned as a message. Both cap a message at
//! `max_len` bytes; longer input is split into fragments, and `Line`
//! backs a cut up to the last character boundary. Frames are raw bytes:
//! UTF-8 validity is the server's call, not the codec's.

use std::io;

use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::config::Framing;

/// Codec for chat traffic in both directions
#[derive(Debug, Clone)]
pub struct ChatCodec {
    framing: Framing,
    max_len: usize,
    /// Bytes of the buffer already scanned for `\n`
    next_index: usize,
}

impl ChatCodec {
    pub fn new(framing: Framing, max_len: usize) -> Self {
        Self {
            framing,
            max_len: max_len.max(1),
            next_index: 0,
        }
    }

    fn take(&mut self, src: &mut BytesMut, len: usize) -> Bytes {
        self.next_index = 0;
        src.split_to(len).freeze()
    }
}

impl Decoder for ChatCodec {
    type Item = Bytes;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, io::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        match self.framing {
            Framing::Chunk => {
                let len = src.len().min(self.max_len);
                Ok(Some(self.take(src, len)))
            }
            Framing::Line => {
                let window = src.len().min(self.max_len);
                let start = self.next_index.min(window);
                match src[start..window].iter().position(|b| *b == b'\n') {
                    Some(offset) => Ok(Some(self.take(src, start + offset + 1))),
                    None if window == self.max_len => {
                        let len = char_boundary(&src[..window]);
                        Ok(Some(self.take(src, len)))
                    }
                    None => {
                        self.next_index = window;
                        Ok(None)
                    }
                }
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, io::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        if src.is_empty() {
            Ok(None)
        } else {
            // unterminated last line
            let len = src.len();
            Ok(Some(self.take(src, len)))
        }
    }
}

/// Length of `window` trimmed so it does not end inside a UTF-8 character
///
/// Only the last three bytes are inspected. Input that isn't UTF-8 there is
/// cut at the full length.
fn char_boundary(window: &[u8]) -> usize {
    let len = window.len();
    for back in 1..=len.min(3) {
        let start = len - back;
        let lead = window[start];
        if lead & 0xC0 == 0x80 {
            continue;
        }
        let width = match lead {
            0x00..=0x7F => 1,
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => return len,
        };
        return if start + width > len && start > 0 {
            start
        } else {
            len
        };
    }
    len
}

impl Encoder<Bytes> for ChatCodec {
    type Error = io::Error;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), io::Error> {
        dst.reserve(item.len());
        dst.put(item);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;
    use tokio_util::codec::FramedRead;

    use super::*;

    fn line(max_len: usize) -> ChatCodec {
        ChatCodec::new(Framing::Line, max_len)
    }

    #[test]
    fn test_line_keeps_delimiter() {
        let mut codec = line(64);
        let mut buf = BytesMut::from(&b"hi\nthere\n"[..]);

        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(Bytes::from_static(b"hi\n"))
        );
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(Bytes::from_static(b"there\n"))
        );
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_line_across_reads() {
        let mut codec = line(64);
        let mut buf = BytesMut::from(&b"hel"[..]);

        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(b"lo\nnext");
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(Bytes::from_static(b"hello\n"))
        );
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert_eq!(&buf[..], b"next");
    }

    #[test]
    fn test_line_too_long_is_fragmented() {
        let mut codec = line(4);
        let mut buf = BytesMut::from(&b"abcdefg\n"[..]);

        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(Bytes::from_static(b"abcd"))
        );
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(Bytes::from_static(b"efg\n"))
        );
    }

    #[test]
    fn test_line_fragment_keeps_characters_whole() {
        let mut codec = line(4);
        let mut buf = BytesMut::from("abcé\n".as_bytes());

        let first = codec.decode(&mut buf).unwrap().unwrap();
        let second = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&first[..], b"abc");
        assert_eq!(&second[..], [0xc3, 0xa9, b'\n']);
        assert!(std::str::from_utf8(&first).is_ok());
        assert!(std::str::from_utf8(&second).is_ok());
    }

    #[test]
    fn test_char_boundary() {
        assert_eq!(char_boundary(b"abcd"), 4);
        assert_eq!(char_boundary("abé".as_bytes()), 4);
        assert_eq!(char_boundary(&[b'a', 0xe2, 0x82]), 1);
        // no lead byte in reach
        assert_eq!(char_boundary(&[0x80, 0x80, 0x80, 0x80]), 4);
        // a lone lead byte at the start can't be cut away
        assert_eq!(char_boundary(&[0xf0, 0x9f]), 2);
    }

    #[test]
    fn test_line_does_not_validate_utf8() {
        let mut codec = line(64);
        let mut buf = BytesMut::from(&[0xff, 0xfe, b'\n'][..]);

        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(Bytes::from_static(&[0xff, 0xfe, b'\n']))
        );
    }

    #[test]
    fn test_eof_flushes_partial_line() {
        let mut codec = line(64);
        let mut buf = BytesMut::from(&b"tail"[..]);

        assert_eq!(
            codec.decode_eof(&mut buf).unwrap(),
            Some(Bytes::from_static(b"tail"))
        );
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_chunk_takes_everything_available() {
        let mut codec = ChatCodec::new(Framing::Chunk, 64);
        let mut buf = BytesMut::from(&b"a\nb\nc"[..]);

        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(Bytes::from_static(b"a\nb\nc"))
        );
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_chunk_respects_max_len() {
        let mut codec = ChatCodec::new(Framing::Chunk, 3);
        let mut buf = BytesMut::from(&b"abcdef"[..]);

        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(Bytes::from_static(b"abc"))
        );
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(Bytes::from_static(b"def"))
        );
    }

    #[test]
    fn test_encode_is_verbatim() {
        let mut codec = line(64);
        let mut dst = BytesMut::new();
        codec.encode(Bytes::from_static(b"no newline"), &mut dst).unwrap();
        assert_eq!(&dst[..], b"no newline");
    }

    #[tokio::test]
    async fn test_framed_read_lines() {
        let input: &[u8] = b"one\ntwo\nthree";
        let frames: Vec<Bytes> = FramedRead::new(input, line(64))
            .map(|r| r.unwrap())
            .collect()
            .await;

        assert_eq!(
            frames,
            vec![
                Bytes::from_static(b"one\n"),
                Bytes::from_static(b"two\n"),
                Bytes::from_static(b"three"),
            ]
        );
    }
}
