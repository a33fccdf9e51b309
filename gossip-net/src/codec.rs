//! Sentinel-delimited frame accumulation over a byte stream.
//!
//! A connection may carry any number of frames before EOF. A partial frame
//! left in the buffer at EOF is discarded silently by whoever stops feeding
//! the codec.

use {
  crate::wire::SENTINEL,
  bytes::{Buf, BytesMut},
};

#[derive(Default)]
pub struct FrameCodec {
  buf: BytesMut,
}

impl FrameCodec {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn feed(&mut self, chunk: &[u8]) {
    self.buf.extend_from_slice(chunk);
  }

  /// Splits off and returns the next complete frame, if the sentinel has
  /// been seen. Retains the tail for subsequent calls.
  pub fn next_frame(&mut self) -> Option<BytesMut> {
    let sentinel = SENTINEL.as_bytes();
    let pos = find_subslice(&self.buf, sentinel)?;
    let frame = self.buf.split_to(pos);
    self.buf.advance(sentinel.len());
    Some(frame)
  }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
  if needle.is_empty() || haystack.len() < needle.len() {
    return None;
  }
  haystack.windows(needle.len()).position(|window| window == needle)
}
