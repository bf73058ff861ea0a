//! Transport compression (`compress=zlib-stream`).
//!
//! The whole connection is one zlib stream. Every payload ends with a sync
//! flush, so a frame is complete once the buffer ends with [`ZLIB_SUFFIX`].

use std::io;

use flate2::{Decompress, FlushDecompress, Status};

use crate::error::MelisaError;

pub const ZLIB_SUFFIX: [u8; 4] = [0x00, 0x00, 0xFF, 0xFF];

/// One per connection; must be replaced whenever the socket is.
#[derive(Debug)]
pub struct ZlibInflater {
    decompress: Decompress,
    buffer: Vec<u8>,
}

impl Default for ZlibInflater {
    fn default() -> Self {
        Self::new()
    }
}

impl ZlibInflater {
    pub fn new() -> Self {
        Self {
            decompress: Decompress::new(true),
            buffer: Vec::new(),
        }
    }

    /// Feed a binary frame. Returns the decoded text once a payload is complete.
    pub fn push(&mut self, bytes: &[u8]) -> Result<Option<String>, MelisaError> {
        self.buffer.extend_from_slice(bytes);
        if !self.buffer.ends_with(&ZLIB_SUFFIX) {
            return Ok(None);
        }

        let mut out = Vec::with_capacity(self.buffer.len() * 4);
        let mut offset = 0;
        loop {
            let before = self.decompress.total_in();
            let status = self
                .decompress
                .decompress_vec(&self.buffer[offset..], &mut out, FlushDecompress::Sync)
                .map_err(|e| MelisaError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))?;
            offset += (self.decompress.total_in() - before) as usize;

            let drained = offset >= self.buffer.len() && out.len() < out.capacity();
            if drained || matches!(status, Status::StreamEnd | Status::BufError) {
                break;
            }
            out.reserve(out.capacity().max(1024));
        }
        self.buffer.clear();

        String::from_utf8(out)
            .map(Some)
            .map_err(|e| MelisaError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{Compress, Compression, FlushCompress};

    fn compress_frame(compress: &mut Compress, text: &str) -> Vec<u8> {
        let mut out = Vec::with_capacity(text.len() + 64);
        compress
            .compress_vec(text.as_bytes(), &mut out, FlushCompress::Sync)
            .unwrap();
        out
    }

    #[test]
    fn inflates_consecutive_payloads() {
        let mut compress = Compress::new(Compression::default(), true);
        let mut inflater = ZlibInflater::new();

        let first = compress_frame(&mut compress, r#"{"op":10,"d":{"heartbeat_interval":41250}}"#);
        let second = compress_frame(&mut compress, r#"{"op":11}"#);
        assert!(first.ends_with(&ZLIB_SUFFIX));

        assert_eq!(
            inflater.push(&first).unwrap().as_deref(),
            Some(r#"{"op":10,"d":{"heartbeat_interval":41250}}"#)
        );
        assert_eq!(inflater.push(&second).unwrap().as_deref(), Some(r#"{"op":11}"#));
    }

    #[test]
    fn waits_for_suffix() {
        let mut compress = Compress::new(Compression::default(), true);
        let mut inflater = ZlibInflater::new();
        let frame = compress_frame(&mut compress, r#"{"op":1,"d":null}"#);
        let (head, tail) = frame.split_at(frame.len() - 2);

        assert_eq!(inflater.push(head).unwrap(), None);
        assert_eq!(inflater.push(tail).unwrap().as_deref(), Some(r#"{"op":1,"d":null}"#));
    }

    #[test]
    fn large_payload_grows_output() {
        let mut compress = Compress::new(Compression::best(), true);
        let mut inflater = ZlibInflater::new();
        let text = format!(r#"{{"d":"{}"}}"#, "a".repeat(50_000));
        let frame = compress_frame(&mut compress, &text);

        assert_eq!(inflater.push(&frame).unwrap(), Some(text));
    }
}
