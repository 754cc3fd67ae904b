//! The DEFLATE (method 8) decompressor, wrapping [`flate2`]'s raw (header-less) inflater.

use flate2::{Decompress, FlushDecompress, Status};

use super::Decompressor;
use crate::error::{Result, ZipError};

const OUTPUT_BUF_LEN: usize = 32 * 1024;

pub(crate) struct DeflateDecompressor {
    inner: Decompress,
    done: bool,
    unused: usize,
}

impl DeflateDecompressor {
    pub(crate) fn new() -> Self {
        Self { inner: Decompress::new(false), done: false, unused: 0 }
    }
}

impl Decompressor for DeflateDecompressor {
    fn push(&mut self, chunk: &[u8]) -> Result<Vec<Vec<u8>>> {
        if self.done {
            self.unused = chunk.len();
            return Ok(Vec::new());
        }

        let mut out = Vec::new();
        let mut pos = 0usize;
        let mut buf = vec![0u8; OUTPUT_BUF_LEN];

        loop {
            let before_in = self.inner.total_in();
            let before_out = self.inner.total_out();

            let status = self
                .inner
                .decompress(&chunk[pos..], &mut buf, FlushDecompress::None)
                .map_err(|e| ZipError::DeflateError(e.to_string()))?;

            let consumed = (self.inner.total_in() - before_in) as usize;
            let produced = (self.inner.total_out() - before_out) as usize;
            pos += consumed;
            if produced > 0 {
                out.push(buf[..produced].to_vec());
            }

            if status == Status::StreamEnd {
                self.done = true;
                self.unused = chunk.len() - pos;
                break;
            }
            if consumed == 0 && produced == 0 {
                break;
            }
            if pos >= chunk.len() {
                break;
            }
        }

        Ok(out)
    }

    fn is_done(&self) -> bool {
        self.done
    }

    fn unused(&self) -> usize {
        self.unused
    }
}
