//! The Deflate64 (method 9) decompressor, wrapping the `deflate64` crate's reader-based decoder.
//!
//! `Deflate64Decoder` only exposes a blocking [`Read`] interface, not flate2's incremental
//! `Decompress`. To drive it from pushed chunks without buffering the whole member, input is fed
//! through a small internal queue that reports [`io::ErrorKind::WouldBlock`] instead of EOF once
//! it runs dry — the decoder's `read` calls then surface that as "no more output until more input
//! arrives" rather than finishing the stream early.

use std::collections::VecDeque;
use std::io::{self, BufRead, Read};

use deflate64::Deflate64Decoder;

use super::Decompressor;
use crate::error::{Result, ZipError};

const OUTPUT_BUF_LEN: usize = 64 * 1024;

struct FeedQueue {
    pending: VecDeque<u8>,
}

impl FeedQueue {
    fn new() -> Self {
        Self { pending: VecDeque::new() }
    }
}

impl Read for FeedQueue {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.pending.len());
        for slot in buf[..n].iter_mut() {
            *slot = self.pending.pop_front().expect("checked len above");
        }
        if n == 0 {
            return Err(io::Error::new(io::ErrorKind::WouldBlock, "no input buffered"));
        }
        Ok(n)
    }
}

impl BufRead for FeedQueue {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.pending.is_empty() {
            return Err(io::Error::new(io::ErrorKind::WouldBlock, "no input buffered"));
        }
        Ok(self.pending.make_contiguous())
    }

    fn consume(&mut self, amt: usize) {
        self.pending.drain(..amt);
    }
}

pub(crate) struct Deflate64Decompressor {
    decoder: Deflate64Decoder<FeedQueue>,
    done: bool,
    unused: usize,
}

impl Deflate64Decompressor {
    pub(crate) fn new() -> Self {
        Self { decoder: Deflate64Decoder::new(FeedQueue::new()), done: false, unused: 0 }
    }
}

impl Decompressor for Deflate64Decompressor {
    fn push(&mut self, chunk: &[u8]) -> Result<Vec<Vec<u8>>> {
        if self.done {
            self.unused = chunk.len();
            return Ok(Vec::new());
        }

        self.decoder.get_mut().pending.extend(chunk.iter().copied());

        let mut out = Vec::new();
        let mut buf = vec![0u8; OUTPUT_BUF_LEN];
        loop {
            match self.decoder.read(&mut buf) {
                Ok(0) => {
                    self.done = true;
                    self.unused = self.decoder.get_ref().pending.len();
                    break;
                }
                Ok(n) => out.push(buf[..n].to_vec()),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(ZipError::DeflateError(e.to_string())),
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
