//! The Bzip2 (method 12) decompressor, wrapping `bzip2::read::BzDecoder`.
//!
//! Like [`super::deflate64`], `BzDecoder` only exposes a blocking [`Read`] interface, so input is
//! fed through the same `WouldBlock`-signalling queue to drive it incrementally.

use std::collections::VecDeque;
use std::io::{self, Read};

use bzip2::read::BzDecoder;

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

pub(crate) struct Bzip2Decompressor {
    decoder: BzDecoder<FeedQueue>,
    done: bool,
    unused: usize,
}

impl Bzip2Decompressor {
    pub(crate) fn new() -> Self {
        Self { decoder: BzDecoder::new(FeedQueue::new()), done: false, unused: 0 }
    }
}

impl Decompressor for Bzip2Decompressor {
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
                Err(e) => return Err(ZipError::Bzip2Error(e.to_string())),
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
