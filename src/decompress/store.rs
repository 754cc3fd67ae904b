//! The Stored (method 0) "decompressor": a pass-through bounded to a known byte count.

use super::Decompressor;
use crate::error::Result;

pub(crate) struct StoreDecompressor {
    remaining: u64,
    unused: usize,
}

impl StoreDecompressor {
    pub(crate) fn new(size: u64) -> Self {
        Self { remaining: size, unused: 0 }
    }
}

impl Decompressor for StoreDecompressor {
    fn push(&mut self, chunk: &[u8]) -> Result<Vec<Vec<u8>>> {
        if self.remaining == 0 {
            self.unused = chunk.len();
            return Ok(Vec::new());
        }

        let take = (chunk.len() as u64).min(self.remaining) as usize;
        self.remaining -= take as u64;
        self.unused = chunk.len() - take;
        if take == 0 {
            return Ok(Vec::new());
        }
        Ok(vec![chunk[..take].to_vec()])
    }

    fn is_done(&self) -> bool {
        self.remaining == 0
    }

    fn unused(&self) -> usize {
        self.unused
    }
}
