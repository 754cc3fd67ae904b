//! A pull-based byte reader over a [`ChunkSource`], with "unread" semantics across chunk
//! boundaries.
//!
//! This is the constant-memory heart of the crate: at most the current chunk, the immediately
//! prior chunk (kept only so a push-back can span the boundary between them), and a one-slot
//! push-back queue are held at any time — independent of how large the member being read is.

use crate::chunk_source::ChunkSource;
use crate::error::{Result, ZipError};

/// Pulls bytes from an upstream [`ChunkSource`], tracking an absolute offset and supporting two
/// flavours of push-back (see [`ByteReader::push_back_n`] and [`ByteReader::push_back_bytes`]).
pub struct ByteReader<S> {
    source: S,
    /// Bytes currently being handed out.
    chunk: Vec<u8>,
    /// Read position within `chunk`.
    offset: usize,
    /// The chunk that `chunk` replaced, retained only so `push_back_n` can reach across the
    /// boundary when the bytes to return span it.
    prev_chunk: Vec<u8>,
    /// The one-slot queue installed by `push_back_bytes`: the real current chunk, displaced.
    queued: Option<(Vec<u8>, usize)>,
    /// Set once the upstream source has yielded `None`.
    upstream_done: bool,
    absolute_offset: u64,
}

impl<S: ChunkSource> ByteReader<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            chunk: Vec::new(),
            offset: 0,
            prev_chunk: Vec::new(),
            queued: None,
            upstream_done: false,
            absolute_offset: 0,
        }
    }

    /// Ensures `self.offset < self.chunk.len()`, pulling from the queue or upstream as needed.
    /// Returns `false` only once both the queue and upstream are exhausted.
    fn ensure_available(&mut self) -> Result<bool> {
        while self.offset >= self.chunk.len() {
            if let Some((chunk, offset)) = self.queued.take() {
                self.prev_chunk = std::mem::replace(&mut self.chunk, chunk);
                self.offset = offset;
                continue;
            }

            if self.upstream_done {
                return Ok(false);
            }

            match self.source.next_chunk()? {
                Some(next) if next.is_empty() => continue,
                Some(next) => {
                    self.prev_chunk = std::mem::replace(&mut self.chunk, next);
                    self.offset = 0;
                }
                None => {
                    self.upstream_done = true;
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// Reads exactly `n` bytes, failing with [`ZipError::Truncated`] if upstream ends first.
    pub fn get(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(n);
        while buf.len() < n {
            if !self.ensure_available()? {
                return Err(ZipError::Truncated);
            }
            let available = self.chunk.len() - self.offset;
            let take = available.min(n - buf.len());
            buf.extend_from_slice(&self.chunk[self.offset..self.offset + take]);
            self.offset += take;
            self.absolute_offset += take as u64;
        }
        Ok(buf)
    }

    /// Returns a lazy sequence of chunks, each clipped to at most `cap` bytes, terminating
    /// (without failing) once upstream ends.
    pub fn yield_all(&mut self, cap: usize) -> YieldAll<'_, S> {
        YieldAll { reader: self, cap }
    }

    /// Re-exposes the last `k` bytes yielded by rewinding the offset. `k` must lie wholly within
    /// the current chunk or the immediately prior one.
    pub fn push_back_n(&mut self, k: usize) {
        if k == 0 {
            return;
        }
        if k <= self.offset {
            self.offset -= k;
        } else {
            let from_prev = k - self.offset;
            debug_assert!(from_prev <= self.prev_chunk.len(), "push_back_n precondition violated");
            let mut merged = Vec::with_capacity(from_prev + (self.chunk.len() - self.offset));
            merged.extend_from_slice(&self.prev_chunk[self.prev_chunk.len() - from_prev..]);
            merged.extend_from_slice(&self.chunk[self.offset..]);
            self.chunk = merged;
            self.offset = 0;
        }
        self.absolute_offset -= k as u64;
    }

    /// Installs `bytes` as the new current chunk, displacing the real current chunk (from its
    /// current offset onward) into the one-slot push-back queue.
    pub fn push_back_bytes(&mut self, bytes: Vec<u8>) {
        let len = bytes.len();
        let displaced = std::mem::replace(&mut self.chunk, bytes);
        self.queued = Some((displaced, self.offset));
        self.offset = 0;
        self.absolute_offset -= len as u64;
    }

    pub fn absolute_offset(&self) -> u64 {
        self.absolute_offset
    }

    pub fn into_inner(self) -> S {
        self.source
    }
}

/// The lazy sequence returned by [`ByteReader::yield_all`].
pub struct YieldAll<'a, S> {
    reader: &'a mut ByteReader<S>,
    cap: usize,
}

impl<'a, S: ChunkSource> Iterator for YieldAll<'a, S> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.ensure_available() {
            Ok(false) => None,
            Err(e) => Some(Err(e)),
            Ok(true) => {
                let available = self.reader.chunk.len() - self.reader.offset;
                let take = available.min(self.cap);
                let slice = self.reader.chunk[self.reader.offset..self.reader.offset + take].to_vec();
                self.reader.offset += take;
                self.reader.absolute_offset += take as u64;
                Some(Ok(slice))
            }
        }
    }
}
