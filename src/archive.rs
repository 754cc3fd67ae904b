//! The top-level archive driver: dispatches on each record's leading signature and hands the
//! caller one member at a time.

use std::cell::Cell;

use crate::byte_reader::ByteReader;
use crate::chunk_source::ChunkSource;
use crate::error::{Result, ZipError};
use crate::member::{self, MemberBody, MemberState};
use crate::options::ReaderOptions;
use crate::spec::consts::{CDH_SIGNATURE, EOCDR_SIGNATURE, LFH_SIGNATURE};

/// Reads a ZIP archive as a sequence of members, pulling chunks from a [`ChunkSource`] and never
/// holding more than one member's worth of in-flight state in memory.
///
/// Call [`StreamZipReader::next_member`] repeatedly. Each call returns the next member's name,
/// declared size (when known upfront), and a plaintext iterator over its body — which must be
/// fully drained (iterated to `None`) before the next call, or that call fails with
/// [`ZipError::UnfinishedIteration`].
pub struct StreamZipReader<S> {
    reader: ByteReader<S>,
    options: ReaderOptions,
    state: Cell<MemberState>,
}

impl<S: ChunkSource> StreamZipReader<S> {
    pub fn new(source: S, options: ReaderOptions) -> Self {
        Self { reader: ByteReader::new(source), options, state: Cell::new(MemberState::Done) }
    }

    /// Advances to the next member, or `None` once the central directory (or an empty archive's
    /// end-of-central-directory record) is reached.
    pub fn next_member(&mut self) -> Result<Option<(Vec<u8>, Option<u64>, MemberBody<'_, S>)>> {
        match self.state.get() {
            MemberState::Open => return Err(ZipError::UnfinishedIteration),
            MemberState::Errored => return Ok(None),
            MemberState::Done => {}
        }

        let sig_bytes = self.reader.get(4)?;
        let signature = u32::from_le_bytes(sig_bytes.try_into().unwrap());

        match signature {
            LFH_SIGNATURE => {
                self.state.set(MemberState::Open);
                match member::parse_member(&mut self.reader, &self.options, &self.state) {
                    Ok(parsed) => Ok(Some((parsed.name, parsed.declared_size, parsed.body))),
                    Err(e) => {
                        self.state.set(MemberState::Errored);
                        Err(e)
                    }
                }
            }
            CDH_SIGNATURE | EOCDR_SIGNATURE => {
                tracing::debug!(signature = signature, "reached central directory, archive exhausted");
                self.drain_upstream();
                self.state.set(MemberState::Errored);
                Ok(None)
            }
            other => {
                self.state.set(MemberState::Errored);
                tracing::warn!(signature = other, "unexpected record signature");
                Err(ZipError::UnexpectedSignature(other, &[LFH_SIGNATURE, CDH_SIGNATURE, EOCDR_SIGNATURE]))
            }
        }
    }

    /// Pulls and discards whatever remains of the upstream source, so a `ChunkSource` with
    /// cleanup-on-exhaustion semantics (e.g. a generator closing a file handle) still runs that
    /// cleanup even though this crate stops reading once it reaches the central directory.
    fn drain_upstream(&mut self) {
        let cap = self.options.effective_chunk_cap();
        for chunk in self.reader.yield_all(cap) {
            if chunk.is_err() {
                break;
            }
        }
    }

    /// Consumes the reader, returning the underlying chunk source. Useful once the caller has
    /// stopped at a known point (e.g. after the last member) and wants back whatever resource it
    /// handed in.
    pub fn into_inner(self) -> S {
        self.reader.into_inner()
    }
}
