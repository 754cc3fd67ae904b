//! Streaming decompressors, one per supported ZIP compression method.
//!
//! Every variant implements the same push/is-done/unused contract described in
//! [`Decompressor`], so [`crate::member`] can drive any of them identically regardless of the
//! underlying codec.

#[cfg(feature = "bzip2")]
mod bzip2;
#[cfg(feature = "deflate")]
mod deflate;
#[cfg(feature = "deflate64")]
mod deflate64;
mod store;

#[cfg(feature = "bzip2")]
pub(crate) use bzip2::Bzip2Decompressor;
#[cfg(feature = "deflate")]
pub(crate) use deflate::DeflateDecompressor;
#[cfg(feature = "deflate64")]
pub(crate) use deflate64::Deflate64Decompressor;
pub(crate) use store::StoreDecompressor;

use crate::error::Result;

/// A streaming decoder driven by repeatedly pushing compressed chunks and draining the plaintext
/// chunks each push produces.
///
/// Implementations must buffer no more than a single upstream chunk plus whatever internal
/// dictionary/history window the underlying codec requires — never the whole member.
pub(crate) trait Decompressor {
    /// Feeds one compressed chunk in, returning however many plaintext chunks it yielded.
    /// Returns an empty vector if the chunk produced no output yet, or if the stream is already
    /// done.
    fn push(&mut self, chunk: &[u8]) -> Result<Vec<Vec<u8>>>;

    /// True once the logical compressed stream has ended — either because the codec signalled
    /// its own end marker, or because a byte-counted variant (`Store`) reached its limit.
    fn is_done(&self) -> bool;

    /// The number of trailing bytes of the most recent chunk passed to `push` that were not
    /// consumed, because the stream ended inside that chunk. Meaningful only once `is_done()` is
    /// true.
    fn unused(&self) -> usize;
}

/// Constructs the decompressor for `method`. `known_size` is the byte count to pass through
/// unchanged; only [`StoreDecompressor`] uses it, and only the Store method can ever reach this
/// point without one (the stored + data-descriptor + unknown-size combination is rejected earlier
/// by [`crate::member`] as `NotStreamUnzippable`).
pub(crate) fn for_method(method: u16, known_size: Option<u64>) -> Result<Box<dyn Decompressor>> {
    Ok(match method {
        0 => Box::new(StoreDecompressor::new(
            known_size.expect("stored members always have a known size by the time a decompressor is built"),
        )),
        #[cfg(feature = "deflate")]
        8 => Box::new(DeflateDecompressor::new()),
        #[cfg(feature = "deflate64")]
        9 => Box::new(Deflate64Decompressor::new()),
        #[cfg(feature = "bzip2")]
        12 => Box::new(Bzip2Decompressor::new()),
        other => return Err(crate::error::ZipError::UnsupportedCompressionType(other)),
    })
}
