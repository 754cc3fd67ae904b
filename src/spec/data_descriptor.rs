// Copyright (c) 2021 Harry [Majored] [hello@majored.pw]
// MIT License (https://github.com/Majored/rs-async-zip/blob/main/LICENSE)

//! The trailing data descriptor record (PKWARE APPNOTE 4.3.9), and the heuristic recovery of its
//! layout when the optional signature is absent.
//!
//! A data descriptor can legally appear in four shapes: with or without the `PK\x07\x08`
//! signature, and with 32-bit or ZIP64 (64-bit) size fields. Nothing in the record itself says
//! which shape is in play, so [`recover`] reads a fixed window and scores every shape against
//! what the reader already knows by the time the member's plaintext has been fully drained: the
//! header CRC-32, the observed compressed and uncompressed byte counts, and what a plausible
//! next-record signature looks like. This mirrors Info-ZIP's unzip descriptor-guessing heuristic.

use crate::error::{Result, ZipError};
use crate::spec::consts::{CDH_SIGNATURE, DATA_DESCRIPTOR_SIGNATURE, EOCDR_SIGNATURE, LFH_SIGNATURE};

/// A data descriptor decoded under one candidate layout.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct DataDescriptor {
    pub(crate) crc32: u32,
    pub(crate) compressed_size: u64,
    pub(crate) uncompressed_size: u64,
}

/// One of the four byte layouts a data descriptor might use, ordered longest-first so that ties
/// in [`recover`] resolve in favour of the more specific (longer, signature-bearing) reading.
#[derive(Copy, Clone, Debug)]
enum Candidate {
    /// `sig(4) crc(4) comp(8) uncomp(8)` — 24 bytes.
    Zip64WithSig,
    /// `crc(4) comp(8) uncomp(8)` — 20 bytes.
    Zip64Bare,
    /// `sig(4) crc(4) comp(4) uncomp(4)` — 16 bytes.
    Zip32WithSig,
    /// `crc(4) comp(4) uncomp(4)` — 12 bytes.
    Zip32Bare,
}

impl Candidate {
    const ALL: [Candidate; 4] =
        [Candidate::Zip64WithSig, Candidate::Zip64Bare, Candidate::Zip32WithSig, Candidate::Zip32Bare];

    fn is_zip64(self) -> bool {
        matches!(self, Candidate::Zip64WithSig | Candidate::Zip64Bare)
    }

    fn descriptor_len(self) -> usize {
        match self {
            Candidate::Zip64WithSig => 24,
            Candidate::Zip64Bare => 20,
            Candidate::Zip32WithSig => 16,
            Candidate::Zip32Bare => 12,
        }
    }

    fn has_signature(self) -> bool {
        matches!(self, Candidate::Zip64WithSig | Candidate::Zip32WithSig)
    }

    /// Decodes this candidate out of `buf`, which must be at least `descriptor_len()` bytes.
    fn decode(self, buf: &[u8]) -> DataDescriptor {
        let off = self.has_signature() as usize * 4;
        let crc32 = u32::from_le_bytes(buf[off..off + 4].try_into().unwrap());
        if self.is_zip64() {
            let compressed_size = u64::from_le_bytes(buf[off + 4..off + 12].try_into().unwrap());
            let uncompressed_size = u64::from_le_bytes(buf[off + 12..off + 20].try_into().unwrap());
            DataDescriptor { crc32, compressed_size, uncompressed_size }
        } else {
            let compressed_size = u32::from_le_bytes(buf[off + 4..off + 8].try_into().unwrap()) as u64;
            let uncompressed_size = u32::from_le_bytes(buf[off + 8..off + 12].try_into().unwrap()) as u64;
            DataDescriptor { crc32, compressed_size, uncompressed_size }
        }
    }
}

/// The five boolean components the heuristic scores each candidate against.
struct Components {
    signature: bool,
    crc: bool,
    compressed: bool,
    uncompressed: bool,
    next_signature: bool,
}

impl Components {
    fn count(&self) -> u32 {
        [self.signature, self.crc, self.compressed, self.uncompressed, self.next_signature]
            .iter()
            .filter(|b| **b)
            .count() as u32
    }
}

fn is_plausible_next_signature(sig: u32) -> bool {
    matches!(sig, LFH_SIGNATURE | CDH_SIGNATURE | EOCDR_SIGNATURE)
}

/// Evaluates the five components for `candidate` against `window`. `window` must be at least
/// `candidate.descriptor_len() + 4` bytes or every component is reported false.
fn evaluate(
    candidate: Candidate,
    window: &[u8],
    expected_crc: Option<u32>,
    observed_compressed: u64,
    observed_uncompressed: u64,
) -> Components {
    let len = candidate.descriptor_len();
    if window.len() < len + 4 {
        return Components { signature: false, crc: false, compressed: false, uncompressed: false, next_signature: false };
    }

    let signature =
        !candidate.has_signature() || window[0..4] == DATA_DESCRIPTOR_SIGNATURE.to_le_bytes();
    let decoded = candidate.decode(window);
    let crc = match expected_crc {
        Some(expected) => decoded.crc32 == expected,
        None => true,
    };
    let compressed = decoded.compressed_size == observed_compressed;
    let uncompressed = decoded.uncompressed_size == observed_uncompressed;
    let next_sig = u32::from_le_bytes(window[len..len + 4].try_into().unwrap());
    let next_signature = is_plausible_next_signature(next_sig);

    Components { signature, crc, compressed, uncompressed, next_signature }
}

/// The result of [`recover`]: the chosen descriptor and how many bytes of `window` it consumed.
/// The caller pushes back `window[consumed..]`.
pub(crate) struct Recovered {
    pub(crate) descriptor: DataDescriptor,
    pub(crate) consumed: usize,
}

/// Picks the best-explaining candidate layout for a data descriptor and validates it.
///
/// `window` holds the maximum candidate window (24 or 16 bytes, depending on whether ZIP64 is in
/// play) immediately followed by the 4-byte signature of whatever record comes next, so every
/// candidate's "does the next signature look right" check has bytes to examine. `expected_crc` is
/// `None` for AE-2 members, whose CRC-32 field is defined to be zero and so is not checked.
/// `suppress_32bit` excludes the two 32-bit candidates (set when either observed size already
/// exceeds `u32::MAX`, or the member's local header carried a ZIP64 extra field).
///
/// Returns the descriptor and the number of bytes of `window` it occupies; the caller is
/// responsible for pushing back the remainder.
pub(crate) fn recover(
    window: &[u8],
    expected_crc: Option<u32>,
    observed_compressed: u64,
    observed_uncompressed: u64,
    suppress_32bit: bool,
) -> Result<Recovered> {
    let mut best: Option<(Candidate, Components, u32)> = None;

    for candidate in Candidate::ALL {
        if suppress_32bit && !candidate.is_zip64() {
            continue;
        }
        let components = evaluate(candidate, window, expected_crc, observed_compressed, observed_uncompressed);
        let score = components.count();
        match &best {
            Some((_, _, best_score)) if *best_score >= score => {}
            _ => best = Some((candidate, components, score)),
        }
    }

    // suppress_32bit can in principle exclude every candidate only if window is also too short
    // for both ZIP64 shapes, which means truncated input; get(n) upstream would already have
    // failed with Truncated before we get here in that case.
    let (candidate, components, _) = best.expect("at least one candidate is always evaluated");

    if !components.signature {
        return Err(ZipError::UnexpectedSignature(
            u32::from_le_bytes(window[0..4].try_into().unwrap()),
            &[DATA_DESCRIPTOR_SIGNATURE],
        ));
    }
    let decoded = candidate.decode(window);
    if !components.crc {
        return Err(ZipError::CRC32Integrity { expected: expected_crc.unwrap_or(0), actual: decoded.crc32 });
    }
    if !components.compressed {
        return Err(ZipError::CompressedSizeIntegrity { expected: observed_compressed, actual: decoded.compressed_size });
    }
    if !components.uncompressed {
        return Err(ZipError::UncompressedSizeIntegrity {
            expected: observed_uncompressed,
            actual: decoded.uncompressed_size,
        });
    }
    if !components.next_signature {
        let len = candidate.descriptor_len();
        return Err(ZipError::UnexpectedSignature(
            u32::from_le_bytes(window[len..len + 4].try_into().unwrap()),
            &[LFH_SIGNATURE, CDH_SIGNATURE, EOCDR_SIGNATURE],
        ));
    }

    Ok(Recovered { descriptor: decoded, consumed: candidate.descriptor_len() })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn next_lfh() -> [u8; 4] {
        LFH_SIGNATURE.to_le_bytes()
    }

    #[test]
    fn recovers_32_bit_with_signature() {
        let mut window = Vec::new();
        window.extend_from_slice(&DATA_DESCRIPTOR_SIGNATURE.to_le_bytes());
        window.extend_from_slice(&0xDEADBEEFu32.to_le_bytes());
        window.extend_from_slice(&100u32.to_le_bytes());
        window.extend_from_slice(&200u32.to_le_bytes());
        window.extend_from_slice(&next_lfh());

        let recovered = recover(&window, Some(0xDEADBEEF), 100, 200, false).unwrap();
        assert_eq!(recovered.consumed, 16);
        assert_eq!(recovered.descriptor.compressed_size, 100);
        assert_eq!(recovered.descriptor.uncompressed_size, 200);
    }

    #[test]
    fn recovers_32_bit_bare() {
        let mut window = Vec::new();
        window.extend_from_slice(&0xCAFEBABEu32.to_le_bytes());
        window.extend_from_slice(&50u32.to_le_bytes());
        window.extend_from_slice(&60u32.to_le_bytes());
        window.extend_from_slice(&next_lfh());
        window.extend_from_slice(&[0u8; 12]); // pad so the zip64 candidates' windows are also long enough

        let recovered = recover(&window, Some(0xCAFEBABE), 50, 60, false).unwrap();
        assert_eq!(recovered.consumed, 12);
        assert_eq!(recovered.descriptor.compressed_size, 50);
    }

    #[test]
    fn recovers_zip64_bare() {
        let mut window = Vec::new();
        window.extend_from_slice(&0x11223344u32.to_le_bytes());
        window.extend_from_slice(&(1u64 << 33).to_le_bytes());
        window.extend_from_slice(&(1u64 << 34).to_le_bytes());
        window.extend_from_slice(&next_lfh());

        let recovered = recover(&window, Some(0x11223344), 1 << 33, 1 << 34, true).unwrap();
        assert_eq!(recovered.consumed, 20);
        assert_eq!(recovered.descriptor.compressed_size, 1 << 33);
    }

    #[test]
    fn ae2_skips_crc_check() {
        let mut window = Vec::new();
        window.extend_from_slice(&0u32.to_le_bytes()); // AE-2 always zeroes the CRC field
        window.extend_from_slice(&10u32.to_le_bytes());
        window.extend_from_slice(&20u32.to_le_bytes());
        window.extend_from_slice(&next_lfh());
        window.extend_from_slice(&[0u8; 12]);

        let recovered = recover(&window, None, 10, 20, false).unwrap();
        assert_eq!(recovered.descriptor.compressed_size, 10);
    }

    #[test]
    fn mismatched_compressed_size_is_rejected() {
        let mut window = Vec::new();
        window.extend_from_slice(&0xCAFEBABEu32.to_le_bytes());
        window.extend_from_slice(&50u32.to_le_bytes());
        window.extend_from_slice(&60u32.to_le_bytes());
        window.extend_from_slice(&next_lfh());
        window.extend_from_slice(&[0u8; 12]);

        let err = recover(&window, Some(0xCAFEBABE), 999, 60, false).unwrap_err();
        assert!(matches!(err, ZipError::CompressedSizeIntegrity { .. }));
    }
}
