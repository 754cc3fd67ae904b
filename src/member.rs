//! Parsing and streaming of a single member's local file header, body, and trailer.
//!
//! [`parse_member`] implements the fourteen-step algorithm that turns the bytes immediately
//! following a local file header signature into a running plaintext iterator — classifying
//! encryption and compression, resolving ZIP64 sizes, and wiring up the
//! decrypt → decompress → account → verify pipeline. The returned [`MemberBody`] is what actually
//! drives that pipeline, one pulled chunk at a time.

use std::cell::Cell;
use std::collections::VecDeque;

use crc32fast::Hasher;

use crate::byte_reader::ByteReader;
use crate::chunk_source::ChunkSource;
use crate::crypto::{AesCipher, Decryptor, KeyStrength, ZipCryptoCipher, ZIPCRYPTO_HEADER_LEN};
use crate::decompress::{self, Decompressor};
use crate::error::{EncryptionMechanism, Result, ZipError};
use crate::options::ReaderOptions;
use crate::spec::consts::{LOCAL_FILE_HEADER_LENGTH, NON_ZIP64_MAX_SIZE};
use crate::spec::data_descriptor;
use crate::spec::extra_field::{parse_aes_extra, parse_extra_fields, parse_zip64_extra};
use crate::spec::header::LocalFileHeader;

/// The result of parsing one member's header: its name, its declared size (when known upfront),
/// and the body iterator that streams and verifies its plaintext.
pub(crate) struct ParsedMember<'a, S> {
    pub(crate) name: Vec<u8>,
    pub(crate) declared_size: Option<u64>,
    pub(crate) body: MemberBody<'a, S>,
}

/// Tracks, across the borrow-checker-enforced lifetime of a [`MemberBody`], whether that member's
/// plaintext was ever fully drained by the consumer. [`crate::archive`] consults this before
/// allowing the next member to be requested, raising [`ZipError::UnfinishedIteration`] if not.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum MemberState {
    /// A member is currently being read, or hasn't been drained to completion yet.
    Open,
    /// The previous member's plaintext iterator ran to exhaustion cleanly.
    Done,
    /// The previous member's plaintext iterator yielded an error; the archive cannot recover.
    Errored,
}

fn strength_mechanism(strength: KeyStrength, is_ae2: bool) -> (EncryptionMechanism, EncryptionMechanism) {
    let version = if is_ae2 { EncryptionMechanism::Ae2 } else { EncryptionMechanism::Ae1 };
    let key_strength = match strength {
        KeyStrength::Aes128 => EncryptionMechanism::Aes128,
        KeyStrength::Aes192 => EncryptionMechanism::Aes192,
        KeyStrength::Aes256 => EncryptionMechanism::Aes256,
    };
    (version, key_strength)
}

/// Parses a member, assuming the local file header's 4-byte signature has already been consumed
/// by the caller (see [`crate::archive`]).
pub(crate) fn parse_member<'a, S: ChunkSource>(
    reader: &'a mut ByteReader<S>,
    options: &ReaderOptions,
    state: &'a Cell<MemberState>,
) -> Result<ParsedMember<'a, S>> {
    // Step 1: fixed 26-byte record.
    let header_bytes = reader.get(LOCAL_FILE_HEADER_LENGTH)?;
    let raw_flags = u16::from_le_bytes(header_bytes[2..4].try_into().unwrap());
    let header = LocalFileHeader::parse(&header_bytes);

    // Step 2: reject unsupported flag bits.
    if header.flags.has_unsupported_bits() {
        return Err(ZipError::UnsupportedFlags(raw_flags));
    }

    // Step 3 & 4: name and extra fields.
    let name = reader.get(header.file_name_len as usize)?;
    let extra_bytes = reader.get(header.extra_field_len as usize)?;
    let fields = parse_extra_fields(&extra_bytes);

    // Step 5: classify encryption.
    let aes_info = if header.flags.encrypted && header.compression == 99 {
        Some(parse_aes_extra(&fields)?)
    } else {
        None
    };
    let mechanism = if !header.flags.encrypted {
        EncryptionMechanism::None
    } else if header.compression != 99 {
        EncryptionMechanism::ZipCrypto
    } else {
        let aes = aes_info.as_ref().expect("set above when compression == 99");
        if aes.is_ae2 { EncryptionMechanism::Ae2 } else { EncryptionMechanism::Ae1 }
    };

    // Step 6: password requirement and policy allow-set.
    let allowed = options.mechanisms();
    let password = options.password_bytes();
    match mechanism {
        EncryptionMechanism::None => {
            if password.is_some() && !allowed.allows(EncryptionMechanism::None) {
                return Err(ZipError::FileIsNotEncrypted);
            }
        }
        EncryptionMechanism::ZipCrypto => {
            if password.is_none() {
                return Err(ZipError::MissingZipCryptoPassword);
            }
            if !allowed.allows(EncryptionMechanism::ZipCrypto) {
                return Err(ZipError::ZipCryptoNotAllowed);
            }
        }
        EncryptionMechanism::Ae1 | EncryptionMechanism::Ae2 => {
            if password.is_none() {
                return Err(ZipError::MissingAESPassword);
            }
            let aes = aes_info.as_ref().unwrap();
            let strength = KeyStrength::from_byte(aes.key_strength_byte)?;
            let (version, key_strength) = strength_mechanism(strength, aes.is_ae2);
            if !allowed.allows(version) {
                return Err(match version {
                    EncryptionMechanism::Ae1 => ZipError::AE1NotAllowed,
                    EncryptionMechanism::Ae2 => ZipError::AE2NotAllowed,
                    _ => unreachable!(),
                });
            }
            if !allowed.allows(key_strength) {
                return Err(match key_strength {
                    EncryptionMechanism::Aes128 => ZipError::AES128NotAllowed,
                    EncryptionMechanism::Aes192 => ZipError::AES192NotAllowed,
                    EncryptionMechanism::Aes256 => ZipError::AES256NotAllowed,
                    _ => unreachable!(),
                });
            }
        }
        _ => unreachable!("mechanism is always one of the above five"),
    }

    // Step 7: effective compression method.
    let method = match &aes_info {
        Some(aes) => aes.actual_compression_method,
        None => header.compression,
    };
    if !matches!(method, 0 | 8 | 9 | 12) {
        return Err(ZipError::UnsupportedCompressionType(method));
    }

    // Step 8: ZIP64 sizes.
    let zip64 = parse_zip64_extra(&fields)?;
    if zip64.is_some() && !options.zip64_allowed() {
        return Err(ZipError::UnsupportedZip64);
    }
    let sizes_are_sentinel =
        header.compressed_size == NON_ZIP64_MAX_SIZE && header.uncompressed_size == NON_ZIP64_MAX_SIZE;

    // Step 9: resolve sizes.
    let has_data_descriptor = header.flags.data_descriptor;
    let (resolved_compressed, resolved_uncompressed): (Option<u64>, Option<u64>) =
        if has_data_descriptor && matches!(method, 8 | 9 | 12) {
            (None, None)
        } else if sizes_are_sentinel {
            let z64 = zip64.ok_or(ZipError::TruncatedZip64Extra)?;
            (Some(z64.compressed_size), Some(z64.uncompressed_size))
        } else {
            (Some(header.compressed_size as u64), Some(header.uncompressed_size as u64))
        };

    // Step 10: stored + data descriptor + zero size is unrecoverable without seeking.
    if method == 0 && has_data_descriptor && resolved_compressed == Some(0) {
        return Err(ZipError::NotStreamUnzippable);
    }

    // Step 11: build the decompressor.
    let known_size = if method == 0 { resolved_compressed.or(resolved_uncompressed) } else { None };
    let decompressor = decompress::for_method(method, known_size)?;

    // Step 12: build the decryptor. `compressed_start` is captured *before* any encryption-header
    // bytes are consumed: the traditional-PKWARE and WinZip AE-x "compressed size" convention
    // includes the encryption header (and, for AES, the trailing MAC) as overhead, so the observed
    // byte count this crate compares against the header's declared size must include it too.
    let compressed_start = reader.absolute_offset();
    let decryptor = match mechanism {
        EncryptionMechanism::None => Decryptor::None,
        EncryptionMechanism::ZipCrypto => {
            let password = password.expect("checked above");
            let raw_header = reader.get(ZIPCRYPTO_HEADER_LEN)?;
            let header_arr: [u8; ZIPCRYPTO_HEADER_LEN] = raw_header.try_into().unwrap();
            let check_byte =
                if has_data_descriptor { (header.mod_time >> 8) as u8 } else { (header.crc32 >> 24) as u8 };
            Decryptor::ZipCrypto(ZipCryptoCipher::new(password, header_arr, check_byte)?)
        }
        EncryptionMechanism::Ae1 | EncryptionMechanism::Ae2 => {
            let password = password.expect("checked above");
            let aes = aes_info.as_ref().unwrap();
            let strength = KeyStrength::from_byte(aes.key_strength_byte)?;
            let salt = reader.get(strength.salt_len())?;
            let verifier_bytes = reader.get(2)?;
            Decryptor::Aes(AesCipher::new(password, strength, &salt, [verifier_bytes[0], verifier_bytes[1]])?)
        }
        _ => unreachable!(),
    };

    tracing::trace!(
        name = %String::from_utf8_lossy(&name),
        method,
        mechanism = %mechanism,
        compressed_size = ?resolved_compressed,
        uncompressed_size = ?resolved_uncompressed,
        has_data_descriptor,
        "parsed local file header"
    );

    let body = MemberBody {
        reader,
        chunk_cap: options.effective_chunk_cap(),
        decompressor,
        decryptor: Some(decryptor),
        is_aes: matches!(mechanism, EncryptionMechanism::Ae1 | EncryptionMechanism::Ae2),
        skip_crc: matches!(mechanism, EncryptionMechanism::Ae2),
        has_data_descriptor,
        allow_zip64: options.zip64_allowed(),
        zip64_extra_present: zip64.is_some(),
        header_crc32: header.crc32,
        header_compressed_size: resolved_compressed,
        header_uncompressed_size: resolved_uncompressed,
        compressed_start,
        crc: Hasher::new(),
        plaintext_len: 0,
        pending: VecDeque::new(),
        done: false,
        errored: false,
        state,
    };

    Ok(ParsedMember { name, declared_size: resolved_uncompressed, body })
}

/// The live plaintext iterator for one member's body, driving decrypt → decompress → account →
/// verify. Consumers must fully drain this before the [`crate::archive`] driver can proceed to
/// the next member.
pub struct MemberBody<'a, S> {
    reader: &'a mut ByteReader<S>,
    chunk_cap: usize,
    decompressor: Box<dyn Decompressor>,
    decryptor: Option<Decryptor>,
    is_aes: bool,
    skip_crc: bool,
    has_data_descriptor: bool,
    allow_zip64: bool,
    zip64_extra_present: bool,
    header_crc32: u32,
    header_compressed_size: Option<u64>,
    header_uncompressed_size: Option<u64>,
    compressed_start: u64,
    crc: Hasher,
    plaintext_len: u64,
    pending: VecDeque<Vec<u8>>,
    done: bool,
    errored: bool,
    state: &'a Cell<MemberState>,
}

impl<'a, S: ChunkSource> MemberBody<'a, S> {
    fn pull_and_decode(&mut self) -> Result<()> {
        if self.decompressor.is_done() {
            // A zero-size Store member is done before any ciphertext is ever pulled.
            return self.finalize();
        }

        let raw = match self.reader.yield_all(self.chunk_cap).next() {
            Some(chunk) => chunk?,
            None => return Err(ZipError::Truncated),
        };

        // Decrypt into a separate buffer so `raw` still holds the ciphertext: the AES
        // authentication tag is computed over ciphertext, and (for the final chunk) over only the
        // portion the decompressor actually consumed, which isn't known until after `push` runs.
        let mut buf = raw.clone();
        self.decryptor.as_mut().expect("present until finalize").decrypt(&mut buf);
        let produced = self.decompressor.push(&buf)?;

        if self.is_aes {
            let consumed = if self.decompressor.is_done() { raw.len() - self.decompressor.unused() } else { raw.len() };
            self.decryptor.as_mut().expect("present until finalize").update_mac(&raw[..consumed]);
        }

        for piece in produced {
            self.crc.update(&piece);
            self.plaintext_len += piece.len() as u64;
            for sub in piece.chunks(self.chunk_cap.max(1)) {
                self.pending.push_back(sub.to_vec());
            }
        }

        if self.decompressor.is_done() {
            self.finalize()?;
        }

        Ok(())
    }

    fn observed_compressed(&self) -> u64 {
        self.reader.absolute_offset() - self.compressed_start
    }

    fn finalize(&mut self) -> Result<()> {
        self.reader.push_back_n(self.decompressor.unused());

        if self.is_aes {
            let tag_bytes = self.reader.get(10)?;
            let tag: [u8; 10] = tag_bytes.try_into().unwrap();
            self.decryptor.take().expect("present until now").finish(Some(&tag))?;
        }

        // Captured after the AES tag is consumed: the declared "compressed size" on traditional
        // PKWARE and WinZip AE-x members includes the crypto header/salt/verifier and, for AES,
        // the trailing MAC, not just the raw ciphertext.
        let observed_compressed = self.observed_compressed();

        if self.has_data_descriptor {
            let max_desc_len = if self.allow_zip64 { 24 } else { 16 };
            let window = self.reader.get(max_desc_len + 4)?;
            let expected_crc = if self.skip_crc { None } else { Some(self.crc.clone().finalize()) };
            let suppress_32bit = self.zip64_extra_present
                || observed_compressed > NON_ZIP64_MAX_SIZE as u64
                || self.plaintext_len > NON_ZIP64_MAX_SIZE as u64;

            let recovered =
                data_descriptor::recover(&window, expected_crc, observed_compressed, self.plaintext_len, suppress_32bit)?;
            let remainder = window[recovered.consumed..].to_vec();
            self.reader.push_back_bytes(remainder);
        } else {
            if !self.skip_crc {
                let actual = self.crc.clone().finalize();
                if actual != self.header_crc32 {
                    return Err(ZipError::CRC32Integrity { expected: self.header_crc32, actual });
                }
            }
            let expected_compressed = self.header_compressed_size.expect("known when no data descriptor");
            if observed_compressed != expected_compressed {
                return Err(ZipError::CompressedSizeIntegrity { expected: expected_compressed, actual: observed_compressed });
            }
            let expected_uncompressed = self.header_uncompressed_size.expect("known when no data descriptor");
            if self.plaintext_len != expected_uncompressed {
                return Err(ZipError::UncompressedSizeIntegrity {
                    expected: expected_uncompressed,
                    actual: self.plaintext_len,
                });
            }
        }

        self.done = true;
        tracing::trace!(compressed = observed_compressed, uncompressed = self.plaintext_len, "member verified");
        Ok(())
    }
}

impl<'a, S: ChunkSource> Iterator for MemberBody<'a, S> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(chunk) = self.pending.pop_front() {
                return Some(Ok(chunk));
            }
            if self.errored {
                return None;
            }
            if self.done {
                self.state.set(MemberState::Done);
                return None;
            }
            if let Err(e) = self.pull_and_decode() {
                self.done = true;
                self.errored = true;
                self.state.set(MemberState::Errored);
                return Some(Err(e));
            }
        }
    }
}
