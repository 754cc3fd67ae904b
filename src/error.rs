// Copyright (c) 2021-2024 Harry [Majored] [hello@majored.pw]
// MIT License (https://github.com/Majored/rs-async-zip/blob/main/LICENSE)

//! Error types returned by this crate.

use thiserror::Error;

/// A specialised [`Result`](std::result::Result) type for this crate's operations.
pub type Result<T> = std::result::Result<T, ZipError>;

/// An encryption mechanism, used in policy-rejection error variants.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum EncryptionMechanism {
    None,
    ZipCrypto,
    Ae1,
    Ae2,
    Aes128,
    Aes192,
    Aes256,
}

impl std::fmt::Display for EncryptionMechanism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EncryptionMechanism::None => "none",
            EncryptionMechanism::ZipCrypto => "ZipCrypto",
            EncryptionMechanism::Ae1 => "AE-1",
            EncryptionMechanism::Ae2 => "AE-2",
            EncryptionMechanism::Aes128 => "AES-128",
            EncryptionMechanism::Aes192 => "AES-192",
            EncryptionMechanism::Aes256 => "AES-256",
        };
        f.write_str(s)
    }
}

/// The closed set of failures this crate can produce.
///
/// All variants abort the current member (and so the archive stream as a whole, since the next
/// member cannot be located once a member's body has been abandoned mid-stream).
#[derive(Error, Debug)]
pub enum ZipError {
    #[error("encountered an unexpected header signature (actual: {0:#x}, expected one of: {1:?})")]
    UnexpectedSignature(u32, &'static [u32]),

    #[error("reached the end of the chunk source before the expected number of bytes were available")]
    Truncated,

    #[error("local file header uses unsupported general-purpose flag bits: {0:#06x}")]
    UnsupportedFlags(u16),

    #[error("unsupported compression method: {0}")]
    UnsupportedCompressionType(u16),

    #[error("a ZIP64 extra field was present but `allow_zip64` is disabled")]
    UnsupportedZip64,

    #[error("member declares a stored method, a data descriptor, and a zero size; its end cannot be located without seeking")]
    NotStreamUnzippable,

    #[error("member is AES-encrypted (method 99) but carries no AES extra field")]
    MissingAESExtra,

    #[error("AES extra field is shorter than the required 7 bytes")]
    TruncatedAESExtra,

    #[error("ZIP64 extra field is shorter than the required 16 bytes")]
    TruncatedZip64Extra,

    #[error("AES extra field declares an invalid key-strength byte: {0}")]
    InvalidAESKeyLength(u8),

    #[error("CRC-32 mismatch: expected {expected:#010x}, computed {actual:#010x}")]
    CRC32Integrity { expected: u32, actual: u32 },

    #[error("compressed size mismatch: expected {expected}, observed {actual}")]
    CompressedSizeIntegrity { expected: u64, actual: u64 },

    #[error("uncompressed size mismatch: expected {expected}, observed {actual}")]
    UncompressedSizeIntegrity { expected: u64, actual: u64 },

    #[error("AES HMAC-SHA1 authentication tag did not match")]
    HMACIntegrity,

    #[error("DEFLATE decoding failed: {0}")]
    DeflateError(String),

    #[error("BZIP2 decoding failed: {0}")]
    Bzip2Error(String),

    #[error("member is encrypted with ZipCrypto but no password was supplied")]
    MissingZipCryptoPassword,

    #[error("member is AES-encrypted but no password was supplied")]
    MissingAESPassword,

    #[error("incorrect password for ZipCrypto-encrypted member")]
    IncorrectZipCryptoPassword,

    #[error("incorrect password for AES-encrypted member")]
    IncorrectAESPassword,

    #[error("a password was supplied but this member is not encrypted")]
    FileIsNotEncrypted,

    #[error("ZipCrypto is not in the set of allowed encryption mechanisms")]
    ZipCryptoNotAllowed,

    #[error("AE-1 is not in the set of allowed encryption mechanisms")]
    AE1NotAllowed,

    #[error("AE-2 is not in the set of allowed encryption mechanisms")]
    AE2NotAllowed,

    #[error("AES-128 is not in the set of allowed encryption mechanisms")]
    AES128NotAllowed,

    #[error("AES-192 is not in the set of allowed encryption mechanisms")]
    AES192NotAllowed,

    #[error("AES-256 is not in the set of allowed encryption mechanisms")]
    AES256NotAllowed,

    #[error("the previous member's plaintext iterator was not fully drained before advancing")]
    UnfinishedIteration,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
