//! Per-member decryption, selected by the encryption mechanism resolved during header parsing.

mod aes;
mod zipcrypto;

pub(crate) use aes::{AesCipher, KeyStrength};
pub(crate) use zipcrypto::{ZipCryptoCipher, HEADER_LEN as ZIPCRYPTO_HEADER_LEN};

use crate::error::Result;

/// The decryption stage of a member's pipeline, uniform over the three mechanisms this crate
/// understands. Sits between the raw ciphertext chunks pulled off the [`crate::byte_reader`] and
/// the [`crate::decompress::Decompressor`].
pub(crate) enum Decryptor {
    None,
    ZipCrypto(ZipCryptoCipher),
    Aes(AesCipher),
}

impl Decryptor {
    /// Decrypts `buf` in place.
    pub(crate) fn decrypt(&mut self, buf: &mut [u8]) {
        match self {
            Decryptor::None => {}
            Decryptor::ZipCrypto(cipher) => cipher.decrypt(buf),
            Decryptor::Aes(cipher) => cipher.decrypt(buf),
        }
    }

    /// Feeds `ciphertext` into the running authentication tag. A no-op outside the AES mechanism.
    /// Callers must pass exactly the ciphertext bytes that belong to this member — for the chunk
    /// that trips `Decompressor::is_done`, that means excluding whatever `unused()` reports once
    /// `push` returns, since those bytes belong to the next record rather than this member.
    pub(crate) fn update_mac(&mut self, ciphertext: &[u8]) {
        if let Decryptor::Aes(cipher) = self {
            cipher.update_mac(ciphertext);
        }
    }

    /// Finalizes authentication, if this mechanism has any. ZipCrypto and no-encryption have no
    /// tail to check, since their integrity is covered entirely by the member's CRC-32.
    pub(crate) fn finish(self, aes_tag: Option<&[u8; 10]>) -> Result<()> {
        match (self, aes_tag) {
            (Decryptor::Aes(cipher), Some(tag)) => cipher.finish(tag),
            (Decryptor::Aes(_), None) => unreachable!("AES members always carry a 10-byte trailer"),
            _ => Ok(()),
        }
    }
}
