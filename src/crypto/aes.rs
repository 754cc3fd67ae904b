//! WinZip AE-1/AE-2 encryption (AES-CTR with a PBKDF2-derived key, HMAC-SHA1 authentication).

use aes::{Aes128, Aes192, Aes256};
use ctr::cipher::{KeyIvInit, StreamCipher};
use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::error::{Result, ZipError};

type Ctr128LE<B> = ctr::Ctr128LE<B>;

/// The AES key strength declared by a WinZip AES extra field's key-strength byte.
#[derive(Copy, Clone, Debug)]
pub(crate) enum KeyStrength {
    Aes128,
    Aes192,
    Aes256,
}

impl KeyStrength {
    pub(crate) fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            1 => Ok(KeyStrength::Aes128),
            2 => Ok(KeyStrength::Aes192),
            3 => Ok(KeyStrength::Aes256),
            other => Err(ZipError::InvalidAESKeyLength(other)),
        }
    }

    pub(crate) fn salt_len(self) -> usize {
        match self {
            KeyStrength::Aes128 => 8,
            KeyStrength::Aes192 => 12,
            KeyStrength::Aes256 => 16,
        }
    }

    fn key_len(self) -> usize {
        match self {
            KeyStrength::Aes128 => 16,
            KeyStrength::Aes192 => 24,
            KeyStrength::Aes256 => 32,
        }
    }
}

/// A WinZip AES decryption stream: the AES-CTR keystream plus a running HMAC-SHA1 over the
/// ciphertext actually consumed by the decompressor.
pub(crate) struct AesCipher {
    cipher: Box<dyn StreamCipher>,
    mac: Hmac<Sha1>,
}

impl AesCipher {
    /// Derives the crypt/sign keys from `password` via PBKDF2-HMAC-SHA1 (1000 iterations) over
    /// `salt`, checks the derived password verifier against `verifier`, and returns a cipher
    /// ready to decrypt the member body. The AES-CTR counter is a 128-bit little-endian integer
    /// starting at 1, per the WinZip AE-1/AE-2 specification.
    pub(crate) fn new(password: &[u8], strength: KeyStrength, salt: &[u8], verifier: [u8; 2]) -> Result<Self> {
        let key_len = strength.key_len();
        let derived_len = 2 * key_len + 2;
        let mut derived = vec![0u8; derived_len];
        pbkdf2::pbkdf2_hmac::<Sha1>(password, salt, 1000, &mut derived);

        if derived[derived_len - 2..] != verifier {
            return Err(ZipError::IncorrectAESPassword);
        }

        let crypt_key = &derived[0..key_len];
        let sign_key = &derived[key_len..2 * key_len];
        let iv = 1u128.to_le_bytes();

        let cipher: Box<dyn StreamCipher> = match strength {
            KeyStrength::Aes128 => Box::new(Ctr128LE::<Aes128>::new(crypt_key.into(), iv.as_slice().into())),
            KeyStrength::Aes192 => Box::new(Ctr128LE::<Aes192>::new(crypt_key.into(), iv.as_slice().into())),
            KeyStrength::Aes256 => Box::new(Ctr128LE::<Aes256>::new(crypt_key.into(), iv.as_slice().into())),
        };
        let mac = Hmac::<Sha1>::new_from_slice(sign_key).expect("HMAC accepts any key length");

        Ok(Self { cipher, mac })
    }

    /// Feeds `ciphertext` (before decryption) into the running authentication tag.
    pub(crate) fn update_mac(&mut self, ciphertext: &[u8]) {
        self.mac.update(ciphertext);
    }

    /// Decrypts `buf` in place by applying the next portion of the AES-CTR keystream.
    pub(crate) fn decrypt(&mut self, buf: &mut [u8]) {
        self.cipher.apply_keystream(buf);
    }

    /// Finalizes the HMAC and checks it against the 10-byte truncated authentication tag read
    /// from the end of the member's body.
    pub(crate) fn finish(self, expected_tag: &[u8; 10]) -> Result<()> {
        let tag = self.mac.finalize().into_bytes();
        if &tag[0..10] != expected_tag {
            return Err(ZipError::HMACIntegrity);
        }
        Ok(())
    }
}
