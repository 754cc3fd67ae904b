//! Configuration for a [`StreamZipReader`](crate::archive::StreamZipReader).

use crate::error::EncryptionMechanism;

/// The default cap, in bytes, on any single yielded plaintext slice.
pub const DEFAULT_CHUNK_CAP: usize = 65536;

/// The set of encryption mechanisms a caller is willing to accept.
///
/// Defaults to allowing everything. A member whose mechanism isn't in this set fails with a
/// mechanism-specific `*NotAllowed` error before any plaintext is yielded.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct AllowedEncryptionMechanisms {
    none: bool,
    zipcrypto: bool,
    ae1: bool,
    ae2: bool,
    aes128: bool,
    aes192: bool,
    aes256: bool,
}

impl Default for AllowedEncryptionMechanisms {
    fn default() -> Self {
        Self { none: true, zipcrypto: true, ae1: true, ae2: true, aes128: true, aes192: true, aes256: true }
    }
}

impl AllowedEncryptionMechanisms {
    /// Returns a set that allows nothing; build up the allow-list with the `with_*` methods.
    pub fn none() -> Self {
        Self { none: false, zipcrypto: false, ae1: false, ae2: false, aes128: false, aes192: false, aes256: false }
    }

    pub fn with_none(mut self, allow: bool) -> Self {
        self.none = allow;
        self
    }

    pub fn with_zipcrypto(mut self, allow: bool) -> Self {
        self.zipcrypto = allow;
        self
    }

    pub fn with_ae1(mut self, allow: bool) -> Self {
        self.ae1 = allow;
        self
    }

    pub fn with_ae2(mut self, allow: bool) -> Self {
        self.ae2 = allow;
        self
    }

    pub fn with_aes128(mut self, allow: bool) -> Self {
        self.aes128 = allow;
        self
    }

    pub fn with_aes192(mut self, allow: bool) -> Self {
        self.aes192 = allow;
        self
    }

    pub fn with_aes256(mut self, allow: bool) -> Self {
        self.aes256 = allow;
        self
    }

    pub(crate) fn allows(&self, mechanism: EncryptionMechanism) -> bool {
        match mechanism {
            EncryptionMechanism::None => self.none,
            EncryptionMechanism::ZipCrypto => self.zipcrypto,
            EncryptionMechanism::Ae1 => self.ae1,
            EncryptionMechanism::Ae2 => self.ae2,
            EncryptionMechanism::Aes128 => self.aes128,
            EncryptionMechanism::Aes192 => self.aes192,
            EncryptionMechanism::Aes256 => self.aes256,
        }
    }
}

/// Options governing how a [`StreamZipReader`](crate::archive::StreamZipReader) parses and
/// verifies an archive.
#[derive(Clone, Debug, Default)]
pub struct ReaderOptions {
    password: Option<Vec<u8>>,
    chunk_cap: Option<usize>,
    allow_zip64: Option<bool>,
    allowed_encryption_mechanisms: Option<AllowedEncryptionMechanisms>,
}

impl ReaderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the password used to decrypt ZipCrypto- or AES-encrypted members.
    pub fn password(mut self, password: impl Into<Vec<u8>>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Caps the length of any single yielded plaintext slice. Defaults to
    /// [`DEFAULT_CHUNK_CAP`].
    pub fn chunk_cap(mut self, cap: usize) -> Self {
        self.chunk_cap = Some(cap);
        self
    }

    /// Whether ZIP64 extras are accepted. Defaults to `true`.
    pub fn allow_zip64(mut self, allow: bool) -> Self {
        self.allow_zip64 = Some(allow);
        self
    }

    /// Restricts which encryption mechanisms are accepted. Defaults to allowing all of them.
    pub fn allowed_encryption_mechanisms(mut self, mechanisms: AllowedEncryptionMechanisms) -> Self {
        self.allowed_encryption_mechanisms = Some(mechanisms);
        self
    }

    pub(crate) fn password_bytes(&self) -> Option<&[u8]> {
        self.password.as_deref()
    }

    pub(crate) fn effective_chunk_cap(&self) -> usize {
        self.chunk_cap.unwrap_or(DEFAULT_CHUNK_CAP)
    }

    pub(crate) fn zip64_allowed(&self) -> bool {
        self.allow_zip64.unwrap_or(true)
    }

    pub(crate) fn mechanisms(&self) -> AllowedEncryptionMechanisms {
        self.allowed_encryption_mechanisms.unwrap_or_default()
    }
}
