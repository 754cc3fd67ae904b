// Copyright (c) 2022 Harry [Majored] [hello@majored.pw]
// MIT License (https://github.com/Majored/rs-async-zip/blob/main/LICENSE)

use crate::spec::consts::LOCAL_FILE_HEADER_LENGTH;

/// The general-purpose bit flags of a local file header, decoded LSB-first.
#[derive(Copy, Clone, Debug, Default)]
pub(crate) struct GeneralPurposeFlag {
    pub(crate) encrypted: bool,
    pub(crate) data_descriptor: bool,
    pub(crate) enhanced_deflate: bool,
    pub(crate) patched: bool,
    pub(crate) strong_encryption: bool,
    pub(crate) masked_header: bool,
}

impl GeneralPurposeFlag {
    /// Whether any of the bits this crate refuses to handle are set (spec bits 4, 5, 6, 13).
    pub(crate) fn has_unsupported_bits(&self) -> bool {
        self.enhanced_deflate || self.patched || self.strong_encryption || self.masked_header
    }
}

impl From<u16> for GeneralPurposeFlag {
    fn from(value: u16) -> GeneralPurposeFlag {
        GeneralPurposeFlag {
            encrypted: value & 0x1 != 0,
            data_descriptor: value & 0x8 != 0,
            enhanced_deflate: value & 0x10 != 0,
            patched: value & 0x20 != 0,
            strong_encryption: value & 0x40 != 0,
            masked_header: value & 0x2000 != 0,
        }
    }
}

/// The fixed 26-byte record following a local file header's signature.
#[derive(Copy, Clone, Debug)]
pub(crate) struct LocalFileHeader {
    pub(crate) version_needed: u16,
    pub(crate) flags: GeneralPurposeFlag,
    pub(crate) compression: u16,
    pub(crate) mod_time: u16,
    pub(crate) mod_date: u16,
    pub(crate) crc32: u32,
    pub(crate) compressed_size: u32,
    pub(crate) uncompressed_size: u32,
    pub(crate) file_name_len: u16,
    pub(crate) extra_field_len: u16,
}

impl From<[u8; LOCAL_FILE_HEADER_LENGTH]> for LocalFileHeader {
    fn from(value: [u8; LOCAL_FILE_HEADER_LENGTH]) -> LocalFileHeader {
        LocalFileHeader {
            version_needed: u16::from_le_bytes(value[0..2].try_into().unwrap()),
            flags: GeneralPurposeFlag::from(u16::from_le_bytes(value[2..4].try_into().unwrap())),
            compression: u16::from_le_bytes(value[4..6].try_into().unwrap()),
            mod_time: u16::from_le_bytes(value[6..8].try_into().unwrap()),
            mod_date: u16::from_le_bytes(value[8..10].try_into().unwrap()),
            crc32: u32::from_le_bytes(value[10..14].try_into().unwrap()),
            compressed_size: u32::from_le_bytes(value[14..18].try_into().unwrap()),
            uncompressed_size: u32::from_le_bytes(value[18..22].try_into().unwrap()),
            file_name_len: u16::from_le_bytes(value[22..24].try_into().unwrap()),
            extra_field_len: u16::from_le_bytes(value[24..26].try_into().unwrap()),
        }
    }
}

impl LocalFileHeader {
    pub(crate) fn parse(bytes: &[u8]) -> LocalFileHeader {
        let array: [u8; LOCAL_FILE_HEADER_LENGTH] = bytes.try_into().expect("caller reads exactly 26 bytes");
        LocalFileHeader::from(array)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_flag_bits() {
        let flags = GeneralPurposeFlag::from(0b0010_0000_0000_1001);
        assert!(flags.encrypted);
        assert!(flags.data_descriptor);
        assert!(flags.masked_header);
        assert!(!flags.enhanced_deflate);
    }
}
