// Copyright Cognite AS, 2023

use crate::error::{Result, ZipError};
use crate::spec::consts::{AES_EXTRA_ID, ZIP64_EXTRA_ID};

/// A single (id, data) pair parsed from an extra-field area. Signatures we don't interpret are
/// kept around rather than discarded, mirroring how the teacher keeps unrecognised extra fields
/// instead of dropping them.
#[derive(Clone, Debug)]
pub(crate) struct RawExtraField {
    pub(crate) id: u16,
    pub(crate) data: Vec<u8>,
}

/// Parses the extra-field area of a local file header.
///
/// Tolerant of a trailing fragment shorter than 4 bytes (the minimal id+length header), and of a
/// declared field length that overruns the remaining buffer — in both cases, per spec, whatever
/// is left is simply not treated as a further field rather than rejected.
pub(crate) fn parse_extra_fields(data: &[u8]) -> Vec<RawExtraField> {
    let mut fields = Vec::new();
    let mut cursor = 0usize;

    while cursor + 4 <= data.len() {
        let id = u16::from_le_bytes(data[cursor..cursor + 2].try_into().unwrap());
        let declared_len = u16::from_le_bytes(data[cursor + 2..cursor + 4].try_into().unwrap()) as usize;
        let start = cursor + 4;
        let end = (start + declared_len).min(data.len());

        fields.push(RawExtraField { id, data: data[start..end].to_vec() });
        cursor = end;
    }

    fields
}

/// Returns the last entry matching `id` (duplicates resolve last-wins, per spec).
pub(crate) fn find_last(fields: &[RawExtraField], id: u16) -> Option<&RawExtraField> {
    fields.iter().rev().find(|f| f.id == id)
}

/// The decoded ZIP64 extended-information extra field, as seen in a local file header (only the
/// two size fields are ever present there — the central-directory-only fields don't apply).
#[derive(Copy, Clone, Debug)]
pub(crate) struct Zip64ExtraField {
    pub(crate) uncompressed_size: u64,
    pub(crate) compressed_size: u64,
}

pub(crate) fn parse_zip64_extra(fields: &[RawExtraField]) -> Result<Option<Zip64ExtraField>> {
    let Some(field) = find_last(fields, ZIP64_EXTRA_ID) else {
        return Ok(None);
    };
    if field.data.len() < 16 {
        return Err(ZipError::TruncatedZip64Extra);
    }
    Ok(Some(Zip64ExtraField {
        uncompressed_size: u64::from_le_bytes(field.data[0..8].try_into().unwrap()),
        compressed_size: u64::from_le_bytes(field.data[8..16].try_into().unwrap()),
    }))
}

/// The decoded WinZip AES extra field (AE-1 or AE-2).
#[derive(Copy, Clone, Debug)]
pub(crate) struct AesExtraField {
    pub(crate) is_ae2: bool,
    pub(crate) key_strength_byte: u8,
    pub(crate) actual_compression_method: u16,
}

pub(crate) fn parse_aes_extra(fields: &[RawExtraField]) -> Result<AesExtraField> {
    let field = find_last(fields, AES_EXTRA_ID).ok_or(ZipError::MissingAESExtra)?;
    if field.data.len() < 7 {
        return Err(ZipError::TruncatedAESExtra);
    }
    let version = u16::from_le_bytes(field.data[0..2].try_into().unwrap());
    let actual_compression_method = u16::from_le_bytes(field.data[5..7].try_into().unwrap());
    Ok(AesExtraField { is_ae2: version == 2, key_strength_byte: field.data[4], actual_compression_method })
}
