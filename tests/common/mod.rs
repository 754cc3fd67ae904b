//! A minimal from-scratch ZIP archive builder used to produce test fixtures.
//!
//! There's no writer half of this crate to reuse, so tests construct archives byte-by-byte: a
//! local file header, optionally encrypted body, optional trailing data descriptor, and a final
//! end-of-central-directory record. The central directory itself is never written — per the
//! archive driver's own contract, it only needs to recognise the `PK\x01\x02`/`PK\x05\x06`
//! signature to know the member stream has ended, so tests jump straight to the EOCDR.

use aes::Aes256;
use ctr::cipher::{KeyIvInit, StreamCipher};
use ctr::Ctr128LE;
use flate2::{Compress, Compression, FlushCompress};
use hmac::{Hmac, Mac};
use sha1::Sha1;

pub const LFH_SIG: u32 = 0x04034b50;
pub const EOCDR_SIG: u32 = 0x06054b50;
pub const DD_SIG: u32 = 0x08074b50;

#[rustfmt::skip]
const CRC32_TABLE: [u32; 256] = [
    0, 1996959894, 3993919788, 2567524794, 124634137, 1886057615, 3915621685, 2657392035,
    249268274, 2044508324, 3772115230, 2547177864, 162941995, 2125561021, 3887607047, 2428444049,
    498536548, 1789927666, 4089016648, 2227061214, 450548861, 1843258603, 4107580753, 2211677639,
    325883990, 1684777152, 4251122042, 2321926636, 335633487, 1661365465, 4195302755, 2366115317,
    997073096, 1281953886, 3579855332, 2724688242, 1006888145, 1258607687, 3524101629, 2768942443,
    901097722, 1119000684, 3686517206, 2898065728, 853044451, 1172266101, 3705015759, 2882616665,
    651767980, 1373503546, 3369554304, 3218104598, 565507253, 1454621731, 3485111705, 3099436303,
    671266974, 1594198024, 3322730930, 2970347812, 795835527, 1483230225, 3244367275, 3060149565,
    1994146192, 31158534, 2563907772, 4023717930, 1907459465, 112637215, 2680153253, 3904427059,
    2013776290, 251722036, 2517215374, 3775830040, 2137656763, 141376813, 2439277719, 3865271297,
    1802195444, 476864866, 2238001368, 4066508878, 1812370925, 453092731, 2181625025, 4111451223,
    1706088902, 314042704, 2344532202, 4240017532, 1658658271, 366619977, 2362670323, 4224994405,
    1303535960, 984961486, 2747007092, 3569037538, 1256170817, 1037604311, 2765210733, 3554079995,
    1131014506, 879679996, 2909243462, 3663771856, 1141124467, 855842277, 2852801631, 3708648649,
    1342533948, 654459306, 3188396048, 3373015174, 1466479909, 544179635, 3110523913, 3462522015,
    1591671054, 702138776, 2966460450, 3352799412, 1504918807, 783551873, 3082640443, 3233442989,
    3988292384, 2596254646, 62317068, 1957810842, 3939845945, 2647816111, 81470997, 1943803523,
    3814918930, 2489596804, 225274430, 2053790376, 3826175755, 2466906013, 167816743, 2097651377,
    4027552580, 2265490386, 503444072, 1762050814, 4150417245, 2154129355, 426522225, 1852507879,
    4275313526, 2312317920, 282753626, 1742555852, 4189708143, 2394877945, 397917763, 1622183637,
    3604390888, 2714866558, 953729732, 1340076626, 3518719985, 2797360999, 1068828381, 1219638859,
    3624741850, 2936675148, 906185462, 1090812512, 3747672003, 2825379669, 829329135, 1181335161,
    3412177804, 3160834842, 628085408, 1382605366, 3423369109, 3138078467, 570562233, 1426400815,
    3317316542, 2998733608, 733239954, 1555261956, 3268935591, 3050360625, 752459403, 1541320221,
    2607071920, 3965973030, 1969922972, 40735498, 2617837225, 3943577151, 1913087877, 83908371,
    2512341634, 3803740692, 2075208622, 213261112, 2463272603, 3855990285, 2094854071, 198958881,
    2262029012, 4057260610, 1759359992, 534414190, 2176718541, 4139329115, 1873836001, 414664567,
    2282248934, 4279200368, 1711684554, 285281116, 2405801727, 4167216745, 1634467795, 376229701,
    2685067896, 3608007406, 1308918612, 956543938, 2808555105, 3495958263, 1231636301, 1047427035,
    2932959818, 3654703836, 1088359270, 936918000, 2847714899, 3736837829, 1202900863, 817233897,
    3183342108, 3401237130, 1404277552, 615818150, 3134207493, 3453421203, 1423857449, 601450431,
    3009837614, 3294710456, 1567103746, 711928724, 3020668471, 3272380065, 1510334235, 755167117,
];

fn crc32_lut(crc: u32, byte: u8) -> u32 {
    CRC32_TABLE[((crc as u8) ^ byte) as usize] ^ (crc >> 8)
}

/// A from-scratch ZipCrypto encryption stream, mirroring the crate's own decryptor but run in the
/// encrypt direction: the keystream XORs against plaintext, and keys advance on the plaintext byte.
struct ZipCryptoEncryptor {
    k0: u32,
    k1: u32,
    k2: u32,
}

impl ZipCryptoEncryptor {
    fn new(password: &[u8]) -> Self {
        let mut cipher = Self { k0: 305_419_896, k1: 591_751_049, k2: 878_082_192 };
        for &byte in password {
            cipher.update_keys(byte);
        }
        cipher
    }

    fn update_keys(&mut self, plaintext_byte: u8) {
        self.k0 = crc32_lut(self.k0, plaintext_byte);
        self.k1 = self.k1.wrapping_add(self.k0 & 0xff);
        self.k1 = self.k1.wrapping_mul(134_775_813).wrapping_add(1);
        self.k2 = crc32_lut(self.k2, (self.k1 >> 24) as u8);
    }

    fn encrypt_byte(&mut self, plaintext_byte: u8) -> u8 {
        let temp = (self.k2 | 2) as u16;
        let stream_byte = ((temp.wrapping_mul(temp ^ 1)) >> 8) as u8;
        self.update_keys(plaintext_byte);
        plaintext_byte ^ stream_byte
    }

    fn encrypt(&mut self, buf: &[u8]) -> Vec<u8> {
        buf.iter().map(|&b| self.encrypt_byte(b)).collect()
    }
}

pub fn deflate_raw(data: &[u8]) -> Vec<u8> {
    let mut compress = Compress::new(Compression::default(), false);
    let mut out = vec![0u8; data.len() * 2 + 256];
    compress.compress(data, &mut out, FlushCompress::Finish).unwrap();
    let len = compress.total_out() as usize;
    out.truncate(len);
    out
}

pub fn crc32(data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

#[derive(Clone, Copy)]
pub enum Encryption {
    None,
    ZipCrypto { password: &'static [u8] },
    Aes256Ae2 { password: &'static [u8] },
}

pub struct MemberSpec {
    pub name: &'static [u8],
    pub method: u16,
    pub plaintext: Vec<u8>,
    pub data_descriptor: bool,
    pub encryption: Encryption,
    pub force_zip64: bool,
}

impl MemberSpec {
    pub fn stored(name: &'static [u8], plaintext: Vec<u8>) -> Self {
        Self { name, method: 0, plaintext, data_descriptor: false, encryption: Encryption::None, force_zip64: false }
    }

    pub fn deflated(name: &'static [u8], plaintext: Vec<u8>) -> Self {
        Self { name, method: 8, plaintext, data_descriptor: false, encryption: Encryption::None, force_zip64: false }
    }

    pub fn with_zip64(mut self) -> Self {
        self.force_zip64 = true;
        self
    }
}

/// Appends one member's bytes (local file header through trailer) to `out`.
fn write_member(out: &mut Vec<u8>, spec: &MemberSpec) {
    let crc = crc32(&spec.plaintext);

    let body = match spec.method {
        0 => spec.plaintext.clone(),
        8 => deflate_raw(&spec.plaintext),
        other => panic!("test builder does not support method {other}"),
    };

    let (flags_encrypted, mut extra, header_body, trailer, csize_override): (bool, Vec<u8>, Vec<u8>, Vec<u8>, Option<u32>) = match spec.encryption {
        Encryption::None => (false, Vec::new(), body, Vec::new(), None),
        Encryption::ZipCrypto { password } => {
            let mut encryptor = ZipCryptoEncryptor::new(password);
            let check_byte = if spec.data_descriptor { 0x00 } else { (crc >> 24) as u8 };
            let mut header = [0u8; 12];
            header[11] = check_byte;
            let encrypted_header = encryptor.encrypt(&header);
            let encrypted_body = encryptor.encrypt(&body);
            let mut full = encrypted_header;
            full.extend_from_slice(&encrypted_body);
            (true, Vec::new(), full, Vec::new(), None)
        }
        Encryption::Aes256Ae2 { password } => {
            let salt = [0x11u8; 16];
            let mut derived = vec![0u8; 2 * 32 + 2];
            pbkdf2::pbkdf2_hmac::<Sha1>(password, &salt, 1000, &mut derived);
            let crypt_key = &derived[0..32];
            let sign_key = &derived[32..64];
            let verifier = &derived[64..66];

            let iv = 1u128.to_le_bytes();
            let mut cipher = Ctr128LE::<Aes256>::new(crypt_key.into(), iv.as_slice().into());
            let mut ciphertext = body.clone();
            cipher.apply_keystream(&mut ciphertext);

            let mut mac = Hmac::<Sha1>::new_from_slice(sign_key).unwrap();
            mac.update(&ciphertext);
            let tag = mac.finalize().into_bytes();

            let mut extra = Vec::new();
            extra.extend_from_slice(&0x9901u16.to_le_bytes());
            extra.extend_from_slice(&7u16.to_le_bytes());
            extra.extend_from_slice(&2u16.to_le_bytes()); // AE-2
            extra.extend_from_slice(b"AE");
            extra.push(3); // AES-256
            extra.extend_from_slice(&spec.method.to_le_bytes()); // true underlying method

            let mut header_body = Vec::new();
            header_body.extend_from_slice(&salt);
            header_body.extend_from_slice(verifier);
            header_body.extend_from_slice(&ciphertext);

            let trailer = tag[0..10].to_vec();
            let csize_override = Some((header_body.len() + trailer.len()) as u32);
            (true, extra, header_body, trailer, csize_override)
        }
    };

    let is_aes = matches!(spec.encryption, Encryption::Aes256Ae2 { .. });
    let stored_method = if is_aes { 99 } else { spec.method };

    let mut flags: u16 = 0;
    if flags_encrypted {
        flags |= 0x1;
    }
    if spec.data_descriptor {
        flags |= 0x8;
    }

    // Traditional PKWARE and WinZip AE-x "compressed size" includes the encryption overhead (crypto
    // header/salt/verifier and, for AES, the trailing MAC) alongside the ciphertext, so the default
    // here is the full `header_body` length; the AES arm above overrides it to also add the MAC.
    let plain_csize = csize_override.unwrap_or(header_body.len() as u32);

    let (header_crc, header_csize, header_usize) = if spec.data_descriptor {
        (0u32, 0u32, 0u32)
    } else if spec.force_zip64 {
        let mut zip64_extra = Vec::new();
        zip64_extra.extend_from_slice(&0x0001u16.to_le_bytes());
        zip64_extra.extend_from_slice(&16u16.to_le_bytes());
        zip64_extra.extend_from_slice(&(spec.plaintext.len() as u64).to_le_bytes());
        zip64_extra.extend_from_slice(&(plain_csize as u64).to_le_bytes());
        zip64_extra.extend_from_slice(&extra);
        extra = zip64_extra;
        (crc, 0xFFFFFFFFu32, 0xFFFFFFFFu32)
    } else {
        (crc, plain_csize, spec.plaintext.len() as u32)
    };

    out.extend_from_slice(&LFH_SIG.to_le_bytes());
    out.extend_from_slice(&20u16.to_le_bytes()); // version needed
    out.extend_from_slice(&flags.to_le_bytes());
    out.extend_from_slice(&stored_method.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // mod time
    out.extend_from_slice(&0u16.to_le_bytes()); // mod date
    out.extend_from_slice(&header_crc.to_le_bytes());
    out.extend_from_slice(&header_csize.to_le_bytes());
    out.extend_from_slice(&header_usize.to_le_bytes());
    out.extend_from_slice(&(spec.name.len() as u16).to_le_bytes());
    out.extend_from_slice(&(extra.len() as u16).to_le_bytes());
    out.extend_from_slice(spec.name);
    out.extend_from_slice(&extra);
    out.extend_from_slice(&header_body);
    out.extend_from_slice(&trailer);

    if spec.data_descriptor {
        out.extend_from_slice(&DD_SIG.to_le_bytes());
        out.extend_from_slice(&crc.to_le_bytes());
        out.extend_from_slice(&plain_csize.to_le_bytes());
        out.extend_from_slice(&(spec.plaintext.len() as u32).to_le_bytes());
    }
}

fn write_eocdr(out: &mut Vec<u8>) {
    out.extend_from_slice(&EOCDR_SIG.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
}

pub fn build_archive(members: &[MemberSpec]) -> Vec<u8> {
    let mut out = Vec::new();
    for member in members {
        write_member(&mut out, member);
    }
    write_eocdr(&mut out);
    out
}

/// Splits `bytes` into chunks of exactly `size` (the last one shorter), for exercising
/// chunk-boundary independence.
pub fn chunked(bytes: Vec<u8>, size: usize) -> impl Iterator<Item = std::io::Result<Vec<u8>>> {
    let size = size.max(1);
    bytes.chunks(size).map(|c| c.to_vec()).collect::<Vec<_>>().into_iter().map(Ok)
}
