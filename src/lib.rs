// Copyright (c) 2022 Harry [Majored] [hello@majored.pw]
// MIT License (https://github.com/Majored/rs-async-zip/blob/main/LICENSE)

//! A single-pass, constant-memory streaming ZIP archive reader.
//!
//! This crate reads a ZIP archive forwards, once, from whatever opaque binary chunks a
//! [`ChunkSource`] hands it — a file, a socket, a generator — without ever seeking backwards or
//! buffering more than the member currently being decoded. Each member's plaintext is exposed as a
//! lazy sequence of chunks, verified against its CRC-32 and declared sizes (or, when a trailing
//! data descriptor is used instead of a header, against a heuristically recovered copy of the
//! same) as it streams past.
//!
//! ```no_run
//! use streamzip::{ReaderOptions, StreamZipReader};
//!
//! # fn chunks() -> impl Iterator<Item = std::io::Result<Vec<u8>>> { std::iter::empty() }
//! let mut archive = StreamZipReader::new(chunks(), ReaderOptions::new());
//! while let Some((name, _size, body)) = archive.next_member()? {
//!     for chunk in body {
//!         let chunk = chunk?;
//!         // ... consume `chunk` ...
//!     }
//!     let _ = name;
//! }
//! # Ok::<(), streamzip::ZipError>(())
//! ```

mod archive;
mod byte_reader;
mod chunk_source;
mod crypto;
mod decompress;
mod error;
mod member;
mod options;
mod spec;

pub use archive::StreamZipReader;
pub use chunk_source::ChunkSource;
pub use error::{EncryptionMechanism, Result, ZipError};
pub use member::MemberBody;
pub use options::{AllowedEncryptionMechanisms, ReaderOptions, DEFAULT_CHUNK_CAP};
