//! Binary form of a compiled language.
//!
//! Layout: a 16-byte little-endian header followed by a `postcard` payload.
//!
//! | bytes  | field                              |
//! |--------|------------------------------------|
//! | 0..4   | magic `b"TSLG"`                    |
//! | 4..8   | ABI version                        |
//! | 8..12  | CRC32 of everything after the header |
//! | 12..16 | total blob size                    |
//!
//! Loading checks, in order: size, magic, ABI version, total size,
//! checksum, payload decoding, then the consistency of the decoded tables.
//! A blob that passes every check is safe to parse with.

use crate::error::LoadError;
use crate::lexer::LexTableParts;
use crate::table::{ParseTable, SymbolInfo};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

pub const MAGIC: [u8; 4] = *b"TSLG";

/// Version of the blob layout and table encoding. Bumped on every
/// incompatible change.
pub const ABI_VERSION: u32 = 1;

pub const HEADER_LEN: usize = 16;

/// Header of a language blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobHeader {
    pub magic: [u8; 4],
    pub abi_version: u32,
    pub checksum: u32,
    pub total_size: u32,
}

impl BlobHeader {
    fn from_bytes(bytes: &[u8; HEADER_LEN]) -> Self {
        let word = |at: usize| u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        Self {
            magic: [bytes[0], bytes[1], bytes[2], bytes[3]],
            abi_version: word(4),
            checksum: word(8),
            total_size: word(12),
        }
    }

    fn to_bytes(self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4..8].copy_from_slice(&self.abi_version.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.checksum.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.total_size.to_le_bytes());
        bytes
    }
}

/// Everything a [`Language`](crate::Language) is built from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Payload {
    pub name: CompactString,
    pub symbols: Vec<SymbolInfo>,
    pub fields: Vec<CompactString>,
    pub table: ParseTable,
    pub lexer: LexTableParts,
}

/// Read and check the header without decoding the payload.
///
/// # Errors
///
/// Returns the first of [`LoadError::TooSmall`], [`LoadError::InvalidMagic`]
/// or [`LoadError::VersionMismatch`] that applies.
pub fn read_header(bytes: &[u8]) -> Result<BlobHeader, LoadError> {
    let Some(head) = bytes.first_chunk::<HEADER_LEN>() else {
        return Err(LoadError::TooSmall {
            len: bytes.len(),
            needed: HEADER_LEN,
        });
    };
    let header = BlobHeader::from_bytes(head);
    if header.magic != MAGIC {
        return Err(LoadError::InvalidMagic {
            expected: MAGIC,
            found: header.magic,
        });
    }
    if header.abi_version != ABI_VERSION {
        return Err(LoadError::VersionMismatch {
            expected: ABI_VERSION,
            found: header.abi_version,
        });
    }
    Ok(header)
}

pub(crate) fn encode(payload: &Payload) -> Result<Vec<u8>, LoadError> {
    let body = postcard::to_allocvec(payload).map_err(|err| LoadError::Encode(err.to_string()))?;
    let total = HEADER_LEN + body.len();
    let header = BlobHeader {
        magic: MAGIC,
        abi_version: ABI_VERSION,
        checksum: crc32fast::hash(&body),
        total_size: u32::try_from(total).map_err(|_| LoadError::Encode(format!("blob of {total} bytes is too large")))?,
    };
    let mut bytes = Vec::with_capacity(total);
    bytes.extend_from_slice(&header.to_bytes());
    bytes.extend_from_slice(&body);
    Ok(bytes)
}

pub(crate) fn decode(bytes: &[u8]) -> Result<Payload, LoadError> {
    let header = read_header(bytes)?;
    let declared = header.total_size as usize;
    if declared != bytes.len() {
        return Err(LoadError::SizeMismatch {
            header: declared,
            actual: bytes.len(),
        });
    }
    let body = &bytes[HEADER_LEN..];
    let actual = crc32fast::hash(body);
    if actual != header.checksum {
        return Err(LoadError::ChecksumMismatch {
            expected: header.checksum,
            actual,
        });
    }
    Ok(postcard::from_bytes(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let header = BlobHeader {
            magic: MAGIC,
            abi_version: ABI_VERSION,
            checksum: 0xdead_beef,
            total_size: 40,
        };
        let bytes = header.to_bytes();
        assert_eq!(&bytes[0..4], b"TSLG");
        assert_eq!(bytes[4], 1);
        assert_eq!(bytes[8], 0xef);
        assert_eq!(BlobHeader::from_bytes(&bytes), header);
    }

    #[test]
    fn test_short_blob_rejected() {
        assert_eq!(
            read_header(b"TSLG"),
            Err(LoadError::TooSmall { len: 4, needed: 16 })
        );
    }

    #[test]
    fn test_wrong_magic_rejected() {
        let mut bytes = [0u8; 16];
        bytes[0..4].copy_from_slice(b"ELF\0");
        assert!(matches!(read_header(&bytes), Err(LoadError::InvalidMagic { .. })));
    }

    #[test]
    fn test_future_version_rejected() {
        let header = BlobHeader {
            magic: MAGIC,
            abi_version: ABI_VERSION + 1,
            checksum: 0,
            total_size: 16,
        };
        assert_eq!(
            read_header(&header.to_bytes()),
            Err(LoadError::VersionMismatch {
                expected: ABI_VERSION,
                found: ABI_VERSION + 1,
            })
        );
    }
}
