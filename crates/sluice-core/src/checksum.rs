//! Fixity checksums.
//!
//! Digests are computed by streaming the file once through a [`CopyBuffer`];
//! nothing is held in memory beyond the buffer and the hasher state.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use md5::Md5;
use sha1::Sha1;
use sha2::Digest;
use sha2::Sha256;
use sha2::Sha512;

use crate::IngestError;
use crate::Result;
use crate::copy::CopyBuffer;
use crate::copy::copy_with_buffer;

/// Supported fixity algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChecksumAlgorithm {
    /// MD5 (the repository default).
    #[default]
    Md5,
    /// SHA-1.
    Sha1,
    /// SHA-256.
    Sha256,
    /// SHA-512.
    Sha512,
}

impl ChecksumAlgorithm {
    /// All algorithms, in display order.
    pub const ALL: [Self; 4] = [Self::Md5, Self::Sha1, Self::Sha256, Self::Sha512];

    /// Canonical name (`MD5`, `SHA-1`, `SHA-256`, `SHA-512`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Md5 => "MD5",
            Self::Sha1 => "SHA-1",
            Self::Sha256 => "SHA-256",
            Self::Sha512 => "SHA-512",
        }
    }

    /// Length of the hex digest in characters.
    #[must_use]
    pub const fn hex_len(self) -> usize {
        match self {
            Self::Md5 => 32,
            Self::Sha1 => 40,
            Self::Sha256 => 64,
            Self::Sha512 => 128,
        }
    }

    fn hasher(self) -> Hasher {
        match self {
            Self::Md5 => Hasher::Md5(Md5::new()),
            Self::Sha1 => Hasher::Sha1(Sha1::new()),
            Self::Sha256 => Hasher::Sha256(Sha256::new()),
            Self::Sha512 => Hasher::Sha512(Sha512::new()),
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChecksumAlgorithm {
    type Err = IngestError;

    /// Parses `MD5`, `SHA-1`, `sha1`, `SHA256`, ... (case-insensitive, dash
    /// optional).
    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match normalized.as_str() {
            "md5" => Ok(Self::Md5),
            "sha1" => Ok(Self::Sha1),
            "sha256" => Ok(Self::Sha256),
            "sha512" => Ok(Self::Sha512),
            _ => Err(IngestError::InvalidConfig {
                reason: format!("unknown checksum algorithm: {s}"),
            }),
        }
    }
}

/// A computed digest together with its algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Checksum {
    /// Algorithm used.
    pub algorithm: ChecksumAlgorithm,
    /// Lowercase hex digest.
    pub value: String,
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.value)
    }
}

enum Hasher {
    Md5(Md5),
    Sha1(Sha1),
    Sha256(Sha256),
    Sha512(Sha512),
}

impl Hasher {
    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Md5(h) => h.update(data),
            Self::Sha1(h) => h.update(data),
            Self::Sha256(h) => h.update(data),
            Self::Sha512(h) => h.update(data),
        }
    }

    fn finalize_hex(self) -> String {
        match self {
            Self::Md5(h) => hex::encode(h.finalize()),
            Self::Sha1(h) => hex::encode(h.finalize()),
            Self::Sha256(h) => hex::encode(h.finalize()),
            Self::Sha512(h) => hex::encode(h.finalize()),
        }
    }
}

impl Write for Hasher {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Computes the hex digest of everything `reader` yields.
///
/// # Errors
///
/// Returns `IngestError::Io` if the reader fails; a partial digest is never
/// returned.
///
/// # Examples
///
/// ```
/// use sluice_core::checksum::{ChecksumAlgorithm, digest};
///
/// let hex = digest(&mut &b"abc"[..], ChecksumAlgorithm::Md5)?;
/// assert_eq!(hex, "900150983cd24fb0d6963f7d28e17f72");
/// # Ok::<(), sluice_core::IngestError>(())
/// ```
pub fn digest<R: Read>(reader: &mut R, algorithm: ChecksumAlgorithm) -> Result<String> {
    let mut buffer = CopyBuffer::new();
    digest_with_buffer(reader, algorithm, &mut buffer)
}

/// Like [`digest`], reusing the caller's copy buffer.
pub fn digest_with_buffer<R: Read>(
    reader: &mut R,
    algorithm: ChecksumAlgorithm,
    buffer: &mut CopyBuffer,
) -> Result<String> {
    let mut hasher = algorithm.hasher();
    copy_with_buffer(reader, &mut hasher, buffer)?;
    Ok(hasher.finalize_hex())
}

/// Computes the digest of a file on disk.
pub fn digest_file(
    path: &Path,
    algorithm: ChecksumAlgorithm,
    buffer: &mut CopyBuffer,
) -> Result<Checksum> {
    let mut file = File::open(path)?;
    let value = digest_with_buffer(&mut file, algorithm, buffer)?;
    Ok(Checksum { algorithm, value })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    #[test]
    fn test_known_digests() {
        let cases = [
            (ChecksumAlgorithm::Md5, "900150983cd24fb0d6963f7d28e17f72"),
            (
                ChecksumAlgorithm::Sha1,
                "a9993e364706816aba3e25717850c26c9cd0d89d",
            ),
            (
                ChecksumAlgorithm::Sha256,
                "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
            ),
        ];
        for (algorithm, expected) in cases {
            let hex = digest(&mut Cursor::new(b"abc"), algorithm).unwrap();
            assert_eq!(hex, expected, "{algorithm}");
        }
    }

    #[test]
    fn test_digest_lengths() {
        for algorithm in ChecksumAlgorithm::ALL {
            let hex = digest(&mut Cursor::new(b""), algorithm).unwrap();
            assert_eq!(hex.len(), algorithm.hex_len());
        }
    }

    #[test]
    fn test_digest_spans_buffer_boundary() {
        let data = vec![7u8; 200 * 1024];
        let streamed = digest(&mut Cursor::new(&data), ChecksumAlgorithm::Sha256).unwrap();
        let direct = hex::encode(Sha256::digest(&data));
        assert_eq!(streamed, direct);
    }

    #[test]
    fn test_digest_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data.txt");
        std::fs::write(&path, b"abc").unwrap();

        let mut buffer = CopyBuffer::new();
        let checksum = digest_file(&path, ChecksumAlgorithm::Md5, &mut buffer).unwrap();
        assert_eq!(checksum.value, "900150983cd24fb0d6963f7d28e17f72");
        assert_eq!(
            checksum.to_string(),
            "MD5:900150983cd24fb0d6963f7d28e17f72"
        );
    }

    #[test]
    fn test_digest_missing_file_is_error() {
        let mut buffer = CopyBuffer::new();
        let result = digest_file(
            Path::new("/nonexistent/sluice/file"),
            ChecksumAlgorithm::Md5,
            &mut buffer,
        );
        assert!(matches!(result, Err(IngestError::Io(_))));
    }

    #[test]
    fn test_parse_algorithm() {
        assert_eq!("MD5".parse::<ChecksumAlgorithm>().unwrap(), ChecksumAlgorithm::Md5);
        assert_eq!("sha-1".parse::<ChecksumAlgorithm>().unwrap(), ChecksumAlgorithm::Sha1);
        assert_eq!("SHA256".parse::<ChecksumAlgorithm>().unwrap(), ChecksumAlgorithm::Sha256);
        assert_eq!("sha_512".parse::<ChecksumAlgorithm>().unwrap(), ChecksumAlgorithm::Sha512);
        assert!("crc32".parse::<ChecksumAlgorithm>().is_err());
    }

    #[test]
    fn test_display_roundtrips_through_parse() {
        for algorithm in ChecksumAlgorithm::ALL {
            assert_eq!(algorithm.to_string().parse::<ChecksumAlgorithm>().unwrap(), algorithm);
        }
    }
}
