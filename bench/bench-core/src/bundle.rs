//! Binary bundle format for persisted results.
//!
//! # File Format
//!
//! 1. **Magic bytes**: `CBB1` (4 bytes)
//! 2. **Version**: `u32` little-endian (4 bytes), currently 1
//! 3. **Flags**: `u32` little-endian (4 bytes), the [`BundleKind`]
//! 4. **Payload**: bincode-encoded data
//!
//! bincode stores floats by their bits, so every recorded value, `NaN`
//! metrics of diverged runs included, reads back exactly as written.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use bench_types::{BenchError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Magic bytes identifying a bundle.
pub const BUNDLE_MAGIC: [u8; 4] = *b"CBB1";

/// Current bundle format version.
pub const BUNDLE_VERSION: u32 = 1;

/// Header size in bytes (magic + version + flags).
pub const BUNDLE_HEADER_SIZE: usize = 12;

/// What a bundle's payload holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleKind {
    /// A full [`ResultStore`](crate::ResultStore).
    Results,
    /// One cached ground-truth record.
    GroundTruth,
}

impl BundleKind {
    const fn flags(self) -> u32 {
        match self {
            Self::Results => 0,
            Self::GroundTruth => 1,
        }
    }

    fn from_flags(flags: u32) -> Result<Self> {
        match flags {
            0 => Ok(Self::Results),
            1 => Ok(Self::GroundTruth),
            other => Err(BenchError::Serialization(format!(
                "unknown bundle kind flags {other:#x}"
            ))),
        }
    }
}

/// Bundle header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BundleHeader {
    /// Magic bytes (must be `CBB1`).
    pub magic: [u8; 4],
    /// Format version.
    pub version: u32,
    /// Payload kind.
    pub flags: u32,
}

impl BundleHeader {
    /// Header for a payload of the given kind.
    #[must_use]
    pub fn new(kind: BundleKind) -> Self {
        Self {
            magic: BUNDLE_MAGIC,
            version: BUNDLE_VERSION,
            flags: kind.flags(),
        }
    }

    fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(&self.magic)?;
        writer.write_all(&self.version.to_le_bytes())?;
        writer.write_all(&self.flags.to_le_bytes())?;
        Ok(())
    }

    fn read_from<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;

        let mut version_bytes = [0u8; 4];
        reader.read_exact(&mut version_bytes)?;

        let mut flags_bytes = [0u8; 4];
        reader.read_exact(&mut flags_bytes)?;

        Ok(Self {
            magic,
            version: u32::from_le_bytes(version_bytes),
            flags: u32::from_le_bytes(flags_bytes),
        })
    }

    /// Check magic and version, and that the payload is of the expected kind.
    fn validate(&self, expected: BundleKind) -> Result<()> {
        if self.magic != BUNDLE_MAGIC {
            return Err(BenchError::InvalidBundle(self.magic));
        }
        if self.version != BUNDLE_VERSION {
            return Err(BenchError::UnsupportedBundleVersion(self.version));
        }
        let kind = BundleKind::from_flags(self.flags)?;
        if kind != expected {
            return Err(BenchError::Serialization(format!(
                "expected a {expected:?} bundle, found {kind:?}"
            )));
        }
        Ok(())
    }
}

/// Write a header and payload.
pub(crate) fn write_bundle<W: Write, T: Serialize>(
    writer: &mut W,
    kind: BundleKind,
    payload: &T,
) -> Result<()> {
    BundleHeader::new(kind)
        .write_to(writer)
        .map_err(|e| BenchError::Serialization(e.to_string()))?;
    bincode::serialize_into(&mut *writer, payload)
        .map_err(|e| BenchError::Serialization(e.to_string()))?;
    writer.flush()?;
    Ok(())
}

/// Read and validate a header, then decode the payload.
pub(crate) fn read_bundle<R: Read, T: DeserializeOwned>(
    reader: &mut R,
    kind: BundleKind,
) -> Result<T> {
    let header = BundleHeader::read_from(reader)
        .map_err(|e| BenchError::Serialization(format!("failed to read header: {e}")))?;
    header.validate(kind)?;
    bincode::deserialize_from(reader).map_err(|e| BenchError::Serialization(e.to_string()))
}

pub(crate) fn write_bundle_file<T: Serialize>(
    path: &Path,
    kind: BundleKind,
    payload: &T,
) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_bundle(&mut writer, kind, payload)
}

pub(crate) fn read_bundle_file<T: DeserializeOwned>(path: &Path, kind: BundleKind) -> Result<T> {
    let mut reader = BufReader::new(File::open(path)?);
    read_bundle(&mut reader, kind)
}

/// Whether a file starts with the bundle magic bytes.
pub fn is_bundle_file(path: impl AsRef<Path>) -> bool {
    let Ok(file) = File::open(path) else {
        return false;
    };
    let mut reader = BufReader::new(file);
    let mut magic = [0u8; 4];
    if reader.read_exact(&mut magic).is_err() {
        return false;
    }
    magic == BUNDLE_MAGIC
}

/// Whether a byte slice starts with the bundle magic bytes.
#[must_use]
pub fn is_bundle_bytes(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && bytes[..4] == BUNDLE_MAGIC
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_header_roundtrip() {
        let header = BundleHeader::new(BundleKind::GroundTruth);
        let mut buffer = Vec::new();
        header.write_to(&mut buffer).unwrap();
        assert_eq!(buffer.len(), BUNDLE_HEADER_SIZE);

        let loaded = BundleHeader::read_from(&mut buffer.as_slice()).unwrap();
        assert_eq!(header, loaded);
    }

    #[test]
    fn test_header_validation() {
        let mut header = BundleHeader::new(BundleKind::Results);
        assert!(header.validate(BundleKind::Results).is_ok());
        assert!(matches!(
            header.validate(BundleKind::GroundTruth),
            Err(BenchError::Serialization(_))
        ));

        header.magic = *b"NOPE";
        assert_eq!(
            header.validate(BundleKind::Results),
            Err(BenchError::InvalidBundle(*b"NOPE"))
        );

        header.magic = BUNDLE_MAGIC;
        header.version = 999;
        assert_eq!(
            header.validate(BundleKind::Results),
            Err(BenchError::UnsupportedBundleVersion(999))
        );
    }

    #[test]
    fn test_nan_payload_is_bit_exact() {
        let payload = vec![f64::NAN, -0.0, 1e-300, f64::INFINITY];
        let mut bytes = Vec::new();
        write_bundle(&mut bytes, BundleKind::Results, &payload).unwrap();
        assert!(is_bundle_bytes(&bytes));

        let loaded: Vec<f64> = read_bundle(&mut bytes.as_slice(), BundleKind::Results).unwrap();
        let bits = |v: &[f64]| v.iter().map(|x| x.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&payload), bits(&loaded));
    }

    #[test]
    fn test_truncated_input() {
        let err = read_bundle::<_, Vec<f64>>(&mut &b"CBB"[..], BundleKind::Results).unwrap_err();
        assert!(matches!(err, BenchError::Serialization(_)));
        assert!(!is_bundle_bytes(b"CB"));
    }

    #[test]
    fn test_is_bundle_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.cbb");
        write_bundle_file(&path, BundleKind::Results, &vec![1u32, 2, 3]).unwrap();
        assert!(is_bundle_file(&path));
        assert!(!is_bundle_file(dir.path().join("missing.cbb")));

        let loaded: Vec<u32> = read_bundle_file(&path, BundleKind::Results).unwrap();
        assert_eq!(loaded, vec![1, 2, 3]);
    }
}
