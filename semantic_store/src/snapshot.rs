// SPDX-License-Identifier: MIT OR Apache-2.0
//! Whole-snapshot persistence framing.
//!
//! Every snapshot file is a bincode-encoded [`SnapshotHeader`] followed by
//! the bincode-encoded body. The header carries magic bytes, a format
//! version and a kind tag so a generator-map snapshot can never be loaded
//! as a matrix (or the other way around).
//!
//! Snapshots are checkpoint/restore tooling for single-threaded use between
//! runs. Writes go to a hidden, uniquely named temp file in the target's
//! directory that is synced and renamed over the target, so a crash
//! mid-write never leaves a truncated snapshot behind.

use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, ErrorKind},
    path::{Path, PathBuf},
};

use bincode::Options;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

/// Magic bytes identifying a snapshot written by this crate.
const MAGIC: [u8; 4] = *b"SSTR";

/// Current snapshot format version.
const CURRENT_VERSION: u32 = 1;

/// What a snapshot file contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnapshotKind {
    Matrix,
    GeneratorMap,
}

/// Header written in front of every snapshot body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub magic: [u8; 4],
    pub version: u32,
    pub kind: SnapshotKind,
    pub entry_count: u64,
}

impl SnapshotHeader {
    #[must_use]
    pub const fn new(kind: SnapshotKind, entry_count: u64) -> Self {
        Self {
            magic: MAGIC,
            version: CURRENT_VERSION,
            kind,
            entry_count,
        }
    }

    /// # Errors
    ///
    /// Returns an error if the magic bytes are wrong, the version is not
    /// supported, or the snapshot holds a different kind of structure.
    pub fn validate(&self, expected: SnapshotKind) -> Result<(), SnapshotFormatError> {
        if self.magic != MAGIC {
            return Err(SnapshotFormatError::InvalidMagic);
        }
        if self.version != CURRENT_VERSION {
            return Err(SnapshotFormatError::UnsupportedVersion(self.version));
        }
        if self.kind != expected {
            return Err(SnapshotFormatError::KindMismatch {
                expected,
                found: self.kind,
            });
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `EntryCountMismatch` unless the decoded body holds exactly
    /// the number of entries the header announced.
    pub fn check_entry_count(&self, found: usize) -> Result<(), SnapshotFormatError> {
        let found = found as u64;
        if self.entry_count == found {
            Ok(())
        } else {
            Err(SnapshotFormatError::EntryCountMismatch {
                expected: self.entry_count,
                found,
            })
        }
    }
}

/// Errors from reading or writing snapshot files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotFormatError {
    InvalidMagic,
    UnsupportedVersion(u32),
    KindMismatch {
        expected: SnapshotKind,
        found: SnapshotKind,
    },
    EntryCountMismatch {
        expected: u64,
        found: u64,
    },
    IoError(String),
    SerializationError(String),
}

impl std::fmt::Display for SnapshotFormatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidMagic => write!(f, "invalid magic bytes"),
            Self::UnsupportedVersion(v) => write!(f, "unsupported version: {v}"),
            Self::KindMismatch { expected, found } => {
                write!(f, "snapshot kind mismatch: expected {expected:?}, found {found:?}")
            },
            Self::EntryCountMismatch { expected, found } => {
                write!(f, "snapshot entry count mismatch: header says {expected}, body has {found}")
            },
            Self::IoError(msg) => write!(f, "io error: {msg}"),
            Self::SerializationError(msg) => write!(f, "serialization error: {msg}"),
        }
    }
}

impl std::error::Error for SnapshotFormatError {}

impl From<std::io::Error> for SnapshotFormatError {
    fn from(e: std::io::Error) -> Self {
        Self::IoError(e.to_string())
    }
}

impl From<bincode::Error> for SnapshotFormatError {
    fn from(e: bincode::Error) -> Self {
        Self::SerializationError(e.to_string())
    }
}

/// Bincode settings shared by reads and writes: fixed-width integers,
/// little endian.
fn codec() -> impl Options {
    bincode::DefaultOptions::new().with_fixint_encoding()
}

/// Hidden temp file next to `path`, unique per write.
fn temp_path(path: &Path) -> PathBuf {
    let file_name = path.file_name().and_then(|s| s.to_str()).unwrap_or("snapshot");
    path.with_file_name(format!(".{file_name}.tmp.{}", Uuid::new_v4()))
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

#[cfg(unix)]
fn fsync_dir(dir: &Path) -> std::io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn fsync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

fn write_temp<T: Serialize>(
    temp: &Path,
    header: &SnapshotHeader,
    body: &T,
) -> Result<(), SnapshotFormatError> {
    let mut writer = BufWriter::new(File::create(temp)?);
    codec().serialize_into(&mut writer, header)?;
    codec().serialize_into(&mut writer, body)?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok(())
}

/// Write `body` behind a header of the given kind.
///
/// The data is synced to a uniquely named temp file in the target's
/// directory and then renamed over `path`. The temp file is removed if any
/// step fails.
pub(crate) fn write<T: Serialize, P: AsRef<Path>>(
    path: P,
    kind: SnapshotKind,
    entry_count: u64,
    body: &T,
) -> Result<(), SnapshotFormatError> {
    let path = path.as_ref();
    let temp = temp_path(path);

    let written = write_temp(&temp, &SnapshotHeader::new(kind, entry_count), body)
        .and_then(|()| fs::rename(&temp, path).map_err(SnapshotFormatError::from));
    if let Err(e) = written {
        if let Err(cleanup) = fs::remove_file(&temp) {
            if cleanup.kind() != ErrorKind::NotFound {
                tracing::warn!(
                    path = %temp.display(),
                    error = %cleanup,
                    "temp snapshot left behind"
                );
            }
        }
        return Err(e);
    }
    fsync_dir(parent_dir(path))?;

    tracing::debug!(path = %path.display(), ?kind, entry_count, "snapshot written");
    Ok(())
}

/// Read and validate a snapshot of the given kind.
///
/// Decoding is bounded by the file size, so a corrupt length prefix fails
/// with `SerializationError` instead of a huge allocation.
pub(crate) fn read<T: DeserializeOwned, P: AsRef<Path>>(
    path: P,
    kind: SnapshotKind,
) -> Result<(SnapshotHeader, T), SnapshotFormatError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let limit = file.metadata()?.len();
    let mut reader = BufReader::new(file);

    let header: SnapshotHeader = codec().with_limit(limit).deserialize_from(&mut reader)?;
    header.validate(kind)?;
    let body: T = codec().with_limit(limit).deserialize_from(&mut reader)?;

    tracing::debug!(
        path = %path.display(),
        ?kind,
        entry_count = header.entry_count,
        "snapshot restored"
    );
    Ok((header, body))
}

/// Read only the header of a snapshot file.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or the header cannot be
/// decoded. The header is returned unvalidated.
pub fn read_header<P: AsRef<Path>>(path: P) -> Result<SnapshotHeader, SnapshotFormatError> {
    let file = File::open(path)?;
    let limit = file.metadata()?.len();
    Ok(codec().with_limit(limit).deserialize_from(BufReader::new(file))?)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_header_new() {
        let header = SnapshotHeader::new(SnapshotKind::Matrix, 7);
        assert_eq!(header.magic, MAGIC);
        assert_eq!(header.version, CURRENT_VERSION);
        assert_eq!(header.kind, SnapshotKind::Matrix);
        assert_eq!(header.entry_count, 7);
    }

    #[test]
    fn test_header_validate_magic() {
        let header = SnapshotHeader {
            magic: *b"XXXX",
            version: CURRENT_VERSION,
            kind: SnapshotKind::Matrix,
            entry_count: 0,
        };
        assert_eq!(
            header.validate(SnapshotKind::Matrix),
            Err(SnapshotFormatError::InvalidMagic)
        );
    }

    #[test]
    fn test_header_validate_version() {
        let header = SnapshotHeader {
            magic: MAGIC,
            version: 99,
            kind: SnapshotKind::Matrix,
            entry_count: 0,
        };
        assert!(matches!(
            header.validate(SnapshotKind::Matrix),
            Err(SnapshotFormatError::UnsupportedVersion(99))
        ));
    }

    #[test]
    fn test_header_validate_kind() {
        let header = SnapshotHeader::new(SnapshotKind::GeneratorMap, 0);
        assert_eq!(
            header.validate(SnapshotKind::Matrix),
            Err(SnapshotFormatError::KindMismatch {
                expected: SnapshotKind::Matrix,
                found: SnapshotKind::GeneratorMap,
            })
        );
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("body.snap");

        let body = vec![(1u32, 2.5f64), (4, -1.0)];
        write(&path, SnapshotKind::Matrix, 2, &body).unwrap();

        let (header, restored): (_, Vec<(u32, f64)>) = read(&path, SnapshotKind::Matrix).unwrap();
        assert_eq!(header.entry_count, 2);
        assert_eq!(restored, body);
        assert_eq!(dir_entries(dir.path()), vec!["body.snap".to_owned()]);
    }

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_temp_path_is_hidden_and_unique() {
        let path = Path::new("/data/state.tmp");
        let a = temp_path(path);
        let b = temp_path(path);
        assert_ne!(a, b);
        assert_ne!(a, path);
        assert_eq!(a.parent(), path.parent());
        let name = a.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with(".state.tmp.tmp."));
    }

    #[test]
    fn test_sibling_targets_do_not_share_temp_files() {
        let dir = tempdir().unwrap();
        let matrix_path = dir.path().join("state.matrix");
        let map_path = dir.path().join("state.map");

        std::thread::scope(|s| {
            s.spawn(|| {
                for _ in 0..50 {
                    write(&matrix_path, SnapshotKind::Matrix, 1, &vec![1u64; 512]).unwrap();
                }
            });
            s.spawn(|| {
                for _ in 0..50 {
                    write(&map_path, SnapshotKind::GeneratorMap, 1, &vec![2u64; 512]).unwrap();
                }
            });
        });

        let (_, matrix): (_, Vec<u64>) = read(&matrix_path, SnapshotKind::Matrix).unwrap();
        let (_, map): (_, Vec<u64>) = read(&map_path, SnapshotKind::GeneratorMap).unwrap();
        assert_eq!(matrix, vec![1u64; 512]);
        assert_eq!(map, vec![2u64; 512]);
        assert_eq!(
            dir_entries(dir.path()),
            vec!["state.map".to_owned(), "state.matrix".to_owned()]
        );
    }

    #[test]
    fn test_failed_rename_removes_temp_file() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("state");
        fs::create_dir(&target).unwrap();

        let result = write(&target, SnapshotKind::Matrix, 0, &0u8);
        assert!(matches!(result, Err(SnapshotFormatError::IoError(_))));
        assert_eq!(dir_entries(dir.path()), vec!["state".to_owned()]);
    }

    #[test]
    fn test_oversized_length_prefix_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("huge.snap");
        let mut bytes = bincode::serialize(&SnapshotHeader::new(SnapshotKind::Matrix, 1)).unwrap();
        // A string claiming 64 TiB of data.
        bytes.extend(bincode::serialize(&(1u64 << 46)).unwrap());
        fs::write(&path, bytes).unwrap();

        let result: Result<(_, String), _> = read(&path, SnapshotKind::Matrix);
        assert!(matches!(result, Err(SnapshotFormatError::SerializationError(_))));
    }

    #[test]
    fn test_check_entry_count() {
        let header = SnapshotHeader::new(SnapshotKind::Matrix, 3);
        assert!(header.check_entry_count(3).is_ok());
        assert_eq!(
            header.check_entry_count(2),
            Err(SnapshotFormatError::EntryCountMismatch {
                expected: 3,
                found: 2
            })
        );
    }

    #[test]
    fn test_read_wrong_kind() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("map.snap");
        write(&path, SnapshotKind::GeneratorMap, 0, &Vec::<u8>::new()).unwrap();

        let result: Result<(_, Vec<u8>), _> = read(&path, SnapshotKind::Matrix);
        assert!(matches!(result, Err(SnapshotFormatError::KindMismatch { .. })));
    }

    #[test]
    fn test_read_header_only() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("h.snap");
        write(&path, SnapshotKind::GeneratorMap, 3, &0u8).unwrap();

        let header = read_header(&path).unwrap();
        assert_eq!(header.kind, SnapshotKind::GeneratorMap);
        assert_eq!(header.entry_count, 3);
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempdir().unwrap();
        let result: Result<(_, u8), _> = read(dir.path().join("absent"), SnapshotKind::Matrix);
        assert!(matches!(result, Err(SnapshotFormatError::IoError(_))));
    }

    #[test]
    fn test_read_garbage_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("garbage");
        std::fs::write(&path, b"definitely not a snapshot file").unwrap();

        let result: Result<(_, u8), _> = read(&path, SnapshotKind::Matrix);
        assert!(result.is_err());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(SnapshotFormatError::InvalidMagic.to_string(), "invalid magic bytes");
        assert_eq!(
            SnapshotFormatError::UnsupportedVersion(5).to_string(),
            "unsupported version: 5"
        );
        assert_eq!(
            SnapshotFormatError::IoError("disk full".into()).to_string(),
            "io error: disk full"
        );
    }
}
