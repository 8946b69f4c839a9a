//! DBC container decompression
//!
//! A `.dbc` file is a raw DBF table header, followed by a 4-byte CRC, followed
//! by the record section compressed with the PKWARE DCL "implode" scheme. The
//! header is stored verbatim, so recovering the DBF is: copy the header bytes,
//! skip the CRC, explode the rest.
//!
//! The conversion engine treats this module as an opaque collaborator: it
//! hands over a path and gets back the raw DBF bytes plus decompression
//! statistics.

use crate::error::{DbcError, DbcResult};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Offset of the little-endian header length inside the DBF header.
const HEADER_LEN_OFFSET: usize = 8;

/// CRC bytes between the stored header and the compressed record section.
const CRC_LEN: usize = 4;

/// Statistics describing one decompression.
#[derive(Debug, Clone)]
pub struct DecompressStats {
    /// Compressed container path
    pub input: PathBuf,
    /// Decompressed file path, when the output was written to disk
    pub output: Option<PathBuf>,
    /// Container size in bytes
    pub input_size: u64,
    /// Decompressed size in bytes
    pub output_size: u64,
    /// Wall-clock decompression time
    pub elapsed: Duration,
}

/// Decompress a DBC container into raw DBF bytes.
pub fn decompress(path: &Path) -> DbcResult<(Vec<u8>, DecompressStats)> {
    let started = Instant::now();
    let raw = fs::read(path)?;
    let dbf = explode_container(path, &raw)?;

    let stats = DecompressStats {
        input: path.to_path_buf(),
        output: None,
        input_size: raw.len() as u64,
        output_size: dbf.len() as u64,
        elapsed: started.elapsed(),
    };
    Ok((dbf, stats))
}

/// Decompress a DBC container to a file.
///
/// When `output` is `None` the result is written next to the input as
/// `<input>.dbf` (`PNA1212.dbc` becomes `PNA1212.dbc.dbf`).
pub fn decompress_to_file(input: &Path, output: Option<&Path>) -> DbcResult<DecompressStats> {
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output_path(input));

    let (dbf, mut stats) = decompress(input)?;
    fs::write(&output, &dbf)?;
    stats.output = Some(output);
    Ok(stats)
}

/// Decompress every `.dbc` file in a directory (non-recursive), each to its
/// default `<name>.dbf` output.
pub fn decompress_directory(dir: &Path) -> DbcResult<Vec<DecompressStats>> {
    let mut containers = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_dbc = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("dbc"))
            .unwrap_or(false);
        if path.is_file() && is_dbc {
            containers.push(path);
        }
    }
    containers.sort();

    let mut all = Vec::with_capacity(containers.len());
    for container in &containers {
        all.push(decompress_to_file(container, None)?);
    }
    Ok(all)
}

/// Default decompression target: the input path with `.dbf` appended.
pub fn default_output_path(input: &Path) -> PathBuf {
    let mut name = OsString::from(input.as_os_str());
    name.push(".dbf");
    PathBuf::from(name)
}

fn explode_container(path: &Path, raw: &[u8]) -> DbcResult<Vec<u8>> {
    if raw.len() < HEADER_LEN_OFFSET + 2 {
        return Err(DbcError::InvalidContainer {
            path: path.to_path_buf(),
            reason: format!("file is only {} bytes", raw.len()),
        });
    }

    let header_len =
        u16::from_le_bytes([raw[HEADER_LEN_OFFSET], raw[HEADER_LEN_OFFSET + 1]]) as usize;
    if header_len < 32 || raw.len() < header_len + CRC_LEN {
        return Err(DbcError::InvalidContainer {
            path: path.to_path_buf(),
            reason: format!(
                "declared header length {header_len} does not fit in {} bytes",
                raw.len()
            ),
        });
    }

    let records = explode::explode(&raw[header_len + CRC_LEN..]).map_err(|e| {
        DbcError::Decompress {
            path: path.to_path_buf(),
            reason: format!("{e:?}"),
        }
    })?;

    let mut dbf = Vec::with_capacity(header_len + records.len());
    dbf.extend_from_slice(&raw[..header_len]);
    dbf.extend_from_slice(&records);
    Ok(dbf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("/data/PNA1212.dbc")),
            PathBuf::from("/data/PNA1212.dbc.dbf")
        );
    }

    #[test]
    fn test_decompress_directory_skips_other_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("table.dbf"), b"raw").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"text").unwrap();

        let stats = decompress_directory(dir.path()).unwrap();
        assert!(stats.is_empty());
    }

    #[test]
    fn test_too_short_container() {
        let err = explode_container(Path::new("short.dbc"), &[0u8; 6]).unwrap_err();
        assert!(matches!(err, DbcError::InvalidContainer { .. }), "{err}");
    }

    #[test]
    fn test_header_length_beyond_file() {
        let mut raw = vec![0u8; 40];
        raw[HEADER_LEN_OFFSET..HEADER_LEN_OFFSET + 2].copy_from_slice(&500u16.to_le_bytes());
        let err = explode_container(Path::new("bad.dbc"), &raw).unwrap_err();
        assert!(matches!(err, DbcError::InvalidContainer { .. }), "{err}");
    }

    #[test]
    fn test_garbage_record_section() {
        let mut raw = vec![0u8; 64];
        raw[HEADER_LEN_OFFSET..HEADER_LEN_OFFSET + 2].copy_from_slice(&32u16.to_le_bytes());
        // 0xFF is not a valid literal-coding flag for the imploded stream
        for b in raw[32 + CRC_LEN..].iter_mut() {
            *b = 0xFF;
        }
        let err = explode_container(Path::new("garbage.dbc"), &raw).unwrap_err();
        assert!(matches!(err, DbcError::Decompress { .. }), "{err}");
    }
}
