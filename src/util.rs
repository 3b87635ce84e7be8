use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::text::strip_bom;

pub fn now_utc_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn utc_compact_string(ts: DateTime<Utc>) -> String {
    ts.format("%Y%m%dT%H%M%SZ").to_string()
}

pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory: {}", path.display()))
}

pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Reads a JSON document, tolerating a leading byte order mark.
pub fn read_json_file(path: &Path) -> Result<Value> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(strip_bom(&raw))
        .with_context(|| format!("failed to parse {}", path.display()))
}

/// Writes pretty JSON with a trailing newline and returns the sha256 of the
/// bytes on disk.
pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<String> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        ensure_directory(parent)?;
    }

    let mut data = serde_json::to_vec_pretty(value)
        .with_context(|| format!("failed to serialize json: {}", path.display()))?;
    data.push(b'\n');

    let mut file = File::create(path)
        .with_context(|| format!("failed to create json file: {}", path.display()))?;
    file.write_all(&data)
        .with_context(|| format!("failed to write json file: {}", path.display()))?;

    Ok(sha256_hex(&data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn written_digest_matches_file_contents() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("out.json");

        let digest =
            write_json_pretty(&path, &serde_json::json!({ "b": 1, "a": 2 })).expect("write");
        let bytes = fs::read(&path).expect("read back");
        assert_eq!(digest, sha256_hex(&bytes));
        assert!(bytes.ends_with(b"}\n"));

        let value = read_json_file(&path).expect("parse back");
        assert_eq!(value["a"], 2);
    }

    #[test]
    fn compact_timestamp_has_no_separators() {
        let ts = DateTime::parse_from_rfc3339("2024-03-05T07:08:09Z")
            .expect("valid timestamp")
            .with_timezone(&Utc);
        assert_eq!(utc_compact_string(ts), "20240305T070809Z");
    }
}
