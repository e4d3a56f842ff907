//! File I/O utilities with atomic writes
//!
//! Provides safe file operations that won't corrupt data on failure.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::LedgerError;

/// Read JSON from a file, returning a default value if file doesn't exist
pub fn read_json<T, P>(path: P) -> Result<T, LedgerError>
where
    T: DeserializeOwned + Default,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    if !path.exists() {
        return Ok(T::default());
    }

    let file = File::open(path)
        .map_err(|e| LedgerError::Storage(format!("Failed to open {}: {}", path.display(), e)))?;

    let reader = BufReader::new(file);
    serde_json::from_reader(reader)
        .map_err(|e| LedgerError::Storage(format!("Failed to parse {}: {}", path.display(), e)))
}

/// A fully written temp file waiting to replace its target
///
/// Splitting the write from the rename lets a caller do other durable work in
/// between and only then make the new contents visible.
#[derive(Debug)]
pub struct StagedFile {
    temp_path: PathBuf,
    target: PathBuf,
}

impl StagedFile {
    /// Atomically replace the target with the staged contents
    pub fn promote(self) -> Result<(), LedgerError> {
        fs::rename(&self.temp_path, &self.target).map_err(|e| {
            let _ = fs::remove_file(&self.temp_path);
            LedgerError::Storage(format!("Failed to rename temp file: {}", e))
        })
    }

    /// Throw the staged contents away, leaving the target untouched
    pub fn discard(self) {
        let _ = fs::remove_file(&self.temp_path);
    }
}

/// Write JSON to a synced temp file next to `path` without replacing it
pub fn stage_json<T, P>(path: P, data: &T) -> Result<StagedFile, LedgerError>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            LedgerError::Storage(format!(
                "Failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    // Temp file must live in the same directory for the rename to be atomic
    let temp_path = path.with_extension("json.tmp");

    let file = File::create(&temp_path)
        .map_err(|e| LedgerError::Storage(format!("Failed to create temp file: {}", e)))?;

    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, data)
        .map_err(|e| LedgerError::Storage(format!("Failed to serialize data: {}", e)))?;

    writer
        .flush()
        .map_err(|e| LedgerError::Storage(format!("Failed to flush data: {}", e)))?;

    writer
        .get_ref()
        .sync_all()
        .map_err(|e| LedgerError::Storage(format!("Failed to sync data: {}", e)))?;

    Ok(StagedFile {
        temp_path,
        target: path.to_path_buf(),
    })
}

/// Write JSON to a file atomically (write to temp, then rename)
///
/// The file is either completely written or not modified at all.
pub fn write_json_atomic<T, P>(path: P, data: &T) -> Result<(), LedgerError>
where
    T: Serialize,
    P: AsRef<Path>,
{
    stage_json(path, data)?.promote()
}

/// Contents of a line-oriented file
#[derive(Debug, Default, PartialEq, Eq)]
pub struct LineContents {
    /// Every newline-terminated, non-empty line
    pub lines: Vec<String>,
    /// Text after the last newline when the file does not end with one
    pub tail: Option<String>,
    /// Byte length of the newline-terminated prefix
    pub complete_len: u64,
}

/// Read a text file line by line; a missing file has no lines
///
/// A trailing fragment without a newline is returned separately so callers
/// can tell a torn final write apart from a complete line.
pub fn read_lines<P: AsRef<Path>>(path: P) -> Result<LineContents, LedgerError> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(LineContents::default());
    }

    let text = fs::read_to_string(path)
        .map_err(|e| LedgerError::Storage(format!("Failed to read {}: {}", path.display(), e)))?;

    let complete_len = text.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let (complete, rest) = text.split_at(complete_len);

    Ok(LineContents {
        lines: complete
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(str::to_string)
            .collect(),
        tail: (!rest.trim().is_empty()).then(|| rest.to_string()),
        complete_len: complete_len as u64,
    })
}

/// Cut a file back to `len` bytes
pub fn truncate_file<P: AsRef<Path>>(path: P, len: u64) -> Result<(), LedgerError> {
    let path = path.as_ref();
    let file = OpenOptions::new()
        .write(true)
        .open(path)
        .map_err(|e| LedgerError::Storage(format!("Failed to open {}: {}", path.display(), e)))?;
    file.set_len(len)
        .and_then(|_| file.sync_all())
        .map_err(|e| LedgerError::Storage(format!("Failed to truncate {}: {}", path.display(), e)))
}

/// Append lines to a file as a single durable write
///
/// If any step fails the file is truncated back to its previous length, so a
/// failed append never leaves a partial line behind.
pub fn append_lines<P: AsRef<Path>>(path: P, lines: &[String]) -> Result<(), LedgerError> {
    let path = path.as_ref();
    if lines.is_empty() {
        return Ok(());
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| LedgerError::Storage(format!("Failed to open {}: {}", path.display(), e)))?;

    let previous_len = file
        .metadata()
        .map_err(|e| LedgerError::Storage(format!("Failed to stat {}: {}", path.display(), e)))?
        .len();

    let mut buffer = String::new();
    for line in lines {
        buffer.push_str(line);
        buffer.push('\n');
    }

    let result = file
        .write_all(buffer.as_bytes())
        .and_then(|_| file.flush())
        .and_then(|_| file.sync_all());

    if let Err(e) = result {
        let _ = file.set_len(previous_len);
        return Err(LedgerError::Storage(format!(
            "Failed to append to {}: {}",
            path.display(),
            e
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
    struct TestData {
        name: String,
        value: i32,
    }

    #[test]
    fn test_read_nonexistent_returns_default() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nonexistent.json");

        let data: TestData = read_json(&path).unwrap();
        assert_eq!(data, TestData::default());
    }

    #[test]
    fn test_write_and_read() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.json");

        let data = TestData {
            name: "test".to_string(),
            value: 42,
        };

        write_json_atomic(&path, &data).unwrap();
        let loaded: TestData = read_json(&path).unwrap();
        assert_eq!(data, loaded);
        assert!(!temp_dir.path().join("test.json.tmp").exists());
    }

    #[test]
    fn test_failed_atomic_write_keeps_old_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.json");
        let original = TestData {
            name: "original".to_string(),
            value: 1,
        };
        write_json_atomic(&path, &original).unwrap();

        // A directory squatting on the temp path makes the write fail
        fs::create_dir(temp_dir.path().join("test.json.tmp")).unwrap();
        let replacement = TestData {
            name: "replacement".to_string(),
            value: 2,
        };
        assert!(write_json_atomic(&path, &replacement).is_err());

        let loaded: TestData = read_json(&path).unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn test_staged_write_is_invisible_until_promoted() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.json");
        let first = TestData {
            name: "first".to_string(),
            value: 1,
        };
        write_json_atomic(&path, &first).unwrap();

        let second = TestData {
            name: "second".to_string(),
            value: 2,
        };
        let staged = stage_json(&path, &second).unwrap();
        assert_eq!(read_json::<TestData, _>(&path).unwrap(), first);

        staged.promote().unwrap();
        assert_eq!(read_json::<TestData, _>(&path).unwrap(), second);

        stage_json(&path, &first).unwrap().discard();
        assert_eq!(read_json::<TestData, _>(&path).unwrap(), second);
        assert!(!temp_dir.path().join("test.json.tmp").exists());
    }

    #[test]
    fn test_append_and_read_lines() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("log.jsonl");

        append_lines(&path, &["one".to_string()]).unwrap();
        append_lines(&path, &["two".to_string(), "three".to_string()]).unwrap();
        append_lines(&path, &[]).unwrap();

        let contents = read_lines(&path).unwrap();
        assert_eq!(contents.lines, vec!["one", "two", "three"]);
        assert_eq!(contents.tail, None);
        assert_eq!(contents.complete_len, 14);
    }

    #[test]
    fn test_read_lines_separates_torn_tail() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("log.jsonl");
        fs::write(&path, "one\ntwo\nthr").unwrap();

        let contents = read_lines(&path).unwrap();
        assert_eq!(contents.lines, vec!["one", "two"]);
        assert_eq!(contents.tail.as_deref(), Some("thr"));

        truncate_file(&path, contents.complete_len).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn test_read_lines_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(
            read_lines(temp_dir.path().join("none.jsonl")).unwrap(),
            LineContents::default()
        );
    }
}
