//! Append-only JSON-lines logs
//!
//! Each append takes an exclusive advisory lock on the log file, writes one
//! serialized record followed by a newline and syncs. Readers take a shared
//! lock, so a log can be inspected while another process appends to it.

use crate::{Error, NormalizedPath, Result};
use fs2::FileExt;
use serde::{Serialize, de::DeserializeOwned};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::marker::PhantomData;

/// A typed handle on an append-only JSON-lines file.
#[derive(Debug, Clone)]
pub struct JsonLines<T> {
    path: NormalizedPath,
    _record: PhantomData<fn() -> T>,
}

impl<T: Serialize + DeserializeOwned> JsonLines<T> {
    pub fn new(path: NormalizedPath) -> Self {
        Self {
            path,
            _record: PhantomData,
        }
    }

    pub fn path(&self) -> &NormalizedPath {
        &self.path
    }

    /// Append one record.
    pub fn append(&self, record: &T) -> Result<()> {
        let native = self.path.to_native();
        if let Some(parent) = native.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        let mut line = serde_json::to_string(record).map_err(|e| Error::Serialize {
            path: native.clone(),
            format: "JSON".into(),
            message: e.to_string(),
        })?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&native)
            .map_err(|e| Error::io(&native, e))?;
        file.lock_exclusive().map_err(|_| Error::LockFailed {
            path: native.clone(),
        })?;
        file.write_all(line.as_bytes())
            .map_err(|e| Error::io(&native, e))?;
        file.sync_all().map_err(|e| Error::io(&native, e))?;
        // Lock released when file is dropped
        Ok(())
    }

    /// Read every record in append order. A missing file reads as empty.
    pub fn read_all(&self) -> Result<Vec<T>> {
        let native = self.path.to_native();
        let file = match File::open(&native) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::io(&native, e)),
        };
        file.lock_shared().map_err(|_| Error::LockFailed {
            path: native.clone(),
        })?;

        let mut content = String::new();
        (&file)
            .read_to_string(&mut content)
            .map_err(|e| Error::io(&native, e))?;

        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| {
                serde_json::from_str(line).map_err(|e| Error::CorruptRecord {
                    path: native.clone(),
                    line: idx + 1,
                    message: e.to_string(),
                })
            })
            .collect()
    }

    /// Replace the log with `records`, used by explicit pruning only.
    pub fn rewrite(&self, records: &[T]) -> Result<()> {
        let native = self.path.to_native();
        let mut content = String::new();
        for record in records {
            let line = serde_json::to_string(record).map_err(|e| Error::Serialize {
                path: native.clone(),
                format: "JSON".into(),
                message: e.to_string(),
            })?;
            content.push_str(&line);
            content.push('\n');
        }
        crate::io::write_text(&self.path, &content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Entry {
        id: u32,
        note: String,
    }

    fn entry(id: u32, note: &str) -> Entry {
        Entry {
            id,
            note: note.to_string(),
        }
    }

    #[test]
    fn missing_log_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log: JsonLines<Entry> = JsonLines::new(NormalizedPath::new(dir.path()).join("x.jsonl"));
        assert!(log.read_all().unwrap().is_empty());
    }

    #[test]
    fn append_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let log = JsonLines::new(NormalizedPath::new(dir.path()).join("state/log.jsonl"));

        log.append(&entry(1, "first")).unwrap();
        log.append(&entry(2, "second")).unwrap();

        assert_eq!(log.read_all().unwrap(), vec![entry(1, "first"), entry(2, "second")]);
    }

    #[test]
    fn corrupt_line_is_reported_with_line_number() {
        let dir = tempfile::tempdir().unwrap();
        let path = NormalizedPath::new(dir.path()).join("log.jsonl");
        std::fs::write(path.to_native(), "{\"id\":1,\"note\":\"ok\"}\nnot json\n").unwrap();

        let log: JsonLines<Entry> = JsonLines::new(path);
        match log.read_all() {
            Err(Error::CorruptRecord { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected corrupt record error, got {:?}", other),
        }
    }

    #[test]
    fn rewrite_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let log = JsonLines::new(NormalizedPath::new(dir.path()).join("log.jsonl"));
        log.append(&entry(1, "a")).unwrap();
        log.append(&entry(2, "b")).unwrap();

        log.rewrite(&[entry(2, "b")]).unwrap();

        assert_eq!(log.read_all().unwrap(), vec![entry(2, "b")]);
    }
}
