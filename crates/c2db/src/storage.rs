//! Output sink: one pretty-printed JSON file per material.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::types::C2dbResult;

/// File-name prefix for written records.
const FILE_PREFIX: &str = "c2db_";

/// Writes assembled records into an output directory.
#[derive(Debug, Clone)]
pub struct RecordWriter {
    dir: PathBuf,
}

impl RecordWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Deterministic file name for a material ID.
    pub fn file_name(uid: &str) -> String {
        format!("{FILE_PREFIX}{uid}.json")
    }

    pub fn path_for(&self, uid: &str) -> PathBuf {
        self.dir.join(Self::file_name(uid))
    }

    /// Write a record to `<dir>/c2db_<uid>.json`, creating the directory
    /// if needed. Returns the written path.
    pub fn write<T: Serialize>(&self, uid: &str, record: &T) -> C2dbResult<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;

        let path = self.path_for(uid);
        let mut file = std::io::BufWriter::new(std::fs::File::create(&path)?);
        Self::write_to(record, &mut file)?;
        file.flush()?;

        tracing::debug!("Wrote {}", path.display());
        Ok(path)
    }

    /// Serialize a record to any writer with two-space indentation.
    pub fn write_to<T: Serialize, W: Write>(record: &T, writer: &mut W) -> C2dbResult<()> {
        serde_json::to_writer_pretty(&mut *writer, record)?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_file_name() {
        assert_eq!(
            RecordWriter::file_name("MoS2-b3b4685fb6e1"),
            "c2db_MoS2-b3b4685fb6e1.json"
        );
    }

    #[test]
    fn test_write_to_buffer() {
        let mut buf = Vec::new();
        RecordWriter::write_to(&json!({ "uid": "x" }), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "{\n  \"uid\": \"x\"\n}\n");
    }

    #[test]
    fn test_file_roundtrip_creates_dir() {
        let dir = tempfile::tempdir().unwrap();
        let writer = RecordWriter::new(dir.path().join("nested/out"));
        assert_eq!(writer.dir(), dir.path().join("nested/out"));

        let path = writer
            .write("MoS2-1", &json!({ "bands": [[1.0, 2.0]] }))
            .unwrap();
        assert_eq!(path, writer.path_for("MoS2-1"));

        let loaded: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(loaded, json!({ "bands": [[1.0, 2.0]] }));
    }
}
