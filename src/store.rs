//! Line-delimited JSON input reader and append-only annotation sink

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{AnnotatorError, Result};
use crate::schemas::{AnnotationRecord, MISSING_POST_ID, QuestionRecord};

/// Load every question from a JSONL file. Blank lines are skipped; a line that is not
/// a JSON object aborts the load with its 1-based line number. Fields of the wrong type
/// are dropped to their defaults with a warning.
pub fn load_questions(path: impl AsRef<Path>) -> Result<Vec<QuestionRecord>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| AnnotatorError::Io {
        message: format!("cannot open {}: {}", path.display(), e),
    })?;
    read_questions(BufReader::new(file))
}

pub fn read_questions(reader: impl BufRead) -> Result<Vec<QuestionRecord>> {
    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let malformed = |message: String| AnnotatorError::MalformedInput {
            line: idx + 1,
            message,
        };
        let value: Value = serde_json::from_str(&line).map_err(|e| malformed(e.to_string()))?;
        let Value::Object(fields) = value else {
            return Err(malformed("expected a JSON object".to_string()));
        };
        records.push(salvage_record(fields, idx + 1));
    }
    Ok(records)
}

/// Deserialize a record, dropping any field whose value does not fit so it falls back
/// to its default.
fn salvage_record(fields: Map<String, Value>, line: usize) -> QuestionRecord {
    if let Ok(record) = serde_json::from_value(Value::Object(fields.clone())) {
        return record;
    }
    let kept: Map<String, Value> = fields
        .into_iter()
        .filter(|(name, value)| {
            let single = Value::Object(Map::from_iter([(name.clone(), value.clone())]));
            match serde_json::from_value::<QuestionRecord>(single) {
                Ok(_) => true,
                Err(e) => {
                    warn!("Line {}: ignoring field '{}': {}", line, name, e);
                    false
                }
            }
        })
        .collect();
    serde_json::from_value(Value::Object(kept)).unwrap_or_else(|_| QuestionRecord {
        post_id: MISSING_POST_ID,
        ..Default::default()
    })
}

/// Append-only destination for annotation records
pub trait AnnotationSink {
    /// Persist one record; on return it must survive a crash of the process
    fn append(&mut self, record: &AnnotationRecord) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl AnnotationSink for Vec<AnnotationRecord> {
    fn append(&mut self, record: &AnnotationRecord) -> Result<()> {
        self.push(record.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Keep existing lines and add after them
    Append,
    /// Start from an empty file
    Truncate,
}

/// JSONL file sink: one compact JSON object per line, UTF-8, non-ASCII kept literal.
/// Every append is flushed; the writer is flushed again on drop.
pub struct JsonlSink {
    writer: BufWriter<File>,
    path: PathBuf,
    written: usize,
}

impl JsonlSink {
    pub fn open(path: impl AsRef<Path>, mode: OpenMode) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut options = OpenOptions::new();
        options.create(true);
        match mode {
            OpenMode::Append => options.append(true),
            OpenMode::Truncate => options.write(true).truncate(true),
        };
        let file = options.open(&path).map_err(|e| AnnotatorError::Io {
            message: format!("cannot open {} for writing: {}", path.display(), e),
        })?;
        Ok(Self {
            writer: BufWriter::new(file),
            path,
            written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records appended through this handle
    pub fn written(&self) -> usize {
        self.written
    }
}

impl AnnotationSink for JsonlSink {
    fn append(&mut self, record: &AnnotationRecord) -> Result<()> {
        let line = serde_json::to_string(record)?;
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.written += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        Ok(())
    }
}

impl Drop for JsonlSink {
    fn drop(&mut self) {
        if let Err(e) = self.writer.flush() {
            warn!("Failed to flush {}: {}", self.path.display(), e);
        }
    }
}
