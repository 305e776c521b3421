//! Line-delimited JSON readers/writers shared by the fetch and convert stages.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Reads every record of a JSONL file.
///
/// Blank lines are ignored. A malformed *final* line is what an interrupted
/// append leaves behind, so it is logged and dropped; a malformed line
/// anywhere else is an error.
pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let lines: Vec<(usize, String)> = BufReader::new(file)
        .lines()
        .enumerate()
        .map(|(idx, line)| {
            line.map(|l| (idx + 1, l))
                .with_context(|| format!("failed to read {} line {}", path.display(), idx + 1))
        })
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .filter(|(_, l)| !l.trim().is_empty())
        .collect();

    let last = lines.len();
    let mut out = Vec::with_capacity(last);
    for (pos, (line_no, line)) in lines.into_iter().enumerate() {
        match serde_json::from_str::<T>(&line) {
            Ok(record) => out.push(record),
            Err(err) if pos + 1 == last => {
                warn!(
                    target = "jsonl",
                    file = %path.display(),
                    line = line_no,
                    error = %err,
                    "ignoring truncated trailing record"
                );
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("invalid JSON record at {} line {}", path.display(), line_no)
                })
            }
        }
    }
    Ok(out)
}

/// Append-only JSONL sink that flushes after every record.
pub struct JsonlAppender {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl JsonlAppender {
    /// Opens `path` for appending, first cutting off any partial last line
    /// an interrupted run left behind.
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open {} for append", path.display()))?;
        let dropped = trim_partial_tail(&mut file)
            .with_context(|| format!("failed to repair {}", path.display()))?;
        if dropped > 0 {
            warn!(
                target = "jsonl",
                file = %path.display(),
                bytes = dropped,
                "truncated partial trailing record before append"
            );
        }
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    pub fn append<T: Serialize>(&mut self, record: &T) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)
            .with_context(|| format!("failed to serialize record for {}", self.path.display()))?;
        self.writer.write_all(b"\n")?;
        self.writer
            .flush()
            .with_context(|| format!("failed to flush {}", self.path.display()))?;
        Ok(())
    }
}

/// Truncates everything after the last newline. Returns the bytes removed.
fn trim_partial_tail(file: &mut File) -> std::io::Result<u64> {
    const CHUNK: u64 = 8 * 1024;
    let len = file.metadata()?.len();
    let mut end = len;
    let mut buf = vec![0u8; CHUNK as usize];
    while end > 0 {
        let start = end.saturating_sub(CHUNK);
        let window = &mut buf[..(end - start) as usize];
        file.seek(SeekFrom::Start(start))?;
        file.read_exact(window)?;
        if let Some(pos) = window.iter().rposition(|&b| b == b'\n') {
            let keep = start + pos as u64 + 1;
            if keep < len {
                file.set_len(keep)?;
            }
            return Ok(len - keep);
        }
        end = start;
    }
    // no newline at all: the whole file is one unfinished record
    if len > 0 {
        file.set_len(0)?;
    }
    Ok(len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    #[test]
    fn appended_records_read_back_in_order() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out.jsonl");
        let mut sink = JsonlAppender::open(&path).unwrap();
        sink.append(&json!({"id": 1})).unwrap();
        sink.append(&json!({"id": 2, "title": "Heat"})).unwrap();
        drop(sink);

        let mut again = JsonlAppender::open(&path).unwrap();
        again.append(&json!({"id": 3})).unwrap();

        let rows: Vec<Value> = read_records(&path).unwrap();
        let ids: Vec<i64> = rows.iter().map(|v| v["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn truncated_tail_is_dropped() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("partial.jsonl");
        std::fs::write(&path, "{\"id\": 1}\n\n{\"id\": 2}\n{\"id\": 3, \"ti").unwrap();
        let rows: Vec<Value> = read_records(&path).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn resumed_append_replaces_truncated_tail() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("resume.jsonl");
        std::fs::write(&path, "{\"id\":1}\n{\"id\":2,\"ti").unwrap();

        let mut sink = JsonlAppender::open(&path).unwrap();
        sink.append(&json!({"id": 2, "title": "x"})).unwrap();
        sink.append(&json!({"id": 3})).unwrap();
        drop(sink);

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "{\"id\":1}\n{\"id\":2,\"title\":\"x\"}\n{\"id\":3}\n"
        );
        let rows: Vec<Value> = read_records(&path).unwrap();
        let ids: Vec<i64> = rows.iter().map(|v| v["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn partial_only_file_is_emptied_on_open() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("lonely.jsonl");
        std::fs::write(&path, "{\"id\":9,").unwrap();
        drop(JsonlAppender::open(&path).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn corrupt_middle_line_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.jsonl");
        std::fs::write(&path, "{\"id\": 1}\nnot json\n{\"id\": 3}\n").unwrap();
        let err = read_records::<Value>(&path).unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");
    }
}
