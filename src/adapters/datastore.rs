//! Append-only JSON-lines reading/error log.
//!
//! One line per record, stamped at write time. Records are immutable
//! once written; readers (the reporting layer) filter by `name` and
//! timestamp range.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::error::StoreError;
use crate::ports::Datastore;

#[derive(Serialize)]
struct ValueRecord<'a> {
    at: f64,
    name: &'a str,
    value: f64,
}

#[derive(Serialize)]
struct ErrorRecord<'a> {
    at: f64,
    name: &'a str,
    error: &'a str,
}

pub struct JsonlDatastore {
    path: PathBuf,
}

impl JsonlDatastore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn append<R: Serialize>(&self, record: &R) -> Result<(), StoreError> {
        let mut line = serde_json::to_string(record)
            .map_err(|_| StoreError::Io(std::io::ErrorKind::InvalidData))?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StoreError::Io(e.kind()))?;
        file.write_all(line.as_bytes())
            .map_err(|e| StoreError::Io(e.kind()))
    }
}

fn epoch_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

impl Datastore for JsonlDatastore {
    fn write_value(&mut self, name: &str, value: f64) -> Result<(), StoreError> {
        self.append(&ValueRecord {
            at: epoch_now(),
            name,
            value,
        })
    }

    fn write_error(&mut self, name: &str, message: &str) -> Result<(), StoreError> {
        self.append(&ErrorRecord {
            at: epoch_now(),
            name,
            error: message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(tag: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("hydrostat-datastore-{tag}-{}.jsonl", std::process::id()));
        path
    }

    #[test]
    fn appends_one_line_per_record() {
        let path = temp_path("append");
        let _ = std::fs::remove_file(&path);

        let mut store = JsonlDatastore::new(&path);
        store.write_value("ph", 6.02).unwrap();
        store.write_error("ec", "sensor unreachable; 3 attempts failed").unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["name"], "ph");
        assert!((first["value"].as_f64().unwrap() - 6.02).abs() < 1e-9);
        assert!(first["at"].as_f64().unwrap() > 0.0);

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["name"], "ec");
        assert!(second["error"].as_str().unwrap().contains("3 attempts"));

        let _ = std::fs::remove_file(&path);
    }
}
