//! File-backed flag store.
//!
//! The flag file is shared with the front-end API process: it creates
//! `request` entries, this side transitions them through `fulfilling`
//! to `fulfilled`. Reads and writes always cover the whole document.

use std::fs;
use std::path::PathBuf;

use crate::error::FlagStoreError;
use crate::ports::FlagStoreBackend;
use crate::requests::store::FlagSnapshot;

pub struct FileFlagStore {
    path: PathBuf,
}

impl FileFlagStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FlagStoreBackend for FileFlagStore {
    fn load(&mut self) -> Result<FlagSnapshot, FlagStoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FlagStoreError::Missing);
            }
            Err(e) => return Err(FlagStoreError::Io(e.kind())),
        };
        serde_json::from_str(&text).map_err(|_| FlagStoreError::Corrupt)
    }

    fn save(&mut self, snapshot: &FlagSnapshot) -> Result<(), FlagStoreError> {
        let text =
            serde_json::to_string_pretty(snapshot).map_err(|_| FlagStoreError::Corrupt)?;

        // Write-then-rename keeps concurrent readers off half-written files.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text).map_err(|e| FlagStoreError::Io(e.kind()))?;
        fs::rename(&tmp, &self.path).map_err(|e| FlagStoreError::Io(e.kind()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requests::store::{ActionEntry, RequestStatus};

    fn temp_path(tag: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("hydrostat-flags-{tag}-{}.json", std::process::id()));
        path
    }

    #[test]
    fn missing_file_reports_missing() {
        let path = temp_path("missing");
        let _ = fs::remove_file(&path);
        let mut store = FileFlagStore::new(&path);
        assert_eq!(store.load().unwrap_err(), FlagStoreError::Missing);
    }

    #[test]
    fn garbage_reports_corrupt() {
        let path = temp_path("corrupt");
        fs::write(&path, "not json at all {{{").unwrap();
        let mut store = FileFlagStore::new(&path);
        assert_eq!(store.load().unwrap_err(), FlagStoreError::Corrupt);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn save_then_load_round_trips() {
        let path = temp_path("roundtrip");
        let _ = fs::remove_file(&path);

        let mut snapshot = FlagSnapshot::default();
        snapshot.at = 1_700_000_000.0;
        snapshot
            .devices
            .entry("ph".into())
            .or_default()
            .insert(
                "down".into(),
                ActionEntry {
                    status: RequestStatus::Request,
                    action: "down".into(),
                    value: 2.5,
                },
            );

        let mut store = FileFlagStore::new(&path);
        store.save(&snapshot).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded, snapshot);
        assert!(!path.with_extension("json.tmp").exists());

        let _ = fs::remove_file(&path);
    }
}
