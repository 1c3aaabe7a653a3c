//! Flag store wire model.
//!
//! One JSON document shared with the front-end API: a top-level write
//! timestamp plus one object per device, mapping action names to their
//! current entries:
//!
//! ```json
//! {
//!   "at": 1754500000.0,
//!   "ph": {
//!     "up":   { "status": "idle",    "action": "up",   "value": 0.0 },
//!     "down": { "status": "request", "action": "down", "value": 2.5 }
//!   },
//!   "ec": {
//!     "nute2": { "status": "idle", "action": "nute2", "value": 0.0 }
//!   }
//! }
//! ```
//!
//! The document is always read and written whole; status mutations are
//! applied to a fresh snapshot so entries added concurrently by the
//! producer survive.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Lifecycle of one request entry. Producers create `request`; this side
/// moves it through `fulfilling` to `fulfilled`; `idle` is the resting
/// state the producer resets entries to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Idle,
    Request,
    Fulfilling,
    Fulfilled,
}

/// One device/action slot in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEntry {
    pub status: RequestStatus,
    pub action: String,
    pub value: f64,
}

/// Action name → entry for one device.
pub type DeviceActions = BTreeMap<String, ActionEntry>;

/// The whole flag document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FlagSnapshot {
    /// Wall-clock stamp of the last writer (epoch seconds).
    pub at: f64,
    #[serde(flatten)]
    pub devices: BTreeMap<String, DeviceActions>,
}

/// A pending intent found in the store.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequest {
    pub device: String,
    pub action: String,
    pub value: f64,
}

impl FlagSnapshot {
    /// Every entry currently in `request` status, in store order.
    pub fn pending(&self) -> Vec<PendingRequest> {
        let mut out = Vec::new();
        for (device, actions) in &self.devices {
            for (action, entry) in actions {
                if entry.status == RequestStatus::Request {
                    out.push(PendingRequest {
                        device: device.clone(),
                        action: action.clone(),
                        value: entry.value,
                    });
                }
            }
        }
        out
    }

    /// Update the status of one device/action entry. Returns `false`
    /// when the entry no longer exists.
    pub fn set_status(&mut self, device: &str, action: &str, status: RequestStatus) -> bool {
        match self
            .devices
            .get_mut(device)
            .and_then(|actions| actions.get_mut(action))
        {
            Some(entry) => {
                entry.status = status;
                true
            }
            None => false,
        }
    }

    /// Test/bench helper: insert a whole entry.
    pub fn put(&mut self, device: &str, action: &str, status: RequestStatus, value: f64) {
        let _ = self.devices.entry(device.to_string()).or_default().insert(
            action.to_string(),
            ActionEntry {
                status,
                action: action.to_string(),
                value,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FlagSnapshot {
        let mut snap = FlagSnapshot {
            at: 1_754_500_000.0,
            ..Default::default()
        };
        snap.put("ph", "up", RequestStatus::Idle, 0.0);
        snap.put("ph", "down", RequestStatus::Request, 2.5);
        snap.put("ec", "nute2", RequestStatus::Request, 40.0);
        snap.put("level", "fill", RequestStatus::Idle, 0.0);
        snap
    }

    #[test]
    fn pending_scans_request_entries_only() {
        let pending = sample().pending();
        assert_eq!(pending.len(), 2);
        // BTreeMap order: ec before ph.
        assert_eq!(pending[0].device, "ec");
        assert_eq!(pending[0].action, "nute2");
        assert!((pending[0].value - 40.0).abs() < 1e-9);
        assert_eq!(pending[1].device, "ph");
        assert_eq!(pending[1].action, "down");
    }

    #[test]
    fn set_status_touches_only_its_entry() {
        let mut snap = sample();
        assert!(snap.set_status("ph", "down", RequestStatus::Fulfilled));
        assert_eq!(snap.devices["ph"]["down"].status, RequestStatus::Fulfilled);
        assert_eq!(snap.devices["ph"]["up"].status, RequestStatus::Idle);
        assert_eq!(snap.devices["ec"]["nute2"].status, RequestStatus::Request);
    }

    #[test]
    fn set_status_on_vanished_entry_reports_false() {
        let mut snap = sample();
        assert!(!snap.set_status("level", "drain", RequestStatus::Fulfilled));
        assert!(!snap.set_status("aux", "toggle", RequestStatus::Fulfilled));
    }

    #[test]
    fn serde_round_trip_preserves_unknown_devices() {
        let text = r#"{
            "at": 1754500000.0,
            "aux": { "toggle": { "status": "idle", "action": "toggle", "value": 1.0 } },
            "ph": { "down": { "status": "request", "action": "down", "value": 2.5 } }
        }"#;
        let snap: FlagSnapshot = serde_json::from_str(text).unwrap();
        assert_eq!(snap.devices.len(), 2);
        assert_eq!(snap.devices["aux"]["toggle"].status, RequestStatus::Idle);

        let back = serde_json::to_string(&snap).unwrap();
        let again: FlagSnapshot = serde_json::from_str(&back).unwrap();
        assert_eq!(snap, again);
    }

    #[test]
    fn status_strings_are_lowercase() {
        let json = serde_json::to_string(&RequestStatus::Fulfilling).unwrap();
        assert_eq!(json, r#""fulfilling""#);
    }
}
