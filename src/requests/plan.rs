//! Actuation vocabulary and the safety-ordered planner.
//!
//! The priority table is data, not code: an ordered slice of intents
//! that encodes the physical sequencing constraints of the rig. Change
//! the plumbing, change the table.

use super::store::PendingRequest;

/// Every recognized device/action pair in the request vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// `level:drain` — pump water out via the drain relay.
    Drain,
    /// `level:set` — move the level to an absolute set-point.
    SetLevel,
    /// `level:fill` — add water up to the requested level.
    Fill,
    /// `ec:nute2` — FloraMicro.
    Nute2,
    /// `ec:nute1` — FloraGro.
    Nute1,
    /// `ec:nute3` — FloraBloom.
    Nute3,
    /// `ec:nute4` — CALiMAGic.
    Nute4,
    /// `ph:up`
    PhUp,
    /// `ph:down`
    PhDown,
}

impl Intent {
    /// Parse a device/action pair; `None` for anything outside the
    /// vocabulary.
    pub fn from_names(device: &str, action: &str) -> Option<Self> {
        match (device, action) {
            ("level", "drain") => Some(Self::Drain),
            ("level", "set") => Some(Self::SetLevel),
            ("level", "fill") => Some(Self::Fill),
            ("ec", "nute1") => Some(Self::Nute1),
            ("ec", "nute2") => Some(Self::Nute2),
            ("ec", "nute3") => Some(Self::Nute3),
            ("ec", "nute4") => Some(Self::Nute4),
            ("ph", "up") => Some(Self::PhUp),
            ("ph", "down") => Some(Self::PhDown),
            _ => None,
        }
    }

    pub const fn device(self) -> &'static str {
        match self {
            Self::Drain | Self::SetLevel | Self::Fill => "level",
            Self::Nute1 | Self::Nute2 | Self::Nute3 | Self::Nute4 => "ec",
            Self::PhUp | Self::PhDown => "ph",
        }
    }

    pub const fn action(self) -> &'static str {
        match self {
            Self::Drain => "drain",
            Self::SetLevel => "set",
            Self::Fill => "fill",
            Self::Nute1 => "nute1",
            Self::Nute2 => "nute2",
            Self::Nute3 => "nute3",
            Self::Nute4 => "nute4",
            Self::PhUp => "up",
            Self::PhDown => "down",
        }
    }
}

/// Physical sequencing order for a batch of requests.
///
/// Water moves before chemistry: drain first so nothing doses into a
/// reservoir about to be emptied, set-point and fill next so doses mix
/// into the final volume. FloraMicro goes in before the other nutrients
/// (it binds poorly when added after them), nutrients shift EC before
/// any pH correction, and the pH trim runs last against the final mix.
pub const PRIORITY: [Intent; 9] = [
    Intent::Drain,
    Intent::SetLevel,
    Intent::Fill,
    Intent::Nute2,
    Intent::Nute1,
    Intent::Nute3,
    Intent::Nute4,
    Intent::PhUp,
    Intent::PhDown,
];

/// One planned, recognized request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannedAction {
    pub intent: Intent,
    pub value: f64,
}

/// Order pending requests by the priority table.
///
/// Stable partial sort: table order wins, and requests sharing a table
/// slot keep their arrival order. Requests outside the vocabulary are
/// not planned (the monitor still marks them fulfilled).
pub fn plan(pending: &[PendingRequest]) -> Vec<PlannedAction> {
    let mut out = Vec::with_capacity(pending.len());
    for slot in PRIORITY {
        for request in pending {
            if Intent::from_names(&request.device, &request.action) == Some(slot) {
                out.push(PlannedAction {
                    intent: slot,
                    value: request.value,
                });
            }
        }
    }
    out
}
