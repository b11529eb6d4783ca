use serde::{Deserialize, Serialize};

use crate::models::Signal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Created,
    ClosedWin,
    ClosedLoss,
    ClosedExpired,
}

/// Snapshot handed to the notification transport. Delivery failures must
/// never feed back into the lifecycle state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalEvent {
    pub kind: EventKind,
    pub signal: Signal,
}

impl SignalEvent {
    pub fn new(kind: EventKind, signal: Signal) -> Self {
        Self { kind, signal }
    }
}
