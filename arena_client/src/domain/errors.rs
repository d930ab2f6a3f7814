// Domain-level errors for entity synchronization.

use super::entities::{EntityId, EntityKind};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    // Agent update for an id that was never spawned; aborts the rest of the batch.
    UnknownEntityReference { kind: EntityKind, id: EntityId },
    // Out-of-band spawn for an id that is already live.
    AlreadyRegistered { kind: EntityKind, id: EntityId },
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::UnknownEntityReference { kind, id } => {
                write!(f, "unknown {kind} reference: {id}")
            }
            SyncError::AlreadyRegistered { kind, id } => {
                write!(f, "{kind} {id} is already registered")
            }
        }
    }
}

impl std::error::Error for SyncError {}

/// A single malformed record inside a state batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotError {
    pub kind: EntityKind,
    // Position of the record in its batch.
    pub index: usize,
    // Present when the record carried a readable id.
    pub id: Option<EntityId>,
    pub reason: String,
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(
                f,
                "malformed {} snapshot #{} (id {id}): {}",
                self.kind, self.index, self.reason
            ),
            None => write!(
                f,
                "malformed {} snapshot #{}: {}",
                self.kind, self.index, self.reason
            ),
        }
    }
}

impl std::error::Error for SnapshotError {}
