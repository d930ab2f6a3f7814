// Domain layer: entity model, validated snapshots, and the ports the core talks through.

pub mod entities;
pub mod errors;
pub mod ports;
pub mod snapshots;

pub use entities::{Agent, Entity, EntityId, EntityKey, EntityKind, Projectile, Side, Spatial, Vec2};
pub use errors::{SnapshotError, SyncError};
pub use ports::{Clock, FlashKind, ViewEvents, VisualEffects};
pub use snapshots::{
    AgentSnapshot, DestroyNotice, MatchResult, PlayerResult, ProjectileSnapshot, ResultSummary,
};
