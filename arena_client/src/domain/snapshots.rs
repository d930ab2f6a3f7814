// Validated per-entity snapshots and terminal match results.

use super::entities::{EntityId, EntityKind, Vec2};

#[derive(Debug, Clone, PartialEq)]
pub struct AgentSnapshot {
    pub id: EntityId,
    pub name: Option<String>,
    pub position: Vec2,
    pub orientation: f64,
    pub health: u32,
    pub shield_active: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectileSnapshot {
    pub id: EntityId,
    pub owner_id: EntityId,
    pub position: Vec2,
    pub orientation: f64,
}

/// Server notice that an entity left the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DestroyNotice {
    pub id: EntityId,
    pub kind: EntityKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerResult {
    pub class_name: String,
    // None when the player survived until the end.
    pub survival_time_seconds: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub winner_declared: bool,
    pub is_tie: bool,
    pub players: Vec<PlayerResult>,
    pub terminated_by_error: bool,
}

/// Rendered end-of-match screen content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSummary {
    pub banner: String,
    // Shown alongside the banner when player code crashed the match.
    pub error_banner: Option<String>,
    pub lines: Vec<String>,
}
