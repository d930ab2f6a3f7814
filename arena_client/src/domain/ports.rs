use std::time::Instant;

use super::entities::{Entity, EntityKey, Vec2};
use super::snapshots::ResultSummary;

/// One-shot tint played on an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlashKind {
    Damage,
    Attack,
}

/// Port for render-affecting side effects requested by the reconciler.
///
/// Calls are fire-and-forget: implementations may apply them immediately or
/// queue them for a later frame, but must keep per-entity call order and must
/// never report failures back into synchronization state.
pub trait VisualEffects {
    fn spawn(&mut self, entity: &Entity);
    fn move_to(&mut self, key: EntityKey, position: Vec2);
    fn set_orientation(&mut self, key: EntityKey, orientation: f64);
    fn set_health_display(&mut self, key: EntityKey, health: u32);
    fn toggle_shield_visual(&mut self, key: EntityKey, active: bool);
    fn set_label(&mut self, key: EntityKey, label: &str);
    fn remove(&mut self, key: EntityKey);
    fn flash(&mut self, key: EntityKey, kind: FlashKind);
}

// Port for the screen/view controller that lives outside the sync core.
pub trait ViewEvents {
    fn on_start_game(&mut self);
    fn on_start_simulation(&mut self);
    fn on_server_error(&mut self, message: &str);
    fn on_results(&mut self, summary: &ResultSummary);
    fn on_closed(&mut self);
}

// Port for retrieving monotonic time.
pub trait Clock {
    fn now(&self) -> Instant;
}
