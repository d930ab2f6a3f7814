// Visual effect adapters: an ordered effect log for deferred rendering and a
// headless renderer that reports effects through tracing.

use crate::domain::{Entity, EntityKey, FlashKind, Spatial, Vec2, VisualEffects};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

/// One recorded bridge call.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Spawn(Entity),
    Move { key: EntityKey, position: Vec2 },
    Orientation { key: EntityKey, orientation: f64 },
    Health { key: EntityKey, health: u32 },
    Shield { key: EntityKey, active: bool },
    Label { key: EntityKey, label: String },
    Remove(EntityKey),
    Flash { key: EntityKey, kind: FlashKind },
}

impl Effect {
    pub fn key(&self) -> EntityKey {
        match self {
            Effect::Spawn(entity) => entity.key(),
            Effect::Move { key, .. }
            | Effect::Orientation { key, .. }
            | Effect::Health { key, .. }
            | Effect::Shield { key, .. }
            | Effect::Label { key, .. }
            | Effect::Flash { key, .. } => *key,
            Effect::Remove(key) => *key,
        }
    }
}

/// Records effects in call order so a render tick can apply them later.
#[derive(Debug, Default, Clone)]
pub struct EffectLog {
    effects: Vec<Effect>,
}

impl EffectLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    pub fn effects_for(&self, key: EntityKey) -> impl Iterator<Item = &Effect> {
        self.effects.iter().filter(move |effect| effect.key() == key)
    }

    pub fn count(&self, predicate: impl Fn(&Effect) -> bool) -> usize {
        self.effects.iter().filter(|effect| predicate(effect)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Hands every pending effect to the caller, oldest first.
    pub fn drain(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }
}

impl VisualEffects for EffectLog {
    fn spawn(&mut self, entity: &Entity) {
        self.effects.push(Effect::Spawn(entity.clone()));
    }

    fn move_to(&mut self, key: EntityKey, position: Vec2) {
        self.effects.push(Effect::Move { key, position });
    }

    fn set_orientation(&mut self, key: EntityKey, orientation: f64) {
        self.effects.push(Effect::Orientation { key, orientation });
    }

    fn set_health_display(&mut self, key: EntityKey, health: u32) {
        self.effects.push(Effect::Health { key, health });
    }

    fn toggle_shield_visual(&mut self, key: EntityKey, active: bool) {
        self.effects.push(Effect::Shield { key, active });
    }

    fn set_label(&mut self, key: EntityKey, label: &str) {
        self.effects.push(Effect::Label {
            key,
            label: label.to_string(),
        });
    }

    fn remove(&mut self, key: EntityKey) {
        self.effects.push(Effect::Remove(key));
    }

    fn flash(&mut self, key: EntityKey, kind: FlashKind) {
        self.effects.push(Effect::Flash { key, kind });
    }
}

/// Headless renderer: logs every effect and expires flash tints on render ticks.
#[derive(Debug)]
pub struct TracingRenderer {
    flash_duration: Duration,
    // Tint reset deadline per entity; a new flash replaces the previous one.
    tints: HashMap<EntityKey, (FlashKind, Instant)>,
    applied: u64,
}

impl TracingRenderer {
    pub fn new(flash_duration: Duration) -> Self {
        Self {
            flash_duration,
            tints: HashMap::new(),
            applied: 0,
        }
    }

    pub fn applied(&self) -> u64 {
        self.applied
    }

    pub fn active_tints(&self) -> usize {
        self.tints.len()
    }

    /// Clears tints whose reset deadline has passed. Returns how many were cleared.
    pub fn render_tick(&mut self, now: Instant) -> usize {
        let before = self.tints.len();
        self.tints.retain(|key, (kind, deadline)| {
            let keep = *deadline > now;
            if !keep {
                debug!(%key, ?kind, "tint cleared");
            }
            keep
        });
        before - self.tints.len()
    }

    fn flash_at(&mut self, key: EntityKey, kind: FlashKind, now: Instant) {
        self.applied += 1;
        self.tints.insert(key, (kind, now + self.flash_duration));
        debug!(%key, ?kind, "flash");
    }
}

impl VisualEffects for TracingRenderer {
    fn spawn(&mut self, entity: &Entity) {
        self.applied += 1;
        let position = entity.position();
        debug!(
            key = %entity.key(),
            x = position.x,
            y = position.y,
            orientation = entity.orientation(),
            "spawn"
        );
    }

    fn move_to(&mut self, key: EntityKey, position: Vec2) {
        self.applied += 1;
        debug!(%key, x = position.x, y = position.y, "move");
    }

    fn set_orientation(&mut self, key: EntityKey, orientation: f64) {
        self.applied += 1;
        debug!(%key, orientation, "orientation");
    }

    fn set_health_display(&mut self, key: EntityKey, health: u32) {
        self.applied += 1;
        debug!(%key, health, "health");
    }

    fn toggle_shield_visual(&mut self, key: EntityKey, active: bool) {
        self.applied += 1;
        debug!(%key, active, "shield");
    }

    fn set_label(&mut self, key: EntityKey, label: &str) {
        self.applied += 1;
        debug!(%key, label, "label");
    }

    fn remove(&mut self, key: EntityKey) {
        self.applied += 1;
        self.tints.remove(&key);
        debug!(%key, "remove");
    }

    fn flash(&mut self, key: EntityKey, kind: FlashKind) {
        self.flash_at(key, kind, Instant::now());
    }
}
