// Reconciles authoritative entity snapshots against the local registry.

use super::registry::EntityRegistry;
use crate::domain::{
    Agent, AgentSnapshot, Clock, DestroyNotice, Entity, EntityKey, EntityKind, FlashKind,
    Projectile, ProjectileSnapshot, Side, SnapshotError, SyncError, VisualEffects,
};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Tunables for reconciliation side effects.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcilerSettings {
    /// Repeated flashes of one kind on one entity inside this window are dropped.
    /// Zero disables coalescing.
    pub flash_coalesce_window: Duration,
}

/// Outcome of one state batch.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BatchReport {
    /// Snapshots applied to live (or newly registered) entities.
    pub applied: usize,
    /// Stale snapshots for retired entities.
    pub ignored: usize,
    /// Malformed records that were skipped.
    pub skipped: Vec<SnapshotError>,
    /// Set when the batch stopped early; the remaining snapshots were not applied.
    pub aborted: Option<SyncError>,
}

pub struct Reconciler<C> {
    registry: EntityRegistry,
    settings: ReconcilerSettings,
    clock: C,
    last_flash: HashMap<(EntityKey, FlashKind), Instant>,
}

impl<C: Clock> Reconciler<C> {
    pub fn new(settings: ReconcilerSettings, clock: C) -> Self {
        Self {
            registry: EntityRegistry::new(),
            settings,
            clock,
            last_flash: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Registers an agent ahead of its first state snapshot.
    pub fn spawn_agent<V: VisualEffects>(
        &mut self,
        agent: Agent,
        effects: &mut V,
    ) -> Result<(), SyncError> {
        let id = agent.id;
        let entity = Entity::Agent(agent.clone());
        if !self.registry.insert_agent(agent) {
            return Err(SyncError::AlreadyRegistered {
                kind: EntityKind::Agent,
                id,
            });
        }
        effects.spawn(&entity);
        Ok(())
    }

    /// Upserts agent state. An id that was never spawned aborts the rest of the batch.
    pub fn reconcile_agents<I, V>(&mut self, batch: I, effects: &mut V) -> BatchReport
    where
        I: IntoIterator<Item = Result<AgentSnapshot, SnapshotError>>,
        V: VisualEffects,
    {
        let mut report = BatchReport::default();

        for item in batch {
            let snapshot = match item {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    warn!(error = %err, "skipping malformed agent snapshot");
                    report.skipped.push(err);
                    continue;
                }
            };

            let key = EntityKey::agent(snapshot.id);
            if !self.registry.contains(key) {
                if self.registry.is_retired(key) {
                    debug!(id = snapshot.id, "ignoring update for retired agent");
                    report.ignored += 1;
                    continue;
                }

                let err = SyncError::UnknownEntityReference {
                    kind: EntityKind::Agent,
                    id: snapshot.id,
                };
                warn!(error = %err, "aborting agent batch");
                report.aborted = Some(err);
                break;
            }

            self.upsert_agent(snapshot, effects);
            report.applied += 1;
        }

        report
    }

    fn upsert_agent<V: VisualEffects>(&mut self, snapshot: AgentSnapshot, effects: &mut V) {
        let key = EntityKey::agent(snapshot.id);
        let side = Side::of_agent(snapshot.id);
        let assign_name = snapshot.name.is_some() && !self.registry.side_named(side);

        let Some(agent) = self.registry.agent_mut(snapshot.id) else {
            return;
        };

        agent.position = snapshot.position;
        agent.orientation = snapshot.orientation;

        let label = match snapshot.name {
            Some(name) if assign_name => {
                agent.name = Some(name.clone());
                Some(name)
            }
            _ => None,
        };

        let health_changed = agent.health != snapshot.health;
        agent.health = snapshot.health;

        let shield_changed = agent.shield_active != snapshot.shield_active;
        agent.shield_active = snapshot.shield_active;

        effects.set_orientation(key, snapshot.orientation);

        if let Some(name) = label {
            self.registry.mark_side_named(side);
            effects.set_label(key, &name);
        }

        if health_changed {
            effects.set_health_display(key, snapshot.health);
            self.flash(key, FlashKind::Damage, effects);
        }

        if shield_changed {
            effects.toggle_shield_visual(key, snapshot.shield_active);
        }

        // Redraw unconditionally so the renderer never drifts from the registry.
        effects.move_to(key, snapshot.position);
    }

    /// Upserts projectile state; unseen ids register themselves.
    pub fn reconcile_projectiles<I, V>(&mut self, batch: I, effects: &mut V) -> BatchReport
    where
        I: IntoIterator<Item = Result<ProjectileSnapshot, SnapshotError>>,
        V: VisualEffects,
    {
        let mut report = BatchReport::default();

        for item in batch {
            let snapshot = match item {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    warn!(error = %err, "skipping malformed projectile snapshot");
                    report.skipped.push(err);
                    continue;
                }
            };

            let key = EntityKey::projectile(snapshot.id);
            if self.registry.is_retired(key) {
                debug!(id = snapshot.id, "ignoring update for retired projectile");
                report.ignored += 1;
                continue;
            }

            if let Some(projectile) = self.registry.projectile_mut(snapshot.id) {
                projectile.position = snapshot.position;
                let turned = projectile.orientation != snapshot.orientation;
                projectile.orientation = snapshot.orientation;

                effects.move_to(key, snapshot.position);
                if turned {
                    effects.set_orientation(key, snapshot.orientation);
                }
            } else {
                self.register_projectile(snapshot, effects);
            }
            report.applied += 1;
        }

        report
    }

    fn register_projectile<V: VisualEffects>(
        &mut self,
        snapshot: ProjectileSnapshot,
        effects: &mut V,
    ) {
        let projectile = Projectile {
            id: snapshot.id,
            owner_id: snapshot.owner_id,
            position: snapshot.position,
            orientation: snapshot.orientation,
        };
        let entity = Entity::Projectile(projectile.clone());
        self.registry.insert_projectile(projectile);
        effects.spawn(&entity);

        let owner = EntityKey::agent(snapshot.owner_id);
        if self.registry.contains(owner) {
            self.flash(owner, FlashKind::Attack, effects);
        } else {
            debug!(
                projectile_id = snapshot.id,
                owner_id = snapshot.owner_id,
                "projectile owner not registered; skipping attack flash"
            );
        }
    }

    /// Retires an entity. Returns true if it was live; absent entities are a no-op.
    pub fn destroy<V: VisualEffects>(&mut self, notice: DestroyNotice, effects: &mut V) -> bool {
        let key = EntityKey {
            kind: notice.kind,
            id: notice.id,
        };

        match self.registry.retire(key) {
            Some(_) => {
                self.last_flash.retain(|(flashed, _), _| *flashed != key);
                effects.remove(key);
                true
            }
            None => {
                debug!(%key, "destroy for absent entity");
                false
            }
        }
    }

    /// Tears down all mirrored state at match end.
    pub fn reset<V: VisualEffects>(&mut self, effects: &mut V) {
        for key in self.registry.live_keys() {
            effects.remove(key);
        }
        self.registry.clear();
        self.last_flash.clear();
    }

    fn flash<V: VisualEffects>(&mut self, key: EntityKey, kind: FlashKind, effects: &mut V) {
        let window = self.settings.flash_coalesce_window;
        if !window.is_zero() {
            let now = self.clock.now();
            let recent = self
                .last_flash
                .get(&(key, kind))
                .is_some_and(|last| now.saturating_duration_since(*last) < window);
            if recent {
                debug!(%key, ?kind, "coalescing flash");
                return;
            }
            self.last_flash.insert((key, kind), now);
        }

        effects.flash(key, kind);
    }
}
