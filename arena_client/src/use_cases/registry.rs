// Entity registry: the single owner of mirrored entity state for one match.

use crate::domain::{Agent, Entity, EntityId, EntityKey, EntityKind, Projectile, Side};
use std::collections::{HashMap, HashSet};

/// Live entities keyed per variant, plus tombstones for retired keys.
///
/// Not thread-safe; the owning session is the only mutator.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    agents: HashMap<EntityId, Agent>,
    projectiles: HashMap<EntityId, Projectile>,
    // Keys removed by a destroy notice; late updates for these are ignored.
    // Grows with every destroy in a match and is emptied by `clear` at match end.
    retired: HashSet<EntityKey>,
    // Name-assigned flag per side (the arena has exactly two).
    named_sides: [bool; 2],
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn agent(&self, id: EntityId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    pub(crate) fn agent_mut(&mut self, id: EntityId) -> Option<&mut Agent> {
        self.agents.get_mut(&id)
    }

    pub fn projectile(&self, id: EntityId) -> Option<&Projectile> {
        self.projectiles.get(&id)
    }

    pub(crate) fn projectile_mut(&mut self, id: EntityId) -> Option<&mut Projectile> {
        self.projectiles.get_mut(&id)
    }

    pub fn contains(&self, key: EntityKey) -> bool {
        match key.kind {
            EntityKind::Agent => self.agents.contains_key(&key.id),
            EntityKind::Projectile => self.projectiles.contains_key(&key.id),
        }
    }

    pub fn is_retired(&self, key: EntityKey) -> bool {
        self.retired.contains(&key)
    }

    /// Registers an agent. Returns false (and keeps the existing record) if the id is live.
    pub(crate) fn insert_agent(&mut self, agent: Agent) -> bool {
        if self.agents.contains_key(&agent.id) {
            return false;
        }
        self.retired.remove(&EntityKey::agent(agent.id));
        self.agents.insert(agent.id, agent);
        true
    }

    pub(crate) fn insert_projectile(&mut self, projectile: Projectile) -> bool {
        if self.projectiles.contains_key(&projectile.id) {
            return false;
        }
        self.projectiles.insert(projectile.id, projectile);
        true
    }

    /// Removes a live entity and tombstones its key. Retiring twice is a no-op.
    pub(crate) fn retire(&mut self, key: EntityKey) -> Option<Entity> {
        self.retired.insert(key);
        match key.kind {
            EntityKind::Agent => self.agents.remove(&key.id).map(Entity::Agent),
            EntityKind::Projectile => self.projectiles.remove(&key.id).map(Entity::Projectile),
        }
    }

    pub fn side_named(&self, side: Side) -> bool {
        self.named_sides[side.index()]
    }

    pub(crate) fn mark_side_named(&mut self, side: Side) {
        self.named_sides[side.index()] = true;
    }

    /// Keys of every live entity, agents first, each variant in id order.
    pub(crate) fn live_keys(&self) -> Vec<EntityKey> {
        let mut agents: Vec<_> = self.agents.keys().copied().map(EntityKey::agent).collect();
        let mut projectiles: Vec<_> = self
            .projectiles
            .keys()
            .copied()
            .map(EntityKey::projectile)
            .collect();
        agents.sort_by_key(|key| key.id);
        projectiles.sort_by_key(|key| key.id);
        agents.append(&mut projectiles);
        agents
    }

    pub fn projectile_count(&self) -> usize {
        self.projectiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty() && self.projectiles.is_empty()
    }

    /// Drops every record, tombstone and name flag (match teardown).
    pub(crate) fn clear(&mut self) {
        self.agents.clear();
        self.projectiles.clear();
        self.retired.clear();
        self.named_sides = [false; 2];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Vec2;

    fn projectile(id: EntityId) -> Projectile {
        Projectile {
            id,
            owner_id: 0,
            position: Vec2::new(1.0, 1.0),
            orientation: 0.0,
        }
    }

    #[test]
    fn when_id_is_unknown_then_lookup_returns_none() {
        let registry = EntityRegistry::new();

        assert!(registry.agent(3).is_none());
        assert!(registry.projectile(3).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn when_same_id_is_used_by_both_variants_then_records_do_not_collide() {
        let mut registry = EntityRegistry::new();
        assert!(registry.insert_agent(Agent::new(5, Vec2::default(), 0.0, 100)));
        assert!(registry.insert_projectile(projectile(5)));

        assert!(registry.contains(EntityKey::agent(5)));
        assert!(registry.contains(EntityKey::projectile(5)));

        registry.retire(EntityKey::projectile(5));

        assert!(registry.agent(5).is_some());
        assert!(registry.projectile(5).is_none());
    }

    #[test]
    fn when_agent_id_is_live_then_insert_keeps_existing_record() {
        let mut registry = EntityRegistry::new();
        registry.insert_agent(Agent::new(0, Vec2::new(1.0, 2.0), 0.0, 100));

        let inserted = registry.insert_agent(Agent::new(0, Vec2::new(9.0, 9.0), 0.0, 50));

        assert!(!inserted);
        assert_eq!(registry.agent(0).map(|a| a.health), Some(100));
    }

    #[test]
    fn when_entity_is_retired_twice_then_second_retire_returns_none() {
        let mut registry = EntityRegistry::new();
        registry.insert_projectile(projectile(9));

        assert!(registry.retire(EntityKey::projectile(9)).is_some());
        assert!(registry.retire(EntityKey::projectile(9)).is_none());
        assert!(registry.is_retired(EntityKey::projectile(9)));
    }

    #[test]
    fn when_live_keys_are_listed_then_agents_come_first_in_id_order() {
        let mut registry = EntityRegistry::new();
        registry.insert_projectile(projectile(4));
        registry.insert_agent(Agent::new(1, Vec2::default(), 0.0, 100));
        registry.insert_projectile(projectile(2));
        registry.insert_agent(Agent::new(0, Vec2::default(), 0.0, 100));
        registry.insert_projectile(projectile(9));
        registry.retire(EntityKey::projectile(9));

        assert_eq!(
            registry.live_keys(),
            vec![
                EntityKey::agent(0),
                EntityKey::agent(1),
                EntityKey::projectile(2),
                EntityKey::projectile(4),
            ]
        );
    }

    #[test]
    fn when_cleared_then_tombstones_and_name_flags_reset() {
        let mut registry = EntityRegistry::new();
        registry.insert_agent(Agent::new(0, Vec2::default(), 0.0, 100));
        registry.retire(EntityKey::projectile(1));
        registry.mark_side_named(Side::First);

        registry.clear();

        assert!(registry.is_empty());
        assert!(!registry.is_retired(EntityKey::projectile(1)));
        assert!(!registry.side_named(Side::First));
    }
}
