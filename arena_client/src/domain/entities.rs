// Domain-level entity records mirrored from the authoritative server.

use std::fmt;

pub type EntityId = u64;

/// Entity variant; ids are unique only within a variant's namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Agent,
    Projectile,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Agent => "agent",
            EntityKind::Projectile => "projectile",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fully qualified entity address (variant + id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityKey {
    pub kind: EntityKind,
    pub id: EntityId,
}

impl EntityKey {
    pub fn agent(id: EntityId) -> Self {
        Self {
            kind: EntityKind::Agent,
            id,
        }
    }

    pub fn projectile(id: EntityId) -> Self {
        Self {
            kind: EntityKind::Projectile,
            id,
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Arena-space coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// One of the two competing sides. Even agent ids belong to `First`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    First,
    Second,
}

impl Side {
    pub fn of_agent(id: EntityId) -> Self {
        if id % 2 == 0 { Side::First } else { Side::Second }
    }

    pub fn index(self) -> usize {
        match self {
            Side::First => 0,
            Side::Second => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    pub id: EntityId,
    pub name: Option<String>,
    pub position: Vec2,
    // Degrees, exactly as the server sent them.
    pub orientation: f64,
    pub health: u32,
    pub shield_active: bool,
}

impl Agent {
    pub fn new(id: EntityId, position: Vec2, orientation: f64, health: u32) -> Self {
        Self {
            id,
            name: None,
            position,
            orientation,
            health,
            shield_active: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    pub id: EntityId,
    pub owner_id: EntityId,
    pub position: Vec2,
    pub orientation: f64,
}

/// Any live entity, tagged by variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Agent(Agent),
    Projectile(Projectile),
}

/// Identity and spatial contract shared by every entity variant.
pub trait Spatial {
    fn key(&self) -> EntityKey;
    fn position(&self) -> Vec2;
    fn orientation(&self) -> f64;
}

impl Spatial for Agent {
    fn key(&self) -> EntityKey {
        EntityKey::agent(self.id)
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn orientation(&self) -> f64 {
        self.orientation
    }
}

impl Spatial for Projectile {
    fn key(&self) -> EntityKey {
        EntityKey::projectile(self.id)
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn orientation(&self) -> f64 {
        self.orientation
    }
}

impl Spatial for Entity {
    fn key(&self) -> EntityKey {
        match self {
            Entity::Agent(agent) => agent.key(),
            Entity::Projectile(projectile) => projectile.key(),
        }
    }

    fn position(&self) -> Vec2 {
        match self {
            Entity::Agent(agent) => agent.position,
            Entity::Projectile(projectile) => projectile.position,
        }
    }

    fn orientation(&self) -> f64 {
        match self {
            Entity::Agent(agent) => agent.orientation,
            Entity::Projectile(projectile) => projectile.orientation,
        }
    }
}
