//! Simulated game objects.
//!
//! An [`Entity`] is a shared core (id, position, destroy mark) plus one
//! variant-specific state struct. Each variant implements the capability
//! traits it needs: [`Simulate`] for per-tick behaviour, [`Collide`] for the
//! collision pass and [`ToModel`] for snapshots.
//!
//! Entities never hold references to each other. Links such as a shield's
//! owner are stored as ids and resolved through the registry when needed.
//! New entities and cross-entity destroys requested during a pass are
//! buffered in the [`TickContext`] and applied once the pass finishes.

mod drop;
mod enemy;
mod explosion;
mod player;
mod shield;
mod shot;

pub use drop::{random_drop, Drop};
pub use enemy::{Meteor, SwoopingEnemy};
pub use explosion::Explosion;
pub use player::Player;
pub use shield::PlayerShield;
pub use shot::{EnemyShot, PlayerWeaponShot};

use crate::config::GameConfig;
use crate::leaderboard::Leaderboard;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use shared::models::{EntityModel, PlayerColor, SpectatorModel, WallModel};
use shared::{IdGenerator, Keyed, Registry};

/// Ship color for a new player or enemy.
pub fn random_color<R: Rng>(rng: &mut R) -> PlayerColor {
    [
        PlayerColor::Blue,
        PlayerColor::Green,
        PlayerColor::Orange,
        PlayerColor::Red,
    ]
    .choose(rng)
    .copied()
    .unwrap_or(PlayerColor::Blue)
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityCore {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub mark_to_destroy: bool,
}

impl EntityCore {
    pub fn destroy(&mut self) {
        self.mark_to_destroy = true;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Player,
    Enemy,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CollisionClass {
    /// Blocks players.
    Solid,
    /// Picked up by players.
    Pickup,
    /// Hurts entities of the other side and is hurt by them.
    Weapon { side: Side, damage: u8 },
}

/// Axis-aligned hit box centred on the entity's position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collider {
    pub width: f32,
    pub height: f32,
    pub class: CollisionClass,
}

pub trait Simulate {
    fn game_tick(&mut self, core: &mut EntityCore, ctx: &mut TickContext<'_>);

    /// Runs after destroyed entities have been removed.
    fn post_tick(&mut self, _core: &mut EntityCore, _ctx: &mut TickContext<'_>) {}
}

pub trait Collide {
    fn collider(&self) -> Option<Collider> {
        None
    }
}

pub trait ToModel {
    fn to_model(&self, core: &EntityCore) -> EntityModel;
}

pub trait Behavior: Simulate + Collide + ToModel {}

impl<T: Simulate + Collide + ToModel> Behavior for T {}

/// The shared roaming camera spectators look through.
#[derive(Debug, Clone, Default)]
pub struct Spectator;

impl Simulate for Spectator {
    fn game_tick(&mut self, _core: &mut EntityCore, _ctx: &mut TickContext<'_>) {}
}

impl Collide for Spectator {}

impl ToModel for Spectator {
    fn to_model(&self, core: &EntityCore) -> EntityModel {
        EntityModel::Spectator(SpectatorModel {
            entity_id: core.id,
            x: core.x,
            y: core.y,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Wall {
    pub width: u16,
    pub height: u16,
}

impl Simulate for Wall {
    fn game_tick(&mut self, _core: &mut EntityCore, _ctx: &mut TickContext<'_>) {}
}

impl Collide for Wall {
    fn collider(&self) -> Option<Collider> {
        Some(Collider {
            width: self.width as f32,
            height: self.height as f32,
            class: CollisionClass::Solid,
        })
    }
}

impl ToModel for Wall {
    fn to_model(&self, core: &EntityCore) -> EntityModel {
        EntityModel::Wall(WallModel {
            entity_id: core.id,
            x: core.x,
            y: core.y,
            width: self.width,
            height: self.height,
        })
    }
}

#[derive(Debug, Clone)]
pub enum EntityKind {
    Spectator(Spectator),
    Meteor(Meteor),
    Player(Player),
    Drop(Drop),
    Wall(Wall),
    SwoopingEnemy(SwoopingEnemy),
    PlayerShield(PlayerShield),
    Explosion(Explosion),
    EnemyShot(EnemyShot),
    PlayerWeapon(PlayerWeaponShot),
}

impl EntityKind {
    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Spectator(_) => "spectator",
            EntityKind::Meteor(_) => "meteor",
            EntityKind::Player(_) => "player",
            EntityKind::Drop(_) => "drop",
            EntityKind::Wall(_) => "wall",
            EntityKind::SwoopingEnemy(_) => "swoopingEnemy",
            EntityKind::PlayerShield(_) => "playerShield",
            EntityKind::Explosion(_) => "explosion",
            EntityKind::EnemyShot(_) => "enemyShot",
            EntityKind::PlayerWeapon(_) => "playerWeapon",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub core: EntityCore,
    pub kind: EntityKind,
}

impl Keyed for Entity {
    fn key(&self) -> u32 {
        self.core.id
    }
}

impl Entity {
    pub fn new(id: u32, x: f32, y: f32, kind: EntityKind) -> Self {
        Self {
            core: EntityCore {
                id,
                x,
                y,
                mark_to_destroy: false,
            },
            kind,
        }
    }

    pub fn id(&self) -> u32 {
        self.core.id
    }

    fn behavior(&self) -> &dyn Behavior {
        match &self.kind {
            EntityKind::Spectator(b) => b,
            EntityKind::Meteor(b) => b,
            EntityKind::Player(b) => b,
            EntityKind::Drop(b) => b,
            EntityKind::Wall(b) => b,
            EntityKind::SwoopingEnemy(b) => b,
            EntityKind::PlayerShield(b) => b,
            EntityKind::Explosion(b) => b,
            EntityKind::EnemyShot(b) => b,
            EntityKind::PlayerWeapon(b) => b,
        }
    }

    fn parts_mut(&mut self) -> (&mut EntityCore, &mut dyn Behavior) {
        let behavior: &mut dyn Behavior = match &mut self.kind {
            EntityKind::Spectator(b) => b,
            EntityKind::Meteor(b) => b,
            EntityKind::Player(b) => b,
            EntityKind::Drop(b) => b,
            EntityKind::Wall(b) => b,
            EntityKind::SwoopingEnemy(b) => b,
            EntityKind::PlayerShield(b) => b,
            EntityKind::Explosion(b) => b,
            EntityKind::EnemyShot(b) => b,
            EntityKind::PlayerWeapon(b) => b,
        };
        (&mut self.core, behavior)
    }

    pub fn game_tick(&mut self, ctx: &mut TickContext<'_>) {
        let (core, behavior) = self.parts_mut();
        behavior.game_tick(core, ctx);
    }

    pub fn post_tick(&mut self, ctx: &mut TickContext<'_>) {
        let (core, behavior) = self.parts_mut();
        behavior.post_tick(core, ctx);
    }

    pub fn collider(&self) -> Option<Collider> {
        self.behavior().collider()
    }

    pub fn to_model(&self) -> EntityModel {
        self.behavior().to_model(&self.core)
    }

    /// Entity this one is attached to; its position is then an offset.
    pub fn owner_id(&self) -> Option<u32> {
        match &self.kind {
            EntityKind::PlayerShield(shield) => Some(shield.owner_id),
            EntityKind::Explosion(explosion) => explosion.owner_id,
            _ => None,
        }
    }

    /// World position, resolving attachment through the registry. A missing
    /// owner leaves the stored position as is.
    pub fn real_position(&self, entities: &Registry<Entity>) -> (f32, f32) {
        match self.owner_id().and_then(|owner| entities.lookup(owner)) {
            Some(owner) => (owner.core.x + self.core.x, owner.core.y + self.core.y),
            None => (self.core.x, self.core.y),
        }
    }

    pub fn as_player(&self) -> Option<&Player> {
        match &self.kind {
            EntityKind::Player(player) => Some(player),
            _ => None,
        }
    }

    pub fn as_player_mut(&mut self) -> Option<(&mut EntityCore, &mut Player)> {
        match &mut self.kind {
            EntityKind::Player(player) => Some((&mut self.core, player)),
            _ => None,
        }
    }

    pub fn is_player(&self) -> bool {
        matches!(self.kind, EntityKind::Player(_))
    }
}

/// What entity code may touch beyond its own state during a pass.
pub struct TickContext<'a> {
    pub config: &'a GameConfig,
    pub rng: &'a mut StdRng,
    pub leaderboard: &'a mut Leaderboard,
    ids: &'a mut IdGenerator,
    spawned: Vec<Entity>,
    destroyed: Vec<u32>,
}

impl<'a> TickContext<'a> {
    pub fn new(
        config: &'a GameConfig,
        rng: &'a mut StdRng,
        leaderboard: &'a mut Leaderboard,
        ids: &'a mut IdGenerator,
    ) -> Self {
        Self {
            config,
            rng,
            leaderboard,
            ids,
            spawned: Vec::new(),
            destroyed: Vec::new(),
        }
    }

    /// Queues a new entity; it joins the registry after the current pass.
    pub fn spawn(&mut self, x: f32, y: f32, kind: EntityKind) -> u32 {
        let id = self.ids.next_id();
        self.spawned.push(Entity::new(id, x, y, kind));
        id
    }

    /// Marks another entity for destruction after the current pass.
    pub fn destroy(&mut self, id: u32) {
        self.destroyed.push(id);
    }

    /// Applies buffered spawns and destroys to the registry.
    pub fn apply(self, entities: &mut Registry<Entity>) {
        for id in self.destroyed {
            if let Some(entity) = entities.lookup_mut(id) {
                entity.core.destroy();
            }
        }
        for entity in self.spawned {
            entities.push(entity);
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::Harness;
    use super::*;
    use shared::models::PlayerColor;

    #[test]
    fn test_attached_entity_follows_owner() {
        let mut entities = Registry::new();
        entities.push(Entity::new(
            1,
            500.0,
            300.0,
            EntityKind::Player(Player::new(PlayerColor::Red)),
        ));
        entities.push(Entity::new(
            2,
            10.0,
            -5.0,
            EntityKind::Explosion(Explosion::new(1, Some(1))),
        ));
        entities.push(Entity::new(
            3,
            10.0,
            -5.0,
            EntityKind::Explosion(Explosion::new(1, Some(99))),
        ));

        let attached = entities.lookup(2).unwrap();
        assert_eq!(attached.real_position(&entities), (510.0, 295.0));
        let orphan = entities.lookup(3).unwrap();
        assert_eq!(orphan.real_position(&entities), (10.0, -5.0));
    }

    #[test]
    fn test_context_defers_spawns_and_destroys() {
        let mut harness = Harness::new();
        let mut entities = Registry::new();
        entities.push(Entity::new(50, 0.0, 0.0, EntityKind::Spectator(Spectator)));

        let mut ctx = harness.ctx();
        let id = ctx.spawn(1.0, 2.0, EntityKind::Explosion(Explosion::new(1, None)));
        ctx.destroy(50);
        assert_eq!(entities.len(), 1);
        ctx.apply(&mut entities);

        assert!(entities.contains(id));
        assert!(entities.lookup(50).unwrap().core.mark_to_destroy);
    }

    #[test]
    fn test_wall_model() {
        let wall = Entity::new(
            4,
            1.0,
            2.0,
            EntityKind::Wall(Wall {
                width: 100,
                height: 20,
            }),
        );
        assert!(matches!(
            wall.collider().map(|c| c.class),
            Some(CollisionClass::Solid)
        ));
        assert!(matches!(wall.to_model(), EntityModel::Wall(WallModel { width: 100, .. })));
    }
}
