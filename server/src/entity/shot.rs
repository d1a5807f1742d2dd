use super::{
    Collide, Collider, CollisionClass, EntityCore, Side, Simulate, TickContext, ToModel,
};
use shared::models::{EnemyShotModel, EntityModel, PlayerWeaponModel};
use shared::PlayerWeapon;

const ENEMY_SHOT_SPEED: f32 = 30.0;
const ENEMY_SHOT_DAMAGE: u8 = 2;

/// Fired straight down by swooping enemies.
#[derive(Debug, Clone, Default)]
pub struct EnemyShot;

impl Simulate for EnemyShot {
    fn game_tick(&mut self, core: &mut EntityCore, ctx: &mut TickContext<'_>) {
        core.y += ENEMY_SHOT_SPEED;
        if core.y > ctx.config.screen_height * 1.2 {
            core.destroy();
        }
    }
}

impl Collide for EnemyShot {
    fn collider(&self) -> Option<Collider> {
        Some(Collider {
            width: 9.0,
            height: 30.0,
            class: CollisionClass::Weapon {
                side: Side::Enemy,
                damage: ENEMY_SHOT_DAMAGE,
            },
        })
    }
}

impl ToModel for EnemyShot {
    fn to_model(&self, core: &EntityCore) -> EntityModel {
        EntityModel::EnemyShot(EnemyShotModel {
            entity_id: core.id,
            x: core.x,
            y: core.y,
        })
    }
}

/// A projectile fired by a player. Damage and speed come from the weapon.
#[derive(Debug, Clone)]
pub struct PlayerWeaponShot {
    pub owner_id: u32,
    pub weapon: PlayerWeapon,
    start_y: f32,
}

impl PlayerWeaponShot {
    pub fn new(owner_id: u32, weapon: PlayerWeapon, start_y: f32) -> Self {
        Self {
            owner_id,
            weapon,
            start_y,
        }
    }
}

impl Simulate for PlayerWeaponShot {
    fn game_tick(&mut self, core: &mut EntityCore, ctx: &mut TickContext<'_>) {
        core.y += self.weapon.config().speed;
        if self.start_y - core.y > ctx.config.screen_height * 1.2 {
            core.destroy();
        }
    }
}

impl Collide for PlayerWeaponShot {
    fn collider(&self) -> Option<Collider> {
        let (width, height) = match self.weapon {
            PlayerWeapon::Laser1 | PlayerWeapon::Laser2 => (9.0, 54.0),
            PlayerWeapon::Rocket => (20.0, 50.0),
            PlayerWeapon::Torpedo => (25.0, 60.0),
        };
        Some(Collider {
            width,
            height,
            class: CollisionClass::Weapon {
                side: Side::Player,
                damage: self.weapon.config().damage,
            },
        })
    }
}

impl ToModel for PlayerWeaponShot {
    fn to_model(&self, core: &EntityCore) -> EntityModel {
        EntityModel::PlayerWeapon(PlayerWeaponModel {
            entity_id: core.id,
            x: core.x,
            y: core.y,
            owner_entity_id: self.owner_id,
            weapon_type: self.weapon,
        })
    }
}
