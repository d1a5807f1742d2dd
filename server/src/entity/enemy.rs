use super::{
    random_drop, Collide, Collider, CollisionClass, Drop, EnemyShot, EntityCore, EntityKind,
    Explosion, Side, Simulate, TickContext, ToModel,
};
use rand::seq::SliceRandom;
use rand::Rng;
use shared::models::{
    EntityModel, MeteorColor, MeteorModel, MeteorSize, PlayerColor, SwoopingEnemyModel,
};

const METEOR_DROP_CHANCE: f64 = 0.3;
const ENEMY_DROP_CHANCE: f64 = 0.5;

const ENEMY_SIZE: f32 = 80.0;
const ENEMY_HEALTH: u8 = 10;
const ENEMY_CONTACT_DAMAGE: u8 = 3;
const ENEMY_DESCEND_SPEED: f32 = 8.0;
const ENEMY_SWAY: f32 = 15.0;
const ENEMY_SHOOT_EVERY_TICKS: u32 = 20;

/// Destroys an enemy, leaving an explosion and maybe a drop behind.
fn die(core: &mut EntityCore, drop_chance: f64, size: MeteorSize, ctx: &mut TickContext<'_>) {
    core.destroy();
    ctx.spawn(core.x, core.y, EntityKind::Explosion(Explosion::new(3, None)));
    if ctx.rng.gen_bool(drop_chance) {
        let kind = random_drop(size, &mut *ctx.rng);
        ctx.spawn(core.x, core.y, EntityKind::Drop(Drop::new(kind)));
    }
}

#[derive(Debug, Clone)]
pub struct Meteor {
    pub color: MeteorColor,
    pub size: MeteorSize,
    pub health: u8,
    pub rotate_speed: i8,
    momentum_x: f32,
    momentum_y: f32,
}

impl Meteor {
    pub fn new(color: MeteorColor, size: MeteorSize, rotate_speed: i8) -> Self {
        let (health, fall) = match size {
            MeteorSize::Big => (10, 5.0),
            MeteorSize::Med => (6, 7.0),
            MeteorSize::Small => (3, 9.0),
            MeteorSize::Tiny => (1, 11.0),
        };
        Self {
            color,
            size,
            health,
            rotate_speed,
            momentum_x: 0.0,
            momentum_y: fall,
        }
    }

    pub fn random<R: Rng>(rng: &mut R) -> Self {
        let color = if rng.gen_bool(0.5) {
            MeteorColor::Brown
        } else {
            MeteorColor::Grey
        };
        let size = [
            MeteorSize::Big,
            MeteorSize::Med,
            MeteorSize::Small,
            MeteorSize::Tiny,
        ]
        .choose(rng)
        .copied()
        .unwrap_or(MeteorSize::Med);
        let mut meteor = Self::new(color, size, rng.gen_range(-10..=10));
        meteor.momentum_x = rng.gen_range(-3.0..3.0);
        meteor
    }

    fn dimensions(&self) -> (f32, f32, u8) {
        match self.size {
            MeteorSize::Big => (101.0, 84.0, 5),
            MeteorSize::Med => (43.0, 43.0, 3),
            MeteorSize::Small => (28.0, 28.0, 2),
            MeteorSize::Tiny => (18.0, 18.0, 1),
        }
    }

    /// Applies damage; returns true when this hit destroyed the meteor.
    pub fn hurt(&mut self, core: &mut EntityCore, damage: u8, ctx: &mut TickContext<'_>) -> bool {
        if core.mark_to_destroy {
            return false;
        }
        self.health = self.health.saturating_sub(damage);
        if self.health > 0 {
            return false;
        }
        die(core, METEOR_DROP_CHANCE, self.size, ctx);
        true
    }
}

impl Simulate for Meteor {
    fn game_tick(&mut self, core: &mut EntityCore, ctx: &mut TickContext<'_>) {
        core.x += self.momentum_x;
        core.y += self.momentum_y;
        if core.y > ctx.config.screen_height * 1.2 {
            core.destroy();
        }
    }
}

impl Collide for Meteor {
    fn collider(&self) -> Option<Collider> {
        let (width, height, damage) = self.dimensions();
        Some(Collider {
            width,
            height,
            class: CollisionClass::Weapon {
                side: Side::Enemy,
                damage,
            },
        })
    }
}

impl ToModel for Meteor {
    fn to_model(&self, core: &EntityCore) -> EntityModel {
        EntityModel::Meteor(MeteorModel {
            entity_id: core.id,
            x: core.x,
            y: core.y,
            health: self.health,
            meteor_color: self.color,
            size: self.size,
            rotate_speed: self.rotate_speed,
        })
    }
}

/// Drops into a band near the top of the screen, sways side to side and
/// fires down at the players.
#[derive(Debug, Clone)]
pub struct SwoopingEnemy {
    pub color: PlayerColor,
    pub health: u8,
    target_y: f32,
    ticks: u32,
    shoot_timer: u32,
}

impl SwoopingEnemy {
    pub fn new<R: Rng>(color: PlayerColor, screen_height: f32, rng: &mut R) -> Self {
        Self {
            color,
            health: ENEMY_HEALTH,
            target_y: rng.gen_range(screen_height * 0.2..screen_height * 0.4),
            ticks: 0,
            shoot_timer: rng.gen_range(0..ENEMY_SHOOT_EVERY_TICKS),
        }
    }

    /// Applies damage; returns true when this hit destroyed the enemy.
    pub fn hurt(&mut self, core: &mut EntityCore, damage: u8, ctx: &mut TickContext<'_>) -> bool {
        if core.mark_to_destroy {
            return false;
        }
        self.health = self.health.saturating_sub(damage);
        if self.health > 0 {
            return false;
        }
        die(core, ENEMY_DROP_CHANCE, MeteorSize::Med, ctx);
        true
    }
}

impl Simulate for SwoopingEnemy {
    fn game_tick(&mut self, core: &mut EntityCore, ctx: &mut TickContext<'_>) {
        self.ticks += 1;
        if core.y < self.target_y {
            core.y = (core.y + ENEMY_DESCEND_SPEED).min(self.target_y);
            return;
        }
        core.x += (self.ticks as f32 * 0.2).sin() * ENEMY_SWAY;

        self.shoot_timer += 1;
        if self.shoot_timer >= ENEMY_SHOOT_EVERY_TICKS {
            self.shoot_timer = 0;
            ctx.spawn(
                core.x,
                core.y + ENEMY_SIZE / 2.0,
                EntityKind::EnemyShot(EnemyShot),
            );
        }
    }
}

impl Collide for SwoopingEnemy {
    fn collider(&self) -> Option<Collider> {
        Some(Collider {
            width: ENEMY_SIZE,
            height: ENEMY_SIZE,
            class: CollisionClass::Weapon {
                side: Side::Enemy,
                damage: ENEMY_CONTACT_DAMAGE,
            },
        })
    }
}

impl ToModel for SwoopingEnemy {
    fn to_model(&self, core: &EntityCore) -> EntityModel {
        EntityModel::SwoopingEnemy(SwoopingEnemyModel {
            entity_id: core.id,
            x: core.x,
            y: core.y,
            health: self.health,
            enemy_color: self.color,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Harness;
    use super::super::Entity;
    use super::*;
    use shared::Registry;

    fn core_at(y: f32) -> EntityCore {
        EntityCore {
            id: 1,
            x: 100.0,
            y,
            mark_to_destroy: false,
        }
    }

    #[test]
    fn test_meteor_falls_off_screen() {
        let mut harness = Harness::new();
        let mut ctx = harness.ctx();
        let mut meteor = Meteor::new(MeteorColor::Grey, MeteorSize::Big, 2);
        let mut core = core_at(1078.0);
        meteor.game_tick(&mut core, &mut ctx);
        assert_eq!(core.y, 1083.0);
        assert!(core.mark_to_destroy);
    }

    #[test]
    fn test_killing_blow_spawns_explosion() {
        let mut harness = Harness::new();
        let mut entities: Registry<Entity> = Registry::new();
        let mut meteor = Meteor::new(MeteorColor::Brown, MeteorSize::Small, 0);
        let mut core = core_at(200.0);
        {
            let mut ctx = harness.ctx();
            assert!(!meteor.hurt(&mut core, 2, &mut ctx));
            assert!(meteor.hurt(&mut core, 2, &mut ctx));
            // already dead, no second kill
            assert!(!meteor.hurt(&mut core, 2, &mut ctx));
            ctx.apply(&mut entities);
        }
        assert!(core.mark_to_destroy);
        let explosions = entities
            .iter()
            .filter(|e| matches!(e.kind, EntityKind::Explosion(_)))
            .count();
        assert_eq!(explosions, 1);
    }

    #[test]
    fn test_enemy_descends_then_shoots() {
        let mut harness = Harness::new();
        let mut entities: Registry<Entity> = Registry::new();
        let mut enemy = SwoopingEnemy::new(PlayerColor::Orange, 900.0, &mut harness.rng);
        assert!((180.0..360.0).contains(&enemy.target_y));
        let mut core = core_at(-50.0);
        {
            let mut ctx = harness.ctx();
            for _ in 0..100 {
                enemy.game_tick(&mut core, &mut ctx);
            }
            ctx.apply(&mut entities);
        }
        assert_eq!(core.y, enemy.target_y);
        assert!(entities
            .iter()
            .any(|e| matches!(e.kind, EntityKind::EnemyShot(_))));
    }
}
