use super::{Collide, Collider, CollisionClass, EntityCore, Simulate, TickContext, ToModel};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use shared::models::{DropKind, DropModel, EntityModel, MeteorSize, ShieldLevel};
use shared::PlayerWeapon;

const FALL_SPEED: f32 = 10.0;
const DROP_SIZE: f32 = 50.0;

/// A pickup falling down the screen.
#[derive(Debug, Clone)]
pub struct Drop {
    pub kind: DropKind,
}

impl Drop {
    pub fn new(kind: DropKind) -> Self {
        Self { kind }
    }
}

impl Simulate for Drop {
    fn game_tick(&mut self, core: &mut EntityCore, ctx: &mut TickContext<'_>) {
        core.y += FALL_SPEED;
        if core.y > ctx.config.screen_height * 1.2 {
            core.destroy();
        }
    }
}

impl Collide for Drop {
    fn collider(&self) -> Option<Collider> {
        Some(Collider {
            width: DROP_SIZE,
            height: DROP_SIZE,
            class: CollisionClass::Pickup,
        })
    }
}

impl ToModel for Drop {
    fn to_model(&self, core: &EntityCore) -> EntityModel {
        EntityModel::Drop(DropModel {
            entity_id: core.id,
            x: core.x,
            y: core.y,
            drop: self.kind,
        })
    }
}

fn pick<T: Copy, R: Rng>(rng: &mut R, weighted: &[(T, u32)]) -> T {
    match WeightedIndex::new(weighted.iter().map(|(_, weight)| *weight)) {
        Ok(index) => weighted[index.sample(rng)].0,
        Err(_) => weighted[0].0,
    }
}

#[derive(Debug, Clone, Copy)]
enum DropCategory {
    Weapon,
    Shield,
    Health,
}

/// Rolls the contents of a drop. Bigger sources give bigger amounts.
pub fn random_drop<R: Rng>(size: MeteorSize, rng: &mut R) -> DropKind {
    let category = pick(
        rng,
        &[
            (DropCategory::Weapon, 40),
            (DropCategory::Shield, 10),
            (DropCategory::Health, 50),
        ],
    );
    let (base, spread) = match size {
        MeteorSize::Big => (5.0, 5.0),
        MeteorSize::Med => (4.0, 4.0),
        MeteorSize::Small => (3.0, 3.0),
        MeteorSize::Tiny => (1.0, 2.0),
    };
    let amount = (base + rng.gen::<f32>() * spread).ceil() as u16;

    match category {
        DropCategory::Weapon => {
            let weapon = pick(
                rng,
                &[
                    (PlayerWeapon::Laser2, 20),
                    (PlayerWeapon::Rocket, 40),
                    (PlayerWeapon::Torpedo, 30),
                ],
            );
            let ammo = match weapon {
                PlayerWeapon::Laser2 => amount * 1000,
                _ => amount,
            };
            DropKind::Weapon { weapon, ammo }
        }
        DropCategory::Health => DropKind::Health {
            amount: amount as u8,
        },
        DropCategory::Shield => DropKind::Shield {
            level: if amount > 7 {
                ShieldLevel::Big
            } else {
                ShieldLevel::Medium
            },
        },
    }
}
