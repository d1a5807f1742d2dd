use super::{Collide, EntityCore, Simulate, TickContext, ToModel};
use shared::models::{EntityModel, ExplosionModel};

const LIFETIME_TICKS: u32 = 5;

/// Purely visual. With an owner the position is an offset from it.
#[derive(Debug, Clone)]
pub struct Explosion {
    pub intensity: u8,
    pub owner_id: Option<u32>,
    age: u32,
}

impl Explosion {
    pub fn new(intensity: u8, owner_id: Option<u32>) -> Self {
        Self {
            intensity,
            owner_id,
            age: 0,
        }
    }
}

impl Simulate for Explosion {
    fn game_tick(&mut self, core: &mut EntityCore, _ctx: &mut TickContext<'_>) {
        self.age += 1;
        if self.age >= LIFETIME_TICKS {
            core.destroy();
        }
    }
}

impl Collide for Explosion {}

impl ToModel for Explosion {
    fn to_model(&self, core: &EntityCore) -> EntityModel {
        EntityModel::Explosion(ExplosionModel {
            entity_id: core.id,
            x: core.x,
            y: core.y,
            intensity: self.intensity,
            owner_entity_id: self.owner_id,
        })
    }
}
