use super::{Collide, EntityCore, Simulate, TickContext, ToModel};
use shared::models::{EntityModel, PlayerShieldModel, ShieldLevel, ShieldStrength};

/// Ticks between one point of recharge.
const RECHARGE_EVERY_TICKS: u32 = 10;

fn max_health(strength: ShieldStrength) -> u8 {
    match strength {
        ShieldStrength::Small => 10,
        ShieldStrength::Medium => 15,
        ShieldStrength::Big => 20,
    }
}

/// Absorbs damage for its owner. Sits on the owner at offset (0, 0) and
/// takes no part in collisions of its own.
#[derive(Debug, Clone)]
pub struct PlayerShield {
    pub owner_id: u32,
    pub strength: ShieldStrength,
    pub health: u8,
    pub depleted: bool,
    recharge_ticks: u32,
}

impl PlayerShield {
    pub fn new(owner_id: u32) -> Self {
        Self {
            owner_id,
            strength: ShieldStrength::Small,
            health: max_health(ShieldStrength::Small),
            depleted: false,
            recharge_ticks: 0,
        }
    }

    pub fn max_health(&self) -> u8 {
        max_health(self.strength)
    }

    /// Soaks up as much of `damage` as it can and returns what is left for
    /// the owner.
    pub fn absorb(&mut self, damage: u8) -> u8 {
        if self.depleted {
            return damage;
        }
        let absorbed = damage.min(self.health);
        self.health -= absorbed;
        if self.health == 0 {
            self.depleted = true;
        }
        self.recharge_ticks = 0;
        damage - absorbed
    }

    /// A medium drop on a big shield only refills it.
    pub fn upgrade(&mut self, level: ShieldLevel) {
        self.strength = match (self.strength, level) {
            (ShieldStrength::Big, _) | (_, ShieldLevel::Big) => ShieldStrength::Big,
            (_, ShieldLevel::Medium) => ShieldStrength::Medium,
        };
        self.health = self.max_health();
        self.depleted = false;
        self.recharge_ticks = 0;
    }
}

impl Simulate for PlayerShield {
    fn game_tick(&mut self, _core: &mut EntityCore, _ctx: &mut TickContext<'_>) {
        if self.health >= self.max_health() {
            self.depleted = false;
            return;
        }
        self.recharge_ticks += 1;
        if self.recharge_ticks >= RECHARGE_EVERY_TICKS {
            self.recharge_ticks = 0;
            self.health += 1;
            if self.health >= self.max_health() {
                self.depleted = false;
            }
        }
    }
}

impl Collide for PlayerShield {}

impl ToModel for PlayerShield {
    fn to_model(&self, core: &EntityCore) -> EntityModel {
        EntityModel::PlayerShield(PlayerShieldModel {
            entity_id: core.id,
            x: core.x,
            y: core.y,
            owner_entity_id: self.owner_id,
            shield_strength: self.strength,
            health: self.health,
            depleted: self.depleted,
        })
    }
}
