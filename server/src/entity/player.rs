use super::{
    Collide, Collider, CollisionClass, EntityCore, EntityKind, Explosion, PlayerWeaponShot, Side,
    Simulate, TickContext, ToModel,
};
use crate::leaderboard::Stat;
use rand::Rng;
use shared::models::{
    AvailableWeapon, DropKind, EntityModel, LivePlayerModel, PlayerColor, PlayerModel, ShieldLevel,
};
use shared::physics::PlayerMotion;
use shared::protocol::{InputKeys, PlayerInput};
use shared::weapons::AmmoType;
use shared::{PlayerWeapon, PLAYER_STARTING_HEALTH};

pub const PLAYER_WIDTH: f32 = 99.0;
pub const PLAYER_HEIGHT: f32 = 75.0;
/// Contact damage a player deals when it rams an enemy.
const RAM_DAMAGE: u8 = 2;
const SHOT_SIDE_OFFSET: f32 = 42.0;
const HIT_KNOCKBACK: f32 = 10.0;

#[derive(Debug, Clone)]
pub struct Player {
    pub color: PlayerColor,
    pub health: u8,
    pub dead: bool,
    pub last_processed_input_sequence_number: u32,
    pub selected_weapon: PlayerWeapon,
    pub available_weapons: Vec<AvailableWeapon>,
    pub shield_id: Option<u32>,
    pub last_keys: InputKeys,
    shoot_timer: u32,
    shoot_left: bool,
    motion: PlayerMotion,
}

impl Player {
    pub fn new(color: PlayerColor) -> Self {
        Self {
            color,
            health: PLAYER_STARTING_HEALTH,
            dead: false,
            last_processed_input_sequence_number: 0,
            selected_weapon: PlayerWeapon::Laser1,
            available_weapons: vec![
                AvailableWeapon {
                    weapon: PlayerWeapon::Laser1,
                    ammo: 0,
                },
                AvailableWeapon {
                    weapon: PlayerWeapon::Rocket,
                    ammo: 5,
                },
                AvailableWeapon {
                    weapon: PlayerWeapon::Torpedo,
                    ammo: 3,
                },
            ],
            shield_id: None,
            last_keys: InputKeys::none(),
            shoot_timer: 1,
            shoot_left: true,
            motion: PlayerMotion::default(),
        }
    }

    pub fn momentum(&self) -> (f32, f32) {
        (self.motion.momentum_x, self.motion.momentum_y)
    }

    /// Applies one input record: weapon selection, firing and momentum.
    pub fn apply_input(&mut self, core: &mut EntityCore, input: &PlayerInput, ctx: &mut TickContext<'_>) {
        if self.dead {
            return;
        }
        self.last_processed_input_sequence_number = self
            .last_processed_input_sequence_number
            .max(input.input_sequence_number);
        self.last_keys = input.keys;
        if let Some(weapon) = input.weapon {
            self.selected_weapon = weapon;
        }
        if input.keys.shoot {
            self.try_fire(core, ctx);
        }
        self.motion.x = core.x;
        self.motion.y = core.y;
        self.motion.apply_keys(&input.keys);
    }

    /// The input applied on a tick where the client sent nothing.
    pub fn idle_input(&self) -> PlayerInput {
        PlayerInput {
            input_sequence_number: self.last_processed_input_sequence_number + 1,
            keys: InputKeys::none(),
            weapon: Some(self.selected_weapon),
        }
    }

    fn try_fire(&mut self, core: &EntityCore, ctx: &mut TickContext<'_>) {
        if self.shoot_timer > 0 {
            return;
        }
        let selected = self.selected_weapon;
        let Some(slot) = self
            .available_weapons
            .iter()
            .position(|w| w.weapon == selected)
        else {
            return;
        };
        let config = selected.config();
        let can_fire = match config.ammo_type {
            AmmoType::Infinite => true,
            AmmoType::Time | AmmoType::PerShot => self.available_weapons[slot].ammo > 0,
        };
        if !can_fire {
            return;
        }

        ctx.leaderboard.increase(core.id, Stat::ShotsFired, 1);
        let offset_x = match (config.alternate_side, self.shoot_left) {
            (false, _) => 0.0,
            (true, true) => -SHOT_SIDE_OFFSET,
            (true, false) => SHOT_SIDE_OFFSET,
        };
        ctx.spawn(
            core.x + offset_x,
            core.y - 6.0,
            EntityKind::PlayerWeapon(PlayerWeaponShot::new(core.id, selected, core.y - 6.0)),
        );
        if config.alternate_side {
            self.shoot_left = !self.shoot_left;
        }
        self.shoot_timer = config.reset_shoot_timer;

        if config.ammo_type == AmmoType::PerShot {
            let slot_ammo = &mut self.available_weapons[slot].ammo;
            *slot_ammo = slot_ammo.saturating_sub(1);
            if *slot_ammo == 0 {
                self.remove_weapon_and_rotate(slot);
            }
        }
    }

    /// Drops an exhausted weapon and moves the selection to the next one.
    fn remove_weapon_and_rotate(&mut self, slot: usize) {
        let next = (slot + 1) % self.available_weapons.len();
        self.selected_weapon = self.available_weapons[next].weapon;
        self.available_weapons.remove(slot);
        if self.available_weapons.is_empty() {
            self.available_weapons.push(AvailableWeapon {
                weapon: PlayerWeapon::Laser1,
                ammo: 0,
            });
            self.selected_weapon = PlayerWeapon::Laser1;
        }
    }

    /// Applies a pickup. Returns the shield upgrade to apply, if any, since
    /// the shield is a separate entity.
    pub fn add_drop(&mut self, drop: &DropKind) -> Option<(u32, ShieldLevel)> {
        match *drop {
            DropKind::Health { amount } => {
                self.health = self
                    .health
                    .saturating_add(amount)
                    .min(PLAYER_STARTING_HEALTH);
                None
            }
            DropKind::Weapon { weapon, ammo } => {
                let existing = self.available_weapons.iter().position(|w| w.weapon == weapon);
                let slot = match (existing, weapon) {
                    (Some(slot), _) => slot,
                    (None, PlayerWeapon::Laser1) => return None,
                    (None, PlayerWeapon::Laser2) => {
                        self.available_weapons
                            .retain(|w| w.weapon != PlayerWeapon::Laser1);
                        if self.selected_weapon == PlayerWeapon::Laser1 {
                            self.selected_weapon = PlayerWeapon::Laser2;
                        }
                        self.available_weapons
                            .insert(0, AvailableWeapon { weapon, ammo: 0 });
                        0
                    }
                    (None, PlayerWeapon::Rocket | PlayerWeapon::Torpedo) => {
                        self.available_weapons.push(AvailableWeapon { weapon, ammo: 0 });
                        self.available_weapons.len() - 1
                    }
                };
                let entry = &mut self.available_weapons[slot];
                entry.ammo = entry.ammo.saturating_add(ammo).min(weapon.config().max_ammo);
                None
            }
            DropKind::Shield { level } => self.shield_id.map(|id| (id, level)),
        }
    }

    /// Takes damage that got through the shield. `full_damage` is what hit
    /// the shield first and counts towards the damage-taken stat.
    pub fn take_damage(
        &mut self,
        core: &EntityCore,
        full_damage: u8,
        remaining: u8,
        ctx: &mut TickContext<'_>,
    ) {
        ctx.leaderboard
            .increase(core.id, Stat::DamageTaken, full_damage as u32);
        if remaining == 0 {
            return;
        }
        self.health = self.health.saturating_sub(remaining);
        self.motion.push(0.0, HIT_KNOCKBACK);
        let offset_x = ctx.rng.gen_range(-PLAYER_WIDTH / 3.0..PLAYER_WIDTH / 3.0);
        let offset_y = ctx.rng.gen_range(-PLAYER_HEIGHT / 3.0..PLAYER_HEIGHT / 3.0);
        ctx.spawn(
            offset_x,
            offset_y,
            EntityKind::Explosion(Explosion::new(1, Some(core.id))),
        );
    }

    fn die(&mut self, core: &mut EntityCore, ctx: &mut TickContext<'_>) {
        self.health = 0;
        self.dead = true;
        core.destroy();
        if let Some(shield_id) = self.shield_id {
            ctx.destroy(shield_id);
        }
        ctx.spawn(core.x, core.y, EntityKind::Explosion(Explosion::new(4, None)));
        ctx.leaderboard.remove_player(core.id);
    }

    pub fn push_out(&mut self, core: &mut EntityCore, dx: f32, dy: f32) {
        core.x += dx;
        core.y += dy;
        if dx != 0.0 {
            self.motion.momentum_x = 0.0;
        }
        if dy != 0.0 {
            self.motion.momentum_y = 0.0;
        }
    }

    pub fn to_live_model(&self, core: &EntityCore) -> LivePlayerModel {
        LivePlayerModel {
            entity_id: core.id,
            x: core.x,
            y: core.y,
            health: self.health,
            player_color: self.color,
            player_input_keys: self.last_keys,
            momentum_x: self.motion.momentum_x,
            momentum_y: self.motion.momentum_y,
            dead: self.dead,
            last_processed_input_sequence_number: self.last_processed_input_sequence_number,
            selected_weapon: self.selected_weapon,
            available_weapons: self.available_weapons.clone(),
        }
    }
}

impl Simulate for Player {
    fn game_tick(&mut self, core: &mut EntityCore, ctx: &mut TickContext<'_>) {
        if self.dead {
            return;
        }
        self.shoot_timer = self.shoot_timer.saturating_sub(1);
        self.motion.x = core.x;
        self.motion.y = core.y;
        self.motion.step(ctx.config.screen_height);
        core.x = self.motion.x;
        core.y = self.motion.y;

        if self.health == 0 {
            self.die(core, ctx);
        }
    }

    fn post_tick(&mut self, core: &mut EntityCore, ctx: &mut TickContext<'_>) {
        let tick_ms = ctx.config.tick_ms();
        ctx.leaderboard.increase(core.id, Stat::AliveTime, tick_ms);

        let expired = self.available_weapons.iter().position(|w| {
            w.weapon.config().ammo_type == AmmoType::Time && w.ammo as u32 <= tick_ms
        });
        for slot in self.available_weapons.iter_mut() {
            if slot.weapon.config().ammo_type == AmmoType::Time {
                slot.ammo = (slot.ammo as u32).saturating_sub(tick_ms) as u16;
            }
        }
        if let Some(slot) = expired {
            if self.available_weapons[slot].weapon == PlayerWeapon::Laser2 {
                self.available_weapons.remove(slot);
                self.available_weapons.insert(
                    0,
                    AvailableWeapon {
                        weapon: PlayerWeapon::Laser1,
                        ammo: 0,
                    },
                );
                if self.selected_weapon == PlayerWeapon::Laser2 {
                    self.selected_weapon = PlayerWeapon::Laser1;
                }
            } else {
                self.remove_weapon_and_rotate(slot);
            }
        }
    }
}

impl Collide for Player {
    fn collider(&self) -> Option<Collider> {
        if self.dead {
            return None;
        }
        Some(Collider {
            width: PLAYER_WIDTH,
            height: PLAYER_HEIGHT,
            class: CollisionClass::Weapon {
                side: Side::Player,
                damage: RAM_DAMAGE,
            },
        })
    }
}

impl ToModel for Player {
    fn to_model(&self, core: &EntityCore) -> EntityModel {
        EntityModel::Player(PlayerModel {
            entity_id: core.id,
            x: core.x,
            y: core.y,
            health: self.health,
            player_color: self.color,
            player_input_keys: self.last_keys,
        })
    }
}
