//! Player weapon table.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlayerWeapon {
    Laser1,
    Laser2,
    Rocket,
    Torpedo,
}

/// Wire codes for [`PlayerWeapon`].
pub const PLAYER_WEAPON_CODES: &[(&str, u8)] =
    &[("laser1", 1), ("laser2", 2), ("rocket", 3), ("torpedo", 4)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmmoType {
    Infinite,
    /// Ammo is milliseconds of fire time, drained every tick.
    Time,
    PerShot,
}

#[derive(Debug, Clone, Copy)]
pub struct WeaponConfig {
    pub ammo_type: AmmoType,
    pub max_ammo: u16,
    /// Ticks between two shots.
    pub reset_shoot_timer: u32,
    /// Shots alternate between the left and right wing.
    pub alternate_side: bool,
    pub damage: u8,
    /// Vertical distance travelled per tick (negative is up).
    pub speed: f32,
}

const LASER1: WeaponConfig = WeaponConfig {
    ammo_type: AmmoType::Infinite,
    max_ammo: 0,
    reset_shoot_timer: 1,
    alternate_side: true,
    damage: 1,
    speed: -60.0,
};

const LASER2: WeaponConfig = WeaponConfig {
    ammo_type: AmmoType::Time,
    max_ammo: 20_000,
    reset_shoot_timer: 1,
    alternate_side: false,
    damage: 2,
    speed: -70.0,
};

const ROCKET: WeaponConfig = WeaponConfig {
    ammo_type: AmmoType::PerShot,
    max_ammo: 10,
    reset_shoot_timer: 3,
    alternate_side: true,
    damage: 5,
    speed: -40.0,
};

const TORPEDO: WeaponConfig = WeaponConfig {
    ammo_type: AmmoType::PerShot,
    max_ammo: 10,
    reset_shoot_timer: 5,
    alternate_side: false,
    damage: 8,
    speed: -30.0,
};

impl PlayerWeapon {
    pub fn config(self) -> &'static WeaponConfig {
        match self {
            PlayerWeapon::Laser1 => &LASER1,
            PlayerWeapon::Laser2 => &LASER2,
            PlayerWeapon::Rocket => &ROCKET,
            PlayerWeapon::Torpedo => &TORPEDO,
        }
    }
}
