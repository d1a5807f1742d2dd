//! Wire models of every entity kind and the descriptors that frame them.
//!
//! A world snapshot is a list of [`EntityModel`]s, a union keyed by
//! `entityType`. Every model starts with the common `entityId`, `x`, `y`
//! fields.

use crate::protocol::InputKeys;
use crate::schema::{Scalar, Schema, Variant};
use crate::weapons::{PlayerWeapon, PLAYER_WEAPON_CODES};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlayerColor {
    Blue,
    Green,
    Orange,
    Red,
}

pub const PLAYER_COLOR_CODES: &[(&str, u8)] =
    &[("blue", 1), ("green", 2), ("orange", 3), ("red", 4)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MeteorColor {
    Brown,
    Grey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MeteorSize {
    Big,
    Med,
    Small,
    Tiny,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShieldStrength {
    Small,
    Medium,
    Big,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShieldLevel {
    Medium,
    Big,
}

/// What a drop gives the player who picks it up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DropKind {
    Health { amount: u8 },
    Shield { level: ShieldLevel },
    Weapon { weapon: PlayerWeapon, ammo: u16 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AvailableWeapon {
    pub weapon: PlayerWeapon,
    pub ammo: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpectatorModel {
    pub entity_id: u32,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeteorModel {
    pub entity_id: u32,
    pub x: f32,
    pub y: f32,
    pub health: u8,
    pub meteor_color: MeteorColor,
    pub size: MeteorSize,
    pub rotate_speed: i8,
}

/// How other players see a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerModel {
    pub entity_id: u32,
    pub x: f32,
    pub y: f32,
    pub health: u8,
    pub player_color: PlayerColor,
    pub player_input_keys: InputKeys,
}

/// How a player sees its own entity: everything prediction needs to
/// rebuild local state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LivePlayerModel {
    pub entity_id: u32,
    pub x: f32,
    pub y: f32,
    pub health: u8,
    pub player_color: PlayerColor,
    pub player_input_keys: InputKeys,
    pub momentum_x: f32,
    pub momentum_y: f32,
    pub dead: bool,
    pub last_processed_input_sequence_number: u32,
    pub selected_weapon: PlayerWeapon,
    pub available_weapons: Vec<AvailableWeapon>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropModel {
    pub entity_id: u32,
    pub x: f32,
    pub y: f32,
    pub drop: DropKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WallModel {
    pub entity_id: u32,
    pub x: f32,
    pub y: f32,
    pub width: u16,
    pub height: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwoopingEnemyModel {
    pub entity_id: u32,
    pub x: f32,
    pub y: f32,
    pub health: u8,
    pub enemy_color: PlayerColor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerShieldModel {
    pub entity_id: u32,
    pub x: f32,
    pub y: f32,
    pub owner_entity_id: u32,
    pub shield_strength: ShieldStrength,
    pub health: u8,
    pub depleted: bool,
}

/// `x`/`y` are offsets from the owner when one is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplosionModel {
    pub entity_id: u32,
    pub x: f32,
    pub y: f32,
    pub intensity: u8,
    pub owner_entity_id: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnemyShotModel {
    pub entity_id: u32,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerWeaponModel {
    pub entity_id: u32,
    pub x: f32,
    pub y: f32,
    pub owner_entity_id: u32,
    pub weapon_type: PlayerWeapon,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entityType", rename_all = "camelCase")]
pub enum EntityModel {
    Spectator(SpectatorModel),
    Meteor(MeteorModel),
    LivePlayer(LivePlayerModel),
    Player(PlayerModel),
    Drop(DropModel),
    Wall(WallModel),
    SwoopingEnemy(SwoopingEnemyModel),
    PlayerShield(PlayerShieldModel),
    Explosion(ExplosionModel),
    EnemyShot(EnemyShotModel),
    PlayerWeapon(PlayerWeaponModel),
}

impl EntityModel {
    pub fn entity_id(&self) -> u32 {
        match self {
            EntityModel::Spectator(m) => m.entity_id,
            EntityModel::Meteor(m) => m.entity_id,
            EntityModel::LivePlayer(m) => m.entity_id,
            EntityModel::Player(m) => m.entity_id,
            EntityModel::Drop(m) => m.entity_id,
            EntityModel::Wall(m) => m.entity_id,
            EntityModel::SwoopingEnemy(m) => m.entity_id,
            EntityModel::PlayerShield(m) => m.entity_id,
            EntityModel::Explosion(m) => m.entity_id,
            EntityModel::EnemyShot(m) => m.entity_id,
            EntityModel::PlayerWeapon(m) => m.entity_id,
        }
    }

    pub fn position(&self) -> (f32, f32) {
        match self {
            EntityModel::Spectator(m) => (m.x, m.y),
            EntityModel::Meteor(m) => (m.x, m.y),
            EntityModel::LivePlayer(m) => (m.x, m.y),
            EntityModel::Player(m) => (m.x, m.y),
            EntityModel::Drop(m) => (m.x, m.y),
            EntityModel::Wall(m) => (m.x, m.y),
            EntityModel::SwoopingEnemy(m) => (m.x, m.y),
            EntityModel::PlayerShield(m) => (m.x, m.y),
            EntityModel::Explosion(m) => (m.x, m.y),
            EntityModel::EnemyShot(m) => (m.x, m.y),
            EntityModel::PlayerWeapon(m) => (m.x, m.y),
        }
    }

    pub fn set_position(&mut self, x: f32, y: f32) {
        let (mx, my) = match self {
            EntityModel::Spectator(m) => (&mut m.x, &mut m.y),
            EntityModel::Meteor(m) => (&mut m.x, &mut m.y),
            EntityModel::LivePlayer(m) => (&mut m.x, &mut m.y),
            EntityModel::Player(m) => (&mut m.x, &mut m.y),
            EntityModel::Drop(m) => (&mut m.x, &mut m.y),
            EntityModel::Wall(m) => (&mut m.x, &mut m.y),
            EntityModel::SwoopingEnemy(m) => (&mut m.x, &mut m.y),
            EntityModel::PlayerShield(m) => (&mut m.x, &mut m.y),
            EntityModel::Explosion(m) => (&mut m.x, &mut m.y),
            EntityModel::EnemyShot(m) => (&mut m.x, &mut m.y),
            EntityModel::PlayerWeapon(m) => (&mut m.x, &mut m.y),
        };
        *mx = x;
        *my = y;
    }

    /// Entities whose position is an offset from another entity.
    pub fn owner_entity_id(&self) -> Option<u32> {
        match self {
            EntityModel::PlayerShield(m) => Some(m.owner_entity_id),
            EntityModel::Explosion(m) => m.owner_entity_id,
            _ => None,
        }
    }
}

fn entity_fields() -> Vec<(&'static str, Schema)> {
    vec![
        ("entityId", Scalar::Uint32.into()),
        ("x", Scalar::Float32.into()),
        ("y", Scalar::Float32.into()),
    ]
}

fn with_entity_fields(extra: Vec<(&'static str, Schema)>) -> Vec<(&'static str, Schema)> {
    let mut fields = entity_fields();
    fields.extend(extra);
    fields
}

pub fn input_keys_schema() -> Schema {
    Schema::bitmask(&["up", "down", "left", "right", "shoot"])
}

pub fn player_weapon_schema() -> Schema {
    Schema::enumeration(PLAYER_WEAPON_CODES)
}

fn player_fields() -> Vec<(&'static str, Schema)> {
    vec![
        ("health", Scalar::Uint8.into()),
        ("playerColor", Schema::enumeration(PLAYER_COLOR_CODES)),
        ("playerInputKeys", input_keys_schema()),
    ]
}

fn live_player_fields() -> Vec<(&'static str, Schema)> {
    let mut fields = player_fields();
    fields.extend(vec![
        ("momentumX", Scalar::Float32.into()),
        ("momentumY", Scalar::Float32.into()),
        ("dead", Scalar::Boolean.into()),
        ("lastProcessedInputSequenceNumber", Scalar::Uint32.into()),
        ("selectedWeapon", player_weapon_schema()),
        (
            "availableWeapons",
            Schema::array_u8(Schema::record(vec![
                ("weapon", player_weapon_schema()),
                ("ammo", Scalar::Uint16.into()),
            ])),
        ),
    ]);
    fields
}

/// Record layout of a [`LivePlayerModel`] outside the entity union.
pub fn live_player_schema() -> Schema {
    Schema::extend(&entity_fields(), live_player_fields())
}

fn drop_kind_schema() -> Schema {
    Schema::union(
        "type",
        vec![
            Variant::new("health", 1, vec![("amount", Scalar::Uint8.into())]),
            Variant::new(
                "shield",
                2,
                vec![(
                    "level",
                    Schema::enumeration(&[("medium", 1), ("big", 2)]),
                )],
            ),
            Variant::new(
                "weapon",
                3,
                vec![
                    ("weapon", player_weapon_schema()),
                    ("ammo", Scalar::Uint16.into()),
                ],
            ),
        ],
    )
}

/// Descriptor of the `entityType` union carried in world snapshots.
pub static ENTITY_MODEL_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::union(
        "entityType",
        vec![
            Variant::new("spectator", 1, entity_fields()),
            Variant::new(
                "meteor",
                2,
                with_entity_fields(vec![
                    ("health", Scalar::Uint8.into()),
                    (
                        "meteorColor",
                        Schema::enumeration(&[("brown", 1), ("grey", 2)]),
                    ),
                    (
                        "size",
                        Schema::enumeration(&[("big", 1), ("med", 2), ("small", 3), ("tiny", 4)]),
                    ),
                    ("rotateSpeed", Scalar::Int8.into()),
                ]),
            ),
            Variant::new("livePlayer", 3, with_entity_fields(live_player_fields())),
            Variant::new("player", 4, with_entity_fields(player_fields())),
            Variant::new(
                "drop",
                5,
                with_entity_fields(vec![("drop", drop_kind_schema())]),
            ),
            Variant::new(
                "wall",
                6,
                with_entity_fields(vec![
                    ("width", Scalar::Uint16.into()),
                    ("height", Scalar::Uint16.into()),
                ]),
            ),
            Variant::new(
                "swoopingEnemy",
                7,
                with_entity_fields(vec![
                    ("health", Scalar::Uint8.into()),
                    ("enemyColor", Schema::enumeration(PLAYER_COLOR_CODES)),
                ]),
            ),
            Variant::new(
                "playerShield",
                8,
                with_entity_fields(vec![
                    ("ownerEntityId", Scalar::Uint32.into()),
                    (
                        "shieldStrength",
                        Schema::enumeration(&[("small", 1), ("medium", 2), ("big", 3)]),
                    ),
                    ("health", Scalar::Uint8.into()),
                    ("depleted", Scalar::Boolean.into()),
                ]),
            ),
            Variant::new(
                "explosion",
                9,
                with_entity_fields(vec![
                    ("intensity", Scalar::Uint8.into()),
                    ("ownerEntityId", Scalar::Uint32Optional.into()),
                ]),
            ),
            Variant::new("enemyShot", 10, entity_fields()),
            Variant::new(
                "playerWeapon",
                11,
                with_entity_fields(vec![
                    ("ownerEntityId", Scalar::Uint32.into()),
                    ("weaponType", player_weapon_schema()),
                ]),
            ),
        ],
    )
});

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{from_bytes, to_bytes};

    fn roundtrip(model: EntityModel) {
        let bytes = to_bytes(&model, &ENTITY_MODEL_SCHEMA).unwrap();
        let back: EntityModel = from_bytes(&bytes, &ENTITY_MODEL_SCHEMA).unwrap();
        assert_eq!(back, model);
    }

    fn live_player() -> LivePlayerModel {
        LivePlayerModel {
            entity_id: 12,
            x: 400.0,
            y: 720.0,
            health: 25,
            player_color: PlayerColor::Orange,
            player_input_keys: InputKeys {
                up: true,
                shoot: true,
                ..InputKeys::default()
            },
            momentum_x: -30.0,
            momentum_y: 0.0,
            dead: false,
            last_processed_input_sequence_number: 77,
            selected_weapon: PlayerWeapon::Rocket,
            available_weapons: vec![
                AvailableWeapon {
                    weapon: PlayerWeapon::Laser1,
                    ammo: 0,
                },
                AvailableWeapon {
                    weapon: PlayerWeapon::Rocket,
                    ammo: 5,
                },
            ],
        }
    }

    #[test]
    fn test_each_entity_variant_roundtrips() {
        roundtrip(EntityModel::Spectator(SpectatorModel {
            entity_id: 1,
            x: 10.0,
            y: 0.0,
        }));
        roundtrip(EntityModel::Meteor(MeteorModel {
            entity_id: 2,
            x: -55.5,
            y: 12.25,
            health: 9,
            meteor_color: MeteorColor::Grey,
            size: MeteorSize::Tiny,
            rotate_speed: -3,
        }));
        roundtrip(EntityModel::LivePlayer(live_player()));
        roundtrip(EntityModel::Player(PlayerModel {
            entity_id: 4,
            x: 1.0,
            y: 2.0,
            health: 3,
            player_color: PlayerColor::Blue,
            player_input_keys: InputKeys::default(),
        }));
        roundtrip(EntityModel::Drop(DropModel {
            entity_id: 5,
            x: 0.0,
            y: 0.0,
            drop: DropKind::Weapon {
                weapon: PlayerWeapon::Laser2,
                ammo: 5000,
            },
        }));
        roundtrip(EntityModel::Wall(WallModel {
            entity_id: 6,
            x: 0.0,
            y: 0.0,
            width: 300,
            height: 20,
        }));
        roundtrip(EntityModel::SwoopingEnemy(SwoopingEnemyModel {
            entity_id: 7,
            x: 0.0,
            y: 0.0,
            health: 10,
            enemy_color: PlayerColor::Red,
        }));
        roundtrip(EntityModel::PlayerShield(PlayerShieldModel {
            entity_id: 8,
            x: 0.0,
            y: 0.0,
            owner_entity_id: 4,
            shield_strength: ShieldStrength::Medium,
            health: 6,
            depleted: true,
        }));
        roundtrip(EntityModel::Explosion(ExplosionModel {
            entity_id: 9,
            x: 5.0,
            y: -5.0,
            intensity: 2,
            owner_entity_id: None,
        }));
        roundtrip(EntityModel::Explosion(ExplosionModel {
            entity_id: 10,
            x: 5.0,
            y: -5.0,
            intensity: 1,
            owner_entity_id: Some(4),
        }));
        roundtrip(EntityModel::EnemyShot(EnemyShotModel {
            entity_id: 11,
            x: 3.0,
            y: 4.0,
        }));
        roundtrip(EntityModel::PlayerWeapon(PlayerWeaponModel {
            entity_id: 12,
            x: 3.0,
            y: 4.0,
            owner_entity_id: 4,
            weapon_type: PlayerWeapon::Torpedo,
        }));
    }

    #[test]
    fn test_explosion_owner_beyond_signed_range() {
        roundtrip(EntityModel::Explosion(ExplosionModel {
            entity_id: 13,
            x: 0.0,
            y: 0.0,
            intensity: 3,
            owner_entity_id: Some(3_000_000_000),
        }));
    }

    #[test]
    fn test_live_player_without_weapons() {
        let mut model = live_player();
        model.available_weapons.clear();
        roundtrip(EntityModel::LivePlayer(model));
    }

    #[test]
    fn test_drop_kinds_roundtrip() {
        for drop in [
            DropKind::Health { amount: 4 },
            DropKind::Shield {
                level: ShieldLevel::Big,
            },
        ] {
            roundtrip(EntityModel::Drop(DropModel {
                entity_id: 3,
                x: 0.0,
                y: 0.0,
                drop,
            }));
        }
    }

    #[test]
    fn test_spectator_frame_is_compact() {
        let model = EntityModel::Spectator(SpectatorModel {
            entity_id: 1,
            x: 0.0,
            y: 0.0,
        });
        let bytes = to_bytes(&model, &ENTITY_MODEL_SCHEMA).unwrap();
        assert_eq!(bytes.len(), 1 + 4 + 4 + 4);
        assert_eq!(bytes[0], 1);
    }
}
