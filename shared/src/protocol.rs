//! Client/server messages and their wire descriptors.
//!
//! Client frames carry a single [`ClientToServerMessage`]. Server frames
//! carry every [`ServerToClientMessage`] queued for the connection during a
//! tick, as one array with a 16-bit count.

use crate::models::{input_keys_schema, live_player_schema, LivePlayerModel, ENTITY_MODEL_SCHEMA};
use crate::schema::{self, CodecError, Scalar, Schema, Variant};
use crate::weapons::{PlayerWeapon, PLAYER_WEAPON_CODES};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputKeys {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub shoot: bool,
}

impl InputKeys {
    pub fn none() -> Self {
        Self::default()
    }
}

/// One input record as applied by the simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerInput {
    pub input_sequence_number: u32,
    pub keys: InputKeys,
    pub weapon: Option<PlayerWeapon>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientToServerMessage {
    Join {
        name: String,
    },
    Spectate,
    Ping {
        ping: u8,
    },
    #[serde(rename_all = "camelCase")]
    PlayerInput {
        input_sequence_number: u32,
        keys: InputKeys,
        weapon: Option<PlayerWeapon>,
    },
}

impl From<PlayerInput> for ClientToServerMessage {
    fn from(input: PlayerInput) -> Self {
        ClientToServerMessage::PlayerInput {
            input_sequence_number: input.input_sequence_number,
            keys: input.keys,
            weapon: input.weapon,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorReason {
    NameInUse,
    NameTooLong,
    ServerFull,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntryRanked {
    pub alive_time: u32,
    pub calculated_score: u32,
    pub damage_given: u32,
    pub damage_taken: u32,
    pub enemies_killed: u32,
    pub events_participated_in: u32,
    pub shots_fired: u32,
    pub user_id: u32,
    pub username: String,
    pub rank: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerToClientMessage {
    Pong {
        ping: u8,
    },
    Error {
        reason: ErrorReason,
    },
    #[serde(rename_all = "camelCase")]
    Joined {
        server_version: u8,
        player: LivePlayerModel,
    },
    Leaderboard {
        scores: Vec<LeaderboardEntryRanked>,
    },
    #[serde(rename_all = "camelCase")]
    Spectating {
        server_version: u8,
    },
    WorldState {
        entities: Vec<crate::models::EntityModel>,
    },
}

pub static CLIENT_TO_SERVER_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::union(
        "type",
        vec![
            Variant::new("join", 1, vec![("name", Scalar::String.into())]),
            Variant::new("spectate", 2, vec![]),
            Variant::new("ping", 3, vec![("ping", Scalar::Uint8.into())]),
            Variant::new(
                "playerInput",
                4,
                vec![
                    ("inputSequenceNumber", Scalar::Uint32.into()),
                    ("keys", input_keys_schema()),
                    ("weapon", Schema::optional_enumeration(PLAYER_WEAPON_CODES)),
                ],
            ),
        ],
    )
});

fn leaderboard_entry_schema() -> Schema {
    Schema::record(vec![
        ("aliveTime", Scalar::Uint32.into()),
        ("calculatedScore", Scalar::Uint32.into()),
        ("damageGiven", Scalar::Uint32.into()),
        ("damageTaken", Scalar::Uint32.into()),
        ("enemiesKilled", Scalar::Uint32.into()),
        ("eventsParticipatedIn", Scalar::Uint32.into()),
        ("shotsFired", Scalar::Uint32.into()),
        ("userId", Scalar::Uint32.into()),
        ("username", Scalar::String.into()),
        ("rank", Scalar::Uint16.into()),
    ])
}

/// Descriptor of one server frame: a batch of server messages.
pub static SERVER_TO_CLIENT_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::array_u16(Schema::union(
        "type",
        vec![
            Variant::new("pong", 1, vec![("ping", Scalar::Uint8.into())]),
            Variant::new(
                "error",
                2,
                vec![(
                    "reason",
                    Schema::enumeration(&[("nameInUse", 1), ("nameTooLong", 2), ("serverFull", 3)]),
                )],
            ),
            Variant::new(
                "joined",
                3,
                vec![
                    ("serverVersion", Scalar::Uint8.into()),
                    ("player", live_player_schema()),
                ],
            ),
            Variant::new(
                "leaderboard",
                4,
                vec![("scores", Schema::array_u16(leaderboard_entry_schema()))],
            ),
            Variant::new(
                "spectating",
                5,
                vec![("serverVersion", Scalar::Uint8.into())],
            ),
            Variant::new(
                "worldState",
                6,
                vec![("entities", Schema::array_u16(ENTITY_MODEL_SCHEMA.clone()))],
            ),
        ],
    ))
});

/// How frames are put on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireFormat {
    #[default]
    Binary,
    /// JSON text frames of the same messages, for debugging.
    Text,
}

/// A frame ready for the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Binary(Vec<u8>),
    Text(String),
}

pub fn encode_client_message(
    message: &ClientToServerMessage,
    format: WireFormat,
) -> Result<Frame, CodecError> {
    match format {
        WireFormat::Binary => Ok(Frame::Binary(schema::to_bytes(
            message,
            &CLIENT_TO_SERVER_SCHEMA,
        )?)),
        WireFormat::Text => Ok(Frame::Text(schema::to_text(message)?)),
    }
}

pub fn decode_client_message(frame: &Frame) -> Result<ClientToServerMessage, CodecError> {
    match frame {
        Frame::Binary(bytes) => schema::from_bytes(bytes, &CLIENT_TO_SERVER_SCHEMA),
        Frame::Text(text) => schema::from_text(text),
    }
}

pub fn encode_server_messages(
    messages: &[ServerToClientMessage],
    format: WireFormat,
) -> Result<Frame, CodecError> {
    match format {
        WireFormat::Binary => Ok(Frame::Binary(schema::to_bytes(
            &messages,
            &SERVER_TO_CLIENT_SCHEMA,
        )?)),
        WireFormat::Text => Ok(Frame::Text(schema::to_text(&messages)?)),
    }
}

pub fn decode_server_messages(frame: &Frame) -> Result<Vec<ServerToClientMessage>, CodecError> {
    match frame {
        Frame::Binary(bytes) => schema::from_bytes(bytes, &SERVER_TO_CLIENT_SCHEMA),
        Frame::Text(text) => schema::from_text(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AvailableWeapon, EntityModel, PlayerColor, SpectatorModel};

    fn client_roundtrip(message: ClientToServerMessage) {
        let frame = encode_client_message(&message, WireFormat::Binary).unwrap();
        assert_eq!(decode_client_message(&frame).unwrap(), message);
        let frame = encode_client_message(&message, WireFormat::Text).unwrap();
        assert_eq!(decode_client_message(&frame).unwrap(), message);
    }

    #[test]
    fn test_client_messages_roundtrip() {
        client_roundtrip(ClientToServerMessage::Join {
            name: "Ann".to_string(),
        });
        client_roundtrip(ClientToServerMessage::Spectate);
        client_roundtrip(ClientToServerMessage::Ping { ping: 200 });
        client_roundtrip(ClientToServerMessage::PlayerInput {
            input_sequence_number: 42,
            keys: InputKeys {
                left: true,
                shoot: true,
                ..InputKeys::none()
            },
            weapon: None,
        });
        client_roundtrip(ClientToServerMessage::PlayerInput {
            input_sequence_number: 43,
            keys: InputKeys::none(),
            weapon: Some(PlayerWeapon::Torpedo),
        });
    }

    #[test]
    fn test_player_input_frame_layout() {
        let message = ClientToServerMessage::PlayerInput {
            input_sequence_number: 1,
            keys: InputKeys {
                up: true,
                right: true,
                ..InputKeys::none()
            },
            weapon: None,
        };
        let frame = encode_client_message(&message, WireFormat::Binary).unwrap();
        // tag, u32 sequence, key bits, optional weapon
        assert_eq!(frame, Frame::Binary(vec![4, 1, 0, 0, 0, 0b01001, 0xFF]));
    }

    #[test]
    fn test_spectate_is_a_single_tag_byte() {
        let frame = encode_client_message(&ClientToServerMessage::Spectate, WireFormat::Binary)
            .unwrap();
        assert_eq!(frame, Frame::Binary(vec![2]));
    }

    #[test]
    fn test_server_batch_roundtrip() {
        let messages = vec![
            ServerToClientMessage::Pong { ping: 7 },
            ServerToClientMessage::Error {
                reason: ErrorReason::NameInUse,
            },
            ServerToClientMessage::Joined {
                server_version: 9,
                player: LivePlayerModel {
                    entity_id: 3,
                    x: 0.0,
                    y: 720.0,
                    health: 25,
                    player_color: PlayerColor::Green,
                    player_input_keys: InputKeys::none(),
                    momentum_x: 0.0,
                    momentum_y: 0.0,
                    dead: false,
                    last_processed_input_sequence_number: 0,
                    selected_weapon: PlayerWeapon::Laser1,
                    available_weapons: vec![AvailableWeapon {
                        weapon: PlayerWeapon::Laser1,
                        ammo: 0,
                    }],
                },
            },
            ServerToClientMessage::Leaderboard {
                scores: vec![LeaderboardEntryRanked {
                    alive_time: 1500,
                    calculated_score: 3,
                    damage_given: 1,
                    damage_taken: 0,
                    enemies_killed: 0,
                    events_participated_in: 0,
                    shots_fired: 4,
                    user_id: 3,
                    username: "Ann".to_string(),
                    rank: 1,
                }],
            },
            ServerToClientMessage::Spectating { server_version: 9 },
            ServerToClientMessage::WorldState {
                entities: vec![EntityModel::Spectator(SpectatorModel {
                    entity_id: 1,
                    x: 100.0,
                    y: 0.0,
                })],
            },
            ServerToClientMessage::WorldState { entities: vec![] },
        ];

        for format in [WireFormat::Binary, WireFormat::Text] {
            let frame = encode_server_messages(&messages, format).unwrap();
            assert_eq!(decode_server_messages(&frame).unwrap(), messages);
        }
    }

    #[test]
    fn test_empty_batch() {
        let frame = encode_server_messages(&[], WireFormat::Binary).unwrap();
        assert_eq!(frame, Frame::Binary(vec![0, 0]));
        assert!(decode_server_messages(&frame).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_message_tag() {
        let frame = Frame::Binary(vec![99]);
        assert!(matches!(
            decode_client_message(&frame),
            Err(CodecError::SchemaNotFound { tag: 99 })
        ));
    }
}
