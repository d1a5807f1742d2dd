//! Performance benchmarks for critical game systems

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use server::clusterer::groupings;
use server::config::GameConfig;
use server::game::ServerGame;
use server::spatial::IntervalTree;
use shared::models::{EntityModel, MeteorColor, MeteorModel, MeteorSize};
use shared::protocol::{decode_server_messages, encode_server_messages, WireFormat};
use shared::{ClientToServerMessage, InputKeys, ManualClock, ServerToClientMessage};
use std::sync::Arc;
use std::time::Instant;

/// Benchmarks building the interval tree and querying it once per viewer
#[test]
fn benchmark_interval_tree() {
    let mut rng = StdRng::seed_from_u64(1);
    let xs: Vec<f32> = (0..10_000).map(|_| rng.gen_range(0.0..1_000_000.0)).collect();

    let iterations = 100;
    let start = Instant::now();
    let mut found = 0;

    for _ in 0..iterations {
        let mut builder = IntervalTree::builder();
        for (index, x) in xs.iter().enumerate() {
            builder.insert_point(*x, index);
        }
        let tree = builder.build();
        for viewer in 0..200 {
            let center = viewer as f32 * 5_000.0;
            found += tree.search(center - 1_365.0, center + 1_365.0).len();
        }
    }

    let duration = start.elapsed();
    println!(
        "Interval tree: {} rebuilds of 10k entries + 200 queries in {:?} ({:.2} ms/iter, {} hits)",
        iterations,
        duration,
        duration.as_secs_f64() * 1000.0 / iterations as f64,
        found
    );

    // Well inside a 150ms tick even in debug builds
    assert!(duration.as_millis() / iterations < 150);
}

/// Benchmarks grouping players along x
#[test]
fn benchmark_clusterer() {
    let mut rng = StdRng::seed_from_u64(2);
    let players: Vec<(f32, u32)> = (0..1_000)
        .map(|id| (rng.gen_range(0.0..500_000.0), id))
        .collect();

    let iterations = 1_000;
    let start = Instant::now();
    for _ in 0..iterations {
        let _ = groupings(players.clone(), 1_950.0);
    }

    let duration = start.elapsed();
    println!(
        "Clusterer: {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 5_000);
}

/// Benchmarks encoding and decoding a large world snapshot
#[test]
fn benchmark_world_state_codec() {
    let entities: Vec<EntityModel> = (0..500)
        .map(|id| {
            EntityModel::Meteor(MeteorModel {
                entity_id: id,
                x: id as f32 * 3.5,
                y: 100.0,
                health: 5,
                meteor_color: MeteorColor::Grey,
                size: MeteorSize::Med,
                rotate_speed: 3,
            })
        })
        .collect();
    let messages = vec![ServerToClientMessage::WorldState { entities }];

    let iterations = 200;
    let start = Instant::now();
    let mut bytes = 0;
    for _ in 0..iterations {
        let frame = encode_server_messages(&messages, WireFormat::Binary).unwrap();
        let decoded = decode_server_messages(&frame).unwrap();
        assert_eq!(decoded.len(), 1);
        if let shared::protocol::Frame::Binary(data) = frame {
            bytes = data.len();
        }
    }

    let duration = start.elapsed();
    println!(
        "World state codec: {} round trips of {} bytes in {:?} ({:.2} ms/iter)",
        iterations,
        bytes,
        duration,
        duration.as_secs_f64() * 1000.0 / iterations as f64
    );

    // batch count, message tag, entity count, then 17 bytes per meteor
    assert_eq!(bytes, 2 + 1 + 2 + 500 * 17);
    assert!(duration.as_millis() < 10_000);
}

/// Benchmarks full server ticks with many users sending input
#[test]
fn benchmark_server_tick() {
    let mut game = ServerGame::new(
        Arc::new(GameConfig::default()),
        Arc::new(ManualClock::new()),
        3,
    );
    let users: Vec<u32> = (0..100)
        .map(|n| {
            let id = game.connect();
            game.enqueue(
                id,
                ClientToServerMessage::Join {
                    name: format!("p{}", n),
                },
            );
            id
        })
        .collect();
    game.tick();

    let iterations = 100u32;
    let start = Instant::now();
    for tick in 0..iterations {
        for id in &users {
            game.enqueue(
                *id,
                ClientToServerMessage::PlayerInput {
                    input_sequence_number: 1_000 + tick,
                    keys: InputKeys {
                        right: tick % 2 == 0,
                        shoot: true,
                        ..InputKeys::none()
                    },
                    weapon: None,
                },
            );
        }
        game.tick();
    }

    let duration = start.elapsed();
    println!(
        "Server tick: {} ticks with {} users in {:?} ({:.2} ms/tick, {} entities)",
        iterations,
        users.len(),
        duration,
        duration.as_secs_f64() * 1000.0 / iterations as f64,
        game.entities().len()
    );

    assert_eq!(game.last_stats().queued_messages, 0);
    assert!(duration.as_millis() / (iterations as u128) < 150);
}
