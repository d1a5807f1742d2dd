//! The authoritative game: connection table, entity registry and the tick.
//!
//! `ServerGame` is transport-agnostic. The network layer feeds it decoded
//! messages and transport events, calls [`ServerGame::tick`] on schedule and
//! ships the frames it returns. Everything inside a tick runs on one thread
//! with no interleaving, so entity removal and disconnects are deferred to
//! the end of the tick instead of happening mid-iteration.

use crate::clusterer::{enemy_x_in_grouping, groupings, new_player_x};
use crate::collision::run_collisions;
use crate::config::GameConfig;
use crate::connection::{Connection, ConnectionState, DisconnectReason, Timeouts};
use crate::entity::{
    random_color, Entity, EntityCore, EntityKind, Meteor, Player, PlayerShield, Spectator,
    SwoopingEnemy, TickContext,
};
use crate::leaderboard::Leaderboard;
use crate::spatial::IntervalTree;
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::protocol::{
    decode_client_message, encode_server_messages, ErrorReason, Frame, LeaderboardEntryRanked,
    PlayerInput, WireFormat,
};
use shared::{
    ClientToServerMessage, Clock, EntityModel, IdGenerator, Registry, ServerToClientMessage,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;

/// Rows every viewer gets on the leaderboard.
const LEADERBOARD_TOP: usize = 10;

/// What one tick produced for the transport.
#[derive(Debug, Default)]
pub struct TickOutput {
    /// One frame per connection that had messages queued.
    pub frames: Vec<(u32, Frame)>,
    /// Connections removed by the sweep. Their transports should be closed.
    pub disconnected: Vec<(u32, DisconnectReason)>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickStats {
    pub tick: u64,
    pub processed_messages: usize,
    pub queued_messages: usize,
    pub connections: usize,
    pub users: usize,
    pub spectators: usize,
    pub entities: usize,
}

pub struct ServerGame {
    config: Arc<GameConfig>,
    clock: Arc<dyn Clock>,
    rng: StdRng,
    ids: IdGenerator,
    connection_ids: IdGenerator,
    connections: Registry<Connection>,
    entities: Registry<Entity>,
    leaderboard: Leaderboard,
    inbound: VecDeque<(u32, ClientToServerMessage)>,
    tick_index: u64,
    camera_id: u32,
    last_stats: TickStats,
}

impl ServerGame {
    pub fn new(config: Arc<GameConfig>, clock: Arc<dyn Clock>, seed: u64) -> Self {
        let mut ids = IdGenerator::new();
        let mut entities = Registry::new();
        let camera_id = ids.next_id();
        entities.push(Entity::new(
            camera_id,
            0.0,
            0.0,
            EntityKind::Spectator(Spectator),
        ));

        Self {
            config,
            clock,
            rng: StdRng::seed_from_u64(seed),
            ids,
            connection_ids: IdGenerator::new(),
            connections: Registry::new(),
            entities,
            leaderboard: Leaderboard::new(),
            inbound: VecDeque::new(),
            tick_index: 0,
            camera_id,
            last_stats: TickStats::default(),
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn tick_index(&self) -> u64 {
        self.tick_index
    }

    pub fn connection(&self, id: u32) -> Option<&Connection> {
        self.connections.lookup(id)
    }

    pub fn connections(&self) -> &Registry<Connection> {
        &self.connections
    }

    pub fn entities(&self) -> &Registry<Entity> {
        &self.entities
    }

    pub fn leaderboard(&self) -> &Leaderboard {
        &self.leaderboard
    }

    pub fn last_stats(&self) -> TickStats {
        self.last_stats
    }

    /// Messages waiting for the next drain, oldest first.
    pub fn queued(&self) -> impl Iterator<Item = &(u32, ClientToServerMessage)> {
        self.inbound.iter()
    }

    /// Registers a new transport connection and returns its id.
    pub fn connect(&mut self) -> u32 {
        let id = self.connection_ids.next_id();
        let now = self.clock.now();
        self.connections.push(Connection::new(
            id,
            now,
            self.config.default_wire_format,
        ));
        info!("Connection {} opened", id);
        id
    }

    /// Queues a decoded message. It is applied by the next tick's drain.
    pub fn enqueue(&mut self, connection_id: u32, message: ClientToServerMessage) {
        if self.connections.contains(connection_id) {
            self.inbound.push_back((connection_id, message));
        }
    }

    /// Decodes a raw frame and queues it. A frame that does not decode marks
    /// the connection as corrupted; it is dropped at the end of the tick.
    pub fn receive_frame(&mut self, connection_id: u32, frame: &Frame) {
        let Some(connection) = self.connections.lookup_mut(connection_id) else {
            return;
        };
        connection.wire_format = match frame {
            Frame::Binary(_) => WireFormat::Binary,
            Frame::Text(_) => WireFormat::Text,
        };
        match decode_client_message(frame) {
            Ok(message) => self.enqueue(connection_id, message),
            Err(e) => {
                warn!("Protocol error from connection {}: {}", connection_id, e);
                self.on_protocol_error(connection_id);
            }
        }
    }

    pub fn on_transport_closed(&mut self, connection_id: u32) {
        if let Some(connection) = self.connections.lookup_mut(connection_id) {
            connection.pending_close.get_or_insert(DisconnectReason::Closed);
        }
    }

    pub fn on_protocol_error(&mut self, connection_id: u32) {
        if let Some(connection) = self.connections.lookup_mut(connection_id) {
            connection.pending_close = Some(DisconnectReason::ProtocolError);
        }
    }

    /// Runs one full tick.
    pub fn tick(&mut self) -> TickOutput {
        let now = self.clock.now();
        self.tick_index += 1;

        let mut had_input = HashSet::new();
        let processed = self.drain_inbound(now, &mut had_input);
        self.apply_idle_inputs(&had_input);
        self.balance_spawns();

        {
            let mut ctx = TickContext::new(
                &self.config,
                &mut self.rng,
                &mut self.leaderboard,
                &mut self.ids,
            );
            for entity in self.entities.iter_mut() {
                entity.game_tick(&mut ctx);
            }
            ctx.apply(&mut self.entities);
        }
        {
            let mut ctx = TickContext::new(
                &self.config,
                &mut self.rng,
                &mut self.leaderboard,
                &mut self.ids,
            );
            run_collisions(&mut self.entities, &mut ctx);
            ctx.apply(&mut self.entities);
        }

        if self.every(self.config.leaderboard_every_ticks) {
            self.send_leaderboard();
        }
        if self.every(self.config.spectator_camera_every_ticks) {
            self.move_camera();
        }
        self.send_world_state();
        let frames = self.flush();

        self.finalize_entities();
        let disconnected = self.sweep_connections();

        self.last_stats = self.stats(processed);
        debug!(
            "#{} con: {}, usr: {}, spc: {}, ents: {}, msg: {} (+{} processed), {}",
            self.last_stats.tick,
            self.last_stats.connections,
            self.last_stats.users,
            self.last_stats.spectators,
            self.last_stats.entities,
            self.last_stats.queued_messages,
            self.last_stats.processed_messages,
            self.entity_counts()
        );

        TickOutput {
            frames,
            disconnected,
        }
    }

    fn every(&self, ticks: u64) -> bool {
        ticks > 0 && self.tick_index % ticks == 0
    }

    /// Applies queued messages until the queue is empty or the drain budget
    /// is spent. Whatever is left stays queued, in order, for the next tick.
    fn drain_inbound(&mut self, now: Instant, had_input: &mut HashSet<u32>) -> usize {
        let deadline = now + self.config.input_drain_budget;
        let mut processed = 0;
        while !self.inbound.is_empty() {
            if self.clock.now() > deadline {
                warn!(
                    "Input drain budget spent after {} messages, {} left for next tick",
                    processed,
                    self.inbound.len()
                );
                break;
            }
            let Some((connection_id, message)) = self.inbound.pop_front() else {
                break;
            };
            self.handle_message(connection_id, message, now, had_input);
            processed += 1;
        }
        processed
    }

    fn handle_message(
        &mut self,
        connection_id: u32,
        message: ClientToServerMessage,
        now: Instant,
        had_input: &mut HashSet<u32>,
    ) {
        let Some(connection) = self.connections.lookup(connection_id) else {
            return;
        };
        if connection.pending_close.is_some() {
            return;
        }
        match message {
            ClientToServerMessage::Join { name } => self.join(connection_id, name, now),
            ClientToServerMessage::Spectate => self.spectate(connection_id, now),
            ClientToServerMessage::Ping { ping } => {
                if let Some(connection) = self.connections.lookup_mut(connection_id) {
                    connection.last_ping = now;
                    connection.send(ServerToClientMessage::Pong { ping });
                }
            }
            ClientToServerMessage::PlayerInput {
                input_sequence_number,
                keys,
                weapon,
            } => {
                let Some(connection) = self.connections.lookup_mut(connection_id) else {
                    return;
                };
                let Some(entity_id) = connection.user_entity_id() else {
                    return;
                };
                connection.last_action = now;
                had_input.insert(connection_id);
                self.apply_input(
                    entity_id,
                    PlayerInput {
                        input_sequence_number,
                        keys,
                        weapon,
                    },
                );
            }
        }
    }

    fn apply_input(&mut self, entity_id: u32, input: PlayerInput) {
        let mut ctx = TickContext::new(
            &self.config,
            &mut self.rng,
            &mut self.leaderboard,
            &mut self.ids,
        );
        if let Some((core, player)) = self
            .entities
            .lookup_mut(entity_id)
            .and_then(Entity::as_player_mut)
        {
            player.apply_input(core, &input, &mut ctx);
        }
        ctx.apply(&mut self.entities);
    }

    /// Users that sent nothing this tick get an empty input so their
    /// acknowledged sequence keeps moving.
    fn apply_idle_inputs(&mut self, had_input: &HashSet<u32>) {
        let idle: Vec<(u32, PlayerInput)> = self
            .connections
            .iter()
            .filter(|connection| !had_input.contains(&connection.id))
            .filter_map(|connection| connection.user_entity_id())
            .filter_map(|entity_id| {
                let player = self.entities.lookup(entity_id)?.as_player()?;
                (!player.dead).then(|| (entity_id, player.idle_input()))
            })
            .collect();
        for (entity_id, input) in idle {
            self.apply_input(entity_id, input);
        }
    }

    fn join(&mut self, connection_id: u32, name: String, now: Instant) {
        let reply = |game: &mut Self, message: ServerToClientMessage| {
            if let Some(connection) = game.connections.lookup_mut(connection_id) {
                connection.send(message);
            }
        };

        if name.chars().count() > self.config.max_name_length {
            reply(self, ServerToClientMessage::Error {
                reason: ErrorReason::NameTooLong,
            });
            return;
        }
        let name_taken = self
            .connections
            .iter()
            .any(|c| c.id != connection_id && c.user_name() == Some(name.as_str()));
        if name_taken {
            reply(self, ServerToClientMessage::Error {
                reason: ErrorReason::NameInUse,
            });
            return;
        }
        let already_user = self
            .connections
            .lookup(connection_id)
            .is_some_and(Connection::is_user);
        let users = self.connections.iter().filter(|c| c.is_user()).count();
        if !already_user && users >= self.config.max_users {
            reply(self, ServerToClientMessage::Error {
                reason: ErrorReason::ServerFull,
            });
            return;
        }

        self.release_player(connection_id);

        let occupied = self.player_groupings();
        let x = new_player_x(&occupied, self.config.cluster_gap);
        let y = self.config.player_start_y;
        let player_id = self.ids.next_id();
        let shield_id = self.ids.next_id();
        let mut player = Player::new(random_color(&mut self.rng));
        player.shield_id = Some(shield_id);
        let live_model = player.to_live_model(&EntityCore {
            id: player_id,
            x,
            y,
            mark_to_destroy: false,
        });
        self.entities
            .push(Entity::new(player_id, x, y, EntityKind::Player(player)));
        self.entities.push(Entity::new(
            shield_id,
            0.0,
            0.0,
            EntityKind::PlayerShield(PlayerShield::new(player_id)),
        ));
        self.leaderboard.add_player(player_id);

        let server_version = self.config.server_version;
        if let Some(connection) = self.connections.lookup_mut(connection_id) {
            connection.state = ConnectionState::User {
                entity_id: player_id,
                name: name.clone(),
            };
            connection.spectator_join = None;
            connection.last_action = now;
            connection.send(ServerToClientMessage::Joined {
                server_version,
                player: live_model,
            });
        }
        info!(
            "Connection {} joined as {} (entity {})",
            connection_id, name, player_id
        );
    }

    fn spectate(&mut self, connection_id: u32, now: Instant) {
        let spectators = self
            .connections
            .iter()
            .filter(|c| c.id != connection_id && c.is_spectator())
            .count();
        if spectators >= self.config.max_spectators {
            if let Some(connection) = self.connections.lookup_mut(connection_id) {
                connection.send(ServerToClientMessage::Error {
                    reason: ErrorReason::ServerFull,
                });
            }
            return;
        }

        self.release_player(connection_id);
        let server_version = self.config.server_version;
        if let Some(connection) = self.connections.lookup_mut(connection_id) {
            connection.state = ConnectionState::Spectator;
            connection.spectator_join = Some(now);
            connection.send(ServerToClientMessage::Spectating { server_version });
        }
        info!("Connection {} is spectating", connection_id);
    }

    /// Removes the player (and its shield and stats) a connection controls,
    /// leaving the connection unauthenticated.
    fn release_player(&mut self, connection_id: u32) {
        let Some(connection) = self.connections.lookup_mut(connection_id) else {
            return;
        };
        let Some(entity_id) = connection.user_entity_id() else {
            return;
        };
        connection.state = ConnectionState::Unauthenticated;

        // the shield and any attached effects go with it
        if self.entities.remove(entity_id).is_some() {
            self.ids.release(entity_id);
        }
        for owned in self
            .entities
            .remove_where(|e| e.owner_id() == Some(entity_id))
        {
            self.ids.release(owned.core.id);
        }
        self.leaderboard.remove_player(entity_id);
    }

    fn player_groupings(&self) -> Vec<crate::clusterer::Grouping<u32>> {
        let players = self
            .entities
            .iter()
            .filter(|e| e.as_player().is_some_and(|p| !p.dead))
            .map(|e| (e.core.x, e.id()))
            .collect();
        groupings(players, self.config.cluster_gap)
    }

    /// Keeps enemy density proportional to the players in each grouping and
    /// sends a meteor wave on schedule.
    fn balance_spawns(&mut self) {
        let ships = self
            .entities
            .iter()
            .filter_map(|e| match &e.kind {
                EntityKind::Player(player) if !player.dead => Some((e.core.x, true)),
                EntityKind::SwoopingEnemy(_) => Some((e.core.x, false)),
                _ => None,
            })
            .collect();
        let height = self.config.screen_height;

        for grouping in groupings(ships, self.config.cluster_gap) {
            let players = grouping.members.iter().filter(|is_player| **is_player).count();
            let enemies = grouping.members.len() - players;
            let wanted = (players.min(self.config.max_players_counted_per_grouping) as f32
                * self.config.enemies_per_player)
                .ceil() as usize;
            for _ in enemies..wanted {
                let x = enemy_x_in_grouping(&grouping, 0.0, &mut self.rng);
                let y = -height * 0.1 + self.rng.gen::<f32>() * height * 0.15;
                let color = random_color(&mut self.rng);
                let enemy = SwoopingEnemy::new(color, height, &mut self.rng);
                let id = self.ids.next_id();
                self.entities
                    .push(Entity::new(id, x, y, EntityKind::SwoopingEnemy(enemy)));
            }
        }

        if self.every(self.config.meteor_wave_every_ticks) {
            for grouping in self.player_groupings() {
                for _ in 0..self.config.meteors_per_grouping {
                    let x = self.rng.gen_range(grouping.x0..=grouping.x1);
                    let y = -height * 0.1 + self.rng.gen::<f32>() * height * 0.15;
                    let meteor = Meteor::random(&mut self.rng);
                    let id = self.ids.next_id();
                    self.entities
                        .push(Entity::new(id, x, y, EntityKind::Meteor(meteor)));
                }
            }
        }
    }

    fn send_leaderboard(&mut self) {
        if self.connections.is_empty() {
            return;
        }
        let names: HashMap<u32, String> = self
            .connections
            .iter()
            .filter_map(|c| match &c.state {
                ConnectionState::User { entity_id, name } => Some((*entity_id, name.clone())),
                _ => None,
            })
            .collect();
        let mut ranked = self.leaderboard.ranked();
        for row in &mut ranked {
            if let Some(name) = names.get(&row.user_id) {
                row.username = name.clone();
            }
        }
        let top: Vec<LeaderboardEntryRanked> = ranked.iter().take(LEADERBOARD_TOP).cloned().collect();

        for connection in self.connections.iter_mut() {
            let scores = match connection.state {
                ConnectionState::Unauthenticated => continue,
                ConnectionState::Spectator => top.clone(),
                ConnectionState::User { entity_id, .. } => {
                    let mut scores = top.clone();
                    if !scores.iter().any(|row| row.user_id == entity_id) {
                        if let Some(own) = ranked.iter().find(|row| row.user_id == entity_id) {
                            scores.push(own.clone());
                        }
                    }
                    scores
                }
            };
            connection.send(ServerToClientMessage::Leaderboard { scores });
        }
    }

    /// Moves the shared spectator camera somewhere in the players' range.
    fn move_camera(&mut self) {
        let xs: Vec<f32> = self
            .entities
            .iter()
            .filter(|e| e.as_player().is_some_and(|p| !p.dead))
            .map(|e| e.core.x)
            .collect();
        if xs.is_empty() {
            return;
        }
        let lo = xs.iter().copied().fold(f32::INFINITY, f32::min);
        let hi = xs.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let x = self.rng.gen_range(lo..=hi);
        if let Some(camera) = self.entities.lookup_mut(self.camera_id) {
            camera.core.x = x;
        }
    }

    /// Queues each connection's interest-filtered snapshot.
    fn send_world_state(&mut self) {
        let visible: Vec<(u32, f32, EntityModel)> = self
            .entities
            .iter()
            .filter(|e| !matches!(e.kind, EntityKind::Spectator(_)))
            .map(|e| (e.id(), e.real_position(&self.entities).0, e.to_model()))
            .collect();
        let mut builder = IntervalTree::builder();
        for (index, (_, x, _)) in visible.iter().enumerate() {
            builder.insert_point(*x, index);
        }
        let tree = builder.build();
        let half_range = self.config.screen_range / 2.0;
        let camera_x = self
            .entities
            .lookup(self.camera_id)
            .map_or(0.0, |camera| camera.core.x);

        for connection in self.connections.iter_mut() {
            let own = match connection.state {
                ConnectionState::Unauthenticated => continue,
                ConnectionState::Spectator => None,
                ConnectionState::User { entity_id, .. } => self
                    .entities
                    .lookup(entity_id)
                    .and_then(|e| e.as_player().map(|p| (e, p))),
            };
            let center = own.map_or(camera_x, |(entity, _)| entity.core.x);
            let own_id = own.map(|(entity, _)| entity.id());

            let mut indices: Vec<usize> = tree
                .search(center - half_range, center + half_range)
                .into_iter()
                .copied()
                .collect();
            indices.sort_unstable();

            let mut entities = Vec::with_capacity(indices.len() + 1);
            if let Some((entity, player)) = own {
                entities.push(EntityModel::LivePlayer(player.to_live_model(&entity.core)));
            }
            entities.extend(
                indices
                    .into_iter()
                    .filter(|index| Some(visible[*index].0) != own_id)
                    .map(|index| visible[index].2.clone()),
            );
            connection.send(ServerToClientMessage::WorldState { entities });
        }
    }

    /// Encodes every connection's queued messages into one frame. A batch
    /// that does not encode closes its connection at this tick's sweep.
    fn flush(&mut self) -> Vec<(u32, Frame)> {
        let mut frames = Vec::new();
        for connection in self.connections.iter_mut() {
            if connection.outbound.is_empty() {
                continue;
            }
            let messages = std::mem::take(&mut connection.outbound);
            match encode_server_messages(&messages, connection.wire_format) {
                Ok(frame) => frames.push((connection.id, frame)),
                Err(e) => {
                    error!(
                        "Dropping connection {}: {} messages failed to encode: {}",
                        connection.id,
                        messages.len(),
                        e
                    );
                    connection.pending_close = Some(DisconnectReason::EncodeError);
                }
            }
        }
        frames
    }

    /// Drops entities marked this tick, then runs post-tick hooks on the
    /// survivors.
    fn finalize_entities(&mut self) {
        for removed in self.entities.remove_where(|e| e.core.mark_to_destroy) {
            self.ids.release(removed.core.id);
        }
        let mut ctx = TickContext::new(
            &self.config,
            &mut self.rng,
            &mut self.leaderboard,
            &mut self.ids,
        );
        for entity in self.entities.iter_mut() {
            entity.post_tick(&mut ctx);
        }
        ctx.apply(&mut self.entities);
    }

    /// Disconnects closed, corrupted and timed-out connections, back to
    /// front, releasing everything they own.
    fn sweep_connections(&mut self) -> Vec<(u32, DisconnectReason)> {
        let now = self.clock.now();
        let timeouts = Timeouts {
            input: self.config.input_timeout,
            ping: self.config.ping_timeout,
            spectator: self.config.spectator_duration,
        };
        let mut disconnected = Vec::new();
        for position in (0..self.connections.len()).rev() {
            let Some(connection) = self.connections.get_index(position) else {
                continue;
            };
            let Some(reason) = connection.expired(now, &timeouts) else {
                continue;
            };
            let id = connection.id;
            self.release_player(id);
            self.connections.remove(id);
            self.connection_ids.release(id);
            info!("Connection {} disconnected: {:?}", id, reason);
            disconnected.push((id, reason));
        }
        disconnected
    }

    fn stats(&self, processed: usize) -> TickStats {
        TickStats {
            tick: self.tick_index,
            processed_messages: processed,
            queued_messages: self.inbound.len(),
            connections: self.connections.len(),
            users: self.connections.iter().filter(|c| c.is_user()).count(),
            spectators: self.connections.iter().filter(|c| c.is_spectator()).count(),
            entities: self.entities.len(),
        }
    }

    fn entity_counts(&self) -> String {
        let mut counts: Vec<(&'static str, usize)> = Vec::new();
        for entity in self.entities.iter() {
            let name = entity.kind.name();
            match counts.iter_mut().find(|(kind, _)| *kind == name) {
                Some((_, count)) => *count += 1,
                None => counts.push((name, 1)),
            }
        }
        counts
            .iter()
            .map(|(kind, count)| format!("{}: {}", kind, count))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
