use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::input::InputManager;
use crate::prediction::Predictor;
use log::{debug, info, warn};
use shared::models::{EntityModel, LivePlayerModel};
use shared::protocol::{ErrorReason, LeaderboardEntryRanked};
use shared::{ClientToServerMessage, Keyed, Registry, ServerToClientMessage};
use std::collections::HashSet;
use std::time::Instant;

/// Where this client is in its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Connected, nothing sent or answered yet.
    Connecting,
    Playing { entity_id: u32 },
    Spectating,
    /// Our ship was destroyed. The connection stays open.
    Dead,
    Disconnected,
}

/// A snapshot entity we do not control, with the two latest positions to
/// interpolate between.
#[derive(Debug, Clone)]
pub struct RemoteEntity {
    pub model: EntityModel,
    previous: (f32, f32),
    current: (f32, f32),
}

impl Keyed for RemoteEntity {
    fn key(&self) -> u32 {
        self.model.entity_id()
    }
}

impl RemoteEntity {
    fn new(model: EntityModel) -> Self {
        let position = model.position();
        Self {
            model,
            previous: position,
            current: position,
        }
    }

    fn update(&mut self, model: EntityModel) {
        self.previous = self.current;
        self.current = model.position();
        self.model = model;
    }

    fn interpolated(&self, alpha: f32) -> (f32, f32) {
        (
            self.previous.0 + (self.current.0 - self.previous.0) * alpha,
            self.previous.1 + (self.current.1 - self.previous.1) * alpha,
        )
    }
}

/// An entity ready to draw, in world coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderEntity<'a> {
    pub entity_id: u32,
    pub x: f32,
    pub y: f32,
    pub model: &'a EntityModel,
}

type Callback = Box<dyn FnMut() + Send>;

/// Client-side game state: the session, our predicted ship and everything
/// else the server tells us about.
pub struct ClientGame {
    config: ClientConfig,
    state: SessionState,
    input: InputManager,
    predictor: Option<Predictor>,
    local: Option<EntityModel>,
    entities: Registry<RemoteEntity>,
    last_snapshot_at: Option<Instant>,
    leaderboard: Vec<LeaderboardEntryRanked>,
    last_error: Option<ErrorReason>,
    ping_counter: u8,
    ping_sent: Option<(u8, Instant)>,
    latency_ms: Option<u64>,
    last_ping_at: Option<Instant>,
    on_died: Option<Callback>,
    on_disconnect: Option<Callback>,
}

impl ClientGame {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            state: SessionState::Connecting,
            input: InputManager::new(),
            predictor: None,
            local: None,
            entities: Registry::new(),
            last_snapshot_at: None,
            leaderboard: Vec::new(),
            last_error: None,
            ping_counter: 0,
            ping_sent: None,
            latency_ms: None,
            last_ping_at: None,
            on_died: None,
            on_disconnect: None,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn input(&mut self) -> &mut InputManager {
        &mut self.input
    }

    pub fn predictor(&self) -> Option<&Predictor> {
        self.predictor.as_ref()
    }

    pub fn entities(&self) -> &Registry<RemoteEntity> {
        &self.entities
    }

    pub fn leaderboard(&self) -> &[LeaderboardEntryRanked] {
        &self.leaderboard
    }

    pub fn last_error(&self) -> Option<ErrorReason> {
        self.last_error
    }

    pub fn latency_ms(&self) -> Option<u64> {
        self.latency_ms
    }

    /// Called once when our ship dies.
    pub fn on_died<F: FnMut() + Send + 'static>(&mut self, callback: F) {
        self.on_died = Some(Box::new(callback));
    }

    /// Called once when the connection goes away.
    pub fn on_disconnect<F: FnMut() + Send + 'static>(&mut self, callback: F) {
        self.on_disconnect = Some(Box::new(callback));
    }

    /// The first message of a session: join, or spectate if configured.
    pub fn hello(&self) -> ClientToServerMessage {
        if self.config.spectate {
            ClientToServerMessage::Spectate
        } else {
            ClientToServerMessage::Join {
                name: self.config.name.clone(),
            }
        }
    }

    pub fn handle_messages(
        &mut self,
        messages: Vec<ServerToClientMessage>,
        now: Instant,
    ) -> Result<(), ClientError> {
        for message in messages {
            self.handle_message(message, now)?;
        }
        Ok(())
    }

    pub fn handle_message(
        &mut self,
        message: ServerToClientMessage,
        now: Instant,
    ) -> Result<(), ClientError> {
        match message {
            ServerToClientMessage::Joined {
                server_version,
                player,
            } => {
                self.check_version(server_version)?;
                info!("Joined as entity {}", player.entity_id);
                self.state = SessionState::Playing {
                    entity_id: player.entity_id,
                };
                self.input.skip_acknowledged(player.last_processed_input_sequence_number);
                self.predictor = Some(Predictor::new(&player, self.config.world_height));
                self.local = Some(EntityModel::LivePlayer(player));
            }
            ServerToClientMessage::Spectating { server_version } => {
                self.check_version(server_version)?;
                info!("Spectating");
                self.state = SessionState::Spectating;
            }
            ServerToClientMessage::Pong { ping } => {
                if let Some((sent, at)) = self.ping_sent {
                    if sent == ping {
                        self.latency_ms = Some(now.duration_since(at).as_millis() as u64);
                        self.ping_sent = None;
                    }
                }
            }
            ServerToClientMessage::Error { reason } => {
                warn!("Server refused request: {:?}", reason);
                self.last_error = Some(reason);
            }
            ServerToClientMessage::Leaderboard { scores } => {
                self.leaderboard = scores;
            }
            ServerToClientMessage::WorldState { entities } => {
                self.apply_world_state(entities, now);
            }
        }
        Ok(())
    }

    fn check_version(&mut self, got: u8) -> Result<(), ClientError> {
        let expected = self.config.server_version;
        if got != expected {
            self.disconnect();
            return Err(ClientError::VersionMismatch { expected, got });
        }
        Ok(())
    }

    fn local_entity_id(&self) -> Option<u32> {
        match self.state {
            SessionState::Playing { entity_id } => Some(entity_id),
            _ => self.local.as_ref().map(EntityModel::entity_id),
        }
    }

    /// Replaces the world with a snapshot. Our own ship is reconciled, all
    /// other entities are stored for interpolation and anything missing
    /// from the snapshot is gone.
    pub fn apply_world_state(&mut self, snapshot: Vec<EntityModel>, now: Instant) {
        let local_id = self.local_entity_id();
        let mut seen = HashSet::with_capacity(snapshot.len());

        for model in snapshot {
            let entity_id = model.entity_id();
            if Some(entity_id) == local_id {
                if let EntityModel::LivePlayer(live) = &model {
                    self.reconcile_local(live);
                }
                self.local = Some(model);
                continue;
            }
            seen.insert(entity_id);
            match self.entities.lookup_mut(entity_id) {
                Some(existing) => existing.update(model),
                None => self.entities.push(RemoteEntity::new(model)),
            }
        }

        let removed = self.entities.remove_where(|entity| !seen.contains(&entity.key()));
        if !removed.is_empty() {
            debug!("{} entities left view", removed.len());
        }
        self.last_snapshot_at = Some(now);
    }

    fn reconcile_local(&mut self, live: &LivePlayerModel) {
        if let Some(predictor) = self.predictor.as_mut() {
            if predictor.reconcile(live) {
                self.input
                    .skip_acknowledged(live.last_processed_input_sequence_number);
            }
        }
        if live.dead && matches!(self.state, SessionState::Playing { .. }) {
            info!("Our ship was destroyed");
            self.state = SessionState::Dead;
            self.input.release_all();
            if let Some(callback) = self.on_died.as_mut() {
                callback();
            }
        }
    }

    /// One local tick: samples input, predicts it and returns the message
    /// to send. Only a live player sends input.
    pub fn tick(&mut self) -> Option<ClientToServerMessage> {
        if !matches!(self.state, SessionState::Playing { .. }) {
            return None;
        }
        let predictor = self.predictor.as_mut()?;
        let input = self.input.next_input();
        predictor.submit(input);
        Some(input.into())
    }

    /// A ping, if one is due.
    pub fn ping_due(&mut self, now: Instant) -> Option<ClientToServerMessage> {
        if matches!(self.state, SessionState::Disconnected) {
            return None;
        }
        if let Some(last) = self.last_ping_at {
            if now.duration_since(last) < self.config.ping_interval {
                return None;
            }
        }
        self.last_ping_at = Some(now);
        self.ping_counter = self.ping_counter.wrapping_add(1);
        self.ping_sent = Some((self.ping_counter, now));
        Some(ClientToServerMessage::Ping {
            ping: self.ping_counter,
        })
    }

    /// Marks the session over and fires the disconnect callback once.
    pub fn disconnect(&mut self) {
        if self.state == SessionState::Disconnected {
            return;
        }
        info!("Disconnected");
        self.state = SessionState::Disconnected;
        self.predictor = None;
        if let Some(callback) = self.on_disconnect.as_mut() {
            callback();
        }
    }

    /// Everything to draw this frame. Our ship comes from prediction,
    /// other entities are interpolated between their last two snapshots
    /// and attached entities are placed relative to their owner.
    pub fn render_list(&self, now: Instant) -> Vec<RenderEntity<'_>> {
        let alpha = self.interpolation_alpha(now);
        let mut list = Vec::with_capacity(self.entities.len() + 1);

        let local_position = match (&self.local, &self.predictor) {
            (Some(model), Some(predictor)) => {
                let (x, y) = predictor.position();
                list.push(RenderEntity {
                    entity_id: model.entity_id(),
                    x,
                    y,
                    model,
                });
                Some((model.entity_id(), (x, y)))
            }
            _ => None,
        };

        let position_of = |entity_id: u32| -> Option<(f32, f32)> {
            if let Some((local_id, position)) = local_position {
                if local_id == entity_id {
                    return Some(position);
                }
            }
            self.entities
                .lookup(entity_id)
                .map(|entity| entity.interpolated(alpha))
        };

        for entity in &self.entities {
            let (mut x, mut y) = entity.interpolated(alpha);
            if let Some(owner) = entity.model.owner_entity_id() {
                if let Some((owner_x, owner_y)) = position_of(owner) {
                    let (offset_x, offset_y) = entity.model.position();
                    x = owner_x + offset_x;
                    y = owner_y + offset_y;
                }
            }
            list.push(RenderEntity {
                entity_id: entity.model.entity_id(),
                x,
                y,
                model: &entity.model,
            });
        }
        list
    }

    fn interpolation_alpha(&self, now: Instant) -> f32 {
        let delay = self.config.interpolation_delay.as_secs_f32();
        match self.last_snapshot_at {
            Some(at) if delay > 0.0 => {
                (now.duration_since(at).as_secs_f32() / delay).clamp(0.0, 1.0)
            }
            _ => 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use shared::models::{
        ExplosionModel, MeteorColor, MeteorModel, MeteorSize, PlayerColor, PlayerShieldModel,
        ShieldStrength,
    };
    use shared::{InputKeys, PlayerWeapon, SERVER_VERSION};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn live(entity_id: u32, x: f32, acknowledged: u32, dead: bool) -> LivePlayerModel {
        LivePlayerModel {
            entity_id,
            x,
            y: 500.0,
            health: 25,
            player_color: PlayerColor::Red,
            player_input_keys: InputKeys::none(),
            momentum_x: 0.0,
            momentum_y: 0.0,
            dead,
            last_processed_input_sequence_number: acknowledged,
            selected_weapon: PlayerWeapon::Laser1,
            available_weapons: vec![],
        }
    }

    fn meteor(entity_id: u32, x: f32) -> EntityModel {
        EntityModel::Meteor(MeteorModel {
            entity_id,
            x,
            y: 100.0,
            health: 10,
            meteor_color: MeteorColor::Brown,
            size: MeteorSize::Big,
            rotate_speed: 0,
        })
    }

    fn joined_game() -> ClientGame {
        let mut game = ClientGame::new(ClientConfig::default());
        game.handle_message(
            ServerToClientMessage::Joined {
                server_version: SERVER_VERSION,
                player: live(1, 100.0, 0, false),
            },
            Instant::now(),
        )
        .unwrap();
        game
    }

    #[test]
    fn test_hello_follows_config() {
        let game = ClientGame::new(ClientConfig::default());
        assert!(matches!(game.hello(), ClientToServerMessage::Join { .. }));

        let config = ClientConfig {
            spectate: true,
            ..ClientConfig::default()
        };
        let game = ClientGame::new(config);
        assert_eq!(game.hello(), ClientToServerMessage::Spectate);
    }

    #[test]
    fn test_version_mismatch_is_fatal() {
        let mut game = ClientGame::new(ClientConfig::default());
        let result = game.handle_message(
            ServerToClientMessage::Spectating {
                server_version: SERVER_VERSION + 1,
            },
            Instant::now(),
        );
        assert!(matches!(result, Err(ClientError::VersionMismatch { .. })));
        assert_eq!(game.state(), SessionState::Disconnected);
    }

    #[test]
    fn test_tick_sends_sequenced_input() {
        let mut game = joined_game();
        assert_eq!(game.state(), SessionState::Playing { entity_id: 1 });
        match game.tick() {
            Some(ClientToServerMessage::PlayerInput {
                input_sequence_number,
                ..
            }) => assert_eq!(input_sequence_number, 1),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(game.predictor().unwrap().pending().len(), 1);
    }

    #[test]
    fn test_spectator_sends_no_input() {
        let mut game = ClientGame::new(ClientConfig::default());
        game.handle_message(
            ServerToClientMessage::Spectating {
                server_version: SERVER_VERSION,
            },
            Instant::now(),
        )
        .unwrap();
        assert!(game.tick().is_none());
    }

    #[test]
    fn test_world_state_replaces_remote_entities() {
        let mut game = joined_game();
        let now = Instant::now();
        game.apply_world_state(vec![meteor(5, 10.0), meteor(6, 20.0)], now);
        assert_eq!(game.entities().len(), 2);

        game.apply_world_state(vec![meteor(6, 30.0)], now);
        assert_eq!(game.entities().len(), 1);
        assert!(game.entities().lookup(5).is_none());
    }

    #[test]
    fn test_large_snapshot_keeps_only_seen_entities() {
        let mut game = joined_game();
        let now = Instant::now();
        game.apply_world_state((100..5_100).map(|id| meteor(id, id as f32)).collect(), now);
        assert_eq!(game.entities().len(), 5_000);

        let evens = (100..5_100)
            .filter(|id| id % 2 == 0)
            .map(|id| meteor(id, id as f32 + 1.0))
            .collect();
        game.apply_world_state(evens, now);
        assert_eq!(game.entities().len(), 2_500);
        assert!(game.entities().iter().all(|e| e.model.entity_id() % 2 == 0));
        assert!(game.entities().lookup(101).is_none());
    }

    #[test]
    fn test_remote_entities_are_interpolated() {
        let config = ClientConfig {
            interpolation_delay: Duration::from_millis(100),
            ..ClientConfig::default()
        };
        let mut game = ClientGame::new(config);
        let start = Instant::now();
        game.apply_world_state(vec![meteor(5, 0.0)], start);
        game.apply_world_state(vec![meteor(5, 100.0)], start);

        let list = game.render_list(start + Duration::from_millis(50));
        assert_eq!(list.len(), 1);
        assert_approx_eq!(list[0].x, 50.0, 0.5);

        let list = game.render_list(start + Duration::from_millis(500));
        assert_approx_eq!(list[0].x, 100.0);
    }

    #[test]
    fn test_local_player_rendered_from_prediction() {
        let mut game = joined_game();
        game.input().press(crate::input::Key::Right);
        game.tick();
        let predicted = game.predictor().unwrap().position().0;

        let list = game.render_list(Instant::now());
        assert_eq!(list[0].entity_id, 1);
        assert_approx_eq!(list[0].x, predicted);
        assert!(predicted > 100.0);
    }

    #[test]
    fn test_attached_entities_follow_owner() {
        let mut game = joined_game();
        let shield = EntityModel::PlayerShield(PlayerShieldModel {
            entity_id: 2,
            x: 0.0,
            y: 0.0,
            owner_entity_id: 1,
            shield_strength: ShieldStrength::Small,
            health: 10,
            depleted: false,
        });
        let explosion = EntityModel::Explosion(ExplosionModel {
            entity_id: 3,
            x: 5.0,
            y: -5.0,
            intensity: 2,
            owner_entity_id: Some(9),
        });
        let owner = meteor(9, 400.0);
        let now = Instant::now();
        game.apply_world_state(
            vec![
                EntityModel::LivePlayer(live(1, 100.0, 0, false)),
                shield,
                owner,
                explosion,
            ],
            now,
        );

        let list = game.render_list(now);
        let find = |id: u32| list.iter().find(|e| e.entity_id == id).unwrap();
        assert_approx_eq!(find(2).x, 100.0);
        assert_approx_eq!(find(3).x, 405.0);
        assert_approx_eq!(find(3).y, 95.0);
    }

    #[test]
    fn test_died_fires_once() {
        let mut game = joined_game();
        let died = Arc::new(AtomicUsize::new(0));
        let counter = died.clone();
        game.on_died(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let now = Instant::now();
        let dead = EntityModel::LivePlayer(live(1, 100.0, 0, true));
        game.apply_world_state(vec![dead.clone()], now);
        game.apply_world_state(vec![dead], now);

        assert_eq!(died.load(Ordering::SeqCst), 1);
        assert_eq!(game.state(), SessionState::Dead);
        assert!(game.tick().is_none());
    }

    #[test]
    fn test_disconnect_fires_once() {
        let mut game = joined_game();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        game.on_disconnect(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        game.disconnect();
        game.disconnect();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_ping_interval_and_latency() {
        let mut game = joined_game();
        let start = Instant::now();
        let ping = match game.ping_due(start) {
            Some(ClientToServerMessage::Ping { ping }) => ping,
            other => panic!("unexpected {:?}", other),
        };
        assert!(game.ping_due(start + Duration::from_millis(10)).is_none());

        game.handle_message(
            ServerToClientMessage::Pong { ping },
            start + Duration::from_millis(40),
        )
        .unwrap();
        assert_eq!(game.latency_ms(), Some(40));
        assert!(game
            .ping_due(start + game.config().ping_interval)
            .is_some());
    }

    #[test]
    fn test_error_is_recorded() {
        let mut game = ClientGame::new(ClientConfig::default());
        game.handle_message(
            ServerToClientMessage::Error {
                reason: ErrorReason::NameInUse,
            },
            Instant::now(),
        )
        .unwrap();
        assert_eq!(game.last_error(), Some(ErrorReason::NameInUse));
        assert_eq!(game.state(), SessionState::Connecting);
    }
}
