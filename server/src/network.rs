//! WebSocket transport and the tick scheduler.
//!
//! Network tasks never touch game state. Reader tasks forward raw frames to
//! the main loop over a channel; the main loop owns the [`ServerGame`],
//! feeds it those frames, runs ticks on schedule and hands each connection's
//! outgoing frame to that connection's writer task.

use crate::config::GameConfig;
use crate::error::ServerError;
use crate::game::{ServerGame, TickOutput};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::protocol::Frame;
use shared::SystemClock;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

/// Messages sent from network tasks to the main loop
pub enum ServerMessage {
    Accepted {
        socket: WebSocketStream<TcpStream>,
        addr: SocketAddr,
    },
    FrameReceived {
        connection_id: u32,
        frame: Frame,
    },
    Closed {
        connection_id: u32,
    },
}

/// Messages sent from the main loop to a connection's writer task
#[derive(Debug)]
pub enum GameMessage {
    Send(Frame),
    Close,
}

/// Traffic counters for the periodic stats line.
#[derive(Debug, Default, Clone, Copy)]
pub struct Traffic {
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

pub struct Server {
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    config: Arc<GameConfig>,
    game: ServerGame,
    writers: HashMap<u32, mpsc::UnboundedSender<GameMessage>>,
    traffic: Traffic,

    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Server {
    pub async fn bind(addr: &str, config: GameConfig) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!("Server listening on {}", local_addr);

        let config = Arc::new(config);
        let game = ServerGame::new(config.clone(), Arc::new(SystemClock), rand::random());
        let (server_tx, server_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener: Some(listener),
            local_addr,
            config,
            game,
            writers: HashMap::new(),
            traffic: Traffic::default(),
            server_tx,
            server_rx,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Spawns the task accepting TCP connections and upgrading them.
    fn spawn_acceptor(&mut self) -> Result<(), ServerError> {
        let listener = self
            .listener
            .take()
            .ok_or_else(|| ServerError::Internal("server is already running".to_string()))?;
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            loop {
                let (stream, addr) = match listener.accept().await {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        continue;
                    }
                };
                let server_tx = server_tx.clone();
                tokio::spawn(async move {
                    match accept_async(stream).await {
                        Ok(socket) => {
                            let _ = server_tx.send(ServerMessage::Accepted { socket, addr });
                        }
                        Err(e) => warn!("WebSocket handshake with {} failed: {}", addr, e),
                    }
                });
            }
        });
        Ok(())
    }

    /// Registers an upgraded socket with the game and starts its reader and
    /// writer tasks.
    fn spawn_connection(&mut self, socket: WebSocketStream<TcpStream>, addr: SocketAddr) {
        let connection_id = self.game.connect();
        info!("Connection {} from {}", connection_id, addr);
        let (mut sink, mut stream) = socket.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<GameMessage>();
        self.writers.insert(connection_id, tx);

        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                let result = match message {
                    GameMessage::Send(Frame::Binary(bytes)) => sink.send(Message::binary(bytes)).await,
                    GameMessage::Send(Frame::Text(text)) => sink.send(Message::text(text)).await,
                    GameMessage::Close => {
                        let _ = sink.close().await;
                        break;
                    }
                };
                if let Err(e) = result {
                    debug!("Send to connection {} failed: {}", connection_id, e);
                    break;
                }
            }
        });

        let server_tx = self.server_tx.clone();
        tokio::spawn(async move {
            while let Some(message) = stream.next().await {
                let frame = match message {
                    Ok(Message::Binary(bytes)) => Frame::Binary(bytes.to_vec()),
                    Ok(Message::Text(text)) => Frame::Text(text.to_string()),
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        debug!("Connection {} read error: {}", connection_id, e);
                        break;
                    }
                };
                if server_tx
                    .send(ServerMessage::FrameReceived {
                        connection_id,
                        frame,
                    })
                    .is_err()
                {
                    return;
                }
            }
            let _ = server_tx.send(ServerMessage::Closed { connection_id });
        });
    }

    fn handle_message(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::Accepted { socket, addr } => self.spawn_connection(socket, addr),
            ServerMessage::FrameReceived {
                connection_id,
                frame,
            } => {
                self.traffic.bytes_received += frame_len(&frame) as u64;
                self.game.receive_frame(connection_id, &frame);
            }
            ServerMessage::Closed { connection_id } => {
                self.game.on_transport_closed(connection_id);
            }
        }
    }

    /// Runs one tick. A failing tick is logged and skipped; the loop carries
    /// on with the next one.
    fn run_tick(&mut self) {
        let game = &mut self.game;
        match catch_unwind(AssertUnwindSafe(|| game.tick())) {
            Ok(output) => self.dispatch(output),
            Err(_) => error!("Tick {} failed, continuing", self.game.tick_index()),
        }
    }

    fn dispatch(&mut self, output: TickOutput) {
        for (connection_id, frame) in output.frames {
            self.traffic.bytes_sent += frame_len(&frame) as u64;
            if let Some(writer) = self.writers.get(&connection_id) {
                let _ = writer.send(GameMessage::Send(frame));
            }
        }
        for (connection_id, _) in output.disconnected {
            if let Some(writer) = self.writers.remove(&connection_id) {
                let _ = writer.send(GameMessage::Close);
            }
        }
    }

    /// Main loop: network events between ticks, ticks on schedule. The next
    /// tick is scheduled one interval after the current one started, minus
    /// the time the tick took, so slow ticks do not push the cadence back.
    pub async fn run(&mut self) -> Result<(), ServerError> {
        self.spawn_acceptor()?;

        let interval = self.config.tick_interval;
        let mut next_tick = Instant::now() + interval;
        let mut last_tick = Instant::now();

        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(message) => self.handle_message(message),
                        None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                _ = sleep_until(next_tick) => {
                    let started = Instant::now();
                    let since_last = started.duration_since(last_tick);
                    last_tick = started;
                    if since_last > interval.mul_f32(1.2) {
                        warn!(
                            "Tick {} started {}ms after the previous one (nominal {}ms)",
                            self.game.tick_index() + 1,
                            since_last.as_millis(),
                            interval.as_millis()
                        );
                    }

                    self.run_tick();

                    let took = started.elapsed();
                    next_tick = Instant::now() + interval.saturating_sub(took).max(Duration::from_millis(1));

                    if self.game.tick_index() % 100 == 0 {
                        debug!(
                            "Tick {} took {}ms, sent {} bytes, received {} bytes",
                            self.game.tick_index(),
                            took.as_millis(),
                            self.traffic.bytes_sent,
                            self.traffic.bytes_received
                        );
                    }
                },
            }
        }

        Ok(())
    }
}

fn frame_len(frame: &Frame) -> usize {
    match frame {
        Frame::Binary(bytes) => bytes.len(),
        Frame::Text(text) => text.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_len() {
        assert_eq!(frame_len(&Frame::Binary(vec![1, 2, 3])), 3);
        assert_eq!(frame_len(&Frame::Text("abcd".to_string())), 4);
    }

    #[tokio::test]
    async fn test_bind_reports_local_addr() {
        let server = Server::bind("127.0.0.1:0", GameConfig::default())
            .await
            .unwrap();
        assert_ne!(server.local_addr().port(), 0);
    }

    #[test]
    fn test_run_twice_fails() {
        let mut server =
            tokio_test::block_on(Server::bind("127.0.0.1:0", GameConfig::default())).unwrap();
        server.listener = None;
        assert!(matches!(
            server.spawn_acceptor(),
            Err(ServerError::Internal(_))
        ));
    }

    #[test]
    fn test_bad_bind_address_is_io_error() {
        let result = tokio_test::block_on(Server::bind("127.0.0.1:99999", GameConfig::default()));
        assert!(matches!(result, Err(ServerError::Io(_))));
    }
}
