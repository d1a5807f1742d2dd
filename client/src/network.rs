use crate::bot::RandomPilot;
use crate::error::ClientError;
use crate::game::{ClientGame, SessionState};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::protocol::{decode_server_messages, encode_client_message, Frame, WireFormat};
use shared::{ClientToServerMessage, ServerToClientMessage};
use std::time::Instant;
use tokio::net::TcpStream;
use tokio::time::interval;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A WebSocket connection to the game server speaking whole-message frames.
pub struct ServerConnection {
    sink: SplitSink<Socket, Message>,
    stream: SplitStream<Socket>,
    format: WireFormat,
    closed: bool,
    bytes_sent: u64,
    bytes_received: u64,
}

impl ServerConnection {
    pub async fn connect(url: &str, format: WireFormat) -> Result<Self, ClientError> {
        let (socket, _) = connect_async(url).await?;
        let (sink, stream) = socket.split();
        info!("Connected to {}", url);
        Ok(Self {
            sink,
            stream,
            format,
            closed: false,
            bytes_sent: 0,
            bytes_received: 0,
        })
    }

    /// Sends one message. Fails with [`ClientError::NotConnected`] once
    /// either side has closed the connection.
    pub async fn send(&mut self, message: &ClientToServerMessage) -> Result<(), ClientError> {
        if self.closed {
            return Err(ClientError::NotConnected);
        }
        let frame = encode_client_message(message, self.format)?;
        let message = match frame {
            Frame::Binary(bytes) => {
                self.bytes_sent += bytes.len() as u64;
                Message::binary(bytes)
            }
            Frame::Text(text) => {
                self.bytes_sent += text.len() as u64;
                Message::text(text)
            }
        };
        self.sink.send(message).await?;
        Ok(())
    }

    /// Waits for the next batch of server messages. `Ok(None)` means the
    /// server closed the connection.
    pub async fn recv(&mut self) -> Result<Option<Vec<ServerToClientMessage>>, ClientError> {
        while let Some(message) = self.stream.next().await {
            let frame = match message? {
                Message::Binary(bytes) => Frame::Binary(bytes.to_vec()),
                Message::Text(text) => Frame::Text(text.to_string()),
                Message::Close(_) => {
                    self.closed = true;
                    return Ok(None);
                }
                _ => continue,
            };
            self.bytes_received += match &frame {
                Frame::Binary(bytes) => bytes.len(),
                Frame::Text(text) => text.len(),
            } as u64;
            return Ok(Some(decode_server_messages(&frame)?));
        }
        self.closed = true;
        Ok(None)
    }

    pub async fn close(&mut self) -> Result<(), ClientError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.sink.close().await?;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn traffic(&self) -> (u64, u64) {
        (self.bytes_sent, self.bytes_received)
    }
}

/// Headless client: keeps a [`ClientGame`] in sync with the server and
/// flies the ship with a [`RandomPilot`].
pub struct Client {
    connection: ServerConnection,
    game: ClientGame,
    pilot: Option<RandomPilot>,
}

impl Client {
    pub async fn connect(game: ClientGame, pilot: Option<RandomPilot>) -> Result<Self, ClientError> {
        let config = game.config();
        let connection = ServerConnection::connect(&config.server_url, config.wire_format).await?;
        Ok(Self {
            connection,
            game,
            pilot,
        })
    }

    pub fn game(&self) -> &ClientGame {
        &self.game
    }

    /// Sends this tick's input and, when due, a ping.
    async fn send_tick(&mut self) -> Result<(), ClientError> {
        if let Some(input) = self.game.tick() {
            self.connection.send(&input).await?;
        }
        if let Some(ping) = self.game.ping_due(Instant::now()) {
            self.connection.send(&ping).await?;
        }
        Ok(())
    }

    /// Runs until the server disconnects us or the session ends. The
    /// connection is closed on every exit path; a session-ending error such
    /// as a version mismatch is returned after cleanup.
    pub async fn run(&mut self) -> Result<(), ClientError> {
        let hello = self.game.hello();
        self.connection.send(&hello).await?;

        let mut tick_interval = interval(self.game.config().tick_interval);
        let mut ticks: u64 = 0;
        let mut outcome = Ok(());

        loop {
            tokio::select! {
                received = self.connection.recv() => {
                    match received {
                        Ok(Some(messages)) => {
                            if let Err(e) = self.game.handle_messages(messages, Instant::now()) {
                                error!("Ending session: {}", e);
                                outcome = Err(e);
                                break;
                            }
                        }
                        Ok(None) => {
                            info!("Server closed the connection");
                            break;
                        }
                        Err(ClientError::Codec(e)) => {
                            error!("Undecodable frame from server: {}", e);
                            break;
                        }
                        Err(e) => {
                            warn!("Connection lost: {}", e);
                            break;
                        }
                    }
                },

                _ = tick_interval.tick() => {
                    ticks += 1;
                    if let Some(pilot) = self.pilot.as_mut() {
                        pilot.steer(self.game.input());
                    }
                    if let Err(e) = self.send_tick().await {
                        warn!("Send failed: {}", e);
                        break;
                    }

                    if ticks % 100 == 0 {
                        let (sent, received) = self.connection.traffic();
                        debug!(
                            "State {:?}, {} entities in view, latency {:?}ms, sent {} bytes, received {} bytes",
                            self.game.state(),
                            self.game.entities().len(),
                            self.game.latency_ms(),
                            sent,
                            received
                        );
                    }
                },
            }

            if self.game.state() == SessionState::Disconnected {
                break;
            }
        }

        self.game.disconnect();
        if let Err(e) = self.connection.close().await {
            debug!("Close failed: {}", e);
        }
        outcome
    }
}
