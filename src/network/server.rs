use std::collections::HashMap;
use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::error::GameError;
use crate::protocol::{ClientMessage, Outbound, ServerMessage, SessionEvent, SessionId};

/// Channel carrying encoded frames to one client's write task.
pub type ClientTx = mpsc::UnboundedSender<Vec<u8>>;

/// What the transport hands to the game loop.
#[derive(Debug)]
pub enum Inbound {
    /// A websocket handshake completed. The game loop keeps `tx` to reach
    /// the client; a `SessionEvent::Connect` follows right after.
    Connected { session: SessionId, tx: ClientTx },
    Event(SessionEvent),
}

/// Accept websocket clients forever, one reader and one writer task per
/// connection. Decoded messages go to `inbound`.
pub async fn listen(
    addr: SocketAddr,
    inbound: mpsc::UnboundedSender<Inbound>,
) -> Result<(), GameError> {
    let listener = TcpListener::bind(addr).await?;
    info!("Game server listening on ws://{}", addr);

    let mut next_session: SessionId = 1;
    loop {
        let (stream, peer) = listener.accept().await?;
        let session = next_session;
        next_session += 1;
        info!("New connection from {} (session {})", peer, session);

        let inbound = inbound.clone();
        tokio::spawn(async move {
            serve_connection(stream, peer, session, inbound).await;
        });
    }
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    session: SessionId,
    inbound: mpsc::UnboundedSender<Inbound>,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            error!("WebSocket handshake with {} failed: {}", peer, e);
            return;
        }
    };
    let (mut ws_write, mut ws_read) = ws_stream.split();

    // Channel: game loop -> write task -> WebSocket
    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
    if inbound.send(Inbound::Connected { session, tx }).is_err()
        || inbound
            .send(Inbound::Event(SessionEvent::Connect(session)))
            .is_err()
    {
        warn!("Game loop is gone, dropping session {}", session);
        return;
    }

    // ── Write task ──────────────────────────────────────────────────
    tokio::spawn(async move {
        while let Some(bytes) = rx.recv().await {
            if let Err(e) = ws_write.send(Message::Binary(bytes.into())).await {
                error!("Failed to send to session {}: {}", session, e);
                break;
            }
        }
        debug!("Write task for session {} shutting down", session);
    });

    // ── Read loop ───────────────────────────────────────────────────
    while let Some(result) = ws_read.next().await {
        let msg = match result {
            Ok(msg) => msg,
            Err(e) => {
                warn!("WebSocket read error on session {}: {}", session, e);
                break;
            }
        };
        if msg.is_close() {
            break;
        }
        if !msg.is_binary() {
            continue;
        }

        match decode(&msg.into_data()) {
            Ok(message) => {
                if inbound
                    .send(Inbound::Event(SessionEvent::Message(session, message)))
                    .is_err()
                {
                    break;
                }
            }
            Err(e) => warn!("Failed to decode message from session {}: {}", session, e),
        }
    }

    let _ = inbound.send(Inbound::Event(SessionEvent::Disconnect(session)));
    info!("Session {} closed", session);
}

pub fn decode(bytes: &[u8]) -> Result<ClientMessage, rmp_serde::decode::Error> {
    rmp_serde::from_slice(bytes)
}

pub fn encode(message: &ServerMessage) -> Result<Vec<u8>, rmp_serde::encode::Error> {
    rmp_serde::to_vec_named(message)
}

/// Per-session outgoing channels, owned by the game loop.
#[derive(Default)]
pub struct Outlets {
    clients: HashMap<SessionId, ClientTx>,
}

impl Outlets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, session: SessionId, tx: ClientTx) {
        self.clients.insert(session, tx);
    }

    /// Dropping the sender ends the session's write task.
    pub fn remove(&mut self, session: SessionId) {
        self.clients.remove(&session);
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Encode and queue each message for its session. Messages for sessions
    /// that are already gone are dropped.
    pub fn dispatch(&self, outbound: Vec<Outbound>) {
        for Outbound { to, message } in outbound {
            let Some(tx) = self.clients.get(&to) else {
                debug!("Dropping message for closed session {}", to);
                continue;
            };
            match encode(&message) {
                Ok(bytes) => {
                    let _ = tx.send(bytes);
                }
                Err(e) => error!("Failed to serialize message for session {}: {}", to, e),
            }
        }
    }
}
