//! A user's presence on the server: its open connections and the outbound
//! channel feeding them.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{Mutex, mpsc, oneshot};
use uuid::Uuid;

use crate::domain::{Frame, UserId};

pub type ConnectionId = Uuid;

#[derive(Debug, Error)]
#[error("socket write failed: {0}")]
pub struct SinkError(pub String);

/// Write half of one physical connection.
#[async_trait]
pub trait FrameSink: Send + Sync {
    async fn send_text(&self, text: String) -> Result<(), SinkError>;

    async fn close(&self, code: u16) -> Result<(), SinkError>;
}

#[derive(Clone)]
pub struct Connection {
    id: ConnectionId,
    remote_addr: String,
    sink: Arc<dyn FrameSink>,
}

impl Connection {
    pub fn new(remote_addr: impl Into<String>, sink: Arc<dyn FrameSink>) -> Self {
        Self {
            id: Uuid::new_v4(),
            remote_addr: remote_addr.into(),
            sink,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn remote_addr(&self) -> &str {
        &self.remote_addr
    }

    pub fn sink(&self) -> &Arc<dyn FrameSink> {
        &self.sink
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("remote_addr", &self.remote_addr)
            .finish()
    }
}

/// Why the send loop should stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseSignal {
    /// The last connection went away on its own.
    LastConnectionGone,
    /// The server is closing every connection with this close code.
    Forced { code: u16 },
}

/// Returned when attaching to a client whose last connection already left.
#[derive(Debug, Error)]
#[error("client {0} is shutting down")]
pub struct ClientClosed(pub UserId);

#[derive(Debug, Default)]
struct ClientState {
    connections: Vec<Connection>,
    closed: bool,
}

/// Receiving side of a client, consumed by its send loop.
pub struct ClientOutbox {
    pub frames: mpsc::UnboundedReceiver<Frame>,
    pub close: oneshot::Receiver<CloseSignal>,
}

pub struct Client {
    id: UserId,
    state: Mutex<ClientState>,
    sender: mpsc::UnboundedSender<Frame>,
    close_signal: std::sync::Mutex<Option<oneshot::Sender<CloseSignal>>>,
}

impl Client {
    pub(crate) fn new(id: UserId) -> (Arc<Self>, ClientOutbox) {
        let (sender, frames) = mpsc::unbounded_channel();
        let (close_tx, close) = oneshot::channel();
        let client = Arc::new(Self {
            id,
            state: Mutex::new(ClientState::default()),
            sender,
            close_signal: std::sync::Mutex::new(Some(close_tx)),
        });
        (client, ClientOutbox { frames, close })
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    /// Queues a frame for the send loop. Returns false once the loop is gone.
    pub fn push(&self, frame: Frame) -> bool {
        self.sender.send(frame).is_ok()
    }

    pub async fn attach(&self, connection: Connection) -> Result<(), ClientClosed> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(ClientClosed(self.id));
        }
        state.connections.push(connection);
        Ok(())
    }

    /// Removes a connection. Returns true exactly once: when this call
    /// removed the last connection. The client is closed from then on.
    pub async fn detach(&self, connection: ConnectionId) -> bool {
        let mut state = self.state.lock().await;
        let before = state.connections.len();
        state.connections.retain(|c| c.id() != connection);
        if state.connections.len() == before {
            return false;
        }
        if state.connections.is_empty() && !state.closed {
            state.closed = true;
            return true;
        }
        false
    }

    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.closed
    }

    pub async fn connections(&self) -> Vec<Connection> {
        self.state.lock().await.connections.clone()
    }

    pub async fn connection_count(&self) -> usize {
        self.state.lock().await.connections.len()
    }

    /// Fires the one-shot close signal. Returns false if it already fired.
    pub fn signal_close(&self, signal: CloseSignal) -> bool {
        let sender = match self.close_signal.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match sender {
            Some(sender) => sender.send(signal).is_ok(),
            None => false,
        }
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client").field("id", &self.id).finish()
    }
}

/// Drains the client's channel onto every open connection until the close
/// signal fires. The connection list is snapshotted under the client lock
/// and written outside it.
pub(crate) async fn run_send_loop(client: Arc<Client>, outbox: ClientOutbox) {
    let ClientOutbox {
        mut frames,
        mut close,
    } = outbox;

    loop {
        tokio::select! {
            biased;
            Some(frame) = frames.recv() => {
                deliver(&client, &frame).await;
            }
            signal = &mut close => {
                while let Ok(frame) = frames.try_recv() {
                    deliver(&client, &frame).await;
                }
                if let Ok(CloseSignal::Forced { code }) = signal {
                    for connection in client.connections().await {
                        if let Err(e) = connection.sink().close(code).await {
                            tracing::debug!(
                                "Closing connection {} of user {} failed: {}",
                                connection.id(),
                                client.id(),
                                e
                            );
                        }
                    }
                }
                break;
            }
        }
    }

    tracing::debug!("Send loop for user {} finished", client.id());
}

async fn deliver(client: &Client, frame: &Frame) {
    let text = match serde_json::to_string(frame) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!("Failed to serialize frame for user {}: {}", client.id(), e);
            return;
        }
    };

    for connection in client.connections().await {
        if let Err(e) = connection.sink().send_text(text.clone()).await {
            tracing::warn!(
                "Failed to write to connection {} of user {}: {}",
                connection.id(),
                client.id(),
                e
            );
        }
    }
}
