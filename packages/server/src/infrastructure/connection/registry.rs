//! Maps user ids to live clients.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;

use super::client::{Client, CloseSignal, Connection, ConnectionId, run_send_loop};
use crate::domain::{Frame, UserId};

#[derive(Default)]
pub struct ConnectionRegistry {
    clients: RwLock<HashMap<UserId, Arc<Client>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the live client of `user`, creating it (and spawning its send
    /// loop) if there is none. The flag is true when the client was created.
    pub async fn register(&self, user: UserId) -> (Arc<Client>, bool) {
        if let Some(client) = self.clients.read().await.get(&user).cloned()
            && !client.is_closed().await
        {
            return (client, false);
        }

        let mut clients = self.clients.write().await;
        if let Some(existing) = clients.get(&user)
            && !existing.is_closed().await
        {
            return (existing.clone(), false);
        }

        let (client, outbox) = Client::new(user);
        tokio::spawn(run_send_loop(client.clone(), outbox));
        clients.insert(user, client.clone());
        tracing::debug!("Client for user {} registered", user);
        (client, true)
    }

    /// Registers `user` if needed and attaches the connection. Retries when
    /// the client found was closed between the two steps.
    pub async fn connect(&self, user: UserId, connection: Connection) -> (Arc<Client>, bool) {
        loop {
            let (client, created) = self.register(user).await;
            if self.attach_connection(&client, connection.clone()).await {
                return (client, created);
            }
        }
    }

    /// Returns false if the client closed before the connection could be
    /// added.
    pub async fn attach_connection(&self, client: &Client, connection: Connection) -> bool {
        let id = connection.id();
        match client.attach(connection).await {
            Ok(()) => {
                tracing::debug!("Connection {} attached to user {}", id, client.id());
                true
            }
            Err(e) => {
                tracing::debug!("Connection {} not attached: {}", id, e);
                false
            }
        }
    }

    /// Detaches a connection. True iff it was the client's last one; the
    /// caller is then responsible for tearing the client down.
    pub async fn detach(&self, client: &Client, connection: ConnectionId) -> bool {
        client.detach(connection).await
    }

    /// Removes the client from the registry unless it was already replaced
    /// by a newer one.
    pub async fn remove(&self, client: &Arc<Client>) -> bool {
        let mut clients = self.clients.write().await;
        match clients.get(&client.id()) {
            Some(current) if Arc::ptr_eq(current, client) => {
                clients.remove(&client.id());
                tracing::debug!("Client for user {} removed", client.id());
                true
            }
            _ => false,
        }
    }

    pub async fn get(&self, user: UserId) -> Option<Arc<Client>> {
        self.clients.read().await.get(&user).cloned()
    }

    /// Best-effort unicast. No-op when the user has no live client.
    pub async fn send(&self, user: UserId, frame: Frame) -> bool {
        match self.get(user).await {
            Some(client) => client.push(frame),
            None => false,
        }
    }

    /// Closes every connection of `user` with the given close code.
    pub async fn disconnect(&self, user: UserId, code: u16) -> bool {
        match self.get(user).await {
            Some(client) => client.signal_close(CloseSignal::Forced { code }),
            None => false,
        }
    }

    pub async fn is_connected(&self, user: UserId) -> bool {
        self.clients.read().await.contains_key(&user)
    }

    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
