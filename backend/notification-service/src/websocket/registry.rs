//! Connection Registry
//!
//! Tracks every live WebSocket link per user and fans envelopes out to them.
//! Links are addressed by opaque [`ConnectionId`] handles so sessions can be
//! cleaned up precisely when they close, and dead links are pruned the moment
//! a send to them fails.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use super::messages::Envelope;
use crate::metrics;

/// Type alias for the per-link envelope sender
pub type EnvelopeSender = mpsc::UnboundedSender<Envelope>;

/// Unique handle for one registered WebSocket link
///
/// Handed out on registration; the only way to address the link afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// One registered link: handle plus its outbound channel
struct Link {
    id: ConnectionId,
    sender: EnvelopeSender,
}

#[derive(Default)]
struct RegistryInner {
    /// user_id -> live links, in registration order
    users: HashMap<Uuid, Vec<Link>>,
    /// handle -> owning user, for handle-only cleanup
    index: HashMap<ConnectionId, Uuid>,
}

/// Fan-out table for real-time pushes
///
/// Thread-safe behind one RwLock; every user may hold several concurrent
/// links (multiple tabs/devices). Delivery never errors: a user with no
/// links simply receives nothing, and a link whose receiver went away is
/// dropped from the table as part of the send.
#[derive(Default, Clone)]
pub struct ConnectionRegistry {
    inner: Arc<RwLock<RegistryInner>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a link for a user and hand back its handle.
    ///
    /// Registering a sender that is already present for this user returns
    /// the existing handle instead of creating a duplicate entry.
    pub async fn connect(&self, user_id: Uuid, sender: EnvelopeSender) -> ConnectionId {
        let mut inner = self.inner.write().await;

        if let Some(links) = inner.users.get(&user_id) {
            if let Some(existing) = links.iter().find(|l| l.sender.same_channel(&sender)) {
                return existing.id;
            }
        }

        let id = ConnectionId::new();
        inner.users.entry(user_id).or_default().push(Link { id, sender });
        inner.index.insert(id, user_id);

        metrics::set_ws_connections(inner.index.len());
        tracing::debug!(
            user_id = %user_id,
            connection_id = ?id,
            user_links = inner.users.get(&user_id).map(|v| v.len()).unwrap_or(0),
            "websocket link registered"
        );

        id
    }

    /// Remove a link by handle. Unknown handles are a no-op.
    pub async fn disconnect(&self, id: ConnectionId) {
        let mut inner = self.inner.write().await;

        let user_id = match inner.index.remove(&id) {
            Some(user_id) => user_id,
            None => return,
        };

        let mut emptied = false;
        if let Some(links) = inner.users.get_mut(&user_id) {
            links.retain(|l| l.id != id);
            emptied = links.is_empty();
        }
        if emptied {
            inner.users.remove(&user_id);
        }

        metrics::set_ws_connections(inner.index.len());
        tracing::debug!(
            user_id = %user_id,
            connection_id = ?id,
            "websocket link removed"
        );
    }

    /// Deliver an envelope to every live link of one user.
    ///
    /// Links whose receiver is gone are pruned in place; the remaining links
    /// still receive the envelope. Returns how many links it reached. Zero
    /// links is not an error.
    pub async fn send_to_user(&self, user_id: Uuid, envelope: &Envelope) -> usize {
        let mut inner = self.inner.write().await;

        let mut delivered = 0;
        let mut dead: Vec<ConnectionId> = Vec::new();
        let mut emptied = false;

        if let Some(links) = inner.users.get_mut(&user_id) {
            links.retain(|link| {
                if link.sender.send(envelope.clone()).is_ok() {
                    delivered += 1;
                    true
                } else {
                    dead.push(link.id);
                    false
                }
            });
            emptied = links.is_empty();
        }

        if emptied {
            inner.users.remove(&user_id);
        }
        for id in &dead {
            inner.index.remove(id);
        }

        if !dead.is_empty() {
            metrics::set_ws_connections(inner.index.len());
            tracing::debug!(
                user_id = %user_id,
                pruned = dead.len(),
                delivered,
                "pruned dead websocket links during send"
            );
        }

        delivered
    }

    /// Deliver an envelope to every live link of every user.
    ///
    /// Same pruning semantics as [`send_to_user`]. Returns the number of
    /// links reached.
    ///
    /// [`send_to_user`]: ConnectionRegistry::send_to_user
    pub async fn broadcast(&self, envelope: &Envelope) -> usize {
        let mut inner = self.inner.write().await;

        let mut delivered = 0;
        let mut dead: Vec<ConnectionId> = Vec::new();
        let mut emptied_users: Vec<Uuid> = Vec::new();

        for (user_id, links) in inner.users.iter_mut() {
            links.retain(|link| {
                if link.sender.send(envelope.clone()).is_ok() {
                    delivered += 1;
                    true
                } else {
                    dead.push(link.id);
                    false
                }
            });
            if links.is_empty() {
                emptied_users.push(*user_id);
            }
        }

        for user_id in &emptied_users {
            inner.users.remove(user_id);
        }
        for id in &dead {
            inner.index.remove(id);
        }

        if !dead.is_empty() {
            metrics::set_ws_connections(inner.index.len());
            tracing::debug!(
                pruned = dead.len(),
                delivered,
                "pruned dead websocket links during broadcast"
            );
        }

        delivered
    }

    /// Total number of live links across all users
    pub async fn connection_count(&self) -> usize {
        let inner = self.inner.read().await;
        inner.index.len()
    }

    /// Number of live links for one user
    pub async fn user_connection_count(&self, user_id: Uuid) -> usize {
        let inner = self.inner.read().await;
        inner.users.get(&user_id).map(|v| v.len()).unwrap_or(0)
    }

    /// Number of users with at least one live link
    pub async fn connected_user_count(&self) -> usize {
        let inner = self.inner.read().await;
        inner.users.len()
    }
}
