use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{broadcast, mpsc};
use tracing::debug;

use crate::types::Message;

const EVENT_CHANNEL_SIZE: usize = 2048;

/// Events surfaced to the node's dispatch loop.
///
/// Each connection's read loop emits into one ordered channel, so messages
/// from a single peer are observed in arrival order.
#[derive(Clone, Debug)]
pub enum PeerEvent {
    Connected {
        peer_ip: Ipv4Addr,
    },
    Disconnected {
        peer_ip: Ipv4Addr,
        reason: String,
    },
    Message {
        peer_ip: Ipv4Addr,
        message: Message,
    },
}

/// Connected peers keyed by remote address, plus the event stream feeding
/// the node.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    peers: RwLock<HashMap<Ipv4Addr, PeerHandle>>,
    events: broadcast::Sender<PeerEvent>,
    next_connection: AtomicU64,
}

struct PeerHandle {
    connection: u64,
    sender: mpsc::Sender<Message>,
}

impl Registry {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self {
            inner: Arc::new(RegistryInner {
                peers: RwLock::new(HashMap::new()),
                events,
                next_connection: AtomicU64::new(0),
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PeerEvent> {
        self.inner.events.subscribe()
    }

    /// Insert a peer, replacing any stale entry for the same address, and
    /// return the connection id the new handler deregisters with.
    pub fn register(&self, peer_ip: Ipv4Addr, sender: mpsc::Sender<Message>) -> u64 {
        let connection = self.inner.next_connection.fetch_add(1, Ordering::Relaxed);
        self.inner
            .peers
            .write()
            .insert(peer_ip, PeerHandle { connection, sender });
        let _ = self.inner.events.send(PeerEvent::Connected { peer_ip });
        connection
    }

    /// Drop a peer entry, but only if it still belongs to `connection`.
    ///
    /// Both halves of a connection call this on exit; a handler that was
    /// superseded by a reconnect must not evict its replacement.
    pub fn deregister(&self, peer_ip: Ipv4Addr, connection: u64, reason: impl Into<String>) {
        let removed = {
            let mut peers = self.inner.peers.write();
            match peers.get(&peer_ip) {
                Some(handle) if handle.connection == connection => {
                    peers.remove(&peer_ip);
                    true
                }
                _ => false,
            }
        };
        if removed {
            let _ = self.inner.events.send(PeerEvent::Disconnected {
                peer_ip,
                reason: reason.into(),
            });
        }
    }

    pub fn contains(&self, peer_ip: Ipv4Addr) -> bool {
        self.inner.peers.read().contains_key(&peer_ip)
    }

    pub fn peer_count(&self) -> usize {
        self.inner.peers.read().len()
    }

    /// Snapshot of the connected addresses.
    pub fn peer_ips(&self) -> Vec<Ipv4Addr> {
        self.inner.peers.read().keys().copied().collect()
    }

    /// Queue a message for one peer. Full or closed queues drop the message
    /// with a log line; the write loop notices a closed socket on its own.
    pub fn send(&self, peer_ip: Ipv4Addr, message: Message) -> Result<(), crate::NetworkError> {
        let peers = self.inner.peers.read();
        let handle = peers
            .get(&peer_ip)
            .ok_or(crate::NetworkError::UnknownPeer(peer_ip))?;
        if let Err(err) = handle.sender.try_send(message) {
            debug!(%peer_ip, error = %err, "dropping outbound message");
        }
        Ok(())
    }

    /// Queue a message for every connected peer.
    pub fn broadcast(&self, message: Message) {
        let peers = self.inner.peers.read();
        for (peer_ip, handle) in peers.iter() {
            if let Err(err) = handle.sender.try_send(message.clone()) {
                debug!(%peer_ip, error = %err, "dropping broadcast message");
            }
        }
    }

    pub(crate) fn emit_message(&self, peer_ip: Ipv4Addr, message: Message) {
        let _ = self.inner.events.send(PeerEvent::Message { peer_ip, message });
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
