use std::net::{IpAddr, Ipv4Addr};

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::P2pConfig;
use crate::error::NetworkError;
use crate::peer::spawn_peer;
use crate::registry::{PeerEvent, Registry};
use crate::types::Message;

/// Handle for interacting with the running mesh.
#[derive(Clone)]
pub struct MeshHandle {
    registry: Registry,
    config: P2pConfig,
}

impl MeshHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<PeerEvent> {
        self.registry.subscribe()
    }

    pub fn broadcast(&self, message: Message) {
        self.registry.broadcast(message);
    }

    pub fn send(&self, peer_ip: Ipv4Addr, message: Message) -> Result<(), NetworkError> {
        self.registry.send(peer_ip, message)
    }

    pub fn peer_ips(&self) -> Vec<Ipv4Addr> {
        self.registry.peer_ips()
    }

    pub fn peer_count(&self) -> usize {
        self.registry.peer_count()
    }

    pub fn config(&self) -> &P2pConfig {
        &self.config
    }

    /// Dial a peer unless it is this node or already connected.
    ///
    /// The dial runs as its own task; failures are logged and discarded.
    /// On success the connection handler starts and an `ArchiveRequest` is
    /// queued so histories converge without waiting for a discovery tick.
    pub fn connect(&self, target: Ipv4Addr) {
        if target == self.config.host_ip || Some(target) == self.config.advertised_ip {
            debug!(%target, "refusing to dial ourselves");
            return;
        }
        if self.registry.contains(target) {
            return;
        }
        let registry = self.registry.clone();
        let port = self.config.port;
        let queue = self.config.outbound_queue;
        tokio::spawn(async move {
            match TcpStream::connect((target, port)).await {
                Ok(stream) => {
                    spawn_peer(stream, target, registry.clone(), queue);
                    let _ = registry.send(target, Message::ArchiveRequest);
                }
                Err(err) => {
                    warn!(%target, error = %err, "outbound connect failed");
                }
            }
        });
    }
}

/// Bind the listener, spawn the accept loop, and dial the optional seed.
///
/// Returns once the socket is bound; a bind failure is fatal to startup.
pub async fn start_mesh(config: P2pConfig) -> Result<MeshHandle, NetworkError> {
    let registry = Registry::new();
    let listener = TcpListener::bind((config.host_ip, config.port)).await?;
    info!(addr = %listener.local_addr()?, "mesh listening");

    let accept_registry = registry.clone();
    let queue = config.outbound_queue;
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, addr)) => match addr.ip() {
                    IpAddr::V4(peer_ip) => {
                        spawn_peer(stream, peer_ip, accept_registry.clone(), queue);
                    }
                    IpAddr::V6(peer_ip) => {
                        warn!(%peer_ip, "dropping non-ipv4 peer");
                    }
                },
                Err(err) => {
                    warn!(error = %err, "listener accept failed");
                    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                }
            }
        }
    });

    let handle = MeshHandle { registry, config };
    if let Some(seed) = handle.config.seed {
        handle.connect(seed);
    }
    Ok(handle)
}
