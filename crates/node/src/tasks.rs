use std::time::Duration;

use p2p::{Message, MeshHandle, PeerEvent};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::service::ChatService;

/// Cadence of the mesh-wide address gossip.
const DISCOVERY_INTERVAL: Duration = Duration::from_secs(5);

/// Drive the peer event stream into the service.
///
/// Errors inside dispatch never escape this loop; a connection-level
/// failure already tore the offending peer down by the time it is
/// observed here.
pub async fn run_peer_event_loop(service: ChatService) {
    let mut events = service.mesh().subscribe();
    loop {
        match events.recv().await {
            Ok(PeerEvent::Connected { peer_ip }) => {
                info!(%peer_ip, "peer connected");
            }
            Ok(PeerEvent::Disconnected { peer_ip, reason }) => {
                info!(%peer_ip, %reason, "peer disconnected");
            }
            Ok(PeerEvent::Message { peer_ip, message }) => {
                service.handle_message(peer_ip, message);
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "peer event loop lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// Ask every connected peer for fresh addresses on a fixed cadence.
pub async fn run_discovery_task(mesh: MeshHandle) {
    let mut ticker = interval(DISCOVERY_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        mesh.broadcast(Message::PeerRequest);
    }
}
