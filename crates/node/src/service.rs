use std::net::Ipv4Addr;
use std::time::Duration;

use chain::{Chat, Ledger};
use p2p::{Message, MeshHandle};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::archive::ArchiveLog;

/// Rounds of broadcast-and-poll before giving up on majority confirmation.
const CONFIRM_ATTEMPTS: usize = 10;
const PUSH_SETTLE: Duration = Duration::from_secs(1);
const POLL_SETTLE: Duration = Duration::from_secs(2);
const RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Ties the shared ledger, the mesh, and the archive log together.
///
/// One clone lives in the peer event loop to dispatch inbound traffic;
/// others are handed to the console for user-initiated mining.
#[derive(Clone)]
pub struct ChatService {
    ledger: Ledger,
    mesh: MeshHandle,
    archive: ArchiveLog,
}

impl ChatService {
    pub fn new(ledger: Ledger, mesh: MeshHandle, archive: ArchiveLog) -> Self {
        Self {
            ledger,
            mesh,
            archive,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn mesh(&self) -> &MeshHandle {
        &self.mesh
    }

    /// Dispatch one message received from a peer.
    pub fn handle_message(&self, peer_ip: Ipv4Addr, message: Message) {
        match message {
            Message::PeerRequest => {
                let _ = self.mesh.send(peer_ip, Message::PeerList(self.mesh.peer_ips()));
            }
            Message::PeerList(ips) => {
                for ip in ips {
                    self.mesh.connect(ip);
                }
            }
            Message::ArchiveRequest => {
                let _ = self
                    .mesh
                    .send(peer_ip, Message::ArchiveResponse(self.ledger.snapshot()));
            }
            Message::ArchiveResponse(history) => {
                if self.ledger.replace(history.clone()) {
                    info!(%peer_ip, chats = history.len(), "adopted longer history");
                } else {
                    debug!(%peer_ip, chats = history.len(), "incoming history discarded");
                }
                // Recorded regardless of adoption: confirmation counting
                // only asks whether the peer's chain carries our chat.
                self.archive.record(peer_ip, history);
            }
            Message::Notification(text) => {
                debug!(%peer_ip, text, "notification received");
            }
        }
    }

    /// Mine `text` onto the chain, push the result to the mesh, and wait
    /// for a majority of peers to echo it back.
    ///
    /// Best effort: after ten rounds without a majority the attempt is
    /// logged and abandoned. Never raises; the chat stays on the local
    /// chain either way.
    pub async fn create_and_broadcast_chat(&self, text: String) {
        let ledger = self.ledger.clone();
        let mined = match tokio::task::spawn_blocking(move || {
            let mut rng = rand::thread_rng();
            ledger.mine_chat(&text, &mut rng)
        })
        .await
        {
            Ok(chat) => chat,
            Err(err) => {
                error!(error = %err, "mining task aborted");
                return;
            }
        };
        info!(
            text = mined.text(),
            hash = %hex::encode(mined.md5_hash()),
            "mined new chat"
        );

        let history = self.ledger.snapshot();
        for attempt in 1..=CONFIRM_ATTEMPTS {
            self.mesh.broadcast(Message::ArchiveResponse(history.clone()));
            sleep(PUSH_SETTLE).await;
            self.mesh.broadcast(Message::ArchiveRequest);
            sleep(POLL_SETTLE).await;

            let confirmations = self.archive.confirmations(&mined);
            let total = self.mesh.peer_count();
            if confirmations >= total / 2 + 1 {
                info!(attempt, confirmations, total, "chat confirmed by majority");
                return;
            }
            debug!(attempt, confirmations, total, "majority not reached yet");
            sleep(RETRY_BACKOFF).await;
        }
        warn!(
            text = mined.text(),
            "gave up waiting for majority confirmation"
        );
    }

    /// Confirmation count for a chat, as currently recorded.
    pub fn confirmations(&self, chat: &Chat) -> usize {
        self.archive.confirmations(chat)
    }
}
