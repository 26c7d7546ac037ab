use std::net::Ipv4Addr;

use chain::Chat;

/// Top-level wire messages exchanged across peers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    /// Ask a peer for the addresses it currently knows.
    PeerRequest,
    /// Addresses of every peer the sender is connected to.
    ///
    /// Carrying `Ipv4Addr` rather than raw strings means a malformed
    /// address can never reach serialization and desynchronize the frame.
    PeerList(Vec<Ipv4Addr>),
    /// Ask a peer for its full chat history.
    ArchiveRequest,
    /// Full chat history of the sender, oldest first.
    ArchiveResponse(Vec<Chat>),
    /// Free-form operator notice. Accepted but not acted on.
    Notification(String),
}
