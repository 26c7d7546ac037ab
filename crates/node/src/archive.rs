use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;

use chain::Chat;
use parking_lot::Mutex;

/// Latest full history reported by each peer.
///
/// Used solely to judge how widely a freshly mined chat has propagated:
/// a peer that later reports a history containing the chat counts as one
/// confirmation.
#[derive(Clone, Default)]
pub struct ArchiveLog {
    responses: Arc<Mutex<HashMap<Ipv4Addr, Vec<Chat>>>>,
}

impl ArchiveLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the most recent history a peer sent, replacing any earlier one.
    pub fn record(&self, peer_ip: Ipv4Addr, history: Vec<Chat>) {
        self.responses.lock().insert(peer_ip, history);
    }

    /// Number of peers whose latest recorded history contains `chat`.
    pub fn confirmations(&self, chat: &Chat) -> usize {
        self.responses
            .lock()
            .values()
            .filter(|history| history.contains(chat))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(last: u8) -> Ipv4Addr {
        Ipv4Addr::new(10, 1, 1, last)
    }

    fn chat(text: &str) -> Chat {
        Chat::from_wire(text.to_owned(), [0u8; 16], [0u8; 16])
    }

    #[test]
    fn counts_only_histories_containing_the_chat() {
        let log = ArchiveLog::new();
        let mined = chat("mined");

        log.record(ip(1), vec![chat("other"), mined.clone()]);
        log.record(ip(2), vec![chat("other")]);
        log.record(ip(3), vec![mined.clone()]);

        assert_eq!(log.confirmations(&mined), 2);
    }

    #[test]
    fn newer_response_replaces_the_old_one() {
        let log = ArchiveLog::new();
        let mined = chat("mined");

        log.record(ip(1), vec![mined.clone()]);
        assert_eq!(log.confirmations(&mined), 1);

        log.record(ip(1), vec![chat("reorged away")]);
        assert_eq!(log.confirmations(&mined), 0);
    }
}
