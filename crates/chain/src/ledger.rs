use std::sync::Arc;

use md5::{Digest, Md5};
use parking_lot::Mutex;
use rand::RngCore;
use tracing::debug;

use crate::chat::{Chat, DIGEST_LEN, MAX_TEXT_BYTES};
use crate::miner::search_verification_code;

/// Number of chats covered by each hash, the newest included.
pub const WINDOW: usize = 20;
/// Predecessors hashed while mining; the candidate itself is the 20th
/// member of the window.
pub(crate) const CONTEXT: usize = WINDOW - 1;

/// Check a full history against the sliding-window hash rule.
///
/// Every chat's digest must open with two zero bytes and equal the MD5 of
/// the concatenated encodings of its trailing window, with the chat's own
/// digest bytes left out of the tail. The empty history is valid.
pub fn verify_history(history: &[Chat]) -> bool {
    for (index, chat) in history.iter().enumerate() {
        if chat.text().len() > MAX_TEXT_BYTES {
            return false;
        }
        if chat.md5_hash()[..2] != [0, 0] {
            return false;
        }
        let start = index.saturating_sub(CONTEXT);
        if window_digest(&history[start..index], chat) != *chat.md5_hash() {
            return false;
        }
    }
    true
}

/// MD5 over a window: the full encodings of the predecessors followed by
/// the newest chat with its digest omitted.
pub(crate) fn window_digest(predecessors: &[Chat], newest: &Chat) -> [u8; DIGEST_LEN] {
    let mut hasher = Md5::new();
    for chat in predecessors {
        hasher.update(chat.encoded());
    }
    hasher.update(newest.preimage());
    hasher.finalize().into()
}

/// Shared append-only history of chats.
///
/// Cloning the handle shares the underlying chain. All access happens under
/// one mutex; callers get independent snapshots and never observe partial
/// updates.
#[derive(Clone, Default)]
pub struct Ledger {
    chats: Arc<Mutex<Vec<Chat>>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Independent copy of the current history.
    pub fn snapshot(&self) -> Vec<Chat> {
        self.chats.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.chats.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.chats.lock().is_empty()
    }

    /// Adopt a candidate history wholesale.
    ///
    /// Returns `false` without touching the chain unless the candidate is
    /// strictly longer than the current history and passes
    /// [`verify_history`].
    pub fn replace(&self, candidate: Vec<Chat>) -> bool {
        let mut chats = self.chats.lock();
        if candidate.len() <= chats.len() {
            return false;
        }
        if !verify_history(&candidate) {
            return false;
        }
        *chats = candidate;
        true
    }

    /// Mine `text` onto the chain and return the appended chat.
    ///
    /// Optimistic concurrency: the search runs against a snapshot without
    /// holding the lock, and the result is appended only if the chain is
    /// still element-wise identical to that snapshot. A replacement that
    /// lands mid-search throws the candidate away and restarts against the
    /// new history. CPU-bound; callers offload to a blocking executor.
    ///
    /// `text` must be 1..=255 bytes of UTF-8.
    pub fn mine_chat<R: RngCore>(&self, text: &str, rng: &mut R) -> Chat {
        loop {
            let context = self.snapshot();
            let start = context.len().saturating_sub(CONTEXT);
            let mined = search_verification_code(&context[start..], text, rng);
            if self.append_if_unchanged(&context, mined.clone()) {
                return mined;
            }
            debug!("history changed while mining, restarting search");
        }
    }

    fn append_if_unchanged(&self, context: &[Chat], mined: Chat) -> bool {
        let mut chats = self.chats.lock();
        if chats.as_slice() != context {
            return false;
        }
        chats.push(mined);
        true
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(0x5eed)
    }

    fn mined_history(texts: &[&str]) -> (Ledger, Vec<Chat>) {
        let ledger = Ledger::new();
        let mut rng = rng();
        for text in texts {
            ledger.mine_chat(text, &mut rng);
        }
        let history = ledger.snapshot();
        (ledger, history)
    }

    #[test]
    fn empty_history_is_valid() {
        assert!(verify_history(&[]));
    }

    #[test]
    fn mined_chat_extends_a_valid_history() {
        let (ledger, history) = mined_history(&["hello"]);
        assert_eq!(ledger.len(), 1);
        assert_eq!(history[0].text(), "hello");
        assert_eq!(&history[0].md5_hash()[..2], &[0, 0]);
        assert!(verify_history(&history));

        let mut rng = rng();
        let second = ledger.mine_chat("world", &mut rng);
        let history = ledger.snapshot();
        assert_eq!(history.last(), Some(&second));
        assert!(verify_history(&history));
    }

    #[test]
    fn tampered_digest_fails_verification() {
        let (_, mut history) = mined_history(&["hello"]);
        let chat = &history[0];
        let mut hash = *chat.md5_hash();
        hash[15] ^= 0x01;
        history[0] = Chat::from_wire(chat.text().to_owned(), *chat.verification_code(), hash);
        assert!(!verify_history(&history));
    }

    #[test]
    fn digest_without_zero_prefix_fails_verification() {
        let chat = Chat::from_wire("x".to_owned(), [0u8; 16], [0xAB; 16]);
        assert!(!verify_history(&[chat]));
    }

    #[test]
    fn tampered_predecessor_invalidates_successors() {
        let (_, mut history) = mined_history(&["one", "two"]);
        let first = &history[0];
        history[0] = Chat::from_wire(
            "eno".to_owned(),
            *first.verification_code(),
            *first.md5_hash(),
        );
        assert!(!verify_history(&history));
    }

    #[test]
    fn replace_requires_strictly_longer_history() {
        let (_, longer) = mined_history(&["a", "b"]);
        let ledger = Ledger::new();

        assert!(ledger.replace(longer.clone()));
        assert_eq!(ledger.snapshot(), longer);

        // Same length is not enough.
        assert!(!ledger.replace(longer.clone()));
        // Neither is shorter.
        assert!(!ledger.replace(longer[..1].to_vec()));
        assert_eq!(ledger.snapshot(), longer);
    }

    #[test]
    fn replace_rejects_invalid_history() {
        let ledger = Ledger::new();
        let forged = vec![Chat::from_wire("x".to_owned(), [1u8; 16], [0u8; 16])];
        assert!(!ledger.replace(forged));
        assert!(ledger.is_empty());
    }

    #[test]
    fn replace_rejects_oversize_text() {
        let ledger = Ledger::new();
        let long = "a".repeat(MAX_TEXT_BYTES + 1);
        let forged = vec![Chat::from_wire(long, [0u8; 16], [0u8; 16])];
        assert!(!ledger.replace(forged));
    }

    #[test]
    fn append_is_discarded_when_history_moved_on() {
        let (_, longer) = mined_history(&["a", "b"]);
        let ledger = Ledger::new();
        let mut rng = rng();

        let context = ledger.snapshot();
        let mined = search_verification_code(&context, "late", &mut rng);

        // A longer history arrives while the candidate was being mined.
        assert!(ledger.replace(longer.clone()));
        assert!(!ledger.append_if_unchanged(&context, mined));
        assert_eq!(ledger.snapshot(), longer);

        // A fresh mine converges on top of the adopted history.
        let mined = ledger.mine_chat("late", &mut rng);
        let history = ledger.snapshot();
        assert_eq!(history.len(), longer.len() + 1);
        assert_eq!(history.last(), Some(&mined));
        assert!(verify_history(&history));
    }

    // Crosses the 20-chat boundary so both the miner and the verifier
    // exercise the saturated window. Slow: a few million MD5 rounds.
    #[test]
    fn window_saturates_past_twenty_chats() {
        let ledger = Ledger::new();
        let mut rng = rng();
        for i in 0..(WINDOW + 2) {
            ledger.mine_chat(&format!("chat {i}"), &mut rng);
        }
        let history = ledger.snapshot();
        assert_eq!(history.len(), WINDOW + 2);
        assert!(verify_history(&history));

        // The newest digest must ignore chats that fell out of its window:
        // recomputing it from only the trailing 19 predecessors matches.
        let newest = history.last().unwrap();
        let start = history.len() - WINDOW;
        let digest = window_digest(&history[start..history.len() - 1], newest);
        assert_eq!(digest, *newest.md5_hash());
    }
}
