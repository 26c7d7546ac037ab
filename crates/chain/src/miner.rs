//! Random search for verification codes whose windowed MD5 opens with two
//! zero bytes.

use md5::{Digest, Md5};
use rand::RngCore;
use tracing::info;

use crate::chat::{Chat, DIGEST_LEN, NONCE_LEN};
use crate::ledger::CONTEXT;

/// Attempts between progress log lines.
const PROGRESS_INTERVAL: u64 = 2_000_000;

/// Search nonces for `text` mined on top of `window` until the digest
/// satisfies the target. Runs until it succeeds; the enclosing task is the
/// unit of cancellation.
///
/// `window` holds at most the trailing 19 predecessors; `text` must be
/// 1..=255 bytes.
pub(crate) fn search_verification_code<R: RngCore>(
    window: &[Chat],
    text: &str,
    rng: &mut R,
) -> Chat {
    debug_assert!(window.len() <= CONTEXT);
    debug_assert!(!text.is_empty() && text.len() <= crate::chat::MAX_TEXT_BYTES);

    // The preimage is fixed except for the 16 nonce bytes at its tail, so
    // it is built once and the nonce slot rewritten per attempt.
    let mut preimage = Vec::new();
    for chat in window {
        preimage.extend_from_slice(&chat.encoded());
    }
    preimage.push(text.len() as u8);
    preimage.extend_from_slice(text.as_bytes());
    let nonce_at = preimage.len();
    preimage.extend_from_slice(&[0u8; NONCE_LEN]);

    let mut nonce = [0u8; NONCE_LEN];
    let mut attempts: u64 = 0;
    loop {
        rng.fill_bytes(&mut nonce);
        preimage[nonce_at..].copy_from_slice(&nonce);
        let digest: [u8; DIGEST_LEN] = Md5::digest(&preimage).into();
        if digest[..2] == [0, 0] {
            return Chat::new(text.to_owned(), nonce, digest);
        }
        attempts += 1;
        if attempts % PROGRESS_INTERVAL == 0 {
            info!(attempts, text, "still searching for a verification code");
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::ledger::window_digest;

    #[test]
    fn found_code_satisfies_the_target() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mined = search_verification_code(&[], "hello", &mut rng);
        assert_eq!(mined.text(), "hello");
        assert_eq!(&mined.md5_hash()[..2], &[0, 0]);
        assert_eq!(window_digest(&[], &mined), *mined.md5_hash());
    }

    #[test]
    fn search_is_deterministic_for_a_seeded_rng() {
        let mut a = ChaCha8Rng::seed_from_u64(42);
        let mut b = ChaCha8Rng::seed_from_u64(42);
        assert_eq!(
            search_verification_code(&[], "same", &mut a),
            search_verification_code(&[], "same", &mut b),
        );
    }

    #[test]
    fn digest_covers_the_predecessor_window() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let first = search_verification_code(&[], "first", &mut rng);
        let second = search_verification_code(std::slice::from_ref(&first), "second", &mut rng);
        assert_eq!(
            window_digest(std::slice::from_ref(&first), &second),
            *second.md5_hash(),
        );
        // Dropping the predecessor from the window changes the digest, so
        // the mined chat is bound to the history it was mined against.
        assert_ne!(window_digest(&[], &second), *second.md5_hash());
    }
}
