/// Mined nonce length in bytes.
pub const NONCE_LEN: usize = 16;
/// MD5 digest length in bytes.
pub const DIGEST_LEN: usize = 16;
/// Encoded size of a chat beyond its text: length byte, nonce, digest.
pub const ENCODED_OVERHEAD: usize = 1 + NONCE_LEN + DIGEST_LEN;
/// Text lengths must fit in the single length byte on the wire.
pub const MAX_TEXT_BYTES: usize = 255;

/// One unit of text in the shared history, together with the nonce found by
/// mining and the MD5 digest sealing it to its predecessors.
///
/// A chat is only ever produced by the miner or rebuilt from the wire, and
/// is never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chat {
    text: String,
    verification_code: [u8; NONCE_LEN],
    md5_hash: [u8; DIGEST_LEN],
}

impl Chat {
    pub(crate) fn new(
        text: String,
        verification_code: [u8; NONCE_LEN],
        md5_hash: [u8; DIGEST_LEN],
    ) -> Self {
        Self {
            text,
            verification_code,
            md5_hash,
        }
    }

    /// Rebuild a chat from decoded wire fields.
    ///
    /// Fields are taken as-is; whether the digest actually seals the chat is
    /// decided by [`verify_history`](crate::verify_history) when the
    /// surrounding history is considered for adoption.
    pub fn from_wire(
        text: String,
        verification_code: [u8; NONCE_LEN],
        md5_hash: [u8; DIGEST_LEN],
    ) -> Self {
        Self::new(text, verification_code, md5_hash)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn verification_code(&self) -> &[u8; NONCE_LEN] {
        &self.verification_code
    }

    pub fn md5_hash(&self) -> &[u8; DIGEST_LEN] {
        &self.md5_hash
    }

    /// Full wire encoding: length byte, text bytes, nonce, digest.
    pub fn encoded(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(ENCODED_OVERHEAD + self.text.len());
        buf.push(self.text.len() as u8);
        buf.extend_from_slice(self.text.as_bytes());
        buf.extend_from_slice(&self.verification_code);
        buf.extend_from_slice(&self.md5_hash);
        buf
    }

    /// Encoding with the trailing digest omitted, as fed to MD5 when this
    /// chat is the newest member of a hash window.
    pub(crate) fn preimage(&self) -> Vec<u8> {
        let mut buf = self.encoded();
        buf.truncate(buf.len() - DIGEST_LEN);
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_size_is_overhead_plus_text() {
        for text in ["", "a", "hello there", "ол\u{10348}"] {
            let chat = Chat::new(text.to_owned(), [7u8; NONCE_LEN], [9u8; DIGEST_LEN]);
            assert_eq!(chat.encoded().len(), ENCODED_OVERHEAD + text.len());
        }
    }

    #[test]
    fn preimage_drops_exactly_the_digest() {
        let chat = Chat::new("msg".to_owned(), [1u8; NONCE_LEN], [2u8; DIGEST_LEN]);
        let encoded = chat.encoded();
        let preimage = chat.preimage();
        assert_eq!(&encoded[..encoded.len() - DIGEST_LEN], &preimage[..]);
    }

    #[test]
    fn equality_is_structural() {
        let a = Chat::from_wire("x".to_owned(), [1u8; NONCE_LEN], [2u8; DIGEST_LEN]);
        let b = Chat::from_wire("x".to_owned(), [1u8; NONCE_LEN], [2u8; DIGEST_LEN]);
        let c = Chat::from_wire("x".to_owned(), [3u8; NONCE_LEN], [2u8; DIGEST_LEN]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
