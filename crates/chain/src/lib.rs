//! Chat chain primitives: the `Chat` record, history validation and the
//! MD5 proof-of-work search.
//!
//! The chain itself lives behind the [`Ledger`] handle. Everything here is
//! synchronous; the node offloads mining onto a blocking executor so the
//! search never starves network tasks.

mod chat;
mod ledger;
mod miner;

pub use chat::{Chat, DIGEST_LEN, ENCODED_OVERHEAD, MAX_TEXT_BYTES, NONCE_LEN};
pub use ledger::{verify_history, Ledger, WINDOW};
