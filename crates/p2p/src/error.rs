use std::io;
use std::net::Ipv4Addr;

use thiserror::Error;

/// Errors raised while framing or routing peer traffic.
///
/// Any of these terminates the connection it occurred on and nothing else;
/// the node keeps running.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("unknown message tag {0:#04x}")]
    UnknownTag(u8),
    #[error("text field is not valid utf-8")]
    InvalidUtf8,
    #[error("peer {0} not found")]
    UnknownPeer(Ipv4Addr),
}
