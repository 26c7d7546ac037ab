//! Binary framing for the wire protocol.
//!
//! Frames open with a one-byte type tag. Counts are 4-byte big-endian;
//! chat and notification texts carry a single length byte. Encoding is
//! total and by value so callers can push a whole frame with one write;
//! decoding reads field by field from the stream and treats a short read
//! as fatal for the connection.

use std::net::Ipv4Addr;

use chain::Chat;
use tokio::io::AsyncReadExt;

use crate::error::NetworkError;
use crate::types::Message;

const TAG_PEER_REQUEST: u8 = 0x01;
const TAG_PEER_LIST: u8 = 0x02;
const TAG_ARCHIVE_REQUEST: u8 = 0x03;
const TAG_ARCHIVE_RESPONSE: u8 = 0x04;
const TAG_NOTIFICATION: u8 = 0x05;

/// Encode a message into a single frame.
///
/// Notification texts longer than 255 bytes are a caller bug; the REPL and
/// the dispatcher both enforce the bound before a message is built.
pub fn encode_message(message: &Message) -> Vec<u8> {
    match message {
        Message::PeerRequest => vec![TAG_PEER_REQUEST],
        Message::PeerList(ips) => {
            let mut buf = Vec::with_capacity(5 + ips.len() * 4);
            buf.push(TAG_PEER_LIST);
            buf.extend_from_slice(&(ips.len() as u32).to_be_bytes());
            for ip in ips {
                buf.extend_from_slice(&ip.octets());
            }
            buf
        }
        Message::ArchiveRequest => vec![TAG_ARCHIVE_REQUEST],
        Message::ArchiveResponse(history) => {
            let mut buf = vec![TAG_ARCHIVE_RESPONSE];
            buf.extend_from_slice(&(history.len() as u32).to_be_bytes());
            for chat in history {
                buf.extend_from_slice(&chat.encoded());
            }
            buf
        }
        Message::Notification(text) => {
            debug_assert!(text.len() <= chain::MAX_TEXT_BYTES);
            let mut buf = Vec::with_capacity(2 + text.len());
            buf.push(TAG_NOTIFICATION);
            buf.push(text.len() as u8);
            buf.extend_from_slice(text.as_bytes());
            buf
        }
    }
}

/// Read one message from the stream, suspending until its fields arrive.
pub async fn read_message<R>(reader: &mut R) -> Result<Message, NetworkError>
where
    R: AsyncReadExt + Unpin,
{
    let tag = reader.read_u8().await?;
    match tag {
        TAG_PEER_REQUEST => Ok(Message::PeerRequest),
        TAG_PEER_LIST => {
            let count = reader.read_u32().await?;
            let mut ips = Vec::new();
            for _ in 0..count {
                let mut octets = [0u8; 4];
                reader.read_exact(&mut octets).await?;
                ips.push(Ipv4Addr::from(octets));
            }
            Ok(Message::PeerList(ips))
        }
        TAG_ARCHIVE_REQUEST => Ok(Message::ArchiveRequest),
        TAG_ARCHIVE_RESPONSE => {
            let count = reader.read_u32().await?;
            let mut history = Vec::new();
            for _ in 0..count {
                history.push(read_chat(reader).await?);
            }
            Ok(Message::ArchiveResponse(history))
        }
        TAG_NOTIFICATION => Ok(Message::Notification(read_text(reader).await?)),
        other => Err(NetworkError::UnknownTag(other)),
    }
}

async fn read_chat<R>(reader: &mut R) -> Result<Chat, NetworkError>
where
    R: AsyncReadExt + Unpin,
{
    let text = read_text(reader).await?;
    let mut verification_code = [0u8; chain::NONCE_LEN];
    reader.read_exact(&mut verification_code).await?;
    let mut md5_hash = [0u8; chain::DIGEST_LEN];
    reader.read_exact(&mut md5_hash).await?;
    Ok(Chat::from_wire(text, verification_code, md5_hash))
}

async fn read_text<R>(reader: &mut R) -> Result<String, NetworkError>
where
    R: AsyncReadExt + Unpin,
{
    let len = reader.read_u8().await? as usize;
    let mut bytes = vec![0u8; len];
    reader.read_exact(&mut bytes).await?;
    String::from_utf8(bytes).map_err(|_| NetworkError::InvalidUtf8)
}
