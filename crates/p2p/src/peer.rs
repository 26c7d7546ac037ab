use std::net::Ipv4Addr;

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::codec::{encode_message, read_message};
use crate::registry::Registry;
use crate::types::Message;

/// Run a freshly established connection.
///
/// The read loop owns the receive half and turns frames into events; the
/// write loop is the single writer for the socket, draining the per-peer
/// queue one whole frame at a time so concurrent senders can never
/// interleave bytes. Either loop exiting deregisters the peer; the halves
/// close when both loops have dropped them.
pub(crate) fn spawn_peer(stream: TcpStream, peer_ip: Ipv4Addr, registry: Registry, queue: usize) {
    let (reader, writer) = stream.into_split();
    let (tx, rx) = mpsc::channel(queue);
    let connection = registry.register(peer_ip, tx);
    tokio::spawn(read_loop(peer_ip, connection, registry.clone(), reader));
    tokio::spawn(write_loop(peer_ip, connection, registry, writer, rx));
}

async fn read_loop(peer_ip: Ipv4Addr, connection: u64, registry: Registry, mut reader: OwnedReadHalf) {
    loop {
        match read_message(&mut reader).await {
            Ok(message) => registry.emit_message(peer_ip, message),
            Err(err) => {
                debug!(%peer_ip, error = %err, "peer read loop exiting");
                registry.deregister(peer_ip, connection, err.to_string());
                break;
            }
        }
    }
}

async fn write_loop(
    peer_ip: Ipv4Addr,
    connection: u64,
    registry: Registry,
    mut writer: OwnedWriteHalf,
    mut rx: mpsc::Receiver<Message>,
) {
    while let Some(message) = rx.recv().await {
        let frame = encode_message(&message);
        if let Err(err) = writer.write_all(&frame).await {
            warn!(%peer_ip, error = %err, "failed to send message");
            registry.deregister(peer_ip, connection, err.to_string());
            break;
        }
        if let Err(err) = writer.flush().await {
            warn!(%peer_ip, error = %err, "failed to flush message");
            registry.deregister(peer_ip, connection, err.to_string());
            break;
        }
    }
}
