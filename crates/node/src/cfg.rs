use std::net::Ipv4Addr;

use p2p::P2pConfig;

/// High level runtime configuration for the node.
#[derive(Clone, Debug)]
pub struct NodeConfig {
    /// Address the TCP listener binds to.
    pub host_ip: Ipv4Addr,
    /// Mesh port, used for listening and dialing alike.
    pub port: u16,
    /// Operator identity stamped on log lines; never put on the wire.
    pub group_id: Option<String>,
    /// Peer dialed once at startup.
    pub seed: Option<Ipv4Addr>,
    /// Publicly routable address of this node, never dialed.
    pub advertised_ip: Option<Ipv4Addr>,
    /// Headless operation: no console, logs to stdout.
    pub server_mode: bool,
}

impl NodeConfig {
    /// Projection consumed by the transport layer.
    pub fn p2p(&self) -> P2pConfig {
        P2pConfig {
            host_ip: self.host_ip,
            port: self.port,
            seed: self.seed,
            advertised_ip: self.advertised_ip,
            ..P2pConfig::default()
        }
    }
}
