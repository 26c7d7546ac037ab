use std::net::Ipv4Addr;

/// Port shared by every node in the mesh; outbound dials target it.
pub const DEFAULT_PORT: u16 = 51511;

/// Runtime configuration for the peer-to-peer stack.
#[derive(Clone, Debug)]
pub struct P2pConfig {
    /// Address the listener binds to.
    pub host_ip: Ipv4Addr,
    /// Listen port, also used when dialing peers.
    pub port: u16,
    /// Peer to dial once at startup.
    pub seed: Option<Ipv4Addr>,
    /// Publicly routable address of this node, never dialed.
    pub advertised_ip: Option<Ipv4Addr>,
    /// Messages queued per peer before sends start being dropped.
    pub outbound_queue: usize,
}

impl Default for P2pConfig {
    fn default() -> Self {
        Self {
            host_ip: Ipv4Addr::UNSPECIFIED,
            port: DEFAULT_PORT,
            seed: None,
            advertised_ip: None,
            outbound_queue: 64,
        }
    }
}
