use std::net::Ipv4Addr;

use anyhow::{Context, Result};
use clap::Parser;
use node::repl::run_repl;
use node::{run_discovery_task, run_peer_event_loop, ArchiveLog, ChatService, NodeConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

const LOG_DIR: &str = "log";
const LOG_FILE: &str = "log/blockchain.log";

#[derive(Parser)]
#[command(author, version, about = "Decentralized chat over a proof-of-work chain")]
struct Cli {
    /// Address the TCP listener binds to.
    #[arg(long, default_value_t = Ipv4Addr::UNSPECIFIED)]
    host_ip: Ipv4Addr,
    /// Mesh port, used for listening and dialing alike.
    #[arg(long, default_value_t = p2p::DEFAULT_PORT)]
    port: u16,
    /// Operator identity stamped on log lines.
    #[arg(long, required_unless_present = "server")]
    id: Option<String>,
    /// Peer dialed once at startup.
    #[arg(long)]
    peer: Option<Ipv4Addr>,
    /// Publicly routable address of this node, never dialed.
    #[arg(long)]
    advertised_ip: Option<Ipv4Addr>,
    /// Run headless: no console, logs to stdout.
    #[arg(long)]
    server: bool,
}

impl Cli {
    fn into_config(self) -> NodeConfig {
        NodeConfig {
            host_ip: self.host_ip,
            port: self.port,
            group_id: self.id,
            seed: self.peer,
            advertised_ip: self.advertised_ip,
            server_mode: self.server,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.server)?;
    run_node(cli.into_config()).await
}

/// Server mode logs to stdout; interactive mode logs to a file so the
/// console stays usable as a prompt.
fn init_logging(server: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if server {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    } else {
        std::fs::create_dir_all(LOG_DIR).context("failed to create log directory")?;
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(LOG_FILE)
            .with_context(|| format!("failed to open {LOG_FILE}"))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .init();
    }
    Ok(())
}

async fn run_node(config: NodeConfig) -> Result<()> {
    let mesh = p2p::start_mesh(config.p2p())
        .await
        .context("failed to bind listen socket")?;
    let service = ChatService::new(chain::Ledger::new(), mesh.clone(), ArchiveLog::new());
    info!(
        id = config.group_id.as_deref().unwrap_or("server"),
        "node starting"
    );

    tokio::spawn(run_peer_event_loop(service.clone()));
    tokio::spawn(run_discovery_task(mesh));

    if config.server_mode {
        tokio::signal::ctrl_c().await?;
    } else {
        tokio::select! {
            result = run_repl(service) => result?,
            result = tokio::signal::ctrl_c() => result?,
        }
    }
    info!("shutting down");
    Ok(())
}
