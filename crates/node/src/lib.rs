//! Node orchestration: message dispatch, peer discovery, mined-chat
//! broadcast with majority confirmation, and the operator console.

pub mod archive;
pub mod cfg;
pub mod repl;
pub mod service;
pub mod tasks;

pub use archive::ArchiveLog;
pub use cfg::NodeConfig;
pub use service::ChatService;
pub use tasks::{run_discovery_task, run_peer_event_loop};
