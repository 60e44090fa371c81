//! Pure Rust async client for the [Valve server query protocols](https://developer.valvesoftware.com/wiki/Server_queries),
//! the [Source RCON protocol](https://developer.valvesoftware.com/wiki/Source_RCON_Protocol)
//! and the master server discovery protocol, covering both GoldSrc and
//! Source engine servers.
pub mod buffer;
pub mod error;
pub mod packet;
pub mod server;
pub mod socket;

pub use crate::error::{Result, SrcQueryError};
pub use crate::packet::info::ServerInfo;
pub use crate::packet::player::Player;
pub use crate::packet::{Packet, Request};
pub use crate::server::goldsrc::GoldSrcServer;
pub use crate::server::master::MasterServer;
pub use crate::server::source::SourceServer;
