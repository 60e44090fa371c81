//! GoldSrc game servers (Half-Life Dedicated Server instances).
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{Result, SrcQueryError};
use crate::packet::info::ServerInfo;
use crate::packet::player::Player;
use crate::server::{self, HostEndpoint};
use crate::socket::GoldSrcSocket;

/// A GoldSrc game server: queries and connectionless RCON.
///
/// GoldSrc RCON does not pre-authenticate connections;
/// [rcon_auth](Self::rcon_auth) stores the password and probes it with an
/// empty command.
#[derive(Debug)]
pub struct GoldSrcServer {
    endpoint: HostEndpoint,
    socket: GoldSrcSocket,
    is_hltv: bool,
    challenge: Option<i32>,
    rcon_password: Option<String>,
}

impl GoldSrcServer {
    /// Resolves `address` (`"host:port"`) and opens the query socket.
    pub async fn connect(address: &str) -> Result<Self> {
        Self::connect_with(address, false).await
    }

    /// Like [connect](Self::connect), for HLTV relay instances. HLTV
    /// behaves slightly differently for RCON commands; this flag increases
    /// compatibility.
    pub async fn connect_hltv(address: &str) -> Result<Self> {
        Self::connect_with(address, true).await
    }

    async fn connect_with(address: &str, is_hltv: bool) -> Result<Self> {
        let endpoint = HostEndpoint::resolve(address).await?;
        let socket = GoldSrcSocket::connect(endpoint.current(), is_hltv).await?;

        Ok(GoldSrcServer {
            endpoint,
            socket,
            is_hltv,
            challenge: None,
            rcon_password: None,
        })
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.socket.set_timeout(timeout);
    }

    /// Switches to the next resolved address of the host and re-opens the
    /// socket. Returns whether the rotation wrapped around.
    pub async fn rotate_ip(&mut self) -> Result<bool> {
        let wrapped = self.endpoint.rotate();
        self.socket = GoldSrcSocket::connect(self.endpoint.current(), self.is_hltv).await?;
        self.challenge = None;
        Ok(wrapped)
    }

    pub async fn server_info(&mut self) -> Result<ServerInfo> {
        server::server_info(&mut self.socket).await
    }

    pub async fn players(&mut self) -> Result<HashMap<String, Player>> {
        server::players(&mut self.socket, &mut self.challenge).await
    }

    pub async fn rules(&mut self) -> Result<HashMap<String, String>> {
        server::rules(&mut self.socket, &mut self.challenge).await
    }

    /// Round-trip time of an info query.
    pub async fn update_ping(&mut self) -> Result<Duration> {
        server::update_ping(&mut self.socket).await
    }

    /// Stores the RCON password and probes it with an empty command.
    /// Returns false when the server rejects it.
    pub async fn rcon_auth(&mut self, password: &str) -> Result<bool> {
        self.rcon_password = Some(password.to_string());

        match self.socket.rcon_exec(password, "").await {
            Ok(_) => Ok(true),
            Err(SrcQueryError::RconNoAuth) => {
                self.rcon_password = None;
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Executes `command` on the server via RCON.
    pub async fn rcon_exec(&mut self, command: &str) -> Result<String> {
        let password = self
            .rcon_password
            .clone()
            .ok_or(SrcQueryError::RconNoAuth)?;

        let response = self.socket.rcon_exec(&password, command).await?;
        Ok(response.trim().to_string())
    }
}
