//! Source game servers (SrcDS instances).
use std::collections::HashMap;
use std::time::Duration;

use rand::Rng;

use crate::error::{Result, SrcQueryError};
use crate::packet::info::ServerInfo;
use crate::packet::player::Player;
use crate::packet::rcon::{RconRequest, RconResponse};
use crate::server::{self, HostEndpoint};
use crate::socket::{RconSocket, SourceSocket};

/// How many consecutive empty response fragments mark the end of a
/// multi-packet RCON reply. The terminator echo plus the stream's natural
/// empty tail make two; this is a community workaround for a protocol
/// ambiguity, not a documented guarantee.
const RESPONSE_END_EMPTY_RUN: usize = 2;

/// A Source game server: UDP queries plus stateful TCP RCON.
#[derive(Debug)]
pub struct SourceServer {
    endpoint: HostEndpoint,
    socket: SourceSocket,
    rcon: RconSocket,
    challenge: Option<i32>,
    /// The request id of the authenticated RCON session, if any.
    rcon_request_id: Option<i32>,
}

impl SourceServer {
    /// Resolves `address` (`"host:port"`) and opens the query socket. The
    /// RCON TCP connection is only opened on the first RCON request.
    pub async fn connect(address: &str) -> Result<Self> {
        let endpoint = HostEndpoint::resolve(address).await?;
        let socket = SourceSocket::connect(endpoint.current()).await?;
        let rcon = RconSocket::new(endpoint.current());

        Ok(SourceServer {
            endpoint,
            socket,
            rcon,
            challenge: None,
            rcon_request_id: None,
        })
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.socket.set_timeout(timeout);
        self.rcon.set_timeout(timeout);
    }

    /// Switches to the next resolved address of the host and re-opens the
    /// sockets. Returns whether the rotation wrapped around.
    pub async fn rotate_ip(&mut self) -> Result<bool> {
        let wrapped = self.endpoint.rotate();
        self.socket = SourceSocket::connect(self.endpoint.current()).await?;
        self.rcon = RconSocket::new(self.endpoint.current());
        self.challenge = None;
        self.rcon_request_id = None;
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

    /// Authenticates the RCON connection.
    ///
    /// The server echoes the request id back on success and -1 on a wrong
    /// password; a connection closed before any reply means this address
    /// is banned.
    pub async fn rcon_auth(&mut self, password: &str) -> Result<bool> {
        let request_id = rand::thread_rng().gen_range(0..=0xffff);

        self.rcon
            .send(&RconRequest::Auth {
                request_id,
                password: password.to_string(),
            })
            .await?;

        // the first reply is an empty response-value echo
        if self.rcon.get_reply().await?.is_none() {
            return Err(SrcQueryError::RconBan);
        }
        let reply = self
            .rcon
            .get_reply()
            .await?
            .ok_or(SrcQueryError::RconBan)?;

        let authenticated = reply.request_id() == request_id;
        self.rcon_request_id = authenticated.then_some(request_id);

        Ok(authenticated)
    }

    /// Remotely executes `command` on the server, concatenating a
    /// multi-packet response.
    ///
    /// The protocol has no end-of-response marker, so after the first
    /// non-empty fragment a terminator request is sent and fragments are
    /// collected until [RESPONSE_END_EMPTY_RUN] consecutive empty ones
    /// arrive.
    pub async fn rcon_exec(&mut self, command: &str) -> Result<String> {
        let request_id = self.rcon_request_id.ok_or(SrcQueryError::RconNoAuth)?;

        self.rcon
            .send(&RconRequest::Exec {
                request_id,
                command: command.to_string(),
            })
            .await?;

        let mut parts: Vec<String> = Vec::new();
        let mut is_multi = false;
        loop {
            let body = match self.rcon.get_reply().await? {
                Some(RconResponse::Exec { body, .. }) => body,
                // an auth response mid-stream (or a closed connection)
                // means the session lost its authentication
                Some(RconResponse::Auth { .. }) | None => {
                    self.rcon_request_id = None;
                    return Err(SrcQueryError::RconNoAuth);
                }
            };

            if !is_multi && !body.is_empty() {
                is_multi = true;
                self.rcon.send(&RconRequest::Terminator { request_id }).await?;
            }
            parts.push(body);

            if !is_multi {
                break;
            }
            if parts.len() >= RESPONSE_END_EMPTY_RUN
                && parts[parts.len() - RESPONSE_END_EMPTY_RUN..]
                    .iter()
                    .all(String::is_empty)
            {
                break;
            }
        }

        Ok(parts.concat().trim().to_string())
    }

    /// Closes the RCON TCP channel. The UDP query socket is unaffected;
    /// the session has to authenticate again after reconnecting.
    pub fn disconnect(&mut self) {
        self.rcon.close();
        self.rcon_request_id = None;
    }
}
