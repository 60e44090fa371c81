//! Master servers enumerating publicly available game servers.
use std::collections::HashSet;
use std::net::SocketAddrV4;
use std::time::Duration;

use crate::error::{Result, SrcQueryError};
use crate::packet::{Packet, Request};
use crate::server::HostEndpoint;
use crate::socket::MasterServerSocket;

/// A Steam master server, used much like the in-game server browser to
/// enumerate available game servers, optionally narrowed down by filters.
#[derive(Debug)]
pub struct MasterServer {
    endpoint: HostEndpoint,
    socket: MasterServerSocket,
    retries: usize,
}

impl MasterServer {
    /// The master server address for GoldSrc games.
    pub const GOLDSRC_MASTER_SERVER: &'static str = "hl1master.steampowered.com:27011";
    /// The master server address for Source games.
    pub const SOURCE_MASTER_SERVER: &'static str = "hl2master.steampowered.com:27011";

    pub const REGION_US_EAST_COAST: u8 = 0x00;
    pub const REGION_US_WEST_COAST: u8 = 0x01;
    pub const REGION_SOUTH_AMERICA: u8 = 0x02;
    pub const REGION_EUROPE: u8 = 0x03;
    pub const REGION_ASIA: u8 = 0x04;
    pub const REGION_AUSTRALIA: u8 = 0x05;
    pub const REGION_MIDDLE_EAST: u8 = 0x06;
    pub const REGION_AFRICA: u8 = 0x07;
    pub const REGION_ALL: u8 = 0xff;

    /// How many consecutive timeouts per address before rotating, by
    /// default.
    const DEFAULT_RETRIES: usize = 3;

    /// Resolves `address` (`"host:port"`) and opens the socket.
    pub async fn connect(address: &str) -> Result<Self> {
        let endpoint = HostEndpoint::resolve(address).await?;
        let socket = MasterServerSocket::connect(endpoint.current()).await?;

        Ok(MasterServer {
            endpoint,
            socket,
            retries: Self::DEFAULT_RETRIES,
        })
    }

    /// Sets the number of consecutive request timeouts tolerated per
    /// address before rotating to the next one.
    pub fn set_retries(&mut self, retries: usize) {
        self.retries = retries.max(1);
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.socket.set_timeout(timeout);
    }

    async fn rotate_ip(&mut self) -> Result<bool> {
        let wrapped = self.endpoint.rotate();
        self.socket = MasterServerSocket::connect(self.endpoint.current()).await?;
        Ok(wrapped)
    }

    /// Returns the game servers matching `region` and `filter`.
    ///
    /// The list is fetched in batches, each request seeded with the last
    /// address of the previous batch, until the `0.0.0.0:0` sentinel ends
    /// the listing. Timeouts are retried up to the configured budget, then
    /// the next resolved master address is tried. Once the rotation wraps
    /// around the timeout propagates, unless `force` is set, which
    /// returns the servers collected so far.
    ///
    /// Note: receiving the unfiltered list takes many round trips; narrow
    /// it down with filters like `\type\d`, `\secure\1` or
    /// `\gamedir\<mod>` whenever possible.
    pub async fn get_servers(
        &mut self,
        region: u8,
        filter: &str,
        force: bool,
    ) -> Result<Vec<SocketAddrV4>> {
        let mut servers: Vec<SocketAddrV4> = Vec::new();
        let mut seed = "0.0.0.0:0".to_string();

        'rotation: loop {
            let mut fail_count = 0;

            loop {
                self.socket
                    .send(&Request::GetServers {
                        region,
                        start: seed.clone(),
                        filter: filter.to_string(),
                    })
                    .await?;

                match self.socket.get_reply().await {
                    Ok(Packet::ServerBatch(batch)) => {
                        fail_count = 0;
                        let mut finished = false;
                        for address in batch {
                            if address.ip().is_unspecified() && address.port() == 0 {
                                finished = true;
                            } else {
                                seed = address.to_string();
                                servers.push(address);
                            }
                        }
                        if finished {
                            break 'rotation;
                        }
                    }
                    Ok(other) => {
                        return Err(SrcQueryError::PacketFormat(format!(
                            "expected M2A_SERVER_BATCH, got {}",
                            other.kind()
                        )))
                    }
                    Err(SrcQueryError::Timeout(elapsed)) => {
                        fail_count += 1;
                        if fail_count < self.retries {
                            log::info!(
                                "Request to master server {} timed out, retrying...",
                                self.endpoint.current()
                            );
                            continue;
                        }
                        if self.rotate_ip().await? {
                            if force {
                                break 'rotation;
                            }
                            return Err(SrcQueryError::Timeout(elapsed));
                        }
                        log::info!(
                            "Request to master server failed, retrying {}...",
                            self.endpoint.current()
                        );
                        continue 'rotation;
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        let mut seen = HashSet::new();
        servers.retain(|address| seen.insert(*address));

        Ok(servers)
    }
}
