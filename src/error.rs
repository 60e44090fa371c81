use thiserror::Error;

/// Shorthand for results carrying a [SrcQueryError].
pub type Result<T> = std::result::Result<T, SrcQueryError>;

/// Any failure the library surfaces to its callers.
///
/// Callers are expected to branch on the variant: [`Timeout`](Self::Timeout)
/// is worth retrying (bounded), [`RconNoAuth`](Self::RconNoAuth) asks for
/// re-authentication, [`RconBan`](Self::RconBan) is terminal for the target
/// and the format errors indicate a protocol/version mismatch rather than
/// transient loss.
#[derive(Debug, Error)]
pub enum SrcQueryError {
    /// A transport read or write did not complete within the configured
    /// timeout.
    #[error("request timed out")]
    Timeout(#[from] tokio::time::error::Elapsed),

    /// A read went past the end of the valid packet data.
    #[error("unexpected end of packet data")]
    BufferUnderflow,

    /// Received bytes failed a structural check.
    #[error("malformed packet: {0}")]
    PacketFormat(String),

    /// The header byte of a received packet matches no known packet kind.
    #[error("unknown packet with header {0:#04x}")]
    UnknownPacketHeader(u8),

    /// A connection-oriented transport was reset by the peer mid-read.
    #[error("connection reset by peer")]
    ConnectionReset,

    /// An RCON command was issued without (or after losing) authentication.
    #[error("RCON connection not authenticated")]
    RconNoAuth,

    /// The server reports this address as banned.
    #[error("banned by the server")]
    RconBan,

    #[error("failed to bind local socket: {0}")]
    FailedPortBind(std::io::Error),

    #[error("could not connect to host: {0}")]
    UnreachableHost(std::io::Error),

    #[error("could not resolve address: {0}")]
    AddressResolution(String),

    #[error("failed to send packet: {0}")]
    SendError(std::io::Error),

    #[error("failed to receive packet: {0}")]
    ReceiveError(std::io::Error),

    /// A wire string was not valid UTF-8.
    #[error("invalid string in packet: {0}")]
    InvalidString(#[from] std::str::Utf8Error),
}
