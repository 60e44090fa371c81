//! Source RCON TCP frames.
//!
//! Wire format: `length:i32 | request_id:i32 | type:i32 | body | 0x00 0x00`,
//! all little-endian, with `length` counting everything after itself.
use crate::buffer::ByteBuffer;
use crate::error::{Result, SrcQueryError};

pub const SERVERDATA_AUTH: i32 = 3;
pub const SERVERDATA_AUTH_RESPONSE: i32 = 2;
pub const SERVERDATA_EXECCOMMAND: i32 = 2;
pub const SERVERDATA_RESPONSE_VALUE: i32 = 0;

/// A client-to-server RCON frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RconRequest {
    /// SERVERDATA_AUTH
    Auth { request_id: i32, password: String },
    /// SERVERDATA_EXECCOMMAND
    Exec { request_id: i32, command: String },
    /// An empty SERVERDATA_RESPONSE_VALUE request. The server echoes it as
    /// an empty response after everything queued before it, which marks
    /// the end of a multi-packet reply.
    Terminator { request_id: i32 },
}

impl RconRequest {
    pub fn request_id(&self) -> i32 {
        match self {
            RconRequest::Auth { request_id, .. }
            | RconRequest::Exec { request_id, .. }
            | RconRequest::Terminator { request_id } => *request_id,
        }
    }

    /// Serializes this request into a length-prefixed TCP frame.
    pub fn encode(&self) -> Vec<u8> {
        let (kind, body) = match self {
            RconRequest::Auth { password, .. } => (SERVERDATA_AUTH, password.as_str()),
            RconRequest::Exec { command, .. } => (SERVERDATA_EXECCOMMAND, command.as_str()),
            RconRequest::Terminator { .. } => (SERVERDATA_RESPONSE_VALUE, ""),
        };

        // id + type + body + two trailing NULs
        let length = body.len() as i32 + 10;
        let mut frame = Vec::with_capacity(body.len() + 14);
        frame.extend_from_slice(&length.to_le_bytes());
        frame.extend_from_slice(&self.request_id().to_le_bytes());
        frame.extend_from_slice(&kind.to_le_bytes());
        frame.extend_from_slice(body.as_bytes());
        frame.extend_from_slice(&[0, 0]);
        frame
    }

    /// The packet kind, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            RconRequest::Auth { .. } => "SERVERDATA_AUTH",
            RconRequest::Exec { .. } => "SERVERDATA_EXECCOMMAND",
            RconRequest::Terminator { .. } => "RCON_TERMINATOR",
        }
    }
}

/// A server-to-client RCON frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RconResponse {
    /// SERVERDATA_AUTH_RESPONSE; `request_id` echoes the auth request on
    /// success and is -1 on a wrong password.
    Auth { request_id: i32 },
    /// SERVERDATA_RESPONSE_VALUE carrying (part of) a command's output.
    Exec { request_id: i32, body: String },
}

impl RconResponse {
    pub fn request_id(&self) -> i32 {
        match self {
            RconResponse::Auth { request_id } | RconResponse::Exec { request_id, .. } => {
                *request_id
            }
        }
    }

    /// Decodes a reply frame, without its length prefix.
    pub fn decode(raw: &[u8]) -> Result<RconResponse> {
        let mut data = ByteBuffer::wrap(raw.to_vec());
        let request_id = data.get_long()?;
        let kind = data.get_long()?;
        let body = data.get_string()?;

        match kind {
            SERVERDATA_AUTH_RESPONSE => Ok(RconResponse::Auth { request_id }),
            SERVERDATA_RESPONSE_VALUE => Ok(RconResponse::Exec { request_id, body }),
            other => Err(SrcQueryError::PacketFormat(format!(
                "unknown RCON response type {other}"
            ))),
        }
    }

    /// The packet kind, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            RconResponse::Auth { .. } => "SERVERDATA_AUTH_RESPONSE",
            RconResponse::Exec { .. } => "SERVERDATA_RESPONSE_VALUE",
        }
    }
}

/// Builds a reply frame as a server would, length prefix included. Shared
/// with the integration tests' mock RCON server.
pub fn encode_response(request_id: i32, kind: i32, body: &str) -> Vec<u8> {
    let length = body.len() as i32 + 10;
    let mut frame = Vec::with_capacity(body.len() + 14);
    frame.extend_from_slice(&length.to_le_bytes());
    frame.extend_from_slice(&request_id.to_le_bytes());
    frame.extend_from_slice(&kind.to_le_bytes());
    frame.extend_from_slice(body.as_bytes());
    frame.extend_from_slice(&[0, 0]);
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_request_frame_layout() {
        let frame = RconRequest::Auth {
            request_id: 0x1234,
            password: "secret".to_string(),
        }
        .encode();

        assert_eq!(&frame[..4], &16i32.to_le_bytes());
        assert_eq!(&frame[4..8], &0x1234i32.to_le_bytes());
        assert_eq!(&frame[8..12], &SERVERDATA_AUTH.to_le_bytes());
        assert_eq!(&frame[12..18], b"secret");
        assert_eq!(&frame[18..], &[0, 0]);
    }

    #[test]
    fn terminator_is_an_empty_response_value_request() {
        let frame = RconRequest::Terminator { request_id: 7 }.encode();
        assert_eq!(&frame[..4], &10i32.to_le_bytes());
        assert_eq!(&frame[8..12], &SERVERDATA_RESPONSE_VALUE.to_le_bytes());
        assert_eq!(frame.len(), 14);
    }

    #[test]
    fn exec_request_round_trips_as_response_value() {
        // requests and responses share the frame layout, so an encoded
        // terminator must decode as an empty response value
        let frame = RconRequest::Terminator { request_id: 42 }.encode();
        let decoded = RconResponse::decode(&frame[4..]).unwrap();
        assert_eq!(
            decoded,
            RconResponse::Exec {
                request_id: 42,
                body: String::new()
            }
        );
    }

    #[test]
    fn decodes_auth_response() {
        let frame = encode_response(0x1234, SERVERDATA_AUTH_RESPONSE, "");
        let decoded = RconResponse::decode(&frame[4..]).unwrap();
        assert_eq!(decoded, RconResponse::Auth { request_id: 0x1234 });
    }

    #[test]
    fn decodes_exec_response_body() {
        let frame = encode_response(99, SERVERDATA_RESPONSE_VALUE, "hostname: srcds");
        let decoded = RconResponse::decode(&frame[4..]).unwrap();
        assert_eq!(
            decoded,
            RconResponse::Exec {
                request_id: 99,
                body: "hostname: srcds".to_string()
            }
        );
    }

    #[test]
    fn unknown_response_type_is_rejected() {
        let frame = encode_response(1, 5, "");
        assert!(matches!(
            RconResponse::decode(&frame[4..]),
            Err(SrcQueryError::PacketFormat(_))
        ));
    }
}
