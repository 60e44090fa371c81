//! Server information replies (S2A_INFO2 and the deprecated
//! S2A_INFO_DETAILED format).
use crate::buffer::ByteBuffer;
use crate::error::Result;

/// Extra-data-flag bits of S2A_INFO2. Each bit gates the presence of one
/// optional trailing field; they are tested independently, in wire order.
const EDF_GAME_ID: u8 = 0x01;
const EDF_SERVER_ID: u8 = 0x10;
const EDF_SERVER_TAGS: u8 = 0x20;
const EDF_SOURCE_TV: u8 = 0x40;
const EDF_GAME_PORT: u8 = 0x80;

/// Server information as reported by an info query.
///
/// Fields only present in one of the two reply formats (or gated behind
/// the extra-data flag) are `Option`s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerInfo {
    /// Network protocol version
    pub network_version: u8,
    /// Server hostname
    pub server_name: String,
    /// Current map
    pub map_name: String,
    /// Location of the server files
    pub game_dir: String,
    /// Name of the game
    pub game_description: String,
    /// Steam application ID (S2A_INFO2 only)
    pub app_id: Option<u16>,
    /// Current players
    pub player_count: u8,
    /// Max players
    pub max_players: u8,
    /// Current bots
    pub bot_count: u8,
    /// `d` dedicated, `l` listen, `p` SourceTV relay
    pub dedicated: char,
    /// `l` Linux, `w` Windows, `o` Mac
    pub operating_system: char,
    pub password_protected: bool,
    /// Whether the server is VAC secured
    pub secure: bool,
    /// Game version string (S2A_INFO2 only)
    pub game_version: Option<String>,
    /// Game port, when it differs from the query port
    pub server_port: Option<u16>,
    /// 64-bit Steam ID of the server
    pub server_id: Option<u64>,
    /// SourceTV spectator port
    pub tv_port: Option<u16>,
    /// SourceTV name
    pub tv_name: Option<String>,
    /// Server tags, comma separated
    pub server_tags: Option<String>,
    /// Full 64-bit game ID
    pub game_id: Option<u64>,
    /// Server address string (S2A_INFO_DETAILED only)
    pub server_ip: Option<String>,
    /// Mod data of old GoldSrc servers running a modification
    pub mod_info: Option<ModInfo>,
}

/// Mod description block of the deprecated S2A_INFO_DETAILED format.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModInfo {
    pub url_info: String,
    pub url_dl: String,
    pub mod_version: Option<i32>,
    pub mod_size: Option<i32>,
    pub sv_only: Option<bool>,
    pub cl_dll: Option<bool>,
}

fn read_u64_halves(data: &mut ByteBuffer) -> Result<u64> {
    let lo = data.get_unsigned_long()? as u64;
    let hi = data.get_unsigned_long()? as u64;
    Ok(lo | (hi << 32))
}

/// Decodes a S2A_INFO2 reply body (everything after the header byte).
pub fn decode_info2(data: &mut ByteBuffer) -> Result<ServerInfo> {
    let mut info = ServerInfo {
        network_version: data.get_byte()?,
        server_name: data.get_string()?,
        map_name: data.get_string()?,
        game_dir: data.get_string()?,
        game_description: data.get_string()?,
        app_id: Some(data.get_short()?),
        player_count: data.get_byte()?,
        max_players: data.get_byte()?,
        bot_count: data.get_byte()?,
        dedicated: data.get_byte()? as char,
        operating_system: data.get_byte()? as char,
        password_protected: data.get_byte()? == 1,
        secure: data.get_byte()? == 1,
        game_version: Some(data.get_string()?),
        ..ServerInfo::default()
    };

    if data.remaining() > 0 {
        let edf = data.get_byte()?;

        if edf & EDF_GAME_PORT != 0 {
            info.server_port = Some(data.get_short()?);
        }
        if edf & EDF_SERVER_ID != 0 {
            info.server_id = Some(read_u64_halves(data)?);
        }
        if edf & EDF_SOURCE_TV != 0 {
            info.tv_port = Some(data.get_short()?);
            info.tv_name = Some(data.get_string()?);
        }
        if edf & EDF_SERVER_TAGS != 0 {
            info.server_tags = Some(data.get_string()?);
        }
        if edf & EDF_GAME_ID != 0 {
            info.game_id = Some(read_u64_halves(data)?);
        }
    }

    Ok(info)
}

/// Decodes the S2A_INFO_DETAILED reply body used by GoldSrc servers from
/// before 10/24/2008.
pub fn decode_detailed(data: &mut ByteBuffer) -> Result<ServerInfo> {
    let mut info = ServerInfo {
        server_ip: Some(data.get_string()?),
        server_name: data.get_string()?,
        map_name: data.get_string()?,
        game_dir: data.get_string()?,
        game_description: data.get_string()?,
        player_count: data.get_byte()?,
        max_players: data.get_byte()?,
        network_version: data.get_byte()?,
        dedicated: data.get_byte()? as char,
        operating_system: data.get_byte()? as char,
        password_protected: data.get_byte()? == 1,
        ..ServerInfo::default()
    };

    let is_mod = data.get_byte()? == 1;
    if is_mod {
        let mut mod_info = ModInfo {
            url_info: data.get_string()?,
            url_dl: data.get_string()?,
            ..ModInfo::default()
        };
        data.get_byte()?; // a stray NUL between the URLs and the numbers

        if data.remaining() == 12 {
            mod_info.mod_version = Some(data.get_long()?);
            mod_info.mod_size = Some(data.get_long()?);
            mod_info.sv_only = Some(data.get_byte()? == 1);
            mod_info.cl_dll = Some(data.get_byte()? == 1);
            info.secure = data.get_byte()? == 1;
            info.bot_count = data.get_byte()?;
        }
        info.mod_info = Some(mod_info);
    } else {
        info.secure = data.get_byte()? == 1;
        info.bot_count = data.get_byte()?;
    }

    Ok(info)
}
