//! Player list replies (S2A_PLAYER).
use std::collections::HashMap;

use crate::buffer::ByteBuffer;
use crate::error::Result;

/// One player record of a S2A_PLAYER reply.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    /// Index of the player on the server
    pub index: u8,
    pub name: String,
    /// Current score (kills, captures, ...)
    pub score: i32,
    /// Time in seconds the player is connected
    pub connect_time: f32,
}

/// Decodes a S2A_PLAYER reply body into a map keyed by player name.
///
/// The leading count byte is advisory only; records are read until the
/// buffer is exhausted. On a name collision the last record wins.
pub fn decode(data: &mut ByteBuffer) -> Result<HashMap<String, Player>> {
    data.get_byte()?;

    let mut players = HashMap::new();
    while data.remaining() > 0 {
        let player = Player {
            index: data.get_byte()?,
            name: data.get_string()?,
            score: data.get_long()?,
            connect_time: data.get_float()?,
        };
        players.insert(player.name.clone(), player);
    }

    Ok(players)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(index: u8, name: &str, score: i32, time: f32) -> Vec<u8> {
        let mut raw = vec![index];
        raw.extend_from_slice(name.as_bytes());
        raw.push(0);
        raw.extend_from_slice(&score.to_le_bytes());
        raw.extend_from_slice(&time.to_le_bytes());
        raw
    }

    #[test]
    fn decodes_all_records() {
        let mut body = vec![2];
        body.extend_from_slice(&record(0, "sniper_main", 23, 1200.5));
        body.extend_from_slice(&record(1, "pootis", -2, 64.25));

        let players = decode(&mut ByteBuffer::wrap(body)).unwrap();
        assert_eq!(players.len(), 2);
        assert_eq!(players["sniper_main"].score, 23);
        assert_eq!(players["pootis"].index, 1);
        assert_eq!(players["pootis"].connect_time, 64.25);
    }

    #[test]
    fn last_record_wins_on_name_collision() {
        let mut body = vec![2];
        body.extend_from_slice(&record(0, "Player", 1, 10.0));
        body.extend_from_slice(&record(1, "Player", 2, 20.0));

        let players = decode(&mut ByteBuffer::wrap(body)).unwrap();
        assert_eq!(players.len(), 1);
        assert_eq!(players["Player"].score, 2);
    }
}
