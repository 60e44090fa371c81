//! Server rules replies (S2A_RULES).
use std::collections::HashMap;

use crate::buffer::ByteBuffer;
use crate::error::Result;

/// Decodes a S2A_RULES reply body into a key/value map.
///
/// The leading rule count is advisory; pairs are read until the buffer is
/// exhausted. Some GoldSrc servers truncate the final pair mid-string, so
/// an underflow inside a pair ends the list instead of failing the whole
/// reply.
pub fn decode(data: &mut ByteBuffer) -> Result<HashMap<String, String>> {
    data.get_short()?;

    let mut rules = HashMap::new();
    while data.remaining() > 0 {
        let key = match data.get_string() {
            Ok(key) => key,
            Err(_) => {
                log::debug!("dropping truncated trailing rule");
                break;
            }
        };
        let value = match data.get_string() {
            Ok(value) => value,
            Err(_) => {
                log::debug!("dropping truncated trailing rule \"{key}\"");
                break;
            }
        };
        rules.insert(key, value);
    }

    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_key_value_pairs() {
        let mut body = 2u16.to_le_bytes().to_vec();
        body.extend_from_slice(b"mp_falldamage\x001\0sv_cheats\x000\0");

        let rules = decode(&mut ByteBuffer::wrap(body)).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules["mp_falldamage"], "1");
        assert_eq!(rules["sv_cheats"], "0");
    }

    #[test]
    fn tolerates_truncated_trailing_pair() {
        let mut body = 2u16.to_le_bytes().to_vec();
        body.extend_from_slice(b"sv_gravity\x00800\0mp_timeli");

        let rules = decode(&mut ByteBuffer::wrap(body)).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules["sv_gravity"], "800");
    }
}
