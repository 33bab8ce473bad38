// Service UUID list encoding
//
// Stored form: canonical 36-character UUID strings, each followed by a space.
// Raw form: consecutive 16-byte big-endian UUIDs.

use crate::types::bt_uuid::{to_canonical_string, UUID_LEN, UUID_STRING_LEN};
use crate::{Result, StorageError};
use uuid::Uuid;

pub fn join(uuids: &[Uuid]) -> String {
    let mut value = String::with_capacity(uuids.len() * (UUID_STRING_LEN + 1));
    for uuid in uuids {
        value.push_str(&to_canonical_string(uuid));
        value.push(' ');
    }
    value
}

/// Parse a stored list; any chunk that is not a full UUID fails the whole list
pub fn split(value: &str) -> Result<Vec<Uuid>> {
    value
        .split(' ')
        .filter(|chunk| !chunk.is_empty())
        .map(|chunk| {
            if chunk.len() != UUID_STRING_LEN {
                return Err(StorageError::Malformed(format!("bad UUID chunk {:?}", chunk)));
            }
            Uuid::try_parse(chunk)
                .map_err(|e| StorageError::Malformed(format!("bad UUID chunk {:?}: {}", chunk, e)))
        })
        .collect()
}

pub fn to_bytes(uuids: &[Uuid]) -> Vec<u8> {
    uuids.iter().flat_map(|uuid| *uuid.as_bytes()).collect()
}

pub fn from_bytes(bytes: &[u8]) -> Result<Vec<Uuid>> {
    if bytes.len() % UUID_LEN != 0 {
        return Err(StorageError::Malformed(format!(
            "{} bytes is not a list of UUIDs",
            bytes.len()
        )));
    }
    bytes
        .chunks(UUID_LEN)
        .map(|chunk| {
            Uuid::from_slice(chunk).map_err(|e| StorageError::Malformed(e.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::bt_uuid::{from_16bit, HEARING_AID_UUID, LE_AUDIO_UUID};

    #[test]
    fn test_join_split_preserves_order() {
        let list = vec![LE_AUDIO_UUID, HEARING_AID_UUID, from_16bit(0x110B)];
        let joined = join(&list);
        assert!(joined.starts_with("0000184e-0000-1000-8000-00805f9b34fb "));
        assert_eq!(split(&joined).unwrap(), list);
    }

    #[test]
    fn test_split_rejects_bad_chunk() {
        let value = format!("{} 0000110b-0000 ", to_canonical_string(&LE_AUDIO_UUID));
        assert!(matches!(split(&value), Err(StorageError::Malformed(_))));
        assert!(matches!(
            split("zzzzzzzz-zzzz-zzzz-zzzz-zzzzzzzzzzzz"),
            Err(StorageError::Malformed(_))
        ));
    }

    #[test]
    fn test_split_tolerates_extra_spaces() {
        let value = format!("  {}  ", to_canonical_string(&HEARING_AID_UUID));
        assert_eq!(split(&value).unwrap(), vec![HEARING_AID_UUID]);
        assert!(split("").unwrap().is_empty());
    }

    #[test]
    fn test_raw_bytes_are_big_endian() {
        let bytes = to_bytes(&[HEARING_AID_UUID]);
        assert_eq!(&bytes[..4], &[0x00, 0x00, 0xfd, 0xf0]);
        assert_eq!(from_bytes(&bytes).unwrap(), vec![HEARING_AID_UUID]);
        assert!(from_bytes(&bytes[..15]).is_err());
    }
}
