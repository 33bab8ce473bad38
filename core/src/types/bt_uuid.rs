// Bluetooth UUID helpers on top of `uuid::Uuid`

use uuid::Uuid;

/// Length of the canonical hyphenated UUID string
pub const UUID_STRING_LEN: usize = 36;

/// Length of a UUID in bytes
pub const UUID_LEN: usize = 16;

const BASE_UUID: u128 = 0x0000_0000_0000_1000_8000_0080_5f9b_34fb;

/// Hearing Aid service (ASHA)
pub const HEARING_AID_UUID: Uuid = from_16bit(0xFDF0);

/// Published Audio Capabilities service, marks LE audio devices
pub const LE_AUDIO_UUID: Uuid = from_16bit(0x184E);

/// Expand a 16-bit assigned number onto the Bluetooth base UUID
pub const fn from_16bit(short: u16) -> Uuid {
    Uuid::from_u128(BASE_UUID | ((short as u128) << 96))
}

/// Expand a 32-bit assigned number onto the Bluetooth base UUID
pub const fn from_32bit(short: u32) -> Uuid {
    Uuid::from_u128(BASE_UUID | ((short as u128) << 96))
}

/// Parse the 4, 8 or 36 character forms used in Bluetooth tooling
pub fn parse_bt_uuid(s: &str) -> Option<Uuid> {
    match s.len() {
        4 => u16::from_str_radix(s, 16).ok().map(from_16bit),
        8 => u32::from_str_radix(s, 16).ok().map(from_32bit),
        UUID_STRING_LEN => Uuid::try_parse(s).ok(),
        _ => None,
    }
}

/// Canonical 36-character lowercase form
pub fn to_canonical_string(uuid: &Uuid) -> String {
    uuid.hyphenated().to_string()
}
