// Bluetooth device addresses
//
// A `RawAddress` is stored most-significant byte first, matching the order in
// which it is printed. Its canonical string form is the only section key used
// for a remote device.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Length of a Bluetooth device address in bytes
pub const ADDRESS_LEN: usize = 6;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Invalid Bluetooth address: {0:?}")]
pub struct AddressParseError(pub String);

/// A 48-bit Bluetooth device address
#[derive(Copy, Clone, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RawAddress(pub [u8; ADDRESS_LEN]);

impl RawAddress {
    /// The all-zero address, never a valid peer
    pub const EMPTY: Self = Self([0; ADDRESS_LEN]);

    pub fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Build an address from the first six bytes of `bytes`
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; ADDRESS_LEN] = bytes.get(..ADDRESS_LEN)?.try_into().ok()?;
        Some(Self(arr))
    }
}

impl fmt::Display for RawAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl fmt::Debug for RawAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawAddress({})", self)
    }
}

impl FromStr for RawAddress {
    type Err = AddressParseError;

    /// Accepts exactly `xx:xx:xx:xx:xx:xx`, hex digits in either case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || AddressParseError(s.to_string());
        if s.len() != ADDRESS_LEN * 3 - 1 {
            return Err(err());
        }

        let mut bytes = [0u8; ADDRESS_LEN];
        for (i, part) in s.split(':').enumerate() {
            if i >= ADDRESS_LEN || part.len() != 2 || !part.bytes().all(|c| c.is_ascii_hexdigit()) {
                return Err(err());
            }
            bytes[i] = u8::from_str_radix(part, 16).map_err(|_| err())?;
        }
        Ok(Self(bytes))
    }
}

/// LE address type as persisted under `AddrType`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum AddressType {
    #[default]
    Public = 0x00,
    Random = 0x01,
    PublicId = 0x02,
    RandomId = 0x03,
}

impl AddressType {
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0x00 => Some(Self::Public),
            0x01 => Some(Self::Random),
            0x02 => Some(Self::PublicId),
            0x03 => Some(Self::RandomId),
            _ => None,
        }
    }
}
