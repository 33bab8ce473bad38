// Device-level value types shared by the codec and the bonding store

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of a BR/EDR link key
pub const LINK_KEY_LEN: usize = 16;

/// Highest link key type value accepted from storage
pub const LINK_KEY_TYPE_MAX: u8 = 10;

/// Device transport capabilities as persisted under `DevType`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum DeviceType {
    Bredr = 0x01,
    Ble = 0x02,
    Dual = 0x03,
}

impl DeviceType {
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0x01 => Some(Self::Bredr),
            0x02 => Some(Self::Ble),
            0x03 => Some(Self::Dual),
            _ => None,
        }
    }

    /// True when the raw `DevType` value carries the LE bit
    pub fn raw_has_le(raw: i32) -> bool {
        raw & Self::Ble as i32 == Self::Ble as i32
    }
}

/// BR/EDR link key
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct LinkKey(pub [u8; LINK_KEY_LEN]);

impl LinkKey {
    pub fn as_bytes(&self) -> &[u8; LINK_KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for LinkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LinkKey(..)")
    }
}

/// Link key types defined by Bluetooth Core
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LinkKeyType {
    Combination = 0,
    LocalUnit = 1,
    RemoteUnit = 2,
    DebugCombination = 3,
    UnauthenticatedCombination = 4,
    AuthenticatedCombination = 5,
    ChangedCombination = 6,
    UnauthenticatedCombinationP256 = 7,
    AuthenticatedCombinationP256 = 8,
}

impl LinkKeyType {
    pub fn from_raw(raw: i32) -> Option<Self> {
        Some(match raw {
            0 => Self::Combination,
            1 => Self::LocalUnit,
            2 => Self::RemoteUnit,
            3 => Self::DebugCombination,
            4 => Self::UnauthenticatedCombination,
            5 => Self::AuthenticatedCombination,
            6 => Self::ChangedCombination,
            7 => Self::UnauthenticatedCombinationP256,
            8 => Self::AuthenticatedCombinationP256,
            _ => return None,
        })
    }

    /// Human-readable name used by the diagnostic dump
    pub fn text(raw: i32) -> String {
        match Self::from_raw(raw) {
            Some(Self::Combination) => "COMBINATION".into(),
            Some(Self::LocalUnit) => "LOCAL_UNIT".into(),
            Some(Self::RemoteUnit) => "REMOTE_UNIT".into(),
            Some(Self::DebugCombination) => "DEBUG_COMB".into(),
            Some(Self::UnauthenticatedCombination) => "UNAUTH_COMB".into(),
            Some(Self::AuthenticatedCombination) => "AUTH_COMB".into(),
            Some(Self::ChangedCombination) => "CHANGED_COMB".into(),
            Some(Self::UnauthenticatedCombinationP256) => "UNAUTH_COMB_P_256".into(),
            Some(Self::AuthenticatedCombinationP256) => "AUTH_COMB_P_256".into(),
            None => format!("UNKNOWN LINK KEY TYPE: {}", raw),
        }
    }
}

/// Class of device, most significant byte first
pub type DevClass = [u8; 3];

/// Split a stored 24-bit class of device into its three octets
pub fn dev_class_from_u32(cod: u32) -> DevClass {
    [(cod >> 16) as u8, (cod >> 8) as u8, cod as u8]
}
