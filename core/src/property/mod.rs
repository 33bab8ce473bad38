//! Typed adapter and remote device properties
//!
//! A [`Property`] is one value the adapter layer reads or writes, tagged by
//! its [`PropertyKind`]. The codec in [`codec`] maps each persisted kind onto
//! one or more store fields. Every property also has a raw byte form
//! (`to_bytes` / `from_bytes`) matching the layout callers exchange with the
//! controller stack: little-endian integers, 6-byte addresses and 16-byte
//! big-endian UUIDs.

pub mod codec;
pub mod uuids;

use crate::types::{DeviceType, RawAddress, ADDRESS_LEN};
use crate::{Result, StorageError};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub use codec::{add_remote_device, decode, decode_into, encode};

/// Largest serialized property accepted by the codec
pub const MAX_PROPERTY_LEN: usize = 1023;

/// Names longer than this are truncated before they are stored
pub const MAX_NAME_LEN: usize = 248;

// ============================================================================
// PROPERTY KIND
// ============================================================================

/// Property tag, numbered as on the adapter interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PropertyKind {
    BdName = 0x01,
    BdAddr = 0x02,
    Uuids = 0x03,
    ClassOfDevice = 0x04,
    TypeOfDevice = 0x05,
    AdapterScanMode = 0x07,
    AdapterBondedDevices = 0x08,
    AdapterDiscoverableTimeout = 0x09,
    RemoteFriendlyName = 0x0A,
    RemoteRssi = 0x0B,
    RemoteVersionInfo = 0x0C,
    LocalIoCaps = 0x0E,
    LocalIoCapsBle = 0x0F,
    RemoteSecureConnectionsSupported = 0x17,
    RemoteMaxSessionKeySize = 0x18,
    RemoteDeviceTimestamp = 0xFF,
}

impl PropertyKind {
    pub const ALL: [PropertyKind; 16] = [
        Self::BdName,
        Self::BdAddr,
        Self::Uuids,
        Self::ClassOfDevice,
        Self::TypeOfDevice,
        Self::AdapterScanMode,
        Self::AdapterBondedDevices,
        Self::AdapterDiscoverableTimeout,
        Self::RemoteFriendlyName,
        Self::RemoteRssi,
        Self::RemoteVersionInfo,
        Self::LocalIoCaps,
        Self::LocalIoCapsBle,
        Self::RemoteSecureConnectionsSupported,
        Self::RemoteMaxSessionKeySize,
        Self::RemoteDeviceTimestamp,
    ];

    /// Whether the codec keeps this kind in the store
    pub fn is_persisted(self) -> bool {
        !matches!(
            self,
            Self::BdAddr | Self::AdapterBondedDevices | Self::RemoteRssi
        )
    }

    pub(crate) fn scope(self) -> Scope {
        match self {
            Self::BdName => Scope::Either,
            Self::AdapterScanMode
            | Self::LocalIoCaps
            | Self::LocalIoCapsBle
            | Self::AdapterDiscoverableTimeout => Scope::Adapter,
            _ => Scope::Remote,
        }
    }
}

impl TryFrom<u8> for PropertyKind {
    type Error = StorageError;

    fn try_from(raw: u8) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| *kind as u8 == raw)
            .ok_or(StorageError::UnknownKind(raw))
    }
}

/// Where a property may be stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scope {
    Adapter,
    Remote,
    Either,
}

/// Section a property is read from or written to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyTarget {
    Adapter,
    Remote(RawAddress),
}

impl PropertyTarget {
    pub fn section(&self) -> String {
        match self {
            Self::Adapter => crate::store::ADAPTER_SECTION.to_string(),
            Self::Remote(address) => address.to_string(),
        }
    }
}

impl fmt::Display for PropertyTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Adapter => f.write_str("adapter"),
            Self::Remote(address) => write!(f, "{}", address),
        }
    }
}

// ============================================================================
// VALUE TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ScanMode {
    None = 0,
    Connectable = 1,
    ConnectableDiscoverable = 2,
}

impl ScanMode {
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Self::None),
            1 => Some(Self::Connectable),
            2 => Some(Self::ConnectableDiscoverable),
            _ => None,
        }
    }
}

/// Local input/output capability advertised during pairing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum IoCapability {
    DisplayOnly = 0,
    DisplayYesNo = 1,
    KeyboardOnly = 2,
    NoInputNoOutput = 3,
    KeyboardDisplay = 4,
}

impl IoCapability {
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Self::DisplayOnly),
            1 => Some(Self::DisplayYesNo),
            2 => Some(Self::KeyboardOnly),
            3 => Some(Self::NoInputNoOutput),
            4 => Some(Self::KeyboardDisplay),
            _ => None,
        }
    }
}

/// Remote LMP version information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RemoteVersion {
    pub version: i32,
    pub sub_version: i32,
    pub manufacturer: i32,
}

// ============================================================================
// PROPERTY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Property {
    BdName(String),
    BdAddr(RawAddress),
    Uuids(Vec<Uuid>),
    ClassOfDevice(u32),
    TypeOfDevice(DeviceType),
    AdapterScanMode(ScanMode),
    AdapterBondedDevices(Vec<RawAddress>),
    AdapterDiscoverableTimeout(u32),
    RemoteFriendlyName(String),
    RemoteRssi(i8),
    RemoteVersionInfo(RemoteVersion),
    LocalIoCaps(IoCapability),
    LocalIoCapsBle(IoCapability),
    RemoteSecureConnectionsSupported(u8),
    RemoteMaxSessionKeySize(u8),
    /// Seconds since the epoch; the codec always stores the current time
    RemoteDeviceTimestamp(u32),
}

impl Property {
    pub fn kind(&self) -> PropertyKind {
        match self {
            Self::BdName(_) => PropertyKind::BdName,
            Self::BdAddr(_) => PropertyKind::BdAddr,
            Self::Uuids(_) => PropertyKind::Uuids,
            Self::ClassOfDevice(_) => PropertyKind::ClassOfDevice,
            Self::TypeOfDevice(_) => PropertyKind::TypeOfDevice,
            Self::AdapterScanMode(_) => PropertyKind::AdapterScanMode,
            Self::AdapterBondedDevices(_) => PropertyKind::AdapterBondedDevices,
            Self::AdapterDiscoverableTimeout(_) => PropertyKind::AdapterDiscoverableTimeout,
            Self::RemoteFriendlyName(_) => PropertyKind::RemoteFriendlyName,
            Self::RemoteRssi(_) => PropertyKind::RemoteRssi,
            Self::RemoteVersionInfo(_) => PropertyKind::RemoteVersionInfo,
            Self::LocalIoCaps(_) => PropertyKind::LocalIoCaps,
            Self::LocalIoCapsBle(_) => PropertyKind::LocalIoCapsBle,
            Self::RemoteSecureConnectionsSupported(_) => {
                PropertyKind::RemoteSecureConnectionsSupported
            }
            Self::RemoteMaxSessionKeySize(_) => PropertyKind::RemoteMaxSessionKeySize,
            Self::RemoteDeviceTimestamp(_) => PropertyKind::RemoteDeviceTimestamp,
        }
    }

    /// Raw byte form of the value
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::BdName(name) | Self::RemoteFriendlyName(name) => name.as_bytes().to_vec(),
            Self::BdAddr(address) => address.as_bytes().to_vec(),
            Self::Uuids(uuids) => uuids::to_bytes(uuids),
            Self::ClassOfDevice(v)
            | Self::AdapterDiscoverableTimeout(v)
            | Self::RemoteDeviceTimestamp(v) => v.to_le_bytes().to_vec(),
            Self::TypeOfDevice(t) => (*t as i32).to_le_bytes().to_vec(),
            Self::AdapterScanMode(mode) => (*mode as i32).to_le_bytes().to_vec(),
            Self::AdapterBondedDevices(devices) => devices
                .iter()
                .flat_map(|address| address.as_bytes().iter().copied())
                .collect(),
            Self::RemoteRssi(rssi) => vec![*rssi as u8],
            Self::RemoteVersionInfo(info) => {
                let mut bytes = Vec::with_capacity(12);
                bytes.extend_from_slice(&info.version.to_le_bytes());
                bytes.extend_from_slice(&info.sub_version.to_le_bytes());
                bytes.extend_from_slice(&info.manufacturer.to_le_bytes());
                bytes
            }
            Self::LocalIoCaps(caps) | Self::LocalIoCapsBle(caps) => {
                (*caps as i32).to_le_bytes().to_vec()
            }
            Self::RemoteSecureConnectionsSupported(v) | Self::RemoteMaxSessionKeySize(v) => {
                vec![*v]
            }
        }
    }

    /// Parse the raw byte form of a `kind` value
    pub fn from_bytes(kind: PropertyKind, bytes: &[u8]) -> Result<Self> {
        let property = match kind {
            PropertyKind::BdName => Self::BdName(text(bytes)?),
            PropertyKind::RemoteFriendlyName => Self::RemoteFriendlyName(text(bytes)?),
            PropertyKind::BdAddr => Self::BdAddr(address(bytes)?),
            PropertyKind::Uuids => Self::Uuids(uuids::from_bytes(bytes)?),
            PropertyKind::ClassOfDevice => Self::ClassOfDevice(le_u32(bytes)?),
            PropertyKind::TypeOfDevice => {
                let raw = le_u32(bytes)? as i32;
                Self::TypeOfDevice(
                    DeviceType::from_raw(raw)
                        .ok_or_else(|| malformed("device type", raw))?,
                )
            }
            PropertyKind::AdapterScanMode => {
                let raw = le_u32(bytes)? as i32;
                Self::AdapterScanMode(
                    ScanMode::from_raw(raw).ok_or_else(|| malformed("scan mode", raw))?,
                )
            }
            PropertyKind::AdapterBondedDevices => {
                if bytes.len() % ADDRESS_LEN != 0 {
                    return Err(StorageError::Malformed(format!(
                        "{} bytes is not a list of addresses",
                        bytes.len()
                    )));
                }
                Self::AdapterBondedDevices(
                    bytes
                        .chunks(ADDRESS_LEN)
                        .map(address)
                        .collect::<Result<Vec<_>>>()?,
                )
            }
            PropertyKind::AdapterDiscoverableTimeout => {
                Self::AdapterDiscoverableTimeout(le_u32(bytes)?)
            }
            PropertyKind::RemoteRssi => Self::RemoteRssi(single(bytes)? as i8),
            PropertyKind::RemoteVersionInfo => {
                if bytes.len() != 12 {
                    return Err(StorageError::Malformed(format!(
                        "version info is 12 bytes, got {}",
                        bytes.len()
                    )));
                }
                Self::RemoteVersionInfo(RemoteVersion {
                    version: le_u32(&bytes[0..4])? as i32,
                    sub_version: le_u32(&bytes[4..8])? as i32,
                    manufacturer: le_u32(&bytes[8..12])? as i32,
                })
            }
            PropertyKind::LocalIoCaps => Self::LocalIoCaps(io_caps(bytes)?),
            PropertyKind::LocalIoCapsBle => Self::LocalIoCapsBle(io_caps(bytes)?),
            PropertyKind::RemoteSecureConnectionsSupported => {
                Self::RemoteSecureConnectionsSupported(single(bytes)?)
            }
            PropertyKind::RemoteMaxSessionKeySize => {
                Self::RemoteMaxSessionKeySize(single(bytes)?)
            }
            PropertyKind::RemoteDeviceTimestamp => Self::RemoteDeviceTimestamp(le_u32(bytes)?),
        };
        Ok(property)
    }
}

fn malformed(what: &str, raw: i32) -> StorageError {
    StorageError::Malformed(format!("invalid {}: {}", what, raw))
}

fn text(bytes: &[u8]) -> Result<String> {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8(bytes[..end].to_vec())
        .map_err(|_| StorageError::Malformed("name is not utf-8".into()))
}

fn address(bytes: &[u8]) -> Result<RawAddress> {
    if bytes.len() != ADDRESS_LEN {
        return Err(StorageError::Malformed(format!(
            "address is 6 bytes, got {}",
            bytes.len()
        )));
    }
    RawAddress::from_slice(bytes)
        .ok_or_else(|| StorageError::Malformed("bad address".into()))
}

fn le_u32(bytes: &[u8]) -> Result<u32> {
    let array: [u8; 4] = bytes
        .try_into()
        .map_err(|_| StorageError::Malformed(format!("expected 4 bytes, got {}", bytes.len())))?;
    Ok(u32::from_le_bytes(array))
}

fn single(bytes: &[u8]) -> Result<u8> {
    match bytes {
        [b] => Ok(*b),
        _ => Err(StorageError::Malformed(format!(
            "expected 1 byte, got {}",
            bytes.len()
        ))),
    }
}

fn io_caps(bytes: &[u8]) -> Result<IoCapability> {
    let raw = le_u32(bytes)? as i32;
    IoCapability::from_raw(raw).ok_or_else(|| malformed("io capability", raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_tag() {
        assert_eq!(PropertyKind::try_from(0x01).unwrap(), PropertyKind::BdName);
        assert_eq!(
            PropertyKind::try_from(0xFF).unwrap(),
            PropertyKind::RemoteDeviceTimestamp
        );
        assert_eq!(PropertyKind::try_from(0x06), Err(StorageError::UnknownKind(0x06)));
        assert_eq!(PropertyKind::try_from(0x42), Err(StorageError::UnknownKind(0x42)));
    }

    #[test]
    fn test_every_kind_tag_roundtrips() {
        for kind in PropertyKind::ALL {
            assert_eq!(PropertyKind::try_from(kind as u8).unwrap(), kind);
        }
    }

    #[test]
    fn test_non_persisted_kinds() {
        assert!(!PropertyKind::BdAddr.is_persisted());
        assert!(!PropertyKind::AdapterBondedDevices.is_persisted());
        assert!(!PropertyKind::RemoteRssi.is_persisted());
        assert!(PropertyKind::Uuids.is_persisted());
    }

    #[test]
    fn test_version_info_layout() {
        let property = Property::RemoteVersionInfo(RemoteVersion {
            version: 9,
            sub_version: 0x1234,
            manufacturer: 15,
        });
        let bytes = property.to_bytes();
        assert_eq!(bytes.len(), 12);
        assert_eq!(&bytes[0..4], &[9, 0, 0, 0]);
        assert_eq!(
            Property::from_bytes(PropertyKind::RemoteVersionInfo, &bytes).unwrap(),
            property
        );
    }

    #[test]
    fn test_from_bytes_rejects_bad_lengths() {
        assert!(matches!(
            Property::from_bytes(PropertyKind::ClassOfDevice, &[1, 2, 3]),
            Err(StorageError::Malformed(_))
        ));
        assert!(matches!(
            Property::from_bytes(PropertyKind::AdapterBondedDevices, &[0; 7]),
            Err(StorageError::Malformed(_))
        ));
        assert!(matches!(
            Property::from_bytes(PropertyKind::TypeOfDevice, &7u32.to_le_bytes()),
            Err(StorageError::Malformed(_))
        ));
    }

    #[test]
    fn test_name_stops_at_nul() {
        let property = Property::from_bytes(PropertyKind::BdName, b"kbd\0junk").unwrap();
        assert_eq!(property, Property::BdName("kbd".into()));
    }

    #[test]
    fn test_target_sections() {
        let address: RawAddress = "aa:bb:cc:dd:ee:ff".parse().unwrap();
        assert_eq!(PropertyTarget::Adapter.section(), "Adapter");
        assert_eq!(PropertyTarget::Remote(address).section(), "aa:bb:cc:dd:ee:ff");
    }
}
