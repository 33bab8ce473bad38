// Property codec
//
// Maps typed properties onto store fields. Writes to a bonded device's section
// and writes of the adapter name are flushed right away; every other write
// waits for the next save.

use super::{uuids, Property, PropertyKind, PropertyTarget, RemoteVersion, Scope};
use super::{IoCapability, ScanMode, MAX_NAME_LEN, MAX_PROPERTY_LEN};
use crate::bonding;
use crate::store::ConfigStore;
use crate::types::{DeviceType, RawAddress};
use crate::{BondStorage, Result, StorageError};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

// Field names
pub const NAME: &str = "Name";
pub const ALIAS: &str = "Aliase";
pub const SCAN_MODE: &str = "ScanMode";
pub const LOCAL_IO_CAPS: &str = "LocalIOCaps";
pub const LOCAL_IO_CAPS_BLE: &str = "LocalIOCapsBLE";
pub const DISCOVERY_TIMEOUT: &str = "DiscoveryTimeout";
pub const DEV_CLASS: &str = "DevClass";
pub const DEV_TYPE: &str = "DevType";
pub const SERVICE: &str = "Service";
pub const MANUFACTURER: &str = "Manufacturer";
pub const LMP_VERSION: &str = "LmpVer";
pub const LMP_SUBVERSION: &str = "LmpSubVer";
pub const SECURE_CONNECTIONS: &str = "SecureConnectionsSupported";
pub const MAX_SESSION_KEY_SIZE: &str = "MaxSessionKeySize";
pub const TIMESTAMP: &str = "Timestamp";

/// Reject kinds that are not stored and kinds used at the wrong target
fn check_target(kind: PropertyKind, target: &PropertyTarget) -> Result<()> {
    if !kind.is_persisted() {
        return Err(StorageError::UnknownKind(kind as u8));
    }
    match (kind.scope(), target) {
        (Scope::Either, _)
        | (Scope::Adapter, PropertyTarget::Adapter)
        | (Scope::Remote, PropertyTarget::Remote(_)) => Ok(()),
        _ => Err(StorageError::Malformed(format!(
            "{:?} cannot be stored for {}",
            kind, target
        ))),
    }
}

fn now_secs() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as u32)
        .unwrap_or(0)
}

fn truncate_name(name: &str) -> &str {
    if name.len() <= MAX_NAME_LEN {
        return name;
    }
    let mut end = MAX_NAME_LEN;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

/// Write `property` for `target`
pub fn encode(store: &dyn ConfigStore, target: &PropertyTarget, property: &Property) -> Result<()> {
    let kind = property.kind();
    check_target(kind, target)?;

    let len = property.to_bytes().len();
    if len == 0 || len > MAX_PROPERTY_LEN {
        warn!(
            "Unable to save property {:?} for {}: length {} is invalid",
            kind, target, len
        );
        return Err(StorageError::Malformed(format!(
            "{:?} length {} outside 1..={}",
            kind, len, MAX_PROPERTY_LEN
        )));
    }

    let section = target.section();
    let section = section.as_str();
    match property {
        Property::RemoteDeviceTimestamp(_) => store.set_int(section, TIMESTAMP, now_secs() as i32)?,
        Property::BdName(name) => store.set_str(section, NAME, truncate_name(name))?,
        Property::RemoteFriendlyName(alias) => store.set_str(section, ALIAS, alias)?,
        Property::AdapterScanMode(mode) => store.set_int(section, SCAN_MODE, *mode as i32)?,
        Property::LocalIoCaps(caps) => store.set_int(section, LOCAL_IO_CAPS, *caps as i32)?,
        Property::LocalIoCapsBle(caps) => {
            store.set_int(section, LOCAL_IO_CAPS_BLE, *caps as i32)?
        }
        Property::AdapterDiscoverableTimeout(timeout) => {
            store.set_int(section, DISCOVERY_TIMEOUT, *timeout as i32)?
        }
        Property::ClassOfDevice(cod) => store.set_int(section, DEV_CLASS, *cod as i32)?,
        Property::TypeOfDevice(device_type) => {
            store.set_int(section, DEV_TYPE, *device_type as i32)?
        }
        Property::Uuids(list) => store.set_str(section, SERVICE, &uuids::join(list))?,
        Property::RemoteVersionInfo(info) => {
            store.set_int(section, MANUFACTURER, info.manufacturer)?;
            store.set_int(section, LMP_VERSION, info.version)?;
            store.set_int(section, LMP_SUBVERSION, info.sub_version)?;
        }
        Property::RemoteSecureConnectionsSupported(v) => {
            store.set_int(section, SECURE_CONNECTIONS, i32::from(*v))?
        }
        Property::RemoteMaxSessionKeySize(v) => {
            store.set_int(section, MAX_SESSION_KEY_SIZE, i32::from(*v))?
        }
        Property::BdAddr(_) | Property::AdapterBondedDevices(_) | Property::RemoteRssi(_) => {
            return Err(StorageError::UnknownKind(kind as u8));
        }
    }

    match target {
        PropertyTarget::Remote(address) => {
            if bonding::has_bond(store, address) {
                store.flush()?;
            }
        }
        PropertyTarget::Adapter => {
            if kind == PropertyKind::BdName {
                store.flush()?;
            }
        }
    }
    Ok(())
}

/// Read a `kind` property for `target` whose raw form must fit `max_len`
pub fn decode(
    store: &dyn ConfigStore,
    target: &PropertyTarget,
    kind: PropertyKind,
    max_len: usize,
) -> Result<Property> {
    check_target(kind, target)?;
    if max_len == 0 {
        return Err(StorageError::Malformed(format!("{:?}: zero capacity", kind)));
    }

    let section = target.section();
    let section = section.as_str();
    let property = match kind {
        PropertyKind::RemoteDeviceTimestamp => {
            Property::RemoteDeviceTimestamp(store.get_int(section, TIMESTAMP)? as u32)
        }
        PropertyKind::BdName => Property::BdName(store.get_str(section, NAME)?),
        PropertyKind::RemoteFriendlyName => {
            Property::RemoteFriendlyName(store.get_str(section, ALIAS)?)
        }
        PropertyKind::AdapterScanMode => {
            let raw = store.get_int(section, SCAN_MODE)?;
            Property::AdapterScanMode(
                ScanMode::from_raw(raw).ok_or_else(|| stored_value(section, SCAN_MODE, raw))?,
            )
        }
        PropertyKind::LocalIoCaps => Property::LocalIoCaps(read_io_caps(store, section, LOCAL_IO_CAPS)?),
        PropertyKind::LocalIoCapsBle => {
            Property::LocalIoCapsBle(read_io_caps(store, section, LOCAL_IO_CAPS_BLE)?)
        }
        PropertyKind::AdapterDiscoverableTimeout => {
            Property::AdapterDiscoverableTimeout(store.get_int(section, DISCOVERY_TIMEOUT)? as u32)
        }
        PropertyKind::ClassOfDevice => {
            Property::ClassOfDevice(store.get_int(section, DEV_CLASS)? as u32)
        }
        PropertyKind::TypeOfDevice => {
            let raw = store.get_int(section, DEV_TYPE)?;
            Property::TypeOfDevice(
                DeviceType::from_raw(raw).ok_or_else(|| stored_value(section, DEV_TYPE, raw))?,
            )
        }
        PropertyKind::Uuids => Property::Uuids(uuids::split(&store.get_str(section, SERVICE)?)?),
        PropertyKind::RemoteVersionInfo => Property::RemoteVersionInfo(RemoteVersion {
            manufacturer: store.get_int(section, MANUFACTURER)?,
            version: store.get_int(section, LMP_VERSION)?,
            sub_version: store.get_int(section, LMP_SUBVERSION)?,
        }),
        PropertyKind::RemoteSecureConnectionsSupported => {
            Property::RemoteSecureConnectionsSupported(store.get_int(section, SECURE_CONNECTIONS)? as u8)
        }
        PropertyKind::RemoteMaxSessionKeySize => {
            Property::RemoteMaxSessionKeySize(store.get_int(section, MAX_SESSION_KEY_SIZE)? as u8)
        }
        PropertyKind::BdAddr | PropertyKind::AdapterBondedDevices | PropertyKind::RemoteRssi => {
            return Err(StorageError::UnknownKind(kind as u8));
        }
    };

    let len = property.to_bytes().len();
    if len > max_len {
        return Err(StorageError::Malformed(format!(
            "{:?} for {} needs {} bytes, capacity {}",
            kind, target, len, max_len
        )));
    }
    Ok(property)
}

/// Read a property into a caller buffer and return the number of bytes
/// written. On failure `out` is not modified.
pub fn decode_into(
    store: &dyn ConfigStore,
    target: &PropertyTarget,
    kind: PropertyKind,
    out: &mut [u8],
) -> Result<usize> {
    let bytes = decode(store, target, kind, out.len())?.to_bytes();
    out[..bytes.len()].copy_from_slice(&bytes);
    Ok(bytes.len())
}

/// Store properties reported for a newly seen device. RSSI is dropped and an
/// address property refreshes the device timestamp.
pub fn add_remote_device(store: &dyn ConfigStore, address: &RawAddress, properties: &[Property]) {
    let target = PropertyTarget::Remote(*address);
    for property in properties {
        let result = match property {
            Property::RemoteRssi(_) => continue,
            Property::BdAddr(_) => encode(store, &target, &Property::RemoteDeviceTimestamp(0)),
            other => encode(store, &target, other),
        };
        if let Err(e) = result {
            warn!(
                "Failed to store {:?} for {}: {}",
                property.kind(),
                address,
                e
            );
        }
    }
    debug!("Stored {} properties for {}", properties.len(), address);
}

fn read_io_caps(store: &dyn ConfigStore, section: &str, field: &str) -> Result<IoCapability> {
    let raw = store.get_int(section, field)?;
    IoCapability::from_raw(raw).ok_or_else(|| stored_value(section, field, raw))
}

fn stored_value(section: &str, field: &str, raw: i32) -> StorageError {
    StorageError::Malformed(format!("{}/{}: unexpected value {}", section, field, raw))
}

// ============================================================================
// FACADE
// ============================================================================

impl BondStorage {
    pub fn set_adapter_property(&self, property: &Property) -> Result<()> {
        encode(self.config(), &PropertyTarget::Adapter, property)
    }

    pub fn set_remote_device_property(&self, address: &RawAddress, property: &Property) -> Result<()> {
        encode(self.config(), &PropertyTarget::Remote(*address), property)
    }

    pub fn get_remote_device_property(
        &self,
        address: &RawAddress,
        kind: PropertyKind,
    ) -> Result<Property> {
        decode(
            self.config(),
            &PropertyTarget::Remote(*address),
            kind,
            MAX_PROPERTY_LEN,
        )
    }

    pub fn add_remote_device(&self, address: &RawAddress, properties: &[Property]) {
        add_remote_device(self.config(), address, properties)
    }
}
