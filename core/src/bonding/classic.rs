// Classic (BR/EDR) bonds and per-device transport facts
//
// A device is classically bonded when both its link key and its link key type
// can be read back.

use super::le_keys::remove_le_keys;
use crate::profiles::gatt::{GATT_CLIENT_DB_HASH, GATT_CLIENT_SUPPORTED, GATT_SERVER_SUPPORTED};
use crate::property::codec::{ALIAS, DEV_TYPE};
use crate::store::ConfigStore;
use crate::types::{AddressType, DeviceType, LinkKey, RawAddress, LINK_KEY_LEN, LINK_KEY_TYPE_MAX};
use crate::{BondStorage, Result, StorageError};
use tracing::{info, warn};

pub const LINK_KEY: &str = "LinkKey";
pub const LINK_KEY_TYPE: &str = "LinkKeyType";
pub const PIN_LENGTH: &str = "PinLength";
pub const RESTRICTED: &str = "Restricted";
pub const ADDR_TYPE: &str = "AddrType";

/// Fields cleared along with the keys when a bond is removed
const BOND_FIELDS: &[&str] = &[
    LINK_KEY_TYPE,
    PIN_LENGTH,
    LINK_KEY,
    ALIAS,
    GATT_CLIENT_SUPPORTED,
    GATT_CLIENT_DB_HASH,
    GATT_SERVER_SUPPORTED,
];

pub fn read_link_key(store: &dyn ConfigStore, address: &RawAddress) -> Result<LinkKey> {
    let mut key = LinkKey([0; LINK_KEY_LEN]);
    let len = store.get_bin_into(&address.to_string(), LINK_KEY, &mut key.0)?;
    if len != LINK_KEY_LEN {
        return Err(StorageError::Malformed(format!(
            "{}: link key is {} bytes",
            address, len
        )));
    }
    Ok(key)
}

/// Link key plus its type, when both are stored and the type is a known one
pub fn read_classic_bond(store: &dyn ConfigStore, address: &RawAddress) -> Result<(LinkKey, u8)> {
    let key = read_link_key(store, address)?;
    let raw = store.get_int(&address.to_string(), LINK_KEY_TYPE)?;
    let key_type = u8::try_from(raw)
        .ok()
        .filter(|t| *t <= LINK_KEY_TYPE_MAX)
        .ok_or_else(|| StorageError::Malformed(format!("{}: link key type {}", address, raw)))?;
    Ok((key, key_type))
}

pub fn is_classic_bonded(store: &dyn ConfigStore, address: &RawAddress) -> bool {
    read_classic_bond(store, address).is_ok()
}

/// Record a classic bond and flush it. Every field is attempted; the first
/// failure is returned.
pub fn add_bonded_device(
    store: &dyn ConfigStore,
    address: &RawAddress,
    link_key: &LinkKey,
    key_type: u8,
    pin_length: u8,
    restricted: bool,
) -> Result<()> {
    let section = address.to_string();
    let results = [
        store.set_int(&section, LINK_KEY_TYPE, i32::from(key_type)),
        store.set_int(&section, PIN_LENGTH, i32::from(pin_length)),
        store.set_bin(&section, LINK_KEY, link_key.as_bytes()),
    ];

    if restricted {
        warn!("{} pairing will be removed if unrestricted", address);
        if let Err(e) = store.set_int(&section, RESTRICTED, 1) {
            warn!("Unable to mark {} restricted: {}", address, e);
        }
    }

    store.flush()?;
    results.into_iter().collect::<Result<Vec<_>>>().map(|_| ())
}

pub fn is_restricted_device(store: &dyn ConfigStore, address: &RawAddress) -> bool {
    store.exists(&address.to_string(), RESTRICTED)
}

pub fn get_remote_addr_type(store: &dyn ConfigStore, address: &RawAddress) -> Result<AddressType> {
    let raw = store.get_int(&address.to_string(), ADDR_TYPE)?;
    u8::try_from(raw)
        .ok()
        .and_then(AddressType::from_raw)
        .ok_or_else(|| StorageError::Malformed(format!("{}: address type {}", address, raw)))
}

pub fn set_remote_addr_type(
    store: &dyn ConfigStore,
    address: &RawAddress,
    addr_type: AddressType,
) -> Result<()> {
    store.set_int(&address.to_string(), ADDR_TYPE, addr_type as i32)
}

pub fn get_remote_device_type(store: &dyn ConfigStore, address: &RawAddress) -> Result<DeviceType> {
    let raw = store.get_int(&address.to_string(), DEV_TYPE)?;
    DeviceType::from_raw(raw)
        .ok_or_else(|| StorageError::Malformed(format!("{}: device type {}", address, raw)))
}

pub fn set_remote_device_type(
    store: &dyn ConfigStore,
    address: &RawAddress,
    device_type: DeviceType,
) -> Result<()> {
    store.set_int(&address.to_string(), DEV_TYPE, device_type as i32)
}

impl BondStorage {
    pub fn add_bonded_device(
        &self,
        address: &RawAddress,
        link_key: &LinkKey,
        key_type: u8,
        pin_length: u8,
    ) -> Result<()> {
        add_bonded_device(
            self.config(),
            address,
            link_key,
            key_type,
            pin_length,
            self.settings().restricted_mode,
        )
    }

    /// Drop the keys and bond bookkeeping of `address` and flush.
    ///
    /// When this leaves no paired device and identity rotation is enabled,
    /// the security manager is asked for a fresh local identity.
    pub fn remove_bonded_device(&self, address: &RawAddress) -> Result<()> {
        info!("Removing bonded device {}", address);
        let store = self.config();
        let section = address.to_string();

        let mut ok = remove_le_keys(store, address);
        for field in BOND_FIELDS {
            if let Err(e) = store.remove(&section, field) {
                warn!("Failed to remove {} for {}: {}", field, address, e);
                ok = false;
            }
        }
        store.flush()?;

        if store.paired_devices().is_empty() && self.settings().irk_rotation {
            info!("Last paired device removed, resetting local identity");
            self.collaborators().security.reset_local_identity();
        }

        if ok {
            Ok(())
        } else {
            Err(StorageError::Backend(format!(
                "bond fields for {} only partly removed",
                address
            )))
        }
    }

    pub fn is_restricted_device(&self, address: &RawAddress) -> bool {
        is_restricted_device(self.config(), address)
    }

    pub fn get_remote_addr_type(&self, address: &RawAddress) -> Result<AddressType> {
        get_remote_addr_type(self.config(), address)
    }

    pub fn set_remote_addr_type(&self, address: &RawAddress, addr_type: AddressType) -> Result<()> {
        set_remote_addr_type(self.config(), address, addr_type)
    }

    pub fn get_remote_device_type(&self, address: &RawAddress) -> Result<DeviceType> {
        get_remote_device_type(self.config(), address)
    }

    pub fn set_remote_device_type(&self, address: &RawAddress, device_type: DeviceType) -> Result<()> {
        set_remote_device_type(self.config(), address, device_type)
    }
}
