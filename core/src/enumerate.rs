// Bonded device enumeration
//
// Walks every paired section in store order, decides whether the device is
// bonded over classic and/or LE, and optionally replays the stored keys into
// the security manager and GATT.

use crate::bonding::{self, classic, LeKeyType};
use crate::property::codec::{DEV_CLASS, DEV_TYPE};
use crate::settings::DEFAULT_MAX_BONDED_DEVICES;
use crate::store::ConfigStore;
use crate::types::{dev_class_from_u32, AddressType, DeviceType, RawAddress};
use crate::{BondStorage, Result, StorageError};
use tracing::{debug, warn};

// ============================================================================
// BONDED DEVICE SET
// ============================================================================

/// Ordered set of unique bonded addresses with a fixed maximum size
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BondedDeviceSet {
    devices: Vec<RawAddress>,
    capacity: usize,
}

impl BondedDeviceSet {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            devices: Vec::with_capacity(capacity.min(DEFAULT_MAX_BONDED_DEVICES)),
            capacity,
        }
    }

    /// Append `address`. Returns `Ok(false)` when already present and
    /// `CapacityExceeded` when the set is full.
    pub fn insert(&mut self, address: RawAddress) -> Result<bool> {
        if self.devices.contains(&address) {
            return Ok(false);
        }
        if self.devices.len() >= self.capacity {
            return Err(StorageError::CapacityExceeded(self.capacity));
        }
        self.devices.push(address);
        Ok(true)
    }

    pub fn contains(&self, address: &RawAddress) -> bool {
        self.devices.contains(address)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RawAddress> {
        self.devices.iter()
    }

    pub fn as_slice(&self) -> &[RawAddress] {
        &self.devices
    }

    pub fn into_vec(self) -> Vec<RawAddress> {
        self.devices
    }
}

impl Default for BondedDeviceSet {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_BONDED_DEVICES)
    }
}

impl<'a> IntoIterator for &'a BondedDeviceSet {
    type Item = &'a RawAddress;
    type IntoIter = std::slice::Iter<'a, RawAddress>;

    fn into_iter(self) -> Self::IntoIter {
        self.devices.iter()
    }
}

// ============================================================================
// ENUMERATION
// ============================================================================

#[derive(Debug, Default, Clone, Copy)]
struct LeLoad {
    key_found: bool,
    device_added: bool,
}

impl BondStorage {
    /// Collect every bonded device. With `materialize`, stored keys are pushed
    /// into the security manager and GATT as they are found.
    pub fn fetch_bonded_devices(&self, materialize: bool) -> BondedDeviceSet {
        let store = self.config();
        let mut bonded = BondedDeviceSet::with_capacity(self.settings().max_bonded_devices);

        for address in store.paired_devices() {
            debug!("Remote device: {}", address);

            let classic_bond = classic::read_classic_bond(store, &address).ok();
            if materialize {
                if let Some((link_key, key_type)) = &classic_bond {
                    self.add_classic_from_storage(&address, link_key.clone(), *key_type);
                }
            }

            let le = self.load_le_keys(&address, materialize);

            if classic_bond.is_some() || le.key_found {
                if let Err(e) = bonded.insert(address) {
                    warn!("Dropping bonded device {}: {}", address, e);
                }
            } else {
                debug!("No link key or LE key found for {}", address);
            }

            if materialize {
                let dual = classic_bond.is_some()
                    && store.get_int(&address.to_string(), DEV_TYPE).ok()
                        == Some(DeviceType::Dual as i32);
                if le.device_added || dual {
                    self.collaborators().gatt.add_bonded_device(address);
                }
            }
        }

        bonded
    }

    pub fn num_bonded_devices(&self) -> usize {
        self.fetch_bonded_devices(false).len()
    }

    pub fn is_bonded(&self, address: &RawAddress) -> bool {
        bonding::has_bond(self.config(), address)
    }

    fn add_classic_from_storage(&self, address: &RawAddress, link_key: crate::LinkKey, key_type: u8) {
        let store = self.config();
        let section = address.to_string();
        let dev_class = store
            .get_int(&section, DEV_CLASS)
            .map(|cod| dev_class_from_u32(cod as u32))
            .unwrap_or([0; 3]);
        let pin_length = store
            .get_int(&section, classic::PIN_LENGTH)
            .ok()
            .and_then(|pin| u8::try_from(pin).ok())
            .unwrap_or(0);

        self.collaborators().security.add_classic_device(
            *address,
            dev_class,
            link_key,
            key_type,
            pin_length,
        );
    }

    /// Read the LE keys of one device in load order
    fn load_le_keys(&self, address: &RawAddress, materialize: bool) -> LeLoad {
        let store = self.config();
        let mut load = LeLoad::default();
        if !bonding::is_le_candidate(store, address) {
            return load;
        }
        debug!("Found an LE device: {}", address);

        let addr_type = if materialize {
            stored_addr_type_or_public(store, address)
        } else {
            AddressType::Public
        };

        for key_type in LeKeyType::LOAD_ORDER {
            let key = match bonding::get_le_key(store, address, key_type) {
                Ok(key) => key,
                Err(StorageError::NotFound) => continue,
                Err(e) => {
                    warn!("Unreadable {} for {}: {}", key_type.field(), address, e);
                    continue;
                }
            };
            load.key_found = true;

            if materialize {
                let security = &self.collaborators().security;
                if !load.device_added {
                    security.add_ble_device(*address, DeviceType::Ble, addr_type);
                    load.device_added = true;
                }
                debug!("Adding key type {:?} for {}", key_type, address);
                security.add_ble_key(*address, key);
            }
        }
        load
    }
}

/// Stored address type, writing back Public when none is stored
fn stored_addr_type_or_public(store: &dyn ConfigStore, address: &RawAddress) -> AddressType {
    match classic::get_remote_addr_type(store, address) {
        Ok(addr_type) => addr_type,
        Err(_) => {
            if let Err(e) = classic::set_remote_addr_type(store, address, AddressType::Public) {
                warn!("Unable to store address type for {}: {}", address, e);
            }
            AddressType::Public
        }
    }
}
