// Adapter startup load
//
// Replays the stored bonds into the stack at adapter enable and reports the
// adapter and per-device properties in one event each.

use crate::bonding::{self, LeKey, LeKeyType, Octet16};
use crate::enumerate::BondedDeviceSet;
use crate::property::codec::NAME;
use crate::property::{
    decode, IoCapability, Property, PropertyKind, PropertyTarget, ScanMode, MAX_PROPERTY_LEN,
};
use crate::types::RawAddress;
use crate::{BondStorage, Result, StorageError};
use tracing::{debug, error, info};

/// LTK from the sample data of Bluetooth Core v4.2. Devices that ship it
/// instead of generating a key are treated as insecure.
pub const SAMPLE_LTK: Octet16 = [
    0xbf, 0x01, 0xfb, 0x9d, 0x4e, 0xf3, 0xbc, 0x36, 0xd8, 0x74, 0xf5, 0x39, 0x41, 0x38, 0x68, 0x4c,
];

/// Classic IO capability used when none is stored
pub const DEFAULT_IO_CAPS: IoCapability = IoCapability::DisplayYesNo;

/// LE IO capability used when none is stored
pub const DEFAULT_IO_CAPS_BLE: IoCapability = IoCapability::KeyboardDisplay;

/// Remote properties reported for every bonded device at load
const REMOTE_LOAD_KINDS: [PropertyKind; 5] = [
    PropertyKind::BdName,
    PropertyKind::RemoteFriendlyName,
    PropertyKind::ClassOfDevice,
    PropertyKind::TypeOfDevice,
    PropertyKind::Uuids,
];

impl BondStorage {
    /// Remove bonds whose peer encryption key is the sample LTK.
    /// Returns the addresses that were removed.
    pub fn remove_devices_with_sample_ltk(&self) -> Vec<RawAddress> {
        let store = self.config();
        let bad: Vec<RawAddress> = store
            .paired_devices()
            .into_iter()
            .filter(|address| {
                matches!(
                    bonding::get_le_key(store, address, LeKeyType::Penc),
                    Ok(LeKey::Penc(penc)) if penc.ltk == SAMPLE_LTK
                )
            })
            .collect();

        for address in &bad {
            error!("Removing bond to {}: device uses the sample LTK", address);
            if let Err(e) = self.remove_bonded_device(address) {
                error!("Failed to remove {}: {}", address, e);
            }
        }
        bad
    }

    /// Load all bonds into the security manager and report adapter and remote
    /// properties
    pub fn load_bonded_devices(&self) -> BondedDeviceSet {
        self.remove_devices_with_sample_ltk();
        let bonded = self.fetch_bonded_devices(true);
        let callbacks = &self.collaborators().adapter;

        let mut adapter_props = Vec::with_capacity(6);
        if let Ok(address) = self.get_adapter_property(PropertyKind::BdAddr) {
            adapter_props.push(address);
        }
        if let Ok(name) = self.get_adapter_property(PropertyKind::BdName) {
            adapter_props.push(name);
        }
        // Scan mode always starts out off, whatever was stored
        adapter_props.push(Property::AdapterScanMode(ScanMode::None));
        if let Ok(timeout) = self.get_adapter_property(PropertyKind::AdapterDiscoverableTimeout) {
            adapter_props.push(timeout);
        }
        adapter_props.push(Property::AdapterBondedDevices(bonded.as_slice().to_vec()));
        adapter_props.push(Property::Uuids(self.collaborators().adapter_info.local_uuids()));
        callbacks.adapter_properties(adapter_props);

        info!("{} bonded devices found", bonded.len());

        for address in &bonded {
            let target = PropertyTarget::Remote(*address);
            let props: Vec<Property> = REMOTE_LOAD_KINDS
                .iter()
                .filter_map(|kind| decode(self.config(), &target, *kind, MAX_PROPERTY_LEN).ok())
                .collect();
            callbacks.remote_device_properties(*address, props);
        }

        bonded
    }

    /// Adapter property, with the address, bonded list and local services
    /// served live rather than from the store
    pub fn get_adapter_property(&self, kind: PropertyKind) -> Result<Property> {
        match kind {
            PropertyKind::BdAddr => self
                .collaborators()
                .adapter_info
                .local_address()
                .map(Property::BdAddr)
                .ok_or_else(|| {
                    debug!("Controller not ready, no local address");
                    StorageError::NotFound
                }),
            PropertyKind::AdapterBondedDevices => {
                let bonded = self.fetch_bonded_devices(false);
                debug!("Number of bonded devices: {}", bonded.len());
                Ok(Property::AdapterBondedDevices(bonded.into_vec()))
            }
            PropertyKind::Uuids => Ok(Property::Uuids(
                self.collaborators().adapter_info.local_uuids(),
            )),
            _ => decode(self.config(), &PropertyTarget::Adapter, kind, MAX_PROPERTY_LEN),
        }
    }

    pub fn local_io_caps(&self) -> IoCapability {
        match self.get_adapter_property(PropertyKind::LocalIoCaps) {
            Ok(Property::LocalIoCaps(caps)) => caps,
            _ => DEFAULT_IO_CAPS,
        }
    }

    pub fn local_io_caps_ble(&self) -> IoCapability {
        match self.get_adapter_property(PropertyKind::LocalIoCapsBle) {
            Ok(Property::LocalIoCapsBle(caps)) => caps,
            _ => DEFAULT_IO_CAPS_BLE,
        }
    }

    /// Name last seen for `address`, without the length checks of the codec
    pub fn get_stored_remote_name(&self, address: &RawAddress) -> Option<String> {
        self.config().get_str(&address.to_string(), NAME).ok()
    }
}
