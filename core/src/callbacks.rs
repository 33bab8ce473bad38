// Collaborator interfaces
//
// Everything the storage layer pushes out at load time goes through these
// traits: the security manager that holds keys in memory, GATT, the adapter
// event sink, and one sink per profile. `Collaborators::default()` wires every
// slot to a detached implementation that only logs.

use crate::bonding::LeKey;
use crate::profiles::{
    CsisRecord, GroupRecord, HasRecord, HearingAidRecord, HidDeviceRecord, HidHostRecord,
    LeAudioRecord,
};
use crate::property::Property;
use crate::types::{AddressType, DevClass, DeviceType, LinkKey, RawAddress};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

#[cfg(test)]
use mockall::automock;

/// In-memory security record table of the controller stack
#[cfg_attr(test, automock)]
pub trait SecurityManager: Send + Sync {
    /// Register a classic bond
    fn add_classic_device(
        &self,
        address: RawAddress,
        dev_class: DevClass,
        link_key: LinkKey,
        key_type: u8,
        pin_length: u8,
    );

    /// Register an LE device before any of its keys are pushed
    fn add_ble_device(&self, address: RawAddress, device_type: DeviceType, address_type: AddressType);

    fn add_ble_key(&self, address: RawAddress, key: LeKey);

    /// Generate a fresh local identity key set
    fn reset_local_identity(&self);
}

/// GATT's list of LE bonded peers
#[cfg_attr(test, automock)]
pub trait GattBondedDevices: Send + Sync {
    fn add_bonded_device(&self, address: RawAddress);
}

/// Adapter event sink
#[cfg_attr(test, automock)]
pub trait AdapterCallbacks: Send + Sync {
    fn adapter_properties(&self, properties: Vec<Property>);
    fn remote_device_properties(&self, address: RawAddress, properties: Vec<Property>);
    /// `held` and `identity` are the same dual-mode device
    fn address_consolidate(&self, held: RawAddress, identity: RawAddress);
    /// `held` is a private address resolving to `identity`
    fn le_address_associate(&self, held: RawAddress, identity: RawAddress);
}

/// Live controller facts that are not kept in the store
#[cfg_attr(test, automock)]
pub trait AdapterInfo: Send + Sync {
    fn local_address(&self) -> Option<RawAddress>;
    fn local_uuids(&self) -> Vec<Uuid>;
}

/// Receives records rebuilt from storage for one profile
#[cfg_attr(test, automock)]
pub trait ProfileSink<R: Send + Sync + 'static>: Send + Sync {
    fn add_from_storage(&self, record: R);
}

// ============================================================================
// DETACHED COLLABORATORS
// ============================================================================

/// Collaborator that accepts everything and only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct Detached;

impl SecurityManager for Detached {
    fn add_classic_device(
        &self,
        address: RawAddress,
        _dev_class: DevClass,
        _link_key: LinkKey,
        key_type: u8,
        _pin_length: u8,
    ) {
        debug!("Detached: classic device {} key type {}", address, key_type);
    }

    fn add_ble_device(&self, address: RawAddress, device_type: DeviceType, address_type: AddressType) {
        debug!(
            "Detached: BLE device {} {:?} {:?}",
            address, device_type, address_type
        );
    }

    fn add_ble_key(&self, address: RawAddress, key: LeKey) {
        debug!("Detached: BLE key {:?} for {}", key.key_type(), address);
    }

    fn reset_local_identity(&self) {
        debug!("Detached: local identity reset");
    }
}

impl GattBondedDevices for Detached {
    fn add_bonded_device(&self, address: RawAddress) {
        debug!("Detached: GATT bonded {}", address);
    }
}

impl AdapterCallbacks for Detached {
    fn adapter_properties(&self, properties: Vec<Property>) {
        debug!("Detached: {} adapter properties", properties.len());
    }

    fn remote_device_properties(&self, address: RawAddress, properties: Vec<Property>) {
        debug!("Detached: {} properties for {}", properties.len(), address);
    }

    fn address_consolidate(&self, held: RawAddress, identity: RawAddress) {
        debug!("Detached: consolidate {} -> {}", held, identity);
    }

    fn le_address_associate(&self, held: RawAddress, identity: RawAddress) {
        debug!("Detached: associate {} -> {}", held, identity);
    }
}

impl AdapterInfo for Detached {
    fn local_address(&self) -> Option<RawAddress> {
        None
    }

    fn local_uuids(&self) -> Vec<Uuid> {
        Vec::new()
    }
}

impl<R: Send + Sync + 'static> ProfileSink<R> for Detached {
    fn add_from_storage(&self, _record: R) {
        debug!("Detached: dropped {}", std::any::type_name::<R>());
    }
}

// ============================================================================
// COLLABORATOR SET
// ============================================================================

/// Every collaborator the storage layer reports to
#[derive(Clone)]
pub struct Collaborators {
    pub security: Arc<dyn SecurityManager>,
    pub gatt: Arc<dyn GattBondedDevices>,
    pub adapter: Arc<dyn AdapterCallbacks>,
    pub adapter_info: Arc<dyn AdapterInfo>,
    pub hid_host: Arc<dyn ProfileSink<HidHostRecord>>,
    pub hid_device: Arc<dyn ProfileSink<HidDeviceRecord>>,
    pub hearing_aid: Arc<dyn ProfileSink<HearingAidRecord>>,
    pub le_audio: Arc<dyn ProfileSink<LeAudioRecord>>,
    pub has: Arc<dyn ProfileSink<HasRecord>>,
    pub csis: Arc<dyn ProfileSink<CsisRecord>>,
    pub groups: Arc<dyn ProfileSink<GroupRecord>>,
}

impl Default for Collaborators {
    fn default() -> Self {
        let detached = Arc::new(Detached);
        Self {
            security: detached.clone(),
            gatt: detached.clone(),
            adapter: detached.clone(),
            adapter_info: detached.clone(),
            hid_host: detached.clone(),
            hid_device: detached.clone(),
            hearing_aid: detached.clone(),
            le_audio: detached.clone(),
            has: detached.clone(),
            csis: detached.clone(),
            groups: detached,
        }
    }
}
