// Recording collaborators shared by the integration tests
#![allow(dead_code)]

use bondstore_core::callbacks::{AdapterCallbacks, AdapterInfo, GattBondedDevices, ProfileSink, SecurityManager};
use bondstore_core::types::DevClass;
use bondstore_core::{AddressType, Collaborators, DeviceType, LeKey, LinkKey, Property, RawAddress};
use parking_lot::Mutex;
use std::sync::Arc;
use uuid::Uuid;

/// One observed collaborator call
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    ClassicDevice {
        address: RawAddress,
        dev_class: DevClass,
        key_type: u8,
        pin_length: u8,
    },
    BleDevice(RawAddress, DeviceType, AddressType),
    BleKey(RawAddress, LeKey),
    ResetIdentity,
    GattBonded(RawAddress),
    AdapterProperties(Vec<Property>),
    RemoteProperties(RawAddress, Vec<Property>),
    Consolidate(RawAddress, RawAddress),
    Associate(RawAddress, RawAddress),
}

/// Collects every call in arrival order
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<Event>>,
    pub local_address: Option<RawAddress>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_local_address(address: RawAddress) -> Arc<Self> {
        Arc::new(Self {
            local_address: Some(address),
            ..Self::default()
        })
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    fn push(&self, event: Event) {
        self.events.lock().push(event);
    }
}

impl SecurityManager for Recorder {
    fn add_classic_device(
        &self,
        address: RawAddress,
        dev_class: DevClass,
        _link_key: LinkKey,
        key_type: u8,
        pin_length: u8,
    ) {
        self.push(Event::ClassicDevice {
            address,
            dev_class,
            key_type,
            pin_length,
        });
    }

    fn add_ble_device(&self, address: RawAddress, device_type: DeviceType, address_type: AddressType) {
        self.push(Event::BleDevice(address, device_type, address_type));
    }

    fn add_ble_key(&self, address: RawAddress, key: LeKey) {
        self.push(Event::BleKey(address, key));
    }

    fn reset_local_identity(&self) {
        self.push(Event::ResetIdentity);
    }
}

impl GattBondedDevices for Recorder {
    fn add_bonded_device(&self, address: RawAddress) {
        self.push(Event::GattBonded(address));
    }
}

impl AdapterCallbacks for Recorder {
    fn adapter_properties(&self, properties: Vec<Property>) {
        self.push(Event::AdapterProperties(properties));
    }

    fn remote_device_properties(&self, address: RawAddress, properties: Vec<Property>) {
        self.push(Event::RemoteProperties(address, properties));
    }

    fn address_consolidate(&self, held: RawAddress, identity: RawAddress) {
        self.push(Event::Consolidate(held, identity));
    }

    fn le_address_associate(&self, held: RawAddress, identity: RawAddress) {
        self.push(Event::Associate(held, identity));
    }
}

impl AdapterInfo for Recorder {
    fn local_address(&self) -> Option<RawAddress> {
        self.local_address
    }

    fn local_uuids(&self) -> Vec<Uuid> {
        Vec::new()
    }
}

/// Keeps the records handed to one profile
pub struct Records<R> {
    records: Mutex<Vec<R>>,
}

impl<R: Clone> Records<R> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            records: Mutex::new(Vec::new()),
        })
    }

    pub fn taken(&self) -> Vec<R> {
        self.records.lock().clone()
    }
}

impl<R: Send + Sync + 'static> ProfileSink<R> for Records<R> {
    fn add_from_storage(&self, record: R) {
        self.records.lock().push(record);
    }
}

/// Collaborators with the security manager, GATT and adapter slots wired to
/// `recorder`
pub fn recorded(recorder: &Arc<Recorder>) -> Collaborators {
    Collaborators {
        security: recorder.clone(),
        gatt: recorder.clone(),
        adapter: recorder.clone(),
        adapter_info: recorder.clone(),
        ..Default::default()
    }
}

pub fn addr(s: &str) -> RawAddress {
    s.parse().unwrap()
}
