// HID host and HID device records

use super::{bin_or_empty, int_or, remove_fields, ProfileRecord};
use crate::bonding;
use crate::callbacks::{Collaborators, ProfileSink};
use crate::store::{ConfigStore, WriteBatch};
use crate::types::RawAddress;
use crate::{BondStorage, Result, StorageError};
use tracing::{debug, info};

pub const HID_ATTR_MASK: &str = "HidAttrMask";
pub const HID_SUB_CLASS: &str = "HidSubClass";
pub const HID_APP_ID: &str = "HidAppId";
pub const HID_VENDOR_ID: &str = "HidVendorId";
pub const HID_PRODUCT_ID: &str = "HidProductId";
pub const HID_VERSION: &str = "HidVersion";
pub const HID_COUNTRY_CODE: &str = "HidCountryCode";
pub const HID_SSR_MAX_LATENCY: &str = "HidSSRMaxLatency";
pub const HID_SSR_MIN_TIMEOUT: &str = "HidSSRMinTimeout";
pub const HID_DESCRIPTOR: &str = "HidDescriptor";
pub const HID_RECONNECT_ALLOWED: &str = "HidReConnectAllowed";
pub const HID_DEVICE_CABLED: &str = "HidDeviceCabled";

/// Largest report descriptor kept in the store
pub const MAX_HID_DESCRIPTOR_LEN: usize = 1024;

/// Host-side HID record for a bonded peripheral
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HidHostRecord {
    pub address: RawAddress,
    pub attr_mask: u16,
    pub sub_class: u8,
    pub app_id: u8,
    pub vendor_id: u16,
    pub product_id: u16,
    pub version: u16,
    pub country_code: u8,
    pub ssr_max_latency: u16,
    pub ssr_min_timeout: u16,
    pub descriptor: Vec<u8>,
    /// Written only through the connection policy setter
    pub reconnect_allowed: bool,
}

impl HidHostRecord {
    pub fn new(address: RawAddress) -> Self {
        Self {
            address,
            attr_mask: 0,
            sub_class: 0,
            app_id: 0,
            vendor_id: 0,
            product_id: 0,
            version: 0,
            country_code: 0,
            ssr_max_latency: 0,
            ssr_min_timeout: 0,
            descriptor: Vec::new(),
            reconnect_allowed: true,
        }
    }
}

impl ProfileRecord for HidHostRecord {
    const PROFILE: &'static str = "HID host";
    const FIELDS: &'static [&'static str] = &[
        HID_ATTR_MASK,
        HID_SUB_CLASS,
        HID_APP_ID,
        HID_VENDOR_ID,
        HID_PRODUCT_ID,
        HID_VERSION,
        HID_COUNTRY_CODE,
        HID_SSR_MAX_LATENCY,
        HID_SSR_MIN_TIMEOUT,
        HID_DESCRIPTOR,
        HID_RECONNECT_ALLOWED,
    ];
    const CLEAN_UNBONDED: bool = true;
    const POSTED: bool = false;

    fn address(&self) -> RawAddress {
        self.address
    }

    fn is_present(store: &dyn ConfigStore, address: &RawAddress) -> bool {
        store.get_int(&address.to_string(), HID_ATTR_MASK).is_ok()
    }

    fn read(store: &dyn ConfigStore, address: RawAddress) -> Self {
        let section = address.to_string();
        let int = |field: &str| int_or(store, &section, field, 0);

        let mut descriptor = bin_or_empty(store, &section, HID_DESCRIPTOR);
        if descriptor.len() > MAX_HID_DESCRIPTOR_LEN {
            debug!("Oversized HID descriptor for {}, ignoring", address);
            descriptor.clear();
        }

        Self {
            address,
            attr_mask: int(HID_ATTR_MASK) as u16,
            sub_class: int(HID_SUB_CLASS) as u8,
            app_id: int(HID_APP_ID) as u8,
            vendor_id: int(HID_VENDOR_ID) as u16,
            product_id: int(HID_PRODUCT_ID) as u16,
            version: int(HID_VERSION) as u16,
            country_code: int(HID_COUNTRY_CODE) as u8,
            ssr_max_latency: int(HID_SSR_MAX_LATENCY) as u16,
            ssr_min_timeout: int(HID_SSR_MIN_TIMEOUT) as u16,
            descriptor,
            reconnect_allowed: int_or(store, &section, HID_RECONNECT_ALLOWED, 1) != 0,
        }
    }

    fn write(&self, section: &str, batch: &mut WriteBatch) {
        batch
            .set_int(section, HID_ATTR_MASK, self.attr_mask as i32)
            .set_int(section, HID_SUB_CLASS, self.sub_class as i32)
            .set_int(section, HID_APP_ID, self.app_id as i32)
            .set_int(section, HID_VENDOR_ID, self.vendor_id as i32)
            .set_int(section, HID_PRODUCT_ID, self.product_id as i32)
            .set_int(section, HID_VERSION, self.version as i32)
            .set_int(section, HID_COUNTRY_CODE, self.country_code as i32)
            .set_int(section, HID_SSR_MAX_LATENCY, self.ssr_max_latency as i32)
            .set_int(section, HID_SSR_MIN_TIMEOUT, self.ssr_min_timeout as i32);
        if !self.descriptor.is_empty() {
            batch.set_bin(section, HID_DESCRIPTOR, &self.descriptor);
        }
    }

    fn validate(&self) -> Result<()> {
        if self.descriptor.len() > MAX_HID_DESCRIPTOR_LEN {
            return Err(StorageError::Malformed(format!(
                "HID descriptor of {} bytes exceeds {}",
                self.descriptor.len(),
                MAX_HID_DESCRIPTOR_LEN
            )));
        }
        Ok(())
    }

    fn sink(collaborators: &Collaborators) -> &dyn ProfileSink<Self> {
        collaborators.hid_host.as_ref()
    }
}

/// The host this adapter serves as a HID device over a cable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HidDeviceRecord {
    pub address: RawAddress,
}

impl BondStorage {
    pub fn add_hid_device_info(&self, record: &HidHostRecord) -> Result<()> {
        self.save_profile(record)
    }

    pub fn load_bonded_hid_info(&self) -> usize {
        self.load_profile::<HidHostRecord>()
    }

    pub fn remove_hid_info(&self, address: &RawAddress) -> bool {
        self.remove_profile::<HidHostRecord>(address)
    }

    /// Store whether the host may reconnect to `address`; not saved
    pub fn set_hid_connection_policy(&self, address: &RawAddress, reconnect_allowed: bool) -> Result<()> {
        self.config().set_int(
            &address.to_string(),
            HID_RECONNECT_ALLOWED,
            reconnect_allowed as i32,
        )
    }

    /// Reconnection is allowed unless explicitly disabled
    pub fn get_hid_connection_policy(&self, address: &RawAddress) -> bool {
        int_or(self.config(), &address.to_string(), HID_RECONNECT_ALLOWED, 1) != 0
    }

    /// Report the first bonded device marked as cabled HID host, if any
    pub fn load_hidd(&self) -> Option<HidDeviceRecord> {
        let store = self.config();
        let record = store
            .paired_devices()
            .into_iter()
            .filter(|address| bonding::has_bond(store, address))
            .find(|address| store.get_int(&address.to_string(), HID_DEVICE_CABLED).is_ok())
            .map(|address| HidDeviceRecord { address })?;

        info!("Cabled HID host {}", record.address);
        self.collaborators().hid_device.add_from_storage(record);
        Some(record)
    }

    /// Mark `address` as the cabled HID host and clear the mark on every
    /// other bonded device
    pub fn set_hidd(&self, address: &RawAddress) -> Result<()> {
        let store = self.config();
        for other in store.paired_devices() {
            if other == *address || !bonding::has_bond(store, &other) {
                continue;
            }
            store.remove(&other.to_string(), HID_DEVICE_CABLED)?;
        }
        store.set_int(&address.to_string(), HID_DEVICE_CABLED, 1)?;
        store.save();
        Ok(())
    }

    pub fn remove_hidd(&self, address: &RawAddress) -> bool {
        remove_fields(self.config(), address, &[HID_DEVICE_CABLED])
    }
}
