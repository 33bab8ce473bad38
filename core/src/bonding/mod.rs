//! Bonding key store
//!
//! Classic link keys, the six LE key records, and the local LE root keys.
//! Also answers the single-device question "is this address bonded", which
//! the codec uses to decide whether a remote write is flushed.

pub mod classic;
pub mod le_keys;
pub mod local_keys;

use crate::property::codec::DEV_TYPE;
use crate::store::ConfigStore;
use crate::types::{DeviceType, RawAddress};

pub use classic::{is_classic_bonded, read_classic_bond, read_link_key};
pub use le_keys::{
    get_le_key, get_le_key_bytes, has_le_keys, remove_le_keys, LcsrkKey, LeKey, LeKeyType,
    LencKey, Octet16, PcsrkKey, PencKey, PidKey,
};
pub use local_keys::LocalKeyType;

/// Whether `address` is a candidate for the LE path: it has a device type and
/// that type has the LE bit, or it holds a peer encryption key.
pub fn is_le_candidate(store: &dyn ConfigStore, address: &RawAddress) -> bool {
    let section = address.to_string();
    match store.get_int(&section, DEV_TYPE) {
        Ok(device_type) => {
            DeviceType::raw_has_le(device_type) || store.exists(&section, LeKeyType::Penc.field())
        }
        Err(_) => false,
    }
}

/// LE candidate with at least one readable key record
pub fn is_le_bonded(store: &dyn ConfigStore, address: &RawAddress) -> bool {
    if !is_le_candidate(store, address) {
        return false;
    }
    LeKeyType::LOAD_ORDER.iter().any(|key_type| {
        let mut buf = vec![0u8; key_type.size()];
        get_le_key_bytes(store, address, *key_type, &mut buf).is_ok()
    })
}

/// Bonded under either transport
pub fn has_bond(store: &dyn ConfigStore, address: &RawAddress) -> bool {
    is_classic_bonded(store, address) || is_le_bonded(store, address)
}
