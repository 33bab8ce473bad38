//! Per-profile metadata accessors
//!
//! Every profile keeps a fixed set of fields in the device section. The
//! shared shape lives in [`ProfileRecord`]: a record knows its field table,
//! how to tell whether a section carries its data, and how to read and write
//! itself. Save, load-all and remove are written once, here.

pub mod csis;
pub mod gatt;
pub mod groups;
pub mod has;
pub mod hearing_aid;
pub mod hid;
pub mod le_audio;

use crate::bonding;
use crate::callbacks::{Collaborators, ProfileSink};
use crate::property::codec::SERVICE;
use crate::property::uuids;
use crate::store::{ConfigStore, WriteBatch};
use crate::types::RawAddress;
use crate::{BondStorage, Result};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub use csis::CsisRecord;
pub use groups::GroupRecord;
pub use has::HasRecord;
pub use hearing_aid::{HearingAidProperties, HearingAidRecord};
pub use hid::{HidDeviceRecord, HidHostRecord};
pub use le_audio::LeAudioRecord;

/// Field-set record stored in a device section
pub trait ProfileRecord: Sized + Send + Sync + 'static {
    /// Name used in logs
    const PROFILE: &'static str;

    /// Every field the record owns; `remove` deletes exactly these
    const FIELDS: &'static [&'static str];

    /// Loads drop the fields of devices that are no longer bonded
    const CLEAN_UNBONDED: bool;

    /// Saves go through the config writer instead of blocking the caller
    const POSTED: bool;

    fn address(&self) -> RawAddress;

    /// Whether the section of `address` carries this profile's data
    fn is_present(store: &dyn ConfigStore, address: &RawAddress) -> bool;

    /// Rebuild the record; absent fields take their defaults
    fn read(store: &dyn ConfigStore, address: RawAddress) -> Self;

    /// Queue the record's fields, without the trailing save
    fn write(&self, section: &str, batch: &mut WriteBatch);

    /// Reject a record that cannot be stored
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Collaborator that receives loaded records
    fn sink(collaborators: &Collaborators) -> &dyn ProfileSink<Self>;
}

// ============================================================================
// FIELD HELPERS
// ============================================================================

/// Integer field or `default` when absent or unreadable
pub(crate) fn int_or(store: &dyn ConfigStore, section: &str, field: &str, default: i32) -> i32 {
    store.get_int(section, field).unwrap_or(default)
}

/// Binary field or empty when absent or unreadable
pub(crate) fn bin_or_empty(store: &dyn ConfigStore, section: &str, field: &str) -> Vec<u8> {
    if store.get_bin_length(section, field) == 0 {
        return Vec::new();
    }
    match store.get_bin(section, field) {
        Ok(value) => value,
        Err(e) => {
            warn!("Ignoring {} for {}: {}", field, section, e);
            Vec::new()
        }
    }
}

/// Whether the stored service list of `address` contains `service`
pub(crate) fn has_service(store: &dyn ConfigStore, address: &RawAddress, service: Uuid) -> bool {
    match store.get_str(&address.to_string(), SERVICE) {
        Ok(value) => uuids::split(&value)
            .map(|list| list.contains(&service))
            .unwrap_or(false),
        Err(_) => false,
    }
}

/// Remove `fields` from the section of `address`, then save.
/// Returns false when any removal failed; the rest are still attempted.
pub fn remove_fields(store: &dyn ConfigStore, address: &RawAddress, fields: &[&str]) -> bool {
    let section = address.to_string();
    let mut ok = true;
    for field in fields {
        if let Err(e) = store.remove(&section, field) {
            warn!("Failed to remove {} for {}: {}", field, address, e);
            ok = false;
        }
    }
    store.save();
    ok
}

// ============================================================================
// GENERIC OPERATIONS
// ============================================================================

impl BondStorage {
    /// Store every field of `record`, then save
    pub fn save_profile<R: ProfileRecord>(&self, record: &R) -> Result<()> {
        record.validate()?;
        let address = record.address();
        debug!("Saving {} record for {}", R::PROFILE, address);

        let mut batch = WriteBatch::new();
        record.write(&address.to_string(), &mut batch);
        batch.save();

        if R::POSTED {
            self.post(batch);
        } else {
            batch.apply(self.config());
        }
        Ok(())
    }

    /// Hand a record to the profile's collaborator for every paired device
    /// that carries its data. Returns the number of records delivered.
    pub fn load_profile<R: ProfileRecord>(&self) -> usize {
        let store = self.config();
        let sink = R::sink(self.collaborators());
        let mut delivered = 0;

        for address in store.paired_devices() {
            if !R::is_present(store, &address) {
                continue;
            }
            if R::CLEAN_UNBONDED && !bonding::has_bond(store, &address) {
                info!("Removing stale {} data for unbonded {}", R::PROFILE, address);
                remove_fields(store, &address, R::FIELDS);
                continue;
            }
            debug!("Loading {} record for {}", R::PROFILE, address);
            sink.add_from_storage(R::read(store, address));
            delivered += 1;
        }
        delivered
    }

    /// Delete the profile's fields for `address`, then save
    pub fn remove_profile<R: ProfileRecord>(&self, address: &RawAddress) -> bool {
        debug!("Removing {} record for {}", R::PROFILE, address);
        remove_fields(self.config(), address, R::FIELDS)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::callbacks::ProfileSink;
    use parking_lot::Mutex;

    /// Sink that keeps every record it is handed
    pub struct RecordingSink<R> {
        pub records: Mutex<Vec<R>>,
    }

    impl<R> Default for RecordingSink<R> {
        fn default() -> Self {
            Self {
                records: Mutex::new(Vec::new()),
            }
        }
    }

    impl<R: Send + Sync + 'static> ProfileSink<R> for RecordingSink<R> {
        fn add_from_storage(&self, record: R) {
            self.records.lock().push(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryConfig;
    use crate::types::bt_uuid::{HEARING_AID_UUID, LE_AUDIO_UUID};

    fn addr() -> RawAddress {
        "aa:bb:cc:dd:ee:ff".parse().unwrap()
    }

    #[test]
    fn test_has_service() {
        let store = MemoryConfig::new();
        assert!(!has_service(&store, &addr(), HEARING_AID_UUID));

        let list = uuids::join(&[LE_AUDIO_UUID]);
        store.set_str("aa:bb:cc:dd:ee:ff", SERVICE, &list).unwrap();
        assert!(has_service(&store, &addr(), LE_AUDIO_UUID));
        assert!(!has_service(&store, &addr(), HEARING_AID_UUID));

        store.set_str("aa:bb:cc:dd:ee:ff", SERVICE, "garbage ").unwrap();
        assert!(!has_service(&store, &addr(), LE_AUDIO_UUID));
    }

    #[test]
    fn test_remove_fields_saves_once() {
        let store = MemoryConfig::new();
        store.set_int("aa:bb:cc:dd:ee:ff", "A", 1).unwrap();
        assert!(remove_fields(&store, &addr(), &["A", "B"]));
        assert_eq!(store.save_count(), 1);
        assert!(store.section("aa:bb:cc:dd:ee:ff").is_none());
    }

    #[test]
    fn test_field_defaults() {
        let store = MemoryConfig::new();
        assert_eq!(int_or(&store, "s", "missing", 7), 7);
        store.set_str("s", "bad", "xyz").unwrap();
        assert_eq!(int_or(&store, "s", "bad", 3), 3);
        assert!(bin_or_empty(&store, "s", "bad").is_empty());
        store.set_bin("s", "blob", &[1, 2]).unwrap();
        assert_eq!(bin_or_empty(&store, "s", "blob"), vec![1, 2]);
    }
}
