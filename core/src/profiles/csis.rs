// Coordinated set identification (CSIS) records

use super::{bin_or_empty, int_or, ProfileRecord};
use crate::callbacks::{Collaborators, ProfileSink};
use crate::store::{ConfigStore, WriteBatch};
use crate::types::RawAddress;
use crate::{BondStorage, Result};
use tracing::debug;

pub const CSIS_AUTOCONNECT: &str = "CsisAutoconnect";
pub const CSIS_SET_INFO_BIN: &str = "CsisSetInfoBin";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsisRecord {
    pub address: RawAddress,
    pub autoconnect: bool,
    /// Set membership in the CSIS client's serialization
    pub set_info: Vec<u8>,
}

impl ProfileRecord for CsisRecord {
    const PROFILE: &'static str = "CSIS";
    const FIELDS: &'static [&'static str] = &[CSIS_AUTOCONNECT, CSIS_SET_INFO_BIN];
    const CLEAN_UNBONDED: bool = false;
    const POSTED: bool = true;

    fn address(&self) -> RawAddress {
        self.address
    }

    fn is_present(store: &dyn ConfigStore, address: &RawAddress) -> bool {
        let section = address.to_string();
        store.get_bin_length(&section, CSIS_SET_INFO_BIN) != 0
            || int_or(store, &section, CSIS_AUTOCONNECT, 0) != 0
    }

    fn read(store: &dyn ConfigStore, address: RawAddress) -> Self {
        let section = address.to_string();
        Self {
            address,
            autoconnect: int_or(store, &section, CSIS_AUTOCONNECT, 0) != 0,
            set_info: bin_or_empty(store, &section, CSIS_SET_INFO_BIN),
        }
    }

    fn write(&self, section: &str, batch: &mut WriteBatch) {
        batch.set_int(section, CSIS_AUTOCONNECT, self.autoconnect as i32);
        if !self.set_info.is_empty() {
            batch.set_bin(section, CSIS_SET_INFO_BIN, &self.set_info);
        }
    }

    fn sink(collaborators: &Collaborators) -> &dyn ProfileSink<Self> {
        collaborators.csis.as_ref()
    }
}

impl BondStorage {
    pub fn save_csis_device(&self, record: &CsisRecord) -> Result<()> {
        self.save_profile(record)
    }

    pub fn load_bonded_csis_devices(&self) -> usize {
        self.load_profile::<CsisRecord>()
    }

    pub fn remove_csis_device(&self, address: &RawAddress) -> bool {
        self.remove_profile::<CsisRecord>(address)
    }

    pub fn set_csis_autoconnect(&self, address: &RawAddress, autoconnect: bool) {
        debug!("Storing CSIS device {}", address);
        let mut batch = WriteBatch::new();
        batch
            .set_int(&address.to_string(), CSIS_AUTOCONNECT, autoconnect as i32)
            .save();
        self.post(batch);
    }

    /// Store the set info blob; an empty blob is not stored
    pub fn update_csis_info(&self, address: &RawAddress, set_info: &[u8]) {
        self.post_blob(address, CSIS_SET_INFO_BIN, set_info);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::MockProfileSink;
    use crate::settings::StorageSettings;
    use crate::store::MemoryConfig;
    use std::sync::Arc;

    fn addr(last: u8) -> RawAddress {
        RawAddress::new([0x20, 0, 0, 0, 0, last])
    }

    #[test]
    fn test_load_requires_blob_or_autoconnect() {
        let store = Arc::new(MemoryConfig::new());
        for last in 1..=3 {
            store.set_int(&addr(last).to_string(), "DevType", 2).unwrap();
        }

        let mut sink = MockProfileSink::<CsisRecord>::new();
        sink.expect_add_from_storage()
            .withf(|record| record.address == addr(1) && record.autoconnect && record.set_info.is_empty())
            .times(1)
            .return_const(());
        sink.expect_add_from_storage()
            .withf(|record| record.address == addr(2) && !record.autoconnect && record.set_info == vec![0xab])
            .times(1)
            .return_const(());
        let collaborators = Collaborators {
            csis: Arc::new(sink),
            ..Default::default()
        };
        let storage = BondStorage::new(store.clone(), StorageSettings::default(), collaborators);

        storage.set_csis_autoconnect(&addr(1), true);
        storage.update_csis_info(&addr(2), &[0xab]);
        storage.set_csis_autoconnect(&addr(3), false);
        storage.update_csis_info(&addr(3), &[]);

        assert_eq!(storage.load_bonded_csis_devices(), 2);
    }

    #[test]
    fn test_remove() {
        let store = Arc::new(MemoryConfig::new());
        let storage = BondStorage::new(store.clone(), StorageSettings::default(), Collaborators::default());
        storage
            .save_csis_device(&CsisRecord {
                address: addr(1),
                autoconnect: true,
                set_info: vec![1, 2],
            })
            .unwrap();
        assert_eq!(store.save_count(), 1);

        assert!(storage.remove_csis_device(&addr(1)));
        assert!(store.section(&addr(1).to_string()).is_none());
    }
}
