// Device group membership

use super::{bin_or_empty, ProfileRecord};
use crate::callbacks::{Collaborators, ProfileSink};
use crate::store::{ConfigStore, WriteBatch};
use crate::types::RawAddress;
use crate::{BondStorage, Result, StorageError};

pub const DEVICE_GROUP_BIN: &str = "DeviceGroupBin";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupRecord {
    pub address: RawAddress,
    pub group_info: Vec<u8>,
}

impl ProfileRecord for GroupRecord {
    const PROFILE: &'static str = "device group";
    const FIELDS: &'static [&'static str] = &[DEVICE_GROUP_BIN];
    const CLEAN_UNBONDED: bool = false;
    const POSTED: bool = true;

    fn address(&self) -> RawAddress {
        self.address
    }

    fn is_present(store: &dyn ConfigStore, address: &RawAddress) -> bool {
        store.get_bin_length(&address.to_string(), DEVICE_GROUP_BIN) != 0
    }

    fn read(store: &dyn ConfigStore, address: RawAddress) -> Self {
        Self {
            address,
            group_info: bin_or_empty(store, &address.to_string(), DEVICE_GROUP_BIN),
        }
    }

    fn write(&self, section: &str, batch: &mut WriteBatch) {
        batch.set_bin(section, DEVICE_GROUP_BIN, &self.group_info);
    }

    fn validate(&self) -> Result<()> {
        if self.group_info.is_empty() {
            return Err(StorageError::Malformed("empty group info".into()));
        }
        Ok(())
    }

    fn sink(collaborators: &Collaborators) -> &dyn ProfileSink<Self> {
        collaborators.groups.as_ref()
    }
}

impl BondStorage {
    pub fn add_groups(&self, record: &GroupRecord) -> Result<()> {
        self.save_profile(record)
    }

    pub fn load_bonded_groups(&self) -> usize {
        self.load_profile::<GroupRecord>()
    }

    pub fn remove_groups(&self, address: &RawAddress) -> bool {
        self.remove_profile::<GroupRecord>(address)
    }
}
