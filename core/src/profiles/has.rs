// Hearing access service (HAS) records

use super::{bin_or_empty, int_or, ProfileRecord};
use crate::callbacks::{Collaborators, ProfileSink};
use crate::store::{ConfigStore, WriteBatch};
use crate::types::RawAddress;
use crate::{BondStorage, Result};

pub const HAS_IS_ACCEPTLISTED: &str = "LeAudioHasIsAcceptlisted";
pub const HAS_FEATURES: &str = "LeAudioHasFlags";
pub const HAS_ACTIVE_PRESET: &str = "LeAudioHasActivePreset";
pub const HAS_SERIALIZED_PRESETS: &str = "LeAudioHasSerializedPresets";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HasRecord {
    pub address: RawAddress,
    pub features: u8,
    pub active_preset: u8,
    pub presets: Vec<u8>,
    pub is_acceptlisted: bool,
}

impl ProfileRecord for HasRecord {
    const PROFILE: &'static str = "HAS";
    const FIELDS: &'static [&'static str] = &[
        HAS_IS_ACCEPTLISTED,
        HAS_FEATURES,
        HAS_ACTIVE_PRESET,
        HAS_SERIALIZED_PRESETS,
    ];
    const CLEAN_UNBONDED: bool = false;
    const POSTED: bool = true;

    fn address(&self) -> RawAddress {
        self.address
    }

    fn is_present(store: &dyn ConfigStore, address: &RawAddress) -> bool {
        let section = address.to_string();
        store.exists(&section, HAS_IS_ACCEPTLISTED) || store.exists(&section, HAS_FEATURES)
    }

    fn read(store: &dyn ConfigStore, address: RawAddress) -> Self {
        let section = address.to_string();
        Self {
            address,
            features: int_or(store, &section, HAS_FEATURES, 0) as u8,
            active_preset: int_or(store, &section, HAS_ACTIVE_PRESET, 0) as u8,
            presets: bin_or_empty(store, &section, HAS_SERIALIZED_PRESETS),
            is_acceptlisted: int_or(store, &section, HAS_IS_ACCEPTLISTED, 0) != 0,
        }
    }

    /// Adding a device acceptlists it
    fn write(&self, section: &str, batch: &mut WriteBatch) {
        batch
            .set_int(section, HAS_FEATURES, self.features as i32)
            .set_int(section, HAS_ACTIVE_PRESET, self.active_preset as i32)
            .set_bin(section, HAS_SERIALIZED_PRESETS, &self.presets)
            .set_int(section, HAS_IS_ACCEPTLISTED, 1);
    }

    fn sink(collaborators: &Collaborators) -> &dyn ProfileSink<Self> {
        collaborators.has.as_ref()
    }
}

impl BondStorage {
    pub fn add_leaudio_has_device(&self, record: &HasRecord) -> Result<()> {
        self.save_profile(record)
    }

    pub fn load_bonded_leaudio_has_devices(&self) -> usize {
        self.load_profile::<HasRecord>()
    }

    pub fn remove_leaudio_has(&self, address: &RawAddress) -> bool {
        self.remove_profile::<HasRecord>(address)
    }

    pub fn set_leaudio_has_active_preset(&self, address: &RawAddress, active_preset: u8) {
        let mut batch = WriteBatch::new();
        batch
            .set_int(&address.to_string(), HAS_ACTIVE_PRESET, active_preset as i32)
            .save();
        self.post(batch);
    }

    pub fn set_leaudio_has_features(&self, address: &RawAddress, features: u8) {
        let mut batch = WriteBatch::new();
        batch
            .set_int(&address.to_string(), HAS_FEATURES, features as i32)
            .save();
        self.post(batch);
    }

    pub fn set_leaudio_has_presets(&self, address: &RawAddress, presets: &[u8]) {
        let mut batch = WriteBatch::new();
        batch
            .set_bin(&address.to_string(), HAS_SERIALIZED_PRESETS, presets)
            .save();
        self.post(batch);
    }

    /// Synchronous, unlike the other HAS setters
    pub fn set_leaudio_has_acceptlist(&self, address: &RawAddress, add_to_acceptlist: bool) -> Result<()> {
        let store = self.config();
        store.set_int(&address.to_string(), HAS_IS_ACCEPTLISTED, add_to_acceptlist as i32)?;
        store.save();
        Ok(())
    }

    pub fn get_leaudio_has_features(&self, address: &RawAddress) -> Option<u8> {
        self.config()
            .get_int(&address.to_string(), HAS_FEATURES)
            .ok()
            .map(|features| features as u8)
    }

    /// Active preset and serialized presets; `None` without an active preset
    pub fn get_leaudio_has_presets(&self, address: &RawAddress) -> Option<(u8, Vec<u8>)> {
        let store = self.config();
        let section = address.to_string();
        let active = store.get_int(&section, HAS_ACTIVE_PRESET).ok()? as u8;
        let presets = store.get_bin(&section, HAS_SERIALIZED_PRESETS).ok()?;
        Some((active, presets))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::test_support::RecordingSink;
    use crate::settings::StorageSettings;
    use crate::store::MemoryConfig;
    use std::sync::Arc;

    fn addr() -> RawAddress {
        "11:22:33:44:55:66".parse().unwrap()
    }

    fn storage(store: &Arc<MemoryConfig>, collaborators: Collaborators) -> BondStorage {
        BondStorage::new(store.clone(), StorageSettings::default(), collaborators)
    }

    #[test]
    fn test_add_and_getters() {
        let store = Arc::new(MemoryConfig::new());
        let storage = storage(&store, Collaborators::default());
        assert_eq!(storage.get_leaudio_has_features(&addr()), None);
        assert_eq!(storage.get_leaudio_has_presets(&addr()), None);

        storage
            .add_leaudio_has_device(&HasRecord {
                address: addr(),
                features: 0x0b,
                active_preset: 2,
                presets: vec![1, 2, 3],
                is_acceptlisted: false,
            })
            .unwrap();
        assert_eq!(storage.get_leaudio_has_features(&addr()), Some(0x0b));
        assert_eq!(storage.get_leaudio_has_presets(&addr()), Some((2, vec![1, 2, 3])));

        storage.set_leaudio_has_active_preset(&addr(), 3);
        storage.set_leaudio_has_presets(&addr(), &[7]);
        assert_eq!(storage.get_leaudio_has_presets(&addr()), Some((3, vec![7])));
    }

    #[test]
    fn test_load_filters_on_marker_fields() {
        let store = Arc::new(MemoryConfig::new());
        let other: RawAddress = "11:22:33:44:55:77".parse().unwrap();
        // Paired sections with no HAS data are skipped
        store.set_int(&other.to_string(), "DevType", 2).unwrap();
        store.set_int(&addr().to_string(), "DevType", 2).unwrap();

        let sink = Arc::new(RecordingSink::<HasRecord>::default());
        let storage = storage(
            &store,
            Collaborators {
                has: sink.clone(),
                ..Default::default()
            },
        );
        storage.set_leaudio_has_features(&addr(), 0x04);
        storage.set_leaudio_has_acceptlist(&addr(), true).unwrap();

        assert_eq!(storage.load_bonded_leaudio_has_devices(), 1);
        assert_eq!(
            *sink.records.lock(),
            vec![HasRecord {
                address: addr(),
                features: 0x04,
                is_acceptlisted: true,
                ..Default::default()
            }]
        );
    }

    #[test]
    fn test_remove() {
        let store = Arc::new(MemoryConfig::new());
        let storage = storage(&store, Collaborators::default());
        storage
            .add_leaudio_has_device(&HasRecord {
                address: addr(),
                ..Default::default()
            })
            .unwrap();
        assert!(storage.remove_leaudio_has(&addr()));
        assert!(store.section(&addr().to_string()).is_none());
    }
}
