// LE audio records
//
// Everything but the autoconnect flag is produced by the LE audio client and
// stored opaquely. Handles, PACs and ASEs are blobs in the client's own
// serialization.

use super::{bin_or_empty, has_service, int_or, ProfileRecord};
use crate::callbacks::{Collaborators, ProfileSink};
use crate::store::{ConfigStore, WriteBatch};
use crate::types::bt_uuid::LE_AUDIO_UUID;
use crate::types::RawAddress;
use crate::{BondStorage, Result};
use tracing::debug;

pub const LE_AUDIO_AUTOCONNECT: &str = "LeAudioAutoconnect";
pub const LE_AUDIO_HANDLES_BIN: &str = "LeAudioHandlesBin";
pub const LE_AUDIO_SINK_PACS_BIN: &str = "SinkPacsBin";
pub const LE_AUDIO_SOURCE_PACS_BIN: &str = "SourcePacsBin";
pub const LE_AUDIO_ASES_BIN: &str = "AsesBin";
pub const LE_AUDIO_SINK_AUDIO_LOCATION: &str = "SinkAudioLocation";
pub const LE_AUDIO_SOURCE_AUDIO_LOCATION: &str = "SourceAudioLocation";
pub const LE_AUDIO_SINK_CONTEXT_TYPE: &str = "SinkSupportedContextType";
pub const LE_AUDIO_SOURCE_CONTEXT_TYPE: &str = "SourceSupportedContextType";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeAudioRecord {
    pub address: RawAddress,
    pub autoconnect: bool,
    pub sink_audio_location: u32,
    pub source_audio_location: u32,
    pub sink_supported_context_types: u16,
    pub source_supported_context_types: u16,
    pub handles: Vec<u8>,
    pub sink_pacs: Vec<u8>,
    pub source_pacs: Vec<u8>,
    pub ases: Vec<u8>,
}

impl ProfileRecord for LeAudioRecord {
    const PROFILE: &'static str = "LE audio";
    const FIELDS: &'static [&'static str] = &[
        LE_AUDIO_AUTOCONNECT,
        LE_AUDIO_SINK_AUDIO_LOCATION,
        LE_AUDIO_SOURCE_AUDIO_LOCATION,
        LE_AUDIO_SINK_CONTEXT_TYPE,
        LE_AUDIO_SOURCE_CONTEXT_TYPE,
        LE_AUDIO_HANDLES_BIN,
        LE_AUDIO_SINK_PACS_BIN,
        LE_AUDIO_SOURCE_PACS_BIN,
        LE_AUDIO_ASES_BIN,
    ];
    const CLEAN_UNBONDED: bool = true;
    const POSTED: bool = true;

    fn address(&self) -> RawAddress {
        self.address
    }

    fn is_present(store: &dyn ConfigStore, address: &RawAddress) -> bool {
        has_service(store, address, LE_AUDIO_UUID)
    }

    fn read(store: &dyn ConfigStore, address: RawAddress) -> Self {
        let section = address.to_string();
        let int = |field: &str| int_or(store, &section, field, 0);
        let bin = |field: &str| bin_or_empty(store, &section, field);

        Self {
            address,
            autoconnect: int(LE_AUDIO_AUTOCONNECT) != 0,
            sink_audio_location: int(LE_AUDIO_SINK_AUDIO_LOCATION) as u32,
            source_audio_location: int(LE_AUDIO_SOURCE_AUDIO_LOCATION) as u32,
            sink_supported_context_types: int(LE_AUDIO_SINK_CONTEXT_TYPE) as u16,
            source_supported_context_types: int(LE_AUDIO_SOURCE_CONTEXT_TYPE) as u16,
            handles: bin(LE_AUDIO_HANDLES_BIN),
            sink_pacs: bin(LE_AUDIO_SINK_PACS_BIN),
            source_pacs: bin(LE_AUDIO_SOURCE_PACS_BIN),
            ases: bin(LE_AUDIO_ASES_BIN),
        }
    }

    fn write(&self, section: &str, batch: &mut WriteBatch) {
        batch
            .set_int(section, LE_AUDIO_AUTOCONNECT, self.autoconnect as i32)
            .set_int(section, LE_AUDIO_SINK_AUDIO_LOCATION, self.sink_audio_location as i32)
            .set_int(section, LE_AUDIO_SOURCE_AUDIO_LOCATION, self.source_audio_location as i32)
            .set_int(section, LE_AUDIO_SINK_CONTEXT_TYPE, self.sink_supported_context_types as i32)
            .set_int(section, LE_AUDIO_SOURCE_CONTEXT_TYPE, self.source_supported_context_types as i32);
        for (field, blob) in [
            (LE_AUDIO_HANDLES_BIN, &self.handles),
            (LE_AUDIO_SINK_PACS_BIN, &self.sink_pacs),
            (LE_AUDIO_SOURCE_PACS_BIN, &self.source_pacs),
            (LE_AUDIO_ASES_BIN, &self.ases),
        ] {
            if !blob.is_empty() {
                batch.set_bin(section, field, blob);
            }
        }
    }

    fn sink(collaborators: &Collaborators) -> &dyn ProfileSink<Self> {
        collaborators.le_audio.as_ref()
    }
}

impl BondStorage {
    pub fn save_leaudio(&self, record: &LeAudioRecord) -> Result<()> {
        self.save_profile(record)
    }

    pub fn load_bonded_leaudio(&self) -> usize {
        self.load_profile::<LeAudioRecord>()
    }

    pub fn remove_leaudio(&self, address: &RawAddress) -> bool {
        self.remove_profile::<LeAudioRecord>(address)
    }

    pub fn set_leaudio_autoconnect(&self, address: &RawAddress, autoconnect: bool) {
        debug!("Saving LE audio autoconnect for {}", address);
        let mut batch = WriteBatch::new();
        batch
            .set_int(&address.to_string(), LE_AUDIO_AUTOCONNECT, autoconnect as i32)
            .save();
        self.post(batch);
    }

    pub fn set_leaudio_audio_location(&self, address: &RawAddress, sink: u32, source: u32) {
        let section = address.to_string();
        let mut batch = WriteBatch::new();
        batch
            .set_int(&section, LE_AUDIO_SINK_AUDIO_LOCATION, sink as i32)
            .set_int(&section, LE_AUDIO_SOURCE_AUDIO_LOCATION, source as i32)
            .save();
        self.post(batch);
    }

    pub fn set_leaudio_supported_context_types(&self, address: &RawAddress, sink: u16, source: u16) {
        let section = address.to_string();
        let mut batch = WriteBatch::new();
        batch
            .set_int(&section, LE_AUDIO_SINK_CONTEXT_TYPE, sink as i32)
            .set_int(&section, LE_AUDIO_SOURCE_CONTEXT_TYPE, source as i32)
            .save();
        self.post(batch);
    }

    pub fn update_leaudio_handles(&self, address: &RawAddress, handles: &[u8]) {
        self.post_blob(address, LE_AUDIO_HANDLES_BIN, handles);
    }

    pub fn update_leaudio_pacs(&self, address: &RawAddress, sink_pacs: &[u8], source_pacs: &[u8]) {
        self.post_blob(address, LE_AUDIO_SINK_PACS_BIN, sink_pacs);
        self.post_blob(address, LE_AUDIO_SOURCE_PACS_BIN, source_pacs);
    }

    pub fn update_leaudio_ases(&self, address: &RawAddress, ases: &[u8]) {
        self.post_blob(address, LE_AUDIO_ASES_BIN, ases);
    }

    /// Post a blob write and save; empty blobs are not stored
    pub(crate) fn post_blob(&self, address: &RawAddress, field: &str, blob: &[u8]) {
        if blob.is_empty() {
            return;
        }
        let mut batch = WriteBatch::new();
        batch.set_bin(&address.to_string(), field, blob).save();
        self.post(batch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bonding::classic;
    use crate::callbacks::MockProfileSink;
    use crate::property::{codec::SERVICE, uuids};
    use crate::settings::StorageSettings;
    use crate::store::MemoryConfig;
    use crate::types::LinkKey;
    use std::sync::Arc;

    fn addr() -> RawAddress {
        "c0:ff:ee:00:00:01".parse().unwrap()
    }

    fn earbud(store: &MemoryConfig) {
        classic::add_bonded_device(store, &addr(), &LinkKey([2; 16]), 8, 0, false).unwrap();
        store
            .set_str(&addr().to_string(), SERVICE, &uuids::join(&[LE_AUDIO_UUID]))
            .unwrap();
    }

    #[test]
    fn test_setters_then_load() {
        let store = Arc::new(MemoryConfig::new());
        earbud(&store);

        let expected = LeAudioRecord {
            address: addr(),
            autoconnect: true,
            sink_audio_location: 0x0000_0001,
            source_audio_location: 0x0000_0002,
            sink_supported_context_types: 0x0004,
            source_supported_context_types: 0x0002,
            handles: vec![1, 2, 3],
            sink_pacs: vec![4],
            source_pacs: Vec::new(),
            ases: vec![5, 6],
        };
        let mut sink = MockProfileSink::<LeAudioRecord>::new();
        let want = expected.clone();
        sink.expect_add_from_storage()
            .withf(move |record| *record == want)
            .times(1)
            .return_const(());
        let collaborators = Collaborators {
            le_audio: Arc::new(sink),
            ..Default::default()
        };
        let storage = BondStorage::new(store.clone(), StorageSettings::default(), collaborators);

        storage.set_leaudio_autoconnect(&addr(), true);
        storage.set_leaudio_audio_location(&addr(), 1, 2);
        storage.set_leaudio_supported_context_types(&addr(), 4, 2);
        storage.update_leaudio_handles(&addr(), &[1, 2, 3]);
        storage.update_leaudio_pacs(&addr(), &[4], &[]);
        storage.update_leaudio_ases(&addr(), &[5, 6]);

        assert!(!store.exists(&addr().to_string(), LE_AUDIO_SOURCE_PACS_BIN));
        assert_eq!(storage.load_bonded_leaudio(), 1);
    }

    #[test]
    fn test_device_without_service_is_skipped() {
        let store = Arc::new(MemoryConfig::new());
        classic::add_bonded_device(store.as_ref(), &addr(), &LinkKey([2; 16]), 8, 0, false).unwrap();
        store.set_int(&addr().to_string(), LE_AUDIO_AUTOCONNECT, 1).unwrap();

        let storage = BondStorage::new(store.clone(), StorageSettings::default(), Collaborators::default());
        assert_eq!(storage.load_bonded_leaudio(), 0);
        assert!(store.exists(&addr().to_string(), LE_AUDIO_AUTOCONNECT));
    }

    #[test]
    fn test_remove_deletes_every_field() {
        let store = Arc::new(MemoryConfig::new());
        let storage = BondStorage::new(store.clone(), StorageSettings::default(), Collaborators::default());
        let record = LeAudioRecord {
            address: addr(),
            autoconnect: true,
            handles: vec![9],
            ..Default::default()
        };
        storage.save_leaudio(&record).unwrap();
        assert_eq!(store.get_bin(&addr().to_string(), LE_AUDIO_HANDLES_BIN).unwrap(), vec![9]);

        assert!(storage.remove_leaudio(&addr()));
        assert!(store.section(&addr().to_string()).is_none());
    }
}
