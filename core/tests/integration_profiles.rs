mod common;

use bondstore_core::profiles::{
    CsisRecord, GroupRecord, HasRecord, HearingAidRecord, HidHostRecord, LeAudioRecord,
};
use bondstore_core::types::bt_uuid::{HEARING_AID_UUID, LE_AUDIO_UUID};
use bondstore_core::{
    BondStorage, Collaborators, ConfigStore, ConfigWriter, DeviceType, LinkKey, MemoryConfig,
    Property, StorageSettings,
};
use common::{addr, Records};
use std::sync::Arc;

#[test]
fn test_hid_reconnect_allowed_defaults_to_true() {
    let store = Arc::new(MemoryConfig::new());
    let storage = BondStorage::new(store.clone(), StorageSettings::default(), Collaborators::default());
    let keyboard = addr("00:1f:20:00:00:01");

    assert!(storage.get_hid_connection_policy(&keyboard));

    let sink = Records::<HidHostRecord>::new();
    let storage = BondStorage::new(
        store.clone(),
        StorageSettings::default(),
        Collaborators {
            hid_host: sink.clone(),
            ..Default::default()
        },
    );
    storage.add_bonded_device(&keyboard, &LinkKey([4; 16]), 4, 0).unwrap();
    storage.add_hid_device_info(&HidHostRecord::new(keyboard)).unwrap();
    storage.load_bonded_hid_info();
    assert!(sink.taken()[0].reconnect_allowed);
}

#[tokio::test]
async fn test_profiles_survive_posted_writes_and_reload() {
    let store = Arc::new(MemoryConfig::new());
    let (writer, handle) = ConfigWriter::spawn(store.clone());
    let storage = BondStorage::new(store.clone(), StorageSettings::default(), Collaborators::default())
        .with_writer(writer.clone());

    let left = addr("f0:00:00:00:00:01");
    let buds = addr("f0:00:00:00:00:02");
    for device in [left, buds] {
        storage.add_bonded_device(&device, &LinkKey([8; 16]), 8, 0).unwrap();
    }
    storage
        .set_remote_device_property(&left, &Property::Uuids(vec![HEARING_AID_UUID]))
        .unwrap();
    storage
        .set_remote_device_property(&buds, &Property::Uuids(vec![LE_AUDIO_UUID]))
        .unwrap();

    let hearing_aid = HearingAidRecord {
        address: left,
        capabilities: 1,
        hi_sync_id: 77,
        render_delay: 10,
        preparation_delay: 2,
        codecs: 2,
        ..Default::default()
    };
    storage.add_hearing_aid(&hearing_aid).unwrap();
    storage.set_leaudio_autoconnect(&buds, true);
    storage.set_leaudio_audio_location(&buds, 0x3, 0x1);
    storage.update_leaudio_ases(&buds, &[0xa5]);
    storage.set_csis_autoconnect(&buds, true);
    storage.update_csis_info(&buds, &[0x01, 0x02]);
    storage
        .add_groups(&GroupRecord {
            address: buds,
            group_info: vec![0x10],
        })
        .unwrap();
    storage
        .add_leaudio_has_device(&HasRecord {
            address: left,
            features: 0x01,
            active_preset: 1,
            presets: vec![0xee],
            is_acceptlisted: false,
        })
        .unwrap();
    writer.drained().await.unwrap();
    writer.shutdown();
    handle.await.unwrap();

    // Restart against the same store with recording sinks
    let hearing_aids = Records::<HearingAidRecord>::new();
    let le_audio = Records::<LeAudioRecord>::new();
    let csis = Records::<CsisRecord>::new();
    let groups = Records::<GroupRecord>::new();
    let has = Records::<HasRecord>::new();
    let collaborators = Collaborators {
        hearing_aid: hearing_aids.clone(),
        le_audio: le_audio.clone(),
        csis: csis.clone(),
        groups: groups.clone(),
        has: has.clone(),
        ..Default::default()
    };
    let storage = BondStorage::new(store.clone(), StorageSettings::default(), collaborators);

    assert_eq!(storage.load_bonded_hearing_aids(), 1);
    assert_eq!(storage.load_bonded_leaudio(), 1);
    assert_eq!(storage.load_bonded_csis_devices(), 1);
    assert_eq!(storage.load_bonded_groups(), 1);
    assert_eq!(storage.load_bonded_leaudio_has_devices(), 1);

    assert_eq!(
        hearing_aids.taken(),
        vec![HearingAidRecord {
            is_acceptlisted: true,
            ..hearing_aid
        }]
    );
    let audio_records = le_audio.taken();
    let buds_audio = &audio_records[0];
    assert!(buds_audio.autoconnect);
    assert_eq!(buds_audio.sink_audio_location, 0x3);
    assert_eq!(buds_audio.source_audio_location, 0x1);
    assert_eq!(buds_audio.ases, vec![0xa5]);
    assert!(buds_audio.handles.is_empty());
    assert_eq!(
        csis.taken(),
        vec![CsisRecord {
            address: buds,
            autoconnect: true,
            set_info: vec![0x01, 0x02],
        }]
    );
    assert_eq!(groups.taken()[0].group_info, vec![0x10]);
    assert!(has.taken()[0].is_acceptlisted);
}

#[test]
fn test_removing_bond_then_loading_cleans_profile_data() {
    let store = Arc::new(MemoryConfig::new());
    let hid = Records::<HidHostRecord>::new();
    let storage = BondStorage::new(
        store.clone(),
        StorageSettings::default(),
        Collaborators {
            hid_host: hid.clone(),
            ..Default::default()
        },
    );
    let mouse = addr("00:1f:20:00:00:02");
    storage.add_bonded_device(&mouse, &LinkKey([5; 16]), 4, 0).unwrap();
    storage.set_remote_device_type(&mouse, DeviceType::Bredr).unwrap();
    let mut record = HidHostRecord::new(mouse);
    record.attr_mask = 0x8000;
    storage.add_hid_device_info(&record).unwrap();

    // DevType survives bond removal, so the section is still enumerated
    storage.remove_bonded_device(&mouse).unwrap();

    assert_eq!(storage.load_bonded_hid_info(), 0);
    assert!(hid.taken().is_empty());
    assert!(!store.exists(&mouse.to_string(), "HidAttrMask"));
}
