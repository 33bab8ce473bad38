// Hearing aid (ASHA) records

use super::{has_service, int_or, ProfileRecord};
use crate::callbacks::{Collaborators, ProfileSink};
use crate::store::{ConfigStore, WriteBatch};
use crate::types::bt_uuid::HEARING_AID_UUID;
use crate::types::RawAddress;
use crate::{BondStorage, Result};

pub const HEARING_AID_READ_PSM_HANDLE: &str = "HearingAidReadPsmHandle";
pub const HEARING_AID_CAPABILITIES: &str = "HearingAidCapabilities";
pub const HEARING_AID_CODECS: &str = "HearingAidCodecs";
pub const HEARING_AID_AUDIO_CONTROL_POINT: &str = "HearingAidAudioControlPoint";
pub const HEARING_AID_VOLUME_HANDLE: &str = "HearingAidVolumeHandle";
pub const HEARING_AID_AUDIO_STATUS_HANDLE: &str = "HearingAidAudioStatusHandle";
pub const HEARING_AID_AUDIO_STATUS_CCC_HANDLE: &str = "HearingAidAudioStatusCccHandle";
pub const HEARING_AID_SERVICE_CHANGED_CCC_HANDLE: &str = "HearingAidServiceChangedCccHandle";
pub const HEARING_AID_SYNC_ID: &str = "HearingAidSyncId";
pub const HEARING_AID_RENDER_DELAY: &str = "HearingAidRenderDelay";
pub const HEARING_AID_PREPARATION_DELAY: &str = "HearingAidPreparationDelay";
pub const HEARING_AID_IS_ACCEPTLISTED: &str = "HearingAidIsAcceptlisted";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HearingAidRecord {
    pub address: RawAddress,
    pub capabilities: u8,
    pub codecs: u16,
    pub audio_control_point_handle: u16,
    pub audio_status_handle: u16,
    pub audio_status_ccc_handle: u16,
    pub service_changed_ccc_handle: u16,
    pub volume_handle: u16,
    pub read_psm_handle: u16,
    pub hi_sync_id: u64,
    pub render_delay: u16,
    pub preparation_delay: u16,
    pub is_acceptlisted: bool,
}

/// Stream parameters needed before the first connection completes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HearingAidProperties {
    pub capabilities: u8,
    pub hi_sync_id: u64,
    pub render_delay: u16,
    pub preparation_delay: u16,
    pub codecs: u16,
}

impl ProfileRecord for HearingAidRecord {
    const PROFILE: &'static str = "hearing aid";
    const FIELDS: &'static [&'static str] = &[
        HEARING_AID_READ_PSM_HANDLE,
        HEARING_AID_CAPABILITIES,
        HEARING_AID_CODECS,
        HEARING_AID_AUDIO_CONTROL_POINT,
        HEARING_AID_VOLUME_HANDLE,
        HEARING_AID_AUDIO_STATUS_HANDLE,
        HEARING_AID_AUDIO_STATUS_CCC_HANDLE,
        HEARING_AID_SERVICE_CHANGED_CCC_HANDLE,
        HEARING_AID_SYNC_ID,
        HEARING_AID_RENDER_DELAY,
        HEARING_AID_PREPARATION_DELAY,
        HEARING_AID_IS_ACCEPTLISTED,
    ];
    const CLEAN_UNBONDED: bool = true;
    const POSTED: bool = true;

    fn address(&self) -> RawAddress {
        self.address
    }

    fn is_present(store: &dyn ConfigStore, address: &RawAddress) -> bool {
        has_service(store, address, HEARING_AID_UUID)
    }

    fn read(store: &dyn ConfigStore, address: RawAddress) -> Self {
        let section = address.to_string();
        let int = |field: &str| int_or(store, &section, field, 0);

        Self {
            address,
            capabilities: int(HEARING_AID_CAPABILITIES) as u8,
            codecs: int(HEARING_AID_CODECS) as u16,
            audio_control_point_handle: int(HEARING_AID_AUDIO_CONTROL_POINT) as u16,
            audio_status_handle: int(HEARING_AID_AUDIO_STATUS_HANDLE) as u16,
            audio_status_ccc_handle: int(HEARING_AID_AUDIO_STATUS_CCC_HANDLE) as u16,
            service_changed_ccc_handle: int(HEARING_AID_SERVICE_CHANGED_CCC_HANDLE) as u16,
            volume_handle: int(HEARING_AID_VOLUME_HANDLE) as u16,
            read_psm_handle: int(HEARING_AID_READ_PSM_HANDLE) as u16,
            hi_sync_id: store.get_uint64(&section, HEARING_AID_SYNC_ID).unwrap_or(0),
            render_delay: int(HEARING_AID_RENDER_DELAY) as u16,
            preparation_delay: int(HEARING_AID_PREPARATION_DELAY) as u16,
            is_acceptlisted: int(HEARING_AID_IS_ACCEPTLISTED) != 0,
        }
    }

    /// Saving a device always puts it on the acceptlist
    fn write(&self, section: &str, batch: &mut WriteBatch) {
        batch
            .set_int(section, HEARING_AID_SERVICE_CHANGED_CCC_HANDLE, self.service_changed_ccc_handle as i32)
            .set_int(section, HEARING_AID_READ_PSM_HANDLE, self.read_psm_handle as i32)
            .set_int(section, HEARING_AID_CAPABILITIES, self.capabilities as i32)
            .set_int(section, HEARING_AID_CODECS, self.codecs as i32)
            .set_int(section, HEARING_AID_AUDIO_CONTROL_POINT, self.audio_control_point_handle as i32)
            .set_int(section, HEARING_AID_VOLUME_HANDLE, self.volume_handle as i32)
            .set_int(section, HEARING_AID_AUDIO_STATUS_HANDLE, self.audio_status_handle as i32)
            .set_int(section, HEARING_AID_AUDIO_STATUS_CCC_HANDLE, self.audio_status_ccc_handle as i32)
            .set_uint64(section, HEARING_AID_SYNC_ID, self.hi_sync_id)
            .set_int(section, HEARING_AID_RENDER_DELAY, self.render_delay as i32)
            .set_int(section, HEARING_AID_PREPARATION_DELAY, self.preparation_delay as i32)
            .set_int(section, HEARING_AID_IS_ACCEPTLISTED, 1);
    }

    fn sink(collaborators: &Collaborators) -> &dyn ProfileSink<Self> {
        collaborators.hearing_aid.as_ref()
    }
}

impl BondStorage {
    pub fn add_hearing_aid(&self, record: &HearingAidRecord) -> Result<()> {
        self.save_profile(record)
    }

    pub fn load_bonded_hearing_aids(&self) -> usize {
        self.load_profile::<HearingAidRecord>()
    }

    pub fn remove_hearing_aid(&self, address: &RawAddress) -> bool {
        self.remove_profile::<HearingAidRecord>(address)
    }

    pub fn set_hearing_aid_acceptlist(&self, address: &RawAddress, add_to_acceptlist: bool) -> Result<()> {
        let store = self.config();
        store.set_int(
            &address.to_string(),
            HEARING_AID_IS_ACCEPTLISTED,
            add_to_acceptlist as i32,
        )?;
        store.save();
        Ok(())
    }

    /// Stored stream parameters, or `None` unless all five are present
    pub fn get_hearing_aid_prop(&self, address: &RawAddress) -> Option<HearingAidProperties> {
        let store = self.config();
        let section = address.to_string();
        Some(HearingAidProperties {
            capabilities: store.get_int(&section, HEARING_AID_CAPABILITIES).ok()? as u8,
            codecs: store.get_int(&section, HEARING_AID_CODECS).ok()? as u16,
            render_delay: store.get_int(&section, HEARING_AID_RENDER_DELAY).ok()? as u16,
            preparation_delay: store.get_int(&section, HEARING_AID_PREPARATION_DELAY).ok()? as u16,
            hi_sync_id: store.get_uint64(&section, HEARING_AID_SYNC_ID).ok()?,
        })
    }
}
