// GATT caching: supported features and the client database hash

use crate::bonding::Octet16;
use crate::store::{ConfigStore, WriteBatch};
use crate::types::RawAddress;
use crate::BondStorage;
use tracing::debug;

pub const GATT_CLIENT_SUPPORTED: &str = "GattClientSupportedFeatures";
pub const GATT_CLIENT_DB_HASH: &str = "GattClientDatabaseHash";
pub const GATT_SERVER_SUPPORTED: &str = "GattServerSupportedFeatures";

impl BondStorage {
    pub fn set_gatt_sr_supp_feat(&self, address: &RawAddress, features: u8) {
        debug!("GATT server supported features for {}: {:#04x}", address, features);
        self.post_int(address, GATT_SERVER_SUPPORTED, features as i32);
    }

    pub fn get_gatt_sr_supp_feat(&self, address: &RawAddress) -> u8 {
        self.feature_byte(address, GATT_SERVER_SUPPORTED)
    }

    pub fn set_gatt_cl_supp_feat(&self, address: &RawAddress, features: u8) {
        debug!("GATT client supported features for {}: {:#04x}", address, features);
        self.post_int(address, GATT_CLIENT_SUPPORTED, features as i32);
    }

    pub fn get_gatt_cl_supp_feat(&self, address: &RawAddress) -> u8 {
        self.feature_byte(address, GATT_CLIENT_SUPPORTED)
    }

    pub fn remove_gatt_cl_supp_feat(&self, address: &RawAddress) {
        self.post_remove_if_exists(address, GATT_CLIENT_SUPPORTED);
    }

    pub fn set_gatt_cl_db_hash(&self, address: &RawAddress, hash: &Octet16) {
        let mut batch = WriteBatch::new();
        batch
            .set_bin(&address.to_string(), GATT_CLIENT_DB_HASH, hash)
            .save();
        self.post(batch);
    }

    /// Last known server database hash, all zero when unknown
    pub fn get_gatt_cl_db_hash(&self, address: &RawAddress) -> Octet16 {
        let mut hash = [0u8; 16];
        if let Err(e) = self
            .config()
            .get_bin_into(&address.to_string(), GATT_CLIENT_DB_HASH, &mut hash)
        {
            debug!("No database hash for {}: {}", address, e);
        }
        hash
    }

    pub fn remove_gatt_cl_db_hash(&self, address: &RawAddress) {
        self.post_remove_if_exists(address, GATT_CLIENT_DB_HASH);
    }

    fn feature_byte(&self, address: &RawAddress, field: &str) -> u8 {
        let value = self.config().get_int(&address.to_string(), field).unwrap_or(0);
        debug!("{} for {}: {:#04x}", field, address, value);
        value as u8
    }

    fn post_int(&self, address: &RawAddress, field: &str, value: i32) {
        let mut batch = WriteBatch::new();
        batch.set_int(&address.to_string(), field, value).save();
        self.post(batch);
    }

    /// Nothing is posted, and no save issued, when the field is absent
    fn post_remove_if_exists(&self, address: &RawAddress, field: &str) {
        let section = address.to_string();
        if !self.config().exists(&section, field) {
            return;
        }
        let mut batch = WriteBatch::new();
        batch.remove(&section, field).save();
        self.post(batch);
    }
}
