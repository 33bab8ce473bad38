// Local LE root keys kept in the adapter section

use super::le_keys::Octet16;
use crate::store::{ConfigStore, ADAPTER_SECTION};
use crate::{BondStorage, Result, StorageError};
use tracing::debug;
use zeroize::Zeroizing;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LocalKeyType {
    /// Identity root
    Ir = 0x01,
    /// Identity resolving key
    Irk = 0x02,
    /// Diversifier hiding key
    Dhk = 0x04,
    /// Encryption root
    Er = 0x08,
}

impl LocalKeyType {
    pub const ALL: [LocalKeyType; 4] = [Self::Ir, Self::Irk, Self::Dhk, Self::Er];

    pub fn field(self) -> &'static str {
        match self {
            Self::Ir => "LE_LOCAL_KEY_IR",
            Self::Irk => "LE_LOCAL_KEY_IRK",
            Self::Dhk => "LE_LOCAL_KEY_DHK",
            Self::Er => "LE_LOCAL_KEY_ER",
        }
    }
}

impl TryFrom<u8> for LocalKeyType {
    type Error = StorageError;

    fn try_from(raw: u8) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|key_type| *key_type as u8 == raw)
            .ok_or(StorageError::UnknownVariant(raw))
    }
}

/// Store a local key and flush it
pub fn add_local_key(store: &dyn ConfigStore, key_type: LocalKeyType, key: &Octet16) -> Result<()> {
    let result = store.set_bin(ADAPTER_SECTION, key_type.field(), key);
    store.flush()?;
    result
}

pub fn get_local_key(store: &dyn ConfigStore, key_type: LocalKeyType) -> Result<Zeroizing<Octet16>> {
    let mut key = Zeroizing::new([0u8; 16]);
    store.get_bin_into(ADAPTER_SECTION, key_type.field(), &mut key[..])?;
    Ok(key)
}

/// Remove all four local keys; one save is issued either way
pub fn remove_local_keys(store: &dyn ConfigStore) -> bool {
    let mut ok = true;
    for key_type in LocalKeyType::ALL {
        if let Err(e) = store.remove(ADAPTER_SECTION, key_type.field()) {
            debug!("Failed to remove {}: {}", key_type.field(), e);
            ok = false;
        }
    }
    store.save();
    ok
}

impl BondStorage {
    pub fn add_local_key(&self, key_type: LocalKeyType, key: &Octet16) -> Result<()> {
        add_local_key(self.config(), key_type, key)
    }

    pub fn get_local_key(&self, key_type: LocalKeyType) -> Result<Zeroizing<Octet16>> {
        get_local_key(self.config(), key_type)
    }

    pub fn remove_local_keys(&self) -> bool {
        remove_local_keys(self.config())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryConfig;

    #[test]
    fn test_local_keys_roundtrip() {
        let store = MemoryConfig::new();
        add_local_key(&store, LocalKeyType::Irk, &[7; 16]).unwrap();
        assert_eq!(store.flush_count(), 1);
        assert_eq!(*get_local_key(&store, LocalKeyType::Irk).unwrap(), [7; 16]);
        assert_eq!(
            get_local_key(&store, LocalKeyType::Er).map(|k| *k),
            Err(StorageError::NotFound)
        );
    }

    #[test]
    fn test_remove_local_keys() {
        let store = MemoryConfig::new();
        for key_type in LocalKeyType::ALL {
            add_local_key(&store, key_type, &[1; 16]).unwrap();
        }
        store.set_str(ADAPTER_SECTION, "Name", "phone").unwrap();

        assert!(remove_local_keys(&store));
        assert_eq!(store.save_count(), 1);
        let adapter = store.section(ADAPTER_SECTION).unwrap();
        assert_eq!(adapter.len(), 1);
    }

    #[test]
    fn test_unknown_local_key_type() {
        assert_eq!(LocalKeyType::try_from(3), Err(StorageError::UnknownVariant(3)));
        assert_eq!(LocalKeyType::try_from(8).unwrap(), LocalKeyType::Er);
    }
}
