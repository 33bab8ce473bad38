//! LE bonding keys
//!
//! Six independent key records may exist per device. Each is stored as a hex
//! blob in the controller's native struct layout, so the sizes below are part
//! of the on-disk format.

use crate::store::ConfigStore;
use crate::types::{AddressType, RawAddress};
use crate::{BondStorage, Result, StorageError};
use std::fmt;
use tracing::{debug, info};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// 128-bit key material
pub type Octet16 = [u8; 16];

// ============================================================================
// KEY TYPES
// ============================================================================

/// LE key variant, tagged as in the security manager's key distribution mask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LeKeyType {
    /// Peer encryption key (LTK, EDIV, Rand)
    Penc = 0x01,
    /// Peer identity key and identity address
    Pid = 0x02,
    /// Peer signing key
    Pcsrk = 0x04,
    /// Local encryption key
    Lenc = 0x08,
    /// Local identity
    Lid = 0x10,
    /// Local signing key
    Lcsrk = 0x20,
}

impl LeKeyType {
    /// Order in which stored keys are replayed into the security manager
    pub const LOAD_ORDER: [LeKeyType; 6] = [
        Self::Penc,
        Self::Pid,
        Self::Lid,
        Self::Pcsrk,
        Self::Lenc,
        Self::Lcsrk,
    ];

    pub fn field(self) -> &'static str {
        match self {
            Self::Penc => "LE_KEY_PENC",
            Self::Pid => "LE_KEY_PID",
            Self::Pcsrk => "LE_KEY_PCSRK",
            Self::Lenc => "LE_KEY_LENC",
            Self::Lid => "LE_KEY_LID",
            Self::Lcsrk => "LE_KEY_LCSRK",
        }
    }

    /// Size of the native record
    pub fn size(self) -> usize {
        match self {
            Self::Penc => PencKey::SIZE,
            Self::Pid | Self::Lid => PidKey::SIZE,
            Self::Pcsrk => PcsrkKey::SIZE,
            Self::Lenc => LencKey::SIZE,
            Self::Lcsrk => LcsrkKey::SIZE,
        }
    }
}

impl TryFrom<u8> for LeKeyType {
    type Error = StorageError;

    fn try_from(raw: u8) -> Result<Self> {
        Self::LOAD_ORDER
            .iter()
            .copied()
            .find(|key_type| *key_type as u8 == raw)
            .ok_or(StorageError::UnknownVariant(raw))
    }
}

/// Peer long term key
#[derive(Clone, PartialEq, Eq, Default, Zeroize, ZeroizeOnDrop)]
pub struct PencKey {
    pub ltk: Octet16,
    pub rand: [u8; 8],
    pub ediv: u16,
    pub sec_level: u8,
    pub key_size: u8,
}

impl PencKey {
    pub const SIZE: usize = 28;

    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::SIZE);
        bytes.extend_from_slice(&self.ltk);
        bytes.extend_from_slice(&self.rand);
        bytes.extend_from_slice(&self.ediv.to_le_bytes());
        bytes.push(self.sec_level);
        bytes.push(self.key_size);
        bytes
    }

    fn from_native(b: &[u8; Self::SIZE]) -> Self {
        let mut key = Self::default();
        key.ltk.copy_from_slice(&b[0..16]);
        key.rand.copy_from_slice(&b[16..24]);
        key.ediv = u16::from_le_bytes([b[24], b[25]]);
        key.sec_level = b[26];
        key.key_size = b[27];
        key
    }
}

/// Identity resolving key plus the identity address it resolves to.
/// Used for both the peer identity and the local identity records.
#[derive(Clone, PartialEq, Eq, Default, Zeroize, ZeroizeOnDrop)]
pub struct PidKey {
    pub irk: Octet16,
    #[zeroize(skip)]
    pub identity_addr_type: AddressType,
    #[zeroize(skip)]
    pub identity_addr: RawAddress,
}

impl PidKey {
    pub const SIZE: usize = 23;

    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::SIZE);
        bytes.extend_from_slice(&self.irk);
        bytes.push(self.identity_addr_type as u8);
        bytes.extend_from_slice(self.identity_addr.as_bytes());
        bytes
    }

    fn from_native(b: &[u8; Self::SIZE]) -> Self {
        let mut key = Self::default();
        key.irk.copy_from_slice(&b[0..16]);
        key.identity_addr_type = AddressType::from_raw(b[16]).unwrap_or_default();
        key.identity_addr.0.copy_from_slice(&b[17..23]);
        key
    }
}

/// Peer signing key
#[derive(Clone, PartialEq, Eq, Default, Zeroize, ZeroizeOnDrop)]
pub struct PcsrkKey {
    pub counter: u32,
    pub csrk: Octet16,
    pub sec_level: u8,
}

impl PcsrkKey {
    pub const SIZE: usize = 24;

    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::SIZE);
        bytes.extend_from_slice(&self.counter.to_le_bytes());
        bytes.extend_from_slice(&self.csrk);
        bytes.push(self.sec_level);
        bytes.resize(Self::SIZE, 0);
        bytes
    }

    fn from_native(b: &[u8; Self::SIZE]) -> Self {
        let mut key = Self::default();
        key.counter = u32::from_le_bytes([b[0], b[1], b[2], b[3]]);
        key.csrk.copy_from_slice(&b[4..20]);
        key.sec_level = b[20];
        key
    }
}

/// Local long term key
#[derive(Clone, PartialEq, Eq, Default, Zeroize, ZeroizeOnDrop)]
pub struct LencKey {
    pub ltk: Octet16,
    pub div: u16,
    pub key_size: u8,
    pub sec_level: u8,
}

impl LencKey {
    pub const SIZE: usize = 20;

    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::SIZE);
        bytes.extend_from_slice(&self.ltk);
        bytes.extend_from_slice(&self.div.to_le_bytes());
        bytes.push(self.key_size);
        bytes.push(self.sec_level);
        bytes
    }

    fn from_native(b: &[u8; Self::SIZE]) -> Self {
        let mut key = Self::default();
        key.ltk.copy_from_slice(&b[0..16]);
        key.div = u16::from_le_bytes([b[16], b[17]]);
        key.key_size = b[18];
        key.sec_level = b[19];
        key
    }
}

/// Local signing key
#[derive(Clone, PartialEq, Eq, Default, Zeroize, ZeroizeOnDrop)]
pub struct LcsrkKey {
    pub counter: u32,
    pub div: u16,
    pub sec_level: u8,
    pub csrk: Octet16,
}

impl LcsrkKey {
    pub const SIZE: usize = 24;

    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::SIZE);
        bytes.extend_from_slice(&self.counter.to_le_bytes());
        bytes.extend_from_slice(&self.div.to_le_bytes());
        bytes.push(self.sec_level);
        bytes.extend_from_slice(&self.csrk);
        bytes.resize(Self::SIZE, 0);
        bytes
    }

    fn from_native(b: &[u8; Self::SIZE]) -> Self {
        let mut key = Self::default();
        key.counter = u32::from_le_bytes([b[0], b[1], b[2], b[3]]);
        key.div = u16::from_le_bytes([b[4], b[5]]);
        key.sec_level = b[6];
        key.csrk.copy_from_slice(&b[7..23]);
        key
    }
}

macro_rules! redacted_debug {
    ($ty:ident, $($field:ident),*) => {
        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($ty))
                    $(.field(stringify!($field), &self.$field))*
                    .finish_non_exhaustive()
            }
        }
    };
}

redacted_debug!(PencKey, ediv, sec_level, key_size);
redacted_debug!(PidKey, identity_addr_type, identity_addr);
redacted_debug!(PcsrkKey, counter, sec_level);
redacted_debug!(LencKey, div, key_size, sec_level);
redacted_debug!(LcsrkKey, counter, div, sec_level);

/// One stored LE key record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeKey {
    Penc(PencKey),
    Pid(PidKey),
    Pcsrk(PcsrkKey),
    Lenc(LencKey),
    Lid(PidKey),
    Lcsrk(LcsrkKey),
}

impl LeKey {
    pub fn key_type(&self) -> LeKeyType {
        match self {
            Self::Penc(_) => LeKeyType::Penc,
            Self::Pid(_) => LeKeyType::Pid,
            Self::Pcsrk(_) => LeKeyType::Pcsrk,
            Self::Lenc(_) => LeKeyType::Lenc,
            Self::Lid(_) => LeKeyType::Lid,
            Self::Lcsrk(_) => LeKeyType::Lcsrk,
        }
    }

    /// Native record bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Penc(key) => key.to_bytes(),
            Self::Pid(key) | Self::Lid(key) => key.to_bytes(),
            Self::Pcsrk(key) => key.to_bytes(),
            Self::Lenc(key) => key.to_bytes(),
            Self::Lcsrk(key) => key.to_bytes(),
        }
    }

    /// Parse a native record. Short records are zero-extended; records longer
    /// than the native size are rejected.
    pub fn from_bytes(key_type: LeKeyType, bytes: &[u8]) -> Result<Self> {
        if bytes.len() > key_type.size() {
            return Err(StorageError::Malformed(format!(
                "{} is {} bytes, record holds {}",
                key_type.field(),
                bytes.len(),
                key_type.size()
            )));
        }

        macro_rules! native {
            ($ty:ident) => {{
                let mut buf = [0u8; $ty::SIZE];
                buf[..bytes.len()].copy_from_slice(bytes);
                let key = $ty::from_native(&buf);
                buf.zeroize();
                key
            }};
        }

        Ok(match key_type {
            LeKeyType::Penc => Self::Penc(native!(PencKey)),
            LeKeyType::Pid => Self::Pid(native!(PidKey)),
            LeKeyType::Pcsrk => Self::Pcsrk(native!(PcsrkKey)),
            LeKeyType::Lenc => Self::Lenc(native!(LencKey)),
            LeKeyType::Lid => Self::Lid(native!(PidKey)),
            LeKeyType::Lcsrk => Self::Lcsrk(native!(LcsrkKey)),
        })
    }
}

// ============================================================================
// STORE OPERATIONS
// ============================================================================

/// Store one key record and request a save
pub fn add_le_key(store: &dyn ConfigStore, address: &RawAddress, key: &LeKey) -> Result<()> {
    let field = key.key_type().field();
    let mut bytes = key.to_bytes();
    let result = store.set_bin(&address.to_string(), field, &bytes);
    bytes.zeroize();
    store.save();
    result?;
    debug!("Stored {} for {}", field, address);
    Ok(())
}

pub fn get_le_key(store: &dyn ConfigStore, address: &RawAddress, key_type: LeKeyType) -> Result<LeKey> {
    let mut buf = vec![0u8; key_type.size()];
    let result = get_le_key_bytes(store, address, key_type, &mut buf)
        .and_then(|len| LeKey::from_bytes(key_type, &buf[..len]));
    buf.zeroize();
    result
}

/// Copy a key record into `out` without ever writing past it
pub fn get_le_key_bytes(
    store: &dyn ConfigStore,
    address: &RawAddress,
    key_type: LeKeyType,
    out: &mut [u8],
) -> Result<usize> {
    store.get_bin_into(&address.to_string(), key_type.field(), out)
}

/// Whether any of the six key records is stored
pub fn has_le_keys(store: &dyn ConfigStore, address: &RawAddress) -> bool {
    let section = address.to_string();
    LeKeyType::LOAD_ORDER
        .iter()
        .any(|key_type| store.exists(&section, key_type.field()))
}

/// Remove every key record. All six removals are attempted and one save is
/// issued whatever the outcome; returns whether every removal succeeded.
pub fn remove_le_keys(store: &dyn ConfigStore, address: &RawAddress) -> bool {
    let section = address.to_string();
    info!("Removing LE bonding keys for {}", address);
    let mut ok = true;
    for key_type in LeKeyType::LOAD_ORDER {
        if let Err(e) = store.remove(&section, key_type.field()) {
            debug!("Failed to remove {} for {}: {}", key_type.field(), address, e);
            ok = false;
        }
    }
    store.save();
    ok
}

impl BondStorage {
    pub fn add_le_key(&self, address: &RawAddress, key: &LeKey) -> Result<()> {
        add_le_key(self.config(), address, key)
    }

    pub fn get_le_key(&self, address: &RawAddress, key_type: LeKeyType) -> Result<LeKey> {
        get_le_key(self.config(), address, key_type)
    }

    pub fn get_le_key_bytes(
        &self,
        address: &RawAddress,
        key_type: LeKeyType,
        out: &mut [u8],
    ) -> Result<usize> {
        get_le_key_bytes(self.config(), address, key_type, out)
    }

    pub fn remove_le_keys(&self, address: &RawAddress) -> bool {
        remove_le_keys(self.config(), address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::backend::test_support::FailingConfig;
    use crate::store::MemoryConfig;

    fn addr() -> RawAddress {
        "11:22:33:44:55:66".parse().unwrap()
    }

    fn pid(identity: &str) -> LeKey {
        LeKey::Pid(PidKey {
            irk: [0x42; 16],
            identity_addr_type: AddressType::PublicId,
            identity_addr: identity.parse().unwrap(),
        })
    }

    #[test]
    fn test_native_sizes() {
        let sizes: Vec<usize> = LeKeyType::LOAD_ORDER.iter().map(|t| t.size()).collect();
        assert_eq!(sizes, vec![28, 23, 23, 24, 20, 24]);

        let keys = [
            LeKey::Penc(PencKey::default()),
            LeKey::Pid(PidKey::default()),
            LeKey::Lid(PidKey::default()),
            LeKey::Pcsrk(PcsrkKey::default()),
            LeKey::Lenc(LencKey::default()),
            LeKey::Lcsrk(LcsrkKey::default()),
        ];
        for key in keys {
            assert_eq!(key.to_bytes().len(), key.key_type().size());
        }
    }

    #[test]
    fn test_unknown_variant() {
        assert_eq!(LeKeyType::try_from(0x40), Err(StorageError::UnknownVariant(0x40)));
        assert_eq!(LeKeyType::try_from(0x00), Err(StorageError::UnknownVariant(0)));
        assert_eq!(LeKeyType::try_from(0x10).unwrap(), LeKeyType::Lid);
        assert_eq!(LeKeyType::try_from(0x20).unwrap(), LeKeyType::Lcsrk);
    }

    #[test]
    fn test_add_and_get_key() {
        let store = MemoryConfig::new();
        let key = pid("c0:ff:ee:00:00:01");
        add_le_key(&store, &addr(), &key).unwrap();

        assert_eq!(store.save_count(), 1);
        assert_eq!(store.flush_count(), 0);
        assert_eq!(get_le_key(&store, &addr(), LeKeyType::Pid).unwrap(), key);
        assert_eq!(
            get_le_key(&store, &addr(), LeKeyType::Penc),
            Err(StorageError::NotFound)
        );
    }

    #[test]
    fn test_penc_layout() {
        let key = PencKey {
            ltk: [1; 16],
            rand: [2; 8],
            ediv: 0x0302,
            sec_level: 4,
            key_size: 16,
        };
        let bytes = LeKey::Penc(key.clone()).to_bytes();
        assert_eq!(&bytes[24..], &[0x02, 0x03, 4, 16]);
        assert_eq!(
            LeKey::from_bytes(LeKeyType::Penc, &bytes).unwrap(),
            LeKey::Penc(key)
        );
    }

    #[test]
    fn test_short_buffer_rejected() {
        let store = MemoryConfig::new();
        add_le_key(&store, &addr(), &LeKey::Penc(PencKey::default())).unwrap();

        let mut out = [0xEEu8; 20];
        assert!(matches!(
            get_le_key_bytes(&store, &addr(), LeKeyType::Penc, &mut out),
            Err(StorageError::Malformed(_))
        ));
        assert_eq!(out, [0xEE; 20]);
    }

    #[test]
    fn test_oversized_record_rejected() {
        assert!(matches!(
            LeKey::from_bytes(LeKeyType::Lenc, &[0; 21]),
            Err(StorageError::Malformed(_))
        ));
    }

    #[test]
    fn test_remove_all_keys_single_save() {
        let store = MemoryConfig::new();
        add_le_key(&store, &addr(), &LeKey::Penc(PencKey::default())).unwrap();
        add_le_key(&store, &addr(), &LeKey::Lid(PidKey::default())).unwrap();
        add_le_key(&store, &addr(), &LeKey::Lcsrk(LcsrkKey::default())).unwrap();
        let saves = store.save_count();

        assert!(remove_le_keys(&store, &addr()));
        assert_eq!(store.save_count(), saves + 1);
        assert!(!has_le_keys(&store, &addr()));
        assert!(store.sections().unwrap().is_empty());

        // Nothing to remove still saves once
        assert!(remove_le_keys(&store, &addr()));
        assert_eq!(store.save_count(), saves + 2);
    }

    #[test]
    fn test_remove_keeps_going_after_a_failure() {
        let store = FailingConfig::failing(&["LE_KEY_PID"]);
        add_le_key(&store.inner, &addr(), &LeKey::Penc(PencKey::default())).unwrap();
        add_le_key(&store.inner, &addr(), &pid("c0:ff:ee:00:00:01")).unwrap();
        add_le_key(&store.inner, &addr(), &LeKey::Lcsrk(LcsrkKey::default())).unwrap();
        let saves = store.inner.save_count();

        assert!(!remove_le_keys(&store, &addr()));

        let attempted: Vec<String> = LeKeyType::LOAD_ORDER
            .iter()
            .map(|t| t.field().to_string())
            .collect();
        assert_eq!(*store.removes.lock(), attempted);
        assert_eq!(store.inner.save_count(), saves + 1);
        assert!(store.exists("11:22:33:44:55:66", "LE_KEY_PID"));
        assert!(!store.exists("11:22:33:44:55:66", "LE_KEY_PENC"));
        assert!(!store.exists("11:22:33:44:55:66", "LE_KEY_LCSRK"));
    }

    #[test]
    fn test_debug_hides_key_material() {
        let text = format!("{:?}", pid("c0:ff:ee:00:00:01"));
        assert!(!text.contains("66"));
        assert!(text.contains("identity_addr"));
    }
}
