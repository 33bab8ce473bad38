// Bondstore: persistent Bluetooth adapter and bond state
//
// Adapter properties, remote device properties, pairing keys and profile
// metadata live as fields in a sectioned key-value store. This crate owns the
// field naming and encoding, and replays the stored bonds into the security
// and profile layers at startup.

pub mod bonding;
pub mod callbacks;
pub mod consolidate;
pub mod dump;
pub mod enumerate;
pub mod loader;
pub mod profiles;
pub mod property;
pub mod settings;
pub mod store;
pub mod types;

use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

pub use bonding::{LeKey, LeKeyType};
pub use callbacks::Collaborators;
pub use consolidate::{Consolidation, ConsolidationPair};
pub use enumerate::BondedDeviceSet;
pub use profiles::ProfileRecord;
pub use property::{Property, PropertyKind, PropertyTarget};
pub use settings::StorageSettings;
pub use store::{ConfigStore, ConfigWriter, MemoryConfig, SledConfig, WriteBatch};
pub use types::{AddressType, DeviceType, LinkKey, RawAddress};

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Failure taxonomy shared by every storage operation.
///
/// `NotFound` is the expected outcome for absent fields and callers usually
/// fall back to a default. `UnknownKind` and `UnknownVariant` indicate a
/// caller bug and never touch the store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Field not found")]
    NotFound,
    #[error("Malformed value: {0}")]
    Malformed(String),
    #[error("Bonded device set full ({0} entries)")]
    CapacityExceeded(usize),
    #[error("Unknown property kind {0:#04x}")]
    UnknownKind(u8),
    #[error("Unknown LE key variant {0:#04x}")]
    UnknownVariant(u8),
    #[error("Storage backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

// ============================================================================
// STORAGE FACADE
// ============================================================================

/// Entry point tying a config store to its writer, settings and collaborators.
///
/// Synchronous reads go straight to `config`. Writes that must not block the
/// caller are turned into a [`WriteBatch`] and posted to the writer task when
/// one is attached, or applied inline otherwise.
#[derive(Clone)]
pub struct BondStorage {
    config: Arc<dyn ConfigStore>,
    writer: Option<ConfigWriter>,
    settings: StorageSettings,
    collaborators: Collaborators,
}

impl BondStorage {
    /// Create a storage facade that applies every write inline.
    ///
    /// Settings that fail [`StorageSettings::validate`] get the default
    /// bonded device capacity.
    pub fn new(
        config: Arc<dyn ConfigStore>,
        mut settings: StorageSettings,
        collaborators: Collaborators,
    ) -> Self {
        if let Err(e) = settings.validate() {
            warn!("{}, using {}", e, crate::settings::DEFAULT_MAX_BONDED_DEVICES);
            settings.max_bonded_devices = crate::settings::DEFAULT_MAX_BONDED_DEVICES;
        }
        Self {
            config,
            writer: None,
            settings,
            collaborators,
        }
    }

    /// Route posted writes through `writer` instead of applying them inline
    pub fn with_writer(mut self, writer: ConfigWriter) -> Self {
        if self.settings.post_writes {
            self.writer = Some(writer);
        }
        self
    }

    pub fn config(&self) -> &dyn ConfigStore {
        self.config.as_ref()
    }

    pub fn settings(&self) -> &StorageSettings {
        &self.settings
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Hand a batch to the writer task, or apply it now if there is none.
    /// Returns immediately in the posted case with no completion signal.
    pub(crate) fn post(&self, batch: WriteBatch) {
        match &self.writer {
            Some(writer) => writer.post(batch),
            None => {
                batch.apply(self.config.as_ref());
            }
        }
    }
}
