//! Storage settings
//!
//! Knobs that change how bonds are recorded and replayed:
//! - Capacity of the bonded device table
//! - Restricted-mode pairing marker
//! - Identity key reset when the last bond goes away
//! - Whether profile writes are posted to the writer task

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Security record table size of the controller stack
pub const DEFAULT_MAX_BONDED_DEVICES: usize = 100;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Errors that can occur during settings validation
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingsError {
    #[error("Invalid bonded device capacity: must be 1-255, got {0}")]
    InvalidCapacity(usize),
}

// ============================================================================
// STORAGE SETTINGS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Maximum number of addresses returned by one enumeration
    pub max_bonded_devices: usize,

    /// New bonds are tagged `Restricted` so they can be dropped later
    pub restricted_mode: bool,

    /// Ask the security manager for a fresh identity when the last bond
    /// is removed
    pub irk_rotation: bool,

    /// Post profile writes to the writer task instead of applying them inline
    pub post_writes: bool,
}

impl StorageSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.max_bonded_devices == 0 || self.max_bonded_devices > 255 {
            return Err(SettingsError::InvalidCapacity(self.max_bonded_devices));
        }
        Ok(())
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            max_bonded_devices: DEFAULT_MAX_BONDED_DEVICES,
            restricted_mode: false,
            irk_rotation: false,
            post_writes: true,
        }
    }
}
