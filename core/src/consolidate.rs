// Identity consolidation
//
// A bonded LE device may be stored under a private address while its peer
// identity key names a different, stable identity address. Each such pair is
// reported once: as a dual-mode consolidation when the identity address is
// bonded in its own right, or as an RPA association otherwise.

use crate::bonding::{self, LeKey, LeKeyType};
use crate::property::Property;
use crate::types::RawAddress;
use crate::{BondStorage, StorageError};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// A held address and the identity address it resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConsolidationPair {
    pub held: RawAddress,
    pub identity: RawAddress,
}

/// How a pair was reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Consolidation {
    /// Identity is bonded too: both addresses are one dual-mode device
    DualMode(ConsolidationPair),
    /// LE-only device known by its private address
    Associated(ConsolidationPair),
}

impl BondStorage {
    /// Load LE devices and report identity pairs to the adapter callbacks.
    /// Returns the pairs in the order they were reported.
    pub fn load_le_devices(&self) -> Vec<Consolidation> {
        let bonded = self.fetch_bonded_devices(true);
        let store = self.config();

        let mut pairs = Vec::new();
        for held in &bonded {
            let identity = match bonding::get_le_key(store, held, LeKeyType::Pid) {
                Ok(LeKey::Pid(pid)) => pid.identity_addr,
                Ok(_) => continue,
                Err(StorageError::NotFound) => continue,
                Err(e) => {
                    warn!("Unreadable identity key for {}: {}", held, e);
                    continue;
                }
            };
            if identity == *held {
                continue;
            }
            info!("Found device {} with known identity address {}", held, identity);
            if held.is_empty() || identity.is_empty() {
                warn!("Address is empty, skipping");
                continue;
            }
            pairs.push(ConsolidationPair {
                held: *held,
                identity,
            });
        }

        let callbacks = &self.collaborators().adapter;
        callbacks.adapter_properties(vec![Property::AdapterBondedDevices(
            pairs.iter().map(|pair| pair.held).collect(),
        )]);

        pairs
            .into_iter()
            .map(|pair| {
                if bonded.contains(&pair.identity) {
                    callbacks.address_consolidate(pair.held, pair.identity);
                    Consolidation::DualMode(pair)
                } else {
                    callbacks.le_address_associate(pair.held, pair.identity);
                    Consolidation::Associated(pair)
                }
            })
            .collect()
    }
}
