// Diagnostic dump of stored key types

use crate::bonding::{classic::LINK_KEY_TYPE, LeKeyType};
use crate::store::ConfigStore;
use crate::types::LinkKeyType;
use std::io::{self, Write};

/// Display order of LE key variants in the dump
const DUMP_ORDER: [(LeKeyType, &str); 6] = [
    (LeKeyType::Penc, "PENC"),
    (LeKeyType::Pid, "PID"),
    (LeKeyType::Pcsrk, "PCSRK"),
    (LeKeyType::Lenc, "LENC"),
    (LeKeyType::Lcsrk, "LCSRK"),
    (LeKeyType::Lid, "LID"),
];

/// Write, per paired device, its classic link key type and the LE key
/// variants it holds
pub fn dump_link_key_types(store: &dyn ConfigStore, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "Link Key Types:")?;
    for address in store.paired_devices() {
        let section = address.to_string();
        writeln!(out, "  {}", section)?;

        write!(out, "    BR: ")?;
        if let Ok(key_type) = store.get_int(&section, LINK_KEY_TYPE) {
            write!(out, "{}", LinkKeyType::text(key_type))?;
        }
        writeln!(out)?;

        write!(out, "    LE:")?;
        for (key_type, label) in DUMP_ORDER {
            if store.exists(&section, key_type.field()) {
                write!(out, " {}", label)?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bonding::{classic, le_keys, LeKey, PidKey};
    use crate::store::MemoryConfig;
    use crate::types::{LinkKey, RawAddress};

    #[test]
    fn test_dump_lists_key_types() {
        let store = MemoryConfig::new();
        let classic_addr: RawAddress = "aa:bb:cc:dd:ee:ff".parse().unwrap();
        let le_addr: RawAddress = "11:22:33:44:55:66".parse().unwrap();
        classic::add_bonded_device(&store, &classic_addr, &LinkKey([0xAA; 16]), 4, 0, false).unwrap();
        le_keys::add_le_key(&store, &le_addr, &LeKey::Pid(PidKey::default())).unwrap();
        le_keys::add_le_key(&store, &le_addr, &LeKey::Lid(PidKey::default())).unwrap();

        let mut out = Vec::new();
        dump_link_key_types(&store, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(
            text,
            "Link Key Types:\n\
             \x20 aa:bb:cc:dd:ee:ff\n\
             \x20   BR: UNAUTH_COMB\n\
             \x20   LE:\n\
             \x20 11:22:33:44:55:66\n\
             \x20   BR: \n\
             \x20   LE: PID LID\n"
        );
    }

    #[test]
    fn test_unknown_link_key_type() {
        let store = MemoryConfig::new();
        store.set_int("aa:bb:cc:dd:ee:ff", "DevType", 1).unwrap();
        store.set_int("aa:bb:cc:dd:ee:ff", LINK_KEY_TYPE, 42).unwrap();

        let mut out = Vec::new();
        dump_link_key_types(&store, &mut out).unwrap();
        assert!(String::from_utf8(out)
            .unwrap()
            .contains("BR: UNKNOWN LINK KEY TYPE: 42"));
    }
}
