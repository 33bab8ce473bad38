// Value types: addresses, UUIDs, device classes and link keys

mod address;
mod device;
pub mod bt_uuid;

pub use address::{AddressParseError, AddressType, RawAddress, ADDRESS_LEN};
pub use device::{
    dev_class_from_u32, DevClass, DeviceType, LinkKey, LinkKeyType, LINK_KEY_LEN,
    LINK_KEY_TYPE_MAX,
};
