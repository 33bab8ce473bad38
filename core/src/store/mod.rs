// Store module: sectioned config store and its single writer task

pub mod backend;
pub mod writer;

pub use backend::{ConfigStore, MemoryConfig, SledConfig, ADAPTER_SECTION};
pub use writer::{ConfigCommand, ConfigWriter, FieldValue, WriteBatch};
