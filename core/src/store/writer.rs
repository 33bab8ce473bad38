// Posted config writes
//
// Callers that must not block build a `WriteBatch` and post it to a single
// writer task that owns the store handle. Batches posted through one handle
// are applied in FIFO order; posting never waits and reports nothing back.

use super::backend::ConfigStore;
use crate::{Result, StorageError};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A typed field value carried by a write command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Int(i32),
    Uint64(u64),
    Str(String),
    Bin(Vec<u8>),
}

/// One store mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    Write {
        section: String,
        field: String,
        value: FieldValue,
    },
    Remove {
        section: String,
        field: String,
    },
    Save,
    Flush,
}

impl ConfigCommand {
    /// Apply to `store`
    fn apply(&self, store: &dyn ConfigStore) -> Result<()> {
        match self {
            Self::Write {
                section,
                field,
                value,
            } => match value {
                FieldValue::Int(v) => store.set_int(section, field, *v),
                FieldValue::Uint64(v) => store.set_uint64(section, field, *v),
                FieldValue::Str(v) => store.set_str(section, field, v),
                FieldValue::Bin(v) => store.set_bin(section, field, v),
            },
            Self::Remove { section, field } => store.remove(section, field).map(|_| ()),
            Self::Save => {
                store.save();
                Ok(())
            }
            Self::Flush => store.flush(),
        }
    }
}

/// Ordered list of commands applied as one unit of work
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    commands: Vec<ConfigCommand>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    fn write(&mut self, section: &str, field: &str, value: FieldValue) -> &mut Self {
        self.commands.push(ConfigCommand::Write {
            section: section.to_string(),
            field: field.to_string(),
            value,
        });
        self
    }

    pub fn set_int(&mut self, section: &str, field: &str, value: i32) -> &mut Self {
        self.write(section, field, FieldValue::Int(value))
    }

    pub fn set_uint64(&mut self, section: &str, field: &str, value: u64) -> &mut Self {
        self.write(section, field, FieldValue::Uint64(value))
    }

    pub fn set_str(&mut self, section: &str, field: &str, value: &str) -> &mut Self {
        self.write(section, field, FieldValue::Str(value.to_string()))
    }

    pub fn set_bin(&mut self, section: &str, field: &str, value: &[u8]) -> &mut Self {
        self.write(section, field, FieldValue::Bin(value.to_vec()))
    }

    pub fn remove(&mut self, section: &str, field: &str) -> &mut Self {
        self.commands.push(ConfigCommand::Remove {
            section: section.to_string(),
            field: field.to_string(),
        });
        self
    }

    pub fn save(&mut self) -> &mut Self {
        self.commands.push(ConfigCommand::Save);
        self
    }

    pub fn flush(&mut self) -> &mut Self {
        self.commands.push(ConfigCommand::Flush);
        self
    }

    pub fn commands(&self) -> &[ConfigCommand] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Apply every command; a failing command does not stop the rest.
    /// Returns true when all commands succeeded.
    pub fn apply(&self, store: &dyn ConfigStore) -> bool {
        let mut ok = true;
        for command in &self.commands {
            if let Err(e) = command.apply(store) {
                warn!("Config write {:?} failed: {}", command, e);
                ok = false;
            }
        }
        ok
    }
}

/// Messages accepted by the writer task
#[derive(Debug)]
enum WriterMessage {
    Batch(WriteBatch),
    Barrier(oneshot::Sender<()>),
    Shutdown,
}

/// Handle to the running writer task
#[derive(Clone)]
pub struct ConfigWriter {
    tx: mpsc::UnboundedSender<WriterMessage>,
}

impl ConfigWriter {
    /// Spawn the writer task on the current tokio runtime
    pub fn spawn(store: Arc<dyn ConfigStore>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_writer(store, rx));
        (Self { tx }, handle)
    }

    /// Queue a batch; returns immediately
    pub fn post(&self, batch: WriteBatch) {
        if batch.is_empty() {
            return;
        }
        if self.tx.send(WriterMessage::Batch(batch)).is_err() {
            warn!("Config writer not running, dropping posted write");
        }
    }

    /// Resolve once every batch posted before this call has been applied
    pub async fn drained(&self) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(WriterMessage::Barrier(reply_tx))
            .map_err(|_| StorageError::Backend("Config writer not running".into()))?;
        reply_rx
            .await
            .map_err(|_| StorageError::Backend("No reply from config writer".into()))
    }

    /// Stop the task after the batches already queued
    pub fn shutdown(&self) {
        let _ = self.tx.send(WriterMessage::Shutdown);
    }
}

async fn run_writer(store: Arc<dyn ConfigStore>, mut rx: mpsc::UnboundedReceiver<WriterMessage>) {
    debug!("Config writer started");
    while let Some(message) = rx.recv().await {
        match message {
            WriterMessage::Batch(batch) => {
                batch.apply(store.as_ref());
            }
            WriterMessage::Barrier(reply) => {
                let _ = reply.send(());
            }
            WriterMessage::Shutdown => break,
        }
    }
    debug!("Config writer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::backend::test_support::FailingConfig;
    use crate::store::MemoryConfig;

    #[test]
    fn test_batch_applies_in_order() {
        let store = MemoryConfig::new();
        let mut batch = WriteBatch::new();
        batch
            .set_int("s", "a", 1)
            .set_int("s", "a", 2)
            .set_bin("s", "b", &[9])
            .remove("s", "missing")
            .save();

        assert!(batch.apply(&store));
        assert_eq!(store.get_int("s", "a").unwrap(), 2);
        assert_eq!(store.get_bin("s", "b").unwrap(), vec![9]);
        assert_eq!(store.save_count(), 1);
        assert_eq!(store.flush_count(), 0);
    }

    #[test]
    fn test_failed_command_does_not_stop_batch() {
        let store = FailingConfig::failing(&["locked"]);
        let mut batch = WriteBatch::new();
        batch
            .set_int("s", "a", 1)
            .set_int("s", "locked", 2)
            .remove("s", "locked")
            .set_str("s", "b", "x")
            .save();

        assert!(!batch.apply(&store));
        assert_eq!(store.get_int("s", "a").unwrap(), 1);
        assert_eq!(store.get_str("s", "b").unwrap(), "x");
        assert!(!store.exists("s", "locked"));
        assert_eq!(*store.removes.lock(), vec!["locked".to_string()]);
        assert_eq!(store.inner.save_count(), 1);
    }

    #[tokio::test]
    async fn test_posted_batches_are_fifo() {
        let store = MemoryConfig::new();
        let (writer, handle) = ConfigWriter::spawn(Arc::new(store.clone()));

        for i in 0..50 {
            let mut batch = WriteBatch::new();
            batch.set_int("s", "counter", i);
            writer.post(batch);
        }
        writer.drained().await.unwrap();
        assert_eq!(store.get_int("s", "counter").unwrap(), 49);

        writer.shutdown();
        handle.await.unwrap();
        assert!(writer.drained().await.is_err());
    }
}
