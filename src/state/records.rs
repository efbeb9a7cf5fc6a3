/// The record store owns the "public" and "archived" collections.
///
/// Each collection is one JSON array under a fixed key, newest first.
/// A record id lives in at most one collection; archive and make-public
/// are moves.
///
/// Entries are decoded one by one. An entry this build can't decode (say, a
/// model name it doesn't know) is hidden from listings but written back
/// untouched. A value that isn't an array at all is never overwritten.
use serde_json::Value;
use tracing::{info, warn};

use super::data::ImageRecord;
use super::storage::KeyValueStore;
use crate::error::{Error, Result};

pub const PUBLIC_KEY: &str = "pollinations-image-data";
pub const ARCHIVED_KEY: &str = "pollinations-archived-image-data";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Public,
    Archived,
}

impl Collection {
    fn key(self) -> &'static str {
        match self {
            Collection::Public => PUBLIC_KEY,
            Collection::Archived => ARCHIVED_KEY,
        }
    }

    fn other(self) -> Self {
        match self {
            Collection::Public => Collection::Archived,
            Collection::Archived => Collection::Public,
        }
    }
}

fn entry_id(entry: &Value) -> Option<i64> {
    entry.get("id").and_then(Value::as_i64)
}

#[derive(Debug)]
pub struct RecordStore<S> {
    store: S,
}

impl<S: KeyValueStore> RecordStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn list_public(&self) -> Vec<ImageRecord> {
        self.read(Collection::Public)
    }

    pub fn list_archived(&self) -> Vec<ImageRecord> {
        self.read(Collection::Archived)
    }

    /// Read a collection; unreadable data yields an empty list and
    /// undecodable entries are skipped
    pub fn read(&self, collection: Collection) -> Vec<ImageRecord> {
        let entries = match self.entries(collection) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("⚠️  Could not read {:?} collection: {}", collection, e);
                return Vec::new();
            }
        };

        entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value(entry) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("⚠️  Skipping unreadable {:?} record: {}", collection, e);
                    None
                }
            })
            .collect()
    }

    /// Raw entries of a collection. Fails rather than guess when the stored
    /// value is not a JSON array, so callers never write over it.
    fn entries(&self, collection: Collection) -> Result<Vec<Value>> {
        let Some(raw) = self.store.get(collection.key())? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str(&raw) {
            Ok(Value::Array(entries)) => Ok(entries),
            _ => Err(Error::CorruptCollection(collection.key())),
        }
    }

    fn encode(entries: &[Value]) -> Result<String> {
        Ok(serde_json::to_string(entries)?)
    }

    /// Store a new record; private records go straight to the archive
    pub fn create(&mut self, record: &ImageRecord) -> Result<()> {
        let target = if record.parameters.private {
            Collection::Archived
        } else {
            Collection::Public
        };

        let mut entries = self.entries(target)?;
        entries.insert(0, serde_json::to_value(record)?);
        self.store.set(target.key(), &Self::encode(&entries)?)?;

        info!("🖼️  Stored record {} in {:?}", record.id, target);
        Ok(())
    }

    /// Remove `id` from one collection; unknown ids are ignored
    pub fn delete(&mut self, id: i64, from_archived: bool) -> Result<()> {
        let source = if from_archived {
            Collection::Archived
        } else {
            Collection::Public
        };

        let mut entries = self.entries(source)?;
        let before = entries.len();
        entries.retain(|entry| entry_id(entry) != Some(id));
        if entries.len() == before {
            return Ok(());
        }

        self.store.set(source.key(), &Self::encode(&entries)?)?;
        info!("🗑️  Deleted record {} from {:?}", id, source);
        Ok(())
    }

    pub fn archive(&mut self, record: &ImageRecord) -> Result<()> {
        self.move_to(record.clone(), Collection::Archived)
    }

    /// Publishing is an explicit choice, so the record stops being private
    pub fn make_public(&mut self, record: &ImageRecord) -> Result<()> {
        let mut record = record.clone();
        record.parameters.private = false;
        self.move_to(record, Collection::Public)
    }

    /// Drop the id from both collections and prepend the record to `target`.
    /// Both arrays are written in one `set_many` call.
    fn move_to(&mut self, record: ImageRecord, target: Collection) -> Result<()> {
        let source = target.other();
        let id = record.id;

        let mut from = self.entries(source)?;
        from.retain(|entry| entry_id(entry) != Some(id));

        let mut to = self.entries(target)?;
        to.retain(|entry| entry_id(entry) != Some(id));
        to.insert(0, serde_json::to_value(&record)?);

        self.store.set_many(&[
            (source.key(), Self::encode(&from)?),
            (target.key(), Self::encode(&to)?),
        ])?;

        info!("📦 Moved record {} to {:?}", id, target);
        Ok(())
    }
}
