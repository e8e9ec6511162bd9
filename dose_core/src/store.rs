//! Collection persistence with file locking.
//!
//! Each named collection (shots, wellness, reminders) is stored as one JSON
//! array. Readers take a shared lock; writers serialize into a temp file in
//! the same directory and rename it over the original, so a crash never
//! leaves a half-written collection behind. Writers from different processes
//! are kept apart by the store-wide lock from [`JsonFileStore::lock`].

use crate::{Error, Result};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// The named collections the journal keeps
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Collection {
    Shots,
    Wellness,
    Reminders,
}

impl Collection {
    pub const ALL: [Collection; 3] = [Collection::Shots, Collection::Wellness, Collection::Reminders];

    pub fn name(self) -> &'static str {
        match self {
            Collection::Shots => "shots",
            Collection::Wellness => "wellness",
            Collection::Reminders => "reminders",
        }
    }

    fn file_name(self) -> String {
        format!("{}.json", self.name())
    }
}

/// Load/save interface for named collections
pub trait CollectionStore {
    /// Load every record in a collection; a collection never written is empty
    fn load<T: DeserializeOwned>(&self, collection: Collection) -> Result<Vec<T>>;

    /// Replace the full contents of a collection
    fn save<T: Serialize>(&mut self, collection: Collection, records: &[T]) -> Result<()>;

    /// Remove a collection entirely
    fn clear(&mut self, collection: Collection) -> Result<()>;
}

const LOCK_FILE: &str = ".doselog.lock";

/// Guard returned by [`JsonFileStore::lock`]
#[derive(Debug)]
pub struct StoreLock {
    file: File,
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// File-backed store: one `<collection>.json` per collection under `dir`
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, collection: Collection) -> PathBuf {
        self.dir.join(collection.file_name())
    }

    /// Hold an exclusive lock on the whole store until the guard drops
    ///
    /// Writers take this around a load-modify-save cycle so concurrent
    /// processes can't interleave and drop each other's records.
    pub fn lock(&self) -> Result<StoreLock> {
        std::fs::create_dir_all(&self.dir)?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.dir.join(LOCK_FILE))?;
        file.lock_exclusive()?;
        tracing::debug!("Acquired store lock in {:?}", self.dir);
        Ok(StoreLock { file })
    }

    fn read_locked(path: &Path) -> Result<String> {
        let file = File::open(path)?;
        file.lock_shared()?;

        let mut contents = String::new();
        let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
        file.unlock()?;
        read?;

        Ok(contents)
    }
}

impl CollectionStore for JsonFileStore {
    fn load<T: DeserializeOwned>(&self, collection: Collection) -> Result<Vec<T>> {
        let path = self.path_for(collection);
        if !path.exists() {
            tracing::debug!("No {} file at {:?}, starting empty", collection.name(), path);
            return Ok(Vec::new());
        }

        let contents = Self::read_locked(&path)?;
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        match serde_json::from_str::<Vec<T>>(&contents) {
            Ok(records) => {
                tracing::debug!(
                    "Loaded {} {} records from {:?}",
                    records.len(),
                    collection.name(),
                    path
                );
                Ok(records)
            }
            Err(e) => {
                tracing::warn!("Failed to parse {:?}: {}", path, e);
                Err(Error::Store(format!(
                    "{} is unreadable ({}); fix or move it aside before logging more data",
                    path.display(),
                    e
                )))
            }
        }
    }

    fn save<T: Serialize>(&mut self, collection: Collection, records: &[T]) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(collection);

        // Temp file in the same directory so the rename stays atomic
        let temp = NamedTempFile::new_in(&self.dir)?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            serde_json::to_writer(&mut writer, records)?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.persist(&path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!(
            "Saved {} {} records to {:?}",
            records.len(),
            collection.name(),
            path
        );
        Ok(())
    }

    fn clear(&mut self, collection: Collection) -> Result<()> {
        let path = self.path_for(collection);
        if path.exists() {
            std::fs::remove_file(&path)?;
            tracing::info!("Removed {:?}", path);
        }
        Ok(())
    }
}

/// In-memory store, for tests and dry runs
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    collections: HashMap<Collection, serde_json::Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CollectionStore for MemoryStore {
    fn load<T: DeserializeOwned>(&self, collection: Collection) -> Result<Vec<T>> {
        match self.collections.get(&collection) {
            Some(value) => Ok(serde_json::from_value(value.clone())?),
            None => Ok(Vec::new()),
        }
    }

    fn save<T: Serialize>(&mut self, collection: Collection, records: &[T]) -> Result<()> {
        self.collections
            .insert(collection, serde_json::to_value(records)?);
        Ok(())
    }

    fn clear(&mut self, collection: Collection) -> Result<()> {
        self.collections.remove(&collection);
        Ok(())
    }
}
