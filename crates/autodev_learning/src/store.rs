//! A JSON array on disk.

use std::fs;
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{LearningError, LearningResult};

/// Records of type `T` kept as one pretty-printed JSON array.
///
/// Every write replaces the whole file through a temp file in the same
/// directory followed by a rename, so readers never see a partial file.
pub struct JsonStore<T> {
    path: PathBuf,
    lock: Mutex<()>,
    _records: PhantomData<fn() -> T>,
}

impl<T> JsonStore<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Open the store at `path`, creating it as `[]` when missing.
    pub fn open(path: impl Into<PathBuf>) -> LearningResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let store = Self {
            path,
            lock: Mutex::new(()),
            _records: PhantomData,
        };
        if !store.path.exists() {
            store.write(&[])?;
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> LearningResult<Vec<T>> {
        let _guard = self.lock.lock();
        self.read()
    }

    pub fn append(&self, record: T) -> LearningResult<()> {
        self.update(|records| {
            records.push(record);
        })
    }

    /// Load, mutate and rewrite the records under one lock.
    pub fn update<R>(&self, f: impl FnOnce(&mut Vec<T>) -> R) -> LearningResult<R> {
        let _guard = self.lock.lock();
        let mut records = self.read()?;
        let result = f(&mut records);
        self.write(&records)?;
        Ok(result)
    }

    fn read(&self) -> LearningResult<Vec<T>> {
        let content = fs::read_to_string(&self.path)?;
        serde_json::from_str(&content).map_err(|e| LearningError::Store {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    fn write(&self, records: &[T]) -> LearningResult<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, records)?;
        tmp.write_all(b"\n")?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        debug!("Wrote {} records to {}", records.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_created_as_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let store: JsonStore<String> = JsonStore::open(dir.path().join("data/items.json")).unwrap();
        assert_eq!(fs::read_to_string(store.path()).unwrap().trim(), "[]");
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_append_and_update() {
        let dir = tempfile::tempdir().unwrap();
        let store: JsonStore<u32> = JsonStore::open(dir.path().join("n.json")).unwrap();
        store.append(1).unwrap();
        store.append(2).unwrap();

        let doubled = store
            .update(|records| {
                records.iter_mut().for_each(|n| *n *= 2);
                records.len()
            })
            .unwrap();
        assert_eq!(doubled, 2);

        let reopened: JsonStore<u32> = JsonStore::open(dir.path().join("n.json")).unwrap();
        assert_eq!(reopened.load().unwrap(), vec![2, 4]);
    }

    #[test]
    fn test_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{not an array").unwrap();
        let store: JsonStore<u32> = JsonStore::open(&path).unwrap();
        assert!(matches!(store.load(), Err(LearningError::Store { .. })));
    }
}
