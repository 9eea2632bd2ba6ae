use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::CacheError;
use crate::model::ObjectId;

const ID_FILE: &str = "all_object_ids.json";
const DETAIL_DIR: &str = "object_ids";

/// Persistent memo of the aggregate id set and of raw detail responses.
///
/// Entries never expire: a stored id set or detail body is authoritative
/// until the store is cleared.
pub trait RoadStore {
    fn load_ids(&self) -> Result<Option<Vec<ObjectId>>, CacheError>;

    fn save_ids(&mut self, ids: &[ObjectId]) -> Result<(), CacheError>;

    /// Raw detail response for `id`, if one was stored
    fn get_detail(&self, id: ObjectId) -> Result<Option<String>, CacheError>;

    fn put_detail(&mut self, id: ObjectId, body: &str) -> Result<(), CacheError>;
}

/// Filesystem store: one JSON id file plus one JSON file per object
pub struct Cache {
    cache_dir: PathBuf,
}

impl Cache {
    /// Create a new cache with the given directory
    pub fn new<P: AsRef<Path>>(cache_dir: P) -> Result<Self, CacheError> {
        let cache_dir = cache_dir.as_ref().to_path_buf();

        // Create the cache directories if they don't exist
        fs::create_dir_all(cache_dir.join(DETAIL_DIR))?;

        Ok(Self { cache_dir })
    }

    pub fn id_file(&self) -> PathBuf {
        self.cache_dir.join(ID_FILE)
    }

    pub fn detail_path(&self, id: ObjectId) -> PathBuf {
        self.cache_dir.join(DETAIL_DIR).join(format!("{}.json", id))
    }

    fn write_file(path: &Path, data: &[u8]) -> Result<(), CacheError> {
        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = File::create(path)?;
        file.write_all(data)?;
        Ok(())
    }

    /// Clear the cache
    pub fn clear(&self) -> Result<(), CacheError> {
        if self.cache_dir.exists() {
            fs::remove_dir_all(&self.cache_dir)?;
        }
        fs::create_dir_all(self.cache_dir.join(DETAIL_DIR))?;

        Ok(())
    }
}

impl RoadStore for Cache {
    fn load_ids(&self) -> Result<Option<Vec<ObjectId>>, CacheError> {
        let path = self.id_file();
        if !path.exists() {
            return Ok(None);
        }

        let data = fs::read_to_string(&path)?;
        let ids = serde_json::from_str(&data).map_err(|e| CacheError::Corrupt {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(Some(ids))
    }

    fn save_ids(&mut self, ids: &[ObjectId]) -> Result<(), CacheError> {
        let data = serde_json::to_vec_pretty(ids).map_err(|e| CacheError::Corrupt {
            path: self.id_file().display().to_string(),
            message: e.to_string(),
        })?;
        Self::write_file(&self.id_file(), &data)
    }

    fn get_detail(&self, id: ObjectId) -> Result<Option<String>, CacheError> {
        let path = self.detail_path(id);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn put_detail(&mut self, id: ObjectId, body: &str) -> Result<(), CacheError> {
        Self::write_file(&self.detail_path(id), body.as_bytes())
    }
}

/// In-memory store, mostly for tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    ids: Option<Vec<ObjectId>>,
    details: HashMap<ObjectId, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RoadStore for MemoryStore {
    fn load_ids(&self) -> Result<Option<Vec<ObjectId>>, CacheError> {
        Ok(self.ids.clone())
    }

    fn save_ids(&mut self, ids: &[ObjectId]) -> Result<(), CacheError> {
        self.ids = Some(ids.to_vec());
        Ok(())
    }

    fn get_detail(&self, id: ObjectId) -> Result<Option<String>, CacheError> {
        Ok(self.details.get(&id).cloned())
    }

    fn put_detail(&mut self, id: ObjectId, body: &str) -> Result<(), CacheError> {
        self.details.insert(id, body.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_cache_layout_and_round_trip() {
        let dir = tempdir().unwrap();
        let mut cache = Cache::new(dir.path().join("svv")).unwrap();

        assert!(cache.load_ids().unwrap().is_none());
        assert!(cache.get_detail(42).unwrap().is_none());

        cache.save_ids(&[3, 1, 2]).unwrap();
        cache.put_detail(42, r#"{"id": 42}"#).unwrap();

        assert_eq!(cache.load_ids().unwrap(), Some(vec![3, 1, 2]));
        assert_eq!(cache.get_detail(42).unwrap().as_deref(), Some(r#"{"id": 42}"#));
        assert!(dir.path().join("svv/all_object_ids.json").exists());
        assert!(dir.path().join("svv/object_ids/42.json").exists());
    }

    #[test]
    fn test_corrupt_id_file() {
        let dir = tempdir().unwrap();
        let cache = Cache::new(dir.path()).unwrap();
        fs::write(cache.id_file(), "not json").unwrap();

        assert!(matches!(cache.load_ids(), Err(CacheError::Corrupt { .. })));
    }

    #[test]
    fn test_clear() {
        let dir = tempdir().unwrap();
        let mut cache = Cache::new(dir.path().join("svv")).unwrap();
        cache.save_ids(&[1]).unwrap();
        cache.put_detail(1, "{}").unwrap();

        cache.clear().unwrap();

        assert!(cache.load_ids().unwrap().is_none());
        assert!(cache.get_detail(1).unwrap().is_none());
        assert!(dir.path().join("svv/object_ids").is_dir());
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryStore::new();
        assert!(store.load_ids().unwrap().is_none());
        store.save_ids(&[7]).unwrap();
        store.put_detail(7, "{}").unwrap();
        assert_eq!(store.load_ids().unwrap(), Some(vec![7]));
        assert_eq!(store.get_detail(7).unwrap().as_deref(), Some("{}"));
        assert!(store.get_detail(8).unwrap().is_none());
    }
}
