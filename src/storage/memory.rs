//! In-process object store
//!
//! Keeps objects in a sorted map. Used for `--dry-run` and by tests.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use super::{
    normalize_prefix, split_path, ListOptions, ObjectEntry, ObjectStore, PublicUrls, PutOptions,
    SortOrder, StorageError, StoredObject,
};

#[derive(Debug, Clone)]
struct MemoryObject {
    bytes: Arc<[u8]>,
    content_type: Option<String>,
}

/// Object store backed by a `BTreeMap`
#[derive(Debug)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, MemoryObject>>,
    urls: PublicUrls,
    quota: Option<u64>,
}

impl MemoryStore {
    pub fn new(urls: PublicUrls) -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            urls,
            quota: None,
        }
    }

    /// Reject writes that would push the total stored size past `limit` bytes
    pub fn with_quota(mut self, limit: u64) -> Self {
        self.quota = Some(limit);
        self
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, MemoryObject>>, StorageError> {
        self.objects
            .lock()
            .map_err(|_| StorageError::Unavailable("memory store lock poisoned".to_string()))
    }

    /// Content of the object at `path`
    pub fn get(&self, path: &str) -> Option<Arc<[u8]>> {
        let key = path.trim_matches('/');
        self.lock().ok()?.get(key).map(|o| Arc::clone(&o.bytes))
    }

    /// Declared content type of the object at `path`
    pub fn content_type(&self, path: &str) -> Option<String> {
        let key = path.trim_matches('/');
        self.lock().ok()?.get(key).and_then(|o| o.content_type.clone())
    }

    pub fn len(&self) -> usize {
        self.lock().map(|objects| objects.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(
        &self,
        path: &str,
        bytes: Arc<[u8]>,
        options: PutOptions,
    ) -> Result<StoredObject, StorageError> {
        let (folder, name) = split_path(path)?;
        let key = if folder.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", folder, name)
        };

        let mut objects = self.lock()?;
        let existing = objects.get(&key).map(|o| o.bytes.len() as u64);
        if existing.is_some() && !options.overwrite {
            return Err(StorageError::Conflict(key));
        }

        if let Some(limit) = self.quota {
            let used: u64 = objects.values().map(|o| o.bytes.len() as u64).sum::<u64>()
                - existing.unwrap_or(0);
            let requested = bytes.len() as u64;
            if used + requested > limit {
                return Err(StorageError::Quota { used, requested, limit });
            }
        }

        objects.insert(
            key.clone(),
            MemoryObject {
                bytes,
                content_type: options.content_type,
            },
        );

        Ok(StoredObject {
            public_url: self.urls.url_for(&key),
            path: key,
        })
    }

    async fn list(
        &self,
        prefix: &str,
        options: ListOptions,
    ) -> Result<Vec<ObjectEntry>, StorageError> {
        let folder = normalize_prefix(prefix);
        let objects = self.lock()?;

        let mut entries: Vec<ObjectEntry> = objects
            .iter()
            .filter_map(|(key, object)| {
                let name = if folder.is_empty() {
                    key.as_str()
                } else {
                    key.strip_prefix(folder)?.strip_prefix('/')?
                };
                if name.contains('/') {
                    return None;
                }
                Some(ObjectEntry {
                    name: name.to_string(),
                    size: object.bytes.len() as u64,
                })
            })
            .collect();

        // BTreeMap iteration is already ascending by full path
        if options.sort == SortOrder::NameDesc {
            entries.reverse();
        }
        entries.truncate(options.limit);
        Ok(entries)
    }

    fn public_url(&self, path: &str) -> String {
        self.urls.url_for(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryStore {
        MemoryStore::new(PublicUrls::new("http://localhost:54321", "sign-icons"))
    }

    fn bytes(data: &[u8]) -> Arc<[u8]> {
        Arc::from(data)
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let store = store();
        let stored = store
            .put("library/R001.png", bytes(b"red"), PutOptions::upsert("image/png"))
            .await
            .unwrap();

        assert_eq!(stored.path, "library/R001.png");
        assert!(stored.public_url.ends_with("/sign-icons/library/R001.png"));
        assert_eq!(store.get("library/R001.png").as_deref(), Some(&b"red"[..]));
        assert_eq!(store.content_type("library/R001.png").as_deref(), Some("image/png"));
    }

    #[tokio::test]
    async fn test_overwrite_rules() {
        let store = store();
        store.put("a.png", bytes(b"1"), PutOptions::create("image/png")).await.unwrap();

        let err = store
            .put("a.png", bytes(b"2"), PutOptions::create("image/png"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));

        store.put("a.png", bytes(b"3"), PutOptions::upsert("image/png")).await.unwrap();
        assert_eq!(store.get("a.png").as_deref(), Some(&b"3"[..]));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_list_direct_children_only() {
        let store = store();
        for path in ["library/B001.png", "library/A001.png", "library/nested/x.png", "root.png"] {
            store.put(path, bytes(b"x"), PutOptions::upsert("image/png")).await.unwrap();
        }

        let names: Vec<String> = store
            .list("library", ListOptions::default())
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["A001.png", "B001.png"]);

        let root = store.list("", ListOptions::default()).await.unwrap();
        assert_eq!(root.len(), 1);
        assert_eq!(root[0].name, "root.png");
    }

    #[tokio::test]
    async fn test_list_limit_and_order() {
        let store = store();
        for name in ["a", "b", "c"] {
            store
                .put(&format!("library/{}.png", name), bytes(b"x"), PutOptions::upsert("image/png"))
                .await
                .unwrap();
        }
        let entries = store
            .list("library", ListOptions { limit: 2, sort: SortOrder::NameDesc })
            .await
            .unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["c.png", "b.png"]);
    }

    #[tokio::test]
    async fn test_quota() {
        let store = store().with_quota(4);
        store.put("a.png", bytes(b"123"), PutOptions::upsert("image/png")).await.unwrap();

        let err = store
            .put("b.png", bytes(b"12"), PutOptions::upsert("image/png"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Quota { used: 3, requested: 2, limit: 4 }));

        // Replacing an object only counts the new size
        store.put("a.png", bytes(b"1234"), PutOptions::upsert("image/png")).await.unwrap();
    }
}
