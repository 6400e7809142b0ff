use async_trait::async_trait;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::{
    normalize_prefix, split_path, ListOptions, ObjectEntry, ObjectStore, PublicUrls, PutOptions,
    SortOrder, StorageError, StoredObject,
};

/// The SqliteStore keeps a bucket of objects in a SQLite catalog database.
/// Each row stores one object's bytes alongside its folder, name and content type.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    db_path: Option<PathBuf>,
    urls: PublicUrls,
}

impl SqliteStore {
    /// Open (or create) the catalog database at `db_path` and initialize its schema.
    pub fn open(db_path: &Path, urls: PublicUrls) -> Result<Self, StorageError> {
        // Ensure the parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)?;
        tracing::info!(database = %db_path.display(), "📁 Object store opened");

        Self::with_connection(conn, Some(db_path.to_path_buf()), urls)
    }

    /// Catalog that lives only as long as this store
    pub fn open_in_memory(urls: PublicUrls) -> Result<Self, StorageError> {
        Self::with_connection(Connection::open_in_memory()?, None, urls)
    }

    fn with_connection(
        conn: Connection,
        db_path: Option<PathBuf>,
        urls: PublicUrls,
    ) -> Result<Self, StorageError> {
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path,
            urls,
        })
    }

    /// Create the objects table and its indexes if they don't exist.
    fn init_schema(conn: &Connection) -> Result<(), StorageError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS objects (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                bucket          TEXT NOT NULL,
                folder          TEXT NOT NULL,
                name            TEXT NOT NULL,
                content_type    TEXT,
                size            INTEGER NOT NULL,
                data            BLOB NOT NULL,
                created_at      INTEGER NOT NULL,
                updated_at      INTEGER NOT NULL,
                UNIQUE(bucket, folder, name)
            )",
            [],
        )?;

        // Listings filter by folder and sort by name
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_objects_folder
             ON objects(bucket, folder, name)",
            [],
        )?;

        Ok(())
    }

    /// Path to the database file, `None` for in-memory catalogs
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Run `f` against the connection on the blocking pool
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StorageError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| StorageError::Unavailable("database lock poisoned".to_string()))?;
            f(&*guard)
        })
        .await
        .map_err(|e| StorageError::Join(e.to_string()))?
    }

    /// Count of objects in this store's bucket
    pub async fn object_count(&self) -> Result<i64, StorageError> {
        let bucket = self.urls.bucket().to_string();
        self.with_conn(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM objects WHERE bucket = ?1",
                [&bucket],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await
    }

    /// Read an object's bytes back
    pub async fn get(&self, path: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let (folder, name) = split_path(path)?;
        let (bucket, folder, name) = (
            self.urls.bucket().to_string(),
            folder.to_string(),
            name.to_string(),
        );
        self.with_conn(move |conn| {
            let data = conn
                .query_row(
                    "SELECT data FROM objects WHERE bucket = ?1 AND folder = ?2 AND name = ?3",
                    params![bucket, folder, name],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(data)
        })
        .await
    }
}

#[async_trait]
impl ObjectStore for SqliteStore {
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

        let bucket = self.urls.bucket().to_string();
        let (folder, name) = (folder.to_string(), name.to_string());
        let conflict_key = key.clone();

        self.with_conn(move |conn| {
            let now = chrono::Utc::now().timestamp();
            let size = bytes.len() as i64;

            let sql = if options.overwrite {
                "INSERT INTO objects (bucket, folder, name, content_type, size, data, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
                 ON CONFLICT(bucket, folder, name) DO UPDATE SET
                    content_type = excluded.content_type,
                    size = excluded.size,
                    data = excluded.data,
                    updated_at = excluded.updated_at"
            } else {
                "INSERT INTO objects (bucket, folder, name, content_type, size, data, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)"
            };

            let result = conn.execute(
                sql,
                params![bucket, folder, name, options.content_type, size, &bytes[..], now],
            );

            match result {
                Ok(_) => Ok(()),
                // UNIQUE constraint violation means the object already exists
                Err(rusqlite::Error::SqliteFailure(err, _))
                    if err.code == ErrorCode::ConstraintViolation =>
                {
                    Err(StorageError::Conflict(conflict_key))
                }
                Err(e) => Err(e.into()),
            }
        })
        .await?;

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
        let bucket = self.urls.bucket().to_string();
        let folder = normalize_prefix(prefix).to_string();

        self.with_conn(move |conn| {
            let sql = match options.sort {
                SortOrder::NameAsc => {
                    "SELECT name, size FROM objects WHERE bucket = ?1 AND folder = ?2
                     ORDER BY name ASC LIMIT ?3"
                }
                SortOrder::NameDesc => {
                    "SELECT name, size FROM objects WHERE bucket = ?1 AND folder = ?2
                     ORDER BY name DESC LIMIT ?3"
                }
            };

            let mut stmt = conn.prepare(sql)?;
            let limit = i64::try_from(options.limit).unwrap_or(i64::MAX);
            let entries = stmt
                .query_map(params![bucket, folder, limit], |row| {
                    Ok(ObjectEntry {
                        name: row.get(0)?,
                        size: row.get::<_, i64>(1)? as u64,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(entries)
        })
        .await
    }

    fn public_url(&self, path: &str) -> String {
        self.urls.url_for(path)
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("db_path", &self.db_path)
            .field("bucket", &self.urls.bucket())
            .finish()
    }
}
