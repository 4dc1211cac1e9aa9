//! SQLite-backed byte store with per-entry absolute expiry.
//!
//! Each row carries its own `expires_at`, so a read is a single lookup. Expired
//! rows are not swept in the background: a read that finds one reports a miss
//! and hands the key to a reclaimer thread, which deletes it off the read path.

use super::clock::{duration_secs, Clock, SystemClock};
use crate::error::{AssetError, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

type SharedConnection = Arc<Mutex<Option<Connection>>>;

/// Handle to the background deleter.
struct Reclaimer {
    tx: Sender<String>,
    handle: JoinHandle<()>,
}

/// Persistent key/value store whose entries expire.
///
/// Thread-safe via an internal mutex on the connection. The database is opened
/// in exclusive locking mode, so a second process (or handle) cannot use the
/// same file while this one is open.
pub struct ExpiringStore {
    conn: SharedConnection,
    path: PathBuf,
    clock: Arc<dyn Clock>,
    reclaimer: Mutex<Option<Reclaimer>>,
}

impl ExpiringStore {
    /// Open (or create) the store file at `path` using the wall clock.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_clock(path, Arc::new(SystemClock))
    }

    /// Open (or create) the store file at `path` with an explicit time source.
    pub fn open_with_clock(path: impl AsRef<Path>, clock: Arc<dyn Clock>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            create_private_dir(parent).map_err(|e| unavailable(&path, e.to_string(), None))?;
        }
        create_private_file(&path).map_err(|e| unavailable(&path, e.to_string(), None))?;

        let conn = Connection::open(&path).map_err(|e| {
            unavailable(&path, format!("Failed to open cache database: {}", e), Some(e))
        })?;

        // The lock is held from here on, so contention means another owner
        conn.busy_timeout(Duration::ZERO).map_err(|e| {
            unavailable(&path, format!("Failed to configure cache database: {}", e), Some(e))
        })?;

        // Exclusive mode only takes the file lock on a write; the empty
        // exclusive transaction claims it now even when the table exists.
        conn.execute_batch(
            r#"
            PRAGMA locking_mode=EXCLUSIVE;
            PRAGMA synchronous=NORMAL;

            BEGIN EXCLUSIVE;
            CREATE TABLE IF NOT EXISTS cache_entries (
                key TEXT PRIMARY KEY,
                value BLOB NOT NULL,
                expires_at INTEGER NOT NULL
            );
            COMMIT;
            "#,
        )
        .map_err(|e| {
            unavailable(
                &path,
                format!("Failed to initialize cache database: {}", e),
                Some(e),
            )
        })?;

        let conn: SharedConnection = Arc::new(Mutex::new(Some(conn)));
        let reclaimer = spawn_reclaimer(Arc::clone(&conn), Arc::clone(&clock))
            .map_err(|e| unavailable(&path, format!("Failed to start reclaimer: {}", e), None))?;

        info!("Opened cache store at {}", path.display());

        Ok(Self {
            conn,
            path,
            clock,
            reclaimer: Mutex::new(Some(reclaimer)),
        })
    }

    /// Location of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the payload stored under `key`.
    ///
    /// Returns `None` when the key is absent or its entry has expired. Expired
    /// entries are queued for deletion; the read does not wait for it.
    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let row = {
            let guard = lock(&self.conn)?;
            let conn = open_connection(&guard)?;
            conn.query_row(
                "SELECT value, expires_at FROM cache_entries WHERE key = ?1",
                params![key],
                |row| Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()
            .map_err(|e| read_error(key, e))?
        };

        let (value, expires_at) = match row {
            Some(r) => r,
            None => return Ok(None),
        };

        if self.clock.now_unix() >= expires_at {
            debug!("Cache entry {} expired at {}", key, expires_at);
            self.schedule_reclaim(key);
            return Ok(None);
        }

        Ok(Some(value))
    }

    /// Store `value` under `key`, valid for `ttl` from now.
    ///
    /// Overwrites any existing entry with the same key.
    pub fn put(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let expires_at = self.clock.now_unix().saturating_add(duration_secs(ttl));
        self.put_with_expiry(key, value, expires_at)
    }

    /// Store `value` under `key` with an explicit expiry instant (unix seconds).
    pub fn put_with_expiry(&self, key: &str, value: &[u8], expires_at: i64) -> Result<()> {
        let mut guard = lock(&self.conn)?;
        let conn = guard.as_mut().ok_or_else(closed)?;

        let tx = conn.transaction().map_err(|e| AssetError::Storage {
            message: format!("Failed to begin cache transaction: {}", e),
            source: Some(e),
        })?;
        tx.execute(
            "INSERT OR REPLACE INTO cache_entries (key, value, expires_at) VALUES (?1, ?2, ?3)",
            params![key, value, expires_at],
        )
        .map_err(|e| AssetError::Storage {
            message: format!("Failed to set cache entry: {}", e),
            source: Some(e),
        })?;
        tx.commit().map_err(|e| AssetError::Storage {
            message: format!("Failed to commit cache entry: {}", e),
            source: Some(e),
        })?;

        Ok(())
    }

    /// Remove `key`. Returns whether an entry was deleted.
    pub fn delete(&self, key: &str) -> Result<bool> {
        let guard = lock(&self.conn)?;
        let conn = open_connection(&guard)?;

        let deleted = conn
            .execute("DELETE FROM cache_entries WHERE key = ?1", params![key])
            .map_err(|e| AssetError::Storage {
                message: format!("Failed to delete cache entry: {}", e),
                source: Some(e),
            })?;

        Ok(deleted > 0)
    }

    /// Number of stored rows, expired ones included.
    pub fn len(&self) -> Result<usize> {
        let guard = lock(&self.conn)?;
        let conn = open_connection(&guard)?;

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0))
            .map_err(|e| AssetError::Storage {
                message: format!("Failed to count cache entries: {}", e),
                source: Some(e),
            })?;

        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Stop the reclaimer and release the database file.
    ///
    /// Safe to call more than once. Any operation after close fails with a
    /// storage error.
    pub fn close(&self) -> Result<()> {
        let reclaimer = self
            .reclaimer
            .lock()
            .map_err(|e| AssetError::Storage {
                message: format!("Failed to lock reclaimer: {}", e),
                source: None,
            })?
            .take();

        if let Some(Reclaimer { tx, handle }) = reclaimer {
            drop(tx);
            if handle.join().is_err() {
                warn!("Cache reclaimer thread panicked");
            }
        }

        let conn = lock(&self.conn)?.take();
        if let Some(conn) = conn {
            conn.close().map_err(|(_, e)| AssetError::Storage {
                message: format!("Failed to close cache database: {}", e),
                source: Some(e),
            })?;
            info!("Closed cache store at {}", self.path.display());
        }

        Ok(())
    }

    fn schedule_reclaim(&self, key: &str) {
        let guard = match self.reclaimer.lock() {
            Ok(guard) => guard,
            Err(_) => return,
        };
        if let Some(reclaimer) = guard.as_ref() {
            if reclaimer.tx.send(key.to_string()).is_err() {
                debug!("Reclaimer stopped, leaving expired entry {}", key);
            }
        }
    }
}

/// Start the thread that deletes expired keys handed to it.
///
/// A key is only removed if its row is still expired when the delete runs, so
/// a fresh write that lands after the read's expiry check survives.
fn spawn_reclaimer(conn: SharedConnection, clock: Arc<dyn Clock>) -> std::io::Result<Reclaimer> {
    let (tx, rx) = mpsc::channel::<String>();

    let handle = std::thread::Builder::new()
        .name("cache-reclaimer".to_string())
        .spawn(move || {
            while let Ok(key) = rx.recv() {
                let guard = match conn.lock() {
                    Ok(guard) => guard,
                    Err(_) => break,
                };
                let Some(db) = guard.as_ref() else {
                    break;
                };

                match db.execute(
                    "DELETE FROM cache_entries WHERE key = ?1 AND expires_at <= ?2",
                    params![key, clock.now_unix()],
                ) {
                    Ok(n) if n > 0 => debug!("Reclaimed expired cache entry {}", key),
                    Ok(_) => {}
                    Err(e) => warn!("Failed to reclaim cache entry {}: {}", key, e),
                }
            }
            debug!("Cache reclaimer stopping");
        })?;

    Ok(Reclaimer { tx, handle })
}

fn lock(conn: &SharedConnection) -> Result<MutexGuard<'_, Option<Connection>>> {
    conn.lock().map_err(|e| AssetError::Storage {
        message: format!("Failed to lock database: {}", e),
        source: None,
    })
}

fn open_connection<'a>(guard: &'a MutexGuard<'_, Option<Connection>>) -> Result<&'a Connection> {
    guard.as_ref().ok_or_else(closed)
}

fn closed() -> AssetError {
    AssetError::Storage {
        message: "Cache store is closed".to_string(),
        source: None,
    }
}

fn unavailable(path: &Path, message: String, source: Option<rusqlite::Error>) -> AssetError {
    AssetError::StorageUnavailable {
        message,
        path: Some(path.to_path_buf()),
        source,
    }
}

/// Decoding failures mean the row itself is bad; anything else is I/O.
fn read_error(key: &str, err: rusqlite::Error) -> AssetError {
    match err {
        rusqlite::Error::InvalidColumnType(..)
        | rusqlite::Error::FromSqlConversionFailure(..)
        | rusqlite::Error::IntegralValueOutOfRange(..) => AssetError::CorruptEntry {
            key: key.to_string(),
            message: err.to_string(),
        },
        other => AssetError::Storage {
            message: format!("Failed to query cache entry: {}", other),
            source: Some(other),
        },
    }
}

#[cfg(unix)]
fn create_private_dir(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(0o700)
        .create(path)
}

#[cfg(not(unix))]
fn create_private_dir(path: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(path)
}

/// Create the database file readable only by the owner, if it does not exist.
fn create_private_file(path: &Path) -> std::io::Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::clock::ManualClock;
    use tempfile::TempDir;

    const START: i64 = 1_700_000_000;

    fn create_test_store() -> (TempDir, Arc<ManualClock>, ExpiringStore) {
        let temp_dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(START));
        let store =
            ExpiringStore::open_with_clock(temp_dir.path().join("cache.sqlite3"), clock.clone())
                .unwrap();
        (temp_dir, clock, store)
    }

    fn wait_for_len(store: &ExpiringStore, expected: usize) -> bool {
        for _ in 0..100 {
            if store.len().unwrap() == expected {
                return true;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn test_set_and_get() {
        let (_temp, _clock, store) = create_test_store();

        store
            .put("key1", b"hello world", Duration::from_secs(15))
            .unwrap();

        let value = store.get("key1").unwrap();
        assert_eq!(value.as_deref(), Some(&b"hello world"[..]));
        assert!(store.get("missing").unwrap().is_none());
    }

    #[test]
    fn test_put_overwrites() {
        let (_temp, _clock, store) = create_test_store();

        store.put("key", b"first", Duration::from_secs(15)).unwrap();
        store.put("key", b"second", Duration::from_secs(15)).unwrap();

        assert_eq!(store.get("key").unwrap().unwrap(), b"second");
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_ttl_boundary() {
        let (_temp, clock, store) = create_test_store();

        store.put("key", b"data", Duration::from_secs(15)).unwrap();

        clock.set(START + 14);
        assert!(store.get("key").unwrap().is_some());

        clock.set(START + 15);
        assert!(store.get("key").unwrap().is_none());
    }

    #[test]
    fn test_expired_entry_is_reclaimed() {
        let (_temp, clock, store) = create_test_store();

        store.put("old", b"data", Duration::from_secs(5)).unwrap();
        store.put("new", b"data", Duration::from_secs(60)).unwrap();

        clock.advance(Duration::from_secs(10));
        assert!(store.get("old").unwrap().is_none());

        assert!(wait_for_len(&store, 1));
        assert!(store.get("new").unwrap().is_some());
    }

    #[test]
    fn test_reclaimer_keeps_fresh_rewrite() {
        let (_temp, clock, store) = create_test_store();

        store.put_with_expiry("key", b"stale", START - 1).unwrap();
        // Either order of delete and rewrite must leave the fresh row
        store.schedule_reclaim("key");
        store.put("key", b"fresh", Duration::from_secs(15)).unwrap();

        clock.advance(Duration::from_secs(1));
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(store.get("key").unwrap().unwrap(), b"fresh");
    }

    #[test]
    fn test_delete() {
        let (_temp, _clock, store) = create_test_store();

        store.put("key", b"data", Duration::from_secs(15)).unwrap();
        assert!(store.delete("key").unwrap());
        assert!(!store.delete("key").unwrap());
        assert!(store.get("key").unwrap().is_none());
    }

    #[test]
    fn test_corrupt_entry() {
        let (_temp, _clock, store) = create_test_store();

        {
            let guard = lock(&store.conn).unwrap();
            guard
                .as_ref()
                .unwrap()
                .execute(
                    "INSERT INTO cache_entries (key, value, expires_at) VALUES ('bad', 'text', 'soon')",
                    [],
                )
                .unwrap();
        }

        let err = store.get("bad").unwrap_err();
        assert!(matches!(err, AssetError::CorruptEntry { ref key, .. } if key == "bad"));
    }

    #[test]
    fn test_entries_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.sqlite3");

        let store = ExpiringStore::open(&path).unwrap();
        store.put("key", b"data", Duration::from_secs(3600)).unwrap();
        store.close().unwrap();

        let store = ExpiringStore::open(&path).unwrap();
        assert_eq!(store.get("key").unwrap().unwrap(), b"data");
    }

    #[test]
    fn test_open_fails_when_store_is_held() {
        let (temp, _clock, _store) = create_test_store();

        let err = ExpiringStore::open(temp.path().join("cache.sqlite3")).err();
        assert!(matches!(err, Some(AssetError::StorageUnavailable { .. })));
    }

    #[test]
    fn test_open_fails_when_existing_store_is_held() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.sqlite3");

        let store = ExpiringStore::open(&path).unwrap();
        store.put("key", b"before", Duration::from_secs(60)).unwrap();
        store.close().unwrap();

        let owner = ExpiringStore::open(&path).unwrap();
        let err = ExpiringStore::open(&path).err();
        assert!(matches!(err, Some(AssetError::StorageUnavailable { .. })));

        // The rejected open left the owner fully usable
        owner.put("key", b"after", Duration::from_secs(60)).unwrap();
        assert_eq!(owner.get("key").unwrap(), Some(b"after".to_vec()));
        owner.close().unwrap();

        let reopened = ExpiringStore::open(&path).unwrap();
        assert_eq!(reopened.get("key").unwrap(), Some(b"after".to_vec()));
    }

    #[test]
    fn test_open_fails_on_unusable_location() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let err = ExpiringStore::open(blocker.join("cache.sqlite3")).err();
        assert!(matches!(err, Some(AssetError::StorageUnavailable { .. })));
    }

    #[test]
    fn test_close_is_idempotent() {
        let (_temp, _clock, store) = create_test_store();

        store.close().unwrap();
        store.close().unwrap();

        let err = store.get("key").unwrap_err();
        assert!(matches!(err, AssetError::Storage { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let (temp, _clock, _store) = create_test_store();
        let mode = std::fs::metadata(temp.path().join("cache.sqlite3"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
