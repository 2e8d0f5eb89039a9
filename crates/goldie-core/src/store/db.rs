// ============================================================================
// GoldieDb - Embedded Database (redb)
// ============================================================================
// Local storage for profiles, shelves, the saved lote and the CLI session.
// Default path: ~/.goldie/goldie.redb (override via GOLDIE_DB_PATH env var)
// ============================================================================

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use redb::{Database, ReadableTable, TableDefinition};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info};

use super::{DocumentStore, ShelfSubscription};
use crate::error::{store_err, GoldieError, Result};
use crate::types::{LoteEntry, ProfilePatch, Shelf, ShelfItem, UserIdentity, UserProfile};

// Table definitions
const PROFILES: TableDefinition<&str, &[u8]> = TableDefinition::new("profiles");
const SHELVES: TableDefinition<&str, &[u8]> = TableDefinition::new("shelves");
const LOTE: TableDefinition<&str, &[u8]> = TableDefinition::new("lote");
const SESSION: TableDefinition<&str, &[u8]> = TableDefinition::new("session");

const LOTE_KEY: &str = "current";
const SESSION_KEY: &str = "current";

type ShelfKey = (String, Shelf);

/// Embedded database for the storefront
pub struct GoldieDb {
    db: Database,
    path: Option<PathBuf>,
    watchers: Mutex<HashMap<ShelfKey, watch::Sender<Vec<ShelfItem>>>>,
}

fn shelf_prefix(uid: &str, shelf: Shelf) -> String {
    format!("{}/{}/", uid, shelf.as_str())
}

fn shelf_key(uid: &str, shelf: Shelf, id: &str) -> String {
    format!("{}{}", shelf_prefix(uid, shelf), id)
}

impl GoldieDb {
    /// Open (or create) the database at the given path.
    /// If `path` is None, uses GOLDIE_DB_PATH env var or ~/.goldie/goldie.redb
    pub fn open(path: Option<&str>) -> Result<Self> {
        let db_path = if let Some(p) = path {
            PathBuf::from(p)
        } else if let Ok(env_path) = std::env::var("GOLDIE_DB_PATH") {
            PathBuf::from(env_path)
        } else {
            let home = dirs::home_dir()
                .ok_or_else(|| GoldieError::Store("Cannot determine home directory".to_string()))?;
            let goldie_dir = home.join(".goldie");
            std::fs::create_dir_all(&goldie_dir)
                .map_err(|e| GoldieError::Store(format!("Failed to create .goldie directory: {}", e)))?;
            goldie_dir.join("goldie.redb")
        };

        info!("Opening database at: {}", db_path.display());

        let db = Database::create(&db_path)
            .map_err(|e| GoldieError::Store(format!("Failed to open database: {}", e)))?;
        Self::init(db, Some(db_path))
    }

    /// Throwaway database held in memory
    pub fn in_memory() -> Result<Self> {
        let db = Database::builder()
            .create_with_backend(redb::backends::InMemoryBackend::new())
            .map_err(|e| GoldieError::Store(format!("Failed to create in-memory database: {}", e)))?;
        Self::init(db, None)
    }

    fn init(db: Database, path: Option<PathBuf>) -> Result<Self> {
        // Ensure tables exist by doing a write transaction
        let write_txn = db.begin_write().map_err(store_err)?;
        {
            for table in [PROFILES, SHELVES, LOTE, SESSION] {
                write_txn.open_table(table).map_err(store_err)?;
            }
        }
        write_txn.commit().map_err(store_err)?;

        debug!("Database ready");

        Ok(Self {
            db,
            path,
            watchers: Mutex::new(HashMap::new()),
        })
    }

    /// Database file path, `None` when in memory
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    // ========================================================================
    // Raw JSON Records
    // ========================================================================

    fn put<T: Serialize>(&self, table: TableDefinition<&str, &[u8]>, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)
            .map_err(|e| GoldieError::Store(format!("Failed to serialize {}: {}", key, e)))?;

        let write_txn = self.db.begin_write().map_err(store_err)?;
        {
            let mut table = write_txn.open_table(table).map_err(store_err)?;
            table.insert(key, bytes.as_slice()).map_err(store_err)?;
        }
        write_txn.commit().map_err(store_err)?;
        Ok(())
    }

    fn get<T: DeserializeOwned>(&self, table: TableDefinition<&str, &[u8]>, key: &str) -> Result<Option<T>> {
        let read_txn = self.db.begin_read().map_err(store_err)?;
        let table = read_txn.open_table(table).map_err(store_err)?;

        match table.get(key).map_err(store_err)? {
            Some(value) => serde_json::from_slice(value.value())
                .map(Some)
                .map_err(|e| GoldieError::Store(format!("Failed to deserialize {}: {}", key, e))),
            None => Ok(None),
        }
    }

    fn delete(&self, table: TableDefinition<&str, &[u8]>, key: &str) -> Result<bool> {
        let write_txn = self.db.begin_write().map_err(store_err)?;
        let removed;
        {
            let mut table = write_txn.open_table(table).map_err(store_err)?;
            removed = table.remove(key).map_err(store_err)?.is_some();
        }
        write_txn.commit().map_err(store_err)?;
        Ok(removed)
    }

    // ========================================================================
    // Shelf Operations
    // ========================================================================

    fn read_shelf(&self, uid: &str, shelf: Shelf) -> Result<Vec<ShelfItem>> {
        let prefix = shelf_prefix(uid, shelf);

        let read_txn = self.db.begin_read().map_err(store_err)?;
        let table = read_txn.open_table(SHELVES).map_err(store_err)?;

        let mut items = Vec::new();
        for entry in table.range::<&str>(prefix.as_str()..).map_err(store_err)? {
            let (key, value) = entry.map_err(store_err)?;
            if !key.value().starts_with(&prefix) {
                break;
            }
            let item: ShelfItem = serde_json::from_slice(value.value())
                .map_err(|e| GoldieError::Store(format!("Failed to deserialize shelf item: {}", e)))?;
            items.push(item);
        }

        items.sort_by(|a, b| b.added_at.cmp(&a.added_at));
        Ok(items)
    }

    /// Push the committed shelf to live subscribers
    fn notify(&self, uid: &str, shelf: Shelf) -> Result<()> {
        let mut watchers = self.watchers.lock().map_err(store_err)?;
        let key = (uid.to_string(), shelf);

        let Some(sender) = watchers.get(&key) else {
            return Ok(());
        };
        if sender.receiver_count() == 0 {
            watchers.remove(&key);
            return Ok(());
        }

        let items = self.read_shelf(uid, shelf)?;
        debug!("Notifying {} subscriber(s) of {}/{}", sender.receiver_count(), uid, shelf.as_str());
        sender.send_replace(items);
        Ok(())
    }

    // ========================================================================
    // Lote Operations
    // ========================================================================

    pub fn save_lote(&self, entries: &[LoteEntry]) -> Result<()> {
        self.put(LOTE, LOTE_KEY, &entries)?;
        debug!("Saved lote with {} entries", entries.len());
        Ok(())
    }

    pub fn load_lote(&self) -> Result<Vec<LoteEntry>> {
        Ok(self.get(LOTE, LOTE_KEY)?.unwrap_or_default())
    }

    // ========================================================================
    // Session Operations
    // ========================================================================

    pub fn save_session(&self, identity: &UserIdentity) -> Result<()> {
        self.put(SESSION, SESSION_KEY, identity)?;
        debug!("Stored session for {}", identity.uid);
        Ok(())
    }

    pub fn load_session(&self) -> Result<Option<UserIdentity>> {
        self.get(SESSION, SESSION_KEY)
    }

    pub fn clear_session(&self) -> Result<bool> {
        self.delete(SESSION, SESSION_KEY)
    }
}

// redb transactions are short and synchronous. They run inline on the calling
// task rather than through spawn_blocking.
#[async_trait]
impl DocumentStore for GoldieDb {
    async fn merge_profile(&self, uid: &str, patch: ProfilePatch) -> Result<UserProfile> {
        let now = Utc::now();

        // Read and write under one write transaction so concurrent merges
        // for the same uid serialize instead of overwriting each other.
        let write_txn = self.db.begin_write().map_err(store_err)?;
        let profile = {
            let mut table = write_txn.open_table(PROFILES).map_err(store_err)?;

            let existing = match table.get(uid).map_err(store_err)? {
                Some(value) => Some(
                    serde_json::from_slice::<UserProfile>(value.value())
                        .map_err(|e| GoldieError::Store(format!("Failed to deserialize {}: {}", uid, e)))?,
                ),
                None => None,
            };
            let mut profile = existing.unwrap_or_else(|| UserProfile {
                uid: uid.to_string(),
                email: None,
                display_name: None,
                photo_url: None,
                location: None,
                created_at: now,
                last_login: now,
            });

            if patch.email.is_some() {
                profile.email = patch.email;
            }
            if patch.display_name.is_some() {
                profile.display_name = patch.display_name;
            }
            if patch.photo_url.is_some() {
                profile.photo_url = patch.photo_url;
            }
            if patch.location.is_some() {
                profile.location = patch.location;
            }
            if patch.touch_last_login {
                profile.last_login = now;
            }

            let bytes = serde_json::to_vec(&profile)
                .map_err(|e| GoldieError::Store(format!("Failed to serialize {}: {}", uid, e)))?;
            table.insert(uid, bytes.as_slice()).map_err(store_err)?;
            profile
        };
        write_txn.commit().map_err(store_err)?;

        debug!("Merged profile: {}", uid);
        Ok(profile)
    }

    async fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>> {
        self.get(PROFILES, uid)
    }

    async fn add_item(&self, uid: &str, shelf: Shelf, mut item: ShelfItem) -> Result<ShelfItem> {
        let key = shelf_key(uid, shelf, &item.id);

        let write_txn = self.db.begin_write().map_err(store_err)?;
        {
            let mut table = write_txn.open_table(SHELVES).map_err(store_err)?;

            let existing = match table.get(key.as_str()).map_err(store_err)? {
                Some(value) => serde_json::from_slice::<ShelfItem>(value.value()).ok(),
                None => None,
            };
            item.added_at = existing.map(|e| e.added_at).unwrap_or_else(Utc::now);

            let bytes = serde_json::to_vec(&item)
                .map_err(|e| GoldieError::Store(format!("Failed to serialize shelf item: {}", e)))?;
            table.insert(key.as_str(), bytes.as_slice()).map_err(store_err)?;
        }
        write_txn.commit().map_err(store_err)?;

        info!("Added {} to {}/{}", item.id, uid, shelf.as_str());
        self.notify(uid, shelf)?;
        Ok(item)
    }

    async fn remove_item(&self, uid: &str, shelf: Shelf, id: &str) -> Result<bool> {
        let removed = self.delete(SHELVES, &shelf_key(uid, shelf, id))?;
        if removed {
            info!("Removed {} from {}/{}", id, uid, shelf.as_str());
            self.notify(uid, shelf)?;
        }
        Ok(removed)
    }

    async fn list_items(&self, uid: &str, shelf: Shelf) -> Result<Vec<ShelfItem>> {
        self.read_shelf(uid, shelf)
    }

    async fn subscribe(&self, uid: &str, shelf: Shelf) -> Result<ShelfSubscription> {
        let items = self.read_shelf(uid, shelf)?;
        let mut watchers = self.watchers.lock().map_err(store_err)?;

        let sender = watchers
            .entry((uid.to_string(), shelf))
            .or_insert_with(|| watch::channel(Vec::new()).0);
        sender.send_replace(items);

        Ok(ShelfSubscription::new(sender.subscribe()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Currency, Intent, ItemType, OrderDetails};
    use chrono::Duration;

    fn item(id: &str, title: &str) -> ShelfItem {
        ShelfItem {
            id: id.to_string(),
            title: title.to_string(),
            cover_image: format!("https://img/{}.jpg", id),
            artist: None,
            added_at: Utc::now() - Duration::days(365),
        }
    }

    #[tokio::test]
    async fn test_profile_merge_keeps_unrelated_fields() {
        let db = GoldieDb::in_memory().unwrap();

        db.merge_profile(
            "u1",
            ProfilePatch {
                email: Some("a@example.com".to_string()),
                display_name: Some("First".to_string()),
                location: Some("Comodoro Rivadavia".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let merged = db
            .merge_profile(
                "u1",
                ProfilePatch {
                    display_name: Some("Second".to_string()),
                    touch_last_login: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(merged.display_name.as_deref(), Some("Second"));
        assert_eq!(merged.email.as_deref(), Some("a@example.com"));
        assert_eq!(merged.location.as_deref(), Some("Comodoro Rivadavia"));
        assert!(merged.last_login >= merged.created_at);

        let stored = db.get_profile("u1").await.unwrap().unwrap();
        assert_eq!(stored, merged);
        assert!(db.get_profile("nobody").await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_merges_keep_both_fields() {
        let db = std::sync::Arc::new(GoldieDb::in_memory().unwrap());

        for round in 0..100 {
            let uid = format!("u{}", round);
            db.merge_profile(&uid, ProfilePatch::default()).await.unwrap();

            let (a, b) = (db.clone(), db.clone());
            let (uid_a, uid_b) = (uid.clone(), uid.clone());
            let location = tokio::spawn(async move {
                a.merge_profile(
                    &uid_a,
                    ProfilePatch {
                        location: Some("Trelew".to_string()),
                        ..Default::default()
                    },
                )
                .await
            });
            let name = tokio::spawn(async move {
                b.merge_profile(
                    &uid_b,
                    ProfilePatch {
                        display_name: Some("Coleccionista".to_string()),
                        ..Default::default()
                    },
                )
                .await
            });
            location.await.unwrap().unwrap();
            name.await.unwrap().unwrap();

            let stored = db.get_profile(&uid).await.unwrap().unwrap();
            assert_eq!(stored.location.as_deref(), Some("Trelew"), "round {}", round);
            assert_eq!(stored.display_name.as_deref(), Some("Coleccionista"), "round {}", round);
        }
    }

    #[tokio::test]
    async fn test_add_stamps_now_and_keeps_first_added_at() {
        let db = GoldieDb::in_memory().unwrap();

        let first = db.add_item("u1", Shelf::Collection, item("1", "Artaud")).await.unwrap();
        assert!(Utc::now() - first.added_at < Duration::minutes(1));

        let again = db
            .add_item("u1", Shelf::Collection, item("1", "Artaud (reissue)"))
            .await
            .unwrap();
        assert_eq!(again.added_at, first.added_at);
        assert_eq!(again.title, "Artaud (reissue)");

        assert_eq!(db.list_items("u1", Shelf::Collection).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_newest_first_and_scoped() {
        let db = GoldieDb::in_memory().unwrap();

        db.add_item("u1", Shelf::Collection, item("1", "Oldest")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        db.add_item("u1", Shelf::Collection, item("2", "Newest")).await.unwrap();
        db.add_item("u1", Shelf::Wantlist, item("3", "Wanted")).await.unwrap();
        db.add_item("u10", Shelf::Collection, item("4", "Someone else")).await.unwrap();

        let titles: Vec<String> = db
            .list_items("u1", Shelf::Collection)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.title)
            .collect();
        assert_eq!(titles, vec!["Newest", "Oldest"]);

        assert_eq!(db.list_items("u1", Shelf::Wantlist).await.unwrap().len(), 1);
        assert_eq!(db.list_items("u10", Shelf::Collection).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_item() {
        let db = GoldieDb::in_memory().unwrap();
        db.add_item("u1", Shelf::Wantlist, item("9", "Bang! Bang!")).await.unwrap();

        assert!(db.remove_item("u1", Shelf::Wantlist, "9").await.unwrap());
        assert!(!db.remove_item("u1", Shelf::Wantlist, "9").await.unwrap());
        assert!(db.list_items("u1", Shelf::Wantlist).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_subscription_delivers_current_then_changes() {
        let db = GoldieDb::in_memory().unwrap();
        db.add_item("u1", Shelf::Collection, item("1", "Signos")).await.unwrap();

        let mut sub = db.subscribe("u1", Shelf::Collection).await.unwrap();
        assert_eq!(sub.next().await.unwrap().len(), 1);

        db.add_item("u1", Shelf::Collection, item("2", "Doble Vida")).await.unwrap();
        assert_eq!(sub.next().await.unwrap().len(), 2);

        db.remove_item("u1", Shelf::Collection, "1").await.unwrap();
        let items = sub.next().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "2");
        assert_eq!(sub.current(), items);
    }

    #[tokio::test]
    async fn test_other_shelf_writes_do_not_notify() {
        let db = GoldieDb::in_memory().unwrap();
        let mut sub = db.subscribe("u1", Shelf::Wantlist).await.unwrap();
        assert!(sub.next().await.unwrap().is_empty());

        db.add_item("u1", Shelf::Collection, item("1", "Signos")).await.unwrap();
        let waited =
            tokio::time::timeout(std::time::Duration::from_millis(50), sub.next()).await;
        assert!(waited.is_err());
    }

    #[test]
    fn test_lote_and_session_persist() {
        let db = GoldieDb::in_memory().unwrap();
        assert!(db.load_lote().unwrap().is_empty());
        assert!(db.load_session().unwrap().is_none());

        let entry = LoteEntry {
            item_id: "42".to_string(),
            item_type: ItemType::Release,
            title: "Sumo - After Chabón".to_string(),
            details: OrderDetails {
                intent: Intent::Buy,
                artist: "Sumo".to_string(),
                album: "After Chabón".to_string(),
                format: "LP".to_string(),
                condition: "VG".to_string(),
                price: None,
                currency: Currency::Ars,
            },
        };
        db.save_lote(&[entry.clone()]).unwrap();
        assert_eq!(db.load_lote().unwrap(), vec![entry]);

        let identity = UserIdentity {
            uid: "u1".to_string(),
            email: Some("a@example.com".to_string()),
            display_name: Some("a".to_string()),
            photo_url: None,
            last_login: Utc::now(),
        };
        db.save_session(&identity).unwrap();
        assert_eq!(db.load_session().unwrap(), Some(identity));
        assert!(db.clear_session().unwrap());
        assert!(db.load_session().unwrap().is_none());
    }

    #[test]
    fn test_open_file_database() {
        let dir = std::env::temp_dir().join(format!("goldie-db-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("goldie.redb");

        {
            let db = GoldieDb::open(path.to_str()).unwrap();
            assert_eq!(db.path(), Some(path.as_path()));
            db.save_lote(&[]).unwrap();
        }
        let db = GoldieDb::open(path.to_str()).unwrap();
        assert!(db.load_lote().unwrap().is_empty());

        drop(db);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
