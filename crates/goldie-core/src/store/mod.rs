//! ============================================================================
//! Document Store - per-user profiles and shelves
//! ============================================================================
//! `DocumentStore` is the seam the session and shelf flows write through.
//! `GoldieDb` implements it on an embedded redb file.
//! ============================================================================

mod db;

pub use db::GoldieDb;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::Result;
use crate::types::{ProfilePatch, Shelf, ShelfItem, UserProfile};

/// Per-user documents keyed by uid
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Merge `patch` into the profile, creating it if absent. Returns the
    /// stored document.
    async fn merge_profile(&self, uid: &str, patch: ProfilePatch) -> Result<UserProfile>;

    async fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>>;

    /// Put an item on a shelf. Re-adding keeps the original `added_at`.
    async fn add_item(&self, uid: &str, shelf: Shelf, item: ShelfItem) -> Result<ShelfItem>;

    /// Returns whether anything was removed
    async fn remove_item(&self, uid: &str, shelf: Shelf, id: &str) -> Result<bool>;

    /// Newest first
    async fn list_items(&self, uid: &str, shelf: Shelf) -> Result<Vec<ShelfItem>>;

    /// Live view of one shelf
    async fn subscribe(&self, uid: &str, shelf: Shelf) -> Result<ShelfSubscription>;
}

/// Live shelf listing. The first [`next`](Self::next) resolves immediately
/// with the current list; later ones resolve after each write to the shelf.
pub struct ShelfSubscription {
    rx: watch::Receiver<Vec<ShelfItem>>,
}

impl ShelfSubscription {
    pub(crate) fn new(mut rx: watch::Receiver<Vec<ShelfItem>>) -> Self {
        rx.mark_changed();
        Self { rx }
    }

    /// Latest list without waiting
    pub fn current(&self) -> Vec<ShelfItem> {
        self.rx.borrow().clone()
    }

    /// Wait for the next delivery. `None` once the store is gone.
    pub async fn next(&mut self) -> Option<Vec<ShelfItem>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}
