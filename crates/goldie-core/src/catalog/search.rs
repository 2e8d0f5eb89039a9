//! Type-ahead search: waits for input to settle and drops superseded queries.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::client::DiscogsClient;
use super::types::SearchResult;
use crate::error::Result;

/// Quiet period before a query is sent
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(500);

/// Debounced front for [`DiscogsClient`]. Clones share the same generation
/// counter, so the latest query issued through any clone wins.
#[derive(Clone)]
pub struct DebouncedSearch {
    client: DiscogsClient,
    delay: Duration,
    generation: Arc<AtomicU64>,
}

impl DebouncedSearch {
    pub fn new(client: DiscogsClient) -> Self {
        Self::with_delay(client, SEARCH_DEBOUNCE)
    }

    pub fn with_delay(client: DiscogsClient, delay: Duration) -> Self {
        Self {
            client,
            delay,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Run `text` after the quiet period. Blank input shows trending releases.
    ///
    /// Returns `Ok(None)` when a newer query arrived before this one finished;
    /// its results would be stale.
    pub async fn query(&self, text: &str) -> Result<Option<Vec<SearchResult>>> {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;

        if !self.is_current(ticket) {
            debug!("Search '{}' superseded before sending", text);
            return Ok(None);
        }

        let results = if text.trim().is_empty() {
            self.client.get_trending().await?
        } else {
            self.client.search_releases(text).await?
        };

        if !self.is_current(ticket) {
            debug!("Search '{}' superseded in flight, dropping results", text);
            return Ok(None);
        }
        Ok(Some(results))
    }

    fn is_current(&self, ticket: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket
    }
}
