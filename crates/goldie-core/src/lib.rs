//! ============================================================================
//! GOLDIE-CORE: Oldie But Goldie storefront core
//! ============================================================================
//! Backend logic for the record shop:
//! - Discogs catalog search and detail lookups
//! - WhatsApp order messages built from lote items
//! - Account sign-in with profiles mirrored into the local store
//! - Collection and wantlist shelves with live updates
//! - Gemini assistant for music events
//! ============================================================================

pub mod assistant;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod date;
pub mod error;
pub mod order;
pub mod state;
pub mod store;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use types::*;
pub use assistant::{ChatSession, EventsAssistant};
pub use auth::{AuthSubscription, FirebaseIdentity, GoogleOAuth, IdentityProvider, IdpCredential, SessionSynchronizer};
pub use catalog::{DebouncedSearch, DiscogsClient, MasterDetail, ReleaseDetail, SearchResult};
pub use config::AppConfig;
pub use date::format_relative;
pub use error::{AuthError, GoldieError, Result};
pub use order::{build_order_message, build_whatsapp_link, OrderMessenger};
pub use state::{AppState, LoadingOverlay, Lote};
pub use store::{DocumentStore, GoldieDb, ShelfSubscription};
