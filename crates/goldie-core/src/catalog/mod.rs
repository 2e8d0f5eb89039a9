//! Discogs catalog access

mod client;
mod search;
mod types;

pub use client::{DiscogsClient, CLIENT_USER_AGENT, DISCOGS_API};
pub use search::{DebouncedSearch, SEARCH_DEBOUNCE};
pub use types::{
    ArtistCredit, Community, Image, LabelRef, MasterDetail, Rating, ReleaseDetail, ReleaseFormat,
    SearchResult, Track,
};
