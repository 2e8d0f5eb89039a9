//! ============================================================================
//! Catalog Types - Discogs wire records
//! ============================================================================
//! Only the fields the storefront reads. Everything is defaulted so sparse
//! upstream records still deserialize.
//! ============================================================================

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::types::ShelfItem;

/// One hit from `/database/search`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub thumb: String,
    #[serde(default)]
    pub cover_image: String,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub genre: Vec<String>,
    #[serde(default)]
    pub style: Vec<String>,
    #[serde(default)]
    pub format: Vec<String>,
    #[serde(default)]
    pub label: Vec<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl SearchResult {
    /// Cover, falling back to the thumbnail
    pub fn image(&self) -> &str {
        if self.cover_image.is_empty() {
            &self.thumb
        } else {
            &self.cover_image
        }
    }

    /// Search titles come as "Artist - Album"
    pub fn split_title(&self) -> (Option<&str>, &str) {
        match self.title.split_once(" - ") {
            Some((artist, album)) => (Some(artist.trim()), album.trim()),
            None => (None, self.title.as_str()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistCredit {
    #[serde(default)]
    pub id: Option<u64>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseFormat {
    pub name: String,
    #[serde(default)]
    pub qty: Option<String>,
    #[serde(default)]
    pub descriptions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelRef {
    pub name: String,
    #[serde(default)]
    pub catno: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub uri: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    #[serde(default)]
    pub position: String,
    pub title: String,
    #[serde(default)]
    pub duration: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Rating {
    #[serde(default)]
    pub average: f64,
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Community {
    #[serde(default)]
    pub have: u64,
    #[serde(default)]
    pub want: u64,
    #[serde(default)]
    pub rating: Option<Rating>,
}

/// `/releases/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseDetail {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub artists: Vec<ArtistCredit>,
    #[serde(default)]
    pub year: Option<u32>,
    #[serde(default)]
    pub released_formatted: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub styles: Vec<String>,
    #[serde(default)]
    pub formats: Vec<ReleaseFormat>,
    #[serde(default)]
    pub labels: Vec<LabelRef>,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub thumb: Option<String>,
    #[serde(default)]
    pub tracklist: Vec<Track>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub lowest_price: Option<f64>,
    #[serde(default)]
    pub community: Option<Community>,
    #[serde(default)]
    pub master_id: Option<u64>,
    /// Public Discogs page
    #[serde(default)]
    pub uri: Option<String>,
}

impl ReleaseDetail {
    pub fn primary_artist(&self) -> Option<&str> {
        self.artists.first().map(|a| a.name.as_str())
    }

    pub fn cover_image(&self) -> Option<&str> {
        self.images
            .first()
            .map(|img| img.uri.as_str())
            .or(self.thumb.as_deref())
    }

    pub fn primary_format(&self) -> Option<&str> {
        self.formats.first().map(|f| f.name.as_str())
    }

    /// Shelf record for this release, stamped now
    pub fn to_shelf_item(&self) -> ShelfItem {
        ShelfItem {
            id: self.id.to_string(),
            title: self.title.clone(),
            cover_image: self.cover_image().unwrap_or_default().to_string(),
            artist: self.primary_artist().map(str::to_string),
            added_at: Utc::now(),
        }
    }
}

/// `/masters/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterDetail {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub artists: Vec<ArtistCredit>,
    #[serde(default)]
    pub year: Option<u32>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub styles: Vec<String>,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub tracklist: Vec<Track>,
    #[serde(default)]
    pub main_release: Option<u64>,
    #[serde(default)]
    pub lowest_price: Option<f64>,
    #[serde(default)]
    pub num_for_sale: Option<u64>,
    #[serde(default)]
    pub uri: Option<String>,
}
