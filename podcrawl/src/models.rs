//! Show and genre records

use serde::{Deserialize, Serialize};

/// A podcast show as returned by the catalog lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Show {
    /// Catalog collection id
    pub id: u64,
    /// Show title
    pub name: String,
    /// Owning artist name
    pub artist: String,
    /// RSS feed URL
    pub rss: String,
    /// Catalog genre ids, possibly empty
    pub genres: Vec<u32>,
    /// Artwork in three sizes
    pub image: ShowImage,
}

/// Artwork URLs, each possibly empty
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowImage {
    /// 30px artwork
    pub small: String,
    /// 60px artwork
    pub medium: String,
    /// 100px artwork
    pub big: String,
}

/// A podcast category whose page lists its shows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: u32,
    pub name: String,
    pub url: String,
}
