//! Request options shared by discovery and lookups
//!
//! One `RequestOptions` value is built per run and shared read-only (behind
//! an `Arc`) by every concurrent lookup.

use crate::models::Genre;
use podcrawl_common::config::{
    TomlConfig, DEFAULT_CONTAINER_ID, DEFAULT_LINK_PATTERN, DEFAULT_LOOKUP_ENDPOINT,
};

/// Where to find show links and which ones count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// Category page URL
    pub source_url: String,
    /// Regular expression an anchor href must match
    pub pattern: String,
    /// Id of the `<div>` the links must sit in; `None` scans the whole page
    pub container_id: Option<String>,
}

/// Discovery options plus the lookup endpoint template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOptions {
    pub discovery: DiscoveryOptions,
    /// Endpoint template; the show identifier is appended verbatim
    pub show_details_url: String,
}

impl RequestOptions {
    /// Default iTunes options for one genre page
    pub fn for_genre(genre: &Genre) -> Self {
        Self {
            discovery: DiscoveryOptions {
                source_url: genre.url.clone(),
                pattern: DEFAULT_LINK_PATTERN.to_string(),
                container_id: Some(DEFAULT_CONTAINER_ID.to_string()),
            },
            show_details_url: DEFAULT_LOOKUP_ENDPOINT.to_string(),
        }
    }

    /// Options for a category page using the configured pattern and endpoint
    pub fn from_config(config: &TomlConfig, source_url: impl Into<String>) -> Self {
        Self {
            discovery: DiscoveryOptions {
                source_url: source_url.into(),
                pattern: config.discovery.pattern.clone(),
                container_id: config.discovery.container().map(str::to_string),
            },
            show_details_url: config.lookup.endpoint.clone(),
        }
    }

    /// Full lookup address for one identifier
    pub fn lookup_url(&self, id: u64) -> String {
        format!("{}{}", self.show_details_url, id)
    }
}
