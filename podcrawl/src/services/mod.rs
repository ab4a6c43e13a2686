//! Services for show discovery and lookup

pub mod discovery;
pub mod lookup_client;
pub mod show_fetcher;

pub use discovery::{extract_identifier, EntityDiscovery, PageLinkDiscovery};
pub use lookup_client::{decode_lookup_response, LookupClient, ShowResolver};
pub use show_fetcher::{FetchOutcome, ShowFetcher};

use podcrawl_common::config::LookupConfig;
use podcrawl_common::{Error, Result};

/// HTTP client shared by discovery and lookups
///
/// `timeout_secs = 0` leaves requests without a timeout.
pub fn build_http_client(config: &LookupConfig) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().user_agent(config.user_agent.as_str());
    if let Some(timeout) = config.timeout() {
        builder = builder.timeout(timeout);
    }

    builder
        .build()
        .map_err(|e| Error::Internal(format!("HTTP client build failed: {}", e)))
}
