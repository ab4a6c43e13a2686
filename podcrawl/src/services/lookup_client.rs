//! Catalog lookup client
//!
//! Resolves one show identifier into a [`Show`] with a single GET against
//! the lookup endpoint. No retries, no rate limiting, no caching.

use crate::error::ShowError;
use crate::models::{Show, ShowImage};
use crate::options::RequestOptions;
use crate::services::build_http_client;
use async_trait::async_trait;
use podcrawl_common::config::LookupConfig;
use podcrawl_common::Result;
use serde::Deserialize;

/// Resolves a single show identifier
///
/// Implementations must be safe to call concurrently from many tasks with
/// the same shared options.
#[async_trait]
pub trait ShowResolver: Send + Sync {
    /// Look up one show
    ///
    /// # Errors
    /// Returns a per-show `ShowError` (`Transport` or `Decode`); never panics
    /// on bad input.
    async fn resolve(
        &self,
        id: u64,
        options: &RequestOptions,
    ) -> std::result::Result<Show, ShowError>;
}

/// Lookup response envelope
#[derive(Debug, Deserialize)]
struct LookupResponse {
    results: Vec<LookupResult>,
}

/// One catalog entry. Only `collectionId` is required; text fields that are
/// missing or null become empty strings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupResult {
    collection_id: Option<u64>,
    collection_name: Option<String>,
    artist_name: Option<String>,
    #[serde(default)]
    genre_ids: Vec<GenreId>,
    #[serde(rename = "artworkURL30", alias = "artworkUrl30")]
    artwork_url_30: Option<String>,
    #[serde(rename = "artworkURL60", alias = "artworkUrl60")]
    artwork_url_60: Option<String>,
    #[serde(rename = "artworkURL100", alias = "artworkUrl100")]
    artwork_url_100: Option<String>,
    feed_url: Option<String>,
}

/// The live catalog sends genre ids as strings, older payloads as numbers
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GenreId {
    Number(u32),
    Text(String),
}

impl GenreId {
    fn value(&self) -> std::result::Result<u32, String> {
        match self {
            GenreId::Number(n) => Ok(*n),
            GenreId::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| format!("genre id '{}' is not a number", s)),
        }
    }
}

/// Decode a lookup response body into a show
///
/// The first element of `results` is the show; any further elements are
/// ignored. A body that is not JSON, lacks `results`, has an empty `results`
/// array, or a first result without `collectionId` is a `Decode` failure,
/// as is a first result describing a show other than `id`.
pub fn decode_lookup_response(id: u64, body: &str) -> std::result::Result<Show, ShowError> {
    decode_show(id, body).map_err(|reason| ShowError::Decode { id, reason })
}

fn decode_show(id: u64, body: &str) -> std::result::Result<Show, String> {
    let response: LookupResponse = serde_json::from_str(body).map_err(|e| e.to_string())?;

    let result = response
        .results
        .into_iter()
        .next()
        .ok_or_else(|| "empty results".to_string())?;

    let show_id = result
        .collection_id
        .ok_or_else(|| "first result has no collectionId".to_string())?;

    if show_id != id {
        return Err(format!("lookup returned show {}", show_id));
    }

    let genres = result
        .genre_ids
        .iter()
        .map(GenreId::value)
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(Show {
        id: show_id,
        name: result.collection_name.unwrap_or_default(),
        artist: result.artist_name.unwrap_or_default(),
        rss: result.feed_url.unwrap_or_default(),
        genres,
        image: ShowImage {
            small: result.artwork_url_30.unwrap_or_default(),
            medium: result.artwork_url_60.unwrap_or_default(),
            big: result.artwork_url_100.unwrap_or_default(),
        },
    })
}

/// HTTP lookup client
pub struct LookupClient {
    http_client: reqwest::Client,
}

impl LookupClient {
    /// Build a client from lookup configuration
    ///
    /// `timeout_secs = 0` leaves requests without a timeout.
    pub fn new(config: &LookupConfig) -> Result<Self> {
        Ok(Self::with_client(build_http_client(config)?))
    }

    /// Wrap an already configured reqwest client
    pub fn with_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl ShowResolver for LookupClient {
    async fn resolve(
        &self,
        id: u64,
        options: &RequestOptions,
    ) -> std::result::Result<Show, ShowError> {
        let url = options.lookup_url(id);

        tracing::debug!(id, url = %url, "Querying lookup endpoint");

        let transport = |e: reqwest::Error| ShowError::Transport {
            id,
            reason: e.to_string(),
        };

        let response = self.http_client.get(&url).send().await.map_err(transport)?;
        let status = response.status();
        let body = response.text().await.map_err(transport)?;

        let show = decode_show(id, &body).map_err(|reason| {
            let reason = if status.is_success() {
                reason
            } else {
                format!("HTTP {}: {}", status.as_u16(), reason)
            };
            ShowError::Decode { id, reason }
        })?;

        tracing::debug!(id, name = %show.name, "Resolved show");

        Ok(show)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{"results":[{"collectionId":42,"artistName":"A","collectionName":"Show","genreIds":[1,2],"artworkURL30":"s","artworkURL60":"m","artworkURL100":"b","feedUrl":"http://x"}]}"#;

    fn options(endpoint: &str) -> RequestOptions {
        RequestOptions {
            discovery: crate::options::DiscoveryOptions {
                source_url: String::new(),
                pattern: String::new(),
                container_id: None,
            },
            show_details_url: endpoint.to_string(),
        }
    }

    #[test]
    fn test_decode_sample_response() {
        let show = decode_lookup_response(42, SAMPLE).unwrap();

        assert_eq!(show.id, 42);
        assert_eq!(show.artist, "A");
        assert_eq!(show.name, "Show");
        assert_eq!(show.genres, vec![1, 2]);
        assert_eq!(show.rss, "http://x");
        assert_eq!(
            show.image,
            ShowImage {
                small: "s".to_string(),
                medium: "m".to_string(),
                big: "b".to_string(),
            }
        );
    }

    #[test]
    fn test_decode_empty_results_is_decode_error() {
        let err = decode_lookup_response(5, r#"{"resultCount":0,"results":[]}"#).unwrap_err();
        assert!(matches!(err, ShowError::Decode { id: 5, .. }));
    }

    #[test]
    fn test_decode_absent_results_is_decode_error() {
        let err = decode_lookup_response(5, r#"{"resultCount":0}"#).unwrap_err();
        assert!(matches!(err, ShowError::Decode { id: 5, .. }));
    }

    #[test]
    fn test_decode_non_json_is_decode_error() {
        let err = decode_lookup_response(9, "<html>busy</html>").unwrap_err();
        assert_eq!(err.identifier(), Some(9));
        assert!(matches!(err, ShowError::Decode { .. }));
    }

    #[test]
    fn test_decode_requires_collection_id() {
        let err = decode_lookup_response(3, r#"{"results":[{"collectionName":"x"}]}"#).unwrap_err();
        match err {
            ShowError::Decode { reason, .. } => assert!(reason.contains("collectionId")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_decode_live_catalog_shape() {
        let body = r#"{"resultCount":1,"results":[{"wrapperType":"track","collectionId":1200361736,
            "artistId":12,"artistName":"NPR","collectionName":"Up First","genreIds":["1311","26"],
            "artworkUrl30":"a30","artworkUrl60":"a60","artworkUrl100":"a100","feedUrl":null}]}"#;

        let show = decode_lookup_response(1200361736, body).unwrap();

        assert_eq!(show.genres, vec![1311, 26]);
        assert_eq!(show.image.small, "a30");
        assert_eq!(show.image.big, "a100");
        assert_eq!(show.rss, "");
    }

    #[test]
    fn test_decode_rejects_other_show() {
        let body = r#"{"results":[{"collectionId":43,"collectionName":"Other"}]}"#;

        assert_eq!(
            decode_lookup_response(42, body),
            Err(ShowError::Decode {
                id: 42,
                reason: "lookup returned show 43".to_string(),
            })
        );
    }

    #[test]
    fn test_decode_only_first_result_used() {
        let body = r#"{"results":[{"collectionId":1,"collectionName":"first"},{"collectionId":2,"collectionName":"second"}]}"#;
        let show = decode_lookup_response(1, body).unwrap();
        assert_eq!(show.name, "first");
        assert!(show.genres.is_empty());
        assert_eq!(show.image, ShowImage::default());
    }

    #[test]
    fn test_decode_bad_genre_id() {
        let body = r#"{"results":[{"collectionId":1,"genreIds":["music"]}]}"#;
        assert!(matches!(
            decode_lookup_response(1, body),
            Err(ShowError::Decode { id: 1, .. })
        ));
    }

    #[test]
    fn test_client_creation() {
        assert!(LookupClient::new(&LookupConfig::default()).is_ok());
        let unbounded = LookupConfig {
            timeout_secs: 0,
            ..LookupConfig::default()
        };
        assert!(LookupClient::new(&unbounded).is_ok());
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        // Reserve a port, then release it so nothing is listening there
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = LookupClient::new(&LookupConfig::default()).unwrap();
        let endpoint = format!("http://{}/lookup?id=", addr);

        let err = client.resolve(11, &options(&endpoint)).await.unwrap_err();

        assert!(matches!(err, ShowError::Transport { id: 11, .. }));
    }
}
