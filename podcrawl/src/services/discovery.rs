//! Show link discovery on a category page
//!
//! Discovery and identifier extraction run sequentially, before any lookup
//! is launched. The first failure of either aborts the batch.

use crate::error::ShowError;
use crate::options::DiscoveryOptions;
use crate::services::build_http_client;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use podcrawl_common::config::LookupConfig;
use podcrawl_common::Result;
use regex::Regex;
use std::collections::HashSet;

static ANCHOR_HREF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<a\s[^>]*?\bhref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("anchor href regex is valid")
});

static DIV_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<(/?)div\b[^>]*>").expect("div tag regex is valid"));

/// Produces show links for a category
#[async_trait]
pub trait EntityDiscovery: Send + Sync {
    /// Return the distinct show links found at `options.source_url`
    async fn discover(
        &self,
        options: &DiscoveryOptions,
    ) -> std::result::Result<Vec<String>, ShowError>;
}

/// Fetches the category page and keeps anchor hrefs matching the pattern
pub struct PageLinkDiscovery {
    http_client: reqwest::Client,
}

impl PageLinkDiscovery {
    pub fn new(config: &LookupConfig) -> Result<Self> {
        Ok(Self::with_client(build_http_client(config)?))
    }

    /// Use an already configured client (shared connection pool, custom timeout)
    pub fn with_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl EntityDiscovery for PageLinkDiscovery {
    async fn discover(
        &self,
        options: &DiscoveryOptions,
    ) -> std::result::Result<Vec<String>, ShowError> {
        let source_url = options.source_url.as_str();
        let fail = |reason: String| ShowError::Discovery {
            source_url: source_url.to_string(),
            reason,
        };

        let pattern = Regex::new(&options.pattern)
            .map_err(|e| fail(format!("invalid link pattern: {}", e)))?;

        tracing::debug!(url = %source_url, "Fetching category page");

        let response = self
            .http_client
            .get(source_url)
            .send()
            .await
            .map_err(|e| fail(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fail(format!("HTTP {}", status.as_u16())));
        }

        let html = response.text().await.map_err(|e| fail(e.to_string()))?;

        let scope = match options.container_id.as_deref() {
            Some(id) => container_body(&html, id)
                .ok_or_else(|| fail(format!("container #{} not found", id)))?,
            None => html.as_str(),
        };

        let links = extract_links(scope, &pattern);

        if links.is_empty() {
            return Err(fail("no show links matched".to_string()));
        }

        tracing::info!(url = %source_url, links = links.len(), "Discovered show links");

        Ok(links)
    }
}

/// Inner markup of the `<div>` whose id is `container_id`
///
/// Nested divs are balanced; an unclosed container runs to the end of the
/// page.
pub fn container_body<'a>(html: &'a str, container_id: &str) -> Option<&'a str> {
    let id = regex::escape(container_id);
    let open = Regex::new(&format!(
        r#"(?is)<div\b[^>]*?\sid\s*=\s*(?:"{id}"[^>]*|'{id}'[^>]*|{id}(?:[\s/][^>]*)?)>"#
    ))
    .ok()?
    .find(html)?;

    let body = &html[open.end()..];
    let mut depth = 1usize;

    for tag in DIV_TAG.captures_iter(body) {
        let whole = tag.get(0)?;
        if !tag[1].is_empty() {
            depth -= 1;
            if depth == 0 {
                return Some(&body[..whole.start()]);
            }
        } else if !whole.as_str().ends_with("/>") {
            depth += 1;
        }
    }

    Some(body)
}

/// Anchor hrefs in `html` matching `pattern`, de-duplicated in page order
pub fn extract_links(html: &str, pattern: &Regex) -> Vec<String> {
    let mut seen = HashSet::new();

    ANCHOR_HREF
        .captures_iter(html)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)))
        .map(|m| m.as_str().trim().replace("&amp;", "&"))
        .filter(|href| pattern.is_match(href))
        .filter(|href| seen.insert(href.clone()))
        .collect()
}

/// Pull the catalog identifier out of a show URL
///
/// The identifier is the last `id<digits>` path segment, e.g.
/// `https://itunes.apple.com/us/podcast/up-first/id1222114325?mt=2`.
pub fn extract_identifier(url: &str) -> std::result::Result<u64, ShowError> {
    let fail = |reason: &str| ShowError::IdentifierExtraction {
        url: url.to_string(),
        reason: reason.to_string(),
    };

    let path = url.split(['?', '#']).next().unwrap_or_default();

    let digits = path
        .rsplit('/')
        .find_map(|segment| {
            segment
                .strip_prefix("id")
                .filter(|d| !d.is_empty() && d.bytes().all(|b| b.is_ascii_digit()))
        })
        .ok_or_else(|| fail("no id segment"))?;

    match digits.parse::<u64>() {
        Ok(0) => Err(fail("identifier is zero")),
        Ok(id) => Ok(id),
        Err(_) => Err(fail("identifier out of range")),
    }
}

/// Extract identifiers from every link, stopping at the first bad one
pub fn identifiers_from_links(links: &[String]) -> std::result::Result<Vec<u64>, ShowError> {
    links.iter().map(|link| extract_identifier(link)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use podcrawl_common::config::DEFAULT_LINK_PATTERN;

    const PAGE: &str = r#"
        <div id="selectedcontent">
          <div class="column first">
            <ul>
              <li><a href="https://itunes.apple.com/us/podcast/up-first/id1222114325?mt=2">Up First</a></li>
              <li><a class="x" href='https://itunes.apple.com/us/podcast/the-daily/id1200361736?mt=2'>The Daily</a></li>
              <li><a href="https://itunes.apple.com/us/podcast/up-first/id1222114325?mt=2">Up First again</a></li>
            </ul>
          </div>
        </div>
        <a href="https://itunes.apple.com/us/genre/podcasts-news/id1311?mt=2">News</a>
        <a href="/help">Help</a>
    "#;

    #[test]
    fn test_extract_links_filters_and_dedupes() {
        let pattern = Regex::new(DEFAULT_LINK_PATTERN).unwrap();
        let links = extract_links(PAGE, &pattern);

        assert_eq!(
            links,
            vec![
                "https://itunes.apple.com/us/podcast/up-first/id1222114325?mt=2".to_string(),
                "https://itunes.apple.com/us/podcast/the-daily/id1200361736?mt=2".to_string(),
            ]
        );
    }

    #[test]
    fn test_extract_links_unescapes_ampersand() {
        let pattern = Regex::new("podcast").unwrap();
        let links = extract_links(r#"<a href="/podcast/x/id5?a=1&amp;b=2">x</a>"#, &pattern);
        assert_eq!(links, vec!["/podcast/x/id5?a=1&b=2".to_string()]);
    }

    #[test]
    fn test_extract_links_accepts_unquoted_href() {
        let pattern = Regex::new(DEFAULT_LINK_PATTERN).unwrap();
        let html = r#"<li><a class=show href=https://podcasts.apple.com/us/podcast/id77>x</a></li>
            <a href = https://itunes.apple.com/us/podcast/y/id78?mt=2 target=_blank>y</a>"#;

        assert_eq!(
            extract_links(html, &pattern),
            vec![
                "https://podcasts.apple.com/us/podcast/id77".to_string(),
                "https://itunes.apple.com/us/podcast/y/id78?mt=2".to_string(),
            ]
        );
    }

    #[test]
    fn test_container_excludes_links_outside_it() {
        let html = r#"
            <div class="header"><a href="https://itunes.apple.com/us/podcast/promo/id900">Promo</a></div>
            <div class="main" id="selectedcontent">
              <div class="column"><a href="https://itunes.apple.com/us/podcast/a/id1">A</a></div>
              <div class="column"><a href="https://itunes.apple.com/us/podcast/b/id2">B</a></div>
            </div>
            <div id="footer"><a href="https://itunes.apple.com/us/podcast/footer/id901">F</a></div>
        "#;
        let pattern = Regex::new(DEFAULT_LINK_PATTERN).unwrap();

        let body = container_body(html, "selectedcontent").unwrap();

        assert_eq!(
            extract_links(body, &pattern),
            vec![
                "https://itunes.apple.com/us/podcast/a/id1".to_string(),
                "https://itunes.apple.com/us/podcast/b/id2".to_string(),
            ]
        );
        assert_eq!(extract_links(html, &pattern).len(), 4);
    }

    #[test]
    fn test_container_lookup_by_id() {
        assert_eq!(
            container_body("<div id=list><a href=x>x</a></div><p>after</p>", "list"),
            Some("<a href=x>x</a>")
        );
        assert_eq!(
            container_body(r#"<div data-id="list">no</div>"#, "list"),
            None
        );
        assert_eq!(container_body(r#"<div id="listing">no</div>"#, "list"), None);
        assert_eq!(
            container_body(r#"<div id="list"><div>open"#, "list"),
            Some("<div>open")
        );
    }

    #[test]
    fn test_extract_identifier() {
        assert_eq!(
            extract_identifier("https://itunes.apple.com/us/podcast/up-first/id1222114325?mt=2"),
            Ok(1222114325)
        );
        assert_eq!(extract_identifier("https://podcasts.apple.com/us/podcast/id42"), Ok(42));
        assert_eq!(extract_identifier("http://127.0.0.1:8080/podcast/a/id7/"), Ok(7));
    }

    #[test]
    fn test_extract_identifier_uses_last_id_segment() {
        assert_eq!(extract_identifier("https://example.com/podcast/id1/id2"), Ok(2));
        assert_eq!(extract_identifier("https://example.com/podcast/id1/id2/"), Ok(2));
        assert_eq!(extract_identifier("https://example.com/id1/podcast/idea"), Ok(1));
    }

    #[test]
    fn test_extract_identifier_failures() {
        for url in [
            "https://itunes.apple.com/us/podcast/no-identifier",
            "https://itunes.apple.com/us/podcast/x/id0",
            "https://itunes.apple.com/us/podcast/x/id99999999999999999999999",
            "https://itunes.apple.com/us/podcast/x?ref=/id12",
        ] {
            assert!(
                matches!(extract_identifier(url), Err(ShowError::IdentifierExtraction { .. })),
                "{url} should not yield an identifier"
            );
        }
    }

    #[test]
    fn test_identifiers_stop_at_first_failure() {
        let links = vec![
            "https://itunes.apple.com/us/podcast/a/id1".to_string(),
            "https://itunes.apple.com/us/podcast/b".to_string(),
            "https://itunes.apple.com/us/podcast/c/id3".to_string(),
        ];

        let err = identifiers_from_links(&links).unwrap_err();

        assert_eq!(
            err,
            ShowError::IdentifierExtraction {
                url: "https://itunes.apple.com/us/podcast/b".to_string(),
                reason: "no id segment".to_string(),
            }
        );
    }
}
