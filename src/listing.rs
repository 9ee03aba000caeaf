//! Directory listing scraper.
//!
//! Listings are the HTML index pages a Subversion web front-end (for example
//! `mod_dav_svn`) serves for a directory URL:
//!
//! ```text
//! <ul>
//!   <li><a href="../">..</a></li>
//!   <li><a href="a.txt">a.txt</a></li>
//!   <li><a href="sub/">sub/</a></li>
//! </ul>
//! ```
//!
//! Only the literal `<li><a href="VALUE">` shape is recognized. This is a
//! textual match over that one format, not an HTML parser.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;
use tracing::{debug, warn};

use crate::drain::{drain_capped, drain_sized};
use crate::{HttpFetcher, ListingEntry, SvnError};

const PARENT_HREF: &str = "../";

#[allow(clippy::expect_used)]
static HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<li><a href="([^"]*)">"#).expect("listing pattern is valid"));

/// Extracts the child entries of a listing page, in document order.
///
/// The parent-directory link (`../`) is skipped. Pages without any matching
/// link yield an empty list.
pub fn parse_listing(html: &str) -> Vec<ListingEntry> {
    HREF.captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|href| *href != PARENT_HREF)
        .map(ListingEntry::from_href)
        .collect()
}

/// Fetches the listing page at `url` and parses it.
///
/// A declared `Content-Length` sizes the read buffer and must not exceed
/// `max_bytes`; without one, at most `max_bytes` are kept.
pub(crate) async fn fetch_listing(
    fetcher: &HttpFetcher,
    url: Url,
    max_bytes: usize,
) -> Result<Vec<ListingEntry>, SvnError> {
    let response = fetcher.get(url).await?.error_for_status().await?;
    let final_url = response.url().clone();

    let body = match response.content_length() {
        Some(length) if length > max_bytes as u64 => {
            response.discard().await;
            return Err(SvnError::ListingTooLarge {
                url: final_url.to_string(),
                length,
                limit: max_bytes,
            });
        }
        Some(length) => drain_sized(Some(response.into_reader()), length as usize).await,
        None => {
            let (body, truncated) = drain_capped(Some(response.into_reader()), max_bytes).await;
            if truncated {
                warn!(url = %final_url, limit = max_bytes, "listing truncated");
            }
            body
        }
    };

    let entries = parse_listing(&String::from_utf8_lossy(&body));
    debug!(url = %final_url, entries = entries.len(), "listing");
    Ok(entries)
}
