use std::collections::HashSet;
use std::sync::Mutex;

use chrono::{NaiveDate, Utc};
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};

use crate::error::FetchError;
use crate::model::{ChainConfig, DiscoveredFile, FetchedFile, NormalizedRow, RowValidation};
use crate::parsers::{self, ParseOptions, ParseResult};
use crate::rate_limiter::RateLimiter;
use crate::utils::hashing::sha256_hex;

/// Shared behaviour every chain adapter composes (§4.2 "Shared base
/// behaviour"). Chain adapters hold one of these and override only the
/// points that differ: discovery protocol, filename/identifier regex, and
/// any chain-specific pre/post-processing.
pub struct BaseAdapter {
    pub client: Client,
    pub config: ChainConfig,
    pub rate_limiter: RateLimiter,
    discovery_date: Mutex<Option<NaiveDate>>,
}

impl BaseAdapter {
    pub fn new(client: Client, config: ChainConfig, requests_per_second: f64, max_retries: u32) -> Self {
        BaseAdapter {
            client,
            config,
            rate_limiter: RateLimiter::new(requests_per_second, max_retries),
            discovery_date: Mutex::new(None),
        }
    }

    pub fn set_discovery_date(&self, date: Option<NaiveDate>) {
        *self.discovery_date.lock().unwrap() = date;
    }

    pub fn discovery_date(&self) -> Option<NaiveDate> {
        *self.discovery_date.lock().unwrap()
    }

    /// GETs a URL under the adapter's throttle and retry policy (§4.4).
    /// Used by both discovery (HTML/XML listing pages) and `fetch`.
    pub async fn get(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        let client = &self.client;
        let timeout = std::time::Duration::from_secs(self.config.request_timeout_secs);
        self.rate_limiter
            .run_with_retry(
                || async {
                    client.get(url).timeout(timeout).send().await.map_err(|source| FetchError::Request {
                        url: url.to_string(),
                        source,
                    })
                },
                |err| matches!(err, FetchError::Request { source, .. } if source.status().map(|s| s.is_server_error()).unwrap_or(true)),
            )
            .await
    }

    /// Default `fetch` (§4.3 "Fetch"): rate-limited GET, non-2xx collapses
    /// to a `FetchError::Status`, bytes are hashed for the caller.
    pub async fn fetch(&self, file: &DiscoveredFile) -> Result<FetchedFile, FetchError> {
        let response = self.get(&file.url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: file.url.clone(),
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().await.map_err(|source| FetchError::Request {
            url: file.url.clone(),
            source,
        })?;
        let content = bytes.to_vec();
        let content_hash = sha256_hex(&content);
        Ok(FetchedFile {
            discovered: file.clone(),
            content,
            content_hash,
        })
    }

    /// Best-effort filename extraction from a URL's last path segment
    /// (§4.2 "a URL-to-filename extractor").
    pub fn filename_from_url(url: &str) -> String {
        url.rsplit('/')
            .next()
            .map(|segment| segment.split(['?', '#']).next().unwrap_or(segment))
            .unwrap_or(url)
            .to_string()
    }

    /// Applies `pattern` to `filename` and returns the first capture group,
    /// stripping none of the configured prefixes that might precede it
    /// (§4.2 "a generic filename-code extractor that strips one of a list
    /// of configurable prefix patterns").
    pub fn extract_code(pattern: &Regex, filename: &str, strip_prefixes: &[&str]) -> Option<String> {
        let mut candidate = filename;
        for prefix in strip_prefixes {
            if let Some(stripped) = candidate.strip_prefix(prefix) {
                candidate = stripped;
                break;
            }
        }
        pattern.captures(candidate)?.get(1).map(|m| m.as_str().to_string())
    }

    /// Walks `url_for_page(0), url_for_page(1), ...`, collecting every
    /// `href` matched by `link_selector` on each page, stopping as soon as
    /// a page introduces no URL not already seen, bounded by a safety cap
    /// of 50 pages regardless of cursor behaviour (§4.2, §8 seed scenario
    /// 6). URLs are de-duplicated via a set; discovery order is not
    /// meaningful downstream (§5 "Ordering guarantees").
    pub async fn discover_paginated_html(&self, url_for_page: impl Fn(u32) -> String, link_selector: &str) -> Vec<String> {
        const PAGE_CAP: u32 = 50;
        let selector = match Selector::parse(link_selector) {
            Ok(selector) => selector,
            Err(_) => return Vec::new(),
        };

        let mut seen = HashSet::new();
        for page in 0..PAGE_CAP {
            let url = url_for_page(page);
            let response = match self.get(&url).await {
                Ok(response) if response.status().is_success() => response,
                _ => break,
            };
            let body = match response.text().await {
                Ok(body) => body,
                Err(_) => break,
            };

            let document = Html::parse_document(&body);
            let mut found_new = false;
            for element in document.select(&selector) {
                if let Some(href) = element.value().attr("href") {
                    if seen.insert(href.to_string()) {
                        found_new = true;
                    }
                }
            }

            if !found_new {
                break;
            }
        }

        seen.into_iter().collect()
    }

    /// Tries `primary`, then `fallback` (if given) when the primary mapping
    /// yields zero valid rows and at least one error (§4.1.1, §4.2 "a
    /// generic CSV parse that tries the primary column mapping and then
    /// ... retries with an alternative mapping").
    pub fn parse_csv_with_fallback(
        content: &[u8],
        filename: &str,
        primary: &ParseOptions,
        fallback: Option<&ParseOptions>,
    ) -> ParseResult {
        let attempt = parsers::parse_csv(content, filename, primary);
        if attempt.valid_rows > 0 || attempt.errors.is_empty() {
            return attempt;
        }
        match fallback {
            Some(options) => parsers::parse_csv(content, filename, options),
            None => attempt,
        }
    }
}

/// Every length in 8..=14, the universal default (§4.2 "numeric-only
/// barcode of length 8-14 warning").
pub const DEFAULT_BARCODE_LENGTHS: &[usize] = &[8, 9, 10, 11, 12, 13, 14];

/// Universal validation rules every adapter starts from (§4.2 "a default
/// `validateRow` covering the universal rules"). `barcode_lengths` is the
/// chain's accepted numeric-barcode length set; the default is 8-14 and
/// Lidl tightens it to {8, 13, 14}.
pub fn default_validate_row(row: &NormalizedRow, barcode_lengths: &[usize]) -> RowValidation {
    let mut validation = RowValidation::ok();

    if row.name.trim().is_empty() {
        validation = validation.with_error("name is required");
    }

    if row.price <= 0 {
        validation = validation.with_error("price must be greater than zero");
    }

    if let Some(discount) = row.discount_price {
        if discount >= row.price {
            validation = validation.with_warning("discount price is not lower than price");
        }
    }

    if row.price > 100_000_000 {
        validation = validation.with_warning("price exceeds 1,000,000 units");
    }

    for barcode in &row.barcodes {
        if barcode.chars().all(|c| c.is_ascii_digit()) && !barcode_lengths.contains(&barcode.len()) {
            validation = validation.with_warning(format!("barcode '{barcode}' has an unusual length"));
        }
    }

    validation
}

/// Fixed per-chain sentinel used by national chains (§4.2 "National
/// chains"), e.g. `dm_national`.
pub fn national_sentinel(chain_slug: &str) -> String {
    format!("{chain_slug}_national")
}

/// `YYYY-MM-DD` formatting for discovery query parameters (§6.3).
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}
