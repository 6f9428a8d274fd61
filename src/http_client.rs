use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::Client;

const USER_AGENT_VALUE: &str = "Mozilla/5.0 (compatible; PriceTracker/1.0)";
const ACCEPT_VALUE: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Builds the single `reqwest::Client` shared across every chain adapter
/// (§6.3). Per-chain timeouts are applied per-request in `BaseAdapter::get`
/// since all adapters share this one client.
pub fn build() -> Client {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));

    Client::builder()
        .default_headers(headers)
        .build()
        .expect("failed to construct the shared HTTP client")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_without_panicking() {
        let _ = build();
    }
}
