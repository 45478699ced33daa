// ABOUTME: Page fetching with SSRF protection, content-length limits, charset decoding, and retry.
// ABOUTME: fetch_with_retry bounds each attempt by a timeout and backs off exponentially between attempts.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;

use bytes::Bytes;
use ipnet::{Ipv4Net, Ipv6Net};
use once_cell::sync::Lazy;

use crate::error::ExtractError;
use crate::options::ExtractOptions;

/// Maximum allowed content length (10 MB).
pub const MAX_CONTENT_LENGTH: usize = 10 * 1024 * 1024;

static PRIVATE_V4: Lazy<Vec<Ipv4Net>> = Lazy::new(|| {
    [
        "10.0.0.0/8",
        "172.16.0.0/12",
        "192.168.0.0/16",
        "127.0.0.0/8",
        "169.254.0.0/16",
        "0.0.0.0/8",
    ]
    .iter()
    .filter_map(|n| n.parse().ok())
    .collect()
});

static PRIVATE_V6: Lazy<Vec<Ipv6Net>> = Lazy::new(|| {
    ["fc00::/7", "fe80::/10"]
        .iter()
        .filter_map(|n| n.parse().ok())
        .collect()
});

/// Options for fetching a resource.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub headers: HashMap<String, String>,
    pub allow_private_networks: bool,
}

impl From<&ExtractOptions> for FetchOptions {
    fn from(opts: &ExtractOptions) -> Self {
        Self {
            headers: opts.headers.clone(),
            allow_private_networks: opts.allow_private_networks,
        }
    }
}

/// Attempt count, per-attempt timeout and backoff base for fetch_with_retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub timeout: Duration,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Sleep after failed attempt `attempt` (1-based): `base * 2^attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor)
    }
}

impl From<&ExtractOptions> for RetryPolicy {
    fn from(opts: &ExtractOptions) -> Self {
        Self {
            attempts: opts.max_retries.max(1),
            timeout: opts.timeout(),
            base_delay: Duration::from_millis(opts.retry_base_delay_ms),
        }
    }
}

/// Result of a successful fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub status: u16,
    pub url: String,
    pub final_url: String,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl FetchResult {
    /// Decode the body as text, using charset hints from the content-type header.
    pub fn text(&self) -> String {
        decode_body(&self.body, self.content_type.as_deref())
    }
}

/// Check if an IP address is in a private/reserved range.
pub(crate) fn is_private_ip(addr: &IpAddr) -> bool {
    match addr {
        IpAddr::V4(ip) => PRIVATE_V4.iter().any(|net| net.contains(ip)),
        IpAddr::V6(ip) => {
            if ip.is_loopback() || ip.is_unspecified() {
                return true;
            }
            if let Some(v4) = ip.to_ipv4_mapped() {
                return is_private_ip(&IpAddr::V4(v4));
            }
            PRIVATE_V6.iter().any(|net| net.contains(ip))
        }
    }
}

/// Resolves the host of `target` and rejects it if any address is private.
async fn check_ssrf(url: &str, target: &url::Url, op: &str) -> Result<(), ExtractError> {
    let Some(host) = target.host_str() else {
        return Ok(());
    };
    let host = host.trim_start_matches('[').trim_end_matches(']');

    if let Ok(ip) = host.parse::<IpAddr>() {
        if is_private_ip(&ip) {
            return Err(ExtractError::ssrf(
                url,
                op,
                Some(anyhow::anyhow!("private IP addresses are not allowed")),
            ));
        }
        return Ok(());
    }

    let port = target.port_or_known_default().unwrap_or(80);
    let addrs = tokio::net::lookup_host((host, port)).await.map_err(|e| {
        ExtractError::fetch(url, op, Some(anyhow::anyhow!("DNS lookup failed: {}", e)))
    })?;

    for socket_addr in addrs {
        if is_private_ip(&socket_addr.ip()) {
            return Err(ExtractError::ssrf(
                url,
                op,
                Some(anyhow::anyhow!("private IP addresses are not allowed")),
            ));
        }
    }
    Ok(())
}

/// Decode body bytes to a String using charset from content-type header or detection.
fn decode_body(body: &[u8], content_type: Option<&str>) -> String {
    if let Some(ct) = content_type {
        if let Some(charset) = extract_charset(ct) {
            if let Some(encoding) = encoding_rs::Encoding::for_label(charset.as_bytes()) {
                let (decoded, _, _) = encoding.decode(body);
                return decoded.into_owned();
            }
        }
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(body, true);
    let encoding = detector.guess(None, true);
    let (decoded, _, _) = encoding.decode(body);
    decoded.into_owned()
}

/// Extract charset value from Content-Type header.
fn extract_charset(content_type: &str) -> Option<String> {
    let lower = content_type.to_lowercase();
    for part in lower.split(';') {
        let trimmed = part.trim();
        if let Some(charset) = trimmed.strip_prefix("charset=") {
            let charset = charset.trim_matches('"').trim_matches('\'');
            return Some(charset.to_string());
        }
    }
    None
}

/// Validates that `url` is a non-empty absolute http(s) URL.
pub fn validate_url(url: &str, op: &str) -> Result<url::Url, ExtractError> {
    if url.trim().is_empty() {
        return Err(ExtractError::invalid_input(
            url,
            op,
            Some(anyhow::anyhow!("URL is required")),
        ));
    }

    let parsed = url::Url::parse(url).map_err(|e| {
        ExtractError::invalid_input(url, op, Some(anyhow::anyhow!("invalid URL: {}", e)))
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        _ => Err(ExtractError::invalid_input(
            url,
            op,
            Some(anyhow::anyhow!("scheme must be http or https")),
        )),
    }
}

/// Fetch a resource from the given URL. Any non-2xx status is an error.
pub async fn fetch(
    client: &reqwest::Client,
    url: &str,
    opts: &FetchOptions,
) -> Result<FetchResult, ExtractError> {
    let parsed_url = validate_url(url, "Fetch")?;

    if !opts.allow_private_networks {
        check_ssrf(url, &parsed_url, "Fetch").await?;
    }

    let mut request = client.get(url);
    for (key, value) in &opts.headers {
        request = request.header(key, value);
    }

    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            ExtractError::timeout(url, "Fetch", Some(anyhow::anyhow!("request timed out: {}", e)))
        } else {
            ExtractError::fetch(url, "Fetch", Some(anyhow::anyhow!("request failed: {}", e)))
        }
    })?;

    // Redirects may land on a private address
    if !opts.allow_private_networks {
        let final_url = response.url().clone();
        check_ssrf(url, &final_url, "Fetch").await?;
    }

    let content_length = response.content_length().or_else(|| {
        response
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
    });

    if let Some(len) = content_length {
        if len as usize > MAX_CONTENT_LENGTH {
            return Err(ExtractError::fetch(
                url,
                "Fetch",
                Some(anyhow::anyhow!("content too large")),
            ));
        }
    }

    let status = response.status().as_u16();
    let final_url = response.url().to_string();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_lowercase());

    if !(200..300).contains(&status) {
        return Err(ExtractError::fetch(
            url,
            "Fetch",
            Some(anyhow::anyhow!("HTTP status {}", status)),
        ));
    }

    let body = response.bytes().await.map_err(|e| {
        ExtractError::fetch(
            url,
            "Fetch",
            Some(anyhow::anyhow!("failed to read body: {}", e)),
        )
    })?;

    if body.len() > MAX_CONTENT_LENGTH {
        return Err(ExtractError::fetch(
            url,
            "Fetch",
            Some(anyhow::anyhow!("content too large")),
        ));
    }

    Ok(FetchResult {
        status,
        url: url.to_string(),
        final_url,
        content_type,
        body,
    })
}

/// Fetch with up to `policy.attempts` attempts, each bounded by `policy.timeout`.
///
/// Network errors, timeouts and non-2xx statuses are retried; invalid input and
/// SSRF rejections fail immediately. Returns the last error once attempts run out.
pub async fn fetch_with_retry(
    client: &reqwest::Client,
    url: &str,
    opts: &FetchOptions,
    policy: &RetryPolicy,
) -> Result<FetchResult, ExtractError> {
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;

    loop {
        let result = match tokio::time::timeout(policy.timeout, fetch(client, url, opts)).await {
            Ok(result) => result,
            Err(_) => Err(ExtractError::timeout(
                url,
                "FetchWithRetry",
                Some(anyhow::anyhow!(
                    "attempt timed out after {}ms",
                    policy.timeout.as_millis()
                )),
            )),
        };

        let err = match result {
            Ok(res) => return Ok(res),
            Err(err) => err,
        };

        if err.is_invalid_input() || err.is_ssrf() || attempt >= attempts {
            tracing::warn!(url, attempt, error = %err, "page fetch failed");
            return Err(err);
        }

        let delay = policy.backoff(attempt);
        tracing::debug!(
            url,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "page fetch failed, retrying"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn create_test_client() -> reqwest::Client {
        reqwest::Client::builder()
            .user_agent("test-agent")
            .build()
            .unwrap()
    }

    fn local_opts() -> FetchOptions {
        FetchOptions {
            allow_private_networks: true,
            ..Default::default()
        }
    }

    fn fast_policy(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            timeout: Duration::from_millis(500),
            base_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_fetch_ok_utf8() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/test");
            then.status(200)
                .header("content-type", "text/plain; charset=utf-8")
                .body("hello");
        });

        let client = create_test_client();
        let result = fetch(&client, &server.url("/test"), &local_opts()).await;
        mock.assert();

        let result = result.expect("fetch should succeed");
        assert_eq!(result.status, 200);
        assert_eq!(result.text(), "hello");
    }

    #[tokio::test]
    async fn test_fetch_sends_custom_headers() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/h").header("x-coinwire", "1");
            then.status(200).body("ok");
        });

        let mut opts = local_opts();
        opts.headers.insert("x-coinwire".to_string(), "1".to_string());
        let result = fetch(&create_test_client(), &server.url("/h"), &opts).await;
        mock.assert();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_non_2xx_rejected() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/notfound");
            then.status(404).body("not found");
        });

        let client = create_test_client();
        let result = fetch(&client, &server.url("/notfound"), &local_opts()).await;
        mock.assert();

        let err = result.expect_err("should fail on 404");
        assert!(err.is_fetch());
    }

    #[tokio::test]
    async fn test_private_ip_block() {
        let server = MockServer::start();
        let client = create_test_client();
        let url = format!("http://127.0.0.1:{}/test", server.port());
        let result = fetch(&client, &url, &FetchOptions::default()).await;

        let err = result.expect_err("should fail on private IP");
        assert!(err.is_ssrf());
    }

    #[tokio::test]
    async fn test_invalid_scheme() {
        let client = create_test_client();
        let err = fetch(&client, "ftp://example.com/a", &local_opts())
            .await
            .expect_err("ftp is not allowed");
        assert!(err.is_invalid_input());
    }

    #[tokio::test]
    async fn test_retry_until_attempts_exhausted() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/flaky");
            then.status(503);
        });

        let client = create_test_client();
        let err = fetch_with_retry(&client, &server.url("/flaky"), &local_opts(), &fast_policy(3))
            .await
            .expect_err("all attempts fail");
        mock.assert_hits(3);
        assert!(err.is_fetch());
    }

    #[tokio::test]
    async fn test_retry_recovers() {
        let server = MockServer::start();
        let mut failing = server.mock(|when, then| {
            when.method(GET).path("/recover");
            then.status(500);
        });

        let client = create_test_client();
        let url = server.url("/recover");
        let policy = RetryPolicy {
            attempts: 3,
            timeout: Duration::from_millis(500),
            base_delay: Duration::from_millis(100),
        };

        let opts = local_opts();
        let fetch_fut = fetch_with_retry(&client, &url, &opts, &policy);
        let swap = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            failing.delete();
            server.mock(|when, then| {
                when.method(GET).path("/recover");
                then.status(200).body("back");
            });
        };
        let (result, _) = tokio::join!(fetch_fut, swap);
        assert_eq!(result.expect("second attempt succeeds").text(), "back");
    }

    #[tokio::test]
    async fn test_ssrf_not_retried() {
        let client = create_test_client();
        let err = fetch_with_retry(
            &client,
            "http://127.0.0.1:9/blocked",
            &FetchOptions::default(),
            &fast_policy(3),
        )
        .await
        .expect_err("blocked");
        assert!(err.is_ssrf());
    }

    #[tokio::test]
    async fn test_attempt_timeout() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/slow");
            then.status(200).delay(Duration::from_millis(800)).body("late");
        });

        let client = create_test_client();
        let policy = RetryPolicy {
            attempts: 1,
            timeout: Duration::from_millis(100),
            base_delay: Duration::from_millis(1),
        };
        let err = fetch_with_retry(&client, &server.url("/slow"), &local_opts(), &policy)
            .await
            .expect_err("times out");
        assert!(err.is_timeout());
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy {
            attempts: 3,
            timeout: Duration::from_secs(15),
            base_delay: Duration::from_millis(1000),
        };
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
        assert_eq!(policy.backoff(2), Duration::from_secs(4));
    }

    #[test]
    fn test_policy_from_options_has_at_least_one_attempt() {
        let opts = ExtractOptions {
            max_retries: 0,
            ..Default::default()
        };
        assert_eq!(RetryPolicy::from(&opts).attempts, 1);

        let opts = ExtractOptions {
            max_retries: 3,
            ..Default::default()
        };
        assert_eq!(RetryPolicy::from(&opts).attempts, 3);
    }

    #[test]
    fn test_is_private_ip() {
        assert!(is_private_ip(&"10.0.0.1".parse().unwrap()));
        assert!(is_private_ip(&"172.31.255.255".parse().unwrap()));
        assert!(is_private_ip(&"192.168.0.1".parse().unwrap()));
        assert!(is_private_ip(&"127.0.0.1".parse().unwrap()));
        assert!(is_private_ip(&"169.254.0.1".parse().unwrap()));
        assert!(is_private_ip(&"::1".parse().unwrap()));
        assert!(is_private_ip(&"fd00::1".parse().unwrap()));
        assert!(is_private_ip(&"::ffff:10.0.0.1".parse().unwrap()));
        assert!(!is_private_ip(&"8.8.8.8".parse().unwrap()));
        assert!(!is_private_ip(&"172.32.0.1".parse().unwrap()));
        assert!(!is_private_ip(&"2001:4860:4860::8888".parse().unwrap()));
    }

    #[test]
    fn test_extract_charset() {
        assert_eq!(
            extract_charset("text/html; charset=\"utf-8\""),
            Some("utf-8".to_string())
        );
        assert_eq!(extract_charset("text/html"), None);
    }

    #[test]
    fn test_decode_body_with_charset() {
        let body: &[u8] = &[0x63, 0x61, 0x66, 0xe9];
        assert_eq!(decode_body(body, Some("text/html; charset=iso-8859-1")), "café");
    }
}
