use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use std::time::Duration;
use url::Url;

/// Transport settings shared by every provider client
#[derive(Debug, Clone)]
pub struct HttpClientSettings {
    /// Sent as `User-Agent` on every request
    pub user_agent: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Retries of transient transport errors, below the fetcher's own retry
    pub max_transient_retries: u32,
}

impl Default for HttpClientSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(15),
            connect_timeout: Duration::from_secs(10),
            max_transient_retries: 2,
        }
    }
}

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

pub struct HttpClientFactory;

impl HttpClientFactory {
    /// Creates a new HTTP client with retry middleware
    pub fn create_client(settings: &HttpClientSettings) -> ClientWithMiddleware {
        let retry_policy =
            ExponentialBackoff::builder().build_with_max_retries(settings.max_transient_retries);

        let client = Client::builder()
            .pool_max_idle_per_host(5)
            .user_agent(settings.user_agent.clone())
            .timeout(settings.timeout)
            .connect_timeout(settings.connect_timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build()
    }
}

/// Appends percent-encoded query parameters to `base_url`.
pub fn build_url_with_query<K, V>(base_url: &str, params: &[(K, V)]) -> Result<String, url::ParseError>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let url = Url::parse_with_params(base_url, params)?;
    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url_encodes_values() {
        let url = build_url_with_query(
            "https://data.alpaca.markets/v2/stocks/bars",
            &[("symbols", "AAPL,MSFT"), ("start", "2024-01-02T00:00:00+00:00")],
        )
        .unwrap();

        assert!(url.starts_with("https://data.alpaca.markets/v2/stocks/bars?"));
        assert!(url.contains("symbols=AAPL%2CMSFT"));
        assert!(url.contains("start=2024-01-02T00%3A00%3A00%2B00%3A00"));
    }

    #[test]
    fn test_build_url_keeps_existing_query() {
        let url = build_url_with_query("https://example.com/x?a=1", &[("b", "2")]).unwrap();
        assert_eq!(url, "https://example.com/x?a=1&b=2");
    }

    #[test]
    fn test_build_url_rejects_garbage() {
        let params: [(&str, &str); 0] = [];
        assert!(build_url_with_query("not a url", &params).is_err());
    }
}
