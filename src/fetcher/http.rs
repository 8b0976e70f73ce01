use crate::config::FetchConfig;
use crate::fetcher::traits::Fetcher;
use crate::model::FetchError;

use rand::Rng;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Client, redirect};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

pub struct HttpFetcher {
    client: Client,
    max_retries: u32,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,text/csv,text/plain"),
        );

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .redirect(redirect::Policy::limited(10))
            .build()?;

        Ok(Self {
            client,
            max_retries: config.max_retries,
        })
    }

    async fn fetch_once(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }
}

/// Client errors will not improve on a second attempt.
fn is_retryable(err: &FetchError) -> bool {
    match err {
        FetchError::Status { status, .. } => *status >= 500 || *status == 429,
        FetchError::Http(_) => true,
        _ => false,
    }
}

#[async_trait::async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(url).await {
                Ok(body) => {
                    info!("Fetched {} ({} bytes)", url, body.len());
                    return Ok(body);
                }
                Err(e) if attempt < self.max_retries && is_retryable(&e) => {
                    attempt += 1;
                    let jitter = rand::rng().random_range(0..250u64);
                    let delay = Duration::from_millis(500 * u64::from(attempt) + jitter);
                    warn!("Fetch of {} failed ({}), retry {} in {:?}", url, e, attempt, delay);
                    sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::get;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::net::TcpListener;

    /// Serves `/list`, answering the n-th request with `statuses[n]` (200 once exhausted).
    async fn serve(statuses: Vec<StatusCode>) -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = Router::new().route(
            "/list",
            get(move || {
                let counter = counter.clone();
                let statuses = statuses.clone();
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    let status = statuses.get(n).copied().unwrap_or(StatusCode::OK);
                    (status, "Vera Daves de Sousa")
                }
            }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}/list", addr), hits)
    }

    fn fetcher(max_retries: u32) -> HttpFetcher {
        HttpFetcher::new(&FetchConfig {
            timeout_seconds: 5,
            max_retries,
            ..FetchConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn server_error_is_retried_until_success() {
        let (url, hits) = serve(vec![StatusCode::SERVICE_UNAVAILABLE]).await;
        let body = fetcher(2).fetch(&url).await.unwrap();
        assert_eq!(body, "Vera Daves de Sousa");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn retries_stop_at_the_configured_maximum() {
        let (url, hits) = serve(vec![StatusCode::BAD_GATEWAY; 5]).await;
        let err = fetcher(2).fetch(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 502, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn not_found_is_not_retried() {
        let (url, hits) = serve(vec![StatusCode::NOT_FOUND]).await;
        let err = fetcher(3).fetch(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn server_errors_are_retried_client_errors_are_not() {
        let server = FetchError::Status {
            url: "https://example.org".into(),
            status: 503,
        };
        let missing = FetchError::Status {
            url: "https://example.org".into(),
            status: 404,
        };
        assert!(is_retryable(&server));
        assert!(!is_retryable(&missing));
        assert!(!is_retryable(&FetchError::Unsupported("pdf".into())));
    }

    #[test]
    fn builds_with_default_config() {
        assert!(HttpFetcher::new(&FetchConfig::default()).is_ok());
    }
}
