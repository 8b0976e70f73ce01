use crate::model::FetchError;

#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Downloads `url` and returns the response body as text.
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}
