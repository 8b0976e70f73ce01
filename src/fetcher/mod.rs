// Loading the raw document behind an information source.

pub mod http;
pub mod traits;

pub use http::HttpFetcher;
pub use traits::Fetcher;

use crate::model::{FetchError, SourceOrigin};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    Html,
    Csv,
    Text,
}

impl DocumentFormat {
    /// Guesses the format from a file path or URL; `None` for formats the
    /// pipeline cannot read (spreadsheets, PDFs, office documents).
    pub fn detect(locator: &str) -> Option<Self> {
        let lower = locator.to_lowercase();
        let path = lower.split(['?', '#']).next().unwrap_or_default();
        let file_name = path.rsplit('/').next().unwrap_or_default();
        match file_name.rsplit_once('.').map(|(_, ext)| ext) {
            Some("csv") => Some(DocumentFormat::Csv),
            Some("txt") => Some(DocumentFormat::Text),
            Some("pdf" | "xlsx" | "xls" | "doc" | "docx") => None,
            _ => Some(DocumentFormat::Html),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub body: String,
    pub format: DocumentFormat,
}

/// Fetches a URL origin or reads a file origin.
pub async fn load_document(
    fetcher: &dyn Fetcher,
    origin: &SourceOrigin,
) -> Result<SourceDocument, FetchError> {
    let locator = origin.locator();
    let format =
        DocumentFormat::detect(&locator).ok_or_else(|| FetchError::Unsupported(locator.clone()))?;

    let body = match origin {
        SourceOrigin::Url(url) => fetcher.fetch(url).await?,
        SourceOrigin::File(path) => {
            let bytes = tokio::fs::read(path).await.map_err(|source| FetchError::Io {
                path: locator.clone(),
                source,
            })?;
            String::from_utf8_lossy(&bytes).into_owned()
        }
    };

    Ok(SourceDocument { body, format })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct NoNetwork;

    #[async_trait::async_trait]
    impl Fetcher for NoNetwork {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            Err(FetchError::Status {
                url: url.to_string(),
                status: 503,
            })
        }
    }

    #[test]
    fn detects_formats_from_locator() {
        assert_eq!(DocumentFormat::detect("uploads/PEPS.CSV"), Some(DocumentFormat::Csv));
        assert_eq!(
            DocumentFormat::detect("https://example.org/list.txt?v=2"),
            Some(DocumentFormat::Text)
        );
        assert_eq!(
            DocumentFormat::detect("https://governo.gov.ao/ministro"),
            Some(DocumentFormat::Html)
        );
        assert_eq!(DocumentFormat::detect("uploads/lista.pdf"), None);
        assert_eq!(DocumentFormat::detect("uploads/lista.xlsx"), None);
    }

    #[tokio::test]
    async fn reads_file_sources_lossily() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("names.txt");
        std::fs::write(&path, b"Ana Maria\n\xffBroken Byte\n").unwrap();

        let doc = load_document(&NoNetwork, &SourceOrigin::File(path))
            .await
            .unwrap();
        assert_eq!(doc.format, DocumentFormat::Text);
        assert!(doc.body.starts_with("Ana Maria\n"));
        assert!(doc.body.contains("Broken Byte"));
    }

    #[tokio::test]
    async fn missing_file_and_failed_fetch_are_errors() {
        let missing = SourceOrigin::File(PathBuf::from("/definitely/not/here.csv"));
        assert!(matches!(
            load_document(&NoNetwork, &missing).await,
            Err(FetchError::Io { .. })
        ));

        let url = SourceOrigin::Url("https://example.org/peps".into());
        assert!(matches!(
            load_document(&NoNetwork, &url).await,
            Err(FetchError::Status { status: 503, .. })
        ));

        let pdf = SourceOrigin::File(PathBuf::from("uploads/x.pdf"));
        assert!(matches!(
            load_document(&NoNetwork, &pdf).await,
            Err(FetchError::Unsupported(_))
        ));
    }
}
