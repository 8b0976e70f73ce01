// Screening pipeline: scan sources, cache facts, match the query.

pub mod report;

pub use report::{ScanOutcome, ScreeningReport, SourceScan, assemble};

use crate::extractor::ExtractorRegistry;
use crate::fetcher::{Fetcher, load_document};
use crate::matcher::{MatchMode, NameMatcher, PreparedQuery};
use crate::model::{Fact, InfoSource, ScanError, ScreeningQuery, StorageError};
use crate::normalizer::normalize_all;
use crate::storage::SqliteStorage;
use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

pub struct Screener {
    fetcher: Arc<dyn Fetcher>,
    registry: ExtractorRegistry,
    matcher: NameMatcher,
    storage: Arc<Mutex<SqliteStorage>>,
}

/// Counts of one refresh pass over every source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefreshSummary {
    pub sources: usize,
    pub live: usize,
    pub cached: usize,
    pub failed: usize,
    pub facts: usize,
}

impl Screener {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        registry: ExtractorRegistry,
        matcher: NameMatcher,
        storage: Arc<Mutex<SqliteStorage>>,
    ) -> Self {
        Self {
            fetcher,
            registry,
            matcher,
            storage,
        }
    }

    /// Loads, extracts and normalizes one source.
    async fn scan_live(&self, source: &InfoSource) -> Result<Vec<Fact>, ScanError> {
        let doc = load_document(self.fetcher.as_ref(), &source.origin).await?;
        let (kind, extractor) = self.registry.resolve(&source.category, doc.format)?;
        let candidates = extractor.extract(&doc)?;

        let extracted_at = Utc::now();
        let mut facts: Vec<Fact> = candidates
            .into_iter()
            .map(|c| Fact {
                kind,
                name: c.name,
                normalized_name: String::new(),
                role: c.role,
                jurisdiction: c.jurisdiction,
                identifiers: c.identifiers,
                source_id: source.id,
                extracted_at,
            })
            .collect();
        normalize_all(&mut facts);

        info!(
            "Source '{}' ({}): {} facts via {}",
            source.title,
            source.origin,
            facts.len(),
            extractor.name()
        );
        Ok(facts)
    }

    /// Scans one source; a failed live scan falls back to the cached facts.
    pub async fn scan_source(&self, source: &InfoSource) -> SourceScan {
        match self.scan_live(source).await {
            Ok(facts) => {
                if let Err(e) = self.storage.lock().await.replace_facts(source.id, &facts) {
                    warn!("Fact cache update failed for '{}': {}", source.title, e);
                }
                SourceScan {
                    source: source.clone(),
                    outcome: ScanOutcome::Live,
                    facts,
                }
            }
            Err(e) => {
                let reason = e.to_string();
                warn!("Skipping source '{}': {}", source.title, reason);

                let cached = self.storage.lock().await.cached_facts(source.id);
                match cached {
                    Ok(facts) if !facts.is_empty() => {
                        let extracted_at = facts
                            .iter()
                            .map(|f| f.extracted_at)
                            .max()
                            .unwrap_or_else(Utc::now);
                        info!("Using {} cached facts for '{}'", facts.len(), source.title);
                        SourceScan {
                            source: source.clone(),
                            outcome: ScanOutcome::Cached {
                                extracted_at,
                                reason,
                            },
                            facts,
                        }
                    }
                    Ok(_) => SourceScan {
                        source: source.clone(),
                        outcome: ScanOutcome::Failed { reason },
                        facts: Vec::new(),
                    },
                    Err(cache_err) => {
                        warn!("Fact cache read failed for '{}': {}", source.title, cache_err);
                        SourceScan {
                            source: source.clone(),
                            outcome: ScanOutcome::Failed { reason },
                            facts: Vec::new(),
                        }
                    }
                }
            }
        }
    }

    /// Scans all sources concurrently, preserving their order.
    pub async fn scan_sources(&self, sources: &[InfoSource]) -> Vec<SourceScan> {
        join_all(sources.iter().map(|source| self.scan_source(source))).await
    }

    /// Screens a query against every registered source. `mode` overrides the
    /// configured match mode for this call.
    pub async fn screen(
        &self,
        query: &ScreeningQuery,
        mode: Option<MatchMode>,
    ) -> Result<ScreeningReport, StorageError> {
        let matcher = match mode {
            Some(mode) => self.matcher.with_mode(mode),
            None => self.matcher.clone(),
        };

        // Queries that normalize to nothing are reported without touching any source.
        let prepared = PreparedQuery::new(&query.identifier, query.identifier_type);
        let scans = if prepared.is_empty() {
            Vec::new()
        } else {
            let sources = self.storage.lock().await.list_sources()?;
            self.scan_sources(&sources).await
        };

        let report = assemble(query, &matcher, &scans, Utc::now());
        info!(
            "Screened '{}' ({}): {:?}, {}",
            query.identifier,
            query.identifier_type.as_str(),
            report.status,
            report.reason
        );
        Ok(report)
    }

    /// Rescans every source to refresh the fact cache.
    pub async fn refresh_all(&self) -> Result<RefreshSummary, StorageError> {
        let sources = self.storage.lock().await.list_sources()?;
        let scans = self.scan_sources(&sources).await;

        let mut summary = RefreshSummary {
            sources: scans.len(),
            ..RefreshSummary::default()
        };
        for scan in &scans {
            match scan.outcome {
                ScanOutcome::Live => summary.live += 1,
                ScanOutcome::Cached { .. } => summary.cached += 1,
                ScanOutcome::Failed { .. } => summary.failed += 1,
            }
            summary.facts += scan.facts.len();
        }
        Ok(summary)
    }
}
