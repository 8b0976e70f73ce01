// Extractor dispatch: source category + document format -> extractor.

pub mod csv_list;
pub mod governo;
pub mod html_list;
pub mod text_lines;

pub use csv_list::CsvExtractor;
pub use governo::GovernoMinistroExtractor;
pub use html_list::HtmlListExtractor;
pub use text_lines::TextLinesExtractor;

use crate::fetcher::{DocumentFormat, SourceDocument};
use crate::model::{Candidate, ExtractError, FactKind};
use crate::normalizer::normalize_name;
use std::collections::HashMap;
use std::sync::Arc;

pub trait Extractor: Send + Sync {
    fn name(&self) -> &'static str;
    fn extract(&self, doc: &SourceDocument) -> Result<Vec<Candidate>, ExtractError>;
}

/// Header aliases shared by the table and CSV extractors, in normalized form.
const NAME_COLUMNS: &[&str] = &["name", "nome", "full name", "nome completo", "person name"];
const ROLE_COLUMNS: &[&str] = &["role", "cargo", "funcao", "position"];
const JURISDICTION_COLUMNS: &[&str] = &["country", "pais", "jurisdiction", "nationality"];
const ID_COLUMNS: &[&str] = &[
    "nif",
    "bi",
    "passport",
    "passaporte",
    "cartao residente",
    "id number",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Column {
    Name,
    Role,
    Jurisdiction,
    Identifier,
}

pub(crate) fn classify_header(header: &str) -> Option<Column> {
    let key = normalize_name(header);
    let key = key.as_str();
    if NAME_COLUMNS.contains(&key) {
        Some(Column::Name)
    } else if ROLE_COLUMNS.contains(&key) {
        Some(Column::Role)
    } else if JURISDICTION_COLUMNS.contains(&key) {
        Some(Column::Jurisdiction)
    } else if ID_COLUMNS.contains(&key) {
        Some(Column::Identifier)
    } else {
        None
    }
}

/// Whitespace-collapsed text content of an element.
pub(crate) fn element_text(el: &scraper::ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Infers the fact kind from a free-form category ("PEP", "Sanções", "ofac_csv").
fn kind_for_category(key: &str) -> Option<FactKind> {
    let tokens: Vec<&str> = key.split_whitespace().collect();
    if tokens.iter().any(|t| *t == "pep" || *t == "peps")
        || key.contains("politicamente expost")
        || key.contains("politically exposed")
    {
        return Some(FactKind::Pep);
    }
    if tokens
        .iter()
        .any(|t| t.starts_with("sanc") || t.starts_with("sanction") || *t == "ofac")
    {
        return Some(FactKind::Sanction);
    }
    None
}

pub struct ExtractorRegistry {
    site_specific: HashMap<String, (FactKind, Arc<dyn Extractor>)>,
    html: Arc<dyn Extractor>,
    csv: Arc<dyn Extractor>,
    text: Arc<dyn Extractor>,
}

impl ExtractorRegistry {
    pub fn with_defaults() -> Self {
        let mut registry = Self {
            site_specific: HashMap::new(),
            html: Arc::new(HtmlListExtractor),
            csv: Arc::new(CsvExtractor),
            text: Arc::new(TextLinesExtractor),
        };
        let governo: Arc<dyn Extractor> = Arc::new(GovernoMinistroExtractor);
        registry.register("governo_ministro", FactKind::Pep, governo.clone());
        registry.register("governo.gov.ao", FactKind::Pep, governo);
        registry
    }

    pub fn register(&mut self, category: &str, kind: FactKind, extractor: Arc<dyn Extractor>) {
        self.site_specific
            .insert(normalize_name(category), (kind, extractor));
    }

    /// Picks the extractor for a source: site-specific categories first, then
    /// the generic extractor for the document format with the kind the
    /// category names.
    pub fn resolve(
        &self,
        category: &str,
        format: DocumentFormat,
    ) -> Result<(FactKind, Arc<dyn Extractor>), ExtractError> {
        let key = normalize_name(category);
        if let Some((kind, extractor)) = self.site_specific.get(&key) {
            if format == DocumentFormat::Html {
                return Ok((*kind, extractor.clone()));
            }
        }

        let kind = self
            .site_specific
            .get(&key)
            .map(|(kind, _)| *kind)
            .or_else(|| kind_for_category(&key))
            .ok_or_else(|| ExtractError::UnknownCategory(category.to_string()))?;

        let extractor = match format {
            DocumentFormat::Html => self.html.clone(),
            DocumentFormat::Csv => self.csv.clone(),
            DocumentFormat::Text => self.text.clone(),
        };
        Ok((kind, extractor))
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn site_specific_category_wins_for_html() {
        let registry = ExtractorRegistry::with_defaults();
        let (kind, extractor) = registry
            .resolve("Governo_Ministro", DocumentFormat::Html)
            .unwrap();
        assert_eq!(kind, FactKind::Pep);
        assert_eq!(extractor.name(), "governo_ministro");

        let (_, extractor) = registry.resolve("governo.gov.ao", DocumentFormat::Html).unwrap();
        assert_eq!(extractor.name(), "governo_ministro");
    }

    #[test]
    fn generic_categories_dispatch_on_format() {
        let registry = ExtractorRegistry::with_defaults();

        let (kind, extractor) = registry.resolve("PEP", DocumentFormat::Csv).unwrap();
        assert_eq!((kind, extractor.name()), (FactKind::Pep, "csv"));

        let (kind, extractor) = registry.resolve("Sanções ONU", DocumentFormat::Html).unwrap();
        assert_eq!((kind, extractor.name()), (FactKind::Sanction, "html_list"));

        let (kind, extractor) = registry.resolve("ofac_sdn", DocumentFormat::Text).unwrap();
        assert_eq!((kind, extractor.name()), (FactKind::Sanction, "text_lines"));

        let (kind, _) = registry
            .resolve("Pessoas Politicamente Expostas", DocumentFormat::Html)
            .unwrap();
        assert_eq!(kind, FactKind::Pep);
    }

    #[test]
    fn unknown_category_is_an_error() {
        let registry = ExtractorRegistry::with_defaults();
        assert!(matches!(
            registry.resolve("ESG", DocumentFormat::Html),
            Err(ExtractError::UnknownCategory(c)) if c == "ESG"
        ));
    }

    #[test]
    fn headers_are_classified_after_normalization() {
        assert_eq!(classify_header("Nome Completo"), Some(Column::Name));
        assert_eq!(classify_header("FUNÇÃO"), Some(Column::Role));
        assert_eq!(classify_header("País"), Some(Column::Jurisdiction));
        assert_eq!(classify_header("cartao_residente"), Some(Column::Identifier));
        assert_eq!(classify_header("observacoes"), None);
    }
}
