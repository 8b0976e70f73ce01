// governo.gov.ao ministers page
use crate::extractor::{Extractor, element_text};
use crate::fetcher::SourceDocument;
use crate::model::{Candidate, ExtractError};
use scraper::{Html, Selector};
use std::collections::BTreeSet;

/// Pulls minister names from the Angolan government's ministers listing:
/// links to profile pages and card headings.
pub struct GovernoMinistroExtractor;

const PROFILE_PATHS: &[&str] = &["/ministr", "/perfil"];

impl Extractor for GovernoMinistroExtractor {
    fn name(&self) -> &'static str {
        "governo_ministro"
    }

    fn extract(&self, doc: &SourceDocument) -> Result<Vec<Candidate>, ExtractError> {
        let document = Html::parse_document(&doc.body);
        let anchor_selector =
            Selector::parse("a[href]").map_err(|e| ExtractError::Html(e.to_string()))?;
        let heading_selector =
            Selector::parse("h2, h3, h4").map_err(|e| ExtractError::Html(e.to_string()))?;

        let mut names = BTreeSet::new();

        for anchor in document.select(&anchor_selector) {
            let href = anchor.value().attr("href").unwrap_or("").to_lowercase();
            let text = element_text(&anchor);
            if text.is_empty() {
                continue;
            }
            if PROFILE_PATHS.iter().any(|p| href.contains(p)) {
                names.insert(text);
            }
        }

        // Card headings; names are often in upper case, both are accepted.
        for heading in document.select(&heading_selector) {
            let text = element_text(&heading);
            if text.split_whitespace().count() >= 2 {
                names.insert(text);
            }
        }

        Ok(names
            .into_iter()
            .map(|name| Candidate {
                name,
                jurisdiction: Some("AO".to_string()),
                ..Candidate::default()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::DocumentFormat;

    const PAGE: &str = r#"
        <html><body>
          <nav><a href="/contactos">Contactos</a><a href="/ministros">Ministros</a></nav>
          <div class="card">
            <h3>JOÃO   MANUEL GONÇALVES LOURENÇO</h3>
            <a href="/ministro/educacao">Luísa Maria Alves Grilo</a>
          </div>
          <div class="card">
            <h4>Ministério</h4>
            <a href="/perfil/42"> Adão Francisco Correia de Almeida </a>
            <a href="/ministro/vazio">   </a>
          </div>
          <h2>Adão Francisco Correia de Almeida</h2>
        </body></html>
    "#;

    #[test]
    fn extracts_profile_links_and_headings() {
        let doc = SourceDocument {
            body: PAGE.to_string(),
            format: DocumentFormat::Html,
        };
        let candidates = GovernoMinistroExtractor.extract(&doc).unwrap();
        let names: Vec<&str> = candidates.iter().map(|c| c.name.as_str()).collect();

        assert_eq!(
            names,
            vec![
                "Adão Francisco Correia de Almeida",
                "JOÃO MANUEL GONÇALVES LOURENÇO",
                "Luísa Maria Alves Grilo",
                "Ministros",
            ]
        );
        assert!(candidates.iter().all(|c| c.jurisdiction.as_deref() == Some("AO")));
    }
}
