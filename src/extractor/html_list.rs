use crate::extractor::{Column, Extractor, classify_header, element_text};
use crate::fetcher::SourceDocument;
use crate::model::{Candidate, ExtractError};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

/// Generic PEP / sanctions listing page: table rows and list items that
/// look like person names.
pub struct HtmlListExtractor;

const MAX_NAME_CHARS: usize = 80;

/// 2 to 6 words, no digits, bounded length.
pub(crate) fn looks_like_name(text: &str) -> bool {
    let words = text.split_whitespace().count();
    (2..=6).contains(&words)
        && text.chars().count() <= MAX_NAME_CHARS
        && !text.chars().any(|c| c.is_ascii_digit())
        && text.chars().any(char::is_alphabetic)
}

fn selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::Html(e.to_string()))
}

struct TableLayout {
    name: usize,
    role: Option<usize>,
    jurisdiction: Option<usize>,
}

fn table_layout(table: &ElementRef<'_>, header_cells: &Selector) -> TableLayout {
    let mut layout = TableLayout {
        name: 0,
        role: None,
        jurisdiction: None,
    };
    for (idx, cell) in table.select(header_cells).enumerate() {
        match classify_header(&element_text(&cell)) {
            Some(Column::Name) => layout.name = idx,
            Some(Column::Role) => layout.role = Some(idx),
            Some(Column::Jurisdiction) => layout.jurisdiction = Some(idx),
            _ => {}
        }
    }
    layout
}

impl Extractor for HtmlListExtractor {
    fn name(&self) -> &'static str {
        "html_list"
    }

    fn extract(&self, doc: &SourceDocument) -> Result<Vec<Candidate>, ExtractError> {
        let document = Html::parse_document(&doc.body);
        let tables = selector("table")?;
        let header_cells = selector("tr th")?;
        let rows = selector("tr")?;
        let data_cells = selector("td")?;
        let items = selector("li")?;

        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for table in document.select(&tables) {
            let layout = table_layout(&table, &header_cells);
            for row in table.select(&rows) {
                let cells: Vec<String> = row.select(&data_cells).map(|c| element_text(&c)).collect();
                let Some(name) = cells.get(layout.name) else {
                    continue;
                };
                if !looks_like_name(name) || !seen.insert(name.clone()) {
                    continue;
                }
                let cell = |idx: Option<usize>| {
                    idx.and_then(|i| cells.get(i))
                        .filter(|v| !v.is_empty())
                        .cloned()
                };
                candidates.push(Candidate {
                    name: name.clone(),
                    role: cell(layout.role),
                    jurisdiction: cell(layout.jurisdiction),
                    identifiers: Vec::new(),
                });
            }
        }

        for item in document.select(&items) {
            let text = element_text(&item);
            if looks_like_name(&text) && seen.insert(text.clone()) {
                candidates.push(Candidate::named(text));
            }
        }

        Ok(candidates)
    }
}
