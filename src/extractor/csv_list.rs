use crate::extractor::{Column, Extractor, classify_header};
use crate::fetcher::SourceDocument;
use crate::model::{Candidate, ExtractError};
use csv::{ReaderBuilder, Trim};

/// Uploaded PEP / sanctions spreadsheets exported as CSV.
pub struct CsvExtractor;

/// Picks `;`, tab or `,` depending on which appears most in the header line.
fn sniff_delimiter(body: &str) -> u8 {
    let header = body.lines().next().unwrap_or_default();
    [b';', b'\t', b',']
        .into_iter()
        .map(|d| (d, header.bytes().filter(|b| *b == d).count()))
        .max_by_key(|(_, count)| *count)
        .filter(|(_, count)| *count > 0)
        .map(|(d, _)| d)
        .unwrap_or(b',')
}

impl Extractor for CsvExtractor {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn extract(&self, doc: &SourceDocument) -> Result<Vec<Candidate>, ExtractError> {
        let body = doc.body.trim_start_matches('\u{feff}');
        let mut reader = ReaderBuilder::new()
            .delimiter(sniff_delimiter(body))
            .flexible(true)
            .trim(Trim::All)
            .from_reader(body.as_bytes());

        let columns: Vec<Option<Column>> = reader.headers()?.iter().map(classify_header).collect();
        let name_idx = columns
            .iter()
            .position(|c| *c == Some(Column::Name))
            .ok_or_else(|| ExtractError::MissingColumn("name".to_string()))?;
        let role_idx = columns.iter().position(|c| *c == Some(Column::Role));
        let jurisdiction_idx = columns.iter().position(|c| *c == Some(Column::Jurisdiction));

        let mut candidates = Vec::new();
        for record in reader.records() {
            let record = record?;
            let name = record.get(name_idx).unwrap_or_default();
            if name.is_empty() {
                continue;
            }
            let field = |idx: Option<usize>| {
                idx.and_then(|i| record.get(i))
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
            };
            let identifiers = columns
                .iter()
                .enumerate()
                .filter(|(_, c)| **c == Some(Column::Identifier))
                .filter_map(|(i, _)| record.get(i))
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect();

            candidates.push(Candidate {
                name: name.to_string(),
                role: field(role_idx),
                jurisdiction: field(jurisdiction_idx),
                identifiers,
            });
        }

        Ok(candidates)
    }
}
