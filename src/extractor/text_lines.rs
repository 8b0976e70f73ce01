use crate::extractor::Extractor;
use crate::fetcher::SourceDocument;
use crate::model::{Candidate, ExtractError};
use tracing::debug;

/// Plain-text lists with one name per line. Lines starting with `#` are comments.
pub struct TextLinesExtractor;

/// Longer lines are prose, not names, and are skipped.
const MAX_LINE_CHARS: usize = 120;

impl Extractor for TextLinesExtractor {
    fn name(&self) -> &'static str {
        "text_lines"
    }

    fn extract(&self, doc: &SourceDocument) -> Result<Vec<Candidate>, ExtractError> {
        Ok(doc
            .body
            .trim_start_matches('\u{feff}')
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter(|line| {
                let fits = line.chars().count() <= MAX_LINE_CHARS;
                if !fits {
                    debug!("Skipping {}-char line, longer than {}", line.chars().count(), MAX_LINE_CHARS);
                }
                fits
            })
            .map(|line| Candidate::named(line.split_whitespace().collect::<Vec<_>>().join(" ")))
            .collect())
    }
}
