// Result assembly: status, reason and PEP / sanctions flags of a screening.
use crate::matcher::{MatchMode, NameMatcher, PreparedQuery};
use crate::model::{Fact, FactKind, IdentifierType, InfoSource, ScreeningQuery};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreeningStatus {
    Ok,
    NoMatch,
    NoData,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ScanOutcome {
    Live,
    /// Live scan failed; facts come from the last successful scan.
    Cached { extracted_at: DateTime<Utc>, reason: String },
    Failed { reason: String },
}

/// A source after one scan, with the facts it contributes to matching.
#[derive(Debug, Clone)]
pub struct SourceScan {
    pub source: InfoSource,
    pub outcome: ScanOutcome,
    pub facts: Vec<Fact>,
}

impl SourceScan {
    pub fn failed(&self) -> bool {
        matches!(self.outcome, ScanOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchHit {
    pub candidate: String,
    pub normalized: String,
    pub score: f64,
    pub exact: bool,
    pub source_id: i64,
    pub source_title: String,
    pub source_origin: String,
    pub role: Option<String>,
    pub jurisdiction: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskFlag {
    pub hit: bool,
    pub matches: Vec<MatchHit>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSummary {
    pub source_id: i64,
    pub title: String,
    pub category: String,
    pub origin: String,
    pub outcome: ScanOutcome,
    pub fact_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningReport {
    pub query: String,
    pub identifier_type: IdentifierType,
    pub normalized_query: String,
    pub status: ScreeningStatus,
    pub reason: String,
    pub pep: RiskFlag,
    pub sanctions: RiskFlag,
    pub sources: Vec<SourceSummary>,
    pub threshold: f64,
    pub mode: MatchMode,
    pub checked_at: DateTime<Utc>,
}

fn summarize(scan: &SourceScan) -> SourceSummary {
    SourceSummary {
        source_id: scan.source.id,
        title: scan.source.title.clone(),
        category: scan.source.category.clone(),
        origin: scan.source.origin.to_string(),
        outcome: scan.outcome.clone(),
        fact_count: scan.facts.len(),
    }
}

/// Matches the query against every scanned fact and decides the status.
pub fn assemble(
    query: &ScreeningQuery,
    matcher: &NameMatcher,
    scans: &[SourceScan],
    checked_at: DateTime<Utc>,
) -> ScreeningReport {
    let prepared = PreparedQuery::new(&query.identifier, query.identifier_type);
    let mut report = ScreeningReport {
        query: query.identifier.clone(),
        identifier_type: query.identifier_type,
        normalized_query: prepared.as_str().to_string(),
        status: ScreeningStatus::Error,
        reason: String::new(),
        pep: RiskFlag::default(),
        sanctions: RiskFlag::default(),
        sources: scans.iter().map(summarize).collect(),
        threshold: matcher.threshold(),
        mode: matcher.mode(),
        checked_at,
    };

    if prepared.is_empty() {
        report.reason = "query is empty after normalization".to_string();
        return report;
    }
    if scans.is_empty() {
        report.status = ScreeningStatus::NoData;
        report.reason = "no information sources configured".to_string();
        return report;
    }
    if scans.iter().all(SourceScan::failed) {
        report.reason = format!("all {} sources failed and none has cached facts", scans.len());
        return report;
    }

    let fact_count: usize = scans.iter().map(|s| s.facts.len()).sum();
    let usable = scans.iter().filter(|s| !s.failed()).count();
    if fact_count == 0 {
        report.status = ScreeningStatus::NoData;
        report.reason = format!("{} sources scanned, no candidate facts extracted", usable);
        return report;
    }

    for scan in scans {
        for scored in matcher.find_matches(&prepared, &scan.facts) {
            let hit = MatchHit {
                candidate: scored.fact.name.clone(),
                normalized: scored.fact.normalized_name.clone(),
                score: (scored.score * 100.0).round() / 100.0,
                exact: scored.exact,
                source_id: scan.source.id,
                source_title: scan.source.title.clone(),
                source_origin: scan.source.origin.to_string(),
                role: scored.fact.role.clone(),
                jurisdiction: scored.fact.jurisdiction.clone(),
            };
            match scored.fact.kind {
                FactKind::Pep => report.pep.matches.push(hit),
                FactKind::Sanction => report.sanctions.matches.push(hit),
            }
        }
    }

    for flag in [&mut report.pep, &mut report.sanctions] {
        flag.matches
            .sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        flag.hit = !flag.matches.is_empty();
    }

    let top = report
        .pep
        .matches
        .iter()
        .chain(report.sanctions.matches.iter())
        .max_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal));

    match top {
        Some(top) => {
            let total = report.pep.matches.len() + report.sanctions.matches.len();
            report.status = ScreeningStatus::Ok;
            report.reason = format!(
                "{} match(es) among {} facts from {} sources; best '{}' ({:.1}) from '{}'",
                total, fact_count, usable, top.candidate, top.score, top.source_title
            );
        }
        None => {
            report.status = ScreeningStatus::NoMatch;
            report.reason = format!(
                "no candidate among {} facts from {} sources reached {:.0}",
                fact_count,
                usable,
                matcher.threshold()
            );
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchConfig;
    use crate::model::SourceOrigin;
    use crate::normalizer::normalize_name;

    fn source(id: i64, title: &str) -> InfoSource {
        InfoSource {
            id,
            title: title.to_string(),
            description: String::new(),
            category: "pep".to_string(),
            origin: SourceOrigin::Url(format!("https://example.org/{}", id)),
            owner: String::new(),
            validity: String::new(),
            created_at: Utc::now(),
        }
    }

    fn fact(kind: FactKind, name: &str, source_id: i64) -> Fact {
        Fact {
            kind,
            name: name.to_string(),
            normalized_name: normalize_name(name),
            role: None,
            jurisdiction: Some("AO".to_string()),
            identifiers: Vec::new(),
            source_id,
            extracted_at: Utc::now(),
        }
    }

    fn scan(id: i64, outcome: ScanOutcome, facts: Vec<Fact>) -> SourceScan {
        SourceScan {
            source: source(id, &format!("Fonte {}", id)),
            outcome,
            facts,
        }
    }

    fn failed() -> ScanOutcome {
        ScanOutcome::Failed {
            reason: "timeout".to_string(),
        }
    }

    fn query(name: &str) -> ScreeningQuery {
        ScreeningQuery {
            identifier: name.to_string(),
            identifier_type: IdentifierType::Name,
        }
    }

    fn matcher() -> NameMatcher {
        NameMatcher::new(&MatchConfig::default())
    }

    #[test]
    fn empty_query_is_an_error() {
        let scans = vec![scan(1, ScanOutcome::Live, vec![fact(FactKind::Pep, "Ana Silva", 1)])];
        let report = assemble(&query(" !! "), &matcher(), &scans, Utc::now());
        assert_eq!(report.status, ScreeningStatus::Error);
        assert!(!report.pep.hit);
    }

    #[test]
    fn no_sources_and_no_facts_are_no_data() {
        let report = assemble(&query("Ana Silva"), &matcher(), &[], Utc::now());
        assert_eq!(report.status, ScreeningStatus::NoData);

        let scans = vec![scan(1, ScanOutcome::Live, vec![]), scan(2, failed(), vec![])];
        let report = assemble(&query("Ana Silva"), &matcher(), &scans, Utc::now());
        assert_eq!(report.status, ScreeningStatus::NoData);
        assert_eq!(report.sources.len(), 2);
    }

    #[test]
    fn all_sources_failing_is_an_error() {
        let scans = vec![scan(1, failed(), vec![]), scan(2, failed(), vec![])];
        let report = assemble(&query("Ana Silva"), &matcher(), &scans, Utc::now());
        assert_eq!(report.status, ScreeningStatus::Error);
        assert!(report.reason.contains("all 2 sources failed"));
    }

    #[test]
    fn matches_are_split_by_kind_and_sorted() {
        let scans = vec![
            scan(
                1,
                ScanOutcome::Live,
                vec![
                    fact(FactKind::Pep, "Ana Maria Silva", 1),
                    fact(FactKind::Pep, "Rui Costa", 1),
                ],
            ),
            scan(
                2,
                ScanOutcome::Cached {
                    extracted_at: Utc::now(),
                    reason: "timeout".to_string(),
                },
                vec![fact(FactKind::Sanction, "ANA SILVA", 2)],
            ),
            scan(3, failed(), vec![]),
        ];
        let report = assemble(&query("Ana Silva"), &matcher(), &scans, Utc::now());

        assert_eq!(report.status, ScreeningStatus::Ok);
        assert!(report.pep.hit);
        assert!(report.sanctions.hit);
        assert_eq!(report.pep.matches.len(), 1);
        assert_eq!(report.pep.matches[0].candidate, "Ana Maria Silva");
        assert!(report.sanctions.matches[0].exact);
        assert_eq!(report.sanctions.matches[0].source_title, "Fonte 2");
        assert_eq!(report.sanctions.matches[0].jurisdiction.as_deref(), Some("AO"));
        assert!(report.reason.contains("best 'ANA SILVA'"));
        assert_eq!(report.sources[2].fact_count, 0);
    }

    #[test]
    fn facts_below_threshold_are_no_match() {
        let scans = vec![scan(1, ScanOutcome::Live, vec![fact(FactKind::Pep, "Rui Costa", 1)])];
        let report = assemble(&query("Ana Silva"), &matcher(), &scans, Utc::now());
        assert_eq!(report.status, ScreeningStatus::NoMatch);
        assert!(!report.pep.hit && !report.sanctions.hit);
        assert!(report.reason.contains("reached 88"));
    }

    #[test]
    fn report_serializes_status_in_snake_case() {
        let report = assemble(&query("Ana Silva"), &matcher(), &[], Utc::now());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "no_data");
        assert_eq!(json["identifier_type"], "NOME");
        assert_eq!(json["mode"], "fuzzy");
    }
}
