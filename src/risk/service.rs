use crate::model::{AuditEntry, ConfigError, IdentifierType, RiskError, RiskRecord, ScreeningQuery};
use crate::risk::analysis::{Analysis, AnalysisContext};
use crate::risk::decision::{RiskSignals, decide};
use crate::screening::{ScreeningReport, Screener};
use crate::storage::SqliteStorage;
use crate::utils::current_year;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

const UNKNOWN_REQUESTER: &str = "desconhecido";
const MANUAL_SELECTION: &str = "(seleccionado manualmente)";

#[derive(Debug, Clone, Deserialize)]
pub struct RiskCheckRequest {
    pub identifier: String,
    #[serde(default)]
    pub identifier_type: Option<String>,
    #[serde(default)]
    pub requested_by: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RiskConfirmRequest {
    pub match_id: i64,
    #[serde(default)]
    pub requested_by: Option<String>,
}

/// One of several records matching the same identifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchCandidate {
    pub match_id: i64,
    pub nome: String,
    pub score_final: i64,
    pub decisao: String,
    pub justificacao: String,
    pub pep_alert: bool,
    pub sanctions_alert: bool,
    pub fraude_suspeita: bool,
    pub sinistros_ult_12m: i64,
    pub estado: String,
}

impl From<&RiskRecord> for MatchCandidate {
    fn from(record: &RiskRecord) -> Self {
        Self {
            match_id: record.id,
            nome: record.name.clone(),
            score_final: record.score,
            decisao: decide(&RiskSignals::from_record(record, None)).label().to_string(),
            justificacao: record.justification.clone(),
            pep_alert: record.pep_alert,
            sanctions_alert: record.sanctions_alert,
            fraude_suspeita: record.fraud_suspected,
            sinistros_ult_12m: record.claims_last_12m,
            estado: record.state.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MultiMatch {
    pub multi_match: bool,
    pub matches: Vec<MatchCandidate>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RiskCheckOutcome {
    Analysis(Box<Analysis>),
    MultiMatch(MultiMatch),
}

/// Profile used when the manual risk database knows nothing about the subject.
pub fn default_profile() -> RiskRecord {
    RiskRecord {
        score: 25,
        justification: "Sem dados disponíveis, requer análise manual.".to_string(),
        payment_history: "Sem registo interno".to_string(),
        purpose: "Subscrição".to_string(),
        channel: "Interno".to_string(),
        ..RiskRecord::default()
    }
}

/// Reads risk records from a JSON array file.
pub fn load_seed_records(path: &str) -> Result<Vec<RiskRecord>, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_string(),
        source,
    })?;
    Ok(serde_json::from_str(&content)?)
}

pub struct RiskService {
    storage: Arc<Mutex<SqliteStorage>>,
    screener: Arc<Screener>,
}

impl RiskService {
    pub fn new(storage: Arc<Mutex<SqliteStorage>>, screener: Arc<Screener>) -> Self {
        Self { storage, screener }
    }

    /// Inserts seed records into an empty risk database; returns how many were added.
    pub async fn seed_records(&self, records: &[RiskRecord]) -> Result<usize, RiskError> {
        let storage = self.storage.lock().await;
        if storage.count_risk_records()? > 0 {
            return Ok(0);
        }
        for record in records {
            storage.insert_risk_record(record)?;
        }
        Ok(records.len())
    }

    pub async fn check(&self, request: &RiskCheckRequest) -> Result<RiskCheckOutcome, RiskError> {
        let identifier = request.identifier.trim();
        if identifier.is_empty() {
            return Err(RiskError::EmptyIdentifier);
        }
        let identifier_type: IdentifierType = match request.identifier_type.as_deref() {
            Some(raw) if !raw.trim().is_empty() => raw.parse()?,
            _ => IdentifierType::default(),
        };

        let records = self
            .storage
            .lock()
            .await
            .find_risk_matches(identifier, identifier_type)?;

        let record = match records.as_slice() {
            [] => default_profile(),
            [single] => single.clone(),
            many => {
                info!("{} records match '{}', asking for confirmation", many.len(), identifier);
                return Ok(RiskCheckOutcome::MultiMatch(MultiMatch {
                    multi_match: true,
                    matches: many.iter().map(MatchCandidate::from).collect(),
                }));
            }
        };

        // Identifier lookups that resolved to a named record screen that name.
        let query = if !identifier_type.is_name() && !record.name.trim().is_empty() {
            ScreeningQuery {
                identifier: record.name.clone(),
                identifier_type: IdentifierType::Name,
            }
        } else {
            ScreeningQuery {
                identifier: identifier.to_string(),
                identifier_type,
            }
        };
        let screening = self.screener.screen(&query, None).await?;

        let analysis = self
            .finalize(
                &record,
                identifier.to_string(),
                identifier_type.as_str().to_string(),
                request.requested_by.as_deref(),
                Some(screening),
            )
            .await?;
        Ok(RiskCheckOutcome::Analysis(Box::new(analysis)))
    }

    /// Analysis of the record an analyst picked from a multi-match.
    pub async fn confirm(&self, request: &RiskConfirmRequest) -> Result<Analysis, RiskError> {
        let record = self
            .storage
            .lock()
            .await
            .get_risk_by_id(request.match_id)?
            .ok_or(RiskError::RecordNotFound(request.match_id))?;

        let screening: Option<ScreeningReport> = if record.name.trim().is_empty() {
            None
        } else {
            let query = ScreeningQuery {
                identifier: record.name.clone(),
                identifier_type: IdentifierType::Name,
            };
            Some(self.screener.screen(&query, None).await?)
        };

        self.finalize(
            &record,
            MANUAL_SELECTION.to_string(),
            "MULTI".to_string(),
            request.requested_by.as_deref(),
            screening,
        )
        .await
    }

    /// Numbers, hashes, stores and audits an analysis.
    async fn finalize(
        &self,
        record: &RiskRecord,
        identifier: String,
        identifier_type: String,
        requested_by: Option<&str>,
        screening: Option<ScreeningReport>,
    ) -> Result<Analysis, RiskError> {
        let storage = self.storage.lock().await;
        let context = AnalysisContext {
            consulta_id: storage.next_consulta_id(current_year())?,
            timestamp: Utc::now(),
            identifier,
            identifier_type,
            requested_by: requested_by
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .unwrap_or(UNKNOWN_REQUESTER)
                .to_string(),
        };
        let analysis = Analysis::build(record, context, screening)
            .map_err(|e| RiskError::Storage(e.into()))?;

        storage.save_analysis(&analysis)?;
        storage.add_audit(&AuditEntry {
            id: 0,
            timestamp: analysis.timestamp,
            consulta_id: analysis.consulta_id.clone(),
            identifier: analysis.identifier.clone(),
            identifier_type: analysis.identifier_type.clone(),
            decisao: analysis.decisao.clone(),
            score_final: analysis.score_final,
            requested_by: analysis.requested_by.clone(),
            fraude_suspeita: analysis.fraude_suspeita,
            sinistros_ult_12m: analysis.sinistros_ult_12m,
        })?;

        info!(
            "Analysis {} for '{}': {} (score {})",
            analysis.consulta_id, analysis.identifier, analysis.decisao, analysis.score_final
        );
        Ok(analysis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screening::report::ScreeningStatus;
    use crate::screening::tests::{MINISTERS_PAGE, MINISTERS_URL, StubFetcher, screener, storage};
    use crate::model::NewInfoSource;
    use tempfile::TempDir;

    async fn service() -> (TempDir, Arc<Mutex<SqliteStorage>>, RiskService) {
        let (dir, storage) = storage();
        storage
            .lock()
            .await
            .add_source(
                &NewInfoSource {
                    title: "Governo".into(),
                    category: "governo_ministro".into(),
                    url: Some(MINISTERS_URL.into()),
                    ..Default::default()
                },
                dir.path(),
            )
            .unwrap();
        let fetcher = Arc::new(StubFetcher::default().with_page(MINISTERS_URL, MINISTERS_PAGE));
        let screener = Arc::new(screener(fetcher, storage.clone()));
        let service = RiskService::new(storage.clone(), screener);
        (dir, storage, service)
    }

    fn request(identifier: &str, identifier_type: &str) -> RiskCheckRequest {
        RiskCheckRequest {
            identifier: identifier.into(),
            identifier_type: Some(identifier_type.into()),
            requested_by: Some("analista@cir.ao".into()),
        }
    }

    fn expect_analysis(outcome: RiskCheckOutcome) -> Analysis {
        match outcome {
            RiskCheckOutcome::Analysis(analysis) => *analysis,
            RiskCheckOutcome::MultiMatch(_) => panic!("expected a single analysis"),
        }
    }

    #[tokio::test]
    async fn unknown_subject_gets_the_default_profile() {
        let (_dir, storage, service) = service().await;
        let analysis = expect_analysis(service.check(&request("Pedro Ninguém", "nome")).await.unwrap());

        assert_eq!(analysis.score_final, 25);
        assert_eq!(analysis.decisao, "Escalar / Risco Elevado");
        assert_eq!(analysis.justificacao, "Sem dados disponíveis, requer análise manual.");
        assert_eq!(analysis.finalidade, "Subscrição");
        assert_eq!(analysis.identifier_type, "NOME");
        assert!(analysis.consulta_id.starts_with("CIR-"));
        assert!(analysis.consulta_id.ends_with("-000001"));
        assert!(analysis.verify_integrity());
        assert_eq!(
            analysis.screening.as_ref().map(|s| s.status),
            Some(ScreeningStatus::NoMatch)
        );

        let storage = storage.lock().await;
        let stored = storage.get_analysis(&analysis.consulta_id).unwrap().unwrap();
        assert_eq!(stored, analysis);
        let audit = storage.list_audit(10).unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].requested_by, "analista@cir.ao");
    }

    #[tokio::test]
    async fn nif_lookup_screens_the_record_name_and_raises_pep() {
        let (_dir, _storage, service) = service().await;
        service
            .seed_records(&[RiskRecord {
                name: "Vera Daves de Sousa".into(),
                nif: Some("5417000111".into()),
                score: 90,
                ..Default::default()
            }])
            .await
            .unwrap();

        let analysis = expect_analysis(service.check(&request(" 5417000111 ", "NIF")).await.unwrap());
        assert_eq!(analysis.identifier, "5417000111");
        assert!(analysis.pep_alert);
        assert_eq!(analysis.decisao, "Escalar / Risco Elevado");
        assert_eq!(analysis.regras_aplicadas, vec!["PEP detectado (+40 risco)"]);
    }

    #[tokio::test]
    async fn several_records_need_confirmation() {
        let (_dir, _storage, service) = service().await;
        let twin = RiskRecord {
            name: "Ana Silva".into(),
            score: 82,
            ..Default::default()
        };
        let added = service
            .seed_records(&[twin.clone(), RiskRecord { score: 61, ..twin }])
            .await
            .unwrap();
        assert_eq!(added, 2);
        assert_eq!(service.seed_records(&[RiskRecord::default()]).await.unwrap(), 0);

        let outcome = service.check(&request("ANA SILVA", "NOME")).await.unwrap();
        let RiskCheckOutcome::MultiMatch(multi) = outcome else {
            panic!("expected multi match");
        };
        assert!(multi.multi_match);
        assert_eq!(multi.matches.len(), 2);
        assert_eq!(multi.matches[1].decisao, "Aceitar c/ Condições");

        let analysis = service
            .confirm(&RiskConfirmRequest {
                match_id: multi.matches[0].match_id,
                requested_by: None,
            })
            .await
            .unwrap();
        assert_eq!(analysis.identifier, "(seleccionado manualmente)");
        assert_eq!(analysis.identifier_type, "MULTI");
        assert_eq!(analysis.requested_by, "desconhecido");
        assert_eq!(analysis.decisao, "Aceitar");
    }

    #[tokio::test]
    async fn invalid_requests_are_rejected() {
        let (_dir, _storage, service) = service().await;
        assert!(matches!(
            service.check(&request("  ", "NIF")).await,
            Err(RiskError::EmptyIdentifier)
        ));
        assert!(matches!(
            service.check(&request("x", "EMAIL")).await,
            Err(RiskError::UnknownIdentifierType(_))
        ));
        assert!(matches!(
            service
                .confirm(&RiskConfirmRequest {
                    match_id: 404,
                    requested_by: None
                })
                .await,
            Err(RiskError::RecordNotFound(404))
        ));
    }

    #[test]
    fn seed_file_uses_portuguese_field_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("risk.json");
        std::fs::write(
            &path,
            r#"[{"nome": "Ana Silva", "nif": "123", "score_final": 70, "fraude_suspeita": true}]"#,
        )
        .unwrap();
        let records = load_seed_records(path.to_str().unwrap()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Ana Silva");
        assert!(records[0].fraud_suspected);
        assert_eq!(records[0].state, "Em análise");
    }
}
