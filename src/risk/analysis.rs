// Analysis document returned by risk checks and stored by consulta id.
use crate::model::RiskRecord;
use crate::risk::decision::{Decision, RiskSignals, applied_rules, decide};
use crate::screening::ScreeningReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const ENGINE_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub consulta_id: String,
    pub timestamp: DateTime<Utc>,
    pub identifier: String,
    pub identifier_type: String,
    pub score_final: i64,
    pub decisao: String,
    pub justificacao: String,
    pub ramo: String,
    pub finalidade: String,
    pub canal: String,
    pub sanctions_alert: bool,
    pub pep_alert: bool,
    pub fraude_suspeita: bool,
    pub comentario_fraude: String,
    pub historico_pagamentos: String,
    pub sinistros_total: i64,
    pub sinistros_ult_12m: i64,
    pub condicoes_sugeridas: String,
    pub estado: String,
    pub regras_aplicadas: Vec<String>,
    pub decisao_humana: String,
    pub data_decisao: String,
    pub requested_by: String,
    pub motor_versao: String,
    pub screening: Option<ScreeningReport>,
    #[serde(default)]
    pub integridade_hash: String,
}

/// Who asked for what; the record and screening supply the rest.
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    pub consulta_id: String,
    pub timestamp: DateTime<Utc>,
    pub identifier: String,
    pub identifier_type: String,
    pub requested_by: String,
}

impl Analysis {
    pub fn build(
        record: &RiskRecord,
        context: AnalysisContext,
        screening: Option<ScreeningReport>,
    ) -> Result<Self, serde_json::Error> {
        let signals = RiskSignals::from_record(record, screening.as_ref());
        let decision = decide(&signals);
        let justification = if record.justification.trim().is_empty() {
            "Sem justificação.".to_string()
        } else {
            record.justification.clone()
        };

        let mut analysis = Self {
            consulta_id: context.consulta_id,
            timestamp: context.timestamp,
            identifier: context.identifier,
            identifier_type: context.identifier_type,
            score_final: record.score,
            decisao: decision.label().to_string(),
            justificacao: justification,
            ramo: record.line_of_business.clone(),
            finalidade: record.purpose.clone(),
            canal: record.channel.clone(),
            sanctions_alert: signals.sanctions,
            pep_alert: signals.pep,
            fraude_suspeita: signals.fraud,
            comentario_fraude: record.fraud_comment.clone(),
            historico_pagamentos: record.payment_history.clone(),
            sinistros_total: record.claims_total,
            sinistros_ult_12m: record.claims_last_12m,
            condicoes_sugeridas: if decision == Decision::AcceptWithConditions {
                record.suggested_conditions.clone()
            } else {
                String::new()
            },
            estado: record.state.clone(),
            regras_aplicadas: applied_rules(&signals),
            decisao_humana: String::new(),
            data_decisao: String::new(),
            requested_by: context.requested_by,
            motor_versao: ENGINE_VERSION.to_string(),
            screening,
            integridade_hash: String::new(),
        };
        analysis.integridade_hash = analysis.integrity_hash()?;
        Ok(analysis)
    }

    /// SHA-256 hex of the analysis serialized with sorted keys, hash field excluded.
    pub fn integrity_hash(&self) -> Result<String, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        if let Some(object) = value.as_object_mut() {
            object.remove("integridade_hash");
        }
        let canonical = serde_json::to_string(&value)?;
        Ok(hex::encode(Sha256::digest(canonical.as_bytes())))
    }

    pub fn verify_integrity(&self) -> bool {
        self.integrity_hash()
            .is_ok_and(|hash| hash == self.integridade_hash)
    }
}
