use crate::model::RiskRecord;
use crate::screening::ScreeningReport;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Decision {
    Accept,
    AcceptWithConditions,
    Escalate,
}

impl Decision {
    pub fn label(&self) -> &'static str {
        match self {
            Decision::Accept => "Aceitar",
            Decision::AcceptWithConditions => "Aceitar c/ Condições",
            Decision::Escalate => "Escalar / Risco Elevado",
        }
    }
}

/// Inputs of the decision: the record's own flags merged with screening hits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RiskSignals {
    pub score: i64,
    pub pep: bool,
    pub sanctions: bool,
    pub fraud: bool,
    pub claims_last_12m: i64,
}

impl RiskSignals {
    pub fn from_record(record: &RiskRecord, screening: Option<&ScreeningReport>) -> Self {
        Self {
            score: record.score,
            pep: record.pep_alert || screening.is_some_and(|r| r.pep.hit),
            sanctions: record.sanctions_alert || screening.is_some_and(|r| r.sanctions.hit),
            fraud: record.fraud_suspected,
            claims_last_12m: record.claims_last_12m,
        }
    }

    fn alert(&self) -> bool {
        self.pep || self.sanctions || self.fraud
    }
}

pub fn decide(signals: &RiskSignals) -> Decision {
    if signals.alert() {
        Decision::Escalate
    } else if signals.score >= 80 {
        Decision::Accept
    } else if signals.score >= 60 {
        Decision::AcceptWithConditions
    } else {
        Decision::Escalate
    }
}

pub fn applied_rules(signals: &RiskSignals) -> Vec<String> {
    let mut rules = Vec::new();
    if signals.pep {
        rules.push("PEP detectado (+40 risco)".to_string());
    }
    if signals.sanctions {
        rules.push("Listas de sanções (+40 risco)".to_string());
    }
    if signals.fraud {
        rules.push("Suspeita de fraude → Escalar".to_string());
    }
    if signals.claims_last_12m >= 2 {
        rules.push(">=2 sinistros nos últimos 12m (+20 risco)".to_string());
    }
    rules
}
