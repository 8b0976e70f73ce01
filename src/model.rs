// Core structs: InfoSource, Fact, screening and risk-check payloads
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Where an information source reads its document from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceOrigin {
    Url(String),
    File(PathBuf),
}

impl SourceOrigin {
    /// Path (for files) or URL path (for urls) used to guess the document format.
    pub fn locator(&self) -> String {
        match self {
            SourceOrigin::Url(url) => url.clone(),
            SourceOrigin::File(path) => path.display().to_string(),
        }
    }
}

impl fmt::Display for SourceOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.locator())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoSource {
    pub id: i64,
    pub title: String,
    pub description: String,
    /// Free-form category typed by the admin; drives extractor dispatch.
    pub category: String,
    pub origin: SourceOrigin,
    pub owner: String,
    pub validity: String,
    pub created_at: DateTime<Utc>,
}

/// Source as submitted by the API or the config file, before it gets an id.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewInfoSource {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub validity: String,
}

impl NewInfoSource {
    /// Checks the title and resolves the single origin of the source. File
    /// paths are relative to `upload_dir` and may not leave it.
    pub fn origin(&self, upload_dir: &Path) -> Result<SourceOrigin, RegistryError> {
        if self.title.trim().is_empty() {
            return Err(RegistryError::MissingTitle);
        }
        let url = self.url.as_deref().map(str::trim).filter(|u| !u.is_empty());
        let file = self.file_path.as_deref().map(str::trim).filter(|p| !p.is_empty());
        match (url, file) {
            (Some(url), None) => Ok(SourceOrigin::Url(url.to_string())),
            (None, Some(path)) => resolve_upload_path(upload_dir, path).map(SourceOrigin::File),
            (Some(_), Some(_)) => Err(RegistryError::AmbiguousOrigin),
            (None, None) => Err(RegistryError::MissingOrigin),
        }
    }
}

fn resolve_upload_path(upload_dir: &Path, path: &str) -> Result<PathBuf, RegistryError> {
    let relative = Path::new(path);
    let inside = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !inside {
        return Err(RegistryError::OutsideUploadDir(path.to_string()));
    }
    Ok(upload_dir.join(relative))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactKind {
    Pep,
    Sanction,
}

impl FactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FactKind::Pep => "pep",
            FactKind::Sanction => "sanction",
        }
    }
}

impl FromStr for FactKind {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pep" => Ok(FactKind::Pep),
            "sanction" => Ok(FactKind::Sanction),
            other => Err(StorageError::Corrupt(format!("unknown fact kind '{}'", other))),
        }
    }
}

/// A name (plus optional role/jurisdiction/identifiers) as an extractor found it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidate {
    pub name: String,
    pub role: Option<String>,
    pub jurisdiction: Option<String>,
    pub identifiers: Vec<String>,
}

impl Candidate {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// A candidate attributed to its source and kind, ready for matching.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Fact {
    pub kind: FactKind,
    pub name: String,
    pub normalized_name: String,
    pub role: Option<String>,
    pub jurisdiction: Option<String>,
    pub identifiers: Vec<String>,
    pub source_id: i64,
    pub extracted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentifierType {
    #[default]
    #[serde(rename = "NOME", alias = "NAME")]
    Name,
    #[serde(rename = "NIF")]
    Nif,
    #[serde(rename = "BI")]
    Bi,
    #[serde(rename = "PASSAPORTE", alias = "PASSPORT")]
    Passport,
    #[serde(rename = "CARTAO_RESIDENTE", alias = "RESIDENCE_CARD")]
    ResidenceCard,
}

impl IdentifierType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentifierType::Name => "NOME",
            IdentifierType::Nif => "NIF",
            IdentifierType::Bi => "BI",
            IdentifierType::Passport => "PASSAPORTE",
            IdentifierType::ResidenceCard => "CARTAO_RESIDENTE",
        }
    }

    pub fn is_name(&self) -> bool {
        matches!(self, IdentifierType::Name)
    }
}

impl FromStr for IdentifierType {
    type Err = RiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "NOME" | "NAME" => Ok(IdentifierType::Name),
            "NIF" => Ok(IdentifierType::Nif),
            "BI" => Ok(IdentifierType::Bi),
            "PASSAPORTE" | "PASSPORT" => Ok(IdentifierType::Passport),
            "CARTAO_RESIDENTE" | "RESIDENCE_CARD" => Ok(IdentifierType::ResidenceCard),
            other => Err(RiskError::UnknownIdentifierType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningQuery {
    pub identifier: String,
    #[serde(default)]
    pub identifier_type: IdentifierType,
}

/// Manual risk database row. Seed files use the Portuguese field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskRecord {
    pub id: i64,
    #[serde(rename = "nome")]
    pub name: String,
    pub nif: Option<String>,
    pub bi: Option<String>,
    #[serde(rename = "passaporte")]
    pub passport: Option<String>,
    #[serde(rename = "cartao_residente")]
    pub residence_card: Option<String>,
    #[serde(rename = "score_final")]
    pub score: i64,
    #[serde(rename = "justificacao")]
    pub justification: String,
    pub pep_alert: bool,
    pub sanctions_alert: bool,
    #[serde(rename = "fraude_suspeita")]
    pub fraud_suspected: bool,
    #[serde(rename = "comentario_fraude")]
    pub fraud_comment: String,
    #[serde(rename = "historico_pagamentos")]
    pub payment_history: String,
    #[serde(rename = "sinistros_total")]
    pub claims_total: i64,
    #[serde(rename = "sinistros_ult_12m")]
    pub claims_last_12m: i64,
    #[serde(rename = "ramo")]
    pub line_of_business: String,
    #[serde(rename = "finalidade")]
    pub purpose: String,
    #[serde(rename = "canal")]
    pub channel: String,
    #[serde(rename = "condicoes_sugeridas")]
    pub suggested_conditions: String,
    #[serde(rename = "estado")]
    pub state: String,
}

impl Default for RiskRecord {
    fn default() -> Self {
        Self {
            id: 0,
            name: String::new(),
            nif: None,
            bi: None,
            passport: None,
            residence_card: None,
            score: 0,
            justification: String::new(),
            pep_alert: false,
            sanctions_alert: false,
            fraud_suspected: false,
            fraud_comment: String::new(),
            payment_history: String::new(),
            claims_total: 0,
            claims_last_12m: 0,
            line_of_business: String::new(),
            purpose: String::new(),
            channel: String::new(),
            suggested_conditions: String::new(),
            state: "Em análise".to_string(),
        }
    }
}

impl RiskRecord {
    /// Value of the column an identifier type looks up.
    pub fn identifier(&self, identifier_type: IdentifierType) -> Option<&str> {
        match identifier_type {
            IdentifierType::Name => Some(self.name.as_str()),
            IdentifierType::Nif => self.nif.as_deref(),
            IdentifierType::Bi => self.bi.as_deref(),
            IdentifierType::Passport => self.passport.as_deref(),
            IdentifierType::ResidenceCard => self.residence_card.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub consulta_id: String,
    pub identifier: String,
    pub identifier_type: String,
    pub decisao: String,
    pub score_final: i64,
    pub requested_by: String,
    pub fraude_suspeita: bool,
    pub sinistros_ult_12m: i64,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status} from {url}")]
    Status { url: String, status: u16 },
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported document format: {0}")]
    Unsupported(String),
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no extractor for category '{0}'")]
    UnknownCategory(String),
    #[error("missing column: {0}")]
    MissingColumn(String),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("html parse error: {0}")]
    Html(String),
}

/// Why a live scan of one source produced no facts.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("source title must not be empty")]
    MissingTitle,
    #[error("source needs either a url or a file path")]
    MissingOrigin,
    #[error("source must have a url or a file path, not both")]
    AmbiguousOrigin,
    #[error("file path '{0}' must be relative to the upload directory")]
    OutsideUploadDir(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Error)]
pub enum RiskError {
    #[error("identifier must not be empty")]
    EmptyIdentifier,
    #[error("unknown identifier type '{0}'")]
    UnknownIdentifierType(String),
    #[error("risk record {0} not found")]
    RecordNotFound(i64),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
