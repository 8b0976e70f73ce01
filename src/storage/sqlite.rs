use crate::model::{
    AuditEntry, Fact, FactKind, IdentifierType, InfoSource, NewInfoSource, RegistryError,
    RiskRecord, SourceOrigin, StorageError,
};
use crate::risk::Analysis;
use crate::utils::{format_consulta_id, parse_datetime};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::{Path, PathBuf};

pub struct SqliteStorage {
    conn: Connection,
}

const SOURCE_COLUMNS: &str =
    "id, title, description, category, url, file_path, owner, validity, created_at";

const RISK_COLUMNS: &str = "id, name, nif, bi, passport, residence_card, score, justification,
     pep_alert, sanctions_alert, fraud_suspected, fraud_comment, payment_history,
     claims_total, claims_last_12m, line_of_business, purpose, channel,
     suggested_conditions, state";

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

fn timestamp_at(row: &Row, idx: usize) -> Result<DateTime<Utc>, rusqlite::Error> {
    let raw: String = row.get(idx)?;
    parse_datetime(&raw).ok_or_else(|| conversion_error(idx, format!("invalid timestamp '{}'", raw)))
}

impl SqliteStorage {
    /// Opens the database and creates the schema if needed.
    pub fn new(db_path: &str) -> Result<Self, StorageError> {
        let conn = Connection::open(db_path)?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS info_sources (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                category TEXT NOT NULL,
                url TEXT,
                file_path TEXT,
                owner TEXT NOT NULL DEFAULT '',
                validity TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS facts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source_id INTEGER NOT NULL,
                kind TEXT NOT NULL,
                name TEXT NOT NULL,
                normalized_name TEXT NOT NULL,
                role TEXT,
                jurisdiction TEXT,
                identifiers TEXT NOT NULL DEFAULT '[]',
                extracted_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_facts_source ON facts(source_id);

            CREATE TABLE IF NOT EXISTS risk_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                nif TEXT,
                bi TEXT,
                passport TEXT,
                residence_card TEXT,
                score INTEGER NOT NULL DEFAULT 0,
                justification TEXT NOT NULL DEFAULT '',
                pep_alert INTEGER NOT NULL DEFAULT 0,
                sanctions_alert INTEGER NOT NULL DEFAULT 0,
                fraud_suspected INTEGER NOT NULL DEFAULT 0,
                fraud_comment TEXT NOT NULL DEFAULT '',
                payment_history TEXT NOT NULL DEFAULT '',
                claims_total INTEGER NOT NULL DEFAULT 0,
                claims_last_12m INTEGER NOT NULL DEFAULT 0,
                line_of_business TEXT NOT NULL DEFAULT '',
                purpose TEXT NOT NULL DEFAULT '',
                channel TEXT NOT NULL DEFAULT '',
                suggested_conditions TEXT NOT NULL DEFAULT '',
                state TEXT NOT NULL DEFAULT 'Em análise'
            );

            CREATE TABLE IF NOT EXISTS analyses (
                consulta_id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL,
                identifier TEXT NOT NULL,
                body TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                consulta_id TEXT NOT NULL,
                identifier TEXT NOT NULL,
                identifier_type TEXT NOT NULL,
                decision TEXT NOT NULL,
                score INTEGER NOT NULL,
                requested_by TEXT NOT NULL,
                fraud_suspected INTEGER NOT NULL DEFAULT 0,
                claims_last_12m INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS consulta_seq (
                year INTEGER PRIMARY KEY,
                seq INTEGER NOT NULL
            );
            ",
        )?;

        Ok(Self { conn })
    }

    // --- information sources ---

    /// Validates and inserts a new source, returning the stored row.
    /// Stores a new source; file paths resolve under `upload_dir`.
    pub fn add_source(
        &self,
        source: &NewInfoSource,
        upload_dir: &Path,
    ) -> Result<InfoSource, RegistryError> {
        let origin = source.origin(upload_dir)?;
        let (url, file_path) = match &origin {
            SourceOrigin::Url(url) => (Some(url.clone()), None),
            SourceOrigin::File(path) => (None, Some(path.display().to_string())),
        };
        let created_at = Utc::now();

        self.conn
            .execute(
                "INSERT INTO info_sources (title, description, category, url, file_path, owner, validity, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    source.title.trim(),
                    &source.description,
                    source.category.trim(),
                    url,
                    file_path,
                    &source.owner,
                    &source.validity,
                    created_at.to_rfc3339(),
                ],
            )
            .map_err(StorageError::from)?;

        Ok(InfoSource {
            id: self.conn.last_insert_rowid(),
            title: source.title.trim().to_string(),
            description: source.description.clone(),
            category: source.category.trim().to_string(),
            origin,
            owner: source.owner.clone(),
            validity: source.validity.clone(),
            created_at,
        })
    }

    pub fn list_sources(&self) -> Result<Vec<InfoSource>, StorageError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM info_sources ORDER BY id ASC", SOURCE_COLUMNS))?;
        let rows = stmt.query_map([], Self::map_source)?;

        let mut sources = Vec::new();
        for source in rows {
            sources.push(source?);
        }
        Ok(sources)
    }

    pub fn get_source(&self, id: i64) -> Result<Option<InfoSource>, StorageError> {
        let source = self
            .conn
            .query_row(
                &format!("SELECT {} FROM info_sources WHERE id = ?1", SOURCE_COLUMNS),
                params![id],
                Self::map_source,
            )
            .optional()?;
        Ok(source)
    }

    pub fn source_exists_by_title(&self, title: &str) -> Result<bool, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT 1 FROM info_sources WHERE title = ?1")?;
        let mut rows = stmt.query(params![title.trim()])?;
        Ok(rows.next()?.is_some())
    }

    // --- fact cache ---

    /// Replaces the cached facts of a source with the facts of its latest scan.
    pub fn replace_facts(&self, source_id: i64, facts: &[Fact]) -> Result<(), StorageError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM facts WHERE source_id = ?1", params![source_id])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO facts (source_id, kind, name, normalized_name, role, jurisdiction, identifiers, extracted_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for fact in facts {
                stmt.execute(params![
                    source_id,
                    fact.kind.as_str(),
                    &fact.name,
                    &fact.normalized_name,
                    &fact.role,
                    &fact.jurisdiction,
                    serde_json::to_string(&fact.identifiers)?,
                    fact.extracted_at.to_rfc3339(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn cached_facts(&self, source_id: i64) -> Result<Vec<Fact>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT source_id, kind, name, normalized_name, role, jurisdiction, identifiers, extracted_at
             FROM facts WHERE source_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![source_id], Self::map_fact)?;

        let mut facts = Vec::new();
        for fact in rows {
            facts.push(fact?);
        }
        Ok(facts)
    }

    // --- risk records ---

    pub fn insert_risk_record(&self, record: &RiskRecord) -> Result<i64, StorageError> {
        self.conn.execute(
            "INSERT INTO risk_records (
                name, nif, bi, passport, residence_card, score, justification,
                pep_alert, sanctions_alert, fraud_suspected, fraud_comment, payment_history,
                claims_total, claims_last_12m, line_of_business, purpose, channel,
                suggested_conditions, state
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
            params![
                &record.name,
                &record.nif,
                &record.bi,
                &record.passport,
                &record.residence_card,
                record.score,
                &record.justification,
                record.pep_alert,
                record.sanctions_alert,
                record.fraud_suspected,
                &record.fraud_comment,
                &record.payment_history,
                record.claims_total,
                record.claims_last_12m,
                &record.line_of_business,
                &record.purpose,
                &record.channel,
                &record.suggested_conditions,
                &record.state,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn count_risk_records(&self) -> Result<i64, StorageError> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM risk_records", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Records whose column for `identifier_type` equals the identifier after
    /// trimming and upper-casing both sides.
    pub fn find_risk_matches(
        &self,
        identifier: &str,
        identifier_type: IdentifierType,
    ) -> Result<Vec<RiskRecord>, StorageError> {
        let wanted = identifier.trim().to_uppercase();
        if wanted.is_empty() {
            return Ok(Vec::new());
        }

        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM risk_records ORDER BY id ASC", RISK_COLUMNS))?;
        let rows = stmt.query_map([], Self::map_risk_record)?;

        let mut matches = Vec::new();
        for record in rows {
            let record = record?;
            let hit = record
                .identifier(identifier_type)
                .is_some_and(|value| value.trim().to_uppercase() == wanted);
            if hit {
                matches.push(record);
            }
        }
        Ok(matches)
    }

    pub fn get_risk_by_id(&self, id: i64) -> Result<Option<RiskRecord>, StorageError> {
        let record = self
            .conn
            .query_row(
                &format!("SELECT {} FROM risk_records WHERE id = ?1", RISK_COLUMNS),
                params![id],
                Self::map_risk_record,
            )
            .optional()?;
        Ok(record)
    }

    // --- analyses and audit ---

    /// Allocates the next `CIR-<year>-<seq>` reference; the sequence restarts every year.
    pub fn next_consulta_id(&self, year: i32) -> Result<String, StorageError> {
        let seq: i64 = self.conn.query_row(
            "INSERT INTO consulta_seq (year, seq) VALUES (?1, 1)
             ON CONFLICT(year) DO UPDATE SET seq = seq + 1
             RETURNING seq",
            params![year],
            |row| row.get(0),
        )?;
        Ok(format_consulta_id(year, seq))
    }

    pub fn save_analysis(&self, analysis: &Analysis) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO analyses (consulta_id, created_at, identifier, body)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                &analysis.consulta_id,
                analysis.timestamp.to_rfc3339(),
                &analysis.identifier,
                serde_json::to_string(analysis)?,
            ],
        )?;
        Ok(())
    }

    pub fn get_analysis(&self, consulta_id: &str) -> Result<Option<Analysis>, StorageError> {
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM analyses WHERE consulta_id = ?1",
                params![consulta_id],
                |row| row.get(0),
            )
            .optional()?;

        let Some(body) = body else {
            return Ok(None);
        };
        let analysis: Analysis = serde_json::from_str(&body)?;
        if !analysis.verify_integrity() {
            return Err(StorageError::Corrupt(format!(
                "analysis {} fails its integrity check",
                consulta_id
            )));
        }
        Ok(Some(analysis))
    }

    pub fn add_audit(&self, entry: &AuditEntry) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO audit_log (
                timestamp, consulta_id, identifier, identifier_type, decision,
                score, requested_by, fraud_suspected, claims_last_12m
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                entry.timestamp.to_rfc3339(),
                &entry.consulta_id,
                &entry.identifier,
                &entry.identifier_type,
                &entry.decisao,
                entry.score_final,
                &entry.requested_by,
                entry.fraude_suspeita,
                entry.sinistros_ult_12m,
            ],
        )?;
        Ok(())
    }

    /// Most recent audit entries first.
    pub fn list_audit(&self, limit: usize) -> Result<Vec<AuditEntry>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, timestamp, consulta_id, identifier, identifier_type, decision,
                    score, requested_by, fraud_suspected, claims_last_12m
             FROM audit_log ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(AuditEntry {
                id: row.get(0)?,
                timestamp: timestamp_at(row, 1)?,
                consulta_id: row.get(2)?,
                identifier: row.get(3)?,
                identifier_type: row.get(4)?,
                decisao: row.get(5)?,
                score_final: row.get(6)?,
                requested_by: row.get(7)?,
                fraude_suspeita: row.get(8)?,
                sinistros_ult_12m: row.get(9)?,
            })
        })?;

        let mut entries = Vec::new();
        for entry in rows {
            entries.push(entry?);
        }
        Ok(entries)
    }

    // --- row mapping ---

    fn map_source(row: &Row) -> Result<InfoSource, rusqlite::Error> {
        let url: Option<String> = row.get(4)?;
        let file_path: Option<String> = row.get(5)?;
        let origin = match (url, file_path) {
            (Some(url), _) => SourceOrigin::Url(url),
            (None, Some(path)) => SourceOrigin::File(PathBuf::from(path)),
            (None, None) => return Err(conversion_error(4, "source without origin".to_string())),
        };

        Ok(InfoSource {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            category: row.get(3)?,
            origin,
            owner: row.get(6)?,
            validity: row.get(7)?,
            created_at: timestamp_at(row, 8)?,
        })
    }

    fn map_fact(row: &Row) -> Result<Fact, rusqlite::Error> {
        let kind: String = row.get(1)?;
        let kind: FactKind = kind.parse().map_err(|e: StorageError| conversion_error(1, e.to_string()))?;
        let identifiers: String = row.get(6)?;
        let identifiers: Vec<String> =
            serde_json::from_str(&identifiers).map_err(|e| conversion_error(6, e.to_string()))?;

        Ok(Fact {
            kind,
            name: row.get(2)?,
            normalized_name: row.get(3)?,
            role: row.get(4)?,
            jurisdiction: row.get(5)?,
            identifiers,
            source_id: row.get(0)?,
            extracted_at: timestamp_at(row, 7)?,
        })
    }

    fn map_risk_record(row: &Row) -> Result<RiskRecord, rusqlite::Error> {
        Ok(RiskRecord {
            id: row.get(0)?,
            name: row.get(1)?,
            nif: row.get(2)?,
            bi: row.get(3)?,
            passport: row.get(4)?,
            residence_card: row.get(5)?,
            score: row.get(6)?,
            justification: row.get(7)?,
            pep_alert: row.get(8)?,
            sanctions_alert: row.get(9)?,
            fraud_suspected: row.get(10)?,
            fraud_comment: row.get(11)?,
            payment_history: row.get(12)?,
            claims_total: row.get(13)?,
            claims_last_12m: row.get(14)?,
            line_of_business: row.get(15)?,
            purpose: row.get(16)?,
            channel: row.get(17)?,
            suggested_conditions: row.get(18)?,
            state: row.get(19)?,
        })
    }
}
