use crate::matcher::{MatchMode, Scorer};
use crate::model::{ConfigError, NewInfoSource};
use serde::Deserialize;
use std::env;
use std::fs;
use std::io::ErrorKind;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub mode: MatchMode,
    pub scorer: Scorer,
    /// Minimum score (percent) for a candidate to count as a match.
    pub threshold: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            mode: MatchMode::Fuzzy,
            scorer: Scorer::TokenSet,
            threshold: 88.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "CIRBot/1.0 (+https://checkinsurancerisk.com)".to_string(),
            timeout_seconds: 20,
            max_retries: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub bind_addr: String,
    pub db_path: String,
    pub upload_dir: String,
    /// Seconds between background fact refreshes; 0 disables the loop.
    pub refresh_interval_seconds: u64,
    /// Optional JSON file with risk records loaded at startup.
    pub risk_records_seed: Option<String>,
    pub matching: MatchConfig,
    pub fetch: FetchConfig,
    pub sources: Vec<NewInfoSource>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            db_path: "cir.sqlite3".to_string(),
            upload_dir: "uploads".to_string(),
            refresh_interval_seconds: 6 * 60 * 60,
            risk_records_seed: None,
            matching: MatchConfig::default(),
            fetch: FetchConfig::default(),
            sources: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Applies `CIR_*` overrides; `var` looks a variable up by name.
    fn apply_env_overrides(
        &mut self,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(addr) = var("CIR_BIND_ADDR") {
            self.bind_addr = addr;
        }
        if let Some(path) = var("CIR_DB_PATH") {
            self.db_path = path;
        }
        if let Some(dir) = var("CIR_UPLOAD_DIR") {
            self.upload_dir = dir;
        }
        if let Some(raw) = var("CIR_MATCH_THRESHOLD") {
            self.matching.threshold = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "CIR_MATCH_THRESHOLD",
                reason: format!("'{}' is not a number", raw),
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_addr.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "bind_addr",
                reason: "must not be empty".into(),
            });
        }
        if !(50.0..=100.0).contains(&self.matching.threshold) {
            return Err(ConfigError::Invalid {
                key: "matching.threshold",
                reason: format!("{} is outside 50..=100", self.matching.threshold),
            });
        }
        Ok(())
    }
}

/// Parses a config document, then applies overrides from `var` and validates.
pub fn parse_config(
    content: &str,
    var: impl Fn(&str) -> Option<String>,
) -> Result<AppConfig, ConfigError> {
    let mut config: AppConfig = serde_json::from_str(content)?;
    config.apply_env_overrides(var)?;
    config.validate()?;
    Ok(config)
}

/// Loads `path`, falling back to defaults when the file does not exist,
/// then applies `CIR_*` environment overrides.
pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => "{}".to_string(),
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_string(),
                source,
            })
        }
    };
    parse_config(&content, |key| env::var(key).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config = parse_config("{}", no_env).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8000");
        assert_eq!(config.matching.threshold, 88.0);
        assert_eq!(config.matching.scorer, Scorer::TokenSet);
        assert_eq!(config.fetch.timeout_seconds, 20);
        assert!(config.sources.is_empty());
    }

    #[test]
    fn sources_and_matching_are_read() {
        let config = parse_config(
            r#"{
                "matching": { "mode": "exact", "threshold": 95 },
                "sources": [
                    { "title": "Governo", "category": "governo_ministro",
                      "url": "https://governo.gov.ao/ministro" }
                ]
            }"#,
            no_env,
        )
        .unwrap();
        assert_eq!(config.matching.mode, MatchMode::Exact);
        assert_eq!(config.matching.threshold, 95.0);
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.sources[0].category, "governo_ministro");
    }

    #[test]
    fn threshold_out_of_range_is_rejected() {
        let err = parse_config(r#"{ "matching": { "threshold": 20 } }"#, no_env).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "matching.threshold", .. }));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let config = load_config(path.to_str().unwrap()).unwrap();
        assert_eq!(config.matching.mode, MatchMode::Fuzzy);
        assert!(config.sources.is_empty());
    }

    #[test]
    fn environment_overrides_the_document() {
        let vars: HashMap<&str, &str> = [
            ("CIR_BIND_ADDR", "127.0.0.1:9000"),
            ("CIR_DB_PATH", "/var/lib/cir/cir.sqlite3"),
            ("CIR_UPLOAD_DIR", "/var/lib/cir/uploads"),
            ("CIR_MATCH_THRESHOLD", " 92 "),
        ]
        .into_iter()
        .collect();
        let config = parse_config(r#"{ "bind_addr": "0.0.0.0:8000" }"#, |key| {
            vars.get(key).map(|v| v.to_string())
        })
        .unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.db_path, "/var/lib/cir/cir.sqlite3");
        assert_eq!(config.upload_dir, "/var/lib/cir/uploads");
        assert_eq!(config.matching.threshold, 92.0);
    }

    #[test]
    fn non_numeric_threshold_override_is_rejected() {
        let err = parse_config("{}", |key| {
            (key == "CIR_MATCH_THRESHOLD").then(|| "alto".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "CIR_MATCH_THRESHOLD", .. }));

        let err = parse_config("{}", |key| {
            (key == "CIR_MATCH_THRESHOLD").then(|| "30".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "matching.threshold", .. }));
    }
}
