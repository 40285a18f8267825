// src/config.rs
use crate::review::ProposalScope;
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} has an invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct BrevoConfig {
    pub api_key: String,
    pub sender_email: String,
    pub sender_name: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: String,
    pub schema_path: String,
    pub bind_addr: SocketAddr,
    pub max_workers: usize,
    pub upload_dir: String,
    pub public_base_url: String,
    pub max_upload_bytes: usize,
    pub proposal_scope: ProposalScope,
    pub fsis_url: String,
    pub openfda_url: String,
    pub openfda_lookback_days: i64,
    /// `None` when `BREVO_API_KEY` is unset; the digest route then refuses.
    pub brevo: Option<BrevoConfig>,
    pub digest_recipients: Vec<String>,
    pub digest_days: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: "recall_watch.sqlite3".into(),
            schema_path: "sql/schema.sql".into(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            max_workers: 8,
            upload_dir: "uploads".into(),
            public_base_url: "http://127.0.0.1:3000".into(),
            max_upload_bytes: 5 * 1024 * 1024,
            proposal_scope: ProposalScope::AnyProposer,
            fsis_url: "https://www.fsis.usda.gov/fsis/api/recall/v/1".into(),
            openfda_url: "https://api.fda.gov/food/enforcement.json".into(),
            openfda_lookback_days: 60,
            brevo: None,
            digest_recipients: Vec::new(),
            digest_days: 7,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset or blank keys keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut cfg = Self::default();

        if let Some(v) = get("RECALL_DB_PATH") {
            cfg.db_path = v;
        }
        if let Some(v) = get("RECALL_SCHEMA_PATH") {
            cfg.schema_path = v;
        }
        if let Some(v) = get("RECALL_BIND_ADDR") {
            cfg.bind_addr = parse("RECALL_BIND_ADDR", v)?;
        }
        if let Some(v) = get("RECALL_MAX_WORKERS") {
            cfg.max_workers = parse("RECALL_MAX_WORKERS", v)?;
        }
        if let Some(v) = get("RECALL_UPLOAD_DIR") {
            cfg.upload_dir = v;
        }
        if let Some(v) = get("RECALL_PUBLIC_BASE_URL") {
            url::Url::parse(&v).map_err(|e| ConfigError::Invalid {
                var: "RECALL_PUBLIC_BASE_URL",
                value: v.clone(),
                reason: e.to_string(),
            })?;
            cfg.public_base_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = get("RECALL_MAX_UPLOAD_BYTES") {
            cfg.max_upload_bytes = parse("RECALL_MAX_UPLOAD_BYTES", v)?;
        }
        if let Some(v) = get("RECALL_PROPOSAL_SCOPE") {
            cfg.proposal_scope = parse("RECALL_PROPOSAL_SCOPE", v)?;
        }
        if let Some(v) = get("RECALL_FSIS_URL") {
            cfg.fsis_url = v;
        }
        if let Some(v) = get("RECALL_OPENFDA_URL") {
            cfg.openfda_url = v;
        }
        if let Some(v) = get("RECALL_OPENFDA_LOOKBACK_DAYS") {
            cfg.openfda_lookback_days = parse("RECALL_OPENFDA_LOOKBACK_DAYS", v)?;
        }
        if let Some(api_key) = get("BREVO_API_KEY") {
            cfg.brevo = Some(BrevoConfig {
                api_key,
                sender_email: get("BREVO_SENDER_EMAIL")
                    .unwrap_or_else(|| "alerts@recallwatch.local".into()),
                sender_name: get("BREVO_SENDER_NAME").unwrap_or_else(|| "Recall Watch".into()),
            });
        }
        if let Some(v) = get("DIGEST_RECIPIENTS") {
            cfg.digest_recipients = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(v) = get("DIGEST_DAYS") {
            cfg.digest_days = parse("DIGEST_DAYS", v)?;
        }

        Ok(cfg)
    }
}

fn parse<T>(var: &'static str, value: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
        var,
        reason: e.to_string(),
        value,
    })
}
