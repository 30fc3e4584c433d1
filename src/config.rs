use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};

use crate::ledger::BetLedger;
use crate::store::{JsonFileStore, KeyValueStore, MemoryStore, SqliteStore, default_store_path};

pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerBackend {
    Json,
    Sqlite,
    Memory,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
    /// `None` waits on the service indefinitely.
    pub request_timeout: Option<Duration>,
    pub ledger_backend: LedgerBackend,
    pub ledger_path: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        let api_key = get("GEMINI_API_KEY").or_else(|| get("API_KEY"));
        let model = get("ORACLE_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_base = get("ORACLE_API_BASE")
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();
        let request_timeout = get("ORACLE_REQUEST_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);
        let ledger_backend = match get("ORACLE_LEDGER")
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str()
        {
            "sqlite" => LedgerBackend::Sqlite,
            "memory" => LedgerBackend::Memory,
            _ => LedgerBackend::Json,
        };
        let ledger_path = get("ORACLE_LEDGER_PATH").map(PathBuf::from);

        Self {
            api_key,
            model,
            api_base,
            request_timeout,
            ledger_backend,
            ledger_path,
        }
    }

    pub fn open_ledger(&self) -> Result<BetLedger> {
        let store: Box<dyn KeyValueStore> = match self.ledger_backend {
            LedgerBackend::Memory => Box::new(MemoryStore::default()),
            LedgerBackend::Json => Box::new(JsonFileStore::new(self.ledger_file("bets.json")?)),
            LedgerBackend::Sqlite => {
                let path = self.ledger_file("bets.sqlite3")?;
                Box::new(SqliteStore::open(&path).context("open sqlite ledger")?)
            }
        };
        Ok(BetLedger::new(store))
    }

    fn ledger_file(&self, default_name: &str) -> Result<PathBuf> {
        if let Some(path) = &self.ledger_path {
            return Ok(path.clone());
        }
        default_store_path(default_name)
            .ok_or_else(|| anyhow!("no data directory found; set ORACLE_LEDGER_PATH"))
    }
}
