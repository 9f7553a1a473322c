use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MnemaConfig {
    pub storage: StorageConfig,
    pub workspace: WorkspaceConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub sync: SyncConfig,
    pub boot: BootConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
    pub agent_id: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Root directory holding the knowledge base documents.
    pub root: String,
    /// Long-term memory document, synced at high importance.
    pub memory_file: String,
    /// Subdirectory holding date-prefixed daily notes.
    pub daily_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Base URL of an OpenAI-compatible embeddings API.
    pub api_base: String,
    pub model: String,
    /// Environment variable holding the API key. Empty disables auth headers.
    pub api_key_env: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub default_limit: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SyncConfig {
    pub memory_importance: i64,
    pub daily_importance: i64,
    /// Whole-corpus sync only touches the newest N daily notes.
    pub daily_note_limit: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BootConfig {
    pub importance_floor: i64,
    pub recent_days: i64,
    pub entity_limit: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for MnemaConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            workspace: WorkspaceConfig::default(),
            embedding: EmbeddingConfig::default(),
            retrieval: RetrievalConfig::default(),
            sync: SyncConfig::default(),
            boot: BootConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_mnema_dir()
            .join("memory.db")
            .to_string_lossy()
            .into_owned();
        Self {
            db_path,
            agent_id: "main".into(),
        }
    }
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        let root = default_mnema_dir()
            .join("workspace")
            .to_string_lossy()
            .into_owned();
        Self {
            root,
            memory_file: "MEMORY.md".into(),
            daily_dir: "notes".into(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".into(),
            model: "text-embedding-3-small".into(),
            api_key_env: "OPENAI_API_KEY".into(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { default_limit: 5 }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            memory_importance: 8,
            daily_importance: 6,
            daily_note_limit: 14,
        }
    }
}

impl Default for BootConfig {
    fn default() -> Self {
        Self {
            importance_floor: 8,
            recent_days: 3,
            entity_limit: 20,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".into() }
    }
}

/// Returns `~/.mnema/`
pub fn default_mnema_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".mnema")
}

/// Returns the default config file path: `~/.mnema/config.toml`
pub fn default_config_path() -> PathBuf {
    default_mnema_dir().join("config.toml")
}

impl MnemaConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            MnemaConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (MNEMA_DB, MNEMA_AGENT,
    /// MNEMA_WORKSPACE, MNEMA_LOG_LEVEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("MNEMA_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("MNEMA_AGENT") {
            self.storage.agent_id = val;
        }
        if let Ok(val) = std::env::var("MNEMA_WORKSPACE") {
            self.workspace.root = val;
        }
        if let Ok(val) = std::env::var("MNEMA_LOG_LEVEL") {
            self.logging.level = val;
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    /// Resolve the workspace root, expanding `~` if needed.
    pub fn resolved_workspace_root(&self) -> PathBuf {
        expand_tilde(&self.workspace.root)
    }

    /// Source-key prefix shared by all daily-note chunks (e.g. `notes/`).
    pub fn daily_prefix(&self) -> String {
        format!("{}/", self.workspace.daily_dir)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}
