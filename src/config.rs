use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EngramConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub partition: PartitionConfig,
    pub llm: LlmConfig,
    pub sweeper: SweeperConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub log_level: String,
    /// When set, an HTTP liveness endpoint is served on this port.
    pub health_port: Option<u16>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL. Required; has no usable default.
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PartitionConfig {
    pub tenant_id: String,
    pub workspace_id: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider backend: `"openai"` or `"gemini"`.
    pub backend: String,
    /// Chat model name; `"auto"` picks the backend default.
    pub chat_model: String,
    /// Embedding model(s); `"auto"` picks the backend default. A
    /// comma-separated list enables multi-model embeddings, first = primary.
    pub embed_models: String,
    pub openai_api_key: String,
    pub gemini_api_key: String,
    /// Run the LLM entity-extraction pass after each add.
    pub extract_entities: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SweeperConfig {
    pub enabled: bool,
    /// Tick interval as a duration string (`1h`, `30m`, `90s`, `100ms`).
    pub interval: String,
}

impl Default for EngramConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            partition: PartitionConfig::default(),
            llm: LlmConfig::default(),
            sweeper: SweeperConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            health_port: None,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
        }
    }
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            tenant_id: "local".into(),
            workspace_id: "default".into(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: "openai".into(),
            chat_model: "auto".into(),
            embed_models: "auto".into(),
            openai_api_key: String::new(),
            gemini_api_key: String::new(),
            extract_entities: false,
        }
    }
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: "1h".into(),
        }
    }
}

/// Returns `~/.engram/`
pub fn default_engram_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".engram")
}

/// Returns the default config file path: `~/.engram/config.toml`
pub fn default_config_path() -> PathBuf {
    default_engram_dir().join("config.toml")
}

impl EngramConfig {
    /// Load config from the TOML file (if it exists) then apply env overrides.
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
            EngramConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides. Every knob the server reads
    /// from the environment is handled here and nowhere else.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("DATABASE_URL") {
            self.database.url = val;
        }
        if let Ok(val) = std::env::var("TENANT_ID") {
            self.partition.tenant_id = val;
        }
        if let Ok(val) = std::env::var("WORKSPACE_ID") {
            self.partition.workspace_id = val;
        }
        if let Ok(val) = std::env::var("LM_BACKEND") {
            self.llm.backend = val;
        }
        if let Ok(val) = std::env::var("LM_MODEL") {
            self.llm.chat_model = val;
        }
        // EMBED_MODELS (comma-separated) wins over the single EMBED_MODEL.
        if let Ok(val) = std::env::var("EMBED_MODEL") {
            self.llm.embed_models = val;
        }
        if let Ok(val) = std::env::var("EMBED_MODELS") {
            self.llm.embed_models = val;
        }
        if let Ok(val) = std::env::var("OPENAI_API_KEY") {
            self.llm.openai_api_key = val;
        }
        if let Ok(val) = std::env::var("GEMINI_API_KEY") {
            self.llm.gemini_api_key = val;
        }
        if let Ok(val) = std::env::var("EXTRACT_ENTITIES") {
            self.llm.extract_entities = matches!(val.as_str(), "true" | "1");
        }
        if let Ok(val) = std::env::var("SWEEPER_ENABLED") {
            self.sweeper.enabled = !matches!(val.as_str(), "false" | "0");
        }
        if let Ok(val) = std::env::var("SWEEPER_INTERVAL") {
            self.sweeper.interval = val;
        }
        if let Ok(val) = std::env::var("HEALTH_PORT") {
            self.server.health_port = val.parse().ok();
        }
        if let Ok(val) = std::env::var("ENGRAM_LOG_LEVEL") {
            self.server.log_level = val;
        }
    }

    /// Validate the parts every mode needs. Provider key checks live in
    /// the embedding factory, which knows whether a key is actually needed.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            !self.database.url.is_empty(),
            "DATABASE_URL is required (set the env var or [database].url in config.toml)"
        );
        anyhow::ensure!(
            matches!(self.llm.backend.as_str(), "openai" | "gemini"),
            "invalid LM_BACKEND {:?} (must be 'openai' or 'gemini')",
            self.llm.backend
        );
        anyhow::ensure!(
            !self.partition.tenant_id.is_empty() && !self.partition.workspace_id.is_empty(),
            "tenant and workspace ids must be non-empty"
        );
        Ok(())
    }

    /// Parsed sweeper tick interval.
    pub fn sweeper_interval(&self) -> Result<Duration> {
        parse_duration(&self.sweeper.interval)
            .with_context(|| format!("invalid SWEEPER_INTERVAL: {:?}", self.sweeper.interval))
    }
}

/// Parse a duration string of the form `<number><unit>` with units
/// `ms`, `s`, `m`, `h`. Compound forms like `1h30m` are accepted.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    anyhow::ensure!(!s.is_empty(), "empty duration");

    let mut total = Duration::ZERO;
    let mut num = String::new();
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c.is_ascii_digit() || c == '.' {
            num.push(c);
            continue;
        }
        let mut unit = String::from(c);
        if c == 'm' && chars.peek() == Some(&'s') {
            chars.next();
            unit.push('s');
        }
        let value: f64 = num
            .parse()
            .with_context(|| format!("bad number in duration: {s:?}"))?;
        num.clear();
        let millis = match unit.as_str() {
            "ms" => value,
            "s" => value * 1_000.0,
            "m" => value * 60_000.0,
            "h" => value * 3_600_000.0,
            other => anyhow::bail!("unknown duration unit {other:?} in {s:?}"),
        };
        total += Duration::from_millis(millis as u64);
    }

    anyhow::ensure!(num.is_empty(), "duration missing unit: {s:?}");
    anyhow::ensure!(total > Duration::ZERO, "duration must be positive: {s:?}");
    Ok(total)
}
