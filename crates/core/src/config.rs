use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipeline::WorkflowMode;
use crate::retrieval::{
    DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, DEFAULT_EMBEDDING_DIM, DEFAULT_TOP_K,
};
use crate::tools::RATING_REFERENCE_YEAR;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub retrieval: RetrievalConfig,
    pub rating: RatingConfig,
    pub workflow: WorkflowConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct RetrievalConfig {
    pub data_dir: PathBuf,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub embedding_dim: usize,
}

#[derive(Clone, Debug)]
pub struct RatingConfig {
    pub base_rate_per_1000: Decimal,
    pub reference_year: i32,
}

#[derive(Clone, Debug)]
pub struct WorkflowConfig {
    pub mode: WorkflowMode,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub workflow_mode: Option<WorkflowMode>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://bindery.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            retrieval: RetrievalConfig {
                data_dir: PathBuf::from("data/guidelines"),
                chunk_size: DEFAULT_CHUNK_SIZE,
                chunk_overlap: DEFAULT_CHUNK_OVERLAP,
                top_k: DEFAULT_TOP_K,
                embedding_dim: DEFAULT_EMBEDDING_DIM,
            },
            rating: RatingConfig {
                base_rate_per_1000: Decimal::new(250, 2),
                reference_year: RATING_REFERENCE_YEAR,
            },
            workflow: WorkflowConfig { mode: WorkflowMode::Interactive },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("bindery.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(retrieval) = patch.retrieval {
            if let Some(data_dir) = retrieval.data_dir {
                self.retrieval.data_dir = PathBuf::from(data_dir);
            }
            if let Some(chunk_size) = retrieval.chunk_size {
                self.retrieval.chunk_size = chunk_size;
            }
            if let Some(chunk_overlap) = retrieval.chunk_overlap {
                self.retrieval.chunk_overlap = chunk_overlap;
            }
            if let Some(top_k) = retrieval.top_k {
                self.retrieval.top_k = top_k;
            }
            if let Some(embedding_dim) = retrieval.embedding_dim {
                self.retrieval.embedding_dim = embedding_dim;
            }
        }

        if let Some(rating) = patch.rating {
            if let Some(base_rate_per_1000) = rating.base_rate_per_1000 {
                self.rating.base_rate_per_1000 = base_rate_per_1000;
            }
            if let Some(reference_year) = rating.reference_year {
                self.rating.reference_year = reference_year;
            }
        }

        if let Some(workflow) = patch.workflow {
            if let Some(mode) = workflow.mode {
                self.workflow.mode = mode;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("BINDERY_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("BINDERY_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("BINDERY_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("BINDERY_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("BINDERY_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("BINDERY_RETRIEVAL_DATA_DIR") {
            self.retrieval.data_dir = PathBuf::from(value);
        }
        if let Some(value) = read_env("BINDERY_RETRIEVAL_TOP_K") {
            self.retrieval.top_k = parse_usize("BINDERY_RETRIEVAL_TOP_K", &value)?;
        }
        if let Some(value) = read_env("BINDERY_RETRIEVAL_CHUNK_SIZE") {
            self.retrieval.chunk_size = parse_usize("BINDERY_RETRIEVAL_CHUNK_SIZE", &value)?;
        }
        if let Some(value) = read_env("BINDERY_RETRIEVAL_CHUNK_OVERLAP") {
            self.retrieval.chunk_overlap = parse_usize("BINDERY_RETRIEVAL_CHUNK_OVERLAP", &value)?;
        }
        if let Some(value) = read_env("BINDERY_RETRIEVAL_EMBEDDING_DIM") {
            self.retrieval.embedding_dim = parse_usize("BINDERY_RETRIEVAL_EMBEDDING_DIM", &value)?;
        }

        if let Some(value) = read_env("BINDERY_RATING_REFERENCE_YEAR") {
            self.rating.reference_year =
                value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
                    key: "BINDERY_RATING_REFERENCE_YEAR".to_string(),
                    value,
                })?;
        }

        if let Some(value) = read_env("BINDERY_WORKFLOW_MODE") {
            self.workflow.mode = value.parse().map_err(ConfigError::Validation)?;
        }

        let log_level = read_env("BINDERY_LOGGING_LEVEL").or_else(|| read_env("BINDERY_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("BINDERY_LOGGING_FORMAT").or_else(|| read_env("BINDERY_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(data_dir) = overrides.data_dir {
            self.retrieval.data_dir = data_dir;
        }
        if let Some(mode) = overrides.workflow_mode {
            self.workflow.mode = mode;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_retrieval(&self.retrieval)?;
        validate_rating(&self.rating)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("bindery.toml"), PathBuf::from("config/bindery.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_retrieval(retrieval: &RetrievalConfig) -> Result<(), ConfigError> {
    if retrieval.top_k == 0 {
        return Err(ConfigError::Validation(
            "retrieval.top_k must be greater than zero".to_string(),
        ));
    }

    if retrieval.chunk_size == 0 {
        return Err(ConfigError::Validation(
            "retrieval.chunk_size must be greater than zero".to_string(),
        ));
    }

    if retrieval.chunk_overlap >= retrieval.chunk_size {
        return Err(ConfigError::Validation(
            "retrieval.chunk_overlap must be smaller than retrieval.chunk_size".to_string(),
        ));
    }

    if retrieval.embedding_dim < 16 {
        return Err(ConfigError::Validation(
            "retrieval.embedding_dim must be at least 16".to_string(),
        ));
    }

    Ok(())
}

fn validate_rating(rating: &RatingConfig) -> Result<(), ConfigError> {
    if rating.base_rate_per_1000 <= Decimal::ZERO {
        return Err(ConfigError::Validation(
            "rating.base_rate_per_1000 must be greater than zero".to_string(),
        ));
    }

    if !(1900..=2100).contains(&rating.reference_year) {
        return Err(ConfigError::Validation(
            "rating.reference_year must be in range 1900..=2100".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    retrieval: Option<RetrievalPatch>,
    rating: Option<RatingPatch>,
    workflow: Option<WorkflowPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RetrievalPatch {
    data_dir: Option<String>,
    chunk_size: Option<usize>,
    chunk_overlap: Option<usize>,
    top_k: Option<usize>,
    embedding_dim: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct RatingPatch {
    base_rate_per_1000: Option<Decimal>,
    reference_year: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
struct WorkflowPatch {
    mode: Option<WorkflowMode>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
