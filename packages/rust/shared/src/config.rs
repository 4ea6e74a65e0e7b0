//! Application configuration for Brand Guardian.
//!
//! User config lives at `~/.brandguard/brandguard.toml`.
//! Environment variables (typically loaded from `.env`) override file values,
//! which override defaults. API keys are never stored in the file: each
//! section names the environment variable that holds its key.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BrandGuardError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "brandguard.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".brandguard";

// ---------------------------------------------------------------------------
// Config structs (matching brandguard.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Azure OpenAI chat + embedding deployments.
    #[serde(default)]
    pub azure_openai: AzureOpenAiConfig,

    /// Azure AI Search index holding the rule documents.
    #[serde(default)]
    pub search: SearchConfig,

    /// Azure Video Indexer account.
    #[serde(default)]
    pub video_indexer: VideoIndexerConfig,

    /// Audit pipeline tuning.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Offline knowledge-base ingestion.
    #[serde(default)]
    pub ingest: IngestConfig,
}

/// `[azure_openai]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureOpenAiConfig {
    /// Resource endpoint, e.g. `https://my-resource.openai.azure.com`.
    #[serde(default)]
    pub endpoint: String,

    #[serde(default = "default_openai_api_version")]
    pub api_version: String,

    /// Deployment used for the compliance judgement.
    #[serde(default = "default_chat_deployment")]
    pub chat_deployment: String,

    /// Deployment used to embed queries and rule chunks.
    #[serde(default = "default_embedding_deployment")]
    pub embedding_deployment: String,

    /// Name of the env var holding the API key.
    #[serde(default = "default_openai_key_env")]
    pub api_key_env: String,
}

impl Default for AzureOpenAiConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_version: default_openai_api_version(),
            chat_deployment: default_chat_deployment(),
            embedding_deployment: default_embedding_deployment(),
            api_key_env: default_openai_key_env(),
        }
    }
}

fn default_openai_api_version() -> String {
    "2024-02-01".into()
}
fn default_chat_deployment() -> String {
    "gpt-4o".into()
}
fn default_embedding_deployment() -> String {
    "text-embedding-3-small".into()
}
fn default_openai_key_env() -> String {
    "AZURE_OPENAI_API_KEY".into()
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Search service endpoint, e.g. `https://my-search.search.windows.net`.
    #[serde(default)]
    pub endpoint: String,

    #[serde(default)]
    pub index_name: String,

    #[serde(default = "default_search_api_version")]
    pub api_version: String,

    /// Vector field queried for similarity search.
    #[serde(default = "default_vector_field")]
    pub vector_field: String,

    /// Name of the env var holding the admin/query key.
    #[serde(default = "default_search_key_env")]
    pub api_key_env: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            index_name: String::new(),
            api_version: default_search_api_version(),
            vector_field: default_vector_field(),
            api_key_env: default_search_key_env(),
        }
    }
}

fn default_search_api_version() -> String {
    "2023-11-01".into()
}
fn default_vector_field() -> String {
    "content_vector".into()
}
fn default_search_key_env() -> String {
    "AZURE_AI_SEARCH_API_KEY".into()
}

/// `[video_indexer]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoIndexerConfig {
    #[serde(default = "default_vi_endpoint")]
    pub endpoint: String,

    /// Azure region of the account, or `trial`.
    #[serde(default = "default_vi_location")]
    pub location: String,

    #[serde(default)]
    pub account_id: String,

    /// Name of the env var holding the API subscription key.
    #[serde(default = "default_vi_key_env")]
    pub api_key_env: String,

    /// Program used to fetch remote videos.
    #[serde(default = "default_downloader")]
    pub downloader: String,
}

impl Default for VideoIndexerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_vi_endpoint(),
            location: default_vi_location(),
            account_id: String::new(),
            api_key_env: default_vi_key_env(),
            downloader: default_downloader(),
        }
    }
}

fn default_vi_endpoint() -> String {
    "https://api.videoindexer.ai".into()
}
fn default_vi_location() -> String {
    "trial".into()
}
fn default_vi_key_env() -> String {
    "AZURE_VIDEO_INDEXER_API_KEY".into()
}
fn default_downloader() -> String {
    "yt-dlp".into()
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of rule documents retrieved per audit.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Seconds between processing-status polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Upper bound on waiting for video processing.
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,

    /// Upper bound on downloading and uploading one video.
    #[serde(default = "default_transfer_timeout")]
    pub transfer_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            poll_interval_secs: default_poll_interval(),
            poll_timeout_secs: default_poll_timeout(),
            transfer_timeout_secs: default_transfer_timeout(),
        }
    }
}

fn default_top_k() -> usize {
    3
}
fn default_poll_interval() -> u64 {
    30
}
fn default_poll_timeout() -> u64 {
    1800
}
fn default_transfer_timeout() -> u64 {
    900
}

/// `[ingest]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Folder scanned for rule documents.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Maximum characters per chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared between consecutive chunks.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Chunks uploaded per index request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            batch_size: default_batch_size(),
        }
    }
}

fn default_data_dir() -> String {
    "data".into()
}
fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}
fn default_batch_size() -> usize {
    100
}

// ---------------------------------------------------------------------------
// Environment overrides
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Override file values with process environment variables.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Override file values using `lookup` for each known variable name.
    /// Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let targets: [(&str, &mut String); 9] = [
            ("AZURE_OPENAI_ENDPOINT", &mut self.azure_openai.endpoint),
            ("AZURE_OPENAI_API_VERSION", &mut self.azure_openai.api_version),
            ("AZURE_OPENAI_CHAT_MODEL", &mut self.azure_openai.chat_deployment),
            (
                "AZURE_OPENAI_EMBEDDING_MODEL",
                &mut self.azure_openai.embedding_deployment,
            ),
            ("AZURE_AI_SEARCH_ENDPOINT", &mut self.search.endpoint),
            ("AZURE_AI_SEARCH_INDEX_NAME", &mut self.search.index_name),
            ("AZURE_VIDEO_INDEXER_ENDPOINT", &mut self.video_indexer.endpoint),
            ("AZURE_VIDEO_INDEXER_LOCATION", &mut self.video_indexer.location),
            (
                "AZURE_VIDEO_INDEXER_ACCOUNT_ID",
                &mut self.video_indexer.account_id,
            ),
        ];

        for (name, slot) in targets {
            if let Some(value) = get(name) {
                tracing::debug!(var = name, "config value overridden from environment");
                *slot = value;
            }
        }
    }

    /// Settings the ingestion pipeline cannot start without, as
    /// `(variable name, resolved value)` pairs.
    pub fn ingest_settings(&self) -> Vec<(String, Option<String>)> {
        vec![
            setting("AZURE_OPENAI_ENDPOINT", &self.azure_openai.endpoint),
            secret_setting(&self.azure_openai.api_key_env),
            setting("AZURE_AI_SEARCH_ENDPOINT", &self.search.endpoint),
            secret_setting(&self.search.api_key_env),
            setting("AZURE_AI_SEARCH_INDEX_NAME", &self.search.index_name),
        ]
    }

    /// Settings a full audit run needs: everything ingestion needs plus the
    /// video indexer account.
    pub fn audit_settings(&self) -> Vec<(String, Option<String>)> {
        let mut settings = self.ingest_settings();
        settings.push(setting(
            "AZURE_VIDEO_INDEXER_ACCOUNT_ID",
            &self.video_indexer.account_id,
        ));
        settings.push(secret_setting(&self.video_indexer.api_key_env));
        settings
    }
}

fn setting(name: &str, value: &str) -> (String, Option<String>) {
    let value = Some(value.trim().to_string()).filter(|v| !v.is_empty());
    (name.to_string(), value)
}

fn secret_setting(env_name: &str) -> (String, Option<String>) {
    let value = std::env::var(env_name).ok().filter(|v| !v.is_empty());
    (env_name.to_string(), value)
}

/// Fail with one error naming every missing setting.
pub fn require_vars(settings: &[(String, Option<String>)]) -> Result<()> {
    let missing: Vec<&str> = settings
        .iter()
        .filter(|(_, value)| value.is_none())
        .map(|(name, _)| name.as_str())
        .collect();

    if missing.is_empty() {
        return Ok(());
    }

    Err(BrandGuardError::config(format!(
        "missing required environment variables: {}. \
         Check your .env file and ensure all variables are set.",
        missing.join(", ")
    )))
}

/// Read an API key from the named environment variable.
pub fn resolve_secret(env_name: &str) -> Result<String> {
    match std::env::var(env_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(BrandGuardError::config(format!(
            "API key not found. Set the {env_name} environment variable."
        ))),
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.brandguard/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| BrandGuardError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.brandguard/brandguard.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk and apply environment overrides.
/// Uses defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    let mut config = if path.exists() {
        load_config_from(&path)?
    } else {
        tracing::debug!(?path, "config file not found, using defaults");
        AppConfig::default()
    };

    config.apply_env_overrides();
    Ok(config)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| BrandGuardError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        BrandGuardError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| BrandGuardError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| BrandGuardError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| BrandGuardError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
