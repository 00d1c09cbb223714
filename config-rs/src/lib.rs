//! config-rs/lib.rs
//! Environment-backed settings for the API quality pipeline
//! Every external dependency gets its own settings struct; a dependency is
//! only considered configured when all of its required values are present.

use once_cell::sync::OnceCell;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

static DOTENV_LOADED: OnceCell<()> = OnceCell::new();

/// Load `.env` from the working directory once per process.
pub fn load_dotenv() {
    DOTENV_LOADED.get_or_init(|| {
        if dotenv::dotenv().is_err() {
            log::debug!("No .env file found, using process environment only");
        }
    });
}

/// Read a variable, treating empty or whitespace-only values as unset.
pub fn get_optional(var_name: &str) -> Option<String> {
    env::var(var_name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read a variable or fall back to `default`.
pub fn get_or(var_name: &str, default: &str) -> String {
    get_optional(var_name).unwrap_or_else(|| default.to_string())
}

/// Read a numeric variable with a default
///
/// # Arguments
/// * `var_name` - Environment variable name
/// * `default` - Value used when the variable is unset or not a number
///
/// # Returns
/// The parsed value, or `default` with a warning on invalid input
pub fn get_u64(var_name: &str, default: u64) -> u64 {
    match get_optional(var_name) {
        Some(raw) => raw.parse::<u64>().unwrap_or_else(|_| {
            log::warn!("Invalid number in {}, using default {}", var_name, default);
            default
        }),
        None => default,
    }
}

pub fn get_usize(var_name: &str, default: usize) -> usize {
    get_u64(var_name, default as u64) as usize
}

/// First non-empty variable among `names`, in order.
pub fn get_first(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| get_optional(name))
}

/// Pipeline-level knobs that are not tied to any one external service
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub probe_timeout: Duration,
    pub retrieval_top_k: usize,
    pub runs_dir: PathBuf,
    pub code_source_dir: Option<PathBuf>,
    pub docs_source_dir: Option<PathBuf>,
    pub log_level: String,
    pub log_json: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(10),
            retrieval_top_k: 5,
            runs_dir: PathBuf::from("runs"),
            code_source_dir: None,
            docs_source_dir: None,
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl PipelineSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            probe_timeout: Duration::from_secs(get_u64("PROBE_TIMEOUT_SECS", 10)),
            retrieval_top_k: get_usize("RETRIEVAL_TOP_K", defaults.retrieval_top_k),
            runs_dir: get_optional("RUNS_DIR").map(PathBuf::from).unwrap_or(defaults.runs_dir),
            code_source_dir: get_optional("CODE_SOURCE_DIR").map(PathBuf::from),
            docs_source_dir: get_optional("DOCS_SOURCE_DIR").map(PathBuf::from),
            log_level: get_or("LOG_LEVEL", &defaults.log_level),
            log_json: get_or("LOG_FORMAT", "text").eq_ignore_ascii_case("json"),
        }
    }
}

/// Key-value store connection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyValueSettings {
    pub redis_url: Option<String>,
}

impl KeyValueSettings {
    pub fn from_env() -> Self {
        Self {
            redis_url: get_optional("REDIS_URL"),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.redis_url.is_some()
    }
}

/// PII tokenization vault
#[derive(Debug, Clone, PartialEq)]
pub struct TokenizerSettings {
    pub vault_id: Option<String>,
    pub api_token: Option<String>,
    pub base_url: String,
}

impl Default for TokenizerSettings {
    fn default() -> Self {
        Self {
            vault_id: None,
            api_token: None,
            base_url: "https://prod.skyflowapis.com/v1".to_string(),
        }
    }
}

impl TokenizerSettings {
    pub fn from_env() -> Self {
        Self {
            vault_id: get_optional("SKYFLOW_VAULT_ID"),
            api_token: get_optional("SKYFLOW_API_TOKEN"),
            base_url: get_or("SKYFLOW_BASE_URL", &Self::default().base_url),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.vault_id.is_some() && self.api_token.is_some()
    }
}

/// Test collection manager
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub workspace_id: Option<String>,
}

impl Default for CollectionSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.getpostman.com".to_string(),
            workspace_id: None,
        }
    }
}

impl CollectionSettings {
    pub fn from_env() -> Self {
        Self {
            api_key: get_optional("POSTMAN_API_KEY"),
            base_url: get_or("POSTMAN_BASE_URL", &Self::default().base_url),
            workspace_id: get_optional("POSTMAN_WORKSPACE_ID"),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Report document store
#[derive(Debug, Clone, PartialEq)]
pub struct ReportStoreSettings {
    pub project_id: Option<String>,
    pub dataset: Option<String>,
    pub write_token: Option<String>,
    pub api_version: String,
    /// Overrides `https://{project_id}.api.sanity.io` when set.
    pub base_url: Option<String>,
}

impl Default for ReportStoreSettings {
    fn default() -> Self {
        Self {
            project_id: None,
            dataset: None,
            write_token: None,
            api_version: "v2021-10-21".to_string(),
            base_url: None,
        }
    }
}

impl ReportStoreSettings {
    pub fn from_env() -> Self {
        Self {
            project_id: get_optional("SANITY_PROJECT_ID"),
            dataset: get_optional("SANITY_DATASET"),
            write_token: get_optional("SANITY_WRITE_TOKEN"),
            api_version: get_or("SANITY_API_VERSION", &Self::default().api_version),
            base_url: get_optional("SANITY_BASE_URL"),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.project_id.is_some() && self.dataset.is_some() && self.write_token.is_some()
    }
}

/// Vector similarity search backend
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorSearchSettings {
    pub url: Option<String>,
    pub api_key: Option<String>,
}

impl VectorSearchSettings {
    pub fn from_env() -> Self {
        Self {
            url: get_optional("VECTOR_SEARCH_URL"),
            api_key: get_optional("VECTOR_SEARCH_API_KEY"),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }
}

/// OpenAI-compatible chat completions endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct LlmSettings {
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
    pub max_retries: u32,
    pub timeout: Duration,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_retries: 2,
            timeout: Duration::from_secs(30),
        }
    }
}

impl LlmSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: get_first(&["LLM_API_KEY", "OPENAI_API_KEY"]),
            api_url: get_or("LLM_API_URL", &defaults.api_url),
            model: get_or("LLM_MODEL", &defaults.model),
            max_retries: get_u64("LLM_MAX_RETRIES", defaults.max_retries as u64) as u32,
            timeout: Duration::from_secs(get_u64("LLM_TIMEOUT_SECS", 30)),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Everything the pipeline reads from the environment, in one place
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppSettings {
    pub pipeline: PipelineSettings,
    pub key_value: KeyValueSettings,
    pub tokenizer: TokenizerSettings,
    pub collections: CollectionSettings,
    pub reports: ReportStoreSettings,
    pub vector_search: VectorSearchSettings,
    pub llm: LlmSettings,
}

impl AppSettings {
    /// Load `.env` then read every section from the environment.
    pub fn from_env() -> Self {
        load_dotenv();
        Self {
            pipeline: PipelineSettings::from_env(),
            key_value: KeyValueSettings::from_env(),
            tokenizer: TokenizerSettings::from_env(),
            collections: CollectionSettings::from_env(),
            reports: ReportStoreSettings::from_env(),
            vector_search: VectorSearchSettings::from_env(),
            llm: LlmSettings::from_env(),
        }
    }
}
