use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::llm::ProviderKind;

pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_HISTORY_LIMIT: usize = 5;
pub const MAX_RESPONSE_TOKENS: u32 = 500;

const DUCKDB_SCHEME: &str = "duckdb://";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read settings: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Every recognised setting, flat, exactly as it arrives from the config file
/// or the process environment. Empty strings count as absent.
#[derive(Debug, Default, Deserialize, Clone)]
#[serde(default)]
pub struct Settings {
    pub host: Option<String>,
    pub port: Option<String>,
    pub database_url: Option<String>,
    pub node_env: Option<String>,
    pub llm_provider: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_model: Option<String>,
    pub openai_api_base: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: Option<String>,
    pub anthropic_api_base: Option<String>,
    pub error_policy: Option<String>,
    pub history_limit: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub path: String,
}

impl DatabaseConfig {
    pub fn is_in_memory(&self) -> bool {
        self.path == ":memory:"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeEnv {
    Development,
    Production,
}

impl RuntimeEnv {
    fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some(v) if v.eq_ignore_ascii_case("production") => RuntimeEnv::Production,
            _ => RuntimeEnv::Development,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimeEnv::Development => "development",
            RuntimeEnv::Production => "production",
        }
    }
}

/// How failures on the request paths reach the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Log and answer 200; LLM failures become an `ERROR: ...` answer.
    #[default]
    Graceful,
    /// Log and answer with an error status and a generic `{error}` body.
    Strict,
}

impl ErrorPolicy {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "graceful" => Some(ErrorPolicy::Graceful),
            "strict" => Some(ErrorPolicy::Strict),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_base: String,
    pub api_key: String,
    pub default_model: String,
}

#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub api_base: String,
    pub api_key: String,
    pub default_model: String,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: ProviderKind,
    pub openai: Option<OpenAiConfig>,
    pub anthropic: Option<AnthropicConfig>,
}

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub history_limit: usize,
    pub max_tokens: u32,
    pub error_policy: ErrorPolicy,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: Option<DatabaseConfig>,
    /// `DATABASE_URL` was given, whether or not it can be opened.
    pub database_url_set: bool,
    pub environment: RuntimeEnv,
    pub llm: LlmConfig,
    pub chat: ChatConfig,
}

impl AppConfig {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::default())
            .build()?;

        let settings: Settings = settings.try_deserialize()?;
        Self::from_settings(settings)
    }

    pub fn from_settings(settings: Settings) -> Result<Self, ConfigError> {
        let port = match non_empty(&settings.port) {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                key: "PORT",
                value: raw.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let history_limit = match non_empty(&settings.history_limit) {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                key: "HISTORY_LIMIT",
                value: raw.to_string(),
            })?,
            None => DEFAULT_HISTORY_LIMIT,
        };

        let error_policy = match non_empty(&settings.error_policy) {
            Some(raw) => ErrorPolicy::parse(raw).ok_or_else(|| ConfigError::Invalid {
                key: "ERROR_POLICY",
                value: raw.to_string(),
            })?,
            None => ErrorPolicy::default(),
        };

        let openai = non_empty(&settings.openai_api_key).map(|key| OpenAiConfig {
            api_base: non_empty(&settings.openai_api_base)
                .unwrap_or("https://api.openai.com/v1")
                .trim_end_matches('/')
                .to_string(),
            api_key: key.to_string(),
            default_model: non_empty(&settings.openai_model)
                .unwrap_or("gpt-3.5-turbo")
                .to_string(),
        });

        let anthropic = non_empty(&settings.anthropic_api_key).map(|key| AnthropicConfig {
            api_base: non_empty(&settings.anthropic_api_base)
                .unwrap_or("https://api.anthropic.com")
                .trim_end_matches('/')
                .to_string(),
            api_key: key.to_string(),
            default_model: non_empty(&settings.anthropic_model)
                .unwrap_or("claude-3-haiku-20240307")
                .to_string(),
        });

        // An explicit choice wins, otherwise the first provider with a key.
        let provider = match non_empty(&settings.llm_provider) {
            Some(raw) => ProviderKind::parse(raw).ok_or_else(|| ConfigError::Invalid {
                key: "LLM_PROVIDER",
                value: raw.to_string(),
            })?,
            None if openai.is_none() && anthropic.is_some() => ProviderKind::Anthropic,
            None => ProviderKind::OpenAi,
        };

        Ok(AppConfig {
            server: ServerConfig {
                host: non_empty(&settings.host).unwrap_or("0.0.0.0").to_string(),
                port,
            },
            database: non_empty(&settings.database_url).and_then(database_from_url),
            database_url_set: non_empty(&settings.database_url).is_some(),
            environment: RuntimeEnv::parse(non_empty(&settings.node_env)),
            llm: LlmConfig {
                provider,
                openai,
                anthropic,
            },
            chat: ChatConfig {
                history_limit,
                max_tokens: MAX_RESPONSE_TOKENS,
                error_policy,
            },
        })
    }
}

fn non_empty(val: &Option<String>) -> Option<&str> {
    val.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Accepts a bare path, `:memory:` or a `duckdb://` URL. Any other scheme
/// belongs to an engine this server cannot open, so persistence is disabled.
fn database_from_url(url: &str) -> Option<DatabaseConfig> {
    if let Some(path) = url.strip_prefix(DUCKDB_SCHEME) {
        return Some(DatabaseConfig {
            path: path.to_string(),
        });
    }

    if url.contains("://") {
        warn!("DATABASE_URL uses an unsupported scheme, persistence disabled");
        return None;
    }

    Some(DatabaseConfig {
        path: url.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_any_settings() {
        let config = AppConfig::from_settings(Settings::default()).unwrap();

        assert_eq!(config.server.port, 3000);
        assert!(config.database.is_none());
        assert_eq!(config.environment, RuntimeEnv::Development);
        assert_eq!(config.llm.provider, ProviderKind::OpenAi);
        assert!(config.llm.openai.is_none());
        assert!(config.llm.anthropic.is_none());
        assert_eq!(config.chat.history_limit, 5);
        assert_eq!(config.chat.max_tokens, 500);
        assert_eq!(config.chat.error_policy, ErrorPolicy::Graceful);
    }

    #[test]
    fn empty_values_count_as_absent() {
        let settings = Settings {
            port: Some(String::new()),
            database_url: Some("  ".to_string()),
            openai_api_key: Some(String::new()),
            ..Default::default()
        };
        let config = AppConfig::from_settings(settings).unwrap();

        assert_eq!(config.server.port, 3000);
        assert!(config.database.is_none());
        assert!(config.llm.openai.is_none());
    }

    #[test]
    fn anthropic_key_alone_selects_anthropic() {
        let settings = Settings {
            anthropic_api_key: Some("sk-ant".to_string()),
            ..Default::default()
        };
        let config = AppConfig::from_settings(settings).unwrap();

        assert_eq!(config.llm.provider, ProviderKind::Anthropic);
        assert!(config.llm.openai.is_none());
        assert_eq!(
            config.llm.anthropic.unwrap().default_model,
            "claude-3-haiku-20240307"
        );
    }

    #[test]
    fn database_url_schemes() {
        assert_eq!(
            database_from_url("duckdb://data/osint.db"),
            Some(DatabaseConfig {
                path: "data/osint.db".to_string()
            })
        );
        assert!(database_from_url(":memory:").unwrap().is_in_memory());
        assert_eq!(database_from_url("postgres://user@host/db"), None);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let settings = Settings {
            port: Some("eighty".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            AppConfig::from_settings(settings),
            Err(ConfigError::Invalid { key: "PORT", .. })
        ));

        let settings = Settings {
            error_policy: Some("loud".to_string()),
            ..Default::default()
        };
        assert!(AppConfig::from_settings(settings).is_err());
    }

    // The only test that touches the process environment.
    #[test]
    fn load_reads_the_process_environment() {
        let vars = [
            ("PORT", "4321"),
            ("DATABASE_URL", "duckdb://osint-env-test.db"),
            ("ANTHROPIC_API_KEY", "sk-ant-env"),
            ("ERROR_POLICY", "strict"),
            ("NODE_ENV", "production"),
            ("HISTORY_LIMIT", "3"),
        ];
        std::env::remove_var("OPENAI_API_KEY");
        std::env::remove_var("LLM_PROVIDER");
        for (key, value) in vars {
            std::env::set_var(key, value);
        }

        let path = format!("osint-terminal-missing-{}", uuid::Uuid::new_v4());
        let config = AppConfig::load(&path);

        for (key, _) in vars {
            std::env::remove_var(key);
        }
        let config = config.unwrap();

        assert_eq!(config.server.port, 4321);
        assert_eq!(
            config.database,
            Some(DatabaseConfig {
                path: "osint-env-test.db".to_string()
            })
        );
        assert!(config.database_url_set);
        assert_eq!(config.llm.provider, ProviderKind::Anthropic);
        assert_eq!(config.llm.anthropic.unwrap().api_key, "sk-ant-env");
        assert_eq!(config.chat.error_policy, ErrorPolicy::Strict);
        assert_eq!(config.chat.history_limit, 3);
        assert_eq!(config.environment, RuntimeEnv::Production);
    }

    #[test]
    fn production_and_strict_are_recognised() {
        let settings = Settings {
            node_env: Some("production".to_string()),
            error_policy: Some("STRICT".to_string()),
            ..Default::default()
        };
        let config = AppConfig::from_settings(settings).unwrap();

        assert_eq!(config.environment, RuntimeEnv::Production);
        assert_eq!(config.chat.error_policy, ErrorPolicy::Strict);
    }
}
