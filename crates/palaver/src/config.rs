//! Settings read from the environment.

use std::env;
use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::path::PathBuf;

use palaver_core::{Credential, DEFAULT_MAX_TOKENS};
use palaver_openai_model::{OpenAIConfig, OpenAIConfigBuilder};

/// Directory `/save` writes to when none is given.
pub const DEFAULT_SAVE_DIR: &str = "saved_chats";

const API_KEY: &str = "OPENAI_API_KEY";
const BASE_URL: &str = "OPENAI_BASE_URL";
const MODEL: &str = "OPENAI_MODEL";
const SAVE_DIR: &str = "PALAVER_SAVE_DIR";
const MAX_TOKENS: &str = "PALAVER_MAX_TOKENS";

/// A variable that is set but cannot be used.
#[derive(Debug, PartialEq, Eq)]
pub struct ConfigError {
    key: &'static str,
    value: String,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid value for {}: {:?}", self.key, self.value)
    }
}

impl StdError for ConfigError {}

/// Settings of the terminal front end.
///
/// Every variable is optional. A missing API key is not an error here: the
/// key can be entered later with `/key`, and until then every turn fails
/// with a missing credential.
#[derive(Clone, Debug)]
pub struct Config {
    /// `OPENAI_API_KEY`.
    pub api_key: Option<Credential>,
    /// `OPENAI_BASE_URL`, or the provider's default.
    pub base_url: Option<String>,
    /// `OPENAI_MODEL`, or the provider's default.
    pub model: Option<String>,
    /// `PALAVER_SAVE_DIR`, or [`DEFAULT_SAVE_DIR`].
    pub save_dir: PathBuf,
    /// `PALAVER_MAX_TOKENS`, or [`DEFAULT_MAX_TOKENS`].
    pub max_tokens: u32,
}

impl Config {
    /// Reads the settings from the process environment.
    #[inline]
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads the settings through `lookup`. Blank values count as unset.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let max_tokens = match get(MAX_TOKENS) {
            Some(value) => match value.trim().parse() {
                Ok(max_tokens) if max_tokens > 0 => max_tokens,
                _ => {
                    return Err(ConfigError {
                        key: MAX_TOKENS,
                        value,
                    });
                }
            },
            None => DEFAULT_MAX_TOKENS,
        };

        let config = Self {
            api_key: get(API_KEY).map(Credential::new),
            base_url: get(BASE_URL),
            model: get(MODEL),
            save_dir: get(SAVE_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SAVE_DIR)),
            max_tokens,
        };
        debug!(?config, "loaded configuration");
        Ok(config)
    }

    /// Returns the provider configuration.
    pub fn openai_config(&self) -> OpenAIConfig {
        let mut builder = OpenAIConfigBuilder::default();
        if let Some(model) = &self.model {
            builder = builder.with_model(model);
        }
        if let Some(base_url) = &self.base_url {
            builder = builder.with_base_url(base_url);
        }
        builder.build()
    }
}
