mod defaults;

use crate::cli::Args;
use crate::error::{RelayError, Result};
use std::env;

pub use defaults::{
    is_truthy, ANTHROPIC_VERSION, CLIENT_NAME, CLIENT_VERSION, DEFAULT_API_ENDPOINT,
    FOLLOWUP_MAX_TOKENS, MAX_TOKENS, MCP_PROTOCOL_VERSION, MODEL,
};

pub const API_KEY_VAR: &str = "ANTHROPIC_API_KEY";
pub const BASE_URL_VAR: &str = "ANTHROPIC_BASE_URL";
pub const VERBOSE_VAR: &str = "MCP_RELAY_VERBOSE";

#[derive(Clone)]
pub struct Config {
    pub api_key: String,
    pub api_endpoint: String,
    pub model: String,
    pub max_tokens: u32,
    pub followup_max_tokens: u32,
    pub verbose: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("api_endpoint", &self.api_endpoint)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("followup_max_tokens", &self.followup_max_tokens)
            .field("verbose", &self.verbose)
            .finish()
    }
}

impl Config {
    pub fn from_env_and_args(args: &Args) -> Result<Self> {
        Self::from_vars(args, |key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_vars<F>(args: &Args, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_VAR)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                RelayError::Configuration(format!("{} environment variable not set", API_KEY_VAR))
            })?;

        let api_endpoint = lookup(BASE_URL_VAR)
            .filter(|url| !url.trim().is_empty())
            .map(|url| normalize_endpoint(&url))
            .unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string());

        // CLI flag > env var > default
        let verbose = args.verbose
            || lookup(VERBOSE_VAR)
                .map(|v| is_truthy(&v))
                .unwrap_or(false);

        Ok(Config {
            api_key,
            api_endpoint,
            model: MODEL.to_string(),
            max_tokens: MAX_TOKENS,
            followup_max_tokens: FOLLOWUP_MAX_TOKENS,
            verbose,
        })
    }
}

/// Load a `.env` file from the working directory if there is one.
pub fn load_dotenv() -> std::result::Result<(), dotenvy::Error> {
    match dotenvy::dotenv() {
        Ok(_) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(e),
    }
}

fn normalize_endpoint(base: &str) -> String {
    let base = base.trim();
    if base.ends_with("/v1/messages") {
        base.to_string()
    } else if base.ends_with("/v1") {
        format!("{}/messages", base)
    } else if base.ends_with("/v1/") {
        format!("{}messages", base)
    } else {
        format!("{}/v1/messages", base.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn args(verbose: bool) -> Args {
        Args {
            server: Some("server.py".to_string()),
            verbose,
        }
    }

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_api_key_is_configuration_error() {
        let result = Config::from_vars(&args(false), lookup(&[]));
        assert!(matches!(result, Err(RelayError::Configuration(_))));
    }

    #[test]
    fn test_blank_api_key_is_configuration_error() {
        let result = Config::from_vars(&args(false), lookup(&[(API_KEY_VAR, "  ")]));
        assert!(matches!(result, Err(RelayError::Configuration(_))));
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_vars(&args(false), lookup(&[(API_KEY_VAR, "sk-test")])).unwrap();
        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.api_endpoint, DEFAULT_API_ENDPOINT);
        assert_eq!(config.model, MODEL);
        assert_eq!(config.max_tokens, 2000);
        assert_eq!(config.followup_max_tokens, 1000);
        assert!(!config.verbose);
    }

    #[test]
    fn test_base_url_normalization() {
        assert_eq!(
            normalize_endpoint("http://localhost:8080"),
            "http://localhost:8080/v1/messages"
        );
        assert_eq!(
            normalize_endpoint("http://localhost:8080/"),
            "http://localhost:8080/v1/messages"
        );
        assert_eq!(
            normalize_endpoint("http://localhost:8080/v1"),
            "http://localhost:8080/v1/messages"
        );
        assert_eq!(
            normalize_endpoint("http://localhost:8080/v1/"),
            "http://localhost:8080/v1/messages"
        );
        assert_eq!(
            normalize_endpoint("http://localhost:8080/v1/messages"),
            "http://localhost:8080/v1/messages"
        );
    }

    #[test]
    fn test_verbose_from_flag_or_env() {
        let from_flag = Config::from_vars(&args(true), lookup(&[(API_KEY_VAR, "k")])).unwrap();
        assert!(from_flag.verbose);

        let from_env = Config::from_vars(
            &args(false),
            lookup(&[(API_KEY_VAR, "k"), (VERBOSE_VAR, "YES")]),
        )
        .unwrap();
        assert!(from_env.verbose);

        let off = Config::from_vars(
            &args(false),
            lookup(&[(API_KEY_VAR, "k"), (VERBOSE_VAR, "no")]),
        )
        .unwrap();
        assert!(!off.verbose);
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = Config::from_vars(&args(false), lookup(&[(API_KEY_VAR, "sk-secret")])).unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
