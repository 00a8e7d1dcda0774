//! TOML config parsing with environment variable substitution.

use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;

use sluice_core::DispatchConfig;
use sluice_core::domain::DispatchTarget;
use sluice_core::impls::{HttpInvokerConfig, MemoryQueueConfig};

static ENV_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid env var regex"));

#[derive(Debug, Clone, Deserialize)]
pub struct SluiceConfig {
    pub target: DispatchTarget,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub queue: MemoryQueueConfig,
    #[serde(default)]
    pub invoker: InvokerConfig,
    #[serde(default)]
    pub seed: Vec<SeedMessage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum InvokerConfig {
    /// Built-in json-echo function registered under the target's name.
    #[default]
    Local,
    Http(HttpInvokerConfig),
}

impl InvokerConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Http(_) => "http",
        }
    }
}

/// A message put on the queue before the first cycle.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SeedMessage {
    pub body: String,
    #[serde(default = "default_repeat")]
    pub repeat: usize,
}

fn default_repeat() -> usize {
    1
}

impl SluiceConfig {
    /// # Errors
    ///
    /// Returns the first section that fails validation.
    pub fn validate(&self) -> Result<()> {
        self.dispatch.validate()?;
        self.queue.validate()?;
        if let InvokerConfig::Http(http) = &self.invoker {
            http.validate()?;
        }
        Ok(())
    }

    pub fn seeded_messages(&self) -> usize {
        self.seed.iter().map(|s| s.repeat).sum()
    }
}

/// Substitute `${VAR_NAME}` patterns with environment variable values.
///
/// # Errors
///
/// Returns an error naming every referenced variable that is not set.
pub fn substitute_env_vars(input: &str) -> Result<String> {
    let mut result = input.to_string();
    let mut missing = Vec::new();

    for cap in ENV_VAR_RE.captures_iter(input) {
        let var_name = &cap[1];
        match std::env::var(var_name) {
            Ok(val) => result = result.replace(&cap[0], &val),
            Err(_) => missing.push(var_name.to_string()),
        }
    }

    if !missing.is_empty() {
        anyhow::bail!("Missing environment variable(s): {}", missing.join(", "));
    }
    Ok(result)
}

/// Parse and validate a config string (after env var substitution).
pub fn parse_config_str(toml_str: &str) -> Result<SluiceConfig> {
    let substituted = substitute_env_vars(toml_str)?;
    let config: SluiceConfig =
        toml::from_str(&substituted).context("Failed to parse config TOML")?;
    config.validate().context("Invalid config")?;
    Ok(config)
}

pub fn load(path: &Path) -> Result<SluiceConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config_str(&content)
        .with_context(|| format!("Failed to load config: {}", path.display()))
}
