use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub llm: LlmConfig,
    #[serde(default)]
    pub trigger: TriggerSettings,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub tables: TablesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    /// Sent as the `OpenAI-Organization` header when set
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Trigger settings. An empty keyword means every direct message is answered.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct TriggerSettings {
    #[serde(default)]
    pub keyword: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WeatherConfig {
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub app_secret: String,
    #[serde(default = "default_weather_timeout_secs")]
    pub timeout_secs: u64,
}

impl WeatherConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: default_weather_base_url(),
            app_id: String::new(),
            app_secret: String::new(),
            timeout_secs: default_weather_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TablesConfig {
    /// Optional override for the built-in filter tables
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "text-davinci-003".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_llm_timeout_secs() -> u64 {
    60
}

fn default_weather_base_url() -> String {
    "https://www.tianqiapi.com/free/day".to_string()
}

fn default_weather_timeout_secs() -> u64 {
    10
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;

        if config.telegram.bot_token.trim().is_empty() {
            anyhow::bail!("telegram.bot_token must not be empty");
        }
        if config.llm.api_key.trim().is_empty() {
            anyhow::bail!("llm.api_key must not be empty");
        }

        Ok(config)
    }
}
