use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::config::WeatherConfig;

/// One day of weather for a city.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct WeatherReport {
    #[serde(default)]
    pub city: String,
    /// Conditions, e.g. "晴"
    #[serde(default)]
    pub wea: String,
    #[serde(default)]
    pub tem: String,
    #[serde(default)]
    pub tem_day: String,
    #[serde(default)]
    pub tem_night: String,
    #[serde(default)]
    pub win: String,
    #[serde(default)]
    pub win_speed: String,
}

impl WeatherReport {
    pub fn summary(&self) -> String {
        format!(
            "{}：{}，当前{}℃（{}~{}℃），{}{}",
            self.city, self.wea, self.tem, self.tem_night, self.tem_day, self.win, self.win_speed
        )
    }
}

#[async_trait]
pub trait WeatherLookup: Send + Sync {
    async fn lookup(&self, city: &str) -> Result<WeatherReport>;
}

/// Client for the tianqiapi daily weather endpoint
pub struct WeatherClient {
    client: reqwest::Client,
    config: WeatherConfig,
}

impl WeatherClient {
    pub fn new(config: WeatherConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl WeatherLookup for WeatherClient {
    async fn lookup(&self, city: &str) -> Result<WeatherReport> {
        debug!("Looking up weather for {}", city);

        let response = self
            .client
            .get(&self.config.base_url)
            .query(&[
                ("appid", self.config.app_id.as_str()),
                ("appsecret", self.config.app_secret.as_str()),
                ("city", city),
            ])
            .send()
            .await
            .with_context(|| format!("Failed to request weather for {}", city))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("Weather API error ({}): {}", status, error_body);
        }

        let mut report: WeatherReport = response
            .json()
            .await
            .context("Failed to parse weather response")?;

        if report.wea.is_empty() {
            anyhow::bail!("Weather API returned no conditions for {}", city);
        }
        if report.city.is_empty() {
            report.city = city.to_string();
        }
        Ok(report)
    }
}
