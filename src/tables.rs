use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// Built-in copy of `assets/tables.toml`, used when no override path is configured.
const BUILTIN_TABLES: &str = include_str!("../assets/tables.toml");

/// Fixed lookup tables consulted by the classifier and the reply overrides.
#[derive(Debug, Deserialize, Clone)]
pub struct Tables {
    /// Display names of system accounts that are never answered
    #[serde(default)]
    pub system_accounts: Vec<String>,
    /// Transport placeholder notices (call, red envelope, location link)
    #[serde(default)]
    pub placeholder_notices: Vec<String>,
    /// Weekday names, Sunday first
    pub weekday_names: Vec<String>,
    pub moderation: ModerationTable,
    pub weather: WeatherTable,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModerationTable {
    pub refusal: String,
    #[serde(default)]
    pub blocked_terms: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WeatherTable {
    pub keyword: String,
    pub city_not_found: String,
    #[serde(default)]
    pub cities: Vec<String>,
}

impl Tables {
    pub fn builtin() -> Result<Self> {
        Self::parse(BUILTIN_TABLES).context("Built-in tables are invalid")
    }

    /// Load from `path` if given, otherwise fall back to the built-in tables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            info!("Using built-in filter tables");
            return Self::builtin();
        };

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read tables file: {}", path.display()))?;
        let tables = Self::parse(&content)
            .with_context(|| format!("Failed to parse tables file: {}", path.display()))?;

        info!(
            "Loaded tables from {} ({} cities, {} blocked terms)",
            path.display(),
            tables.weather.cities.len(),
            tables.moderation.blocked_terms.len()
        );
        Ok(tables)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let tables: Tables = toml::from_str(content)?;

        if tables.weekday_names.len() != 7 {
            anyhow::bail!(
                "weekday_names must have exactly 7 entries, got {}",
                tables.weekday_names.len()
            );
        }
        if tables.moderation.refusal.is_empty() {
            anyhow::bail!("moderation.refusal must not be empty");
        }
        if tables.weather.keyword.is_empty() {
            anyhow::bail!("weather.keyword must not be empty");
        }
        if tables.weather.city_not_found.is_empty() {
            anyhow::bail!("weather.city_not_found must not be empty");
        }

        Ok(tables)
    }

    /// First blocked term contained in `text`, if any.
    pub fn blocked_term<'a>(&'a self, text: &str) -> Option<&'a str> {
        self.moderation
            .blocked_terms
            .iter()
            .find(|term| !term.is_empty() && text.contains(term.as_str()))
            .map(String::as_str)
    }

    /// First city, in table order, that appears in `text`.
    pub fn find_city<'a>(&'a self, text: &str) -> Option<&'a str> {
        self.weather
            .cities
            .iter()
            .find(|city| !city.is_empty() && text.contains(city.as_str()))
            .map(String::as_str)
    }

    pub fn is_placeholder_notice(&self, text: &str) -> bool {
        self.placeholder_notices
            .iter()
            .any(|notice| !notice.is_empty() && text.contains(notice.as_str()))
    }

    pub fn is_system_account(&self, name: &str) -> bool {
        self.system_accounts.iter().any(|account| account == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_tables_parse() {
        let tables = Tables::builtin().unwrap();
        assert_eq!(tables.weekday_names[0], "星期天");
        assert_eq!(tables.weekday_names[1], "星期一");
        assert_eq!(tables.weather.keyword, "天气");
        assert!(tables.weather.cities.len() > 300);
        assert!(tables.is_system_account("微信团队"));
    }

    #[test]
    fn test_blocked_term() {
        let tables = Tables::builtin().unwrap();
        assert_eq!(tables.blocked_term("说说中国的历史"), Some("中国"));
        assert_eq!(tables.blocked_term("今天吃什么"), None);
    }

    #[test]
    fn test_find_city_uses_table_order() {
        let tables = Tables::builtin().unwrap();
        assert_eq!(tables.find_city("北京市天气怎么样"), Some("北京市"));
        assert_eq!(tables.find_city("上海市和北京市"), Some("北京市"));
        assert_eq!(tables.find_city("火星的天气"), None);
    }

    #[test]
    fn test_placeholder_notice_is_case_sensitive_substring() {
        let tables = Tables::builtin().unwrap();
        assert!(tables.is_placeholder_notice("[收到红包，请在手机上查看]"));
        assert!(tables.is_placeholder_notice(
            "http://x/cgi-bin/mmwebwx-bin/webwxgetpubliclinkimg?url=1"
        ));
        assert!(!tables.is_placeholder_notice("/CGI-BIN/MMWEBWX-BIN/WEBWXGETPUBLICLINKIMG"));
    }

    #[test]
    fn test_wrong_weekday_count_rejected() {
        let err = Tables::parse(
            r#"
weekday_names = ["a", "b"]
[moderation]
refusal = "no"
[weather]
keyword = "w"
city_not_found = "?"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("exactly 7"));
    }

    #[test]
    fn test_load_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            r#"
weekday_names = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"]
[moderation]
refusal = "Not talking about that."
blocked_terms = ["forbidden"]
[weather]
keyword = "weather"
city_not_found = "Unknown city"
cities = ["Paris"]
"#
            .as_bytes(),
        )
        .unwrap();

        let tables = Tables::load(Some(file.path())).unwrap();
        assert_eq!(tables.find_city("weather in Paris"), Some("Paris"));
        assert_eq!(tables.blocked_term("a forbidden topic"), Some("forbidden"));
        assert!(tables.system_accounts.is_empty());
    }
}
