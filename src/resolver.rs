//! Reply resolution: ordered override rules, then the completion service.
//!
//! Rules are checked in order against the cleaned user query. The first rule
//! that matches *and* produces a reply wins; a rule that matches but yields
//! nothing lets evaluation continue. When no rule answers, the query is
//! wrapped in the persona template and sent to the completion service.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::clock::{format_date, Clock};
use crate::llm::{Completion, CompletionParams};
use crate::tables::Tables;
use crate::weather::WeatherLookup;

/// User-visible reply when the completion service fails.
pub const COMPLETION_FAILURE: &str = "🤖️：AI机器人摆烂了，请稍后再试～";

/// Query answered with today's date instead of a completion.
pub const TIME_QUERY: &str = "时间";

/// Wrap a user query in the chatbot persona prompt.
pub fn apply_context(text: &str) -> String {
    format!(
        "You are an artificial intelligence bot from a company called \"OpenAI\". \
         Your primary tasks are chatting with users and answering their questions.\n\
         If the user says: {}.\nYou will say: ",
        text
    )
}

/// A short-circuiting check applied before the completion service.
#[async_trait]
pub trait OverrideRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn matches(&self, text: &str) -> bool;

    /// Reply for a matching query, or `None` to fall through to the next rule.
    async fn resolve(&self, text: &str) -> Option<String>;
}

/// Answers the bare time query with the formatted current date.
pub struct TimeQueryRule {
    clock: Arc<dyn Clock>,
    tables: Arc<Tables>,
}

impl TimeQueryRule {
    pub fn new(clock: Arc<dyn Clock>, tables: Arc<Tables>) -> Self {
        Self { clock, tables }
    }
}

#[async_trait]
impl OverrideRule for TimeQueryRule {
    fn name(&self) -> &'static str {
        "time"
    }

    fn matches(&self, text: &str) -> bool {
        text.trim() == TIME_QUERY
    }

    async fn resolve(&self, _text: &str) -> Option<String> {
        Some(format_date(self.clock.today(), &self.tables.weekday_names))
    }
}

/// Refuses queries containing a blocked term.
pub struct ModerationRule {
    tables: Arc<Tables>,
}

impl ModerationRule {
    pub fn new(tables: Arc<Tables>) -> Self {
        Self { tables }
    }
}

#[async_trait]
impl OverrideRule for ModerationRule {
    fn name(&self) -> &'static str {
        "moderation"
    }

    fn matches(&self, text: &str) -> bool {
        self.tables.blocked_term(text).is_some()
    }

    async fn resolve(&self, text: &str) -> Option<String> {
        if let Some(term) = self.tables.blocked_term(text) {
            info!("Refusing query containing blocked term {:?}", term);
        }
        Some(self.tables.moderation.refusal.clone())
    }
}

/// Weather questions: known city gets a lookup, unknown city a fixed reply.
///
/// A failed or timed-out lookup answers with [`COMPLETION_FAILURE`]; the
/// completion service is never consulted for weather queries.
pub struct WeatherRule {
    tables: Arc<Tables>,
    lookup: Arc<dyn WeatherLookup>,
    timeout: Duration,
}

impl WeatherRule {
    pub fn new(tables: Arc<Tables>, lookup: Arc<dyn WeatherLookup>, timeout: Duration) -> Self {
        Self {
            tables,
            lookup,
            timeout,
        }
    }
}

#[async_trait]
impl OverrideRule for WeatherRule {
    fn name(&self) -> &'static str {
        "weather"
    }

    fn matches(&self, text: &str) -> bool {
        text.contains(self.tables.weather.keyword.as_str())
    }

    async fn resolve(&self, text: &str) -> Option<String> {
        let Some(city) = self.tables.find_city(text) else {
            info!("No known city in weather query: {}", text);
            return Some(self.tables.weather.city_not_found.clone());
        };

        match tokio::time::timeout(self.timeout, self.lookup.lookup(city)).await {
            Ok(Ok(report)) => Some(report.summary()),
            Ok(Err(e)) => {
                warn!("Weather lookup for {} failed: {:#}", city, e);
                Some(COMPLETION_FAILURE.to_string())
            }
            Err(_) => {
                warn!("Weather lookup for {} timed out after {:?}", city, self.timeout);
                Some(COMPLETION_FAILURE.to_string())
            }
        }
    }
}

/// Turns a cleaned user query into exactly one non-empty reply.
pub struct Resolver {
    rules: Vec<Box<dyn OverrideRule>>,
    completion: Arc<dyn Completion>,
    params: CompletionParams,
    timeout: Duration,
}

impl Resolver {
    /// A resolver with no override rules
    pub fn new(
        completion: Arc<dyn Completion>,
        params: CompletionParams,
        timeout: Duration,
    ) -> Self {
        Self {
            rules: Vec::new(),
            completion,
            params,
            timeout,
        }
    }

    /// Append a rule; rules run in the order they were added.
    pub fn with_rule(mut self, rule: impl OverrideRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Time query, then moderation, then weather, then completion.
    pub fn standard(
        tables: Arc<Tables>,
        clock: Arc<dyn Clock>,
        weather: Arc<dyn WeatherLookup>,
        weather_timeout: Duration,
        completion: Arc<dyn Completion>,
        params: CompletionParams,
        completion_timeout: Duration,
    ) -> Self {
        Self::new(completion, params, completion_timeout)
            .with_rule(TimeQueryRule::new(clock, tables.clone()))
            .with_rule(ModerationRule::new(tables.clone()))
            .with_rule(WeatherRule::new(tables, weather, weather_timeout))
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    pub async fn resolve(&self, text: &str) -> String {
        for rule in &self.rules {
            if !rule.matches(text) {
                continue;
            }
            if let Some(reply) = rule.resolve(text).await {
                debug!("Override rule '{}' answered", rule.name());
                return reply;
            }
            debug!("Override rule '{}' matched but deferred", rule.name());
        }

        match self.complete(text).await {
            Ok(reply) => {
                info!("Chatbot says: {}", reply);
                reply
            }
            Err(e) => {
                error!("Completion failed: {:#}", e);
                COMPLETION_FAILURE.to_string()
            }
        }
    }

    /// Ask the completion service directly, bypassing the override rules.
    pub async fn complete(&self, text: &str) -> Result<String> {
        let prompt = apply_context(text);

        let request = self.completion.complete(&prompt, &self.params);
        let reply = tokio::time::timeout(self.timeout, request)
            .await
            .with_context(|| format!("Completion timed out after {:?}", self.timeout))??;

        let reply = reply.trim();
        if reply.is_empty() {
            anyhow::bail!("Completion service returned an empty reply");
        }
        Ok(reply.to_string())
    }
}
