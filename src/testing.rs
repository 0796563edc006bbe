//! In-memory stand-ins for the external collaborators, shared by unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::llm::{Completion, CompletionParams};
use crate::platform::{ConversationTarget, Transport};
use crate::weather::{WeatherLookup, WeatherReport};

/// Completion service returning a canned reply (or error) and recording prompts.
pub struct MockCompletion {
    reply: Result<String, String>,
    delay: Option<Duration>,
    pub prompts: Mutex<Vec<String>>,
}

impl MockCompletion {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            delay: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: &str) -> Self {
        Self {
            reply: Err(error.to_string()),
            delay: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            reply: Ok("too late".to_string()),
            delay: Some(delay),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl Completion for MockCompletion {
    async fn complete(&self, prompt: &str, _params: &CompletionParams) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.reply.clone().map_err(anyhow::Error::msg)
    }
}

/// Weather service returning a fixed report, or failing when `report` is `None`.
pub struct MockWeather {
    report: Option<WeatherReport>,
    delay: Option<Duration>,
    pub cities: Mutex<Vec<String>>,
}

impl MockWeather {
    pub fn sunny() -> Self {
        Self {
            report: Some(WeatherReport {
                city: "北京".to_string(),
                wea: "晴".to_string(),
                tem: "12".to_string(),
                tem_day: "18".to_string(),
                tem_night: "5".to_string(),
                win: "北风".to_string(),
                win_speed: "3级".to_string(),
            }),
            delay: None,
            cities: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            report: None,
            delay: None,
            cities: Mutex::new(Vec::new()),
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::sunny()
        }
    }

    pub fn looked_up(&self) -> Vec<String> {
        self.cities.lock().unwrap().clone()
    }
}

#[async_trait]
impl WeatherLookup for MockWeather {
    async fn lookup(&self, city: &str) -> Result<WeatherReport> {
        self.cities.lock().unwrap().push(city.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.report
            .clone()
            .ok_or_else(|| anyhow::anyhow!("weather service unavailable"))
    }
}

/// Transport that records every send and can fail the n-th one (1-based).
#[derive(Default)]
pub struct RecordingTransport {
    pub sent: Mutex<Vec<(ConversationTarget, String)>>,
    attempts: AtomicUsize,
    fail_on: Option<usize>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(attempt: usize) -> Self {
        Self {
            fail_on: Some(attempt),
            ..Self::default()
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, target: &ConversationTarget, text: &str) -> Result<()> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on == Some(attempt) {
            anyhow::bail!("transport rejected message {}", attempt);
        }
        self.sent
            .lock()
            .unwrap()
            .push((target.clone(), text.to_string()));
        Ok(())
    }
}
