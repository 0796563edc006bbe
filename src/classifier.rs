use std::sync::OnceLock;

use tracing::info;

use crate::platform::{MessageKind, Sender};
use crate::tables::Tables;

/// Trigger settings shared by the classifier and the normalizer.
///
/// The bot display name is written exactly once, after the transport has
/// established the bot's identity. Until then no group message can trigger.
#[derive(Debug, Default)]
pub struct TriggerConfig {
    bot_name: OnceLock<String>,
    keyword: String,
}

impl TriggerConfig {
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            bot_name: OnceLock::new(),
            keyword: keyword.into(),
        }
    }

    /// Record the bot's display name. Returns false if it was already set.
    pub fn set_bot_name(&self, name: impl Into<String>) -> bool {
        self.bot_name.set(name.into()).is_ok()
    }

    pub fn bot_name(&self) -> Option<&str> {
        self.bot_name.get().map(String::as_str)
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// `@{name} {keyword}`, or `None` before the bot identity is known.
    pub fn group_phrase(&self) -> Option<String> {
        self.bot_name()
            .map(|name| format!("@{} {}", name, self.keyword))
    }

    /// Phrase that must prefix a message in this kind of conversation.
    pub fn trigger_phrase(&self, is_direct: bool) -> Option<String> {
        if is_direct {
            Some(self.keyword.clone())
        } else {
            self.group_phrase()
        }
    }
}

/// True if the message should be ignored without a reply.
pub fn is_nonsense(sender: &Sender, kind: MessageKind, text: &str, tables: &Tables) -> bool {
    sender.is_self
        || !kind.is_plain_content()
        || tables.is_system_account(&sender.display_name)
        || tables.is_placeholder_notice(text)
}

/// True if the raw text carries the trigger for this kind of conversation.
pub fn is_triggered(text: &str, is_direct: bool, trigger: &TriggerConfig) -> bool {
    let triggered = if is_direct {
        trigger.keyword().is_empty() || text.starts_with(trigger.keyword())
    } else {
        trigger
            .group_phrase()
            .is_some_and(|phrase| text.starts_with(&phrase))
    };

    if triggered {
        info!("Chatbot triggered: {}", text);
    }
    triggered
}
