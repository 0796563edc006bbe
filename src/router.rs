//! Per-message pipeline: classify, clean, resolve, deliver.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::classifier::{is_nonsense, is_triggered, TriggerConfig};
use crate::clock::{format_date, Clock};
use crate::delivery::deliver;
use crate::normalizer::clean;
use crate::platform::{IncomingMessage, Transport};
use crate::resolver::{Resolver, TIME_QUERY};
use crate::tables::Tables;

/// Prompt sent through the completion path once the bot identity is known.
pub const SELF_TEST_PROMPT: &str = "Say Hello World";

/// Line placed between the echoed question and the answer in group replies.
const GROUP_REPLY_SEPARATOR: &str = "\n ---------- \n ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Nonsense,
    NotTriggered,
}

/// How the handling of one message ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ignored(SkipReason),
    /// The "时间" carve-out answered without running the pipeline
    TimeReplied,
    Replied,
    DeliveryFailed,
}

/// Pipeline stages for one message
#[derive(Debug)]
enum Stage {
    Received,
    Classified,
    Cleaned { query: String },
    Resolved { text: String, bypass: bool },
    Done(Outcome),
}

pub struct Router {
    trigger: Arc<TriggerConfig>,
    tables: Arc<Tables>,
    clock: Arc<dyn Clock>,
    resolver: Resolver,
    transport: Arc<dyn Transport>,
    healthy: AtomicBool,
}

impl Router {
    pub fn new(
        trigger: Arc<TriggerConfig>,
        tables: Arc<Tables>,
        clock: Arc<dyn Clock>,
        resolver: Resolver,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            trigger,
            tables,
            clock,
            resolver,
            transport,
            healthy: AtomicBool::new(false),
        }
    }

    /// False until the startup self-test has passed.
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    /// Record the bot's display name and run the completion self-test.
    ///
    /// A failed self-test is logged and leaves the router marked unhealthy;
    /// messages are still handled.
    pub async fn on_identity_established(&self, display_name: &str) -> bool {
        if !self.trigger.set_bot_name(display_name) {
            warn!(
                "Bot name already set to {:?}, ignoring {:?}",
                self.trigger.bot_name().unwrap_or_default(),
                display_name
            );
        }

        info!("Chatbot name is: {}", self.trigger.bot_name().unwrap_or_default());
        info!("Trigger keyword in private chat is: {:?}", self.trigger.keyword());
        info!(
            "Trigger keyword in group chat is: {:?}",
            self.trigger.group_phrase().unwrap_or_default()
        );

        let healthy = match self.resolver.complete(SELF_TEST_PROMPT).await {
            Ok(reply) => {
                info!("Chatbot self-test replied: {}", reply);
                info!("Chatbot started, ready to handle messages");
                true
            }
            Err(e) => {
                error!("Chatbot self-test failed, replies may not work: {:#}", e);
                false
            }
        };
        self.healthy.store(healthy, Ordering::SeqCst);
        healthy
    }

    /// Handle one incoming message. Never fails; problems are logged.
    pub async fn handle(&self, msg: IncomingMessage) -> Outcome {
        let span = info_span!(
            "handle",
            id = %Uuid::new_v4(),
            direct = msg.is_direct(),
            sender = %msg.sender.display_name,
            sender_id = %msg.sender.id,
        );
        self.run(&msg).instrument(span).await
    }

    async fn run(&self, msg: &IncomingMessage) -> Outcome {
        info!("Message: {}", msg.text);

        let mut stage = Stage::Received;
        loop {
            stage = match stage {
                Stage::Done(outcome) => return outcome,
                other => self.step(other, msg).await,
            };
        }
    }

    async fn step(&self, stage: Stage, msg: &IncomingMessage) -> Stage {
        let is_direct = msg.is_direct();

        match stage {
            Stage::Received => {
                if msg.text.starts_with(TIME_QUERY) {
                    let text = format_date(self.clock.today(), &self.tables.weekday_names);
                    return Stage::Resolved { text, bypass: true };
                }
                if is_nonsense(&msg.sender, msg.kind, &msg.text, &self.tables) {
                    return Stage::Done(Outcome::Ignored(SkipReason::Nonsense));
                }
                if !is_triggered(&msg.text, is_direct, &self.trigger) {
                    return Stage::Done(Outcome::Ignored(SkipReason::NotTriggered));
                }
                Stage::Classified
            }
            Stage::Classified => Stage::Cleaned {
                query: clean(&msg.text, is_direct, &self.trigger),
            },
            Stage::Cleaned { query } => {
                let reply = self.resolver.resolve(&query).await;
                let text = if is_direct {
                    reply
                } else {
                    format!("{}{}{}", query, GROUP_REPLY_SEPARATOR, reply)
                };
                Stage::Resolved {
                    text,
                    bypass: false,
                }
            }
            Stage::Resolved { text, bypass } => {
                match deliver(self.transport.as_ref(), &msg.reply_to, &text).await {
                    Ok(()) if bypass => Stage::Done(Outcome::TimeReplied),
                    Ok(()) => Stage::Done(Outcome::Replied),
                    Err(e) => {
                        error!("Failed to deliver reply: {:#}", e);
                        Stage::Done(Outcome::DeliveryFailed)
                    }
                }
            }
            Stage::Done(outcome) => Stage::Done(outcome),
        }
    }
}
