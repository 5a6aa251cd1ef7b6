use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::{info, warn};

use shelfbot_core::config::LlmConfig;

use crate::catalog::{CatalogRepositories, CatalogService};
use crate::context::{chat_prompt, ContextAggregator};
use crate::describe::DescriptionCascade;
use crate::dispatcher::CommandDispatcher;
use crate::extract::{self, ExtractedFields, FieldKey};
use crate::intent::{Command, Intent};
use crate::llm::{client_from_config, LlmClient, LlmError};

pub const EMPTY_MESSAGE_REPLY: &str = "Please provide a message.";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    #[default]
    Structured,
    Ai,
}

impl ChatMode {
    /// `ai` in any case selects the generative path; anything else is structured.
    pub fn from_request(raw: Option<&str>) -> Self {
        raw.and_then(|value| value.parse().ok()).unwrap_or_default()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Structured => "structured",
            Self::Ai => "ai",
        }
    }
}

impl FromStr for ChatMode {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ai" => Ok(Self::Ai),
            "structured" => Ok(Self::Structured),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ChatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ChatReply {
    pub response: String,
    pub mode: ChatMode,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct BatchReply {
    /// Serialized as `{"query_1": ..., "query_2": ...}` in input order.
    #[serde(serialize_with = "numbered_queries")]
    pub responses: Vec<String>,
    pub mode: ChatMode,
    pub processed_count: usize,
    pub timestamp: DateTime<Utc>,
}

fn numbered_queries<S: Serializer>(responses: &[String], serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(responses.len()))?;
    for (index, response) in responses.iter().enumerate() {
        map.serialize_entry(&format!("query_{}", index + 1), response)?;
    }
    map.end()
}

/// Response router: creation pre-check, then the generative path for `ai`
/// mode, otherwise classify, extract and dispatch.
#[derive(Clone)]
pub struct AgentRuntime {
    dispatcher: CommandDispatcher,
    context: ContextAggregator,
    llm: Arc<dyn LlmClient>,
    llm_timeout: Duration,
}

impl AgentRuntime {
    pub fn new(repos: CatalogRepositories, llm: Arc<dyn LlmClient>, llm_timeout: Duration) -> Self {
        let describer = DescriptionCascade::new(llm.clone(), llm_timeout);
        let catalog = CatalogService::new(repos.clone(), describer);
        Self {
            dispatcher: CommandDispatcher::new(catalog),
            context: ContextAggregator::new(repos),
            llm,
            llm_timeout,
        }
    }

    pub fn from_config(repos: CatalogRepositories, config: &LlmConfig) -> Self {
        Self::new(repos, client_from_config(config), Duration::from_secs(config.timeout_secs))
    }

    pub fn catalog(&self) -> &CatalogService {
        self.dispatcher.catalog()
    }

    pub async fn handle_message(&self, text: &str, mode: ChatMode) -> ChatReply {
        ChatReply { response: self.respond(text, mode).await, mode, timestamp: Utc::now() }
    }

    /// Runs every message in order. One message failing never stops the rest.
    pub async fn handle_batch(&self, messages: &[String], mode: ChatMode) -> BatchReply {
        let mut responses = Vec::with_capacity(messages.len());
        for message in messages {
            responses.push(self.respond(message, mode).await);
        }

        info!(event_name = "chat.batch_processed", mode = %mode, count = responses.len());
        BatchReply { processed_count: responses.len(), responses, mode, timestamp: Utc::now() }
    }

    pub async fn respond(&self, text: &str, mode: ChatMode) -> String {
        let command = Command::new(text);
        if command.normalized_text.is_empty() {
            return EMPTY_MESSAGE_REPLY.to_owned();
        }
        info!(event_name = "chat.message_received", mode = %mode, chars = text.chars().count());

        if is_creation_request(&command) {
            let fields = ExtractedFields::from_text(&command.raw_text);
            return self.dispatcher.dispatch(Intent::CreateProduct, &fields, &command).await;
        }

        match mode {
            ChatMode::Ai => self.answer_with_context(&command.raw_text).await,
            ChatMode::Structured => self.dispatcher.handle(&command).await,
        }
    }

    async fn answer_with_context(&self, query: &str) -> String {
        let snapshot = self.context.build_snapshot().await;
        let prompt = chat_prompt(&snapshot, query);

        let outcome = match tokio::time::timeout(self.llm_timeout, self.llm.complete(&prompt)).await {
            Ok(Ok(reply)) if !reply.trim().is_empty() => return reply.trim().to_owned(),
            Ok(Ok(_)) => LlmError::MalformedResponse,
            Ok(Err(error)) => error,
            Err(_) => LlmError::Timeout(self.llm_timeout),
        };

        warn!(event_name = "chat.ai_failed", error = %outcome);
        format!("Sorry, I couldn't process your request at the moment. Error: {outcome}")
    }
}

/// "create/add ... product" with an extractable title and no mention of a
/// variant goes straight to creation, whatever the mode.
fn is_creation_request(command: &Command) -> bool {
    let text = &command.normalized_text;
    (text.contains("create") || text.contains("add"))
        && text.contains("product")
        && !text.contains("variant")
        && extract::extract(&command.raw_text, FieldKey::Title).is_some()
}
