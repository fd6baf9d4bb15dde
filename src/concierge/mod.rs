//! The LLM bridge: turns a visitor's prompt into an answer, using whatever the
//! store remembers about them, and records the exchange.

pub mod prompt;

use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::{ChatConfig, ErrorPolicy};
use crate::db::{NewVisitor, StoreError, VisitorStore};
use crate::llm::{
    models::{ChatOptions, Message},
    LlmError, LlmProvider, ProviderKind,
};
use prompt::SystemContext;

#[derive(Debug, Error)]
pub enum ConciergeError {
    #[error("Unknown visitor {0}")]
    UnknownVisitor(Uuid),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Llm(#[from] LlmError),
}

/// The chat-completion side, resolved once from configuration.
#[derive(Clone)]
pub enum Bridge {
    Live(Arc<dyn LlmProvider>),
    /// No API key for the selected provider.
    Unconfigured(ProviderKind),
}

impl Bridge {
    pub fn kind(&self) -> ProviderKind {
        match self {
            Bridge::Live(provider) => provider.kind(),
            Bridge::Unconfigured(kind) => *kind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Recorded,
    /// No database behind the store.
    NotPersisted,
    /// The write failed and the policy said to carry on.
    Swallowed,
}

/// Fixed reply when the selected provider has no API key.
pub fn not_configured_answer(kind: ProviderKind) -> String {
    format!(
        "SYSTEM: {} API key not configured. Add {} to Railway environment variables.",
        kind.label(),
        kind.env_key()
    )
}

#[derive(Clone)]
pub struct Concierge {
    store: Arc<dyn VisitorStore>,
    bridge: Bridge,
    policy: ErrorPolicy,
    history_limit: usize,
    max_tokens: u32,
}

impl Concierge {
    pub fn new(store: Arc<dyn VisitorStore>, bridge: Bridge, chat: &ChatConfig) -> Self {
        Self {
            store,
            bridge,
            policy: chat.error_policy,
            history_limit: chat.history_limit,
            max_tokens: chat.max_tokens,
        }
    }

    pub fn store(&self) -> &Arc<dyn VisitorStore> {
        &self.store
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    pub async fn record_session(&self, visitor: NewVisitor) -> Result<SessionOutcome, ConciergeError> {
        if !self.store.is_persistent() {
            return Ok(SessionOutcome::NotPersisted);
        }

        let visitor_id = visitor.visitor_id;
        match self.store.upsert_visitor(visitor).await {
            Ok(()) => {
                info!(%visitor_id, "Session recorded");
                Ok(SessionOutcome::Recorded)
            }
            Err(e) => {
                error!(%visitor_id, "Session error: {}", e);
                match self.policy {
                    ErrorPolicy::Graceful => Ok(SessionOutcome::Swallowed),
                    ErrorPolicy::Strict => Err(e.into()),
                }
            }
        }
    }

    /// Visitor row and recent history, when the store has them.
    pub async fn context_for(&self, visitor_id: Uuid) -> Result<SystemContext, ConciergeError> {
        if !self.store.is_persistent() {
            return Ok(SystemContext::anonymous());
        }

        let visitor = match self.store.get_visitor(visitor_id).await {
            Ok(Some(visitor)) => visitor,
            Ok(None) => match self.policy {
                ErrorPolicy::Graceful => return Ok(SystemContext::anonymous()),
                ErrorPolicy::Strict => return Err(ConciergeError::UnknownVisitor(visitor_id)),
            },
            Err(e) => match self.policy {
                ErrorPolicy::Graceful => {
                    warn!(%visitor_id, "Could not fetch visitor info: {}", e);
                    return Ok(SystemContext::anonymous());
                }
                ErrorPolicy::Strict => return Err(e.into()),
            },
        };

        let history = self
            .store
            .recent_conversations(visitor_id, self.history_limit)
            .await
            .unwrap_or_else(|e| {
                warn!(%visitor_id, "Could not fetch conversation history: {}", e);
                Vec::new()
            });

        Ok(SystemContext::new(Some(visitor), history, self.history_limit))
    }

    pub async fn answer(&self, visitor_id: Uuid, prompt: &str) -> Result<String, ConciergeError> {
        let provider = match &self.bridge {
            Bridge::Live(provider) => provider,
            Bridge::Unconfigured(kind) => return Ok(not_configured_answer(*kind)),
        };

        let context = self.context_for(visitor_id).await?;

        let options = ChatOptions {
            max_tokens: Some(self.max_tokens),
            system_prompt: Some(context.render()),
            ..Default::default()
        };

        let response = match provider.chat(&[Message::user(prompt)], options).await {
            Ok(response) => response,
            Err(e) => {
                error!(%visitor_id, "Query error: {}", e);
                return match self.policy {
                    ErrorPolicy::Graceful => Ok(format!(
                        "ERROR: {}. Check your {} API key.",
                        e,
                        provider.kind().label()
                    )),
                    ErrorPolicy::Strict => Err(e.into()),
                };
            }
        };

        info!(%visitor_id, model = %response.model, "Query answered");

        if let Err(e) = self
            .store
            .insert_conversation(visitor_id, prompt, &response.content)
            .await
        {
            warn!(%visitor_id, "Could not store conversation: {}", e);
        }

        Ok(response.content)
    }
}
