//! Chat relay
//!
//! Answers visitor questions through an external LLM, grounded in a system
//! prompt assembled from the profile facts and the stored projects.

pub mod context;
pub mod provider;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::core::config::AppState;
use crate::core::error::{Error, Result};
use crate::core::extract::ApiJson;
use crate::projects::models::ProjectRecord;
use context::{build_system_prompt, ProfileFacts};
use provider::{ChatTurn, CompletionProvider, ProviderError};

pub const MAX_MESSAGE_CHARS: usize = 4_000;
pub const MAX_HISTORY_TURNS: usize = 20;
pub const FALLBACK_REPLY: &str = "Sorry, I could not generate a response.";

/// Fields are loosely typed; clients send whatever their chat widget holds.
#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Value,
    #[serde(default)]
    pub history: Value,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub success: bool,
    pub content: String,
}

impl ChatRequest {
    /// Validated message plus the usable tail of the history.
    pub fn into_turns(self) -> Result<(String, Vec<ChatTurn>)> {
        let message = match self.message.as_str().map(str::trim) {
            Some(m) if !m.is_empty() => m.to_string(),
            _ => return Err(Error::Validation("Message is required".to_string())),
        };
        if message.chars().count() > MAX_MESSAGE_CHARS {
            return Err(Error::Validation(format!(
                "Message must be at most {} characters",
                MAX_MESSAGE_CHARS
            )));
        }

        let history: Vec<ChatTurn> = self
            .history
            .as_array()
            .map(|entries| entries.iter().filter_map(history_turn).collect())
            .unwrap_or_default();

        let skip = history.len().saturating_sub(MAX_HISTORY_TURNS);
        Ok((message, history.into_iter().skip(skip).collect()))
    }
}

fn history_turn(entry: &Value) -> Option<ChatTurn> {
    let content = entry.get("content")?.as_str()?;
    if content.trim().is_empty() {
        return None;
    }
    match entry.get("role")?.as_str()? {
        "user" => Some(ChatTurn::user(content)),
        "assistant" => Some(ChatTurn::assistant(content)),
        _ => None,
    }
}

pub struct ChatRelay {
    provider: Option<Arc<dyn CompletionProvider>>,
    profile: ProfileFacts,
    timeout: Duration,
}

impl ChatRelay {
    pub fn new(
        provider: Option<Arc<dyn CompletionProvider>>,
        profile: ProfileFacts,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            profile,
            timeout,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    pub fn provider(&self) -> Result<&Arc<dyn CompletionProvider>> {
        self.provider
            .as_ref()
            .ok_or(Error::ServiceNotConfigured("AI service"))
    }

    pub async fn reply(
        &self,
        projects: &[ProjectRecord],
        message: String,
        history: Vec<ChatTurn>,
    ) -> Result<String> {
        let provider = self.provider()?;

        let mut turns = Vec::with_capacity(history.len() + 2);
        turns.push(ChatTurn::system(build_system_prompt(&self.profile, projects)));
        turns.extend(history);
        turns.push(ChatTurn::user(message));

        let reply = match tokio::time::timeout(self.timeout, provider.complete(turns)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(ProviderError::Timeout)) | Err(_) => {
                warn!("[Chat] Provider timed out after {:?}", self.timeout);
                return Err(Error::UpstreamTimeout("AI service timed out".to_string()));
            }
            Ok(Err(e)) => {
                warn!("[Chat] Provider error: {}", e);
                return Err(Error::UpstreamFailure(
                    "Failed to get response from AI service".to_string(),
                ));
            }
        };

        Ok(reply.unwrap_or_else(|| FALLBACK_REPLY.to_string()))
    }
}

/// POST /chat
pub async fn chat(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    info!("POST /chat");

    let (message, history) = req.into_turns()?;
    state.chat.provider()?;

    let projects = state.projects.list().await?;
    let content = state.chat.reply(&projects, message, history).await?;

    Ok(Json(ChatResponse {
        success: true,
        content,
    }))
}
