//! Inbound interaction events and their single-response lifecycle

use crate::error::{transport_error, AppResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tokio::sync::Mutex;
use tracing::debug;

/// What the platform delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Command,
    Button,
    ModalSubmit,
    /// Autocomplete, select menus and anything newer; never routed
    Other,
}

/// The member who triggered the interaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub id: String,
    pub roles: HashSet<String>,
}

impl Caller {
    pub fn new(id: impl Into<String>, roles: impl IntoIterator<Item = String>) -> Self {
        Self {
            id: id.into(),
            roles: roles.into_iter().collect(),
        }
    }

    pub fn has_role(&self, role_id: &str) -> bool {
        self.roles.contains(role_id)
    }
}

/// Immutable facts about one interaction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionEvent {
    pub kind: InteractionKind,
    /// Command name for commands, custom id for buttons and modals
    pub identifier: String,
    pub caller: Caller,
    pub guild_id: Option<String>,
    /// Submitted text inputs of a modal, by field custom id
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

/// A message sent back to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyPayload {
    pub content: String,
    /// Visible to the caller only
    pub ephemeral: bool,
}

impl ReplyPayload {
    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: true,
        }
    }

    pub fn public(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: false,
        }
    }
}

/// Opaque modal description built by a form builder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModalForm {
    pub custom_id: String,
    pub title: String,
    pub components: serde_json::Value,
}

/// Outbound half of an interaction, implemented by the platform client
#[async_trait]
pub trait InteractionTransport: Send + Sync {
    async fn reply(&self, payload: ReplyPayload) -> AppResult<()>;
    async fn defer_reply(&self, ephemeral: bool) -> AppResult<()>;
    async fn edit_reply(&self, content: String) -> AppResult<()>;
    async fn show_modal(&self, form: ModalForm) -> AppResult<()>;
}

/// How far the interaction's single response has progressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseState {
    Unsent,
    /// Acknowledged, final content still owed via `edit_reply`
    Deferred,
    Sent,
}

/// An event plus its transport, tracking the response state.
///
/// Workflows respond through this type so the dispatcher always knows
/// whether a response is still owed.
pub struct Interaction {
    event: InteractionEvent,
    transport: Box<dyn InteractionTransport>,
    state: Mutex<ResponseState>,
}

impl Interaction {
    pub fn new(event: InteractionEvent, transport: impl InteractionTransport + 'static) -> Self {
        Self {
            event,
            transport: Box::new(transport),
            state: Mutex::new(ResponseState::Unsent),
        }
    }

    pub fn event(&self) -> &InteractionEvent {
        &self.event
    }

    pub fn kind(&self) -> InteractionKind {
        self.event.kind
    }

    pub fn identifier(&self) -> &str {
        &self.event.identifier
    }

    pub fn caller(&self) -> &Caller {
        &self.event.caller
    }

    pub fn guild_id(&self) -> Option<&str> {
        self.event.guild_id.as_deref()
    }

    pub fn field(&self, custom_id: &str) -> Option<&str> {
        self.event.fields.get(custom_id).map(String::as_str)
    }

    pub async fn response_state(&self) -> ResponseState {
        *self.state.lock().await
    }

    /// Send the initial response
    pub async fn reply(&self, payload: ReplyPayload) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if *state != ResponseState::Unsent {
            return Err(transport_error("Interaction has already been acknowledged"));
        }
        self.transport.reply(payload).await?;
        *state = ResponseState::Sent;
        debug!("Replied to interaction {}", self.event.identifier);
        Ok(())
    }

    /// Acknowledge now, answer later with [`Interaction::edit_reply`]
    pub async fn defer_reply(&self, ephemeral: bool) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if *state != ResponseState::Unsent {
            return Err(transport_error("Interaction has already been acknowledged"));
        }
        self.transport.defer_reply(ephemeral).await?;
        *state = ResponseState::Deferred;
        Ok(())
    }

    /// Finalize a deferred response, or edit one already sent
    pub async fn edit_reply(&self, content: impl Into<String>) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if *state == ResponseState::Unsent {
            return Err(transport_error("Cannot edit a reply that was never sent"));
        }
        self.transport.edit_reply(content.into()).await?;
        *state = ResponseState::Sent;
        Ok(())
    }

    /// Present a modal as the response
    pub async fn show_modal(&self, form: ModalForm) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if *state != ResponseState::Unsent {
            return Err(transport_error("Interaction has already been acknowledged"));
        }
        self.transport.show_modal(form).await?;
        *state = ResponseState::Sent;
        Ok(())
    }
}
