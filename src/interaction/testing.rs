//! Test doubles for the interaction layer

use crate::error::{transport_error, workflow_error, AppResult};
use crate::interaction::{
    Caller, CourtWorkflow, FormBuilder, Interaction, InteractionEvent, InteractionKind,
    InteractionTransport, ModalForm, ProposalWorkflow, ReplyPayload, ReviewWorkflow,
    SelfModerationWorkflow, Workflows,
};
use crate::permission::{RoleDirectory, RoleInfo};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

pub const GUILD: &str = "guild-1";

pub fn event(kind: InteractionKind, identifier: &str) -> InteractionEvent {
    InteractionEvent {
        kind,
        identifier: identifier.to_string(),
        caller: Caller::new("user-1", Vec::new()),
        guild_id: Some(GUILD.to_string()),
        fields: BTreeMap::new(),
    }
}

pub fn button(identifier: &str) -> InteractionEvent {
    event(InteractionKind::Button, identifier)
}

pub fn modal(identifier: &str) -> InteractionEvent {
    event(InteractionKind::ModalSubmit, identifier)
}

pub fn command(name: &str) -> InteractionEvent {
    event(InteractionKind::Command, name)
}

pub fn with_roles(mut event: InteractionEvent, roles: &[&str]) -> InteractionEvent {
    event.caller = Caller::new(event.caller.id.clone(), roles.iter().map(|r| r.to_string()));
    event
}

/// One outbound call made on a transport
#[derive(Debug, Clone, PartialEq)]
pub enum SentCall {
    Reply(ReplyPayload),
    Defer(bool),
    Edit(String),
    Modal(String),
}

/// Records every response; optionally fails every send
#[derive(Clone, Default)]
pub struct RecordingTransport {
    calls: Arc<Mutex<Vec<SentCall>>>,
    fail: bool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<SentCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: SentCall) -> AppResult<()> {
        if self.fail {
            return Err(transport_error("gateway unavailable"));
        }
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

#[async_trait]
impl InteractionTransport for RecordingTransport {
    async fn reply(&self, payload: ReplyPayload) -> AppResult<()> {
        self.record(SentCall::Reply(payload))
    }

    async fn defer_reply(&self, ephemeral: bool) -> AppResult<()> {
        self.record(SentCall::Defer(ephemeral))
    }

    async fn edit_reply(&self, content: String) -> AppResult<()> {
        self.record(SentCall::Edit(content))
    }

    async fn show_modal(&self, form: ModalForm) -> AppResult<()> {
        self.record(SentCall::Modal(form.custom_id))
    }
}

/// How the fake workflows behave when invoked
#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    ReplyOk,
    ReplyThenFail,
    DeferThenFail,
    Fail,
    Panic,
}

/// Implements every workflow seam and remembers which one ran
#[derive(Clone)]
pub struct WorkflowRecorder {
    invoked: Arc<Mutex<Vec<&'static str>>>,
    behavior: Behavior,
}

impl WorkflowRecorder {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            invoked: Arc::new(Mutex::new(Vec::new())),
            behavior,
        }
    }

    pub fn workflows(&self) -> Workflows {
        let this = Arc::new(self.clone());
        Workflows {
            proposals: this.clone(),
            reviews: this.clone(),
            court: this.clone(),
            self_moderation: this.clone(),
            forms: this,
        }
    }

    pub fn invoked(&self) -> Vec<&'static str> {
        self.invoked.lock().unwrap().clone()
    }

    pub fn take(&self) -> Vec<&'static str> {
        std::mem::take(&mut *self.invoked.lock().unwrap())
    }

    async fn act(&self, name: &'static str, interaction: &Interaction) -> AppResult<()> {
        self.invoked.lock().unwrap().push(name);
        match self.behavior {
            Behavior::ReplyOk => interaction.reply(ReplyPayload::ephemeral("ok")).await,
            Behavior::ReplyThenFail => {
                interaction.reply(ReplyPayload::ephemeral("vote recorded")).await?;
                Err(workflow_error("tally update failed"))
            }
            Behavior::DeferThenFail => {
                interaction.defer_reply(true).await?;
                Err(workflow_error("thread creation failed"))
            }
            Behavior::Fail => Err(workflow_error("record not found")),
            Behavior::Panic => panic!("workflow bug"),
        }
    }
}

#[async_trait]
impl ProposalWorkflow for WorkflowRecorder {
    async fn process_vote(&self, interaction: &Interaction) -> AppResult<()> {
        self.act("proposals.vote", interaction).await
    }

    async fn process_form_submission(&self, interaction: &Interaction) -> AppResult<()> {
        self.act("proposals.form", interaction).await
    }
}

#[async_trait]
impl ReviewWorkflow for WorkflowRecorder {
    async fn process_review_submission(&self, interaction: &Interaction) -> AppResult<()> {
        self.act("reviews.submission", interaction).await
    }
}

#[async_trait]
impl CourtWorkflow for WorkflowRecorder {
    async fn process_support(&self, interaction: &Interaction) -> AppResult<()> {
        self.act("court.support", interaction).await
    }

    async fn process_vote(&self, interaction: &Interaction) -> AppResult<()> {
        self.act("court.vote", interaction).await
    }
}

#[async_trait]
impl SelfModerationWorkflow for WorkflowRecorder {
    async fn process_interaction(&self, interaction: &Interaction) -> AppResult<()> {
        self.act("self_moderation", interaction).await
    }
}

impl FormBuilder for WorkflowRecorder {
    fn build_input_form(&self) -> ModalForm {
        ModalForm {
            custom_id: "form_submission".to_string(),
            title: "Proposal".to_string(),
            components: serde_json::json!([]),
        }
    }

    fn build_review_form(&self) -> ModalForm {
        ModalForm {
            custom_id: "review_submission".to_string(),
            title: "Review".to_string(),
            components: serde_json::json!([]),
        }
    }
}

/// Role directory with fixed names; `r-broken` always fails to resolve
pub struct StaticRoles {
    names: HashMap<String, String>,
}

impl StaticRoles {
    pub fn new(roles: &[(&str, &str)]) -> Self {
        Self {
            names: roles
                .iter()
                .map(|(id, name)| (id.to_string(), name.to_string()))
                .collect(),
        }
    }
}

#[async_trait]
impl RoleDirectory for StaticRoles {
    async fn fetch_role(&self, _guild_id: &str, role_id: &str) -> AppResult<Option<RoleInfo>> {
        if role_id == "r-broken" {
            return Err(transport_error("unknown role endpoint error"));
        }
        Ok(self.names.get(role_id).map(|name| RoleInfo {
            id: role_id.to_string(),
            name: name.clone(),
        }))
    }
}
