//! Interaction dispatcher
//!
//! Routes each interaction to exactly one handler and guarantees the caller
//! gets exactly one terminal response, even when the handler fails or panics.

use crate::error::AppError;
use crate::interaction::{
    classify, CommandRegistry, Interaction, ReplyPayload, ResponseState, Route, Target, Workflows,
};
use crate::permission::{denied_message, is_permitted, resolve_role_names, RoleDirectory};
use crate::repository::{FormPermissionSettings, SettingsRepository};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info_span, warn, Instrument};

/// Generic notice shown when a handler fails
pub const FAILURE_NOTICE: &str = "An error occurred while processing your request.";

/// What happened to a dispatched interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Handled,
    /// Refused by the permission gate, explanation sent
    Denied,
    /// No route or no registered command; nothing was sent
    Ignored,
    /// The handler failed; a failure notice was sent if a response was owed
    Failed,
}

pub struct Dispatcher {
    commands: CommandRegistry,
    workflows: Workflows,
    form_permissions: SettingsRepository,
    roles: Arc<dyn RoleDirectory>,
}

impl Dispatcher {
    pub fn new(
        commands: CommandRegistry,
        workflows: Workflows,
        form_permissions: SettingsRepository,
        roles: Arc<dyn RoleDirectory>,
    ) -> Self {
        if commands.is_empty() {
            warn!("Dispatcher built without slash commands");
        } else {
            debug!("Dispatcher built with {} slash commands", commands.len());
        }
        Self {
            commands,
            workflows,
            form_permissions,
            roles,
        }
    }

    /// Handle one interaction. Never fails; errors end as a failure notice.
    pub async fn dispatch(&self, interaction: &Interaction) -> DispatchOutcome {
        let route = classify(interaction.kind(), interaction.identifier());
        let span = info_span!(
            "interaction",
            kind = ?interaction.kind(),
            id = %interaction.identifier(),
            caller = %interaction.caller().id,
        );

        async {
            let result = AssertUnwindSafe(self.route(interaction, &route))
                .catch_unwind()
                .await;

            match result {
                Ok(Ok(outcome)) => {
                    debug!(?outcome, "Interaction finished");
                    outcome
                }
                Ok(Err(e)) => {
                    error!(code = e.code(), ?route, "Interaction handler failed: {}", e);
                    self.send_failure_notice(interaction).await;
                    DispatchOutcome::Failed
                }
                Err(panic) => {
                    let e = AppError::Internal(panic_message(panic.as_ref()));
                    error!(code = e.code(), ?route, "Interaction handler panicked: {}", e);
                    self.send_failure_notice(interaction).await;
                    DispatchOutcome::Failed
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn route(&self, interaction: &Interaction, route: &Route) -> Result<DispatchOutcome, AppError> {
        let target = match route {
            Route::Ignored => {
                debug!("No route for interaction");
                return Ok(DispatchOutcome::Ignored);
            }
            Route::Command(name) => {
                let Some(command) = self.commands.get(name) else {
                    warn!("Unregistered command '{}'", name);
                    return Ok(DispatchOutcome::Ignored);
                };
                command.execute(interaction).await?;
                return Ok(DispatchOutcome::Handled);
            }
            Route::Target(target) => *target,
        };

        let workflows = &self.workflows;
        match target {
            Target::OpenForm => return self.open_form(interaction).await,
            Target::OpenReviewForm => {
                interaction.show_modal(workflows.forms.build_review_form()).await?;
            }
            Target::ProposalVote => workflows.proposals.process_vote(interaction).await?,
            Target::FormSubmission => workflows.proposals.process_form_submission(interaction).await?,
            Target::ReviewSubmission => workflows.reviews.process_review_submission(interaction).await?,
            Target::CourtSupport => workflows.court.process_support(interaction).await?,
            Target::CourtVote => workflows.court.process_vote(interaction).await?,
            Target::SelfModeration => workflows.self_moderation.process_interaction(interaction).await?,
        }
        Ok(DispatchOutcome::Handled)
    }

    /// Apply the guild's form policy before showing the proposal form
    async fn open_form(&self, interaction: &Interaction) -> Result<DispatchOutcome, AppError> {
        let policy = match interaction.guild_id() {
            Some(guild_id) => {
                self.form_permissions
                    .get_typed::<FormPermissionSettings>(guild_id)
                    .await
            }
            None => None,
        };

        if !is_permitted(interaction.caller(), policy.as_ref()) {
            let role_ids = policy.map(|p| p.allowed_roles).unwrap_or_default();
            let guild_id = interaction.guild_id().unwrap_or_default();
            let names = resolve_role_names(self.roles.as_ref(), guild_id, &role_ids).await;

            debug!("Form permission denied");
            interaction
                .reply(ReplyPayload::ephemeral(denied_message(&names)))
                .await?;
            return Ok(DispatchOutcome::Denied);
        }

        interaction
            .show_modal(self.workflows.forms.build_input_form())
            .await?;
        Ok(DispatchOutcome::Handled)
    }

    /// Send the generic notice if the interaction still owes a response
    async fn send_failure_notice(&self, interaction: &Interaction) {
        let result = match interaction.response_state().await {
            ResponseState::Unsent => interaction.reply(ReplyPayload::ephemeral(FAILURE_NOTICE)).await,
            ResponseState::Deferred => interaction.edit_reply(FAILURE_NOTICE).await,
            ResponseState::Sent => {
                debug!("Response already sent, no failure notice");
                return;
            }
        };

        if let Err(e) = result {
            error!(code = e.code(), "Failed to send failure notice: {}", e);
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::testing::*;
    use crate::error::{workflow_error, AppResult};
    use crate::interaction::{InteractionEvent, InteractionKind, SlashCommand};
    use crate::store::{DocumentStore, MemoryBackend};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    struct Harness {
        dispatcher: Dispatcher,
        recorder: WorkflowRecorder,
        form_permissions: SettingsRepository,
    }

    async fn harness_with(commands: CommandRegistry, behavior: Behavior) -> Harness {
        let store = Arc::new(DocumentStore::open(Arc::new(MemoryBackend::new())).await.unwrap());
        let form_permissions = SettingsRepository::form_permissions(store);
        let recorder = WorkflowRecorder::new(behavior);
        let dispatcher = Dispatcher::new(
            commands,
            recorder.workflows(),
            form_permissions.clone(),
            Arc::new(StaticRoles::new(&[("r-mod", "Moderator"), ("r-cit", "Citizen")])),
        );
        Harness {
            dispatcher,
            recorder,
            form_permissions,
        }
    }

    async fn harness(behavior: Behavior) -> Harness {
        harness_with(CommandRegistry::new(), behavior).await
    }

    async fn run(h: &Harness, event: InteractionEvent) -> (DispatchOutcome, RecordingTransport) {
        let transport = RecordingTransport::new();
        let interaction = Interaction::new(event, transport.clone());
        (h.dispatcher.dispatch(&interaction).await, transport)
    }

    #[tokio::test]
    async fn test_court_vote_never_reaches_proposal_vote() {
        let h = harness(Behavior::ReplyOk).await;

        let (outcome, _) = run(&h, button("court_vote_support_42")).await;

        assert_eq!(outcome, DispatchOutcome::Handled);
        assert_eq!(h.recorder.invoked(), vec!["court.vote"]);
    }

    #[tokio::test]
    async fn test_each_route_invokes_one_workflow() {
        let h = harness(Behavior::ReplyOk).await;
        let cases = [
            (button("support_1"), "proposals.vote"),
            (button("court_support_1"), "court.support"),
            (button("court_vote_oppose_1"), "court.vote"),
            (button("selfmod_delete_1"), "self_moderation"),
            (modal("form_submission"), "proposals.form"),
            (modal("review_submission"), "reviews.submission"),
            (modal("selfmod_modal_mute"), "self_moderation"),
        ];

        for (event, expected) in cases {
            let (outcome, transport) = run(&h, event).await;
            assert_eq!(outcome, DispatchOutcome::Handled);
            assert_eq!(transport.calls().len(), 1);
            assert_eq!(h.recorder.take(), vec![expected]);
        }
    }

    #[tokio::test]
    async fn test_unknown_identifier_is_silent() {
        let h = harness(Behavior::ReplyOk).await;

        let (outcome, transport) = run(&h, button("mystery")).await;

        assert_eq!(outcome, DispatchOutcome::Ignored);
        assert!(transport.calls().is_empty());
        assert!(h.recorder.invoked().is_empty());
    }

    #[tokio::test]
    async fn test_unregistered_command_is_silent() {
        let h = harness(Behavior::ReplyOk).await;

        let (outcome, transport) = run(&h, command("nope")).await;

        assert_eq!(outcome, DispatchOutcome::Ignored);
        assert!(transport.calls().is_empty());
    }

    struct PingCommand;

    #[async_trait]
    impl SlashCommand for PingCommand {
        fn name(&self) -> &str {
            "ping"
        }

        async fn execute(&self, interaction: &Interaction) -> AppResult<()> {
            interaction.reply(ReplyPayload::ephemeral("pong")).await
        }
    }

    struct BrokenCommand;

    #[async_trait]
    impl SlashCommand for BrokenCommand {
        fn name(&self) -> &str {
            "broken"
        }

        async fn execute(&self, _interaction: &Interaction) -> AppResult<()> {
            Err(workflow_error("settings missing"))
        }
    }

    #[tokio::test]
    async fn test_registered_commands() {
        let mut commands = CommandRegistry::new();
        assert!(commands.is_empty());
        commands
            .register(Arc::new(PingCommand))
            .register(Arc::new(BrokenCommand))
            .register(Arc::new(PingCommand));
        assert_eq!(commands.len(), 2);
        let h = harness_with(commands, Behavior::ReplyOk).await;

        let (outcome, transport) = run(&h, command("ping")).await;
        assert_eq!(outcome, DispatchOutcome::Handled);
        assert_eq!(transport.calls(), vec![SentCall::Reply(ReplyPayload::ephemeral("pong"))]);

        let (outcome, transport) = run(&h, command("broken")).await;
        assert_eq!(outcome, DispatchOutcome::Failed);
        assert_eq!(transport.calls(), vec![SentCall::Reply(ReplyPayload::ephemeral(FAILURE_NOTICE))]);
    }

    #[tokio::test]
    async fn test_failure_after_reply_sends_nothing_more() {
        let h = harness(Behavior::ReplyThenFail).await;

        let (outcome, transport) = run(&h, button("support_7")).await;

        assert_eq!(outcome, DispatchOutcome::Failed);
        assert_eq!(
            transport.calls(),
            vec![SentCall::Reply(ReplyPayload::ephemeral("vote recorded"))]
        );
    }

    #[tokio::test]
    async fn test_failure_before_reply_sends_notice() {
        let h = harness(Behavior::Fail).await;

        let (outcome, transport) = run(&h, modal("form_submission")).await;

        assert_eq!(outcome, DispatchOutcome::Failed);
        assert_eq!(
            transport.calls(),
            vec![SentCall::Reply(ReplyPayload::ephemeral(FAILURE_NOTICE))]
        );
    }

    #[tokio::test]
    async fn test_failure_after_defer_edits_reply() {
        let h = harness(Behavior::DeferThenFail).await;

        let (outcome, transport) = run(&h, button("court_support_3")).await;

        assert_eq!(outcome, DispatchOutcome::Failed);
        assert_eq!(
            transport.calls(),
            vec![SentCall::Defer(true), SentCall::Edit(FAILURE_NOTICE.to_string())]
        );
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let h = harness(Behavior::Panic).await;

        let (outcome, transport) = run(&h, button("selfmod_x")).await;

        assert_eq!(outcome, DispatchOutcome::Failed);
        assert_eq!(
            transport.calls(),
            vec![SentCall::Reply(ReplyPayload::ephemeral(FAILURE_NOTICE))]
        );
    }

    #[tokio::test]
    async fn test_notice_send_failure_is_swallowed() {
        let h = harness(Behavior::Fail).await;
        let interaction = Interaction::new(button("support_1"), RecordingTransport::failing());

        assert_eq!(h.dispatcher.dispatch(&interaction).await, DispatchOutcome::Failed);
    }

    #[tokio::test]
    async fn test_open_form_without_policy_shows_modal() {
        let h = harness(Behavior::ReplyOk).await;

        let (outcome, transport) = run(&h, button("open_form")).await;

        assert_eq!(outcome, DispatchOutcome::Handled);
        assert_eq!(transport.calls(), vec![SentCall::Modal("form_submission".to_string())]);
    }

    #[tokio::test]
    async fn test_open_form_with_matching_role() {
        let h = harness(Behavior::ReplyOk).await;
        h.form_permissions
            .save(GUILD, json!({"allowedRoles": ["r-mod", "r-cit"]}))
            .await
            .unwrap();

        let event = with_roles(button("open_form"), &["r-cit"]);
        let (outcome, transport) = run(&h, event).await;

        assert_eq!(outcome, DispatchOutcome::Handled);
        assert_eq!(transport.calls(), vec![SentCall::Modal("form_submission".to_string())]);
    }

    #[tokio::test]
    async fn test_open_form_denied_lists_resolvable_roles() {
        let h = harness(Behavior::ReplyOk).await;
        h.form_permissions
            .save(GUILD, json!({"allowedRoles": ["r-mod", "r-gone", "r-broken", "r-cit"]}))
            .await
            .unwrap();

        let (outcome, transport) = run(&h, button("open_form")).await;

        assert_eq!(outcome, DispatchOutcome::Denied);
        assert_eq!(
            transport.calls(),
            vec![SentCall::Reply(ReplyPayload::ephemeral(denied_message(&[
                "Moderator".to_string(),
                "Citizen".to_string(),
            ])))]
        );
        assert!(h.recorder.invoked().is_empty());
    }

    #[tokio::test]
    async fn test_review_form_has_no_gate() {
        let h = harness(Behavior::ReplyOk).await;
        h.form_permissions
            .save(GUILD, json!({"allowedRoles": ["r-mod"]}))
            .await
            .unwrap();

        let (outcome, transport) = run(&h, button("open_review_form")).await;

        assert_eq!(outcome, DispatchOutcome::Handled);
        assert_eq!(transport.calls(), vec![SentCall::Modal("review_submission".to_string())]);
    }

    #[tokio::test]
    async fn test_other_kinds_ignored() {
        let h = harness(Behavior::ReplyOk).await;
        let mut event = button("support_1");
        event.kind = InteractionKind::Other;

        let (outcome, transport) = run(&h, event).await;

        assert_eq!(outcome, DispatchOutcome::Ignored);
        assert!(transport.calls().is_empty());
    }
}
