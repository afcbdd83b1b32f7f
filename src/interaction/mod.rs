//! Interaction module - the bot's front door
//!
//! Classifies inbound interactions, applies the form permission gate and
//! delegates to exactly one workflow.

mod dispatcher;
mod event;
mod handlers;
mod route;

#[cfg(test)]
pub(crate) mod testing;

pub use dispatcher::{DispatchOutcome, Dispatcher, FAILURE_NOTICE};
pub use event::{
    Caller, Interaction, InteractionEvent, InteractionKind, InteractionTransport, ModalForm,
    ReplyPayload, ResponseState,
};
pub use handlers::{
    CommandRegistry, CourtWorkflow, FormBuilder, ProposalWorkflow, ReviewWorkflow,
    SelfModerationWorkflow, SlashCommand, Workflows,
};
pub use route::{classify, Route, Target};
