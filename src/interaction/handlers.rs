//! Seams to the workflows behind the dispatcher
//!
//! Commands, workflows and form builders live outside this crate. They
//! receive the tracked [`Interaction`] and respond through it.

use crate::error::AppResult;
use crate::interaction::{Interaction, ModalForm};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// A registered slash command
#[async_trait]
pub trait SlashCommand: Send + Sync {
    fn name(&self) -> &str;
    async fn execute(&self, interaction: &Interaction) -> AppResult<()>;
}

/// Proposal voting and proposal form submission
#[async_trait]
pub trait ProposalWorkflow: Send + Sync {
    async fn process_vote(&self, interaction: &Interaction) -> AppResult<()>;
    async fn process_form_submission(&self, interaction: &Interaction) -> AppResult<()>;
}

/// Creator review submission
#[async_trait]
pub trait ReviewWorkflow: Send + Sync {
    async fn process_review_submission(&self, interaction: &Interaction) -> AppResult<()>;
}

/// Tribunal application support and tribunal voting
#[async_trait]
pub trait CourtWorkflow: Send + Sync {
    async fn process_support(&self, interaction: &Interaction) -> AppResult<()>;
    async fn process_vote(&self, interaction: &Interaction) -> AppResult<()>;
}

/// Self-moderation buttons and modals
#[async_trait]
pub trait SelfModerationWorkflow: Send + Sync {
    async fn process_interaction(&self, interaction: &Interaction) -> AppResult<()>;
}

/// Builds the modals opened by the form buttons
pub trait FormBuilder: Send + Sync {
    fn build_input_form(&self) -> ModalForm;
    fn build_review_form(&self) -> ModalForm;
}

/// The workflow implementations the dispatcher delegates to
#[derive(Clone)]
pub struct Workflows {
    pub proposals: Arc<dyn ProposalWorkflow>,
    pub reviews: Arc<dyn ReviewWorkflow>,
    pub court: Arc<dyn CourtWorkflow>,
    pub self_moderation: Arc<dyn SelfModerationWorkflow>,
    pub forms: Arc<dyn FormBuilder>,
}

/// Slash commands by name
#[derive(Clone, Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Arc<dyn SlashCommand>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command; a later registration with the same name wins
    pub fn register(&mut self, command: Arc<dyn SlashCommand>) -> &mut Self {
        self.commands.insert(command.name().to_string(), command);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn SlashCommand>> {
        self.commands.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
