//! Guild Governance core
//!
//! Interaction routing and JSON document persistence for a community
//! governance bot. Workflows (proposals, creator review, tribunal,
//! self-moderation) plug in through the traits in [`interaction`] and read
//! or write state through [`repository`].

pub mod config;
pub mod error;
pub mod interaction;
pub mod permission;
pub mod repository;
pub mod state;
pub mod store;

pub use error::{AppError, AppResult};
