//! Auth service provisioning and verification core
//!
//! Fronts an external identity provider and a local profile store:
//!
//! - `provisioning`: registration, admin creation and group changes as
//!   compensating sagas across the provider and the directory
//! - `codes`: one-time verification codes with expiry and single use
//! - `security`: bearer token validation against the provider key set
//! - `events`: in-process dispatch of post-commit side effects
//! - `services`: account flows and email delivery
//!
//! [`app::AuthApp`] wires everything from [`config::Settings`] and an
//! injected [`gateway::IdentityGateway`].

pub mod app;
pub mod codes;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod gateway;
pub mod models;
pub mod provisioning;
pub mod security;
pub mod services;
pub mod telemetry;
pub mod validators;

pub use app::{AppParts, AuthApp};
pub use error::{ErrorCategory, Result, ServiceError};
