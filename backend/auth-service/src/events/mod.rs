/// In-process domain events
///
/// Use cases publish an [`IdentityEvent`] after their primary transaction
/// commits; handlers run on their own tasks and can never fail the publisher.
pub mod dispatcher;
pub mod handlers;

use crate::validators;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use dispatcher::EventDispatcher;
pub use handlers::SendConfirmationHandler;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    UserRegistered,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::UserRegistered => "user.registered",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IdentityEvent {
    UserRegistered {
        email: String,
        needs_verification: bool,
    },
}

impl IdentityEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            IdentityEvent::UserRegistered { .. } => EventType::UserRegistered,
        }
    }

    pub fn validate(&self) -> Result<(), DispatchError> {
        match self {
            IdentityEvent::UserRegistered { email, .. } => {
                if !validators::validate_email(email) {
                    return Err(DispatchError::InvalidEvent(
                        "user.registered requires a valid email".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    #[error("no async runtime available to run handlers")]
    NoRuntime,
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    async fn handle(&self, event: &IdentityEvent) -> crate::error::Result<()>;
}
