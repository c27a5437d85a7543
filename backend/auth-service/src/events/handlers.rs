use super::{EventHandler, IdentityEvent};
use crate::error::Result;
use crate::services::AccountService;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Sends the sign-up confirmation code after a registration.
pub struct SendConfirmationHandler {
    accounts: Arc<AccountService>,
}

impl SendConfirmationHandler {
    pub fn new(accounts: Arc<AccountService>) -> Self {
        Self { accounts }
    }
}

#[async_trait]
impl EventHandler for SendConfirmationHandler {
    fn name(&self) -> &'static str {
        "send_confirmation_code"
    }

    async fn handle(&self, event: &IdentityEvent) -> Result<()> {
        match event {
            IdentityEvent::UserRegistered {
                email,
                needs_verification,
            } => {
                if !needs_verification {
                    debug!("Registration does not need verification");
                    return Ok(());
                }
                self.accounts.send_confirmation_code(email).await
            }
        }
    }
}
