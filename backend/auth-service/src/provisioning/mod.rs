/// Identity + profile provisioning with compensating rollback
pub mod orchestrator;
pub mod saga;

pub use orchestrator::{
    AddGroupRequest, CreateAdminRequest, ProvisioningConfig, ProvisioningOrchestrator,
    SignUpRequest,
};
pub use saga::Saga;
