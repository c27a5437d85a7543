/// Account flows and outbound notifications
pub mod account;
pub mod email;

pub use account::{AccountService, CodeSettings};
pub use email::{EmailService, NotificationSender};
