pub mod models;
pub mod senders;

pub use models::{AlertNotification, Channel};
pub use senders::{NotificationSender, SenderError};
