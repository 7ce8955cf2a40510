//! In-app notifications and the dispatcher reacting to application events

mod dispatcher;
mod models;
mod store;

pub use dispatcher::{MailingNotificationDispatcher, NotificationDispatcher};
pub use models::{truncate_message, Notification, MAX_NOTIFICATION_LENGTH};
pub use store::NotificationStore;
