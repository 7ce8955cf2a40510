use super::models::Notification;
use anyhow::Result;

pub trait NotificationStore: Send + Sync {
    /// Creates an unread notification for the user.
    /// Messages are truncated to the maximum notification length.
    fn create_notification(
        &self,
        user_id: usize,
        message: &str,
        created_at: i64,
    ) -> Result<Notification>;

    /// Returns all the user's notifications, newest first, and marks the unread
    /// ones as read. The returned items carry the read flag they had before the call.
    fn read_inbox(&self, user_id: usize) -> Result<Vec<Notification>>;

    /// Returns the number of unread notifications of the user.
    fn get_unread_count(&self, user_id: usize) -> Result<usize>;
}
