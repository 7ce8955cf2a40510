//! Notification data models

use serde::{Deserialize, Serialize};

/// Longest message an in-app notification can hold, in characters.
pub const MAX_NOTIFICATION_LENGTH: usize = 255;

/// An in-app notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: usize,
    pub user_id: usize,
    pub message: String,
    pub is_read: bool,
    pub created_at: i64,
}

/// Cuts `message` down to [`MAX_NOTIFICATION_LENGTH`] characters.
pub fn truncate_message(message: &str) -> String {
    match message.char_indices().nth(MAX_NOTIFICATION_LENGTH) {
        Some((byte_index, _)) => message[..byte_index].to_string(),
        None => message.to_string(),
    }
}
