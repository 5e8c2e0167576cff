use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::item::ItemId;
use crate::user::UserId;

pub type CommentId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub text: String,
    pub author_name: String,
    pub created: NaiveDateTime,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentDraft {
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommentError {
    #[error("Comment text must not be blank")]
    BlankText,

    #[error("User {author} has no finished approved booking of item {item}")]
    NoCompletedBooking { author: UserId, item: ItemId },
}

impl CommentDraft {
    pub fn validate(self) -> Result<String, CommentError> {
        let text = self.text.unwrap_or_default();
        let text = text.trim();
        if text.is_empty() {
            return Err(CommentError::BlankText);
        }
        Ok(text.to_string())
    }
}
