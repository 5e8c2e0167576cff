use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::item::Item;
use crate::user::UserId;

pub type RequestId = i64;

/// A user's ask for something nobody lists yet, with the items offered in answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemRequest {
    pub id: RequestId,
    pub description: String,
    #[serde(skip)]
    pub requester_id: UserId,
    pub created: NaiveDateTime,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestDraft {
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("Request description must not be blank")]
    BlankDescription,
}

impl RequestDraft {
    pub fn validate(self) -> Result<String, RequestError> {
        let description = self.description.unwrap_or_default();
        let description = description.trim();
        if description.is_empty() {
            return Err(RequestError::BlankDescription);
        }
        Ok(description.to_string())
    }
}
