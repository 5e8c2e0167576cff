use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::booking::BookingSummary;
use crate::comment::Comment;
use crate::request::RequestId;
use crate::user::UserId;

pub type ItemId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub description: String,
    pub available: bool,
    pub owner_id: UserId,
    pub request_id: Option<RequestId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDraft {
    pub name: Option<String>,
    pub description: Option<String>,
    pub available: Option<bool>,
    pub request_id: Option<RequestId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub name: String,
    pub description: String,
    pub available: bool,
    pub request_id: Option<RequestId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub available: Option<bool>,
}

/// Item as shown on its own page: bookings are only filled in for the owner.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDetails {
    #[serde(flatten)]
    pub item: Item,
    pub last_booking: Option<BookingSummary>,
    pub next_booking: Option<BookingSummary>,
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemError {
    #[error("Item name must not be blank")]
    BlankName,

    #[error("Item description must not be blank")]
    BlankDescription,

    #[error("Item availability must be set")]
    MissingAvailable,

    #[error("User {user} does not own item {item}")]
    NotOwner { user: UserId, item: ItemId },
}

fn non_blank(value: &str, err: ItemError) -> Result<String, ItemError> {
    let value = value.trim();
    if value.is_empty() {
        Err(err)
    } else {
        Ok(value.to_string())
    }
}

impl ItemDraft {
    pub fn validate(self) -> Result<NewItem, ItemError> {
        let name = non_blank(self.name.as_deref().unwrap_or_default(), ItemError::BlankName)?;
        let description = non_blank(
            self.description.as_deref().unwrap_or_default(),
            ItemError::BlankDescription,
        )?;
        let available = self.available.ok_or(ItemError::MissingAvailable)?;

        Ok(NewItem {
            name,
            description,
            available,
            request_id: self.request_id,
        })
    }
}

impl Item {
    pub fn ensure_owned_by(&self, user: UserId) -> Result<(), ItemError> {
        if self.owner_id == user {
            Ok(())
        } else {
            Err(ItemError::NotOwner {
                user,
                item: self.id,
            })
        }
    }

    pub fn apply(&mut self, patch: ItemPatch) -> Result<(), ItemError> {
        let name = patch
            .name
            .as_deref()
            .map(|n| non_blank(n, ItemError::BlankName))
            .transpose()?;
        let description = patch
            .description
            .as_deref()
            .map(|d| non_blank(d, ItemError::BlankDescription))
            .transpose()?;

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(description) = description {
            self.description = description;
        }
        if let Some(available) = patch.available {
            self.available = available;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drill() -> Item {
        Item {
            id: 1,
            name: "Drill".into(),
            description: "Cordless drill".into(),
            available: true,
            owner_id: 7,
            request_id: None,
        }
    }

    #[test]
    fn draft_requires_availability() {
        let draft = ItemDraft {
            name: Some("Drill".into()),
            description: Some("Cordless".into()),
            available: None,
            request_id: None,
        };
        assert_eq!(draft.validate(), Err(ItemError::MissingAvailable));
    }

    #[test]
    fn draft_rejects_blank_description() {
        let draft = ItemDraft {
            name: Some("Drill".into()),
            description: Some(" ".into()),
            available: Some(true),
            request_id: Some(3),
        };
        assert_eq!(draft.validate(), Err(ItemError::BlankDescription));
    }

    #[test]
    fn only_owner_passes_ownership_check() {
        let item = drill();
        assert!(item.ensure_owned_by(7).is_ok());
        assert_eq!(
            item.ensure_owned_by(8),
            Err(ItemError::NotOwner { user: 8, item: 1 })
        );
    }

    #[test]
    fn patch_can_toggle_availability_alone() {
        let mut item = drill();
        item.apply(ItemPatch {
            available: Some(false),
            ..Default::default()
        })
        .unwrap();
        assert!(!item.available);
        assert_eq!(item.name, "Drill");
    }

    #[test]
    fn patch_rejects_blank_name() {
        let mut item = drill();
        let result = item.apply(ItemPatch {
            name: Some("".into()),
            available: Some(false),
            ..Default::default()
        });
        assert_eq!(result, Err(ItemError::BlankName));
        assert!(item.available);
    }

    #[test]
    fn details_serialize_flat_and_camel_case() {
        let details = ItemDetails {
            item: drill(),
            last_booking: None,
            next_booking: None,
            comments: vec![],
        };
        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["name"], "Drill");
        assert_eq!(json["ownerId"], 7);
        assert!(json["lastBooking"].is_null());
        assert!(json["comments"].as_array().unwrap().is_empty());
    }
}
