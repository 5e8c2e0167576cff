// Booking rules: validation of new bookings, who may see or decide on them,
// and the status filter used by the listing endpoints.
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::item::{Item, ItemId};
use crate::user::UserId;

pub type BookingId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BookingStatus {
    Waiting,
    Approved,
    Rejected,
    Canceled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "WAITING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Canceled => "CANCELED",
        }
    }

    /// The owner's decision. Only a waiting booking can be decided.
    pub fn decide(self, approved: bool) -> Result<BookingStatus, BookingError> {
        match self {
            Self::Waiting if approved => Ok(Self::Approved),
            Self::Waiting => Ok(Self::Rejected),
            other => Err(BookingError::AlreadyDecided(other)),
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored status string outside the known set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown booking status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for BookingStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WAITING" => Ok(Self::Waiting),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            "CANCELED" => Ok(Self::Canceled),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Filter tag for booking lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BookingState {
    #[default]
    All,
    Current,
    Past,
    Future,
    Waiting,
    Rejected,
}

impl FromStr for BookingState {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ALL" => Ok(Self::All),
            "CURRENT" => Ok(Self::Current),
            "PAST" => Ok(Self::Past),
            "FUTURE" => Ok(Self::Future),
            "WAITING" => Ok(Self::Waiting),
            "REJECTED" => Ok(Self::Rejected),
            _ => Err(BookingError::UnknownState(s.to_string())),
        }
    }
}

impl BookingState {
    /// Whether a booking belongs in this state at `now`.
    pub fn matches(&self, booking: &Booking, now: NaiveDateTime) -> bool {
        match self {
            Self::All => true,
            Self::Current => booking.start <= now && now <= booking.end,
            Self::Past => booking.end < now,
            Self::Future => booking.start > now,
            Self::Waiting => booking.status == BookingStatus::Waiting,
            Self::Rejected => booking.status == BookingStatus::Rejected,
        }
    }
}

/// Id and name of a user or item referenced from a booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Party {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Booking {
    pub id: BookingId,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub status: BookingStatus,
    pub item: Party,
    pub booker: Party,
    #[serde(skip)]
    pub item_owner_id: UserId,
}

/// Short form embedded in item views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingSummary {
    pub id: BookingId,
    pub booker_id: UserId,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDraft {
    pub item_id: Option<ItemId>,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
    pub item_id: ItemId,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookingError {
    #[error("Booking must reference an item")]
    MissingItem,

    #[error("Booking start and end must both be set")]
    MissingWindow,

    #[error("Booking cannot start or end in the past")]
    InPast,

    #[error("Booking start must be before its end")]
    EndNotAfterStart,

    #[error("Item {0} is not available for booking")]
    ItemUnavailable(ItemId),

    #[error("Owner cannot book their own item {0}")]
    OwnItem(ItemId),

    #[error("Booking {booking} is not visible to user {user}")]
    NotVisible { user: UserId, booking: BookingId },

    #[error("User {user} does not own the item of booking {booking}")]
    NotItemOwner { user: UserId, booking: BookingId },

    #[error("Booking is already {0}")]
    AlreadyDecided(BookingStatus),

    #[error("Unknown state: {0}")]
    UnknownState(String),
}

impl BookingDraft {
    pub fn validate(self, now: NaiveDateTime) -> Result<NewBooking, BookingError> {
        let item_id = self.item_id.ok_or(BookingError::MissingItem)?;
        let (start, end) = match (self.start, self.end) {
            (Some(start), Some(end)) => (start, end),
            _ => return Err(BookingError::MissingWindow),
        };

        if start < now || end < now {
            return Err(BookingError::InPast);
        }
        if end <= start {
            return Err(BookingError::EndNotAfterStart);
        }

        Ok(NewBooking {
            item_id,
            start,
            end,
        })
    }
}

impl NewBooking {
    /// The item must be open for booking and belong to someone else.
    pub fn check_item(&self, item: &Item, booker: UserId) -> Result<(), BookingError> {
        if !item.available {
            return Err(BookingError::ItemUnavailable(item.id));
        }
        if item.owner_id == booker {
            return Err(BookingError::OwnItem(item.id));
        }
        Ok(())
    }
}

impl Booking {
    pub fn ensure_visible_to(&self, user: UserId) -> Result<(), BookingError> {
        if self.booker.id == user || self.item_owner_id == user {
            Ok(())
        } else {
            Err(BookingError::NotVisible {
                user,
                booking: self.id,
            })
        }
    }

    /// Owner approves or rejects a waiting booking.
    pub fn decide(&mut self, user: UserId, approved: bool) -> Result<(), BookingError> {
        if self.item_owner_id != user {
            return Err(BookingError::NotItemOwner {
                user,
                booking: self.id,
            });
        }
        self.status = self.status.decide(approved)?;
        Ok(())
    }
}
