pub mod domain;
pub mod repository;

pub use domain::{Item, ItemDetails, ItemDraft, ItemError, ItemId, ItemPatch, NewItem};
pub use repository::{ItemRepository, SqliteItemRepository};
