pub mod domain;
pub mod repository;

pub use domain::{ItemRequest, RequestDraft, RequestError, RequestId};
pub use repository::{RequestRepository, SqliteRequestRepository};
