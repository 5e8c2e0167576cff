pub mod domain;
pub mod repository;

pub use domain::{Comment, CommentDraft, CommentError, CommentId};
pub use repository::{CommentRepository, SqliteCommentRepository};
