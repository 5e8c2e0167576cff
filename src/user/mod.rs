pub mod domain;
pub mod repository;

pub use domain::{NewUser, User, UserDraft, UserError, UserId, UserPatch};
pub use repository::{SqliteUserRepository, UserRepository};
