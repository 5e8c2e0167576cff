use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::ValidateEmail;

pub type UserId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

/// Signup payload as it arrives on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserDraft {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// A signup that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserError {
    #[error("User name must not be blank")]
    BlankName,

    #[error("User email must not be blank")]
    MissingEmail,

    #[error("Invalid email: {0}")]
    InvalidEmail(String),
}

fn check_name(name: &str) -> Result<String, UserError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(UserError::BlankName);
    }
    Ok(name.to_string())
}

fn check_email(email: &str) -> Result<String, UserError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(UserError::MissingEmail);
    }
    if !email.validate_email() {
        return Err(UserError::InvalidEmail(email.to_string()));
    }
    Ok(email.to_string())
}

impl UserDraft {
    pub fn validate(self) -> Result<NewUser, UserError> {
        let name = check_name(self.name.as_deref().unwrap_or_default())?;
        let email = check_email(self.email.as_deref().unwrap_or_default())?;
        Ok(NewUser { name, email })
    }
}

impl User {
    /// Applies a validated patch. Nothing changes if any given field is invalid.
    pub fn apply(&mut self, patch: UserPatch) -> Result<(), UserError> {
        let name = patch.name.as_deref().map(check_name).transpose()?;
        let email = patch.email.as_deref().map(check_email).transpose()?;

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(email) = email {
            self.email = email;
        }
        Ok(())
    }
}
