//! Form-level checks run before any create or update reaches the API.

use chrono::{Datelike, Utc};
use thiserror::Error;

use crate::models::{Education, NewUser, UserChanges, Work};

/// Earliest graduation year the forms accept
pub const MIN_GRADUATION_YEAR: i32 = 1950;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

fn required(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new(field, "is required"))
    } else {
        Ok(())
    }
}

fn email(value: &str) -> Result<(), ValidationError> {
    required("email", value)?;
    match value.trim().split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => Ok(()),
        _ => Err(ValidationError::new("email", "is not a valid email address")),
    }
}

fn education(value: &Education) -> Result<(), ValidationError> {
    required("education.university", &value.university)?;
    let current_year = Utc::now().year();
    if !(MIN_GRADUATION_YEAR..=current_year).contains(&value.graduation_year) {
        return Err(ValidationError::new(
            "education.graduation_year",
            format!("must be between {} and {}", MIN_GRADUATION_YEAR, current_year),
        ));
    }
    Ok(())
}

fn work(value: &Work) -> Result<(), ValidationError> {
    required("work.company", &value.company)
}

/// Check a create payload. Stops at the first failing field.
pub fn validate_new_user(user: &NewUser) -> Result<(), ValidationError> {
    required("first_name", &user.first_name)?;
    required("last_name", &user.last_name)?;
    email(&user.email)?;
    if let Some(ref e) = user.education {
        education(e)?;
    }
    if let Some(ref w) = user.work {
        work(w)?;
    }
    Ok(())
}

/// Check a partial update. Only the fields being changed are checked, but a
/// field that is present may not be blanked out.
pub fn validate_changes(changes: &UserChanges) -> Result<(), ValidationError> {
    if let Some(ref v) = changes.first_name {
        required("first_name", v)?;
    }
    if let Some(ref v) = changes.last_name {
        required("last_name", v)?;
    }
    if let Some(ref v) = changes.email {
        email(v)?;
    }
    if let Some(ref e) = changes.education {
        education(e)?;
    }
    if let Some(ref w) = changes.work {
        work(w)?;
    }
    Ok(())
}
