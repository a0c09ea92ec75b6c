//! Users: requesters and event initiators.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TurnoutError};

id_type!(
    /// Unique identifier for a user.
    UserId
);

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

/// Input for registering a user.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
}

impl NewUser {
    /// Reject blank names and emails without an `@`.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(TurnoutError::ValidationError(
                "Field: name. Error: must not be blank.".to_string(),
            ));
        }
        if self.email.trim().is_empty() || !self.email.contains('@') {
            return Err(TurnoutError::ValidationError(format!(
                "Field: email. Error: '{}' is not a valid email address.",
                self.email
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_new_user() {
        let ok = NewUser {
            name: "Ann".into(),
            email: "ann@example.com".into(),
        };
        assert!(ok.validate().is_ok());

        let blank = NewUser {
            name: "  ".into(),
            email: "ann@example.com".into(),
        };
        assert!(matches!(
            blank.validate(),
            Err(TurnoutError::ValidationError(_))
        ));

        let bad_email = NewUser {
            name: "Ann".into(),
            email: "nope".into(),
        };
        assert!(bad_email.validate().is_err());
    }
}
