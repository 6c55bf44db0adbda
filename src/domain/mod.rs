//! Domain types for accounts and verification tokens.
//!
//! The newtype and enum wrappers here keep raw database values (integer ids,
//! purpose strings) from leaking into the service layer untyped.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier for a user account.
///
/// # Examples
///
/// ```rust
/// use hobbylist::domain::UserId;
///
/// let id = UserId::new(42);
/// assert_eq!(id.value(), 42);
/// assert_eq!(id.to_string(), "42");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i32);

impl UserId {
    #[must_use]
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn value(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<UserId> for i32 {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl From<i32> for UserId {
    fn from(id: i32) -> Self {
        Self::new(id)
    }
}

/// What redeeming a verification token does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenPurpose {
    EmailVerification,
    PasswordReset,
}

impl TokenPurpose {
    /// Stored representation, also used as a metrics label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::EmailVerification => "EMAIL_VERIFICATION",
            Self::PasswordReset => "PASSWORD_RESET",
        }
    }

    /// Frontend route that consumes a token of this purpose.
    #[must_use]
    pub const fn frontend_path(&self) -> &'static str {
        match self {
            Self::EmailVerification => "verification",
            Self::PasswordReset => "reset-password",
        }
    }
}

impl fmt::Display for TokenPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown token purpose: {0}")]
pub struct UnknownPurpose(pub String);

impl FromStr for TokenPurpose {
    type Err = UnknownPurpose;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EMAIL_VERIFICATION" => Ok(Self::EmailVerification),
            "PASSWORD_RESET" => Ok(Self::PasswordReset),
            other => Err(UnknownPurpose(other.to_string())),
        }
    }
}

/// Role assigned to accounts created through signup.
pub const DEFAULT_ROLE: &str = "ROLE_USER";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_conversions() {
        let id = UserId::new(7);
        assert_eq!(id.value(), 7);
        assert_eq!(i32::from(id), 7);
        assert_eq!(UserId::from(7), id);
        assert_eq!(serde_json::to_string(&id).unwrap(), "7");
    }

    #[test]
    fn purpose_parses_stored_values() {
        assert_eq!(
            "EMAIL_VERIFICATION".parse::<TokenPurpose>(),
            Ok(TokenPurpose::EmailVerification)
        );
        assert_eq!(
            "PASSWORD_RESET".parse::<TokenPurpose>(),
            Ok(TokenPurpose::PasswordReset)
        );
        let err = "password_reset".parse::<TokenPurpose>().unwrap_err();
        assert_eq!(err, UnknownPurpose("password_reset".to_string()));
        assert_eq!(err.to_string(), "unknown token purpose: password_reset");
    }

    #[test]
    fn purpose_serializes_like_storage() {
        let json = serde_json::to_string(&TokenPurpose::PasswordReset).unwrap();
        assert_eq!(json, "\"PASSWORD_RESET\"");
        assert_eq!(TokenPurpose::PasswordReset.to_string(), "PASSWORD_RESET");
    }

    #[test]
    fn purpose_selects_frontend_route() {
        assert_eq!(TokenPurpose::EmailVerification.frontend_path(), "verification");
        assert_eq!(TokenPurpose::PasswordReset.frontend_path(), "reset-password");
    }
}
