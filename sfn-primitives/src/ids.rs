//! Application identifier types.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const MAX_APP_ID_LEN: usize = 64;

/// Application id used when none is configured.
pub const DEFAULT_APP_ID: &str = "default";

/// Identifier of the application a set of tools belongs to.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AppId(String);

impl AppId {
    /// Creates a new application identifier after validating its format.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAppId`] if the identifier is empty, too long, or
    /// contains whitespace or control characters.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        validate_app_id(&id)?;
        Ok(Self(id))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for AppId {
    fn default() -> Self {
        Self(DEFAULT_APP_ID.to_owned())
    }
}

impl Display for AppId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AppId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for AppId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for AppId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<AppId> for String {
    fn from(value: AppId) -> Self {
        value.0
    }
}

fn validate_app_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(Error::InvalidAppId {
            id: String::new(),
            reason: "identifier cannot be empty".into(),
        });
    }

    if id.len() > MAX_APP_ID_LEN {
        return Err(Error::InvalidAppId {
            id: id.into(),
            reason: format!("identifier length must be <= {MAX_APP_ID_LEN}"),
        });
    }

    if id.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(Error::InvalidAppId {
            id: id.into(),
            reason: "identifier cannot contain whitespace or control characters".into(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_app_id() {
        let id = AppId::new("aid_test").unwrap();
        let parsed = id.to_string().parse::<AppId>().expect("parse");
        assert_eq!(id, parsed);
    }

    #[test]
    fn rejects_invalid_ids() {
        assert!(matches!(AppId::new(""), Err(Error::InvalidAppId { .. })));
        assert!(matches!(AppId::new("has space"), Err(Error::InvalidAppId { .. })));
        assert!(AppId::new("x".repeat(MAX_APP_ID_LEN + 1)).is_err());
    }

    #[test]
    fn default_app_id_is_valid() {
        let id = AppId::default();
        assert_eq!(AppId::new(id.as_str()).unwrap(), id);
    }

    #[test]
    fn deserialization_validates() {
        let id: AppId = serde_json::from_str("\"a1\"").unwrap();
        assert_eq!(id.as_str(), "a1");
        assert!(serde_json::from_str::<AppId>("\"\"").is_err());
    }
}
