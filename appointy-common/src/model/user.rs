use crate::model::{
    Id,
    password::{Password, PasswordHash},
};
use regex::Regex;
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use std::sync::LazyLock;
use thiserror::Error;

pub const USER_NAME_MAX_LEN: usize = 100;
pub const EMAIL_ADDRESS_MAX_LEN: usize = 254;

static EMAIL_ADDRESS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s.]+(\.[^@\s.]+)+$").expect("Email address pattern is valid")
});

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct UserMarker;

/// The public view of an account. Never carries credentials.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct User {
    pub id: Id<UserMarker>,
    pub name: UserName,
    pub email: EmailAddress,
}

/// Request payload for account creation.
///
/// Unknown fields, including any client-chosen `id`, are ignored.
#[derive(Clone, Eq, PartialEq, Debug, Deserialize)]
pub struct CreateUser {
    pub name: UserName,
    pub email: EmailAddress,
    pub password: Password,
}

/// An account ready to be persisted.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct NewUser {
    pub name: UserName,
    pub email: EmailAddress,
    pub password_hash: PasswordHash,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
#[serde(transparent)]
pub struct UserName(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The user name is invalid: {0:?}")]
pub struct InvalidUserNameError(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
#[serde(transparent)]
pub struct EmailAddress(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The email address is invalid: {0:?}")]
pub struct InvalidEmailAddressError(String);

impl UserName {
    pub fn new(name: String) -> Result<Self, InvalidUserNameError> {
        if name.trim().is_empty() || name.chars().count() > USER_NAME_MAX_LEN {
            Err(InvalidUserNameError(name))
        } else {
            Ok(Self(name))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl EmailAddress {
    pub fn new(address: String) -> Result<Self, InvalidEmailAddressError> {
        if address.len() <= EMAIL_ADDRESS_MAX_LEN && EMAIL_ADDRESS_PATTERN.is_match(&address) {
            Ok(Self(address))
        } else {
            Err(InvalidEmailAddressError(address))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl<'de> Deserialize<'de> for UserName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        UserName::new(inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"a non-empty user name"))
    }
}

impl<'de> Deserialize<'de> for EmailAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        EmailAddress::new(inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"an email address"))
    }
}
