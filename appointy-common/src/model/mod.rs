pub mod password;
pub mod user;

use crate::{
    model::{
        password::InvalidPasswordHashError,
        user::{InvalidEmailAddressError, InvalidUserNameError},
    },
    snowflake::{Epoch, Snowflake, SnowflakeGenerator},
};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, marker::PhantomData};
use thiserror::Error;
use time::{UtcDateTime, macros::utc_datetime};

/// A stored value no longer satisfies the model's invariants.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum ModelValidationError {
    #[error(transparent)]
    UserName(#[from] InvalidUserNameError),
    #[error(transparent)]
    EmailAddress(#[from] InvalidEmailAddressError),
    #[error(transparent)]
    PasswordHash(#[from] InvalidPasswordHashError),
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct AppointyEpoch;
impl Epoch for AppointyEpoch {
    const EPOCH_TIME: UtcDateTime = utc_datetime!(2025-01-01 00:00);
}

pub type AppointySnowflake = Snowflake<AppointyEpoch>;
pub type AppointySnowflakeGenerator = SnowflakeGenerator<AppointyEpoch>;

/// Snowflake id tagged with the kind of resource it names.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Id<Marker>(AppointySnowflake, #[serde(skip)] PhantomData<Marker>);

impl<Marker> Id<Marker> {
    #[must_use]
    pub fn new(snowflake: AppointySnowflake) -> Self {
        Self(snowflake, PhantomData)
    }

    #[must_use]
    pub fn snowflake(self) -> AppointySnowflake {
        self.0
    }

    /// Representation used by the datastore, which has no unsigned 64-bit type.
    #[must_use]
    pub fn to_stored(self) -> i64 {
        self.0.get().cast_signed()
    }

    #[must_use]
    pub fn from_stored(stored: i64) -> Self {
        stored.cast_unsigned().into()
    }
}

impl<Marker> Display for Id<Marker> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<Marker> From<AppointySnowflake> for Id<Marker> {
    fn from(value: AppointySnowflake) -> Self {
        Self::new(value)
    }
}

impl<Marker> From<Id<Marker>> for AppointySnowflake {
    fn from(value: Id<Marker>) -> Self {
        value.0
    }
}

impl<Marker> From<u64> for Id<Marker> {
    fn from(value: u64) -> Self {
        Id::new(AppointySnowflake::new(value))
    }
}

impl<Marker> From<Id<Marker>> for u64 {
    fn from(value: Id<Marker>) -> Self {
        value.snowflake().get()
    }
}
