use appointy_common::model::{
    Id, ModelValidationError,
    password::PasswordHash,
    user::{EmailAddress, NewUser, User, UserMarker, UserName},
};
use serde::{Deserialize, Serialize};

/// Shape of a user document in the users collection.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Serialize, Deserialize)]
pub(crate) struct UserRecord {
    #[serde(rename = "_id")]
    pub user_snowflake: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

impl UserRecord {
    pub fn new(id: Id<UserMarker>, user: &NewUser) -> Self {
        Self {
            user_snowflake: id.to_stored(),
            name: user.name.get().to_owned(),
            email: user.email.get().to_owned(),
            password_hash: user.password_hash.get().to_owned(),
        }
    }
}

impl TryFrom<UserRecord> for User {
    type Error = ModelValidationError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        // Checked so a corrupt hash is noticed, but never leaves this crate.
        PasswordHash::new(value.password_hash)?;

        Ok(Self {
            id: Id::from_stored(value.user_snowflake),
            name: UserName::new(value.name)?,
            email: EmailAddress::new(value.email)?,
        })
    }
}
