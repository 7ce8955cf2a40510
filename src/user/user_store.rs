use super::auth::{AuthToken, AuthTokenValue, UsernamePasswordCredentials};
use super::profile::{Company, Profile};
use super::user_models::{NewUser, User};
use crate::notifications::NotificationStore;
use anyhow::Result;

pub trait UserAuthCredentialsStore: Send + Sync {
    /// Returns the password credentials of the user.
    /// Returns Ok(None) if the user does not exist or has no password.
    /// Returns Err if there is a database error.
    fn get_password_credentials(&self, user_id: usize) -> Result<Option<UsernamePasswordCredentials>>;

    /// Records a successful password verification.
    fn update_password_last_used(&self, user_id: usize, at: i64) -> Result<()>;
}

pub trait UserAuthTokenStore: Send + Sync {
    /// Returns a user's authentication token given an AuthTokenValue.
    /// Returns Ok(None) if the token does not exist.
    /// Returns Err if there is a database error.
    fn get_user_auth_token(&self, token: &AuthTokenValue) -> Result<Option<AuthToken>>;

    /// Deletes an auth token given the token value.
    /// Returns Ok(None) if the token does not exist.
    fn delete_user_auth_token(&self, token: &AuthTokenValue) -> Result<Option<AuthToken>>;

    /// Updates an auth token with the latest usage timestamp.
    fn update_user_auth_token_last_used_timestamp(
        &self,
        token: &AuthTokenValue,
        at: i64,
    ) -> Result<()>;

    /// Adds a new auth token.
    fn add_user_auth_token(&self, token: AuthToken) -> Result<()>;
}

pub trait ProfileStore: Send + Sync {
    /// Returns the profile of the user.
    /// Returns Ok(None) if the user does not exist.
    fn get_profile(&self, user_id: usize) -> Result<Option<Profile>>;

    /// Overwrites the profile of `profile.user_id`. The verification flag is left untouched.
    fn update_profile(&self, profile: &Profile) -> Result<()>;

    /// Marks the user's email as verified.
    /// Returns Ok(true) if the flag changed, Ok(false) if it was already set.
    fn set_email_verified(&self, user_id: usize) -> Result<bool>;

    /// Returns the employers that filled in a company name, ordered by company name.
    fn get_companies(&self) -> Result<Vec<Company>>;
}

pub trait UserStore: UserAuthTokenStore + UserAuthCredentialsStore + Send + Sync {
    /// Creates the user with its profile and password credentials.
    /// Returns Ok(None) if the username is already taken.
    fn create_user(&self, new_user: &NewUser, created: i64) -> Result<Option<usize>>;

    /// Returns Ok(None) if the user does not exist.
    fn get_user(&self, user_id: usize) -> Result<Option<User>>;

    /// Returns Ok(None) if no user has the given username.
    fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;

    fn update_last_login(&self, user_id: usize, at: i64) -> Result<()>;
}

/// Combined trait for the store backing the account subsystem.
pub trait FullUserStore: UserStore + ProfileStore + NotificationStore {}

impl<T: UserStore + ProfileStore + NotificationStore> FullUserStore for T {}
