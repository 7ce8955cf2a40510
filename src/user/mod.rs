pub mod activation;
pub mod auth;
pub mod profile;
mod sqlite_user_store;
mod user_manager;
pub mod user_models;
mod user_store;

pub use activation::{ActivationTokenGenerator, DEFAULT_ACTIVATION_TTL};
pub use auth::{AuthToken, AuthTokenValue, HashedPassword, UsernamePasswordCredentials};
pub use profile::{Company, Profile, ProfileForm, Role, RoleProfile};
pub use sqlite_user_store::SqliteUserStore;
pub use user_manager::{AccountError, ActivationOutcome, Session, UserManager};
pub use user_models::{Account, NewUser, RegistrationForm, User};
pub use user_store::{
    FullUserStore, ProfileStore, UserAuthCredentialsStore, UserAuthTokenStore, UserStore,
};
