use super::activation::{decode_uid, encode_uid, ActivationState, ActivationTokenGenerator};
use super::auth::{AuthToken, AuthTokenValue, HashedPassword};
use super::profile::{Company, Profile, ProfileForm, Role};
use super::user_models::{Account, NewUser, RegistrationForm, User};
use super::user_store::FullUserStore;
use crate::clock::Clock;
use crate::mail::{Mailer, OutgoingEmail};
use crate::notifications::Notification;
use crate::uploads::{check_upload, FileStorage, UploadKind};
use crate::validation::{FieldError, FormErrors};
use anyhow::{anyhow, Context};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("{0}")]
    Invalid(#[from] FormErrors),

    #[error("Please enter a correct username and password.")]
    InvalidCredentials,

    #[error("Activation link is invalid or expired.")]
    InvalidActivationLink,

    #[error("Not found")]
    NotFound,

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationOutcome {
    Verified,
    AlreadyVerified,
}

/// A freshly opened session.
#[derive(Debug, Clone)]
pub struct Session {
    pub account: Account,
    pub token: AuthToken,
}

pub struct UserManager {
    store: Arc<dyn FullUserStore>,
    clock: Arc<dyn Clock>,
    mailer: Arc<dyn Mailer>,
    storage: Arc<dyn FileStorage>,
    activation: ActivationTokenGenerator,
    public_base_url: String,
}

impl UserManager {
    pub fn new(
        store: Arc<dyn FullUserStore>,
        clock: Arc<dyn Clock>,
        mailer: Arc<dyn Mailer>,
        storage: Arc<dyn FileStorage>,
        activation: ActivationTokenGenerator,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            clock,
            mailer,
            storage,
            activation,
            public_base_url: public_base_url.into(),
        }
    }

    /// Creates the account, logs it in and mails the activation link.
    pub fn register(&self, form: &RegistrationForm) -> Result<Session, AccountError> {
        let valid = form.validate()?;
        let taken = || FormErrors::single("username", FieldError::AlreadyTaken { field: "username" });
        if self.store.get_user_by_username(&valid.username)?.is_some() {
            return Err(taken().into());
        }

        let new_user = NewUser {
            username: valid.username,
            email: valid.email,
            role: valid.role,
            password: HashedPassword::new(&valid.password)?,
        };
        let user_id = self
            .store
            .create_user(&new_user, self.clock.now())?
            .ok_or_else(taken)?;
        info!("Registered {} as {}", new_user.username, new_user.role);

        let session = self.open_session(user_id)?;
        if let Err(err) = self.send_activation_email(&session.account.user) {
            warn!(
                "Could not send activation email to {}: {:#}",
                session.account.user.username, err
            );
        }
        Ok(session)
    }

    pub fn login(&self, username: &str, password: &str) -> Result<Session, AccountError> {
        let user = self
            .store
            .get_user_by_username(username.trim())?
            .ok_or(AccountError::InvalidCredentials)?;
        let credentials = self
            .store
            .get_password_credentials(user.id)?
            .ok_or(AccountError::InvalidCredentials)?;
        if !credentials.password.verify(password)? {
            return Err(AccountError::InvalidCredentials);
        }
        self.store
            .update_password_last_used(user.id, self.clock.now())?;
        self.open_session(user.id)
    }

    fn open_session(&self, user_id: usize) -> Result<Session, AccountError> {
        let now = self.clock.now();
        self.store.update_last_login(user_id, now)?;
        let token = AuthToken {
            user_id,
            value: AuthTokenValue::generate(),
            created: now,
            last_used: None,
        };
        self.store.add_user_auth_token(token.clone())?;
        let account = self.account(user_id)?.ok_or(AccountError::NotFound)?;
        Ok(Session { account, token })
    }

    pub fn logout(&self, token: &AuthTokenValue) -> Result<(), AccountError> {
        if self.store.delete_user_auth_token(token)?.is_none() {
            return Err(AccountError::NotFound);
        }
        Ok(())
    }

    /// Resolves a session token to its account, recording the usage.
    pub fn account_for_token(&self, token: &AuthTokenValue) -> Result<Option<Account>, AccountError> {
        let Some(auth_token) = self.store.get_user_auth_token(token)? else {
            return Ok(None);
        };
        self.store
            .update_user_auth_token_last_used_timestamp(token, self.clock.now())?;
        Ok(self.account(auth_token.user_id)?)
    }

    pub fn account(&self, user_id: usize) -> anyhow::Result<Option<Account>> {
        let Some(user) = self.store.get_user(user_id)? else {
            return Ok(None);
        };
        let profile = self
            .store
            .get_profile(user_id)?
            .with_context(|| format!("User {} has no profile", user_id))?;
        Ok(Some(Account { user, profile }))
    }

    /// Builds the absolute activation link for the user's current state.
    pub fn activation_link(&self, user: &User) -> anyhow::Result<String> {
        let credentials = self
            .store
            .get_password_credentials(user.id)?
            .ok_or_else(|| anyhow!("User {} has no password", user.id))?;
        let state = ActivationState {
            user_id: user.id,
            password_hash: &credentials.password.hash,
            last_login: user.last_login,
        };
        let token = self.activation.make_token(&state, self.clock.now());
        Ok(format!(
            "{}/accounts/activate/{}/{}/",
            self.public_base_url.trim_end_matches('/'),
            encode_uid(user.id),
            token
        ))
    }

    fn send_activation_email(&self, user: &User) -> anyhow::Result<()> {
        let link = self.activation_link(user)?;
        self.mailer.send(OutgoingEmail {
            to: user.email.clone(),
            subject: "Verify your email for JobPortal".to_string(),
            body: format!(
                "Hi {},\n\nPlease click the link below to verify your email address:\n\n{}\n\n\
                 If you did not sign up, you can ignore this email.",
                user.username, link
            ),
        })
    }

    pub fn activate(&self, uid: &str, token: &str) -> Result<ActivationOutcome, AccountError> {
        let user_id = decode_uid(uid).ok_or(AccountError::InvalidActivationLink)?;
        let user = self
            .store
            .get_user(user_id)?
            .ok_or(AccountError::InvalidActivationLink)?;
        let credentials = self
            .store
            .get_password_credentials(user_id)?
            .ok_or(AccountError::InvalidActivationLink)?;
        let state = ActivationState {
            user_id,
            password_hash: &credentials.password.hash,
            last_login: user.last_login,
        };
        if !self.activation.check_token(&state, token, self.clock.now()) {
            return Err(AccountError::InvalidActivationLink);
        }

        if self.store.set_email_verified(user_id)? {
            info!("Verified email of {}", user.username);
            Ok(ActivationOutcome::Verified)
        } else {
            Ok(ActivationOutcome::AlreadyVerified)
        }
    }

    pub fn edit_profile(&self, user_id: usize, form: &ProfileForm) -> Result<Profile, AccountError> {
        let current = self
            .store
            .get_profile(user_id)?
            .ok_or(AccountError::NotFound)?;

        let mut errors = FormErrors::new();
        let resume = check_upload(
            &mut errors,
            "resume",
            UploadKind::ProfileResume,
            form.resume.as_ref(),
        );
        let company_logo = check_upload(
            &mut errors,
            "company_logo",
            UploadKind::CompanyLogo,
            form.company_logo.as_ref(),
        );
        let mut updated = match form.apply(&current) {
            Ok(updated) => {
                errors.into_result()?;
                updated
            }
            Err(mut form_errors) => {
                form_errors.merge(errors);
                return Err(form_errors.into());
            }
        };

        // Only the file belonging to the resulting role is kept.
        match updated.role() {
            Role::JobSeeker => {
                if let Some(resume) = resume {
                    let path = resume.store(self.storage.as_ref())?;
                    updated.attach_upload(Some(path), None);
                }
            }
            Role::Employer => {
                if let Some(logo) = company_logo {
                    let path = logo.store(self.storage.as_ref())?;
                    updated.attach_upload(None, Some(path));
                }
            }
        }
        self.store.update_profile(&updated)?;
        Ok(updated)
    }

    pub fn inbox(&self, user_id: usize) -> Result<Vec<Notification>, AccountError> {
        Ok(self.store.read_inbox(user_id)?)
    }

    pub fn unread_count(&self, user_id: usize) -> Result<usize, AccountError> {
        Ok(self.store.get_unread_count(user_id)?)
    }

    pub fn companies(&self) -> Result<Vec<Company>, AccountError> {
        Ok(self.store.get_companies()?)
    }

    /// Returns the company card of an employer, NotFound for anyone else.
    pub fn company(&self, employer_id: usize) -> Result<Company, AccountError> {
        self.store
            .get_profile(employer_id)?
            .and_then(|profile| profile.as_company())
            .ok_or(AccountError::NotFound)
    }
}
