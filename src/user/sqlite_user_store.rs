use super::auth::{AuthToken, AuthTokenValue, HashedPassword, UsernamePasswordCredentials};
use super::profile::{Company, Profile, Role, RoleProfile};
use super::user_models::{NewUser, User};
use super::user_store::{ProfileStore, UserAuthCredentialsStore, UserAuthTokenStore, UserStore};
use crate::notifications::{truncate_message, Notification, NotificationStore};
use crate::sqlite_persistence::{
    is_unique_violation, lock_conn, parse_text_column, row_id, SharedConnection,
};
use anyhow::{anyhow, Context, Result};
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

const PROFILE_COLUMNS: &str = "user_id, role, full_name, phone, location, resume, company_name, \
     company_website, company_logo, company_description, email_verified";

/// SQLite backed store for users, their sessions, profiles and notifications.
#[derive(Clone)]
pub struct SqliteUserStore {
    conn: SharedConnection,
}

impl SqliteUserStore {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        created: row.get(3)?,
        last_login: row.get(4)?,
    })
}

fn profile_from_row(row: &Row) -> rusqlite::Result<Profile> {
    let role_profile = match parse_text_column::<Role>(row, 1)? {
        Role::JobSeeker => RoleProfile::JobSeeker {
            resume: row.get(5)?,
        },
        Role::Employer => RoleProfile::Employer {
            company_name: row.get(6)?,
            company_website: row.get(7)?,
            company_logo: row.get(8)?,
            company_description: row.get(9)?,
        },
    };
    Ok(Profile {
        user_id: row.get(0)?,
        full_name: row.get(2)?,
        phone: row.get(3)?,
        location: row.get(4)?,
        email_verified: row.get(10)?,
        role_profile,
    })
}

fn notification_from_row(row: &Row) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: row.get(0)?,
        user_id: row.get(1)?,
        message: row.get(2)?,
        is_read: row.get(3)?,
        created_at: row.get(4)?,
    })
}

impl UserStore for SqliteUserStore {
    fn create_user(&self, new_user: &NewUser, created: i64) -> Result<Option<usize>> {
        let mut conn = lock_conn(&self.conn)?;
        let tx = conn.transaction()?;

        let inserted = tx.execute(
            "INSERT INTO user (username, email, created) VALUES (?1, ?2, ?3)",
            params![new_user.username, new_user.email, created],
        );
        match inserted {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => {
                debug!("Username {} is already taken", new_user.username);
                return Ok(None);
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("Failed to create user {}", new_user.username))
            }
        }
        let user_id = tx.last_insert_rowid() as usize;

        tx.execute(
            "INSERT INTO profile (user_id, role) VALUES (?1, ?2)",
            params![user_id, new_user.role.as_str()],
        )?;
        tx.execute(
            "INSERT INTO user_password_credentials (user_id, salt, hash, hasher, created) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user_id,
                new_user.password.salt,
                new_user.password.hash,
                new_user.password.hasher.to_string(),
                created
            ],
        )?;
        tx.commit()?;
        Ok(Some(user_id))
    }

    fn get_user(&self, user_id: usize) -> Result<Option<User>> {
        let Some(user_id) = row_id(user_id) else {
            return Ok(None);
        };
        let conn = lock_conn(&self.conn)?;
        Ok(conn
            .query_row(
                "SELECT id, username, email, created, last_login FROM user WHERE id = ?1",
                params![user_id],
                user_from_row,
            )
            .optional()?)
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = lock_conn(&self.conn)?;
        Ok(conn
            .query_row(
                "SELECT id, username, email, created, last_login FROM user WHERE username = ?1",
                params![username],
                user_from_row,
            )
            .optional()?)
    }

    fn update_last_login(&self, user_id: usize, at: i64) -> Result<()> {
        let conn = lock_conn(&self.conn)?;
        conn.execute(
            "UPDATE user SET last_login = ?1 WHERE id = ?2",
            params![at, user_id],
        )?;
        Ok(())
    }
}

impl UserAuthCredentialsStore for SqliteUserStore {
    fn get_password_credentials(&self, user_id: usize) -> Result<Option<UsernamePasswordCredentials>> {
        let Some(user_id) = row_id(user_id) else {
            return Ok(None);
        };
        let conn = lock_conn(&self.conn)?;
        let row = conn
            .query_row(
                "SELECT salt, hash, hasher, created, last_used \
                 FROM user_password_credentials WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, Option<i64>>(4)?,
                    ))
                },
            )
            .optional()?;
        let Some((salt, hash, hasher, created, last_used)) = row else {
            return Ok(None);
        };
        Ok(Some(UsernamePasswordCredentials {
            user_id: user_id as usize,
            password: HashedPassword {
                salt,
                hash,
                hasher: hasher.parse()?,
            },
            created,
            last_used,
        }))
    }

    fn update_password_last_used(&self, user_id: usize, at: i64) -> Result<()> {
        let conn = lock_conn(&self.conn)?;
        conn.execute(
            "UPDATE user_password_credentials SET last_used = ?1 WHERE user_id = ?2",
            params![at, user_id],
        )?;
        Ok(())
    }
}

impl UserAuthTokenStore for SqliteUserStore {
    fn get_user_auth_token(&self, token: &AuthTokenValue) -> Result<Option<AuthToken>> {
        let conn = lock_conn(&self.conn)?;
        Ok(conn
            .query_row(
                "SELECT user_id, value, created, last_used FROM auth_token WHERE value = ?1",
                params![token.0],
                |row| {
                    Ok(AuthToken {
                        user_id: row.get(0)?,
                        value: AuthTokenValue(row.get(1)?),
                        created: row.get(2)?,
                        last_used: row.get(3)?,
                    })
                },
            )
            .optional()?)
    }

    fn delete_user_auth_token(&self, token: &AuthTokenValue) -> Result<Option<AuthToken>> {
        let Some(existing) = self.get_user_auth_token(token)? else {
            return Ok(None);
        };
        let conn = lock_conn(&self.conn)?;
        conn.execute("DELETE FROM auth_token WHERE value = ?1", params![token.0])?;
        Ok(Some(existing))
    }

    fn update_user_auth_token_last_used_timestamp(
        &self,
        token: &AuthTokenValue,
        at: i64,
    ) -> Result<()> {
        let conn = lock_conn(&self.conn)?;
        conn.execute(
            "UPDATE auth_token SET last_used = ?1 WHERE value = ?2",
            params![at, token.0],
        )?;
        Ok(())
    }

    fn add_user_auth_token(&self, token: AuthToken) -> Result<()> {
        let conn = lock_conn(&self.conn)?;
        conn.execute(
            "INSERT INTO auth_token (user_id, value, created, last_used) VALUES (?1, ?2, ?3, ?4)",
            params![token.user_id, token.value.0, token.created, token.last_used],
        )?;
        Ok(())
    }
}

impl ProfileStore for SqliteUserStore {
    fn get_profile(&self, user_id: usize) -> Result<Option<Profile>> {
        let Some(user_id) = row_id(user_id) else {
            return Ok(None);
        };
        let conn = lock_conn(&self.conn)?;
        Ok(conn
            .query_row(
                &format!("SELECT {} FROM profile WHERE user_id = ?1", PROFILE_COLUMNS),
                params![user_id],
                profile_from_row,
            )
            .optional()?)
    }

    fn update_profile(&self, profile: &Profile) -> Result<()> {
        let (resume, company_name, company_website, company_logo, company_description) =
            match &profile.role_profile {
                RoleProfile::JobSeeker { resume } => {
                    (resume.clone(), String::new(), String::new(), None, None)
                }
                RoleProfile::Employer {
                    company_name,
                    company_website,
                    company_logo,
                    company_description,
                } => (
                    None,
                    company_name.clone(),
                    company_website.clone(),
                    company_logo.clone(),
                    company_description.clone(),
                ),
            };
        let conn = lock_conn(&self.conn)?;
        let updated = conn.execute(
            "UPDATE profile SET role = ?1, full_name = ?2, phone = ?3, location = ?4, \
             resume = ?5, company_name = ?6, company_website = ?7, company_logo = ?8, \
             company_description = ?9 WHERE user_id = ?10",
            params![
                profile.role().as_str(),
                profile.full_name,
                profile.phone,
                profile.location,
                resume,
                company_name,
                company_website,
                company_logo,
                company_description,
                profile.user_id
            ],
        )?;
        if updated == 0 {
            return Err(anyhow!("No profile for user {}", profile.user_id));
        }
        Ok(())
    }

    fn set_email_verified(&self, user_id: usize) -> Result<bool> {
        let conn = lock_conn(&self.conn)?;
        let changed = conn.execute(
            "UPDATE profile SET email_verified = 1 WHERE user_id = ?1 AND email_verified = 0",
            params![user_id],
        )?;
        Ok(changed > 0)
    }

    fn get_companies(&self) -> Result<Vec<Company>> {
        let conn = lock_conn(&self.conn)?;
        let mut stmt = conn.prepare(
            "SELECT user_id, company_name, company_website, company_logo, company_description, \
             location FROM profile WHERE role = 'employer' AND company_name != '' \
             ORDER BY company_name, user_id",
        )?;
        let companies = stmt
            .query_map([], |row| {
                Ok(Company {
                    employer_id: row.get(0)?,
                    company_name: row.get(1)?,
                    company_website: row.get(2)?,
                    company_logo: row.get(3)?,
                    company_description: row.get(4)?,
                    location: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(companies)
    }
}

impl NotificationStore for SqliteUserStore {
    fn create_notification(
        &self,
        user_id: usize,
        message: &str,
        created_at: i64,
    ) -> Result<Notification> {
        let message = truncate_message(message);
        let conn = lock_conn(&self.conn)?;
        conn.execute(
            "INSERT INTO notification (user_id, message, is_read, created_at) VALUES (?1, ?2, 0, ?3)",
            params![user_id, message, created_at],
        )
        .with_context(|| format!("Failed to notify user {}", user_id))?;
        Ok(Notification {
            id: conn.last_insert_rowid() as usize,
            user_id,
            message,
            is_read: false,
            created_at,
        })
    }

    fn read_inbox(&self, user_id: usize) -> Result<Vec<Notification>> {
        let mut conn = lock_conn(&self.conn)?;
        let tx = conn.transaction()?;
        let notifications = {
            let mut stmt = tx.prepare(
                "SELECT id, user_id, message, is_read, created_at FROM notification \
                 WHERE user_id = ?1 ORDER BY created_at DESC, id DESC",
            )?;
            let rows = stmt
                .query_map(params![user_id], notification_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };
        tx.execute(
            "UPDATE notification SET is_read = 1 WHERE user_id = ?1 AND is_read = 0",
            params![user_id],
        )?;
        tx.commit()?;
        Ok(notifications)
    }

    fn get_unread_count(&self, user_id: usize) -> Result<usize> {
        let conn = lock_conn(&self.conn)?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM notification WHERE user_id = ?1 AND is_read = 0",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
