//! Test fixture creation for the database
//!
//! Users are inserted straight through the store so that tests start from
//! known accounts without going through registration and activation.

use super::constants::*;
use anyhow::{anyhow, Result};
use jobboard_server::sqlite_persistence::{open_database, SharedConnection};
use jobboard_server::user::{
    HashedPassword, NewUser, ProfileStore, Role, RoleProfile, SqliteUserStore, UserStore,
};
use std::path::PathBuf;
use tempfile::TempDir;

fn create_user(
    store: &SqliteUserStore,
    username: &str,
    email: &str,
    role: Role,
    verified: bool,
) -> Result<usize> {
    let new_user = NewUser {
        username: username.to_string(),
        email: email.to_string(),
        role,
        password: HashedPassword::new(TEST_PASS)?,
    };
    let user_id = store
        .create_user(&new_user, START_TIME)?
        .ok_or_else(|| anyhow!("User {} already exists", username))?;
    if verified {
        store.set_email_verified(user_id)?;
    }
    Ok(user_id)
}

fn name_company(store: &SqliteUserStore, user_id: usize, company_name: &str) -> Result<()> {
    let mut profile = store
        .get_profile(user_id)?
        .ok_or_else(|| anyhow!("User {} has no profile", user_id))?;
    profile.location = "Berlin".to_string();
    profile.role_profile = RoleProfile::Employer {
        company_name: company_name.to_string(),
        company_website: "https://example.com".to_string(),
        company_logo: None,
        company_description: Some(format!("{} builds things.", company_name)),
    };
    store.update_profile(&profile)
}

/// Creates a temporary database with two employers and two job seekers
/// Returns (temp_dir, db_path, connection)
pub fn create_test_db_with_users() -> Result<(TempDir, PathBuf, SharedConnection)> {
    let dir = TempDir::new()?;
    let db_path = dir.path().join("jobboard.db");
    let conn = open_database(&db_path)?;
    let store = SqliteUserStore::new(conn.clone());

    let employer_id = create_user(&store, EMPLOYER_USER, EMPLOYER_EMAIL, Role::Employer, true)?;
    name_company(&store, employer_id, EMPLOYER_COMPANY)?;
    let other_employer_id = create_user(
        &store,
        OTHER_EMPLOYER_USER,
        OTHER_EMPLOYER_EMAIL,
        Role::Employer,
        true,
    )?;
    name_company(&store, other_employer_id, "Globex")?;

    create_user(&store, SEEKER_USER, SEEKER_EMAIL, Role::JobSeeker, true)?;
    create_user(
        &store,
        UNVERIFIED_SEEKER_USER,
        UNVERIFIED_SEEKER_EMAIL,
        Role::JobSeeker,
        false,
    )?;

    Ok((dir, db_path, conn))
}
