//! Local profile sign-in.
//!
//! The store of a profile is only reachable while that profile is signed in,
//! unless `FLOW_STORE_PATH` points at an explicit store file.

use crate::config::config_dir;
use crate::error::AppError;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

const SESSION_FILE_NAME: &str = "session.json";
const SESSION_ENV_VAR: &str = "FLOW_SESSION_PATH";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: String,
    pub signed_in_at: String,
}

pub fn session_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(SESSION_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    Ok(config_dir()?.join(SESSION_FILE_NAME))
}

pub fn login(user: &str) -> Result<Session, AppError> {
    let path = session_path()?;
    login_with_path(&path, user)
}

pub fn logout() -> Result<Option<Session>, AppError> {
    let path = session_path()?;
    logout_with_path(&path)
}

pub fn current_session() -> Result<Option<Session>, AppError> {
    let path = session_path()?;
    load_session(&path)
}

/// Name of the signed-in user, if any.
pub fn current_user() -> Result<Option<String>, AppError> {
    Ok(current_session()?.map(|session| session.user))
}

/// Signed-in session or an `unauthenticated` error.
pub fn require_session() -> Result<Session, AppError> {
    current_session()?
        .ok_or_else(|| AppError::unauthenticated("not signed in; run `flow login <name>`"))
}

pub fn validate_user_name(user: &str) -> Result<String, AppError> {
    let trimmed = user.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("user name is required"));
    }
    let valid = trimmed
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
    if !valid {
        return Err(AppError::invalid_input(
            "user name may only contain letters, digits, '-' and '_'",
        ));
    }
    Ok(trimmed.to_string())
}

fn login_with_path(path: &Path, user: &str) -> Result<Session, AppError> {
    let user = validate_user_name(user)?;
    let signed_in_at = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|err| AppError::invalid_data(err.to_string()))?;
    let session = Session {
        user,
        signed_in_at,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(&session)?)?;
    info!("event=login user={}", session.user);

    Ok(session)
}

fn logout_with_path(path: &Path) -> Result<Option<Session>, AppError> {
    let session = load_session(path)?;
    if session.is_some() {
        std::fs::remove_file(path)?;
    }
    if let Some(session) = session.as_ref() {
        info!("event=logout user={}", session.user);
    }
    Ok(session)
}

fn load_session(path: &Path) -> Result<Option<Session>, AppError> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)?;
    let session: Session = serde_json::from_str(&content)
        .map_err(|err| AppError::invalid_data(format!("invalid session file: {err}")))?;
    validate_user_name(&session.user)
        .map_err(|err| AppError::invalid_data(format!("invalid session file: {}", err.message())))?;
    Ok(Some(session))
}
