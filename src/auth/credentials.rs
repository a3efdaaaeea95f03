//! Account lookup and password verification against the TeamMembers
//! collection.
//!
//! Passwords are stored in the remote workspace as plain text and compared
//! verbatim; operational tooling reads the stored value, so hashing cannot
//! be introduced here unilaterally. The comparison sits behind
//! `CredentialVerifier` so a hashed scheme can be swapped in later without
//! touching the login flow.

use crate::auth::sessions::SessionUser;
use crate::errors::ServerError;
use crate::store::{flatten_record, format, schema, Collection, RecordStore, DEFAULT_MAX_PAGES};
use serde_json::{json, Value};

pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, candidate: &str, stored: &str) -> bool;
}

pub struct PlaintextVerifier;

impl CredentialVerifier for PlaintextVerifier {
    fn verify(&self, candidate: &str, stored: &str) -> bool {
        !stored.is_empty() && candidate == stored
    }
}

#[derive(Debug, Clone)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub email: String,
    pub status: String,
    pub password: String,
    pub role: String,
}

fn field<'a>(flat: &'a serde_json::Map<String, Value>, name: &str) -> &'a str {
    flat.get(name).and_then(Value::as_str).unwrap_or("")
}

/// Find a team member by either of their email columns, case-insensitively.
pub fn find_account(
    store: &dyn RecordStore,
    email: &str,
) -> Result<Option<Account>, ServerError> {
    let wanted = email.trim().to_lowercase();
    let pages = store.query(Collection::TeamMembers, None, None, DEFAULT_MAX_PAGES)?;

    for page in &pages {
        let mut flat = flatten_record(page);
        schema::canonicalize(Collection::TeamMembers, &mut flat);

        let work = field(&flat, "Email Work").trim().to_lowercase();
        let personal = field(&flat, "Email Personal").trim().to_lowercase();
        if work != wanted && personal != wanted {
            continue;
        }

        let role = if field(&flat, "Role").eq_ignore_ascii_case("admin") {
            "admin"
        } else {
            "employee"
        };
        return Ok(Some(Account {
            id: field(&flat, "id").to_string(),
            name: field(&flat, "Name").to_string(),
            email: if work.is_empty() { personal } else { work },
            status: field(&flat, "Status").to_string(),
            password: field(&flat, "Password").to_string(),
            role: role.to_string(),
        }));
    }
    Ok(None)
}

/// Account state machine: not_found -> pending -> active -> terminated.
/// Only `active` accounts with a matching password may log in; each failure
/// mode gets its own caller-facing message.
pub fn login(
    store: &dyn RecordStore,
    verifier: &dyn CredentialVerifier,
    email: &str,
    password: &str,
) -> Result<SessionUser, ServerError> {
    let account = find_account(store, email)?
        .ok_or_else(|| ServerError::Unauthorized("Account not found".into()))?;

    match account.status.to_lowercase().as_str() {
        "active" => {}
        "pending" => {
            return Err(ServerError::Unauthorized(
                "Please create a password first".into(),
            ))
        }
        "terminated" => {
            return Err(ServerError::Unauthorized("Account access revoked".into()))
        }
        _ => return Err(ServerError::Unauthorized("Account not active".into())),
    }

    if !verifier.verify(password, &account.password) {
        return Err(ServerError::Unauthorized("Invalid password".into()));
    }

    Ok(SessionUser {
        id: account.id,
        email: account.email,
        role: account.role,
        full_name: account.name,
    })
}

/// What the onboarding client should do next for a given email.
#[derive(Debug)]
pub struct EmailStatus {
    pub status: &'static str,
    pub message: &'static str,
    /// Only meaningful for active accounts.
    pub has_password: Option<bool>,
}

/// Pre-login status lookup. Always succeeds; the account's state decides
/// whether the client shows the password prompt or the create-password form.
pub fn check_email(store: &dyn RecordStore, email: &str) -> Result<EmailStatus, ServerError> {
    let Some(account) = find_account(store, email)? else {
        return Ok(EmailStatus {
            status: "not_found",
            message: "Please contact admin to create an account",
            has_password: None,
        });
    };

    Ok(match account.status.to_lowercase().as_str() {
        "active" => EmailStatus {
            status: "active",
            message: "Please enter your password",
            has_password: Some(!account.password.is_empty()),
        },
        "pending" => EmailStatus {
            status: "pending",
            message: "Please create a password to activate your account",
            has_password: None,
        },
        "terminated" => EmailStatus {
            status: "terminated",
            message: "You do not have access. Please contact admin.",
            has_password: None,
        },
        _ => EmailStatus {
            status: "unknown",
            message: "Account status unknown. Please contact admin.",
            has_password: None,
        },
    })
}

/// Activate a pending account: store its password and flip Status to
/// Active. Only pending accounts may pass through here; every other state
/// gets its own message so the client can route the user.
pub fn create_password(
    store: &dyn RecordStore,
    email: &str,
    password: &str,
    confirm: Option<&str>,
) -> Result<SessionUser, ServerError> {
    if confirm != Some(password) {
        return Err(ServerError::BadRequest("Passwords do not match".into()));
    }
    if password.len() < 6 {
        return Err(ServerError::BadRequest(
            "Password must be at least 6 characters".into(),
        ));
    }

    let account = find_account(store, email)?
        .ok_or_else(|| ServerError::Unauthorized("Account not found".into()))?;

    match account.status.to_lowercase().as_str() {
        "pending" => {}
        "active" => {
            return Err(ServerError::BadRequest(
                "Account already active. Please login.".into(),
            ))
        }
        "terminated" => {
            return Err(ServerError::BadRequest("Account access revoked".into()))
        }
        _ => {
            return Err(ServerError::BadRequest(
                "Cannot create password for this account".into(),
            ))
        }
    }

    store.update(
        &account.id,
        json!({
            "Password": format::rich_text(password),
            "Status": format::status("Active"),
        }),
    )?;

    Ok(SessionUser {
        id: account.id,
        email: account.email,
        role: account.role,
        full_name: account.name,
    })
}
