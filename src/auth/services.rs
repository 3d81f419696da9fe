use anyhow::Context;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, warn};

use crate::{
    auth::{
        dto::SignUpRequest,
        jwt::JwtKeys,
        password::hash_password,
        repo::{StoreError, UserStore},
        repo_types::{NewUser, Role, User},
    },
    error::{AppError, FieldError},
};

const NAME_MAX_CHARS: usize = 100;
const EMAIL_MAX_CHARS: usize = 254;
pub(crate) const PASSWORD_MIN_CHARS: usize = 8;
const PASSWORD_MAX_CHARS: usize = 128;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex is valid");
    }
    EMAIL_RE.is_match(email)
}

/// Sign-up payload after normalization and validation.
#[derive(Debug)]
pub(crate) struct ValidSignUp {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// Normalize the payload and collect every field error at once.
pub(crate) fn validate_sign_up(req: SignUpRequest) -> Result<ValidSignUp, AppError> {
    let name = req.name.trim().to_string();
    let email = req.email.trim().to_lowercase();
    let password = req.password;
    let mut errors = Vec::new();

    if name.is_empty() {
        errors.push(FieldError::new("name", "is required"));
    } else if name.chars().count() > NAME_MAX_CHARS {
        errors.push(FieldError::new(
            "name",
            format!("must be at most {NAME_MAX_CHARS} characters"),
        ));
    }

    if email.is_empty() {
        errors.push(FieldError::new("email", "is required"));
    } else if email.chars().count() > EMAIL_MAX_CHARS || !is_valid_email(&email) {
        errors.push(FieldError::new("email", "must be a valid email address"));
    }

    let password_len = password.chars().count();
    if password.is_empty() {
        errors.push(FieldError::new("password", "is required"));
    } else if password_len < PASSWORD_MIN_CHARS {
        errors.push(FieldError::new(
            "password",
            format!("must be at least {PASSWORD_MIN_CHARS} characters"),
        ));
    } else if password_len > PASSWORD_MAX_CHARS {
        errors.push(FieldError::new(
            "password",
            format!("must be at most {PASSWORD_MAX_CHARS} characters"),
        ));
    }

    // Accounts can never grant themselves admin.
    let role = match req.role.as_deref().map(str::trim) {
        None | Some("") | Some("user") => Role::User,
        Some("admin") => {
            errors.push(FieldError::new("role", "admin role cannot be self-assigned"));
            Role::User
        }
        Some(_) => {
            errors.push(FieldError::new("role", "must be \"user\""));
            Role::User
        }
    };

    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }
    Ok(ValidSignUp {
        name,
        email,
        password,
        role,
    })
}

/// A persisted account and the session token minted for it.
#[derive(Debug)]
pub struct SignedUp {
    pub user: User,
    pub token: String,
}

/// Validate, hash, persist and issue a token for a new account.
pub async fn sign_up(
    store: &dyn UserStore,
    keys: &JwtKeys,
    req: SignUpRequest,
) -> Result<SignedUp, AppError> {
    let input = match validate_sign_up(req) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "sign-up payload rejected");
            return Err(e);
        }
    };

    // Ensure email is not taken
    match store.find_by_email(&input.email).await {
        Ok(Some(_)) => {
            warn!(email = %input.email, "email already registered");
            return Err(AppError::Conflict);
        }
        Ok(None) => {}
        Err(e) => return Err(store_failure(e)),
    }

    let hash = hash_password(&input.password).context("hash password")?;
    debug!("password hashed");

    let user = store
        .create(NewUser {
            name: &input.name,
            email: &input.email,
            password_hash: &hash,
            role: input.role,
        })
        .await
        .map_err(|e| match e {
            // Lost a race with a concurrent sign-up for the same email.
            StoreError::Conflict => {
                warn!(email = %input.email, "email already registered");
                AppError::Conflict
            }
            other => store_failure(other),
        })?;
    debug!(user_id = %user.id, "user persisted");

    let token = keys.issue(&user).context("sign session token")?;
    Ok(SignedUp { user, token })
}

fn store_failure(e: StoreError) -> AppError {
    match e {
        StoreError::Conflict => AppError::Conflict,
        // Logged once, when the response is rendered.
        StoreError::Unavailable(_) => AppError::Internal(anyhow::Error::new(e)),
    }
}
