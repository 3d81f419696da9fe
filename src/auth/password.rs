use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use thiserror::Error;
use tracing::error;

/// Memory cost in KiB.
const M_COST_KIB: u32 = 19 * 1024;
/// Iterations.
const T_COST: u32 = 2;
/// Lanes.
const P_COST: u32 = 1;

#[derive(Debug, Error)]
pub enum HashingError {
    #[error("invalid argon2 parameters: {0}")]
    Params(argon2::Error),
    #[error("password hashing failed: {0}")]
    Hash(password_hash::Error),
    // Only reachable through verify_password, which sign-in will call.
    #[allow(dead_code)]
    #[error("stored digest is malformed: {0}")]
    MalformedDigest(password_hash::Error),
    #[allow(dead_code)]
    #[error("password verification failed: {0}")]
    Verify(password_hash::Error),
}

fn hasher() -> Result<Argon2<'static>, HashingError> {
    let params = Params::new(M_COST_KIB, T_COST, P_COST, None).map_err(HashingError::Params)?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash a plaintext password into a salted PHC digest.
pub fn hash_password(plain: &str) -> Result<String, HashingError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = hasher()?
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            HashingError::Hash(e)
        })?
        .to_string();
    Ok(hash)
}

/// `Ok(false)` on mismatch; `Err` for an unparseable digest or any other
/// verification failure (unsupported algorithm, bad params).
// Not called outside tests until sign-in checks credentials.
#[allow(dead_code)]
pub fn verify_password(plain: &str, digest: &str) -> Result<bool, HashingError> {
    let parsed = PasswordHash::new(digest).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        HashingError::MalformedDigest(e)
    })?;
    // Parameters come from the digest itself, so older cost settings still verify.
    match Argon2::default().verify_password(plain.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => {
            error!(error = %e, "argon2 verify_password error");
            Err(HashingError::Verify(e))
        }
    }
}
