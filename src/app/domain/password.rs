use argon2::{
    password_hash::SaltString,
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use rand_core::OsRng;
use validator::ValidationError;

/// Plaintext password. `new` enforces strength; `for_verification` does not.
#[derive(Debug, Clone)]
pub struct Password(String);

impl Password {
    /// Wrap a submitted login password. Only compared against a stored hash,
    /// so existing accounts with older, weaker passwords can still sign in.
    pub fn for_verification(plaintext: String) -> Self {
        Self(plaintext)
    }

    /// Build a password that is about to be stored (seeds, password reset).
    pub fn new(password: String) -> Result<Self, ValidationError> {
        match strength_error(&password) {
            Some(error) => Err(error),
            None => Ok(Self(password)),
        }
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

fn strength_error(password: &str) -> Option<ValidationError> {
    let (code, message) = if password.chars().count() < 10 {
        ("password_too_short", "Password must be at least 10 characters")
    } else if password.len() > 128 {
        ("password_too_long", "Password must be at most 128 characters")
    } else if !password.chars().any(char::is_alphabetic) || !password.chars().any(|c| c.is_ascii_digit()) {
        ("weak_password", "Password must contain letters and digits")
    } else {
        return None;
    };

    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    Some(error)
}

/// Argon2id PHC string as stored in `users.password_hash`.
#[derive(Debug, Clone)]
pub struct HashedPassword(String);

impl HashedPassword {
    pub fn from_password(password: &Password) -> Result<Self, argon2::password_hash::Error> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
        Ok(Self(hash.to_string()))
    }

    pub fn verify(&self, password: &Password) -> Result<(), argon2::password_hash::Error> {
        let parsed = PasswordHash::new(&self.0)?;
        Argon2::default().verify_password(password.as_bytes(), &parsed)
    }

    /// Wrap a hash loaded from the database.
    pub fn from_string(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
