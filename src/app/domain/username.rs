use validator::ValidationError;

/// Login identifier. Trimmed, lowercase, 3 to 64 chars of `[a-z0-9._-]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Username(String);

impl Username {
    pub fn new(raw: String) -> Result<Self, ValidationError> {
        let normalized = raw.trim().to_lowercase();

        if normalized.len() < 3 || normalized.len() > 64 {
            let mut error = ValidationError::new("username_length");
            error.message = Some("Username must be between 3 and 64 characters".into());
            return Err(error);
        }

        let allowed = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-');
        if !normalized.chars().all(allowed) {
            let mut error = ValidationError::new("username_charset");
            error.message = Some("Username may only contain letters, digits, '.', '_' and '-'".into());
            return Err(error);
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
