use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Minimum accepted password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Newtype for password to prevent accidental logging
#[derive(Clone)]
pub struct Password(String);

impl Password {
    pub fn new(password: String) -> Self {
        Self(password)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_long_enough(&self) -> bool {
        self.0.chars().count() >= MIN_PASSWORD_LENGTH
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password(***)")
    }
}

#[derive(Debug, Clone)]
pub struct PasswordHashString(String);

impl PasswordHashString {
    pub fn new(hash: String) -> Self {
        Self(hash)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Hash a password with Argon2id and a random salt.
pub fn hash_password(password: &Password) -> Result<PasswordHashString, anyhow::Error> {
    let argon2 = Argon2::default();
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = argon2
        .hash_password(password.as_str().as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();

    Ok(PasswordHashString::new(password_hash))
}

/// Verify a password against a stored hash.
pub fn verify_password(
    password: &Password,
    password_hash: &PasswordHashString,
) -> Result<(), anyhow::Error> {
    let parsed_hash = PasswordHash::new(password_hash.as_str())
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {}", e))?;

    Argon2::default()
        .verify_password(password.as_str().as_bytes(), &parsed_hash)
        .map_err(|_| anyhow::anyhow!("Password verification failed"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let password = Password::new("slaptazodis123".to_string());
        let hash = hash_password(&password).expect("Failed to hash password");

        assert!(hash.as_str().starts_with("$argon2"));
        assert!(verify_password(&password, &hash).is_ok());
    }

    #[test]
    fn test_wrong_password_fails() {
        let hash = hash_password(&Password::new("slaptazodis123".to_string())).unwrap();
        let wrong = Password::new("kitas-slaptazodis".to_string());
        assert!(verify_password(&wrong, &hash).is_err());
    }

    #[test]
    fn test_salted_hashes_differ() {
        let password = Password::new("slaptazodis123".to_string());
        let first = hash_password(&password).unwrap();
        let second = hash_password(&password).unwrap();
        assert_ne!(first.as_str(), second.as_str());
    }

    #[test]
    fn test_minimum_length() {
        assert!(!Password::new("short".to_string()).is_long_enough());
        assert!(Password::new("12345678".to_string()).is_long_enough());
    }

    #[test]
    fn test_debug_hides_password() {
        let password = Password::new("secret-value".to_string());
        assert_eq!(format!("{:?}", password), "Password(***)");
    }
}
