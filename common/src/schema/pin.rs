use anyhow::anyhow;
use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

/// Hash a buyer PIN into an argon2 PHC string for storage.
pub fn hash_pin(pin: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(pin.as_bytes(), &salt)
        .map_err(|e| anyhow!("Failed to hash PIN: {e}"))?
        .to_string();
    Ok(hash)
}

/// Returns `Ok(false)` on mismatch, `Err` only when the stored hash is unreadable.
pub fn verify_pin(pin: &str, pin_hash: &str) -> anyhow::Result<bool> {
    let hash =
        PasswordHash::new(pin_hash).map_err(|e| anyhow!("Failed to parse PIN hash: {e}"))?;
    match Argon2::default().verify_password(pin.as_bytes(), &hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow!("Failed to verify PIN: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_matching_pin() {
        let hash = hash_pin("123456").unwrap();
        assert_ne!(hash, "123456");
        assert!(verify_pin("123456", &hash).unwrap());
    }

    #[test]
    fn rejects_wrong_pin() {
        let hash = hash_pin("123456").unwrap();
        assert!(!verify_pin("654321", &hash).unwrap());
    }

    #[test]
    fn unreadable_hash_is_an_error() {
        assert!(verify_pin("123456", "not-a-phc-string").is_err());
    }
}
