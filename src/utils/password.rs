use base64::{Engine, engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD}};
use hmac::Hmac;
use pbkdf2::pbkdf2;
use rand::Rng;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

const ITERATIONS: u32 = 260000;
const KEY_LENGTH: usize = 32;
const SALT_LENGTH: usize = 16;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Invalid hash format")]
    Format,

    #[error("Invalid hash encoding")]
    Encoding,

    #[error("PBKDF2 failure")]
    Derivation,
}

/// Hash un mot de passe : PBKDF2-HMAC-SHA256, salt aléatoire de 16 bytes.
/// Format stocké : pbkdf2:sha256:iterations$salt$hash (base64 URL-safe)
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill(&mut salt);

    let mut key = [0u8; KEY_LENGTH];
    pbkdf2::<HmacSha256>(password.as_bytes(), &salt, ITERATIONS, &mut key)
        .map_err(|_| PasswordError::Derivation)?;

    Ok(format!(
        "pbkdf2:sha256:{}${}${}",
        ITERATIONS,
        URL_SAFE_NO_PAD.encode(salt),
        URL_SAFE_NO_PAD.encode(key)
    ))
}

/// Vérifie un mot de passe contre un hash stocké.
/// Les comptes importés de l'ancienne plateforme ont un hash hexadécimal.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, PasswordError> {
    let mut parts = stored_hash.split('$');
    let (Some(header), Some(salt_str), Some(hash_str), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(PasswordError::Format);
    };

    let iterations = match header.split(':').collect::<Vec<_>>().as_slice() {
        ["pbkdf2", "sha256", iterations] => iterations.parse::<u32>().map_err(|_| PasswordError::Format)?,
        _ => return Err(PasswordError::Format),
    };

    let salt = decode(salt_str)?;
    let expected = decode(hash_str)?;

    let mut computed = vec![0u8; expected.len()];
    pbkdf2::<HmacSha256>(password.as_bytes(), &salt, iterations, &mut computed)
        .map_err(|_| PasswordError::Derivation)?;

    // Comparaison sans sortie anticipée
    let diff = computed
        .iter()
        .zip(expected.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b));

    Ok(diff == 0 && computed.len() == expected.len())
}

fn decode(input: &str) -> Result<Vec<u8>, PasswordError> {
    // Hash hexadécimal (64 caractères = 32 bytes)
    if input.len() == 64 && input.chars().all(|c| c.is_ascii_hexdigit()) {
        return hex::decode(input).map_err(|_| PasswordError::Encoding);
    }

    URL_SAFE_NO_PAD
        .decode(input)
        .or_else(|_| STANDARD.decode(input))
        .map_err(|_| PasswordError::Encoding)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("pharmacie2025").unwrap();

        assert!(hash.starts_with("pbkdf2:sha256:260000$"));
        assert!(verify_password("pharmacie2025", &hash).unwrap());
        assert!(!verify_password("pharmacie2024", &hash).unwrap());
    }

    #[test]
    fn test_salts_differ() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }

    #[test]
    fn test_legacy_hex_hash() {
        let salt = b"legacy-salt";
        let mut key = [0u8; KEY_LENGTH];
        pbkdf2::<HmacSha256>(b"ancien", salt, 1000, &mut key).unwrap();
        let stored = format!("pbkdf2:sha256:1000${}${}", URL_SAFE_NO_PAD.encode(salt), hex::encode(key));

        assert!(verify_password("ancien", &stored).unwrap());
    }

    #[test]
    fn test_malformed_hash() {
        assert!(matches!(verify_password("x", "not-a-hash"), Err(PasswordError::Format)));
        assert!(matches!(verify_password("x", "md5:1$a$b"), Err(PasswordError::Format)));
    }
}
