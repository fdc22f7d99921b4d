use gatehouse_core::{AppError, AppResult};

/// Generates a cryptographically random QR token and its SHA-256 hash.
///
/// Returns `(raw_token_hex, sha256_hash_hex)`. The raw token goes into the
/// QR code handed to the visitor; only the hash is stored on the visit.
pub(super) fn generate_token() -> AppResult<(String, String)> {
    use std::fmt::Write;

    let mut bytes = [0u8; 32];
    getrandom::fill(&mut bytes)
        .map_err(|error| AppError::Internal(format!("failed to generate QR token: {error}")))?;

    let raw_token = bytes
        .iter()
        .fold(String::with_capacity(64), |mut acc, byte| {
            let _ = write!(acc, "{byte:02x}");
            acc
        });

    let hash = hash_token(&raw_token);
    Ok((raw_token, hash))
}

/// Computes the SHA-256 hash of a token string for storage.
pub(super) fn hash_token(raw_token: &str) -> String {
    use sha2::{Digest, Sha256};
    use std::fmt::Write;

    let mut hasher = Sha256::new();
    hasher.update(raw_token.as_bytes());
    let result = hasher.finalize();

    result
        .iter()
        .fold(String::with_capacity(64), |mut acc, byte| {
            let _ = write!(acc, "{byte:02x}");
            acc
        })
}

#[cfg(test)]
mod tests {
    use super::{generate_token, hash_token};

    #[test]
    fn raw_token_hashes_to_stored_hash() {
        let Ok((raw, hash)) = generate_token() else {
            unreachable!();
        };

        assert_eq!(raw.len(), 64);
        assert_eq!(hash.len(), 64);
        assert_eq!(hash_token(&raw), hash);
    }

    #[test]
    fn tokens_are_unique() {
        let first = generate_token().map(|(raw, _)| raw);
        let second = generate_token().map(|(raw, _)| raw);
        assert!(first.is_ok() && second.is_ok());
        assert_ne!(first.ok(), second.ok());
    }
}
