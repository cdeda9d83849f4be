// PIN hashing shared by the server (verification) and the CLI (`pin-hash`).

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of the PIN's UTF-8 bytes. This is the value the
/// web client stores under `security.passwordHash`.
pub fn hash_pin(pin: &str) -> String {
    let digest = Sha256::digest(pin.as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

pub fn verify_pin(pin: &str, stored_hash: &str) -> bool {
    hash_pin(pin).eq_ignore_ascii_case(stored_hash.trim())
}
