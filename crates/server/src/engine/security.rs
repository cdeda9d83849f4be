// The document's PIN settings, kept by the web client in the Y.Map
// `security` of the collab document.

use anyhow::Result;
use yrs::{Any, Map, Out, Transact};

use super::YDoc;

pub const SECURITY_MAP: &str = "security";
pub const PASSWORD_HASH_KEY: &str = "passwordHash";

/// Stored PIN hash, if the document has a non-empty one.
pub fn password_hash(doc: &YDoc) -> Option<String> {
    let security = doc.get_or_insert_map(SECURITY_MAP);
    let txn = doc.inner().transact();
    match security.get(&txn, PASSWORD_HASH_KEY) {
        Some(Out::Any(Any::String(hash))) if !hash.is_empty() => Some(hash.to_string()),
        _ => None,
    }
}

/// Decode collab state and read its PIN hash. An empty update is an
/// unprotected, never-opened document.
pub fn password_hash_from_update(update: &[u8]) -> Result<Option<String>> {
    if update.is_empty() {
        return Ok(None);
    }
    Ok(password_hash(&YDoc::from_state(update)?))
}
