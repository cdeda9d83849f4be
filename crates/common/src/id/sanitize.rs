// Document id sanitizing, shared by the server routes and the collab client.
//
// The collab server only accepts lowercase ASCII word characters and hyphens
// in document names, so every id coming from a URL goes through here first.

/// Sanitize a raw document or subdocument name.
///
/// Rules:
/// - lowercase and trim
/// - drop every character that is not an ASCII word character (`[A-Za-z0-9_]`),
///   whitespace or `-`
/// - turn whitespace runs into `-` and collapse repeated `-`
/// - strip leading and trailing `-`
///
/// The result may be empty; callers decide whether that is an error.
pub fn sanitize_document_id(input: &str) -> String {
    let lowered = input.to_lowercase();
    let mut out = String::with_capacity(lowered.len());

    for ch in lowered.trim().chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            out.push(ch);
        } else if (ch.is_whitespace() || ch == '-') && !out.ends_with('-') {
            out.push('-');
        }
    }

    out.trim_matches('-').to_string()
}
