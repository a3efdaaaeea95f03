use crate::errors::ServerError;
use serde_json::Value;

/// A validated remote-store record id: 32 hex characters once hyphens are
/// stripped. Stored in the form the caller supplied so it can be passed back
/// to the remote API unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordId(String);

impl RecordId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// True iff `id`, stripped of hyphens, is exactly 32 hex chars.
pub fn is_valid_id(id: &str) -> bool {
    let normalized: String = id.chars().filter(|c| *c != '-').collect();
    normalized.len() == 32 && normalized.chars().all(|c| c.is_ascii_hexdigit())
}

/// Validate a page id from the request payload. Missing and malformed ids
/// produce field-specific messages so the UI can surface them directly.
pub fn validate_id(id: Option<&str>, field_name: &str) -> Result<RecordId, ServerError> {
    match id {
        None | Some("") => Err(ServerError::BadRequest(format!("{field_name} is required"))),
        Some(raw) if is_valid_id(raw) => Ok(RecordId(raw.to_string())),
        Some(_) => Err(ServerError::BadRequest(format!(
            "Invalid {field_name} format"
        ))),
    }
}

/// Pragmatic structural email check: one `@`, non-empty local and domain
/// parts, a dot somewhere in the domain, no whitespace or control chars.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return false;
    }
    let mut parts = email.splitn(2, '@');
    let (Some(local), Some(domain)) = (parts.next(), parts.next()) else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    // Domain needs an interior dot: "a.b", not ".b" or "a."
    match domain.rfind('.') {
        Some(idx) => idx > 0 && idx < domain.len() - 1,
        None => false,
    }
}

/// Phone numbers must carry 10-15 digits and use only digits plus common
/// formatting characters (space, dash, parens, plus, dot).
pub fn is_valid_phone(phone: &str) -> bool {
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    if !(10..=15).contains(&digits) {
        return false;
    }
    phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')' | '+' | '.'))
}

/// Pull a non-empty string field out of a JSON payload.
pub fn str_field<'a>(body: &'a Value, name: &str) -> Option<&'a str> {
    body.get(name).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Check that every named field is present and non-empty, collecting all
/// missing names into one error so the caller sees the full list at once.
pub fn require_fields(body: &Value, names: &[&str]) -> Result<(), ServerError> {
    let missing: Vec<String> = names
        .iter()
        .filter(|name| str_field(body, name).is_none())
        .map(|name| name.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ServerError::MissingFields(missing))
    }
}

/// Strip C0 control characters (keeping tab/newline/CR), truncate to
/// `MAX_TEXT_LEN` chars and trim. Applied to every free-text value before it
/// reaches the activity log.
pub const MAX_TEXT_LEN: usize = 500;

pub fn sanitize(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(*c, '\u{0}'..='\u{8}' | '\u{b}' | '\u{c}' | '\u{e}'..='\u{1f}'))
        .take(MAX_TEXT_LEN)
        .collect::<String>()
        .trim()
        .to_string()
}
