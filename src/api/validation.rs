use super::ApiError;

/// Longest token the issuer can produce (a hyphenated UUID) with some slack.
const MAX_TOKEN_LEN: usize = 64;

/// Rejects empty or oversized token parameters before touching the database.
/// Uses the same message as an unknown token so callers learn nothing extra.
pub fn validate_token_param<'a>(token: &'a str, invalid_message: &str) -> Result<&'a str, ApiError> {
    let trimmed = token.trim();
    if trimmed.is_empty() || trimmed.len() > MAX_TOKEN_LEN {
        return Err(ApiError::validation(invalid_message));
    }
    Ok(trimmed)
}
