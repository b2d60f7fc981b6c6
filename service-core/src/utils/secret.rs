use axum::http::{HeaderMap, header};
use subtle::ConstantTimeEq;

/// Compares a presented credential against the configured one in constant time.
///
/// Empty credentials never match, even against an empty configured value.
pub fn secrets_match(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();

    if provided.is_empty() || expected.is_empty() || provided.len() != expected.len() {
        return false;
    }

    provided.ct_eq(expected).into()
}

/// Extracts the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
