//! Credential extraction from request headers

use axum::http::{HeaderMap, header};

use crate::auth::TokenError;

/// Token from `Authorization: Bearer <token>`
///
/// A missing header is [`TokenError::Missing`]; any other scheme or an empty
/// token is [`TokenError::Malformed`].
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, TokenError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(TokenError::Missing)?
        .to_str()
        .map_err(|_| TokenError::Malformed)?;

    let (scheme, token) = value.split_once(' ').ok_or(TokenError::Malformed)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(TokenError::Malformed);
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(TokenError::Malformed);
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer_token(&headers("Bearer abc.def")), Ok("abc.def"));
        assert_eq!(extract_bearer_token(&headers("bearer abc")), Ok("abc"));
    }

    #[test]
    fn test_missing_and_malformed() {
        assert_eq!(
            extract_bearer_token(&HeaderMap::new()),
            Err(TokenError::Missing)
        );
        assert_eq!(
            extract_bearer_token(&headers("Basic dXNlcg==")),
            Err(TokenError::Malformed)
        );
        assert_eq!(
            extract_bearer_token(&headers("Bearer ")),
            Err(TokenError::Malformed)
        );
    }
}
