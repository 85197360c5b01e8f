//! Shared-secret token authentication for the curation endpoints.

use async_trait::async_trait;

use super::{AuthError, AuthRequest, Authenticator, Identity};

/// Header carrying the curation token (lowercase, as stored in `AuthRequest`).
pub const TOKEN_HEADER: &str = "x-plugin-store-token";

/// Authenticator that validates requests against the configured admin token.
///
/// The token is read from the `X-Plugin-Store-Token` header. When no token is
/// configured on the server every request fails with
/// [`AuthError::NotConfigured`], which callers surface as "service unavailable"
/// rather than "unauthorized".
pub struct TokenAuthenticator {
    expected_token: Option<String>,
}

impl TokenAuthenticator {
    pub fn new(token: Option<String>) -> Self {
        Self {
            expected_token: token.filter(|t| !t.is_empty()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.expected_token.is_some()
    }
}

#[async_trait]
impl Authenticator for TokenAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError> {
        let expected = self
            .expected_token
            .as_deref()
            .ok_or(AuthError::NotConfigured)?;

        let provided = request
            .headers
            .get(TOKEN_HEADER)
            .filter(|v| !v.is_empty())
            .ok_or(AuthError::NotAuthenticated)?;

        // Constant-time comparison to prevent timing attacks
        if constant_time_eq(provided.as_bytes(), expected.as_bytes()) {
            Ok(Identity::admin())
        } else {
            Err(AuthError::InvalidCredentials(
                "Invalid or missing admin token".to_string(),
            ))
        }
    }

    fn method_name(&self) -> &'static str {
        "token"
    }
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;

    fn make_request(headers: Vec<(&str, &str)>) -> AuthRequest {
        AuthRequest {
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.to_lowercase(), v.to_string()))
                .collect(),
            source_ip: "127.0.0.1".parse::<IpAddr>().unwrap(),
        }
    }

    #[tokio::test]
    async fn test_valid_token() {
        let auth = TokenAuthenticator::new(Some("secret-token".to_string()));
        let request = make_request(vec![("X-Plugin-Store-Token", "secret-token")]);

        let identity = auth.authenticate(&request).await.unwrap();

        assert_eq!(identity.user_id, "admin");
        assert_eq!(identity.method, "token");
    }

    #[tokio::test]
    async fn test_invalid_token() {
        let auth = TokenAuthenticator::new(Some("secret-token".to_string()));
        let request = make_request(vec![("X-Plugin-Store-Token", "wrong")]);

        let result = auth.authenticate(&request).await;

        assert!(matches!(result, Err(AuthError::InvalidCredentials(_))));
    }

    #[tokio::test]
    async fn test_missing_header() {
        let auth = TokenAuthenticator::new(Some("secret-token".to_string()));
        let request = make_request(vec![]);

        let result = auth.authenticate(&request).await;

        assert!(matches!(result, Err(AuthError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn test_empty_header_is_missing() {
        let auth = TokenAuthenticator::new(Some("secret-token".to_string()));
        let request = make_request(vec![("X-Plugin-Store-Token", "")]);

        let result = auth.authenticate(&request).await;

        assert!(matches!(result, Err(AuthError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn test_unconfigured_token_is_not_configured() {
        let auth = TokenAuthenticator::new(None);
        let request = make_request(vec![("X-Plugin-Store-Token", "anything")]);

        let result = auth.authenticate(&request).await;

        assert!(matches!(result, Err(AuthError::NotConfigured)));
        assert!(!auth.is_configured());
    }

    #[tokio::test]
    async fn test_empty_configured_token_is_not_configured() {
        let auth = TokenAuthenticator::new(Some(String::new()));
        let request = make_request(vec![("X-Plugin-Store-Token", "")]);

        let result = auth.authenticate(&request).await;

        assert!(matches!(result, Err(AuthError::NotConfigured)));
    }

    #[test]
    fn test_method_name() {
        let auth = TokenAuthenticator::new(Some("test".to_string()));
        assert_eq!(auth.method_name(), "token");
        assert!(auth.is_configured());
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"hello", b"hell"));
        assert!(!constant_time_eq(b"", b"x"));
        assert!(constant_time_eq(b"", b""));
    }
}
