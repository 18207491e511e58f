//! Authentication sessions.
//!
//! A [`Session`] is an immutable snapshot of the credentials used for a
//! request. Re-authenticating never mutates a session; it produces the next
//! one with a higher [`Session::generation`], so every call can be traced to
//! the credentials it actually used.

use zeroize::{Zeroize, ZeroizeOnDrop};

/// A KMS access token with automatic zeroization.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct AuthToken {
    token: String,
}

impl AuthToken {
    /// Wraps a raw token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Returns the raw token.
    ///
    /// Use with caution - the returned slice is not zeroized automatically.
    #[inline]
    pub fn expose(&self) -> &str {
        &self.token
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthToken")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Credentials snapshot carried into each transport call.
#[derive(Debug, Clone, Default)]
pub struct Session {
    token: Option<AuthToken>,
    generation: u64,
}

impl Session {
    /// Creates an unauthenticated session (generation 0).
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Creates a generation-0 session holding `token`.
    pub fn with_token(token: AuthToken) -> Self {
        Self {
            token: Some(token),
            generation: 0,
        }
    }

    /// Produces the session that replaces this one after re-authentication.
    pub fn next(&self, token: AuthToken) -> Self {
        Self {
            token: Some(token),
            generation: self.generation + 1,
        }
    }

    /// Returns the token, if authenticated.
    pub fn token(&self) -> Option<&AuthToken> {
        self.token.as_ref()
    }

    /// Number of re-authentications that led to this session.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn test_token_debug_redacted() {
        let token = AuthToken::new("hvs.super-secret");
        let debug_str = format!("{:?}", token);
        assert!(debug_str.contains("[REDACTED]"));
        assert!(!debug_str.contains("super-secret"));
    }

    #[test]
    fn test_session_debug_redacted() {
        let session = Session::with_token(AuthToken::new("hvs.super-secret"));
        assert!(!format!("{:?}", session).contains("super-secret"));
    }

    #[test]
    fn test_anonymous_session() {
        let session = Session::anonymous();
        assert!(session.token().is_none());
        assert_eq!(session.generation(), 0);
    }

    #[test]
    fn test_next_bumps_generation() {
        let first = Session::with_token(AuthToken::new("one"));
        let second = first.next(AuthToken::new("two"));
        let third = second.next(AuthToken::new("three"));

        assert_eq!(first.token().map(AuthToken::expose), Some("one"));
        assert_eq!(second.generation(), 1);
        assert_eq!(third.generation(), 2);
        assert_eq!(third.token().map(AuthToken::expose), Some("three"));
    }
}
