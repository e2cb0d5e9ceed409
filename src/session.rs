//! 会话令牌编解码。
//!
//! The cookie carries the credentials themselves; the server keeps no session
//! table and re-validates on every request. Callers only see [`SessionCodec`],
//! so the plaintext scheme can be replaced by a signed token later.

const SEPARATOR: char = ':';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCredentials {
    pub username: String,
    pub password: String,
}

impl SessionCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("session token must have exactly two fields, got {0}")]
    Malformed(usize),
}

pub trait SessionCodec: Send + Sync {
    fn encode(&self, credentials: &SessionCredentials) -> String;
    fn decode(&self, token: &str) -> Result<SessionCredentials, TokenError>;
}

/// `username:password` with no escaping.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainCredentialCodec;

impl SessionCodec for PlainCredentialCodec {
    fn encode(&self, credentials: &SessionCredentials) -> String {
        format!(
            "{}{SEPARATOR}{}",
            credentials.username, credentials.password
        )
    }

    fn decode(&self, token: &str) -> Result<SessionCredentials, TokenError> {
        let parts: Vec<&str> = token.split(SEPARATOR).collect();
        match parts.as_slice() {
            [username, password] => Ok(SessionCredentials::new(*username, *password)),
            _ => Err(TokenError::Malformed(parts.len())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_joins_with_colon() {
        let token = PlainCredentialCodec.encode(&SessionCredentials::new("alice", "secret1"));
        assert_eq!(token, "alice:secret1");
    }

    #[test]
    fn decode_inverts_encode() {
        let codec = PlainCredentialCodec;
        for (user, pass) in [("alice", "secret1"), ("bob", ""), ("", "x"), ("ünï", "p@ss w0rd")] {
            let credentials = SessionCredentials::new(user, pass);
            assert_eq!(codec.decode(&codec.encode(&credentials)), Ok(credentials));
        }
    }

    #[test]
    fn decode_requires_exactly_two_fields() {
        let codec = PlainCredentialCodec;
        // An empty string splits into one empty field.
        assert_eq!(codec.decode(""), Err(TokenError::Malformed(1)));
        assert_eq!(codec.decode("alice"), Err(TokenError::Malformed(1)));
        assert_eq!(codec.decode("a:b:c"), Err(TokenError::Malformed(3)));
        assert_eq!(codec.decode("::"), Err(TokenError::Malformed(3)));
    }

    #[test]
    fn separator_in_password_breaks_decode() {
        let codec = PlainCredentialCodec;
        let token = codec.encode(&SessionCredentials::new("alice", "a:b"));
        assert!(codec.decode(&token).is_err());
    }
}
