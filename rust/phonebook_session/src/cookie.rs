//! Session cookie helpers.

use std::time::Duration;

use crate::session::SessionToken;

pub const SESSION_COOKIE: &str = "phonebook_session";

/// `Set-Cookie` value issued after sign-in.
pub fn set_cookie(token: &SessionToken, max_age: Duration) -> String {
    format!(
        "{SESSION_COOKIE}={token}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        max_age.as_secs()
    )
}

/// `Set-Cookie` value that makes the client drop the session cookie.
pub fn clear_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax")
}

/// Extract the session token from a `Cookie` request header.
///
/// Malformed values are treated as absent.
pub fn token_from_header(header: &str) -> Option<SessionToken> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| SessionToken::parse(value.trim_matches('"')))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_parse() {
        let token = SessionToken::generate(9);
        let set = set_cookie(&token, Duration::from_secs(600));
        assert!(set.starts_with("phonebook_session="));
        assert!(set.contains("Max-Age=600"));

        let header = format!("theme=dark; {SESSION_COOKIE}={token}; lang=en");
        assert_eq!(token_from_header(&header), Some(token));
    }

    #[test]
    fn test_missing_or_malformed() {
        assert_eq!(token_from_header(""), None);
        assert_eq!(token_from_header("theme=dark"), None);
        assert_eq!(token_from_header("phonebook_session=not-a-token"), None);
        assert!(clear_cookie().contains("Max-Age=0"));
    }
}
