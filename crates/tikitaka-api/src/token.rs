use std::time::Duration;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use tikitaka_types::api::Claims;

/// Default token lifetime: seven days.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Why a token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    Expired,
    Invalid,
}

/// Signing secret and lifetime for HS256 access tokens.
#[derive(Clone)]
pub struct TokenConfig {
    secret: String,
    ttl: Duration,
}

impl TokenConfig {
    pub fn new(secret: impl Into<String>, ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            ttl,
        }
    }

    pub fn issue(&self, user_id: i64, email: &str, username: &str) -> anyhow::Result<String> {
        let now = chrono::Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            username: username.to_string(),
            iat: now,
            exp: now + self.ttl.as_secs() as usize,
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?;
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.decode_with(token, self.validation())
    }

    /// Check the signature but not the expiry. Used by token refresh.
    pub fn decode_allow_expired(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = self.validation();
        validation.validate_exp = false;
        self.decode_with(token, validation)
    }

    /// Sign the identity of an existing token again with a fresh expiry.
    pub fn refresh(&self, token: &str) -> Result<String, TokenError> {
        let claims = self.decode_allow_expired(token)?;
        self.issue(claims.sub, &claims.email, &claims.username)
            .map_err(|_| TokenError::Invalid)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation
    }

    fn decode_with(&self, token: &str, validation: Validation) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &DecodingKey::from_secret(self.secret.as_bytes()), &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}

/// Parse a token lifetime: `7d`, `12h`, `30m`, `45s` or bare seconds.
pub fn parse_ttl(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let split = raw.find(|c: char| !c.is_ascii_digit()).unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);
    let value: u64 = digits.parse().ok()?;
    let multiplier = match unit.trim() {
        "" | "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        _ => return None,
    };
    (value > 0).then(|| Duration::from_secs(value * multiplier))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TokenConfig {
        TokenConfig::new("test-secret", DEFAULT_TOKEN_TTL)
    }

    fn expired_token(config: &TokenConfig) -> String {
        let claims = Claims {
            sub: 42,
            email: "old@example.com".into(),
            username: "old".into(),
            iat: 1_000,
            exp: 2_000,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn issued_tokens_verify() {
        let config = config();
        let token = config.issue(7, "fan@example.com", "fan").unwrap();
        let claims = config.verify(&token).unwrap();
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.username, "fan");
        assert_eq!(claims.exp - claims.iat, DEFAULT_TOKEN_TTL.as_secs() as usize);
    }

    #[test]
    fn expired_and_invalid_are_distinguished() {
        let config = config();
        assert_eq!(config.verify(&expired_token(&config)), Err(TokenError::Expired));
        assert_eq!(config.verify("not.a.token"), Err(TokenError::Invalid));

        let other = TokenConfig::new("another-secret", DEFAULT_TOKEN_TTL);
        let token = other.issue(1, "a@example.com", "abc").unwrap();
        assert_eq!(config.verify(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn refresh_accepts_expired_tokens() {
        let config = config();
        let fresh = config.refresh(&expired_token(&config)).unwrap();
        let claims = config.verify(&fresh).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.email, "old@example.com");

        assert_eq!(config.refresh("garbage"), Err(TokenError::Invalid));
    }

    #[test]
    fn ttl_formats() {
        assert_eq!(parse_ttl("7d"), Some(Duration::from_secs(604_800)));
        assert_eq!(parse_ttl("12h"), Some(Duration::from_secs(43_200)));
        assert_eq!(parse_ttl("30m"), Some(Duration::from_secs(1_800)));
        assert_eq!(parse_ttl("45s"), Some(Duration::from_secs(45)));
        assert_eq!(parse_ttl("3600"), Some(Duration::from_secs(3_600)));
        assert_eq!(parse_ttl("0"), None);
        assert_eq!(parse_ttl("7w"), None);
        assert_eq!(parse_ttl("d"), None);
    }
}
