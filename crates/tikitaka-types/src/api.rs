use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

// -- JWT Claims --

/// JWT claims issued by the auth routes and checked by the auth middleware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: i64,
    pub email: String,
    pub username: String,
    pub iat: usize,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 3, message = "Username must be at least 3 characters"))]
    pub username: String,
    #[validate(range(min = 1, message = "A valid team must be selected"))]
    pub team_id: i64,
    #[validate(length(min = 2, message = "Full name must be at least 2 characters"))]
    pub full_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl RegisterRequest {
    /// Display name stored for the new account: explicit full name, then
    /// first + last name, then the username.
    pub fn display_name(&self) -> String {
        if let Some(full_name) = self.full_name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            return full_name.to_string();
        }
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) if !first.trim().is_empty() && !last.trim().is_empty() => {
                format!("{} {}", first.trim(), last.trim())
            }
            _ => self.username.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

// -- Users --

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 3, message = "Username must be at least 3 characters"))]
    pub username: Option<String>,
    #[validate(length(min = 1, message = "Full name is required"))]
    pub full_name: Option<String>,
    #[validate(range(min = 1, message = "A valid team must be selected"))]
    pub team_id: Option<i64>,
    #[validate(length(max = 500, message = "Bio cannot exceed 500 characters"))]
    pub bio: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(length(min = 6, message = "New password must be at least 6 characters"))]
    pub new_password: String,
}

// -- Posts --

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(custom(function = "not_blank", message = "Content is required"))]
    pub content: String,
    #[validate(range(min = 1, message = "A valid team must be selected"))]
    pub team_id: i64,
    #[serde(default)]
    pub is_draft: bool,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePostRequest {
    #[validate(custom(function = "not_blank", message = "Content is required"))]
    pub content: String,
    #[validate(range(min = 1, message = "A valid team must be selected"))]
    pub team_id: i64,
    pub is_draft: Option<bool>,
    /// `Some("")` clears the current image.
    pub image_url: Option<String>,
}

// -- Comments --

#[derive(Debug, Deserialize, Validate)]
pub struct CommentRequest {
    #[validate(
        custom(function = "not_blank", message = "Comment content is required"),
        length(max = 500, message = "Comment must be between 1 and 500 characters")
    )]
    pub content: String,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

// -- Query strings --

/// `?page=&limit=`, kept as raw strings so malformed numbers fall back to
/// defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub team_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    pub limit: Option<String>,
    pub days: Option<String>,
}

/// Minimum length of a search term.
pub const MIN_SEARCH_LEN: usize = 2;

// -- Teams --

/// Continental football associations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confederation {
    Uefa,
    Conmebol,
    Concacaf,
    Caf,
    Afc,
    Ofc,
}

impl Confederation {
    pub const ALL: [Confederation; 6] = [
        Confederation::Uefa,
        Confederation::Conmebol,
        Confederation::Concacaf,
        Confederation::Caf,
        Confederation::Afc,
        Confederation::Ofc,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Confederation::Uefa => "UEFA",
            Confederation::Conmebol => "CONMEBOL",
            Confederation::Concacaf => "CONCACAF",
            Confederation::Caf => "CAF",
            Confederation::Afc => "AFC",
            Confederation::Ofc => "OFC",
        }
    }
}

impl fmt::Display for Confederation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownConfederation(pub String);

impl fmt::Display for UnknownConfederation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown confederation '{}'", self.0)
    }
}

impl std::error::Error for UnknownConfederation {}

impl FromStr for Confederation {
    type Err = UnknownConfederation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Confederation::ALL
            .into_iter()
            .find(|c| c.as_str() == upper)
            .ok_or(UnknownConfederation(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(full_name: Option<&str>, first: Option<&str>, last: Option<&str>) -> RegisterRequest {
        RegisterRequest {
            email: "fan@example.com".into(),
            password: "secret1".into(),
            username: "fan10".into(),
            team_id: 1,
            full_name: full_name.map(Into::into),
            first_name: first.map(Into::into),
            last_name: last.map(Into::into),
        }
    }

    #[test]
    fn display_name_prefers_full_name_then_parts_then_username() {
        assert_eq!(register(Some("Lionel Messi"), None, None).display_name(), "Lionel Messi");
        assert_eq!(register(None, Some("Diego"), Some("Maradona")).display_name(), "Diego Maradona");
        assert_eq!(register(None, Some("Diego"), None).display_name(), "fan10");
    }

    #[test]
    fn register_validation_reports_each_field() {
        let req = RegisterRequest {
            email: "not-an-email".into(),
            password: "123".into(),
            username: "ab".into(),
            team_id: 0,
            full_name: None,
            first_name: None,
            last_name: None,
        };
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        for field in ["email", "password", "username", "team_id"] {
            assert!(fields.contains_key(field), "missing error for {field}");
        }
    }

    #[test]
    fn comment_content_must_not_be_blank_or_too_long() {
        assert!(CommentRequest { content: "   ".into() }.validate().is_err());
        assert!(CommentRequest { content: "x".repeat(501) }.validate().is_err());
        assert!(CommentRequest { content: "Vamos!".into() }.validate().is_ok());
    }

    #[test]
    fn confederation_parses_case_insensitively() {
        assert_eq!("conmebol".parse::<Confederation>(), Ok(Confederation::Conmebol));
        assert_eq!(" UEFA ".parse::<Confederation>(), Ok(Confederation::Uefa));
        assert!("FIFA".parse::<Confederation>().is_err());
    }
}
