//! Member model and bearer-token claims

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::enums::Role;
use crate::error::AppError;

/// Library account as seen by the circulation core (read-only)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Member {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub national_id: Option<String>,
    pub phone_number: Option<String>,
}

impl Member {
    /// National id and phone number are required before borrowing
    pub fn has_complete_profile(&self) -> bool {
        let filled = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        filled(&self.national_id) && filled(&self.phone_number)
    }
}

/// Who is asking for a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requester {
    pub member_id: i32,
    pub role: Role,
}

impl Requester {
    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }
}

/// JWT claims issued by the auth service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberClaims {
    pub sub: String,
    pub member_id: i32,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl MemberClaims {
    /// Encode a token (used by tooling and tests; issuance lives in the auth service)
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn requester(&self) -> Requester {
        Requester {
            member_id: self.member_id,
            role: self.role,
        }
    }

    pub fn require_staff(&self) -> Result<(), AppError> {
        if self.role.is_staff() {
            Ok(())
        } else {
            Err(AppError::Authorization("Librarian or administrator rights required".to_string()))
        }
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(AppError::Authorization("Administrator privileges required".to_string()))
        }
    }

    /// Members may only act on their own records; staff on anyone's
    pub fn require_self_or_staff(&self, member_id: i32) -> Result<(), AppError> {
        if self.member_id == member_id || self.role.is_staff() {
            Ok(())
        } else {
            Err(AppError::Authorization("Not allowed to access another member's records".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(national_id: Option<&str>, phone: Option<&str>) -> Member {
        Member {
            id: 1,
            name: "Ada".to_string(),
            email: "ada@example.org".to_string(),
            role: Role::Member,
            is_active: true,
            national_id: national_id.map(String::from),
            phone_number: phone.map(String::from),
        }
    }

    #[test]
    fn test_complete_profile() {
        assert!(member(Some("079123"), Some("0901")).has_complete_profile());
        assert!(!member(None, Some("0901")).has_complete_profile());
        assert!(!member(Some("  "), Some("0901")).has_complete_profile());
    }

    #[test]
    fn test_token_round_trip() {
        let claims = MemberClaims {
            sub: "ada".to_string(),
            member_id: 7,
            role: Role::Librarian,
            exp: chrono::Utc::now().timestamp() + 3600,
            iat: chrono::Utc::now().timestamp(),
        };
        let token = claims.create_token("secret").unwrap();
        let parsed = MemberClaims::from_token(&token, "secret").unwrap();
        assert_eq!(parsed.member_id, 7);
        assert!(parsed.require_staff().is_ok());
        assert!(parsed.require_admin().is_err());
        assert!(MemberClaims::from_token(&token, "other").is_err());
    }
}
