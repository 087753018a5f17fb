//! Caller identity: roles, JWT claims and the authorization context

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

/// Account roles, ordered by privilege
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Librarian,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Librarian => "librarian",
            Role::Admin => "admin",
        }
    }
}

/// JWT claims for authenticated users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i32,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Create a new JWT token
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
}

/// Who is calling. Passed explicitly into every service operation that needs
/// a permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: i32,
    pub role: Role,
}

impl From<&UserClaims> for AuthContext {
    fn from(claims: &UserClaims) -> Self {
        Self {
            user_id: claims.user_id,
            role: claims.role,
        }
    }
}

impl AuthContext {
    pub fn new(user_id: i32, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_staff(&self) -> bool {
        self.role >= Role::Librarian
    }

    /// Catalog and lending administration
    pub fn require_librarian(&self) -> AppResult<()> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(AppError::Authorization("Librarian privileges required".to_string()))
        }
    }

    /// Special offer administration
    pub fn require_admin(&self) -> AppResult<()> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(AppError::Authorization("Administrator privileges required".to_string()))
        }
    }

    /// Members may act on their own records; staff on anyone's
    pub fn require_self_or_staff(&self, user_id: i32) -> AppResult<()> {
        if self.user_id == user_id || self.is_staff() {
            Ok(())
        } else {
            Err(AppError::Authorization(
                "Cannot act on another user's borrowings".to_string(),
            ))
        }
    }
}
