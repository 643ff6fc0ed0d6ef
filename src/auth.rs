//! Bearer-auth extractor and the role model gating every mutating endpoint (§6).
//!
//! Adapted from the API-key `FromRequestParts` pattern: instead of a long-lived static
//! key compared by bcrypt, each request carries a short-lived HS256 JWT whose `sub`
//! claim is resolved against the `users` table on every request (no cache — user
//! deactivation must take effect on the next request, not after a TTL expires).

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::services::Services;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Viewer,
    Manager,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Viewer => "viewer",
            Role::Manager => "manager",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "viewer" => Some(Role::Viewer),
            "manager" => Some(Role::Manager),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: chrono::DateTime<Utc>,
}

/// JWT claims, per the bearer-auth contract: `{sub, email, role, username, iat, exp}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: String,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

pub const TOKEN_TTL_SECS: i64 = 8 * 3600;

pub fn issue_token(user: &User, jwt_secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user.id.clone(),
        email: user.email.clone(),
        role: user.role.as_str().to_string(),
        username: user.username.clone(),
        iat: now,
        exp: now + TOKEN_TTL_SECS,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(jwt_secret.as_bytes()))
}

fn decode_token(token: &str, jwt_secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(token, &DecodingKey::from_secret(jwt_secret.as_bytes()), &Validation::default())
        .map(|data| data.claims)
        .map_err(|_| AppError::Unauthorized)
}

/// An authenticated, active user resolved from the bearer token on this request.
pub struct AuthUser {
    pub user_id: String,
    pub email: String,
    pub username: String,
    pub role: Role,
}

impl AuthUser {
    /// `viewer` reads only; everything else requires at least `manager`.
    pub fn require_write(&self) -> Result<(), AppError> {
        if self.role >= Role::Manager {
            Ok(())
        } else {
            Err(AppError::Forbidden("manager or admin role required".to_string()))
        }
    }

    /// Settings writes and automation `toggle`/`run` are Admin-only: the one surface
    /// with direct paid-spend blast radius. Alert rules have no spend impact and stay
    /// at `require_write`.
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(AppError::Forbidden("admin role required".to_string()))
        }
    }
}

#[async_trait]
impl FromRequestParts<Arc<Services>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<Services>) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(AppError::Unauthorized)?;

        let claims = decode_token(token, &state.jwt_secret)?;

        let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(&claims.sub)
            .fetch_optional(&state.pool)
            .await
            .map_err(AppError::from)?;

        let user = user.ok_or(AppError::Unauthorized)?;

        if !user.is_active {
            return Err(AppError::Forbidden("user account is inactive".to_string()));
        }

        Ok(AuthUser {
            user_id: user.id,
            email: user.email,
            username: user.username,
            role: user.role,
        })
    }
}

pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_ordering_places_admin_above_manager_above_viewer() {
        assert!(Role::Admin > Role::Manager);
        assert!(Role::Manager > Role::Viewer);
    }

    #[test]
    fn role_parse_round_trips() {
        for r in [Role::Viewer, Role::Manager, Role::Admin] {
            assert_eq!(Role::parse(r.as_str()), Some(r));
        }
    }

    #[test]
    fn token_round_trips_through_issue_and_decode() {
        let user = User {
            id: "u1".to_string(),
            email: "a@example.com".to_string(),
            username: "alice".to_string(),
            password_hash: String::new(),
            role: Role::Manager,
            is_active: true,
            created_at: Utc::now(),
        };
        let token = issue_token(&user, "test-secret").unwrap();
        let claims = decode_token(&token, "test-secret").unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.role, "manager");
    }

    #[test]
    fn decode_rejects_token_signed_with_a_different_secret() {
        let user = User {
            id: "u1".to_string(),
            email: "a@example.com".to_string(),
            username: "alice".to_string(),
            password_hash: String::new(),
            role: Role::Viewer,
            is_active: true,
            created_at: Utc::now(),
        };
        let token = issue_token(&user, "secret-a").unwrap();
        assert!(decode_token(&token, "secret-b").is_err());
    }

    #[test]
    fn password_hash_round_trips() {
        let hash = hash_password("correct horse battery staple").unwrap();
        assert!(verify_password("correct horse battery staple", &hash));
        assert!(!verify_password("wrong password", &hash));
    }
}
