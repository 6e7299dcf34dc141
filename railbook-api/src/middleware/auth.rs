use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use railbook_core::{access, Actor};

use crate::error::AppError;
use crate::state::AppState;

pub const ROLE_ADMIN: &str = "ADMIN";
pub const ROLE_CUSTOMER: &str = "CUSTOMER";

// ============================================================================
// JWT Claims
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub role: String,
    pub exp: usize,
}

impl Claims {
    /// The actor these claims act as; `sub` carries the user id.
    pub fn actor(&self) -> Result<Actor, AppError> {
        let id = Uuid::parse_str(&self.sub).map_err(|_| {
            AppError::AuthenticationError("Invalid subject in token".to_string())
        })?;
        Ok(Actor {
            id,
            is_admin: self.role == ROLE_ADMIN,
        })
    }
}

fn decode_claims(token: &str, secret: &str) -> Result<Claims, StatusCode> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| StatusCode::UNAUTHORIZED)
}

fn bearer_token(req: &Request) -> Result<&str, StatusCode> {
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    auth_header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)
}

// ============================================================================
// Authentication Middleware
// ============================================================================

/// Requires a valid token from any user and injects the claims.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = bearer_token(&req)?;
    let claims = decode_claims(token, &state.auth.secret)?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

// ============================================================================
// Admin Middleware
// ============================================================================

/// Requires a valid token carrying the ADMIN role.
pub async fn admin_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = bearer_token(&req)?;
    let claims = decode_claims(token, &state.auth.secret)?;
    let actor = claims.actor().map_err(|_| StatusCode::UNAUTHORIZED)?;

    if !access::is_admin(Some(&actor)) {
        return Err(StatusCode::FORBIDDEN);
    }

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_from_claims() {
        let id = Uuid::new_v4();
        let claims = Claims {
            sub: id.to_string(),
            username: "alice".to_string(),
            role: ROLE_CUSTOMER.to_string(),
            exp: 0,
        };
        let actor = claims.actor().unwrap();
        assert_eq!(actor.id, id);
        assert!(!actor.is_admin);

        let admin = Claims {
            role: ROLE_ADMIN.to_string(),
            ..claims
        };
        assert!(admin.actor().unwrap().is_admin);
    }

    #[test]
    fn test_garbage_subject_rejected() {
        let claims = Claims {
            sub: "not-a-uuid".to_string(),
            username: "alice".to_string(),
            role: ROLE_CUSTOMER.to_string(),
            exp: 0,
        };
        assert!(claims.actor().is_err());
    }
}
