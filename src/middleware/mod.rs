use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, StatusCode},
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Claims minted by the external identity provider. The engine trusts them
/// as given once the signature checks out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub admin: bool,
    pub exp: usize,
}

/// Authenticated caller, extracted from a bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub is_admin: bool,
}

/// Caller that must additionally carry the admin flag. Used by the
/// listing/session management endpoints.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

pub fn decode_claims(token: &str, secret: &str) -> Result<Claims, StatusCode> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| StatusCode::UNAUTHORIZED)
}

fn bearer_token(parts: &Parts) -> Result<&str, StatusCode> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(StatusCode::UNAUTHORIZED)
}

impl FromRequestParts<Arc<crate::AppState>> for AuthUser {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = decode_claims(token, &state.config.jwt.secret)?;
        Ok(AuthUser {
            user_id: claims.sub,
            is_admin: claims.admin,
        })
    }
}

impl FromRequestParts<Arc<crate::AppState>> for AdminUser {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            return Err(StatusCode::FORBIDDEN);
        }
        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token_for(claims: &Claims, secret: &str) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn future_exp() -> usize {
        (chrono::Utc::now().timestamp() + 3600) as usize
    }

    #[test]
    fn valid_token_round_trips() {
        let claims = Claims {
            sub: "user-1".into(),
            admin: true,
            exp: future_exp(),
        };
        let token = token_for(&claims, "secret");
        let decoded = decode_claims(&token, "secret").unwrap();
        assert_eq!(decoded.sub, "user-1");
        assert!(decoded.admin);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let claims = Claims {
            sub: "user-1".into(),
            admin: false,
            exp: future_exp(),
        };
        let token = token_for(&claims, "secret");
        assert_eq!(
            decode_claims(&token, "other").unwrap_err(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn expired_token_is_rejected() {
        let claims = Claims {
            sub: "user-1".into(),
            admin: false,
            exp: (chrono::Utc::now().timestamp() - 3600) as usize,
        };
        let token = token_for(&claims, "secret");
        assert!(decode_claims(&token, "secret").is_err());
    }

    #[test]
    fn admin_defaults_to_false() {
        let token = token_for(
            &Claims {
                sub: "user-1".into(),
                admin: false,
                exp: future_exp(),
            },
            "secret",
        );
        assert!(!decode_claims(&token, "secret").unwrap().admin);
    }
}
