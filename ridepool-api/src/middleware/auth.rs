use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::{AppState, AuthSettings};

// ============================================================================
// JWT Claims
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub iss: String,
    pub aud: String,
    pub roles: Vec<String>,
    pub iat: usize,
    pub exp: usize,
}

/// Identity attached to every admitted request. Anonymous when no valid
/// credential was presented; downstream handlers decide whether that is
/// acceptable.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub subject: Option<String>,
    pub roles: Vec<String>,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self {
            subject: None,
            roles: Vec::new(),
        }
    }

    pub fn from_claims(claims: Claims) -> Self {
        Self {
            subject: Some(claims.sub),
            roles: claims.roles,
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// The authenticated subject, or 401 for anonymous contexts.
    pub fn require_user(&self) -> Result<&str, AppError> {
        self.subject
            .as_deref()
            .ok_or_else(|| AppError::Unauthorized("authentication required".to_string()))
    }

    pub fn require_role(&self, role: &str) -> Result<&str, AppError> {
        let subject = self.require_user()?;
        if !self.has_role(role) {
            return Err(AppError::Forbidden("insufficient privileges".to_string()));
        }
        Ok(subject)
    }
}

// ============================================================================
// Token issue / verify
// ============================================================================

pub fn issue_token(
    auth: &AuthSettings,
    subject: &str,
    roles: &[String],
) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = Claims {
        sub: subject.to_string(),
        iss: auth.issuer.clone(),
        aud: auth.audience.clone(),
        roles: roles.to_vec(),
        iat: now.timestamp() as usize,
        exp: (now + Duration::minutes(auth.ttl_minutes)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(auth.secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("token encoding failed: {e}")))
}

/// Verify signature, expiry, issuer and audience. Any mismatch yields
/// `None`; this function never distinguishes why a credential failed.
pub fn verify_token(auth: &AuthSettings, token: &str) -> Option<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&auth.issuer]);
    validation.set_audience(&[&auth.audience]);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(auth.secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .ok()
}

// ============================================================================
// Identity annotation middleware
// ============================================================================

/// Third stage of the admission pipeline. Purely advisory: a valid bearer
/// credential attaches subject and role claims to the request, anything
/// else attaches the anonymous context. This stage never terminates the
/// request; protected handlers reject anonymous contexts themselves.
pub async fn annotate_identity(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let bearer = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    let context = match bearer.and_then(|token| verify_token(&state.auth, token)) {
        Some(claims) => AuthContext::from_claims(claims),
        None => AuthContext::anonymous(),
    };

    req.extensions_mut().insert(context);
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> AuthSettings {
        AuthSettings {
            secret: "test-secret-key-of-reasonable-length".to_string(),
            issuer: "ridepool-api".to_string(),
            audience: "ridepool-clients".to_string(),
            ttl_minutes: 30,
        }
    }

    #[test]
    fn issued_token_verifies_with_claims_intact() {
        let auth = settings();
        let roles = vec!["ROLE_USER".to_string()];
        let token = issue_token(&auth, "maria", &roles).unwrap();

        let claims = verify_token(&auth, &token).expect("token should verify");
        assert_eq!(claims.sub, "maria");
        assert_eq!(claims.roles, roles);
        assert_eq!(claims.iss, auth.issuer);
        assert_eq!(claims.aud, auth.audience);
    }

    #[test]
    fn wrong_audience_is_rejected() {
        let issuing = settings();
        let token = issue_token(&issuing, "maria", &[]).unwrap();

        let mut verifying = settings();
        verifying.audience = "some-other-app".to_string();
        assert!(verify_token(&verifying, &token).is_none());
    }

    #[test]
    fn wrong_issuer_is_rejected() {
        let issuing = settings();
        let token = issue_token(&issuing, "maria", &[]).unwrap();

        let mut verifying = settings();
        verifying.issuer = "unknown-issuer".to_string();
        assert!(verify_token(&verifying, &token).is_none());
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let auth = settings();
        let token = issue_token(&auth, "maria", &[]).unwrap();

        let mut other = settings();
        other.secret = "a-completely-different-secret".to_string();
        assert!(verify_token(&other, &token).is_none());
    }

    #[test]
    fn expired_token_is_rejected() {
        let mut auth = settings();
        auth.ttl_minutes = -120; // already two hours past
        let token = issue_token(&auth, "maria", &[]).unwrap();

        assert!(verify_token(&settings(), &token).is_none());
    }

    #[test]
    fn anonymous_context_fails_require_user() {
        let ctx = AuthContext::anonymous();
        assert!(ctx.require_user().is_err());

        let ctx = AuthContext {
            subject: Some("maria".to_string()),
            roles: vec!["ROLE_USER".to_string()],
        };
        assert_eq!(ctx.require_user().unwrap(), "maria");
        assert!(ctx.require_role("ROLE_ADMIN").is_err());
    }
}
