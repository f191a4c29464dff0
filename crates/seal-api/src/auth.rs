//! # Authentication & Authorization
//!
//! Bearer JWT middleware with role-based access control.
//!
//! ## Token Format
//!
//! HS256 JWTs signed with the configured `JWT_SECRET`. Claims carry the
//! caller's numeric id, role, and display handle:
//!
//! ```text
//! { "sub": 42, "role": "user", "username": "alice", "exp": ..., "iat": ... }
//! { "sub": 7, "role": "technician", "tech_code": "T-07", "exp": ..., "iat": ... }
//! ```
//!
//! Tokens are minted synchronously at login and expire after 72 hours.
//!
//! ## CallerIdentity
//!
//! Every authenticated request gets a [`CallerIdentity`] injected into the
//! request extensions. Handlers extract it via the `FromRequestParts` impl.

use axum::extract::Request;
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use seal_core::Actor;

use crate::error::{AppError, ErrorBody, ErrorDetail};

/// Token lifetime. Matches the re-login cadence of a field shift rotation.
const TOKEN_TTL_HOURS: i64 = 72;

// ── Role ────────────────────────────────────────────────────────────────────

/// Principal kinds that can hold a token.
///
/// Roles are disjoint capabilities, not a privilege ladder: a technician
/// can install seals but cannot issue them, and an admin cannot mark a
/// seal used on another user's behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular user. Can use seals issued to them.
    User,
    /// Field technician. Can install and return assigned seals.
    Technician,
    /// Administrator. Runs the allocation side of the lifecycle.
    Admin,
}

impl Role {
    /// Return the string representation of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Technician => "technician",
            Self::Admin => "admin",
        }
    }
}

// ── Claims ──────────────────────────────────────────────────────────────────

/// JWT claims carried by every issued token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Principal id — `users.id` or `technicians.id` depending on role.
    pub sub: i64,
    /// Caller role.
    pub role: Role,
    /// Username, present for user and admin tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Technician code, present for technician tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tech_code: Option<String>,
    /// Expiration (Unix seconds).
    pub exp: i64,
    /// Issued-at (Unix seconds).
    pub iat: i64,
}

// ── CallerIdentity ──────────────────────────────────────────────────────────

/// Identity of the authenticated caller, extracted from a verified token
/// and available to all route handlers via Axum's `FromRequestParts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    /// Principal id — user id or technician id depending on role.
    pub id: i64,
    /// The caller's role in the system.
    pub role: Role,
    /// Username (user/admin tokens) or tech code (technician tokens).
    pub handle: String,
}

impl CallerIdentity {
    /// Convert to the capability actor the lifecycle rules understand.
    pub fn as_actor(&self) -> Actor {
        match self.role {
            Role::User => Actor::User {
                id: self.id,
                admin: false,
            },
            Role::Admin => Actor::User {
                id: self.id,
                admin: true,
            },
            Role::Technician => Actor::Technician { id: self.id },
        }
    }
}

/// Axum `FromRequestParts` implementation for `CallerIdentity`.
///
/// Extracts the identity that the auth middleware injected into extensions.
/// Returns 401 if no identity is present (middleware didn't run or failed).
#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

/// Check that the caller is an admin. Returns 403 otherwise.
pub fn require_admin(caller: &CallerIdentity) -> Result<(), AppError> {
    if caller.role == Role::Admin {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "role 'admin' required, caller has '{}'",
            caller.role.as_str()
        )))
    }
}

/// Check that the caller is a technician. Returns 403 otherwise.
pub fn require_technician(caller: &CallerIdentity) -> Result<(), AppError> {
    if caller.role == Role::Technician {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "role 'technician' required, caller has '{}'",
            caller.role.as_str()
        )))
    }
}

// ── Keys & Token Operations ─────────────────────────────────────────────────

/// HS256 key pair derived from the configured secret.
///
/// Custom `Debug` redacts key material to prevent credential leakage in logs.
#[derive(Clone)]
pub struct AuthKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl std::fmt::Debug for AuthKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthKeys").finish_non_exhaustive()
    }
}

impl AuthKeys {
    /// Derive the key pair from the shared HMAC secret.
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    /// Mint a signed token for the given principal. Tokens expire after
    /// [`TOKEN_TTL_HOURS`].
    pub fn issue_token(&self, identity: &CallerIdentity) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: identity.id,
            role: identity.role,
            username: match identity.role {
                Role::User | Role::Admin => Some(identity.handle.clone()),
                Role::Technician => None,
            },
            tech_code: match identity.role {
                Role::Technician => Some(identity.handle.clone()),
                Role::User | Role::Admin => None,
            },
            exp: (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
            iat: now.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))
    }

    /// Verify a token and recover the caller identity.
    ///
    /// Rejects expired tokens, bad signatures, and tokens whose role and
    /// handle claims disagree.
    pub fn verify_token(&self, token: &str) -> Result<CallerIdentity, AppError> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|e| AppError::Unauthorized(format!("invalid token: {e}")))?;
        let claims = data.claims;

        let handle = match claims.role {
            Role::User | Role::Admin => claims.username,
            Role::Technician => claims.tech_code,
        }
        .ok_or_else(|| AppError::Unauthorized("token missing principal handle".into()))?;

        Ok(CallerIdentity {
            id: claims.sub,
            role: claims.role,
            handle,
        })
    }
}

// ── Password Hashing ────────────────────────────────────────────────────────

/// Hash a password to lowercase hex SHA-256.
pub fn hash_password(password: &str) -> String {
    use std::fmt::Write;
    let digest = Sha256::digest(password.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Constant-time comparison of a candidate password against a stored hash.
///
/// Both sides are fixed-length hex digests, so length never leaks.
pub fn verify_password(candidate: &str, stored_hash: &str) -> bool {
    let candidate_hash = hash_password(candidate);
    let a = candidate_hash.as_bytes();
    let b = stored_hash.as_bytes();
    if a.len() != b.len() {
        // Dummy comparison to keep timing constant regardless of length match.
        let _ = a.ct_eq(a);
        return false;
    }
    a.ct_eq(b).into()
}

// ── Middleware ──────────────────────────────────────────────────────────────

/// Extract and verify the Bearer token from the Authorization header.
///
/// Injects the verified [`CallerIdentity`] into request extensions for
/// downstream handlers. Reads [`AuthKeys`] from request extensions
/// (inserted as an `Extension` layer during router assembly).
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let Some(keys) = request.extensions().get::<AuthKeys>().cloned() else {
        tracing::error!("auth middleware running without AuthKeys extension");
        return unauthorized_response("authentication unavailable");
    };

    let bearer = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match bearer {
        Some(token) => match keys.verify_token(token) {
            Ok(identity) => {
                request.extensions_mut().insert(identity);
                next.run(request).await
            }
            Err(err) => err.into_response(),
        },
        None => unauthorized_response("missing bearer token"),
    }
}

fn unauthorized_response(message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
        },
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> AuthKeys {
        AuthKeys::from_secret(b"unit-test-secret")
    }

    fn user_identity() -> CallerIdentity {
        CallerIdentity {
            id: 42,
            role: Role::User,
            handle: "alice".to_string(),
        }
    }

    #[test]
    fn token_roundtrip_preserves_identity() {
        let keys = keys();
        let identity = user_identity();
        let token = keys.issue_token(&identity).unwrap();
        let recovered = keys.verify_token(&token).unwrap();
        assert_eq!(recovered, identity);
    }

    #[test]
    fn technician_token_uses_tech_code() {
        let keys = keys();
        let identity = CallerIdentity {
            id: 7,
            role: Role::Technician,
            handle: "T-07".to_string(),
        };
        let token = keys.issue_token(&identity).unwrap();
        let recovered = keys.verify_token(&token).unwrap();
        assert_eq!(recovered.role, Role::Technician);
        assert_eq!(recovered.handle, "T-07");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = keys().issue_token(&user_identity()).unwrap();
        let other = AuthKeys::from_secret(b"a-different-secret");
        assert!(matches!(
            other.verify_token(&token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(matches!(
            keys().verify_token("not.a.jwt"),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn admin_identity_maps_to_admin_actor() {
        let identity = CallerIdentity {
            id: 1,
            role: Role::Admin,
            handle: "admin".to_string(),
        };
        assert_eq!(identity.as_actor(), Actor::User { id: 1, admin: true });
    }

    #[test]
    fn technician_identity_maps_to_technician_actor() {
        let identity = CallerIdentity {
            id: 9,
            role: Role::Technician,
            handle: "T-09".to_string(),
        };
        assert_eq!(identity.as_actor(), Actor::Technician { id: 9 });
    }

    #[test]
    fn password_hash_is_sha256_hex() {
        assert_eq!(
            hash_password("admin123"),
            "240be518fabd2724ddb6f04eeb1da5967448d7e831c08c8fa822809f74c720a9"
        );
    }

    #[test]
    fn password_verification() {
        let stored = hash_password("hunter2");
        assert!(verify_password("hunter2", &stored));
        assert!(!verify_password("hunter3", &stored));
        assert!(!verify_password("hunter2", "not-a-hex-digest"));
    }

    #[test]
    fn role_guards() {
        let admin = CallerIdentity {
            id: 1,
            role: Role::Admin,
            handle: "admin".to_string(),
        };
        let tech = CallerIdentity {
            id: 7,
            role: Role::Technician,
            handle: "T-07".to_string(),
        };
        assert!(require_admin(&admin).is_ok());
        assert!(require_admin(&tech).is_err());
        assert!(require_technician(&tech).is_ok());
        assert!(require_technician(&user_identity()).is_err());
    }
}
