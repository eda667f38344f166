//! Request identity as asserted by the upstream auth layer, plus signed
//! anonymous cart sessions.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::aggregates::{CartIdentity, ReviewError};
use crate::{AppState, StorefrontError};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";
pub const CART_SESSION_HEADER: &str = "x-cart-session";

type HmacSha256 = Hmac<Sha256>;

/// Issues and verifies `<uuid>.<signature>` cart session tokens.
#[derive(Clone)]
pub struct SessionTokens {
    secret: Arc<[u8]>,
}

impl SessionTokens {
    pub fn new(secret: &str) -> Self { Self { secret: Arc::from(secret.as_bytes()) } }

    pub fn issue(&self) -> String {
        let id = Uuid::new_v4().to_string();
        let signature = self.mac(&id).map(|m| hex::encode(m.finalize().into_bytes())).unwrap_or_default();
        format!("{id}.{signature}")
    }

    pub fn verify(&self, token: &str) -> bool {
        let Some((id, signature)) = token.split_once('.') else { return false };
        if Uuid::parse_str(id).is_err() { return false; }
        let Ok(signature) = hex::decode(signature) else { return false };
        self.mac(id).is_some_and(|m| m.verify_slice(&signature).is_ok())
    }

    fn mac(&self, id: &str) -> Option<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.secret).ok()?;
        mac.update(id.as_bytes());
        Some(mac)
    }
}

/// Caller identity for one request.
#[derive(Clone, Debug, Default)]
pub struct Identity {
    pub user_id: Option<Uuid>,
    pub is_admin: bool,
    /// A presented cart session token whose signature checked out.
    pub session: Option<String>,
}

impl Identity {
    pub fn require_user(&self) -> Result<Uuid, StorefrontError> {
        self.user_id.ok_or_else(|| StorefrontError::Auth("Authentication required".into()))
    }

    pub fn require_admin(&self) -> Result<Uuid, StorefrontError> {
        let user = self.require_user()?;
        if !self.is_admin { return Err(ReviewError::AdminOnly.into()); }
        Ok(user)
    }

    /// The cart owner for this request. Returns a freshly issued token when an
    /// anonymous caller had none (or an invalid one).
    pub fn cart_identity(&self, tokens: &SessionTokens) -> (CartIdentity, Option<String>) {
        match (self.user_id, &self.session) {
            (Some(user), _) => (CartIdentity::User(user), None),
            (None, Some(token)) => (CartIdentity::Session(token.clone()), None),
            (None, None) => {
                let token = tokens.issue();
                (CartIdentity::Session(token.clone()), Some(token))
            }
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for Identity {
    type Rejection = StorefrontError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = |name: &str| parts.headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim).filter(|v| !v.is_empty());

        let user_id = header(USER_ID_HEADER)
            .map(|raw| Uuid::parse_str(raw).map_err(|_| StorefrontError::Auth("Invalid user identity".into())))
            .transpose()?;
        let is_admin = user_id.is_some() && header(USER_ROLE_HEADER).is_some_and(|r| r.eq_ignore_ascii_case("admin"));
        let session = header(CART_SESSION_HEADER).filter(|t| state.sessions.verify(t)).map(String::from);

        Ok(Self { user_id, is_admin, session })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_tokens() {
        let tokens = SessionTokens::new("s3cret");
        let token = tokens.issue();
        assert!(tokens.verify(&token));
        assert!(!SessionTokens::new("other").verify(&token));
        assert!(!tokens.verify("garbage"));
        assert!(!tokens.verify(&format!("{}.00", Uuid::new_v4())));

        let (id, sig) = token.split_once('.').unwrap();
        let forged = format!("{}.{sig}", Uuid::new_v4());
        assert!(!tokens.verify(&forged));
        assert!(tokens.verify(&format!("{id}.{sig}")));
    }

    #[test]
    fn test_cart_identity() {
        let tokens = SessionTokens::new("s3cret");
        let user = Uuid::now_v7();
        let signed_in = Identity { user_id: Some(user), ..Default::default() };
        assert_eq!(signed_in.cart_identity(&tokens), (CartIdentity::User(user), None));

        let (identity, issued) = Identity::default().cart_identity(&tokens);
        let issued = issued.unwrap();
        assert!(tokens.verify(&issued));
        assert_eq!(identity, CartIdentity::Session(issued));

        let returning = Identity { session: Some("abc.def".into()), ..Default::default() };
        assert_eq!(returning.cart_identity(&tokens), (CartIdentity::Session("abc.def".into()), None));
    }

    #[test]
    fn test_admin_requires_role() {
        let user = Identity { user_id: Some(Uuid::now_v7()), is_admin: false, session: None };
        assert!(matches!(user.require_admin(), Err(StorefrontError::Auth(_))));
        assert!(matches!(Identity::default().require_user(), Err(StorefrontError::Auth(_))));
    }
}
