//! # Auth
//!
//! Sessions are issued by the hosted auth provider. The server only checks
//! bearer tokens against it and never stores passwords.
//!
//! - `GET {AUTH_URL}/auth/v1/user` resolves a token to a user
//! - `PUT {AUTH_URL}/auth/v1/admin/users/{id}` writes `app_metadata`, signed with the service key
//! - `DELETE {AUTH_URL}/auth/v1/admin/users/{id}` removes an account, signed with the service key
//!
//! Admin rights come from `is_admin` in `app_metadata` (`true` or `"true"`) or from
//! the stored profile. Users can edit their own `user_metadata`, so it is never
//! trusted for rights.
use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{error::AppError, state::AppState, store::Store};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub is_admin: bool,
}

#[derive(Deserialize)]
struct ProviderUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: HashMap<String, Value>,
    #[serde(default)]
    app_metadata: HashMap<String, Value>,
}

fn flag(metadata: &HashMap<String, Value>, key: &str) -> bool {
    match metadata.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s == "true",
        _ => false,
    }
}

impl From<ProviderUser> for Identity {
    fn from(user: ProviderUser) -> Self {
        let name = user
            .user_metadata
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string);

        Self {
            user_id: user.id,
            email: user.email.unwrap_or_default(),
            name,
            is_admin: flag(&user.app_metadata, "is_admin"),
        }
    }
}

pub enum Authenticator {
    Hosted {
        client: Client,
        url: String,
        service_key: String,
    },
    /// Fixed token table for tests and offline runs.
    Static(HashMap<String, Identity>),
}

impl Authenticator {
    pub fn hosted(url: &str, service_key: &str) -> Self {
        Authenticator::Hosted {
            client: Client::new(),
            url: url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
        }
    }

    pub async fn verify(&self, token: &str) -> Result<Identity, AppError> {
        match self {
            Authenticator::Hosted {
                client,
                url,
                service_key,
            } => {
                let res = client
                    .get(format!("{url}/auth/v1/user"))
                    .header("apikey", service_key)
                    .bearer_auth(token)
                    .send()
                    .await?;

                match res.status() {
                    StatusCode::OK => Ok(res.json::<ProviderUser>().await?.into()),
                    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AppError::Unauthorized),
                    status => {
                        warn!("Auth provider answered {status}");
                        Err(AppError::Upstream(format!("auth provider returned {status}")))
                    }
                }
            }
            Authenticator::Static(tokens) => {
                tokens.get(token).cloned().ok_or(AppError::Unauthorized)
            }
        }
    }

    /// Mirrors the stored admin flag into `app_metadata`.
    pub async fn set_admin(&self, user_id: Uuid, is_admin: bool) -> Result<(), AppError> {
        match self {
            Authenticator::Hosted {
                client,
                url,
                service_key,
            } => {
                let res = client
                    .put(format!("{url}/auth/v1/admin/users/{user_id}"))
                    .header("apikey", service_key)
                    .bearer_auth(service_key)
                    .json(&json!({ "app_metadata": { "is_admin": is_admin } }))
                    .send()
                    .await?;

                match res.status() {
                    s if s.is_success() => Ok(()),
                    StatusCode::NOT_FOUND => Err(AppError::NotFound("User")),
                    status => Err(AppError::Upstream(format!("auth provider returned {status}"))),
                }
            }
            Authenticator::Static(_) => Ok(()),
        }
    }

    pub async fn delete_user(&self, user_id: Uuid) -> Result<(), AppError> {
        match self {
            Authenticator::Hosted {
                client,
                url,
                service_key,
            } => {
                let res = client
                    .delete(format!("{url}/auth/v1/admin/users/{user_id}"))
                    .header("apikey", service_key)
                    .bearer_auth(service_key)
                    .send()
                    .await?;

                match res.status() {
                    s if s.is_success() || s == StatusCode::NOT_FOUND => Ok(()),
                    status => Err(AppError::Upstream(format!("auth provider returned {status}"))),
                }
            }
            Authenticator::Static(_) => Ok(()),
        }
    }
}

fn bearer(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Signed-in caller.
pub struct CurrentUser(pub Identity);

impl<S: Store> FromRequestParts<Arc<AppState<S>>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer(parts).ok_or(AppError::Unauthorized)?;
        let identity = state.auth.verify(token).await?;

        debug!("Authenticated {}", identity.user_id);
        Ok(CurrentUser(identity))
    }
}

/// Anonymous callers pass through. A token that fails verification is still rejected.
impl<S: Store> OptionalFromRequestParts<Arc<AppState<S>>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Option<Self>, Self::Rejection> {
        let Some(token) = bearer(parts) else {
            return Ok(None);
        };

        Ok(Some(CurrentUser(state.auth.verify(token).await?)))
    }
}

/// Signed-in caller with admin rights.
pub struct AdminUser(pub Identity);

impl<S: Store> FromRequestParts<Arc<AppState<S>>> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(mut identity) =
            <CurrentUser as FromRequestParts<_>>::from_request_parts(parts, state).await?;

        if !identity.is_admin {
            identity.is_admin = state
                .store
                .profile(identity.user_id)
                .await?
                .is_some_and(|p| p.is_admin);
        }

        if !identity.is_admin {
            return Err(AppError::Forbidden("admin only"));
        }

        Ok(AdminUser(identity))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn provider_user(body: Value) -> Identity {
        let mut body = body;
        body["id"] = json!("7f9c3a52-1f1e-4c55-9a51-0c3c7d2a1b11");
        Identity::from(serde_json::from_value::<ProviderUser>(body).unwrap())
    }

    #[test]
    fn test_admin_flag_comes_from_app_metadata() {
        let identity = provider_user(json!({
            "email": "dono@example.com",
            "user_metadata": { "name": "Dono" },
            "app_metadata": { "is_admin": "true" }
        }));
        assert!(identity.is_admin);
        assert_eq!(identity.name.as_deref(), Some("Dono"));

        assert!(!provider_user(json!({ "app_metadata": { "is_admin": "yes" } })).is_admin);
    }

    #[test]
    fn test_user_metadata_cannot_grant_admin() {
        let identity = provider_user(json!({
            "user_metadata": { "is_admin": true },
            "app_metadata": {}
        }));
        assert!(!identity.is_admin);
    }

    #[tokio::test]
    async fn test_static_tokens() {
        let identity = Identity {
            user_id: Uuid::new_v4(),
            email: "a@example.com".to_string(),
            name: None,
            is_admin: false,
        };
        let auth = Authenticator::Static(HashMap::from([("t1".to_string(), identity.clone())]));

        assert_eq!(auth.verify("t1").await.unwrap(), identity);
        assert!(matches!(auth.verify("nope").await, Err(AppError::Unauthorized)));
    }
}
