use super::rest::{ApiClient, extract_tokens};
use crate::core::backend::Backend;
use crate::core::error::ApiError;
use crate::core::model::User;
use crate::core::resource::{LOGIN_PATH, LOGOUT_PATH, REGISTER_PATH};
use crate::core::session::Session;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// User details from a login body: either under `user` or the body itself.
fn user_from_body(body: &Value) -> Option<User> {
    body.get("user")
        .and_then(|u| serde_json::from_value(u.clone()).ok())
        .or_else(|| serde_json::from_value(body.clone()).ok())
}

pub async fn login(client: &ApiClient, username: &str, password: &str) -> Result<Session, ApiError> {
    let (body, headers) = client
        .post_public(LOGIN_PATH, &json!({ "username": username, "password": password }))
        .await?;

    let tokens = extract_tokens(&headers, &body)
        .ok_or_else(|| ApiError::Decode("login response carried no access token".to_string()))?;
    client.set_tokens(Some(tokens.clone())).await;

    let user = user_from_body(&body);
    if user.is_none() {
        debug!("Login response carried no user details");
    }
    info!(username, "Logged in");
    Ok(Session::new(user, tokens))
}

pub async fn register(client: &ApiClient, registration: &Registration) -> Result<Value, ApiError> {
    let body = serde_json::to_value(registration)?;
    let (created, _) = client.post_public(REGISTER_PATH, &body).await?;
    info!(username = %registration.username, "Registered account");
    Ok(created)
}

/// Tells the backend to drop the session. Local state is cleared by the
/// caller whatever the outcome.
pub async fn logout(client: &ApiClient) {
    if client.tokens().await.is_none() {
        return;
    }
    if let Err(e) = client.post(LOGOUT_PATH, &json!({})).await {
        warn!(error = %e, "Backend logout failed");
    }
    client.set_tokens(None).await;
}
