//! reqwest client for the Lahan Pintar REST backend.
//!
//! Tokens travel as `access_token` / `refresh_token` cookies. A 401 triggers
//! one silent refresh followed by one retry of the original request; if that
//! fails too the tokens are dropped and [`ApiError::Unauthorized`] is returned.
//! Refreshes are serialized: requests rejected together share one refresh.
use super::util::{cookie_from_headers, with_retry};
use crate::core::backend::Backend;
use crate::core::error::ApiError;
use crate::core::resource::REFRESH_PATH;
use crate::core::session::Tokens;
use async_trait::async_trait;
use reqwest::header::{COOKIE, HeaderMap};
use reqwest::{Method, StatusCode};
use serde_json::{Value, json};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    tokens: Mutex<Option<Tokens>>,
    refreshing: Mutex<()>,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration, tokens: Option<Tokens>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("lahan/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            tokens: Mutex::new(tokens),
            refreshing: Mutex::new(()),
        })
    }

    pub async fn tokens(&self) -> Option<Tokens> {
        self.tokens.lock().await.clone()
    }

    pub async fn set_tokens(&self, tokens: Option<Tokens>) {
        *self.tokens.lock().await = tokens;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn cookie_header(tokens: &Tokens) -> String {
        match &tokens.refresh {
            Some(refresh) => format!(
                "{ACCESS_COOKIE}={}; {REFRESH_COOKIE}={refresh}",
                tokens.access
            ),
            None => format!("{ACCESS_COOKIE}={}", tokens.access),
        }
    }

    /// Sends one request carrying the current cookies and returns the access
    /// token it was sent with. Only reads are retried, and only when no
    /// response arrived at all.
    async fn send(
        &self,
        method: &Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<(reqwest::Response, Option<String>), ApiError> {
        let url = self.url(path);
        let (cookie, sent_with) = match self.tokens.lock().await.as_ref() {
            Some(tokens) => (Some(Self::cookie_header(tokens)), Some(tokens.access.clone())),
            None => (None, None),
        };
        debug!(%method, %url, "Sending request");

        let build = || {
            let mut request = self.http.request(method.clone(), &url);
            if let Some(cookie) = &cookie {
                request = request.header(COOKIE, cookie);
            }
            if let Some(body) = body {
                request = request.json(body);
            }
            request.send()
        };

        let response = if *method == Method::GET {
            with_retry(build, 3, 500).await?
        } else {
            build().await?
        };
        debug!(status = %response.status(), "Received response");
        Ok((response, sent_with))
    }

    async fn read_body(response: reqwest::Response) -> Result<Value, ApiError> {
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::from_status(status.as_u16(), &text));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| {
            warn!(error = %e, body = %text, "Response is not JSON");
            ApiError::Decode(format!("{e}"))
        })
    }

    #[instrument(name = "ApiRequest", skip(self, method, body), fields(method = %method))]
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let (response, sent_with) = self.send(&method, path, body).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Self::read_body(response).await;
        }

        self.refresh_after_rejection(sent_with.as_deref()).await?;

        let (retried, _) = self.send(&method, path, body).await?;
        if retried.status() == StatusCode::UNAUTHORIZED {
            warn!("Request still unauthorized after refresh, dropping session");
            self.set_tokens(None).await;
            return Err(ApiError::Unauthorized);
        }
        Self::read_body(retried).await
    }

    /// Refreshes unless another request already replaced the rejected token
    /// while this one waited for its turn.
    async fn refresh_after_rejection(&self, rejected: Option<&str>) -> Result<(), ApiError> {
        let _turn = self.refreshing.lock().await;
        match self.tokens().await {
            None => Err(ApiError::Unauthorized),
            Some(current) if Some(current.access.as_str()) != rejected => {
                debug!("Session already refreshed by a concurrent request");
                Ok(())
            }
            Some(_) => {
                debug!("Access token rejected, refreshing session");
                self.refresh().await
            }
        }
    }

    /// Exchanges the refresh token for a new access token.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        let Some(current) = self.tokens().await else {
            return Err(ApiError::Unauthorized);
        };
        let Some(refresh) = current.refresh.clone() else {
            self.set_tokens(None).await;
            return Err(ApiError::Unauthorized);
        };

        let response = self
            .http
            .post(self.url(REFRESH_PATH))
            .header(COOKIE, format!("{REFRESH_COOKIE}={refresh}"))
            .json(&json!({ "refresh": refresh }))
            .send()
            .await?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "Token refresh rejected");
            self.set_tokens(None).await;
            return Err(ApiError::Unauthorized);
        }

        let headers = response.headers().clone();
        let body = Self::read_body(response).await.unwrap_or(Value::Null);
        match extract_tokens(&headers, &body) {
            Some(mut tokens) => {
                if tokens.refresh.is_none() {
                    tokens.refresh = Some(refresh);
                }
                debug!("Session refreshed");
                self.set_tokens(Some(tokens)).await;
                Ok(())
            }
            None => {
                warn!("Refresh response carried no access token");
                self.set_tokens(None).await;
                Err(ApiError::Unauthorized)
            }
        }
    }

    /// Posts without the refresh-and-retry loop, keeping response headers so
    /// callers can pick up freshly issued cookies. A 401 here means bad
    /// credentials, not an expired session.
    pub async fn post_public(&self, path: &str, body: &Value) -> Result<(Value, HeaderMap), ApiError> {
        let (response, _) = self.send(&Method::POST, path, Some(body)).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            let text = response.text().await?;
            return Err(ApiError::rejected(StatusCode::UNAUTHORIZED.as_u16(), &text));
        }
        let headers = response.headers().clone();
        let value = Self::read_body(response).await?;
        Ok((value, headers))
    }
}

/// Tokens from `Set-Cookie` headers, falling back to `access`/`refresh`
/// fields in the body.
pub fn extract_tokens(headers: &HeaderMap, body: &Value) -> Option<Tokens> {
    let from_body = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| body.get(*k).and_then(Value::as_str))
            .map(str::to_string)
    };
    let access = cookie_from_headers(headers, ACCESS_COOKIE)
        .or_else(|| from_body(&["access", ACCESS_COOKIE]))?;
    let refresh = cookie_from_headers(headers, REFRESH_COOKIE)
        .or_else(|| from_body(&["refresh", REFRESH_COOKIE]));
    Some(Tokens { access, refresh })
}

#[async_trait]
impl Backend for ApiClient {
    async fn get(&self, path: &str) -> Result<Value, ApiError> {
        self.execute(Method::GET, path, None).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.execute(Method::POST, path, Some(body)).await
    }

    async fn put(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.execute(Method::PUT, path, Some(body)).await
    }

    async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.execute(Method::DELETE, path, None).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tokens(access: &str, refresh: Option<&str>) -> Option<Tokens> {
        Some(Tokens {
            access: access.to_string(),
            refresh: refresh.map(str::to_string),
        })
    }

    fn client(server: &MockServer, t: Option<Tokens>) -> ApiClient {
        ApiClient::new(&server.uri(), Duration::from_secs(5), t).unwrap()
    }

    #[test_log::test(tokio::test)]
    async fn test_get_sends_session_cookies() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/funding/"))
            .and(header("cookie", "access_token=A1; refresh_token=R1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
            .expect(1)
            .mount(&server)
            .await;

        let api = client(&server, tokens("A1", Some("R1")));
        let body = api.get("/api/funding/").await.unwrap();
        assert_eq!(body, json!([{"id": 1}]));
    }

    #[test_log::test(tokio::test)]
    async fn test_unauthorized_refreshes_once_and_retries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/settings/"))
            .and(header("cookie", "access_token=stale; refresh_token=R1"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/auth/refresh/"))
            .and(header("cookie", "refresh_token=R1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "access_token=fresh; HttpOnly; Path=/"),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/settings/"))
            .and(header("cookie", "access_token=fresh; refresh_token=R1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"total_shares": 1000})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let api = client(&server, tokens("stale", Some("R1")));
        let body = api.get("/api/settings/").await.unwrap();

        assert_eq!(body["total_shares"], 1000);
        assert_eq!(api.tokens().await, tokens("fresh", Some("R1")));
    }

    #[test_log::test(tokio::test)]
    async fn test_parallel_unauthorized_requests_share_one_refresh() {
        let server = MockServer::start().await;
        for p in ["/api/settings/", "/api/funding/"] {
            Mock::given(method("GET"))
                .and(path(p))
                .and(header("cookie", "access_token=stale; refresh_token=R1"))
                .respond_with(ResponseTemplate::new(401))
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path(p))
                .and(header("cookie", "access_token=fresh; refresh_token=R2"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"path": p})))
                .expect(1)
                .mount(&server)
                .await;
        }
        // The backend rotates refresh tokens, so R1 is only good once.
        Mock::given(method("POST"))
            .and(path("/api/auth/refresh/"))
            .and(header("cookie", "refresh_token=R1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .append_header("set-cookie", "access_token=fresh; HttpOnly; Path=/")
                    .append_header("set-cookie", "refresh_token=R2; HttpOnly; Path=/"),
            )
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/auth/refresh/"))
            .respond_with(ResponseTemplate::new(401))
            .expect(0)
            .mount(&server)
            .await;

        let api = client(&server, tokens("stale", Some("R1")));
        let (settings, fundings) =
            futures::try_join!(api.get("/api/settings/"), api.get("/api/funding/")).unwrap();

        assert_eq!(settings["path"], "/api/settings/");
        assert_eq!(fundings["path"], "/api/funding/");
        assert_eq!(api.tokens().await, tokens("fresh", Some("R2")));
    }

    #[test_log::test(tokio::test)]
    async fn test_failed_refresh_drops_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/expense/"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/auth/refresh/"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let api = client(&server, tokens("stale", Some("expired")));
        let err = api.get("/api/expense/").await.unwrap_err();

        assert!(matches!(err, ApiError::Unauthorized));
        assert!(api.tokens().await.is_none());
    }

    #[test_log::test(tokio::test)]
    async fn test_second_unauthorized_is_not_retried_again() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/funding/4/"))
            .respond_with(ResponseTemplate::new(401))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/auth/refresh/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "new"})))
            .expect(1)
            .mount(&server)
            .await;

        let api = client(&server, tokens("old", Some("R")));
        let err = api.delete("/api/funding/4/").await.unwrap_err();

        assert!(matches!(err, ApiError::Unauthorized));
        assert!(api.tokens().await.is_none());
    }

    #[test_log::test(tokio::test)]
    async fn test_validation_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/funding/"))
            .and(body_json(json!({"shares": 500})))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"shares": ["Melebihi sisa saham (400)"]})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let api = client(&server, tokens("A", None));
        let err = api
            .post("/api/funding/", &json!({"shares": 500}))
            .await
            .unwrap_err();

        match err {
            ApiError::Validation { status, fields } => {
                assert_eq!(status, 400);
                assert_eq!(fields["shares"], vec!["Melebihi sisa saham (400)"]);
            }
            other => panic!("Expected validation error, got {other:?}"),
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_empty_delete_response() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/profit-distribution/2/"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let api = client(&server, tokens("A", None));
        assert!(api.delete("/api/profit-distribution/2/").await.is_ok());
    }

    #[test]
    fn test_extract_tokens_prefers_cookies() {
        let mut headers = HeaderMap::new();
        headers.append(
            reqwest::header::SET_COOKIE,
            "access_token=cookie-a; Path=/".parse().unwrap(),
        );
        let body = json!({"access": "body-a", "refresh": "body-r"});

        let t = extract_tokens(&headers, &body).unwrap();
        assert_eq!(t.access, "cookie-a");
        assert_eq!(t.refresh.as_deref(), Some("body-r"));

        assert!(extract_tokens(&HeaderMap::new(), &json!({})).is_none());
    }
}
