//! Typed REST client for the game API
//!
//! Thin wrapper over `reqwest` that attaches the bearer token from the
//! shared session to every request, deserializes responses into the wire
//! types, and normalizes errors: any 401 clears the session and becomes
//! [`ApiError::Unauthorized`], any other non-2xx becomes
//! [`ApiError::Status`] carrying the backend's error message.

use crate::session::SharedSession;
use crate::types::*;
use crate::{ApiError, Result};
use reqwest::{StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Error payload the backend attaches to failed requests, either
/// `{"error": …}` or `{"message": …}` depending on the handler.
#[derive(serde::Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// Client for the Bus Manager game API.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    session: SharedSession,
}

impl ApiClient {
    /// Build a client against `base_url`, e.g. `http://localhost:8080`.
    pub fn new(base_url: &str, session: SharedSession) -> Result<Self> {
        let base_url =
            Url::parse(base_url).map_err(|err| ApiError::BaseUrl(format!("{base_url}: {err}")))?;
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url,
            session,
        })
    }

    // === Authentication ===

    pub async fn login(&self, req: &LoginRequest) -> Result<AuthResponse> {
        self.post("/auth/login", req).await
    }

    pub async fn register(&self, req: &RegisterRequest) -> Result<AuthResponse> {
        self.post("/auth/register", req).await
    }

    /// Tell the server to revoke the token, then clear the session locally.
    /// The session is cleared even if the server call fails.
    pub async fn logout(&self) -> Result<()> {
        let result: Result<serde_json::Value> = self.post_empty("/auth/logout").await;
        clear_session(&self.session);
        result.map(|_| ())
    }

    pub async fn refresh(&self) -> Result<AuthResponse> {
        self.post_empty("/auth/refresh").await
    }

    // === Company ===

    pub async fn company(&self) -> Result<Company> {
        self.get("/company").await
    }

    pub async fn create_company(&self, req: &CreateCompanyRequest) -> Result<Company> {
        self.post("/company", req).await
    }

    // === Depots ===

    pub async fn depots(&self) -> Result<Vec<Depot>> {
        self.get("/depots").await
    }

    pub async fn create_depot(&self, req: &CreateDepotRequest) -> Result<Depot> {
        self.post("/depots", req).await
    }

    // === Buses ===

    pub async fn buses(&self) -> Result<Vec<Bus>> {
        self.get("/buses").await
    }

    pub async fn create_bus(&self, req: &CreateBusRequest) -> Result<Bus> {
        self.post("/buses", req).await
    }

    // === Routes & trips ===

    pub async fn routes(&self) -> Result<Vec<Route>> {
        self.get("/routes").await
    }

    pub async fn active_trips(&self) -> Result<Vec<Trip>> {
        self.get("/trips/active").await
    }

    pub async fn create_trip(&self, req: &CreateTripRequest) -> Result<Trip> {
        self.post("/trips", req).await
    }

    // === Plumbing ===

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(self.http.get(self.endpoint(path))).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.send(self.http.post(self.endpoint(path)).json(body))
            .await
    }

    async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(self.http.post(self.endpoint(path))).await
    }

    fn endpoint(&self, path: &str) -> Url {
        endpoint_url(&self.base_url, path)
    }

    fn bearer(&self) -> Option<String> {
        self.session
            .read()
            .ok()
            .and_then(|s| s.token().map(str::to_owned))
    }

    /// Attach the bearer token when present, send, and normalize the result.
    async fn send<T: DeserializeOwned>(&self, req: reqwest::RequestBuilder) -> Result<T> {
        let req = match self.bearer() {
            Some(token) => req.bearer_auth(token),
            None => req,
        };

        let response = req.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!("server returned 401, forcing logout");
            clear_session(&self.session);
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: error_message(status.as_u16(), &body),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

/// Resolve `path` against the configured base URL, tolerating a trailing
/// slash on the base.
fn endpoint_url(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    let joined = format!("{}{}", base.path().trim_end_matches('/'), path);
    url.set_path(&joined);
    url
}

/// Pull a human-readable message out of a failed response body, falling back
/// to the bare status code when the body is not the expected JSON shape.
fn error_message(status: u16, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(message) = parsed.error.or(parsed.message) {
            return message;
        }
    }
    format!("request failed with HTTP {status}")
}

fn clear_session(session: &SharedSession) {
    if let Ok(mut session) = session.write() {
        session.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Session, shared};

    #[test]
    fn test_endpoint_url_joins_paths() {
        let base = Url::parse("http://localhost:8080").unwrap();
        assert_eq!(
            endpoint_url(&base, "/trips/active").as_str(),
            "http://localhost:8080/trips/active"
        );
    }

    #[test]
    fn test_endpoint_url_tolerates_trailing_slash_and_prefix() {
        let base = Url::parse("https://play.example.com/api/").unwrap();
        assert_eq!(
            endpoint_url(&base, "/auth/login").as_str(),
            "https://play.example.com/api/auth/login"
        );
    }

    #[test]
    fn test_error_message_from_backend_body() {
        assert_eq!(
            error_message(401, r#"{"error": "Invalid credentials"}"#),
            "Invalid credentials"
        );
        assert_eq!(
            error_message(200, r#"{"message": "Logged out successfully"}"#),
            "Logged out successfully"
        );
    }

    #[test]
    fn test_error_message_falls_back_to_status() {
        assert_eq!(
            error_message(502, "<html>bad gateway</html>"),
            "request failed with HTTP 502"
        );
        assert_eq!(error_message(500, "{}"), "request failed with HTTP 500");
    }

    #[test]
    fn test_unauthorized_clears_session() {
        let mut session = Session::new();
        session.set_token("jwt".to_string());
        let handle = shared(session);

        clear_session(&handle);
        assert!(!handle.read().unwrap().is_authenticated());
    }

    #[test]
    fn test_client_rejects_bad_base_url() {
        let result = ApiClient::new("not a url", shared(Session::new()));
        assert!(matches!(result, Err(ApiError::BaseUrl(_))));
    }
}
