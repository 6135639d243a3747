//! Authenticated request executor
//!
//! Executes one logical API call: attach credentials, send, and map the
//! outcome onto [`ApiError`]. The only local recovery is a single
//! refresh-and-retry when an OAuth 2.0 request comes back 401.

use std::sync::Arc;
use std::time::Duration;

use agentdodo_domain::{AuthScheme, HttpConfig, XApiConfig};
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::auth::RequestAuth;
use super::endpoint::{encode_pairs, ApiEndpoint, ApiHost, RequestBody, TimeoutClass};
use super::errors::{ApiError, ProblemDetails};
use crate::http::{HttpClient, HttpRequest, HttpResponse, HttpTransport};

/// Configuration for API client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiClientConfig {
    /// Base URL for API (e.g., "https://api.twitter.com")
    pub api_base_url: String,
    /// Base URL for media uploads
    pub upload_base_url: String,
    pub request_timeout: Duration,
    pub upload_timeout: Duration,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self::from_config(&XApiConfig::default(), &HttpConfig::default())
    }
}

impl ApiClientConfig {
    pub fn from_config(x: &XApiConfig, http: &HttpConfig) -> Self {
        Self {
            api_base_url: x.api_base_url.trim_end_matches('/').to_string(),
            upload_base_url: x.upload_base_url.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(http.request_timeout_secs),
            upload_timeout: Duration::from_secs(http.upload_timeout_secs),
        }
    }
}

/// A request with everything but the credential.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: reqwest::Method,
    pub url: Url,
    pub content_type: Option<&'static str>,
    pub body: Option<Vec<u8>>,
    /// Form parameters, which take part in the OAuth 1.0a signature.
    pub form_params: Vec<(String, String)>,
    pub timeout: Duration,
}

/// API client that executes authenticated requests
pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    auth: RequestAuth,
    config: ApiClientConfig,
}

impl ApiClient {
    pub fn new(
        config: ApiClientConfig,
        transport: Arc<dyn HttpTransport>,
        auth: RequestAuth,
    ) -> Self {
        Self { transport, auth, config }
    }

    /// Create a builder for fluent configuration
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    pub const fn scheme(&self) -> AuthScheme {
        self.auth.scheme()
    }

    pub const fn config(&self) -> &ApiClientConfig {
        &self.config
    }

    /// Execute `endpoint` and decode the JSON response.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`]. A 401 under OAuth 2.0 is retried once after a
    /// refresh before it is surfaced as `Unauthorized`.
    #[instrument(
        skip(self, endpoint),
        fields(method = %endpoint.method(), path = %endpoint.path(), scheme = ?self.scheme())
    )]
    pub async fn execute<E, T>(&self, endpoint: &E) -> Result<T, ApiError>
    where
        E: ApiEndpoint + ?Sized,
        T: DeserializeOwned,
    {
        let prepared = self.prepare(endpoint)?;
        let response = self.send_authenticated(&prepared).await?;
        Self::decode(&response)
    }

    /// [`execute`](Self::execute), abandoned with `Cancelled` as soon as
    /// `cancel` fires.
    pub async fn execute_cancellable<E, T>(
        &self,
        endpoint: &E,
        cancel: &CancellationToken,
    ) -> Result<T, ApiError>
    where
        E: ApiEndpoint + ?Sized,
        T: DeserializeOwned,
    {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("Request cancelled by caller");
                Err(ApiError::Cancelled)
            }
            result = self.execute(endpoint) => result,
        }
    }

    /// Build the URL and body for `endpoint`.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` if the URL or JSON body cannot be built
    pub fn prepare<E>(&self, endpoint: &E) -> Result<PreparedRequest, ApiError>
    where
        E: ApiEndpoint + ?Sized,
    {
        let base = match endpoint.host() {
            ApiHost::Api => &self.config.api_base_url,
            ApiHost::Upload => &self.config.upload_base_url,
        };
        let query = endpoint.query();
        let mut raw = format!("{base}{}", endpoint.path());
        if !query.is_empty() {
            raw.push('?');
            raw.push_str(&encode_pairs(&query));
        }
        let url = Url::parse(&raw).map_err(|e| ApiError::InvalidRequest(format!("{raw}: {e}")))?;

        let (content_type, body, form_params) = match endpoint.body() {
            RequestBody::Empty => (None, None, Vec::new()),
            RequestBody::Json(value) => {
                let bytes = serde_json::to_vec(&value).map_err(|e| {
                    ApiError::InvalidRequest(format!("Failed to serialize body: {e}"))
                })?;
                (Some("application/json"), Some(bytes), Vec::new())
            }
            RequestBody::Form(params) => {
                let bytes = encode_pairs(&params).into_bytes();
                (Some("application/x-www-form-urlencoded"), Some(bytes), params)
            }
        };

        let timeout = match endpoint.timeout_class() {
            TimeoutClass::Standard => self.config.request_timeout,
            TimeoutClass::Upload => self.config.upload_timeout,
        };

        Ok(PreparedRequest {
            method: endpoint.method(),
            url,
            content_type,
            body,
            form_params,
            timeout,
        })
    }

    async fn send_authenticated(
        &self,
        prepared: &PreparedRequest,
    ) -> Result<HttpResponse, ApiError> {
        match &self.auth {
            RequestAuth::OAuth2(provider) => {
                let token = provider.access_token().await?;
                let response = self.send(prepared, format!("Bearer {token}")).await?;
                if response.status != StatusCode::UNAUTHORIZED {
                    return Ok(response);
                }

                info!("Access token rejected, refreshing and retrying once");
                let token = provider.refresh_rejected(&token).await?;
                let retry = self.send(prepared, format!("Bearer {token}")).await?;
                if retry.status == StatusCode::UNAUTHORIZED {
                    warn!("Refreshed access token was rejected as well");
                }
                Ok(retry)
            }
            RequestAuth::OAuth1(provider) => {
                let signer = provider.signer().await?;
                // The header is computed here and sent as-is, so the signed
                // nonce and timestamp are the ones on the wire.
                let signed = signer
                    .sign(prepared.method.as_str(), prepared.url.as_str(), &prepared.form_params)
                    .map_err(|e| ApiError::Signature(e.to_string()))?;
                self.send(prepared, signed.authorization).await
            }
        }
    }

    async fn send(
        &self,
        prepared: &PreparedRequest,
        authorization: String,
    ) -> Result<HttpResponse, ApiError> {
        let mut request =
            HttpRequest::new(prepared.method.clone(), prepared.url.clone(), prepared.timeout)
                .header("Authorization", authorization);
        if let Some(content_type) = prepared.content_type {
            request = request.header("Content-Type", content_type);
        }
        if let Some(body) = &prepared.body {
            request = request.body(body.clone());
        }
        Ok(self.transport.send(request).await?)
    }

    /// Map a response onto the result type or an [`ApiError`].
    fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
        let status = response.status;

        if status.is_success() {
            // 204/205 have no body by RFC; decode them as JSON null
            if status == StatusCode::NO_CONTENT
                || status == StatusCode::RESET_CONTENT
                || response.body.iter().all(u8::is_ascii_whitespace)
            {
                return serde_json::from_value(serde_json::Value::Null).map_err(|_| {
                    ApiError::Decoding(format!(
                        "empty response ({}) cannot be decoded into the expected type",
                        status.as_u16()
                    ))
                });
            }
            return serde_json::from_slice(&response.body)
                .map_err(|e| ApiError::Decoding(e.to_string()));
        }

        match status {
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = parse_retry_after(response, Utc::now());
                warn!(retry_after_secs = retry_after.map(|d| d.as_secs()), "Rate limited");
                Err(ApiError::RateLimited { retry_after })
            }
            s if s.is_server_error() => Err(ApiError::Server {
                status: s.as_u16(),
                message: ProblemDetails::message_from(&response.body),
            }),
            s => {
                let body = response.text();
                Err(ApiError::Http {
                    status: s.as_u16(),
                    body: if body.trim().is_empty() { None } else { Some(body) },
                })
            }
        }
    }
}

/// `Retry-After` as delta-seconds or HTTP-date, else X's
/// `x-rate-limit-reset` epoch seconds.
fn parse_retry_after(response: &HttpResponse, now: DateTime<Utc>) -> Option<Duration> {
    if let Some(value) = response.header("retry-after").map(str::trim) {
        if let Ok(secs) = value.parse::<u64>() {
            return Some(Duration::from_secs(secs));
        }
        if let Ok(at) = DateTime::parse_from_rfc2822(value) {
            return Some(until(at.with_timezone(&Utc), now));
        }
    }
    let reset = response.header("x-rate-limit-reset")?.trim().parse::<i64>().ok()?;
    let at = DateTime::<Utc>::from_timestamp(reset, 0)?;
    Some(until(at, now))
}

fn until(at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (at - now).to_std().unwrap_or(Duration::ZERO)
}

/// Builder for API client
#[derive(Default)]
pub struct ApiClientBuilder {
    config: Option<ApiClientConfig>,
    transport: Option<Arc<dyn HttpTransport>>,
    auth: Option<RequestAuth>,
    user_agent: Option<String>,
}

impl ApiClientBuilder {
    /// Set the API configuration
    pub fn config(mut self, config: ApiClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use a custom transport instead of the default `reqwest` client
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Set the authentication strategy
    pub fn auth(mut self, auth: RequestAuth) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the API client
    ///
    /// # Errors
    ///
    /// Returns error if the auth strategy is missing or the default transport
    /// cannot be created
    pub fn build(self) -> Result<ApiClient, ApiError> {
        let config = self.config.unwrap_or_default();
        let auth = self
            .auth
            .ok_or_else(|| ApiError::InvalidRequest("Auth strategy not set".to_string()))?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => {
                let mut builder = HttpClient::builder().timeout(config.upload_timeout);
                if let Some(agent) = self.user_agent {
                    builder = builder.user_agent(agent);
                }
                Arc::new(builder.build()?) as Arc<dyn HttpTransport>
            }
        };

        Ok(ApiClient::new(config, transport, auth))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use agentdodo_common::auth::{OAuth1Account, OAuth1Credentials, OAuth1Signer};
    use agentdodo_common::security::InMemorySecretStore;
    use async_trait::async_trait;
    use reqwest::header::{HeaderMap, HeaderValue};
    use serde::Deserialize;
    use wiremock::matchers::{body_string, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::api::auth::AccessTokenProvider;
    use crate::api::endpoint::XEndpoint;

    /// Hands out `initial` until a refresh, then `refreshed`.
    struct RefreshingAuthProvider {
        initial: String,
        refreshed: String,
        refreshes: AtomicUsize,
        fail_refresh: bool,
    }

    impl RefreshingAuthProvider {
        fn new(initial: &str, refreshed: &str) -> Self {
            Self {
                initial: initial.to_string(),
                refreshed: refreshed.to_string(),
                refreshes: AtomicUsize::new(0),
                fail_refresh: false,
            }
        }

        fn refreshes(&self) -> usize {
            self.refreshes.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AccessTokenProvider for RefreshingAuthProvider {
        async fn access_token(&self) -> Result<String, ApiError> {
            if self.refreshes() == 0 {
                Ok(self.initial.clone())
            } else {
                Ok(self.refreshed.clone())
            }
        }

        async fn refresh_rejected(&self, rejected: &str) -> Result<String, ApiError> {
            assert_eq!(rejected, self.initial);
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            if self.fail_refresh {
                return Err(ApiError::Unauthorized);
            }
            Ok(self.refreshed.clone())
        }
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Data {
        data: Item,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: String,
    }

    fn config_for(server: &MockServer) -> ApiClientConfig {
        ApiClientConfig {
            api_base_url: server.uri(),
            upload_base_url: format!("{}/upload", server.uri()),
            request_timeout: Duration::from_secs(5),
            upload_timeout: Duration::from_secs(10),
        }
    }

    fn json_body(status: u16, body: serde_json::Value) -> ResponseTemplate {
        ResponseTemplate::new(status).set_body_json(body)
    }

    fn oauth2_client(server: &MockServer, provider: Arc<RefreshingAuthProvider>) -> ApiClient {
        ApiClient::builder()
            .config(config_for(server))
            .auth(RequestAuth::OAuth2(provider))
            .build()
            .unwrap()
    }

    async fn oauth1_client(server: &MockServer) -> ApiClient {
        let account = Arc::new(OAuth1Account::new(Arc::new(InMemorySecretStore::new())));
        account.configure(OAuth1Credentials::new("CK", "CS", "AT", "ATS")).await.unwrap();
        ApiClient::builder()
            .config(config_for(server))
            .auth(RequestAuth::OAuth1(account))
            .build()
            .unwrap()
    }

    fn post(text: &str) -> XEndpoint {
        XEndpoint::CreatePost { text: text.to_string(), reply_to: None }
    }

    #[tokio::test]
    async fn test_bearer_request_decodes_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2/tweets"))
            .and(header("Authorization", "Bearer good"))
            .and(header("Content-Type", "application/json"))
            .and(body_string(r#"{"text":"hello"}"#))
            .respond_with(json_body(201, serde_json::json!({"data": {"id": "1"}})))
            .expect(1)
            .mount(&server)
            .await;

        let provider = Arc::new(RefreshingAuthProvider::new("good", "unused"));
        let client = oauth2_client(&server, Arc::clone(&provider));

        let result: Data = client.execute(&post("hello")).await.unwrap();
        assert_eq!(result.data.id, "1");
        assert_eq!(provider.refreshes(), 0);
    }

    /// Validates the single refresh-and-retry on 401.
    ///
    /// Assertions:
    /// - Ensures the caller gets the decoded result of the retry.
    /// - Ensures exactly two requests reached the server and one refresh ran.
    #[tokio::test]
    async fn test_401_refreshes_once_and_retries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/2/users/me"))
            .and(header("Authorization", "Bearer stale"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/2/users/me"))
            .and(header("Authorization", "Bearer fresh"))
            .respond_with(json_body(200, serde_json::json!({"data": {"id": "7"}})))
            .expect(1)
            .mount(&server)
            .await;

        let provider = Arc::new(RefreshingAuthProvider::new("stale", "fresh"));
        let client = oauth2_client(&server, Arc::clone(&provider));

        let result: Data = client.execute(&XEndpoint::CurrentUser).await.unwrap();
        assert_eq!(result.data.id, "7");
        assert_eq!(provider.refreshes(), 1);
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_second_401_is_unauthorized_without_third_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .expect(2)
            .mount(&server)
            .await;

        let provider = Arc::new(RefreshingAuthProvider::new("stale", "also-stale"));
        let client = oauth2_client(&server, Arc::clone(&provider));

        let err = client.execute::<_, Data>(&XEndpoint::CurrentUser).await.unwrap_err();
        assert_eq!(err, ApiError::Unauthorized);
        assert!(err.requires_reauthorization());
        assert_eq!(provider.refreshes(), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_surfaces_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let mut provider = RefreshingAuthProvider::new("stale", "never");
        provider.fail_refresh = true;
        let client = oauth2_client(&server, Arc::new(provider));

        let err = client.execute::<_, Data>(&XEndpoint::CurrentUser).await.unwrap_err();
        assert_eq!(err, ApiError::Unauthorized);
    }

    #[tokio::test]
    async fn test_oauth1_401_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let client = oauth1_client(&server).await;
        let err = client.execute::<_, Data>(&XEndpoint::CurrentUser).await.unwrap_err();
        assert_eq!(err, ApiError::Unauthorized);
    }

    /// Validates that the signature covers exactly what went on the wire.
    ///
    /// Assertions:
    /// - Ensures the query string of the URL is part of the signature.
    /// - Ensures re-signing the received request with the received nonce and
    ///   timestamp reproduces the received signature.
    #[tokio::test]
    async fn test_oauth1_signature_matches_sent_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/2/users/me"))
            .and(query_param("user.fields", "profile_image_url,description,public_metrics"))
            .respond_with(json_body(200, serde_json::json!({"data": {"id": "9"}})))
            .expect(1)
            .mount(&server)
            .await;

        let client = oauth1_client(&server).await;
        let _: Data = client.execute(&XEndpoint::CurrentUser).await.unwrap();

        let request = &server.received_requests().await.unwrap()[0];
        let header = request.headers.get("authorization").unwrap().to_str().unwrap();
        let params = parse_oauth_header(header);
        assert_eq!(params["oauth_consumer_key"], "CK");
        assert_eq!(params["oauth_token"], "AT");
        assert_eq!(params["oauth_signature_method"], "HMAC-SHA1");

        let signer = OAuth1Signer::new(OAuth1Credentials::new("CK", "CS", "AT", "ATS")).unwrap();
        let expected = signer
            .sign_with(
                "GET",
                request.url.as_str(),
                &[],
                &params["oauth_nonce"],
                &params["oauth_timestamp"],
            )
            .unwrap();
        assert_eq!(params["oauth_signature"], expected.signature);
        let fields = "user.fields%3Dprofile_image_url%252Cdescription%252Cpublic_metrics";
        assert!(expected.base_string.contains(fields));
    }

    #[tokio::test]
    async fn test_oauth1_form_upload_signs_body_and_uses_upload_host() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload/1.1/media/upload.json"))
            .and(header("Content-Type", "application/x-www-form-urlencoded"))
            .and(body_string("command=INIT&total_bytes=10&media_type=image%2Fpng"))
            .respond_with(json_body(202, serde_json::json!({"media_id_string": "m1"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = oauth1_client(&server).await;
        let endpoint = XEndpoint::MediaUploadInit {
            total_bytes: 10,
            media_type: "image/png".into(),
            media_category: None,
        };
        let prepared = client.prepare(&endpoint).unwrap();
        assert_eq!(prepared.timeout, Duration::from_secs(10));

        let _: serde_json::Value = client.execute(&endpoint).await.unwrap();

        let request = &server.received_requests().await.unwrap()[0];
        let header = request.headers.get("authorization").unwrap().to_str().unwrap();
        let params = parse_oauth_header(header);
        let signer = OAuth1Signer::new(OAuth1Credentials::new("CK", "CS", "AT", "ATS")).unwrap();
        let expected = signer
            .sign_with(
                "POST",
                request.url.as_str(),
                &prepared.form_params,
                &params["oauth_nonce"],
                &params["oauth_timestamp"],
            )
            .unwrap();
        assert_eq!(params["oauth_signature"], expected.signature);
    }

    #[tokio::test]
    async fn test_no_content_decodes_to_unit() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let client = oauth2_client(&server, Arc::new(RefreshingAuthProvider::new("t", "t2")));
        let delete = XEndpoint::DeletePost { id: "1".into() };
        let result: Result<(), ApiError> = client.execute(&delete).await;
        assert!(result.is_ok());

        let typed: Result<Data, ApiError> = client.execute(&delete).await;
        assert!(matches!(typed, Err(ApiError::Decoding(_))));
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let server = MockServer::start().await;
        Mock::given(path("/2/tweets/429"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "30"))
            .mount(&server)
            .await;
        Mock::given(path("/2/tweets/503"))
            .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
                "title": "Service Unavailable",
                "detail": "Service Unavailable",
                "type": "about:blank",
                "status": 503
            })))
            .mount(&server)
            .await;
        Mock::given(path("/2/tweets/403"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;
        Mock::given(path("/2/tweets/bad"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
            .mount(&server)
            .await;

        let client = oauth2_client(&server, Arc::new(RefreshingAuthProvider::new("t", "t2")));
        let get = |id: &str| XEndpoint::GetPost { id: id.to_string() };

        assert_eq!(
            client.execute::<_, Data>(&get("429")).await.unwrap_err(),
            ApiError::RateLimited { retry_after: Some(Duration::from_secs(30)) }
        );
        assert_eq!(
            client.execute::<_, Data>(&get("503")).await.unwrap_err(),
            ApiError::Server { status: 503, message: Some("Service Unavailable".into()) }
        );
        assert_eq!(
            client.execute::<_, Data>(&get("403")).await.unwrap_err(),
            ApiError::Http { status: 403, body: Some("forbidden".into()) }
        );
        assert!(matches!(client.execute::<_, Data>(&get("bad")).await, Err(ApiError::Decoding(_))));
        assert_eq!(server.received_requests().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_timeout_is_distinct() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let mut config = config_for(&server);
        config.request_timeout = Duration::from_millis(100);
        let client = ApiClient::builder()
            .config(config)
            .auth(RequestAuth::OAuth2(Arc::new(RefreshingAuthProvider::new("t", "t2"))))
            .build()
            .unwrap();

        let err = client.execute::<_, Data>(&XEndpoint::CurrentUser).await.unwrap_err();
        assert_eq!(err, ApiError::Timeout(Duration::from_millis(100)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_cancellation() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let client = oauth2_client(&server, Arc::new(RefreshingAuthProvider::new("t", "t2")));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let err = client
            .execute_cancellable::<_, Data>(&XEndpoint::CurrentUser, &cancel)
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::Cancelled);
    }

    #[tokio::test]
    async fn test_builder_missing_auth() {
        assert!(ApiClient::builder().build().is_err());
    }

    #[test]
    fn test_retry_after_formats() {
        let now = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
        let reset_at = now.timestamp() + 60;
        let response = |name: &'static str, value: &str| {
            let mut headers = HeaderMap::new();
            headers.insert(name, HeaderValue::from_str(value).unwrap());
            HttpResponse { status: StatusCode::TOO_MANY_REQUESTS, headers, body: Vec::new() }
        };

        assert_eq!(
            parse_retry_after(&response("retry-after", "120"), now),
            Some(Duration::from_secs(120))
        );
        assert_eq!(
            parse_retry_after(&response("retry-after", "Mon, 01 Jan 2024 00:00:45 GMT"), now),
            Some(Duration::from_secs(45))
        );
        assert_eq!(
            parse_retry_after(&response("x-rate-limit-reset", &reset_at.to_string()), now),
            Some(Duration::from_secs(60))
        );
        assert_eq!(
            parse_retry_after(&response("retry-after", "Sun, 01 Jan 2023 00:00:00 GMT"), now),
            Some(Duration::ZERO)
        );
        assert_eq!(parse_retry_after(&response("retry-after", "soon"), now), None);
    }

    fn parse_oauth_header(header: &str) -> HashMap<String, String> {
        header
            .strip_prefix("OAuth ")
            .unwrap()
            .split(", ")
            .map(|part| {
                let (key, value) = part.split_once('=').unwrap();
                let value = value.trim_matches('"');
                (key.to_string(), urlencoding::decode(value).unwrap().into_owned())
            })
            .collect()
    }
}
