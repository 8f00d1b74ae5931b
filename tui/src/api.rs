use std::time::Duration;

use bytes::Bytes;
use http::{Method, Request, StatusCode, header};
use http_body_util::{BodyExt, Full};
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, warn};

use shared::types::{
    ApiError, ApiErrorBody, Comment, CommentPayload, ConfigError, News, NewsPayload,
    RegisterRequest, ServiceConfig, TokenResponse,
};

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Typed client for the news service HTTP contract.
///
/// One short-lived HTTP/1.1 connection per request: this client drives a
/// handful of user-initiated calls, not a request firehose, so connection
/// reuse buys nothing worth the pool bookkeeping.
#[derive(Debug, Clone)]
pub struct ApiClient {
    host: String,
    port: u16,
    request_timeout: Duration,
}

impl ApiClient {
    pub fn new(config: &ServiceConfig) -> Result<Self, ConfigError> {
        let (host, port) = config.authority()?;
        Ok(Self {
            host,
            port,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        })
    }

    // -- auth ---------------------------------------------------------------

    /// `POST /auth/login`, form-encoded.  Returns the raw access token; the
    /// session store owns decoding and persistence.
    pub async fn login(&self, username: &str, password: &str) -> Result<String, ApiError> {
        let form = form_urlencoded::Serializer::new(String::new())
            .append_pair("username", username)
            .append_pair("password", password)
            .finish();

        let (status, body) = self
            .dispatch(
                Method::POST,
                "/auth/login",
                None,
                Some(("application/x-www-form-urlencoded", Bytes::from(form))),
            )
            .await?;

        if !status.is_success() {
            warn!("Login rejected with status {}", status);
            // A 401 here is bad credentials, not a capability problem.
            return Err(match map_error(status, &body) {
                ApiError::Denied(detail) => ApiError::Authentication(detail),
                other => other,
            });
        }

        let token: TokenResponse =
            serde_json::from_slice(&body).map_err(|e| ApiError::Body(e.to_string()))?;
        Ok(token.access_token)
    }

    /// `POST /auth/register`.  Success carries no data the client needs.
    pub async fn register(&self, request: &RegisterRequest) -> Result<(), ApiError> {
        self.send_json(Method::POST, "/auth/register", request, None)
            .await?;
        Ok(())
    }

    // -- news ---------------------------------------------------------------

    pub async fn list_news(&self, bearer: Option<&str>) -> Result<Vec<News>, ApiError> {
        self.get_json("/news/", bearer).await
    }

    pub async fn get_news(&self, id: i64, bearer: Option<&str>) -> Result<News, ApiError> {
        self.get_json(&format!("/news/{}", id), bearer).await
    }

    pub async fn create_news(
        &self,
        payload: &NewsPayload,
        bearer: Option<&str>,
    ) -> Result<(), ApiError> {
        self.send_json(Method::POST, "/news/", payload, bearer)
            .await?;
        Ok(())
    }

    pub async fn update_news(
        &self,
        id: i64,
        payload: &NewsPayload,
        bearer: Option<&str>,
    ) -> Result<(), ApiError> {
        self.send_json(Method::PUT, &format!("/news/{}", id), payload, bearer)
            .await?;
        Ok(())
    }

    pub async fn delete_news(&self, id: i64, bearer: Option<&str>) -> Result<(), ApiError> {
        self.delete(&format!("/news/{}", id), bearer).await
    }

    // -- comments -----------------------------------------------------------

    pub async fn list_comments(
        &self,
        news_id: i64,
        bearer: Option<&str>,
    ) -> Result<Vec<Comment>, ApiError> {
        self.get_json(&format!("/comments/?news_id={}", news_id), bearer)
            .await
    }

    pub async fn create_comment(
        &self,
        payload: &CommentPayload,
        bearer: Option<&str>,
    ) -> Result<(), ApiError> {
        self.send_json(Method::POST, "/comments/", payload, bearer)
            .await?;
        Ok(())
    }

    pub async fn update_comment(
        &self,
        id: i64,
        payload: &CommentPayload,
        bearer: Option<&str>,
    ) -> Result<(), ApiError> {
        self.send_json(Method::PUT, &format!("/comments/{}", id), payload, bearer)
            .await?;
        Ok(())
    }

    pub async fn delete_comment(&self, id: i64, bearer: Option<&str>) -> Result<(), ApiError> {
        self.delete(&format!("/comments/{}", id), bearer).await
    }

    // -- request plumbing ---------------------------------------------------

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        bearer: Option<&str>,
    ) -> Result<T, ApiError> {
        let (status, body) = self.dispatch(Method::GET, path, bearer, None).await?;
        if !status.is_success() {
            return Err(map_error(status, &body));
        }
        serde_json::from_slice(&body).map_err(|e| ApiError::Body(e.to_string()))
    }

    async fn send_json<T: Serialize>(
        &self,
        method: Method,
        path: &str,
        payload: &T,
        bearer: Option<&str>,
    ) -> Result<Bytes, ApiError> {
        let json = serde_json::to_vec(payload).map_err(|e| ApiError::Body(e.to_string()))?;
        let (status, body) = self
            .dispatch(
                method,
                path,
                bearer,
                Some(("application/json", Bytes::from(json))),
            )
            .await?;
        if !status.is_success() {
            return Err(map_error(status, &body));
        }
        Ok(body)
    }

    async fn delete(&self, path: &str, bearer: Option<&str>) -> Result<(), ApiError> {
        let (status, body) = self.dispatch(Method::DELETE, path, bearer, None).await?;
        if !status.is_success() {
            return Err(map_error(status, &body));
        }
        Ok(())
    }

    async fn dispatch(
        &self,
        method: Method,
        path: &str,
        bearer: Option<&str>,
        body: Option<(&'static str, Bytes)>,
    ) -> Result<(StatusCode, Bytes), ApiError> {
        timeout(
            self.request_timeout,
            self.dispatch_inner(method, path, bearer, body),
        )
        .await
        .map_err(|_| ApiError::Network(format!("request to {} timed out", path)))?
    }

    /// One request over one fresh connection.  The connection driver is
    /// spawned off and runs until the response body has been collected.
    async fn dispatch_inner(
        &self,
        method: Method,
        path: &str,
        bearer: Option<&str>,
        body: Option<(&'static str, Bytes)>,
    ) -> Result<(StatusCode, Bytes), ApiError> {
        let addr = format!("{}:{}", self.host, self.port);

        let stream = TcpStream::connect(&addr)
            .await
            .map_err(|e| ApiError::Network(format!("connect {}: {}", addr, e)))?;
        let io = TokioIo::new(stream);

        let (mut sender, conn) = http1::handshake(io)
            .await
            .map_err(|e| ApiError::Network(format!("handshake: {}", e)))?;

        tokio::task::spawn(async move {
            if let Err(err) = conn.await {
                debug!("Connection closed with error: {:?}", err);
            }
        });

        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header(header::HOST, addr)
            .header(header::ACCEPT, "application/json");

        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some((content_type, bytes)) => builder
                .header(header::CONTENT_TYPE, content_type)
                .body(Full::new(bytes)),
            None => builder.body(Full::new(Bytes::new())),
        }
        .map_err(|e| ApiError::Network(format!("build request: {}", e)))?;

        let response = sender
            .send_request(request)
            .await
            .map_err(|e| ApiError::Network(format!("send request: {}", e)))?;

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .map_err(|e| ApiError::Network(format!("read body: {}", e)))?
            .to_bytes();

        Ok((status, bytes))
    }
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Map a non-2xx response onto the client error taxonomy.
fn map_error(status: StatusCode, body: &Bytes) -> ApiError {
    let detail = serde_json::from_slice::<ApiErrorBody>(body)
        .map(|b| b.detail.first_message())
        .unwrap_or_else(|_| String::from_utf8_lossy(body).trim().to_string());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ApiError::Denied(fallback(detail, "access denied"))
        }
        StatusCode::UNPROCESSABLE_ENTITY => {
            ApiError::Validation(fallback(detail, "Validation failed"))
        }
        StatusCode::CONFLICT => ApiError::Conflict(fallback(detail, "conflict")),
        _ => ApiError::Status {
            status,
            message: fallback(detail, "no detail"),
        },
    }
}

fn fallback(detail: String, default: &str) -> String {
    if detail.is_empty() {
        default.to_string()
    } else {
        detail
    }
}
