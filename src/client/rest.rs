use std::io::Write;
use std::sync::RwLock;

use flate2::write::GzEncoder;
use flate2::Compression;
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_ENCODING, CONTENT_TYPE, COOKIE, SET_COOKIE};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;
use uuid::Uuid;

use crate::config::OctaneConfig;
use crate::error::{Result, SdkError};

use super::routes;

const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";
const USER_AGENT: &str = concat!("octane-ci-sdk/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the Octane REST API.
///
/// Wraps `reqwest` with the server's conventions: JSON accept headers, gzip
/// request bodies on PUT/POST, a correlation ID per request, and cookie-based
/// sessions established via client ID/secret sign-in. A request rejected with
/// 401 triggers one re-authentication and a single replay.
pub struct RestClient {
    http: reqwest::Client,
    base: Url,
    client_id: String,
    client_secret: String,
    cookie: RwLock<Option<String>>,
}

struct RequestBody {
    content_type: &'static str,
    bytes: Vec<u8>,
}

impl RestClient {
    /// Builds a client from the connection configuration.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::Config` when the server or proxy URL is invalid.
    pub fn new(config: &OctaneConfig) -> Result<Self> {
        let mut base = Url::parse(&config.url)
            .map_err(|e| SdkError::Config(format!("invalid server URL '{}': {e}", config.url)))?;
        // Url::join treats the last path segment as a file unless the path
        // ends with a slash.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let mut builder = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout());

        if let Some(proxy) = &config.proxy {
            let mut proxy_cfg = reqwest::Proxy::all(&proxy.url)
                .map_err(|e| SdkError::Config(format!("invalid proxy URL '{}': {e}", proxy.url)))?;
            if let (Some(user), Some(pass)) = (&proxy.username, &proxy.password) {
                proxy_cfg = proxy_cfg.basic_auth(user, pass);
            }
            builder = builder.proxy(proxy_cfg);
        }

        let http = builder
            .build()
            .map_err(|e| SdkError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            cookie: RwLock::new(None),
        })
    }

    /// Authenticates with client ID/secret and stores the session cookies.
    pub async fn sign_in(&self) -> Result<()> {
        #[derive(Serialize)]
        struct SignIn<'a> {
            client_id: &'a str,
            client_secret: &'a str,
        }

        let url = self.join(routes::SIGN_IN)?;
        let response = self
            .http
            .post(url)
            .header(CORRELATION_ID_HEADER, Uuid::new_v4().to_string())
            .json(&SignIn {
                client_id: &self.client_id,
                client_secret: &self.client_secret,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SdkError::Auth(format!(
                "sign-in rejected with status {status}"
            )));
        }

        let cookies: Vec<String> = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.split(';').next())
            .map(str::to_string)
            .collect();

        if cookies.is_empty() {
            return Err(SdkError::Auth("sign-in returned no session cookie".to_string()));
        }

        *self.cookie.write().unwrap() = Some(cookies.join("; "));
        debug!("authenticated against Octane ({} cookies)", cookies.len());
        Ok(())
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(Method::GET, path, None).await?;
        Ok(response.json().await?)
    }

    pub async fn get_text(&self, path: &str) -> Result<String> {
        let response = self.send(Method::GET, path, None).await?;
        Ok(response.text().await?)
    }

    pub async fn post_json<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        let bytes = serde_json::to_vec(body)?;
        self.send(
            Method::POST,
            path,
            Some(RequestBody {
                content_type: "application/json",
                bytes,
            }),
        )
        .await?;
        Ok(())
    }

    pub async fn put_json<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        let bytes = serde_json::to_vec(body)?;
        self.send(
            Method::PUT,
            path,
            Some(RequestBody {
                content_type: "application/json",
                bytes,
            }),
        )
        .await?;
        Ok(())
    }

    /// Posts a raw body (e.g., a console log) with the given content type.
    pub async fn post_bytes(&self, path: &str, content_type: &'static str, bytes: Vec<u8>) -> Result<()> {
        self.send(
            Method::POST,
            path,
            Some(RequestBody {
                content_type,
                bytes,
            }),
        )
        .await?;
        Ok(())
    }

    fn join(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| SdkError::Config(format!("invalid request path '{path}': {e}")))
    }

    async fn send(&self, method: Method, path: &str, body: Option<RequestBody>) -> Result<Response> {
        let url = self.join(path)?;

        let compressed = match &body {
            Some(body) => Some(gzip(&body.bytes)?),
            None => None,
        };

        for attempt in 0..2 {
            let mut headers = HeaderMap::new();
            headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
            headers.insert(
                CORRELATION_ID_HEADER,
                HeaderValue::from_str(&Uuid::new_v4().to_string())
                    .map_err(|e| SdkError::Config(e.to_string()))?,
            );
            if let Some(cookie) = self.cookie.read().unwrap().as_deref() {
                if let Ok(value) = HeaderValue::from_str(cookie) {
                    headers.insert(COOKIE, value);
                }
            }

            let mut request = self.http.request(method.clone(), url.clone()).headers(headers);
            if let (Some(body), Some(compressed)) = (&body, &compressed) {
                request = request
                    .header(CONTENT_TYPE, body.content_type)
                    .header(CONTENT_ENCODING, "gzip")
                    .body(compressed.clone());
            }

            let response = request.send().await?;
            let status = response.status();

            if status == StatusCode::UNAUTHORIZED && attempt == 0 {
                warn!("request to {path} rejected with 401, re-authenticating");
                self.sign_in().await?;
                continue;
            }

            if !status.is_success() {
                let message = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "unable to read error response".to_string());
                return Err(SdkError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            return Ok(response);
        }

        // One replay after re-authentication; a second 401 surfaces above.
        unreachable!("request loop always returns within two attempts")
    }
}

fn gzip(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    Ok(encoder.finish()?)
}
