//! HTTP Client implementation using reqwest.
//!
//! This adapter implements the `HttpClient` port using the reqwest library.
//! It keeps a cookie jar, so the refresh cookie set by the API at sign-in
//! travels with every later request.

use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};

use reqwest::{Client, Method, Url};
use tracing::debug;
use verdant_application::ports::{HttpClient, HttpClientError};
use verdant_domain::{HttpMethod, RequestBody, RequestSpec, ResponseSpec};

use crate::config::ClientConfig;

/// Redirects followed before giving up.
const MAX_REDIRECTS: usize = 10;

/// HTTP client implementation using reqwest.
///
/// Wraps a `reqwest::Client` with a cookie store. Clone the adapter, or
/// share it behind an `Arc`, to share the jar.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: Client,
    timeout: Duration,
}

impl ReqwestHttpClient {
    /// Creates a client from the process configuration.
    ///
    /// Configuration applied:
    /// - Request timeout from the config
    /// - Follow redirects: up to 10
    /// - Cookie store: enabled
    /// - User-Agent from the config
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be created.
    pub fn new(config: &ClientConfig) -> Result<Self, HttpClientError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .cookie_store(true)
            .build()
            .map_err(|e| HttpClientError::Other(e.to_string()))?;

        Ok(Self {
            client,
            timeout: config.request_timeout,
        })
    }

    /// Converts domain `HttpMethod` to reqwest `Method`.
    const fn to_reqwest_method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
        }
    }

    /// Attaches the request body, rejecting malformed JSON before sending.
    fn build_body(
        builder: reqwest::RequestBuilder,
        body: &RequestBody,
    ) -> Result<reqwest::RequestBuilder, HttpClientError> {
        if body.content_type.contains("application/json") && !body.content.is_empty() {
            let _: serde_json::Value = serde_json::from_str(&body.content)
                .map_err(|e| HttpClientError::InvalidBody(format!("Invalid JSON: {e}")))?;
        }
        Ok(builder.body(body.content.clone()))
    }

    /// Maps reqwest errors to `HttpClientError`.
    fn map_error(&self, error: &reqwest::Error) -> HttpClientError {
        if error.is_timeout() {
            return HttpClientError::Timeout {
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            };
        }

        if error.is_connect() {
            let message = error.to_string();
            let lowered = message.to_lowercase();
            if lowered.contains("dns") || lowered.contains("resolve") {
                return HttpClientError::DnsError {
                    host: error
                        .url()
                        .and_then(Url::host_str)
                        .unwrap_or("unknown")
                        .to_string(),
                    message,
                };
            }
            return HttpClientError::ConnectionFailed(message);
        }

        if error.is_redirect() {
            return HttpClientError::TooManyRedirects { max: MAX_REDIRECTS };
        }

        HttpClientError::Other(error.to_string())
    }
}

impl HttpClient for ReqwestHttpClient {
    fn execute(
        &self,
        request: &RequestSpec,
    ) -> impl Future<Output = Result<ResponseSpec, HttpClientError>> + Send {
        let method = request.method;
        let url = request.url.clone();
        let headers = request.headers.clone();
        let body = request.body.clone();

        async move {
            let parsed_url =
                Url::parse(&url).map_err(|e| HttpClientError::InvalidUrl(format!("{e}: {url}")))?;

            let start = Instant::now();

            let mut builder = self
                .client
                .request(Self::to_reqwest_method(method), parsed_url);

            for header in headers.iter() {
                builder = builder.header(&header.name, &header.value);
            }

            if let Some(body) = &body {
                if !headers.contains("content-type") {
                    builder = builder.header("Content-Type", &body.content_type);
                }
                builder = Self::build_body(builder, body)?;
            }

            debug!(method = %method, url = %url, "sending request");
            let response = builder.send().await.map_err(|e| self.map_error(&e))?;

            let status = response.status().as_u16();

            let response_headers: HashMap<String, String> = response
                .headers()
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("<binary>").to_string()))
                .collect();

            let body_bytes = response
                .bytes()
                .await
                .map_err(|e| HttpClientError::Other(format!("Failed to read body: {e}")))?
                .to_vec();

            let duration = start.elapsed();
            debug!(
                method = %method,
                url = %url,
                status,
                elapsed_ms = duration.as_millis(),
                "response received"
            );

            Ok(ResponseSpec::new(
                status,
                response_headers,
                body_bytes,
                duration,
            ))
        }
    }
}
