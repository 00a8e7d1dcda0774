//! HTTP client for a Lambda-compatible invoke API.
//!
//! Posts the payload to `{base_url}/2015-03-31/functions/{function}/invocations`
//! and maps the response onto `InvokeResponse`. Any HTTP status is a completed
//! call; only failures to get a response at all are `InvokeError`s.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{Instrument, info_span};

use crate::config::ConfigError;
use crate::domain::{InvokeError, InvokeResponse};
use crate::ports::{FunctionInvoker, InvokeRequest};

/// Request header selecting synchronous or event invocation.
pub const INVOCATION_TYPE_HEADER: &str = "X-Amz-Invocation-Type";

/// Response header set when the function itself failed.
pub const FUNCTION_ERROR_HEADER: &str = "X-Amz-Function-Error";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpInvokerConfig {
    /// Base URL of the function service, e.g. `http://localhost:9001`.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpInvokerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9001".to_string(),
            timeout_secs: 30,
            user_agent: concat!("sluice/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpInvokerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::invalid(
                "invoker.base_url",
                format!("expected an http(s) URL, got '{}'", self.base_url),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::invalid("invoker.timeout_secs", "must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct HttpInvoker {
    client: reqwest::Client,
    config: HttpInvokerConfig,
}

impl HttpInvoker {
    /// # Errors
    ///
    /// Returns `InvokeError::Configuration` if the config is invalid or the
    /// HTTP client cannot be built.
    pub fn new(config: HttpInvokerConfig) -> Result<Self, InvokeError> {
        config
            .validate()
            .map_err(|e| InvokeError::Configuration(e.to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| InvokeError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    fn invocation_url(&self, function: &str) -> String {
        format!(
            "{}/2015-03-31/functions/{}/invocations",
            self.config.base_url.trim_end_matches('/'),
            function
        )
    }
}

#[async_trait]
impl FunctionInvoker for HttpInvoker {
    async fn invoke(&self, request: InvokeRequest) -> Result<InvokeResponse, InvokeError> {
        let start = Instant::now();
        let url = self.invocation_url(request.function.as_str());

        let span = info_span!(
            "function_invoke",
            function = %request.function,
            mode = request.mode.as_str(),
        );

        async move {
            tracing::debug!(url = %url, "sending invocation");

            let response = self
                .client
                .post(&url)
                .header(INVOCATION_TYPE_HEADER, request.mode.as_str())
                .body(request.payload)
                .send()
                .await
                .map_err(|e| {
                    tracing::warn!(duration_ms = start.elapsed().as_millis() as u64, "request failed: {e}");
                    if e.is_timeout() {
                        InvokeError::Timeout {
                            timeout_secs: self.config.timeout_secs,
                        }
                    } else if e.is_connect() {
                        InvokeError::Transport(format!("connection failed: {e}"))
                    } else {
                        InvokeError::Transport(e.to_string())
                    }
                })?;

            let status_code = response.status().as_u16();
            let function_error = response
                .headers()
                .get(FUNCTION_ERROR_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);

            let payload = response
                .bytes()
                .await
                .map_err(|e| InvokeError::Transport(format!("failed to read response body: {e}")))?
                .to_vec();

            tracing::debug!(
                status = status_code,
                function_error = function_error.as_deref(),
                duration_ms = start.elapsed().as_millis() as u64,
                "received response"
            );

            Ok(InvokeResponse {
                status_code,
                function_error,
                payload,
            })
        }
        .instrument(span)
        .await
    }
}
