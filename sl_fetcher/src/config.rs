//! Client and per-request configuration.
//!
//! Request configuration is accumulated by value: every override (per-call
//! options, then each request interceptor) is a [`RequestPatch`] applied
//! with [`RequestConfig::apply`], which returns a new [`RequestConfig`].

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::{Deserialize, Serialize};

use crate::body::RequestBody;

/// Declared shape of a response body, selecting the decode routine.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResponseType {
    #[default]
    Json,
    Text,
    ArrayBuffer,
    Blob,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Text => "text",
            Self::ArrayBuffer => "arrayBuffer",
            Self::Blob => "blob",
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "text" => Ok(Self::Text),
            "arrayBuffer" | "array-buffer" => Ok(Self::ArrayBuffer),
            "blob" => Ok(Self::Blob),
            _ => Err(format!("Unknown response type: {}", s)),
        }
    }
}

/// Transport configuration of a single in-flight request.
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<RequestBody>,
    pub timeout: Option<Duration>,
    /// Query pairs appended to the request URL.
    pub query: Vec<(String, String)>,
}

impl RequestConfig {
    /// Returns a new configuration with every field present in `patch`
    /// laid over this one.
    ///
    /// Headers overlay per name: a name in the patch replaces all values of
    /// that name, other names are kept. The patch query, when present,
    /// replaces the query as a whole.
    pub fn apply(&self, patch: &RequestPatch) -> RequestConfig {
        let mut next = self.clone();
        if let Some(headers) = &patch.headers {
            for name in headers.keys() {
                next.headers.remove(name);
                for value in headers.get_all(name) {
                    next.headers.append(name.clone(), value.clone());
                }
            }
        }
        if let Some(body) = &patch.body {
            next.body = Some(body.clone());
        }
        if let Some(timeout) = patch.timeout {
            next.timeout = Some(timeout);
        }
        if let Some(query) = &patch.query {
            next.query = query.clone();
        }
        next
    }
}

/// A partial [`RequestConfig`]. Absent fields leave the target untouched.
///
/// The method is not patchable; it is fixed by the verb being called.
#[derive(Debug, Clone, Default)]
pub struct RequestPatch {
    pub headers: Option<HeaderMap>,
    pub body: Option<RequestBody>,
    pub timeout: Option<Duration>,
    pub query: Option<Vec<(String, String)>>,
}

impl RequestPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a header, keeping any headers already in the patch.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers
            .get_or_insert_with(HeaderMap::new)
            .insert(name, value);
        self
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Appends a query pair.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query
            .get_or_insert_with(Vec::new)
            .push((key.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_none() && self.body.is_none() && self.timeout.is_none() && self.query.is_none()
    }
}

/// Per-call options: the expected response type plus transport overrides.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub response_type: Option<ResponseType>,
    pub transport: RequestPatch,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = Some(response_type);
        self
    }

    pub fn transport(mut self, transport: RequestPatch) -> Self {
        self.transport = transport;
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.transport = self.transport.header(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.transport = self.transport.body(body);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.transport = self.transport.timeout(timeout);
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.transport = self.transport.query(key, value);
        self
    }
}

/// Construction options for a [`Client`](crate::Client).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Prefix for every request path. One trailing slash is dropped.
    pub base_url: Option<String>,
    /// Timeout for whole requests, applied to the transport client.
    pub timeout: Option<Duration>,
    pub user_agent: String,
    /// Headers sent with every request.
    pub default_headers: Vec<(String, String)>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: None,
            user_agent: format!("sl-fetcher/{}", env!("CARGO_PKG_VERSION")),
            default_headers: Vec::new(),
        }
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.push((name.into(), value.into()));
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}
