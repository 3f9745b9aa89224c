//! Request and response interceptors.

use std::future::Future;

use async_trait::async_trait;
use http::header::AUTHORIZATION;
use http::{HeaderMap, HeaderName, HeaderValue};

use crate::config::{RequestConfig, RequestPatch};
use crate::response::Response;
use crate::Error;

/// Runs before dispatch, in registration order.
///
/// Receives the request path as given by the caller and the configuration
/// accumulated so far. A returned patch is laid over that configuration
/// before the next interceptor runs.
#[async_trait]
pub trait RequestInterceptor: Send + Sync {
    async fn intercept(&self, url: &str, config: &RequestConfig) -> Option<RequestPatch>;
}

/// Observes every successful response, in registration order, before the
/// body is decoded and returned.
#[async_trait]
pub trait ResponseInterceptor: Send + Sync {
    async fn on_response(&self, response: &Response);
}

/// Adapts an async closure into a [`RequestInterceptor`].
///
/// The closure gets owned copies of the path and configuration.
pub struct RequestInterceptorFn<F>(pub F);

#[async_trait]
impl<F, Fut> RequestInterceptor for RequestInterceptorFn<F>
where
    F: Fn(String, RequestConfig) -> Fut + Send + Sync,
    Fut: Future<Output = Option<RequestPatch>> + Send,
{
    async fn intercept(&self, url: &str, config: &RequestConfig) -> Option<RequestPatch> {
        (self.0)(url.to_string(), config.clone()).await
    }
}

/// Adapts an async closure into a [`ResponseInterceptor`].
pub struct ResponseInterceptorFn<F>(pub F);

#[async_trait]
impl<F, Fut> ResponseInterceptor for ResponseInterceptorFn<F>
where
    F: Fn(Response) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send,
{
    async fn on_response(&self, response: &Response) {
        (self.0)(response.clone()).await
    }
}

/// Adds a fixed set of headers to every request.
#[derive(Debug, Clone)]
pub struct HeaderInterceptor {
    headers: HeaderMap,
}

impl HeaderInterceptor {
    pub fn new(headers: HeaderMap) -> Self {
        Self { headers }
    }

    /// Builds the header set from name/value strings.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| Error::InvalidHeader(format!("bad header name {:?}", name)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| Error::InvalidHeader(format!("bad value for header {}", name)))?;
            headers.append(name, value);
        }
        Ok(Self { headers })
    }
}

#[async_trait]
impl RequestInterceptor for HeaderInterceptor {
    async fn intercept(&self, _url: &str, _config: &RequestConfig) -> Option<RequestPatch> {
        if self.headers.is_empty() {
            return None;
        }
        Some(RequestPatch::new().headers(self.headers.clone()))
    }
}

/// Sets `Authorization: Bearer <token>` on every request.
#[derive(Debug, Clone)]
pub struct BearerAuth {
    value: HeaderValue,
}

impl BearerAuth {
    pub fn new(token: &str) -> Result<Self, Error> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| Error::InvalidHeader("bearer token is not a valid header value".to_string()))?;
        value.set_sensitive(true);
        Ok(Self { value })
    }
}

#[async_trait]
impl RequestInterceptor for BearerAuth {
    async fn intercept(&self, _url: &str, _config: &RequestConfig) -> Option<RequestPatch> {
        Some(RequestPatch::new().header(AUTHORIZATION, self.value.clone()))
    }
}

/// Logs status and URL of each successful response.
#[derive(Debug, Clone, Default)]
pub struct TracingInterceptor {
    log_headers: bool,
}

impl TracingInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also log every response header at trace level.
    pub fn with_headers(mut self) -> Self {
        self.log_headers = true;
        self
    }
}

#[async_trait]
impl ResponseInterceptor for TracingInterceptor {
    async fn on_response(&self, response: &Response) {
        tracing::debug!(
            status = %response.status(),
            url = %response.url(),
            bytes = response.bytes().len(),
            "Received HTTP response"
        );

        if self.log_headers {
            for (name, value) in response.headers() {
                tracing::trace!(header = %name, value = ?value, "Response header");
            }
        }
    }
}
