//! The fetcher client: base-URL composition, the interceptor chains and the
//! request pipeline.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{
    body::{encode_payload, Payload, RequestBody},
    config::{ClientConfig, RequestConfig, RequestOptions, RequestPatch, ResponseType},
    interceptor::{
        RequestInterceptor, RequestInterceptorFn, ResponseInterceptor, ResponseInterceptorFn,
    },
    response::{Response, ResponseBody},
    Error, FetcherError,
};

/// HTTP client that joins paths onto a base URL, runs request and response
/// interceptors, encodes payloads and decodes bodies by declared type.
///
/// Cloning is cheap; clones share the transport and the interceptors
/// registered so far, but later registrations are per clone.
#[derive(Clone)]
pub struct Client {
    /// Never ends in `/`.
    base_url: String,
    http: reqwest::Client,
    default_headers: HeaderMap,
    request_interceptors: Vec<Arc<dyn RequestInterceptor>>,
    response_interceptors: Vec<Arc<dyn ResponseInterceptor>>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("default_headers", &self.default_headers)
            .field("request_interceptors", &self.request_interceptors.len())
            .field("response_interceptors", &self.response_interceptors.len())
            .finish()
    }
}

impl Default for Client {
    /// A client with no base URL, no timeout and no interceptors.
    ///
    /// If the configured transport cannot be built, falls back to
    /// `reqwest::Client::new()`, which panics on the same failure.
    fn default() -> Self {
        let config = ClientConfig::default();
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client, using reqwest defaults: {}", e);
                reqwest::Client::new()
            });
        Self {
            base_url: String::new(),
            http,
            default_headers: HeaderMap::new(),
            request_interceptors: Vec::new(),
            response_interceptors: Vec::new(),
        }
    }
}

impl Client {
    /// Creates a client, building a transport from `config`.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.as_str());
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|e| {
            tracing::error!("Failed to build HTTP client: {}", e);
            Error::Network(e)
        })?;
        Self::with_http_client(config, http)
    }

    /// Creates a client for `base_url` with default settings.
    pub fn with_base_url(base_url: &str) -> Result<Self, Error> {
        Self::new(ClientConfig::builder().base_url(base_url).build())
    }

    /// Creates a client around an existing transport. Only `base_url` and
    /// `default_headers` are taken from `config`.
    pub fn with_http_client(config: ClientConfig, http: reqwest::Client) -> Result<Self, Error> {
        let mut base_url = config.base_url.unwrap_or_default();
        if base_url.ends_with('/') {
            base_url.pop();
        }

        let mut default_headers = HeaderMap::new();
        for (name, value) in &config.default_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| Error::InvalidHeader(format!("bad header name {:?}", name)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| Error::InvalidHeader(format!("bad value for header {}", name)))?;
            default_headers.append(name, value);
        }

        Ok(Self {
            base_url,
            http,
            default_headers,
            request_interceptors: Vec::new(),
            response_interceptors: Vec::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The absolute URL a request for `path` is sent to.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, format_url(path))
    }

    /// Appends a request interceptor. The same interceptor may be added
    /// more than once; it then runs once per registration.
    pub fn add_request_interceptor(&mut self, interceptor: impl RequestInterceptor + 'static) {
        self.request_interceptors.push(Arc::new(interceptor));
    }

    /// Appends an async closure as a request interceptor.
    pub fn add_request_interceptor_fn<F, Fut>(&mut self, interceptor: F)
    where
        F: Fn(String, RequestConfig) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<RequestPatch>> + Send + 'static,
    {
        self.add_request_interceptor(RequestInterceptorFn(interceptor));
    }

    /// Appends a response interceptor.
    pub fn add_response_interceptor(&mut self, interceptor: impl ResponseInterceptor + 'static) {
        self.response_interceptors.push(Arc::new(interceptor));
    }

    /// Appends an async closure as a response interceptor.
    pub fn add_response_interceptor_fn<F, Fut>(&mut self, interceptor: F)
    where
        F: Fn(Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.add_response_interceptor(ResponseInterceptorFn(interceptor));
    }

    pub fn clear_request_interceptors(&mut self) {
        self.request_interceptors.clear();
    }

    pub fn clear_response_interceptors(&mut self) {
        self.response_interceptors.clear();
    }

    pub fn request_interceptor_count(&self) -> usize {
        self.request_interceptors.len()
    }

    pub fn response_interceptor_count(&self) -> usize {
        self.response_interceptors.len()
    }

    /// Sends a GET request and decodes the body into `T`.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        options: Option<RequestOptions>,
    ) -> Result<Option<T>, Error> {
        self.request_as(path, Method::GET, None, options).await
    }

    /// Sends a DELETE request and decodes the body into `T`.
    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        options: Option<RequestOptions>,
    ) -> Result<Option<T>, Error> {
        self.request_as(path, Method::DELETE, None, options).await
    }

    /// Sends a POST request carrying `data`.
    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        data: impl Into<Payload>,
        options: Option<RequestOptions>,
    ) -> Result<Option<T>, Error> {
        self.request_as(path, Method::POST, Some(data.into()), options)
            .await
    }

    /// Sends a PUT request carrying `data`.
    pub async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        data: impl Into<Payload>,
        options: Option<RequestOptions>,
    ) -> Result<Option<T>, Error> {
        self.request_as(path, Method::PUT, Some(data.into()), options)
            .await
    }

    /// Sends a PATCH request carrying `data`.
    pub async fn patch<T: DeserializeOwned>(
        &self,
        path: &str,
        data: impl Into<Payload>,
        options: Option<RequestOptions>,
    ) -> Result<Option<T>, Error> {
        self.request_as(path, Method::PATCH, Some(data.into()), options)
            .await
    }

    /// Serializes `data` as JSON and sends it with POST.
    pub async fn post_json<T: DeserializeOwned, D: Serialize + ?Sized>(
        &self,
        path: &str,
        data: &D,
        options: Option<RequestOptions>,
    ) -> Result<Option<T>, Error> {
        self.post(path, Payload::json(data)?, options).await
    }

    /// Serializes `data` as JSON and sends it with PUT.
    pub async fn put_json<T: DeserializeOwned, D: Serialize + ?Sized>(
        &self,
        path: &str,
        data: &D,
        options: Option<RequestOptions>,
    ) -> Result<Option<T>, Error> {
        self.put(path, Payload::json(data)?, options).await
    }

    /// Serializes `data` as JSON and sends it with PATCH.
    pub async fn patch_json<T: DeserializeOwned, D: Serialize + ?Sized>(
        &self,
        path: &str,
        data: &D,
        options: Option<RequestOptions>,
    ) -> Result<Option<T>, Error> {
        self.patch(path, Payload::json(data)?, options).await
    }

    /// Runs the full request pipeline and returns the decoded body, tagged
    /// by the declared response type. An empty body yields `None`.
    pub async fn request(
        &self,
        path: &str,
        method: Method,
        data: Option<Payload>,
        options: Option<RequestOptions>,
    ) -> Result<Option<ResponseBody>, Error> {
        let (response, response_type) = self.fetch(path, method, data, options).await?;
        decode(&response, response_type)
    }

    async fn request_as<T: DeserializeOwned>(
        &self,
        path: &str,
        method: Method,
        data: Option<Payload>,
        options: Option<RequestOptions>,
    ) -> Result<Option<T>, Error> {
        let (response, response_type) = self.fetch(path, method, data, options).await?;
        match decode(&response, response_type)? {
            Some(body) => body
                .deserialize()
                .map(Some)
                .map_err(|_| {
                    conversion_error(&response, response_type, std::any::type_name::<T>()).into()
                }),
            None => Ok(None),
        }
    }

    /// Merges configuration, runs request interceptors, dispatches, then
    /// classifies the response and runs response interceptors on success.
    async fn fetch(
        &self,
        path: &str,
        method: Method,
        data: Option<Payload>,
        options: Option<RequestOptions>,
    ) -> Result<(Response, ResponseType), Error> {
        let options = options.unwrap_or_default();
        let response_type = options.response_type.unwrap_or_default();

        let mut config = self.default_config().apply(&options.transport);
        config.method = method;

        for interceptor in &self.request_interceptors {
            if let Some(patch) = interceptor.intercept(path, &config).await {
                config = config.apply(&patch);
            }
        }

        if let Some(payload) = data {
            config = encode_payload(payload, config);
        }

        let url = self.url_for(path);
        tracing::debug!(method = %config.method, url = %url, "Sending HTTP request");
        let response = self.dispatch(&url, config).await?;

        if !response.is_success() {
            return Err(create_error(&response).into());
        }

        for interceptor in &self.response_interceptors {
            interceptor.on_response(&response).await;
        }

        Ok((response, response_type))
    }

    fn default_config(&self) -> RequestConfig {
        RequestConfig {
            headers: self.default_headers.clone(),
            ..Default::default()
        }
    }

    async fn dispatch(&self, url: &str, config: RequestConfig) -> Result<Response, Error> {
        let mut builder = self
            .http
            .request(config.method, url)
            .headers(config.headers);
        if !config.query.is_empty() {
            builder = builder.query(&config.query);
        }
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        builder = match config.body {
            Some(RequestBody::Text(text)) => builder.body(text),
            Some(RequestBody::Bytes(bytes)) => builder.body(bytes),
            Some(RequestBody::Form(form)) => builder.multipart(form.into_multipart()?),
            None => builder,
        };

        let response = builder.send().await.map_err(|e| {
            tracing::error!("Failed to send request to {}: {}", url, e);
            Error::Network(e)
        })?;
        let response = Response::from_reqwest(response).await.map_err(|e| {
            tracing::error!("Failed to read response body: {}", e);
            Error::Network(e)
        })?;
        tracing::debug!(status = %response.status(), "Received HTTP response");
        Ok(response)
    }
}

/// Drops exactly one leading `/` from a request path.
pub fn format_url(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

fn decode(response: &Response, response_type: ResponseType) -> Result<Option<ResponseBody>, Error> {
    response
        .decode(response_type)
        .map_err(|_| decode_error(response, response_type).into())
}

fn create_error(response: &Response) -> FetcherError {
    let status = response.status();
    let message = status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
    let data = if response.is_json() {
        serde_json::from_slice(response.bytes()).ok()
    } else {
        None
    };

    tracing::error!(
        "Request failed with status {}: {}",
        status,
        truncate_body(response.bytes())
    );
    FetcherError::new(message, status, response.headers().clone(), data)
}

fn decode_error(response: &Response, response_type: ResponseType) -> FetcherError {
    let message = format!(
        "Failed to parse response as {}: content-type {}",
        response_type,
        content_type_label(response)
    );
    tracing::error!("{} | body: {}", message, truncate_body(response.bytes()));
    FetcherError::new(
        message,
        response.status(),
        response.headers().clone(),
        None,
    )
}

/// The body decoded as `response_type` but does not fit the caller's type.
fn conversion_error(
    response: &Response,
    response_type: ResponseType,
    target: &str,
) -> FetcherError {
    let message = format!(
        "Failed to convert {} response into {}: content-type {}",
        response_type,
        target,
        content_type_label(response)
    );
    tracing::error!("{} | body: {}", message, truncate_body(response.bytes()));
    FetcherError::new(
        message,
        response.status(),
        response.headers().clone(),
        None,
    )
}

fn content_type_label(response: &Response) -> String {
    response
        .content_type_lossy()
        .unwrap_or_else(|| "<none>".to_string())
}

fn truncate_body(body: &[u8]) -> String {
    const MAX: usize = 2000;
    if body.len() <= MAX {
        String::from_utf8_lossy(body).into_owned()
    } else {
        format!("{}...[truncated]", String::from_utf8_lossy(&body[..MAX]))
    }
}
