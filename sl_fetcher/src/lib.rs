//! A thin fetch layer over `reqwest`: base-URL composition, JSON / multipart
//! body encoding, response decoding by declared type, and request/response
//! interceptors.
//!
//! ```no_run
//! use sl_fetcher::{Client, RequestPatch};
//! use http::{header::AUTHORIZATION, HeaderValue};
//!
//! # async fn run() -> Result<(), sl_fetcher::Error> {
//! let mut client = Client::with_base_url("https://api.example.com/")?;
//! client.add_request_interceptor_fn(|_url, _config| async {
//!     Some(RequestPatch::new().header(AUTHORIZATION, HeaderValue::from_static("token")))
//! });
//!
//! let post: Option<serde_json::Value> = client.get("/posts/1", None).await?;
//! # Ok(())
//! # }
//! ```

mod body;
mod client;
mod config;
mod errors;
mod interceptor;
mod response;
pub use self::body::{FormData, FormPart, Payload, RequestBody, JSON_CONTENT_TYPE};
pub use self::client::{format_url, Client};
pub use self::config::{
    ClientConfig, ClientConfigBuilder, RequestConfig, RequestOptions, RequestPatch, ResponseType,
};
pub use self::errors::{is_fetcher_error, Error, FetcherError};
pub use self::interceptor::{
    BearerAuth, HeaderInterceptor, RequestInterceptor, RequestInterceptorFn, ResponseInterceptor,
    ResponseInterceptorFn, TracingInterceptor,
};
pub use self::response::{Blob, DecodeError, Response, ResponseBody};

pub use bytes::Bytes;
pub use http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
pub use mime;
