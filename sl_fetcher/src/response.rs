//! Buffered responses and body decoding.

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, StatusCode};
use serde::de::value::{Error as ValueError, SeqDeserializer, StrDeserializer};
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::ResponseType;

/// A response whose body has been read into memory.
///
/// This is what response interceptors observe.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    url: Url,
    body: Bytes,
}

impl Response {
    pub fn new(status: StatusCode, headers: HeaderMap, url: Url, body: Bytes) -> Self {
        Self {
            status,
            headers,
            url,
            body,
        }
    }

    pub(crate) async fn from_reqwest(response: reqwest::Response) -> Result<Self, reqwest::Error> {
        let status = response.status();
        let headers = response.headers().clone();
        let url = response.url().clone();
        let body = response.bytes().await?;
        Ok(Self::new(status, headers, url, body))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A header value, if present and visible ASCII.
    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        self.headers
            .get(name.as_ref())
            .and_then(|v| v.to_str().ok())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header(CONTENT_TYPE.as_str())
    }

    /// The raw content-type header for display, even when it is not visible
    /// ASCII.
    pub(crate) fn content_type_lossy(&self) -> Option<String> {
        self.headers
            .get(CONTENT_TYPE)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    /// Whether the declared content type is JSON (`application/json` or a
    /// `+json` suffix type).
    pub fn is_json(&self) -> bool {
        self.content_type().is_some_and(is_json_content_type)
    }

    /// Decodes the body according to `response_type`.
    ///
    /// An empty body decodes to `None` whatever the declared type. Text never
    /// fails: invalid UTF-8 is replaced with U+FFFD.
    pub fn decode(&self, response_type: ResponseType) -> Result<Option<ResponseBody>, DecodeError> {
        if self.body.is_empty() {
            return Ok(None);
        }
        let body = match response_type {
            ResponseType::Blob => ResponseBody::Blob(Blob {
                bytes: self.body.clone(),
                mime: self.content_type().and_then(|ct| ct.parse().ok()),
            }),
            ResponseType::ArrayBuffer => ResponseBody::ArrayBuffer(self.body.clone()),
            ResponseType::Text => {
                ResponseBody::Text(String::from_utf8_lossy(&self.body).into_owned())
            }
            ResponseType::Json => {
                ResponseBody::Json(serde_json::from_slice(&self.body).map_err(|_| DecodeError)?)
            }
        };
        Ok(Some(body))
    }
}

/// The body did not match the declared response type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeError;

/// Raw bytes together with the MIME type the server declared.
#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    pub bytes: Bytes,
    pub mime: Option<mime::Mime>,
}

impl Blob {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// A decoded response body, tagged by the response type that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(serde_json::Value),
    Text(String),
    ArrayBuffer(Bytes),
    Blob(Blob),
}

impl ResponseBody {
    pub fn response_type(&self) -> ResponseType {
        match self {
            Self::Json(_) => ResponseType::Json,
            Self::Text(_) => ResponseType::Text,
            Self::ArrayBuffer(_) => ResponseType::ArrayBuffer,
            Self::Blob(_) => ResponseType::Blob,
        }
    }

    /// Converts the body into `T`.
    ///
    /// JSON goes through serde_json, text through a string deserializer and
    /// binary bodies through a byte sequence, so `String` and `Vec<u8>` are
    /// valid targets for text and binary bodies.
    pub fn deserialize<T: DeserializeOwned>(self) -> Result<T, DecodeError> {
        match self {
            Self::Json(value) => serde_json::from_value(value).map_err(|_| DecodeError),
            Self::Text(text) => {
                T::deserialize(StrDeserializer::<ValueError>::new(&text)).map_err(|_| DecodeError)
            }
            Self::ArrayBuffer(bytes) | Self::Blob(Blob { bytes, .. }) => {
                T::deserialize(SeqDeserializer::<_, ValueError>::new(bytes.iter().copied()))
                    .map_err(|_| DecodeError)
            }
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Binary contents of an `ArrayBuffer` or `Blob` body.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::ArrayBuffer(bytes) | Self::Blob(Blob { bytes, .. }) => Some(bytes),
            _ => None,
        }
    }
}

pub(crate) fn is_json_content_type(content_type: &str) -> bool {
    content_type
        .to_ascii_lowercase()
        .parse::<mime::Mime>()
        .map(|m| {
            m.type_() == mime::APPLICATION
                && (m.subtype() == mime::JSON || m.suffix() == Some(mime::JSON))
        })
        .unwrap_or(false)
}
