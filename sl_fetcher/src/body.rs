//! Request bodies and the payload encoding policy.

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::HeaderValue;
use serde::Serialize;

use crate::config::RequestConfig;

/// Content type set on JSON-encoded payloads.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// A transport body, as carried by [`RequestConfig`].
#[derive(Debug, Clone)]
pub enum RequestBody {
    Text(String),
    Bytes(Bytes),
    /// Sent as `multipart/form-data`; the transport sets the boundary.
    Form(FormData),
}

impl From<String> for RequestBody {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for RequestBody {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Bytes> for RequestBody {
    fn from(value: Bytes) -> Self {
        Self::Bytes(value)
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(value))
    }
}

impl From<FormData> for RequestBody {
    fn from(value: FormData) -> Self {
        Self::Form(value)
    }
}

/// Data handed to a body-carrying verb (`post`, `put`, `patch`).
#[derive(Debug, Clone)]
pub enum Payload {
    /// Serialized as JSON text.
    Json(serde_json::Value),
    /// Passed through as a multipart form.
    Form(FormData),
}

impl Payload {
    /// Builds a JSON payload from any serializable value.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::Json(serde_json::to_value(value)?))
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

impl From<FormData> for Payload {
    fn from(value: FormData) -> Self {
        Self::Form(value)
    }
}

/// One part of a multipart form.
#[derive(Debug, Clone, PartialEq)]
pub enum FormPart {
    Text(String),
    File {
        bytes: Bytes,
        file_name: Option<String>,
        mime: Option<mime::Mime>,
    },
}

/// An ordered multipart form. Names may repeat.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormData {
    parts: Vec<(String, FormPart)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a text field.
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push((name.into(), FormPart::Text(value.into())));
        self
    }

    /// Appends a file part.
    pub fn file(
        mut self,
        name: impl Into<String>,
        bytes: impl Into<Bytes>,
        file_name: Option<String>,
        mime: Option<mime::Mime>,
    ) -> Self {
        self.parts.push((
            name.into(),
            FormPart::File {
                bytes: bytes.into(),
                file_name,
                mime,
            },
        ));
        self
    }

    pub fn has(&self, name: &str) -> bool {
        self.parts.iter().any(|(n, _)| n == name)
    }

    /// First part with the given name.
    pub fn get(&self, name: &str) -> Option<&FormPart> {
        self.parts.iter().find(|(n, _)| n == name).map(|(_, p)| p)
    }

    pub fn parts(&self) -> &[(String, FormPart)] {
        &self.parts
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub(crate) fn into_multipart(self) -> Result<reqwest::multipart::Form, reqwest::Error> {
        let mut form = reqwest::multipart::Form::new();
        for (name, part) in self.parts {
            form = match part {
                FormPart::Text(value) => form.text(name, value),
                FormPart::File {
                    bytes,
                    file_name,
                    mime,
                } => {
                    let mut part = reqwest::multipart::Part::bytes(bytes.to_vec());
                    if let Some(file_name) = file_name {
                        part = part.file_name(file_name);
                    }
                    if let Some(mime) = mime {
                        part = part.mime_str(mime.as_ref())?;
                    }
                    form.part(name, part)
                }
            };
        }
        Ok(form)
    }
}

/// Folds `payload` into `config`.
///
/// A body already present in `config` wins over the payload. Forms are
/// passed through untouched; JSON payloads are serialized and get a JSON
/// content type unless one is already configured.
pub(crate) fn encode_payload(payload: Payload, config: RequestConfig) -> RequestConfig {
    let mut config = config;
    match payload {
        Payload::Form(form) => {
            if config.body.is_none() {
                config.body = Some(RequestBody::Form(form));
            }
        }
        Payload::Json(value) => {
            if !config.headers.contains_key(CONTENT_TYPE) {
                config
                    .headers
                    .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
            }
            if config.body.is_none() {
                config.body = Some(RequestBody::Text(value.to_string()));
            }
        }
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_payload_sets_body_and_content_type() {
        let config = encode_payload(json!({ "userId": 1 }).into(), RequestConfig::default());
        assert_eq!(config.headers.get(CONTENT_TYPE).unwrap(), JSON_CONTENT_TYPE);
        match config.body {
            Some(RequestBody::Text(text)) => assert_eq!(text, r#"{"userId":1}"#),
            other => panic!("unexpected body: {:?}", other),
        }
    }

    #[test]
    fn caller_content_type_wins() {
        let mut config = RequestConfig::default();
        config
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/vnd.api+json"));
        let config = encode_payload(json!([1, 2]).into(), config);
        assert_eq!(
            config.headers.get(CONTENT_TYPE).unwrap(),
            "application/vnd.api+json"
        );
    }

    #[test]
    fn explicit_body_is_not_replaced() {
        let config = RequestConfig {
            body: Some(RequestBody::from("preset")),
            ..Default::default()
        };
        let config = encode_payload(json!({ "ignored": true }).into(), config);
        assert!(matches!(config.body, Some(RequestBody::Text(ref s)) if s == "preset"));
        assert_eq!(config.headers.get(CONTENT_TYPE).unwrap(), JSON_CONTENT_TYPE);
    }

    #[test]
    fn form_passes_through_without_content_type() {
        let form = FormData::new().text("test", "123");
        let config = encode_payload(form.clone().into(), RequestConfig::default());
        assert!(config.headers.get(CONTENT_TYPE).is_none());
        match config.body {
            Some(RequestBody::Form(sent)) => assert_eq!(sent, form),
            other => panic!("unexpected body: {:?}", other),
        }
    }

    #[test]
    fn payload_json_from_serialize() {
        #[derive(Serialize)]
        struct Post {
            user_id: u32,
        }
        let payload = Payload::json(&Post { user_id: 7 }).unwrap();
        assert!(matches!(payload, Payload::Json(ref v) if v["user_id"] == 7));
    }

    #[test]
    fn form_lookup() {
        let form = FormData::new()
            .text("a", "1")
            .file("upload", b"abc".to_vec(), Some("a.txt".to_string()), Some(mime::TEXT_PLAIN))
            .text("a", "2");
        assert!(form.has("a"));
        assert!(form.has("upload"));
        assert!(!form.has("b"));
        assert_eq!(form.len(), 3);
        assert_eq!(form.get("a"), Some(&FormPart::Text("1".to_string())));
    }

    #[test]
    fn form_converts_to_multipart() {
        let form = FormData::new()
            .text("a", "1")
            .file("upload", Bytes::from_static(b"abc"), None, Some(mime::APPLICATION_OCTET_STREAM));
        assert!(form.into_multipart().is_ok());
    }
}
