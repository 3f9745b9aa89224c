use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use sl_fetcher::{
    is_fetcher_error, Client, Error, FormData, Method, RequestOptions, ResponseBody,
    ResponseType, StatusCode,
};
use wiremock::matchers::{
    body_json, body_string_contains, header, header_regex, method, path, query_param,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn load_fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{}", name)).unwrap()
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct Post {
    user_id: u32,
    id: u32,
    title: String,
    body: String,
}

fn client_for(server: &MockServer) -> Client {
    Client::with_base_url(&format!("{}/", server.uri())).unwrap()
}

#[tokio::test]
async fn get_success_with_data() {
    let mock_server = MockServer::start().await;
    let body = load_fixture("post.json");

    Mock::given(method("GET"))
        .and(path("/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_string(&body))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let post: Option<Value> = client.get("posts", None).await.unwrap();
    let expected: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(post, Some(expected));
}

#[tokio::test]
async fn get_success_typed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/posts/1"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(load_fixture("post.json"), "application/json"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let post: Post = client.get("/posts/1", None).await.unwrap().unwrap();
    assert_eq!(post.user_id, 1);
    assert_eq!(post.id, 1);
    assert!(post.title.starts_with("sunt aut facere"));
}

#[tokio::test]
async fn get_success_without_data() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/empty"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let data: Option<Value> = client.get("empty", None).await.unwrap();
    assert!(data.is_none());
}

#[tokio::test]
async fn get_with_leading_slash() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "userId": 1 })))
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let with_slash: Option<Value> = client.get("/posts", None).await.unwrap();
    let without_slash: Option<Value> = client.get("posts", None).await.unwrap();
    assert_eq!(with_slash, Some(json!({ "userId": 1 })));
    assert_eq!(with_slash, without_slash);
}

#[tokio::test]
async fn get_error_without_data() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/error-empty"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let err = client.get::<Value>("error-empty", None).await.unwrap_err();
    assert!(is_fetcher_error(&err));

    let err = err.as_fetcher_error().unwrap();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert_eq!(err.message(), "Bad Request");
    assert!(err.data().is_none());
}

#[tokio::test]
async fn get_error_with_data() {
    let mock_server = MockServer::start().await;
    let body = load_fixture("error.json");

    Mock::given(method("GET"))
        .and(path("/error"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_raw(body.clone(), "application/json; charset=UTF-8"),
        )
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let err = client.get::<Value>("error", None).await.unwrap_err();
    let err = err.as_fetcher_error().unwrap();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert_eq!(err.message(), "Bad Request");
    assert_eq!(err.data(), Some(&serde_json::from_str::<Value>(&body).unwrap()));
    assert_eq!(
        err.headers().get("content-type").unwrap(),
        "application/json; charset=UTF-8"
    );
}

#[tokio::test]
async fn error_body_without_json_content_type_is_dropped() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/error-text"))
        .respond_with(ResponseTemplate::new(500).set_body_string(r#"{"message":"ERROR"}"#))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let err = client.get::<Value>("error-text", None).await.unwrap_err();
    let err = err.as_fetcher_error().unwrap();
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(err.message(), "Internal Server Error");
    assert!(err.data().is_none());
}

#[tokio::test]
async fn post_serializes_json_with_content_type() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/posts"))
        .and(header("content-type", "application/json; charset=UTF-8"))
        .and(body_json(json!({ "userId": 1 })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "userId": 1 })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let data: Option<Value> = client.post("posts", json!({ "userId": 1 }), None).await.unwrap();
    assert_eq!(data, Some(json!({ "userId": 1 })));
}

#[tokio::test]
async fn post_json_accepts_serializable_types() {
    #[derive(serde::Serialize)]
    #[serde(rename_all = "camelCase")]
    struct NewPost<'a> {
        user_id: u32,
        title: &'a str,
    }

    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/posts"))
        .and(body_json(json!({ "userId": 3, "title": "hello" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 101 })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let created: Option<Value> = client
        .post_json("posts", &NewPost { user_id: 3, title: "hello" }, None)
        .await
        .unwrap();
    assert_eq!(created, Some(json!({ "id": 101 })));
}

#[tokio::test]
async fn explicit_body_override_wins_over_payload() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/posts"))
        .and(body_string_contains("raw-body"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let options = RequestOptions::new().body("raw-body");
    let data: Option<Value> = client
        .put("posts", json!({ "ignored": true }), Some(options))
        .await
        .unwrap();
    assert!(data.is_none());
}

#[tokio::test]
async fn caller_content_type_wins_over_json_default() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/posts"))
        .and(header("content-type", "application/merge-patch+json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let options = RequestOptions::new().header(
        sl_fetcher::header::CONTENT_TYPE,
        sl_fetcher::HeaderValue::from_static("application/merge-patch+json"),
    );
    let data: Option<Value> = client
        .patch("posts", json!({ "title": "x" }), Some(options))
        .await
        .unwrap();
    assert_eq!(data, Some(json!({ "ok": true })));
}

#[tokio::test]
async fn every_verb_reports_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(path("/posts-error"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let payload = json!({ "userId": 1 });
    let results = vec![
        client.get::<Value>("posts-error", None).await,
        client.delete::<Value>("posts-error", None).await,
        client.post::<Value>("posts-error", payload.clone(), None).await,
        client.put::<Value>("posts-error", payload.clone(), None).await,
        client.patch::<Value>("posts-error", payload, None).await,
    ];

    for result in results {
        let err = result.unwrap_err();
        assert!(is_fetcher_error(&err));
        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
        assert_eq!(err.to_string(), "Bad Request");
    }
}

#[tokio::test]
async fn every_verb_succeeds() {
    let mock_server = MockServer::start().await;

    Mock::given(path("/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "userId": 1 })))
        .expect(5)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let payload = json!({ "userId": 1 });
    let expected = Some(json!({ "userId": 1 }));
    assert_eq!(client.get::<Value>("posts", None).await.unwrap(), expected);
    assert_eq!(client.delete::<Value>("posts", None).await.unwrap(), expected);
    assert_eq!(
        client.post::<Value>("posts", payload.clone(), None).await.unwrap(),
        expected
    );
    assert_eq!(
        client.put::<Value>("posts", payload.clone(), None).await.unwrap(),
        expected
    );
    assert_eq!(client.patch::<Value>("posts", payload, None).await.unwrap(), expected);
}

#[tokio::test]
async fn post_form_is_sent_as_multipart() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/form"))
        .and(header_regex("content-type", "^multipart/form-data; boundary="))
        .and(body_string_contains("name=\"test\""))
        .and(body_string_contains("123"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let form = FormData::new().text("test", "123");
    let data: Option<Value> = client.post("form", form, None).await.unwrap();
    assert!(data.is_none());
}

#[tokio::test]
async fn text_response_type() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/readme"))
        .respond_with(ResponseTemplate::new(200).set_body_string("# Hello"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let options = RequestOptions::new().response_type(ResponseType::Text);
    let text: Option<String> = client.get("readme", Some(options)).await.unwrap();
    assert_eq!(text.as_deref(), Some("# Hello"));
}

#[tokio::test]
async fn non_utf8_text_is_decoded_lossily() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/latin1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(b"caf\xe9".to_vec(), "text/plain; charset=iso-8859-1"),
        )
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let options = RequestOptions::new().response_type(ResponseType::Text);
    let body = client
        .request("latin1", Method::GET, None, Some(options))
        .await
        .unwrap();
    assert_eq!(body, Some(ResponseBody::Text("caf\u{FFFD}".to_string())));
}

#[tokio::test]
async fn binary_response_types() {
    let mock_server = MockServer::start().await;
    let png = vec![0x89, b'P', b'N', b'G'];

    Mock::given(method("GET"))
        .and(path("/image"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(png.clone(), "image/png"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);

    let options = RequestOptions::new().response_type(ResponseType::ArrayBuffer);
    let bytes: Option<Vec<u8>> = client.get("image", Some(options)).await.unwrap();
    assert_eq!(bytes, Some(png.clone()));

    let options = RequestOptions::new().response_type(ResponseType::Blob);
    let body = client
        .request("image", sl_fetcher::Method::GET, None, Some(options))
        .await
        .unwrap()
        .unwrap();
    match body {
        ResponseBody::Blob(blob) => {
            assert_eq!(blob.bytes.as_ref(), png.as_slice());
            assert_eq!(blob.mime.unwrap().essence_str(), "image/png");
        }
        other => panic!("unexpected body: {:?}", other),
    }
}

#[tokio::test]
async fn decode_mismatch_is_fetcher_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/html"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html></html>", "text/html"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let err = client.get::<Value>("html", None).await.unwrap_err();
    let err = err.as_fetcher_error().unwrap();
    assert_eq!(err.status(), StatusCode::OK);
    assert!(err.message().contains("json"));
    assert!(err.message().contains("text/html"));
    assert!(err.data().is_none());
}

#[tokio::test]
async fn typed_mismatch_is_fetcher_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "unexpected": true })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let err = client.get::<Post>("posts", None).await.unwrap_err();
    assert!(is_fetcher_error(&err));
    let message = err.to_string();
    assert!(message.starts_with("Failed to convert json response into"));
    assert!(message.contains("Post"));
    assert!(message.contains("application/json"));
}

#[tokio::test]
async fn query_pairs_are_appended() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/posts"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let options = RequestOptions::new().query("page", "2");
    let posts: Option<Vec<Value>> = client.get("posts", Some(options)).await.unwrap();
    assert_eq!(posts, Some(vec![]));
}

#[tokio::test]
async fn per_call_timeout_surfaces_as_network_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let options = RequestOptions::new().timeout(Duration::from_millis(50));
    let err = client.get::<Value>("slow", Some(options)).await.unwrap_err();
    assert!(!is_fetcher_error(&err));
    match err {
        Error::Network(e) => assert!(e.is_timeout()),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn connection_failure_is_not_a_fetcher_error() {
    let client = Client::with_base_url("http://127.0.0.1:1").unwrap();
    let err = client.get::<Value>("posts", None).await.unwrap_err();
    assert!(matches!(err, Error::Network(_)));
    assert!(!is_fetcher_error(&err));
}

#[tokio::test]
async fn default_headers_are_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("x-api-key", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "me" })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = sl_fetcher::ClientConfig::builder()
        .base_url(mock_server.uri())
        .default_header("x-api-key", "secret")
        .build();
    let client = Client::new(config).unwrap();
    let me: Option<Value> = client.get("me", None).await.unwrap();
    assert_eq!(me, Some(json!({ "name": "me" })));
}
