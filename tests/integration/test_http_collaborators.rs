use formrelay::core::config::{DeliverySettings, ExtractionSettings};
use formrelay::core::dispatch::{DeliveryClient, DeliveryError, ReqwestDeliveryClient};
use formrelay::core::extraction::{ExtractionError, Extractor, OpenAiExtractor};
use formrelay::core::Payload;
use indexmap::IndexMap;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn payload() -> Payload {
    let mut payload = Payload::new();
    payload.insert("customerID", json!("CUST789"));
    payload.insert("consentGiven", json!("true"));
    payload
}

fn delivery_client(timeout_ms: u64) -> ReqwestDeliveryClient {
    ReqwestDeliveryClient::new(&DeliverySettings {
        timeout_ms,
        ..DeliverySettings::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_delivery_posts_json_with_endpoint_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/consent/manage"))
        .and(header("content-type", "application/json"))
        .and(header("x-customer", "CUST789"))
        .and(body_json(json!({"customerID": "CUST789", "consentGiven": "true"})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let mut headers = IndexMap::new();
    headers.insert("X-Customer".to_string(), "CUST789".to_string());
    let response = delivery_client(5_000)
        .post(&format!("{}/consent/manage", server.uri()), &payload(), &headers)
        .await
        .unwrap();

    assert_eq!(response.status, 201);
    assert_eq!(response.status_text, "Created");
}

#[tokio::test]
async fn test_delivery_keeps_single_json_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/profile"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mut headers = IndexMap::new();
    headers.insert("Content-Type".to_string(), "text/plain".to_string());
    headers.insert("X-Customer".to_string(), "CUST789".to_string());
    delivery_client(5_000)
        .post(&format!("{}/profile", server.uri()), &payload(), &headers)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let content_types: Vec<&str> = requests[0]
        .headers
        .get_all("content-type")
        .iter()
        .map(|value| value.to_str().unwrap())
        .collect();
    assert_eq!(content_types, vec!["application/json"]);
    assert_eq!(
        requests[0].headers.get("x-customer").map(|value| value.to_str().unwrap()),
        Some("CUST789")
    );
}

#[tokio::test]
async fn test_delivery_treats_error_status_as_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/audit/log"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let response = delivery_client(5_000)
        .post(&format!("{}/audit/log", server.uri()), &payload(), &IndexMap::new())
        .await
        .unwrap();
    assert_eq!(response.status, 500);
}

#[tokio::test]
async fn test_delivery_connection_refused_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let err = delivery_client(2_000)
        .post(&format!("http://127.0.0.1:{}/hook", port), &payload(), &IndexMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DeliveryError::Transport { .. }));
    assert_eq!(err.code(), "FR-DELIVERY-001");
}

#[tokio::test]
async fn test_delivery_timeout_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let err = delivery_client(50)
        .post(&format!("{}/slow", server.uri()), &payload(), &IndexMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DeliveryError::Timeout { timeout_ms: 50, .. }));
    assert_eq!(err.code(), "FR-DELIVERY-002");
}

fn extractor(server: &MockServer) -> OpenAiExtractor {
    let settings = ExtractionSettings {
        enabled: true,
        base_url: format!("{}/v1", server.uri()),
        ..ExtractionSettings::default()
    };
    OpenAiExtractor::new(&settings, "sk-test".to_string()).unwrap()
}

#[tokio::test]
async fn test_extractor_returns_trimmed_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({"model": "gpt-3.5-turbo"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "  Alice Johnson\n"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let value = extractor(&server)
        .extract("personalName", &json!("alice   JOHNSON"))
        .await
        .unwrap();
    assert_eq!(value, json!("Alice Johnson"));
}

#[tokio::test]
async fn test_extractor_rejected_request_is_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let err = extractor(&server)
        .extract("personalName", &json!("alice"))
        .await
        .unwrap_err();
    match &err {
        ExtractionError::Status { status, body } => {
            assert_eq!(*status, 401);
            assert_eq!(body, "invalid api key");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(err.code(), "FR-EXTRACT-003");
}

#[tokio::test]
async fn test_extractor_without_choices_is_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let err = extractor(&server)
        .extract("personalName", &json!("alice"))
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractionError::EmptyResponse));
}
