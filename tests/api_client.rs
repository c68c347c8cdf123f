use mcp_relay::api::{
    AnthropicClient, CompletionApi, ContentBlock, Message, MessagesRequest, ToolDescriptor,
};
use mcp_relay::error::RelayError;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn request(with_tools: bool) -> MessagesRequest {
    MessagesRequest {
        model: "claude-3-5-sonnet-20241022".to_string(),
        max_tokens: 2000,
        messages: vec![Message::user("What is the weather in Taos, NM?")],
        tools: with_tools.then(|| {
            vec![ToolDescriptor {
                name: "get_weather".to_string(),
                description: Some("Current weather".to_string()),
                input_schema: json!({"type": "object"}),
            }]
        }),
    }
}

fn client(server: &MockServer) -> AnthropicClient {
    AnthropicClient::with_endpoint("test_api_key", &format!("{}/v1/messages", server.uri()))
        .unwrap()
}

#[tokio::test]
async fn test_create_sends_headers_and_returns_blocks() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "test_api_key"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({
            "model": "claude-3-5-sonnet-20241022",
            "max_tokens": 2000,
            "messages": [{ "role": "user", "content": "What is the weather in Taos, NM?" }],
            "tools": [{ "name": "get_weather", "input_schema": { "type": "object" } }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_123",
            "type": "message",
            "role": "assistant",
            "content": [
                { "type": "tool_use", "id": "toolu_1", "name": "get_weather", "input": { "city": "Taos" } }
            ],
            "stop_reason": "tool_use",
            "usage": { "input_tokens": 12, "output_tokens": 15 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let blocks = client(&server).create(&request(true)).await.unwrap();

    assert_eq!(blocks.len(), 1);
    assert!(matches!(&blocks[0], ContentBlock::ToolUse { name, .. } if name == "get_weather"));
}

#[tokio::test]
async fn test_request_without_tools_omits_the_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{ "type": "text", "text": "It is 68F and clear in Taos." }]
        })))
        .mount(&server)
        .await;

    let blocks = client(&server).create(&request(false)).await.unwrap();
    assert_eq!(blocks, vec![ContentBlock::text("It is 68F and clear in Taos.")]);

    let received: Vec<Request> = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    assert!(body.get("tools").is_none());
}

#[tokio::test]
async fn test_api_error_message_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "type": "error",
            "error": { "type": "authentication_error", "message": "invalid x-api-key" }
        })))
        .mount(&server)
        .await;

    let err = client(&server).create(&request(true)).await.unwrap_err();
    match err {
        RelayError::Api { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "invalid x-api-key");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_non_json_error_body_is_kept() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let err = client(&server).create(&request(true)).await.unwrap_err();
    assert!(matches!(err, RelayError::Api { status: 502, ref message } if message == "bad gateway"));
}
