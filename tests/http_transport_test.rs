//! Session tests over the streamable HTTP transport
//!
//! A wiremock server plays the MCP side: JSON responses for POSTed
//! requests, `202 Accepted` for notifications, a session ID issued on
//! `initialize` and required on the follow-up request, and one response
//! delivered as an SSE body to cover the streaming path.

use mcprobe::config::{ClientConfig, TransportConfig};
use mcprobe::session::Session;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn initialize_result() -> serde_json::Value {
    json!({
        "protocolVersion": "2025-11-25",
        "capabilities": { "tools": {} },
        "serverInfo": { "name": "wiremock-server", "version": "0.1.0" }
    })
}

/// Mount the handshake mocks: `initialize` (id 1) and the `202` for the
/// `notifications/initialized` acknowledgement.
async fn mount_handshake(server: &MockServer, session_id: &str) {
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(body_string_contains("\"method\":\"initialize\""))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("mcp-session-id", session_id)
                .set_body_json(json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "result": initialize_result()
                })),
        )
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(body_string_contains("notifications/initialized"))
        .respond_with(ResponseTemplate::new(202))
        .mount(server)
        .await;
}

#[tokio::test]
async fn http_session_handshakes_and_reuses_session_id() {
    let server = MockServer::start().await;
    mount_handshake(&server, "sess-123").await;

    // The follow-up request must carry the session ID issued above.
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(body_string_contains("\"method\":\"tools/list\""))
        .and(header("mcp-session-id", "sess-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 2,
            "result": {
                "tools": [{ "name": "fetch", "inputSchema": { "type": "object" } }]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::new(TransportConfig::for_http(format!("{}/mcp", server.uri())));
    let mut session = Session::new(config);
    session.connect().await.expect("handshake failed");

    assert_eq!(session.server_info().unwrap().name, "wiremock-server");
    assert!(session.capability_set().tools);

    let tools = session.list_tools().await.unwrap();
    assert_eq!(tools[0].name, "fetch");

    session.disconnect().await;
}

#[tokio::test]
async fn http_session_parses_sse_framed_response() {
    let server = MockServer::start().await;
    mount_handshake(&server, "sess-sse").await;

    // The server answers tools/list with an SSE body instead of plain JSON.
    let sse_body = concat!(
        "event: message\n",
        "data: {\"jsonrpc\":\"2.0\",\"id\":2,\"result\":{\"tools\":",
        "[{\"name\":\"streamed\",\"inputSchema\":{\"type\":\"object\"}}]}}\n",
        "\n"
    );
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(body_string_contains("\"method\":\"tools/list\""))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse_body, "text/event-stream"),
        )
        .mount(&server)
        .await;

    let config = ClientConfig::new(TransportConfig::for_http(format!("{}/mcp", server.uri())));
    let mut session = Session::new(config);
    session.connect().await.expect("handshake failed");

    let tools = session.list_tools().await.unwrap();
    assert_eq!(tools[0].name, "streamed");

    session.disconnect().await;
}

#[tokio::test]
async fn http_request_headers_are_forwarded() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(body_string_contains("\"method\":\"initialize\""))
        .and(header("authorization", "Bearer token-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": initialize_result()
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(body_string_contains("notifications/initialized"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    let mut transport = TransportConfig::for_http(format!("{}/mcp", server.uri()));
    if let TransportConfig::Http(http) = &mut transport {
        http.headers
            .insert("Authorization".to_string(), "Bearer token-42".to_string());
    }
    let mut session = Session::new(ClientConfig::new(transport));
    session.connect().await.expect("handshake failed");
    session.disconnect().await;
}

#[tokio::test]
async fn http_error_status_fails_the_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/mcp"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = ClientConfig::new(TransportConfig::for_http(format!("{}/mcp", server.uri())));
    let mut session = Session::new(config);
    assert!(session.connect().await.is_err());
    assert!(!session.is_connected());
}
