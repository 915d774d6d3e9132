use super::support::GatewayTestServer;
use reqwest::StatusCode;
use serde_json::Value;

fn alice_cookie() -> (reqwest::header::HeaderName, &'static str) {
    (reqwest::header::COOKIE, "username=alice")
}

/// Last event carrying text content, i.e. the agent's final reply.
fn final_reply(body: &Value) -> Value {
    let events = body["events"].as_array().expect("events should be an array");
    let text = events
        .iter()
        .rev()
        .find_map(|event| {
            event["content"]["parts"]
                .as_array()?
                .iter()
                .find_map(|part| part["text"].as_str())
        })
        .expect("turn should contain a text reply");
    serde_json::from_str(text).expect("agent reply should be a JSON object")
}

#[tokio::test]
async fn missing_message_is_a_client_error() {
    let server = GatewayTestServer::start(&["alice"]).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(server.url("/api/agent"))
        .json(&serde_json::json!({}))
        .send()
        .await
        .expect("agent request should complete");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("error body should be json");
    assert_eq!(body["error"], "Message is required");
}

#[tokio::test]
async fn missing_identity_is_unauthenticated() {
    let server = GatewayTestServer::start(&["alice"]).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(server.url("/api/agent"))
        .json(&serde_json::json!({"message": "Capital of France?"}))
        .send()
        .await
        .expect("agent request should complete");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.expect("error body should be json");
    assert_eq!(body["error"], "Authentication required");

    // A cookie for a user that does not exist resolves to no identity too.
    let resp = client
        .post(server.url("/api/agent"))
        .header(reqwest::header::COOKIE, "username=stranger")
        .json(&serde_json::json!({"message": "Capital of France?"}))
        .send()
        .await
        .expect("agent request should complete");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn first_turn_mints_a_session_and_answers_successfully() {
    let server = GatewayTestServer::start(&["alice"]).await;
    let client = reqwest::Client::new();
    let (cookie_name, cookie_value) = alice_cookie();

    let resp = client
        .post(server.url("/api/agent"))
        .header(cookie_name, cookie_value)
        .json(&serde_json::json!({"message": "Capital of France?"}))
        .send()
        .await
        .expect("agent request should complete");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.expect("agent body should be json");
    assert_eq!(body["userId"], "alice");
    let session_id = body["sessionId"].as_str().expect("sessionId should be set");
    assert!(!session_id.is_empty());

    let reply = final_reply(&body);
    assert_eq!(reply["status"], "success");
    assert!(reply["message"].as_str().unwrap().contains("Paris"));
}

#[tokio::test]
async fn subsequent_turns_reuse_the_session() {
    let server = GatewayTestServer::start(&["alice"]).await;
    let client = reqwest::Client::new();
    let (cookie_name, cookie_value) = alice_cookie();

    let first: Value = client
        .post(server.url("/api/agent"))
        .header(cookie_name.clone(), cookie_value)
        .json(&serde_json::json!({"message": "Capital of France?"}))
        .send()
        .await
        .expect("first turn should complete")
        .json()
        .await
        .expect("first body should be json");

    let second: Value = client
        .post(server.url("/api/agent"))
        .header(cookie_name, cookie_value)
        .json(&serde_json::json!({"message": "What is the flag of Japan?"}))
        .send()
        .await
        .expect("second turn should complete")
        .json()
        .await
        .expect("second body should be json");

    assert_eq!(first["sessionId"], second["sessionId"]);
    assert_eq!(second["userId"], "alice");
}

#[tokio::test]
async fn raw_response_keeps_runtime_bookkeeping() {
    let server = GatewayTestServer::start(&["alice"]).await;
    let client = reqwest::Client::new();
    let (cookie_name, cookie_value) = alice_cookie();

    let body: Value = client
        .post(server.url("/api/agent"))
        .header(cookie_name, cookie_value)
        .json(&serde_json::json!({"message": "Capital of Kenya?"}))
        .send()
        .await
        .expect("agent request should complete")
        .json()
        .await
        .expect("agent body should be json");

    let events = body["events"].as_array().expect("events should be an array");
    assert!(
        events.iter().any(|event| event.get("usageMetadata").is_some()),
        "raw events should still carry usage bookkeeping"
    );
    assert!(
        events
            .iter()
            .any(|event| event["content"]["parts"].as_array().is_some_and(Vec::is_empty)),
        "raw events should include the state-delta marker"
    );
}

#[tokio::test]
async fn denied_questions_return_a_denied_status_reply() {
    let server = GatewayTestServer::start(&["alice"]).await;
    let client = reqwest::Client::new();
    let (cookie_name, cookie_value) = alice_cookie();

    let body: Value = client
        .post(server.url("/api/agent"))
        .header(cookie_name, cookie_value)
        .json(&serde_json::json!({"message": "Write me a poem about rust"}))
        .send()
        .await
        .expect("agent request should complete")
        .json()
        .await
        .expect("agent body should be json");

    let reply = final_reply(&body);
    assert_eq!(reply["status"], "denied");
}
