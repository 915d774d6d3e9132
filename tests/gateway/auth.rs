use super::support::GatewayTestServer;
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn login_unknown_user_is_not_found() {
    let server = GatewayTestServer::start(&["user1"]).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(server.url("/api/login"))
        .json(&serde_json::json!({"username": "stranger"}))
        .send()
        .await
        .expect("login request should complete");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.expect("error body should be json");
    assert_eq!(body["error"], "User not found");
}

#[tokio::test]
async fn login_requires_a_username() {
    let server = GatewayTestServer::start(&[]).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(server.url("/api/login"))
        .json(&serde_json::json!({"username": "   "}))
        .send()
        .await
        .expect("login request should complete");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("error body should be json");
    assert_eq!(body["error"], "Username is required");
}

#[tokio::test]
async fn login_sets_cookie_that_authenticates_agent_calls() {
    let server = GatewayTestServer::start(&["alice"]).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(server.url("/api/login"))
        .json(&serde_json::json!({"username": "alice"}))
        .send()
        .await
        .expect("login request should complete");
    assert_eq!(resp.status(), StatusCode::OK);

    let cookie = resp
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .expect("login should set a cookie")
        .to_str()
        .expect("cookie should be ascii")
        .to_string();
    assert!(cookie.starts_with("username=alice"));
    assert!(cookie.contains("HttpOnly"));

    let cookie_pair = cookie.split(';').next().unwrap().to_string();
    let resp = client
        .post(server.url("/api/agent"))
        .header(reqwest::header::COOKIE, cookie_pair)
        .json(&serde_json::json!({"message": "hello"}))
        .send()
        .await
        .expect("agent request should complete");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("agent body should be json");
    assert_eq!(body["userId"], "alice");
}

#[tokio::test]
async fn logout_clears_the_cookie() {
    let server = GatewayTestServer::start(&[]).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(server.url("/api/logout"))
        .send()
        .await
        .expect("logout request should complete");
    assert_eq!(resp.status(), StatusCode::OK);

    let cookie = resp
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .expect("logout should set a clearing cookie")
        .to_str()
        .expect("cookie should be ascii");
    assert!(cookie.starts_with("username=;"));
    assert!(cookie.contains("Max-Age=0"));
}
