use super::AppState;
use crate::auth;
use crate::error::TurnError;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Json, Response},
};

/// Agent turn request body
#[derive(serde::Deserialize)]
pub struct AgentBody {
    #[serde(default)]
    pub message: Option<String>,
}

/// Login request body
#[derive(serde::Deserialize)]
pub struct LoginBody {
    #[serde(default)]
    pub username: Option<String>,
}

/// GET /health — readiness probe
pub(super) async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// POST /api/agent — run one conversational turn for the logged-in user
pub(super) async fn handle_agent_turn(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<AgentBody>, axum::extract::rejection::JsonRejection>,
) -> Response {
    let message = body
        .ok()
        .and_then(|Json(body)| body.message)
        .unwrap_or_default();
    if message.is_empty() {
        return turn_error_response(&TurnError::MissingMessage);
    }

    let Some(user_id) = auth::resolve_user_id(&headers, &state.users).await else {
        return turn_error_response(&TurnError::Unauthenticated);
    };

    match state.reconciler.run_turn(&user_id, &message).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "events": outcome.events,
                "userId": outcome.user_id,
                "sessionId": outcome.session_id,
            })),
        )
            .into_response(),
        Err(error) => {
            tracing::error!(%error, %user_id, "agent turn failed");
            turn_error_response(&error)
        }
    }
}

/// POST /api/login — existence check against the user table, sets the cookie
pub(super) async fn handle_login(
    State(state): State<AppState>,
    body: Result<Json<LoginBody>, axum::extract::rejection::JsonRejection>,
) -> Response {
    let username_input = body
        .ok()
        .and_then(|Json(body)| body.username)
        .unwrap_or_default();
    let Some(username) = auth::validate_username(&username_input) else {
        let err = serde_json::json!({ "error": "Username is required" });
        return (StatusCode::BAD_REQUEST, Json(err)).into_response();
    };

    match state.users.get_user(&username).await {
        Ok(Some(user)) => {
            tracing::info!(user_id = %user.id, "user logged in");
            (
                StatusCode::OK,
                [(header::SET_COOKIE, auth::login_cookie(&user.id))],
                Json(serde_json::json!({ "userId": user.id })),
            )
                .into_response()
        }
        Ok(None) => {
            let err = serde_json::json!({ "error": "User not found" });
            (StatusCode::NOT_FOUND, Json(err)).into_response()
        }
        Err(error) => {
            tracing::error!(%error, "login lookup failed");
            let err = serde_json::json!({ "error": "Login failed" });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(err)).into_response()
        }
    }
}

/// POST /api/logout — clears the session cookie
pub(super) async fn handle_logout() -> Response {
    (
        StatusCode::OK,
        [(header::SET_COOKIE, auth::logout_cookie())],
        Json(serde_json::json!({ "status": "ok" })),
    )
        .into_response()
}

fn turn_error_response(error: &TurnError) -> Response {
    let body = serde_json::json!({ "error": error.to_string() });
    (error.status(), Json(body)).into_response()
}
