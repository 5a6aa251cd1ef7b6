use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use shelfbot_agent::format;
use shelfbot_agent::{AgentRuntime, ChatMode};

#[derive(Clone)]
pub struct ChatState {
    runtime: AgentRuntime,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct MessageRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub mode: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct BulkRequest {
    #[serde(default)]
    pub messages: Vec<String>,
    #[serde(default)]
    pub mode: Option<String>,
}

pub fn router(runtime: AgentRuntime) -> Router {
    Router::new()
        .route("/api/chatbot/message", post(message))
        .route("/api/chatbot/ai", post(ai))
        .route("/api/chatbot/structured", post(structured))
        .route("/api/chatbot/bulk", post(bulk))
        .route("/api/chatbot/help", get(help))
        .route("/api/chatbot/status", get(status))
        .route("/api/chatbot/capabilities", get(capabilities))
        .with_state(ChatState { runtime })
}

pub async fn message(
    State(state): State<ChatState>,
    body: Result<Json<MessageRequest>, JsonRejection>,
) -> Response {
    let body = accept_message(body);
    let mode = ChatMode::from_request(body.mode.as_deref());
    reply(&state, &body.message, mode, "Please provide a message.").await
}

pub async fn ai(
    State(state): State<ChatState>,
    body: Result<Json<MessageRequest>, JsonRejection>,
) -> Response {
    let body = accept_message(body);
    reply(&state, &body.message, ChatMode::Ai, "Please provide a message for AI processing.").await
}

pub async fn structured(
    State(state): State<ChatState>,
    body: Result<Json<MessageRequest>, JsonRejection>,
) -> Response {
    let body = accept_message(body);
    reply(
        &state,
        &body.message,
        ChatMode::Structured,
        "Please provide a message for structured processing.",
    )
    .await
}

/// An unreadable body is treated like an empty message.
fn accept_message(body: Result<Json<MessageRequest>, JsonRejection>) -> MessageRequest {
    match body {
        Ok(Json(body)) => body,
        Err(rejection) => {
            debug!(error = %rejection, "chat message body rejected");
            MessageRequest::default()
        }
    }
}

async fn reply(state: &ChatState, message: &str, mode: ChatMode, empty_reply: &str) -> Response {
    if message.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({ "response": empty_reply }))).into_response();
    }
    Json(state.runtime.handle_message(message, mode).await).into_response()
}

pub async fn bulk(
    State(state): State<ChatState>,
    body: Result<Json<BulkRequest>, JsonRejection>,
) -> Response {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => {
            debug!(error = %rejection, "bulk chat body rejected");
            BulkRequest::default()
        }
    };

    if body.messages.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Please provide a list of messages." })),
        )
            .into_response();
    }

    let mode = ChatMode::from_request(body.mode.as_deref());
    Json(state.runtime.handle_batch(&body.messages, mode).await).into_response()
}

pub async fn help() -> Json<Value> {
    Json(json!({
        "commandCategories": {
            "products": ["create", "read", "update", "delete"],
            "variants": ["create variant", "show variants", "update variant", "delete variant"],
            "stock": ["check stock for [product name]"],
            "other": ["status", "count", "help"],
        },
        "processingModes": {
            "structured": "Rule-based command handling for catalog operations",
            "ai": "Generative answers grounded in a live catalog snapshot",
        },
        "structuredExamples": [
            "Create product with title Premium T-Shirt and description High quality cotton shirt",
            "Show all products",
            "Update product prod_123 with title New Title",
            "Create variant for product prod_123 with title Red Large and sku RED-L-001",
            "Check stock for Premium T-Shirt",
        ],
        "aiExamples": [
            "Which products are running low on stock?",
            "What price lists are active right now?",
            "Suggest a product for a coffee lover",
        ],
        "endpoints": {
            "POST /api/chatbot/message": "Process a message, mode optional",
            "POST /api/chatbot/ai": "Force generative processing",
            "POST /api/chatbot/structured": "Force rule-based processing",
            "POST /api/chatbot/bulk": "Process several messages in order",
            "GET /api/chatbot/help": "This document",
            "GET /api/chatbot/status": "Catalog statistics",
            "GET /api/chatbot/capabilities": "Supported data sources and features",
        },
        "usage": format::HELP,
    }))
}

pub async fn status(State(state): State<ChatState>) -> Json<Value> {
    let details = match state.runtime.catalog().counts().await {
        Ok(counts) => format::status(&counts),
        Err(error) => format::error(&error),
    };

    Json(json!({
        "status": "operational",
        "details": details,
        "availableModes": [ChatMode::Structured.as_str(), ChatMode::Ai.as_str()],
        "timestamp": Utc::now(),
    }))
}

pub async fn capabilities() -> Json<Value> {
    Json(json!({
        "dataSources": ["products", "variants", "inventory", "pricing", "categories"],
        "queryTypes": [
            "product lookup by id or title",
            "variant lookup by id or product",
            "stock levels",
            "catalog statistics",
            "open questions answered from a catalog snapshot",
        ],
        "processingFeatures": [
            "keyword intent classification",
            "field extraction from free text",
            "generated product descriptions with template fallback",
            "low stock alerts below 10 units",
            "sequential batch processing",
        ],
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use shelfbot_agent::llm::DisabledLlmClient;
    use shelfbot_agent::{AgentRuntime, CatalogRepositories};

    use super::router;

    fn app() -> axum::Router {
        router(AgentRuntime::new(
            CatalogRepositories::in_memory(),
            Arc::new(DisabledLlmClient),
            Duration::from_secs(1),
        ))
    }

    async fn post(app: axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
        post_raw(app, uri, &body.to_string()).await
    }

    #[tokio::test]
    async fn message_defaults_to_structured_mode() {
        let (status, body) =
            post(app(), "/api/chatbot/message", json!({ "message": "Create product with title Oak Desk" }))
                .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["mode"], "structured");
        assert!(body["response"].as_str().expect("text").contains("Product Created Successfully"));
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn empty_messages_are_rejected_per_endpoint() {
        let (status, body) = post(app(), "/api/chatbot/message", json!({ "message": "  " })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "response": "Please provide a message." }));

        let (status, body) = post(app(), "/api/chatbot/ai", json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["response"], "Please provide a message for AI processing.");

        let (status, body) = post(app(), "/api/chatbot/bulk", json!({ "messages": [] })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Please provide a list of messages." }));
    }

    async fn post_raw(app: axum::Router, uri: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_owned()))
            .expect("request");
        let response = app.oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, serde_json::from_slice(&bytes).expect("json"))
    }

    #[tokio::test]
    async fn unreadable_bodies_get_the_same_rejection_as_empty_ones() {
        let (status, body) = post(app(), "/api/chatbot/message", json!({ "message": 42 })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "response": "Please provide a message." }));

        let (status, body) = post_raw(app(), "/api/chatbot/message", "not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "response": "Please provide a message." }));

        let (status, body) = post_raw(app(), "/api/chatbot/structured", "{\"message\":").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["response"], "Please provide a message for structured processing.");

        let (status, body) = post(app(), "/api/chatbot/bulk", json!({ "messages": "help" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Please provide a list of messages." }));
    }

    #[tokio::test]
    async fn ai_mode_is_case_insensitive_and_reports_backend_failure() {
        let (status, body) =
            post(app(), "/api/chatbot/message", json!({ "message": "what sells best?", "mode": "AI" }))
                .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["mode"], "ai");
        assert!(body["response"]
            .as_str()
            .expect("text")
            .starts_with("Sorry, I couldn't process your request at the moment."));
    }

    #[tokio::test]
    async fn bulk_numbers_each_reply() {
        let (status, body) = post(
            app(),
            "/api/chatbot/bulk",
            json!({ "messages": ["help", "status"], "mode": "structured" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["processed_count"], 2);
        assert!(body["responses"]["query_1"].as_str().expect("help").contains("Product Commands"));
        assert!(body["responses"]["query_2"].as_str().expect("status").contains("System Statistics"));
    }

    #[tokio::test]
    async fn status_reports_operational_counts() {
        let request = Request::get("/api/chatbot/status").body(Body::empty()).expect("request");
        let response = app().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let body: Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(body["status"], "operational");
        assert!(body["details"].as_str().expect("details").contains("📦 Total Products: 0"));
        assert_eq!(body["availableModes"], json!(["structured", "ai"]));
    }
}
