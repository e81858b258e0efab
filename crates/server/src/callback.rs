//! Inbound chat events from the messaging gateway.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use timeclock_core::errors::{InterfaceError, InterfaceErrorKind};
use timeclock_gateway::events::{EventContext, EventDispatcher, HandlerResult, InboundEvent};

#[derive(Clone)]
pub struct CallbackState {
    dispatcher: Arc<EventDispatcher>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CallbackResponse {
    pub status: &'static str,
    pub correlation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
}

pub fn router(dispatcher: Arc<EventDispatcher>) -> Router {
    Router::new().route("/callback", post(callback)).with_state(CallbackState { dispatcher })
}

pub async fn callback(
    State(state): State<CallbackState>,
    Json(event): Json<InboundEvent>,
) -> (StatusCode, Json<CallbackResponse>) {
    let correlation_id = Uuid::new_v4().to_string();
    let envelope = event.into_envelope(correlation_id.clone());
    let ctx = EventContext { correlation_id: correlation_id.clone() };

    match state.dispatcher.dispatch(&envelope, &ctx).await {
        Ok(result) => {
            let status = match result {
                HandlerResult::Processed => "processed",
                HandlerResult::Ignored => "ignored",
            };
            info!(
                event_name = "ingress.callback.handled",
                correlation_id = %correlation_id,
                event_type = ?envelope.event.event_type(),
                status,
                "callback handled"
            );
            (StatusCode::OK, Json(CallbackResponse { status, correlation_id, error: None }))
        }
        Err(error) => {
            let interface = error.into_application().into_interface(correlation_id.clone());
            warn!(
                event_name = "ingress.callback.failed",
                correlation_id = %correlation_id,
                error = %interface,
                "callback failed"
            );
            let response = CallbackResponse {
                status: "failed",
                correlation_id,
                error: Some(interface.user_message()),
            };
            (status_for(&interface), Json(response))
        }
    }
}

fn status_for(error: &InterfaceError) -> StatusCode {
    match error.kind() {
        InterfaceErrorKind::BadRequest => StatusCode::BAD_REQUEST,
        InterfaceErrorKind::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        extract::State,
        http::{Request, StatusCode},
        Json,
    };
    use tower::ServiceExt;

    use timeclock_core::errors::ApplicationError;
    use timeclock_gateway::events::{
        conversation_dispatcher, ConversationService, EventContext, EventDispatcher,
        InboundEvent, TextMessageEvent,
    };

    use super::{callback, router, CallbackState};

    struct FailingService;

    #[async_trait]
    impl ConversationService for FailingService {
        async fn handle_text(
            &self,
            _event: &TextMessageEvent,
            _ctx: &EventContext,
        ) -> Result<(), ApplicationError> {
            Err(ApplicationError::Persistence("database is locked".to_owned()))
        }
    }

    fn event(text: Option<&str>) -> InboundEvent {
        InboundEvent {
            sender_identity: "U1".to_owned(),
            reply_token: "rt-1".to_owned(),
            text: text.map(str::to_owned),
            data: None,
        }
    }

    #[tokio::test]
    async fn persistence_failure_maps_to_service_unavailable() {
        let state =
            CallbackState { dispatcher: Arc::new(conversation_dispatcher(Arc::new(FailingService))) };

        let (status, Json(payload)) = callback(State(state), Json(event(Some("Punch in")))).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "failed");
        assert_eq!(
            payload.error,
            Some("The service is temporarily unavailable. Please retry shortly.")
        );
        assert!(!payload.correlation_id.is_empty());
    }

    #[tokio::test]
    async fn empty_event_is_acknowledged_as_ignored() {
        let state = CallbackState { dispatcher: Arc::new(EventDispatcher::new()) };

        let (status, Json(payload)) = callback(State(state), Json(event(None))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ignored");
        assert_eq!(payload.error, None);
    }

    #[tokio::test]
    async fn route_accepts_json_postbacks() {
        let app = router(Arc::new(conversation_dispatcher(Arc::new(FailingService))));
        let request = Request::builder()
            .method("POST")
            .uri("/callback")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"sender_identity":"U1","reply_token":"rt-9","data":"Arrival"}"#))
            .expect("request");

        let response = app.oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = to_bytes(response.into_body(), 64 * 1024).await.expect("body");
        let payload: serde_json::Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(payload["status"], "failed");
    }

    #[tokio::test]
    async fn malformed_body_is_rejected_before_dispatch() {
        let app = router(Arc::new(EventDispatcher::new()));
        let request = Request::builder()
            .method("POST")
            .uri("/callback")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"text":"Punch in"}"#))
            .expect("request");

        let response = app.oneshot(request).await.expect("response");

        assert!(response.status().is_client_error());
    }
}
