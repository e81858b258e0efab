use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use timeclock_core::errors::ApplicationError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatewayEnvelope {
    pub envelope_id: String,
    pub event: GatewayEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GatewayEvent {
    TextMessage(TextMessageEvent),
    Postback(PostbackEvent),
    Unsupported { event_type: String },
}

impl GatewayEvent {
    pub fn event_type(&self) -> GatewayEventType {
        match self {
            Self::TextMessage(_) => GatewayEventType::TextMessage,
            Self::Postback(_) => GatewayEventType::Postback,
            Self::Unsupported { .. } => GatewayEventType::Unsupported,
        }
    }

    pub fn sender_identity(&self) -> Option<&str> {
        match self {
            Self::TextMessage(event) => Some(&event.sender_identity),
            Self::Postback(event) => Some(&event.sender_identity),
            Self::Unsupported { .. } => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum GatewayEventType {
    TextMessage,
    Postback,
    Unsupported,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextMessageEvent {
    pub sender_identity: String,
    pub reply_token: String,
    pub text: String,
}

/// A button press. `data` is the label or payload token of the button.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostbackEvent {
    pub sender_identity: String,
    pub reply_token: String,
    pub data: String,
}

impl PostbackEvent {
    pub fn as_text_message(&self) -> TextMessageEvent {
        TextMessageEvent {
            sender_identity: self.sender_identity.clone(),
            reply_token: self.reply_token.clone(),
            text: self.data.clone(),
        }
    }
}

/// JSON body accepted on the callback endpoint. Exactly one of `text` and
/// `data` is expected; `text` wins when both are present.
#[derive(Clone, Debug, Deserialize)]
pub struct InboundEvent {
    pub sender_identity: String,
    pub reply_token: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub data: Option<String>,
}

impl InboundEvent {
    pub fn into_envelope(self, envelope_id: impl Into<String>) -> GatewayEnvelope {
        let event = match (self.text, self.data) {
            (Some(text), _) => GatewayEvent::TextMessage(TextMessageEvent {
                sender_identity: self.sender_identity,
                reply_token: self.reply_token,
                text,
            }),
            (None, Some(data)) => GatewayEvent::Postback(PostbackEvent {
                sender_identity: self.sender_identity,
                reply_token: self.reply_token,
                data,
            }),
            (None, None) => GatewayEvent::Unsupported { event_type: "empty".to_owned() },
        };

        GatewayEnvelope { envelope_id: envelope_id.into(), event }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Processed,
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error(transparent)]
    Application(#[from] ApplicationError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

impl DispatchError {
    pub fn into_application(self) -> ApplicationError {
        match self {
            Self::Handler(EventHandlerError::Application(error)) => error,
        }
    }
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> GatewayEventType;
    async fn handle(
        &self,
        envelope: &GatewayEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<GatewayEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &GatewayEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            debug!(
                event_name = "ingress.gateway.unhandled",
                envelope_id = %envelope.envelope_id,
                event_type = ?envelope.event.event_type(),
                correlation_id = %ctx.correlation_id,
                "no handler registered for gateway event"
            );
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Registers text and postback handlers that both feed `service`.
pub fn conversation_dispatcher<S>(service: Arc<S>) -> EventDispatcher
where
    S: ConversationService + 'static,
{
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(TextMessageHandler::new(service.clone()));
    dispatcher.register(PostbackHandler::new(service));
    dispatcher
}

/// The conversation core as seen from the gateway. Replies go out through
/// the outbound messenger, so nothing is returned on success.
#[async_trait]
pub trait ConversationService: Send + Sync {
    async fn handle_text(
        &self,
        event: &TextMessageEvent,
        ctx: &EventContext,
    ) -> Result<(), ApplicationError>;
}

pub struct TextMessageHandler<S> {
    service: Arc<S>,
}

impl<S> TextMessageHandler<S>
where
    S: ConversationService,
{
    pub fn new(service: Arc<S>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S> EventHandler for TextMessageHandler<S>
where
    S: ConversationService + 'static,
{
    fn event_type(&self) -> GatewayEventType {
        GatewayEventType::TextMessage
    }

    async fn handle(
        &self,
        envelope: &GatewayEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let GatewayEvent::TextMessage(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        self.service.handle_text(event, ctx).await?;
        Ok(HandlerResult::Processed)
    }
}

pub struct PostbackHandler<S> {
    service: Arc<S>,
}

impl<S> PostbackHandler<S>
where
    S: ConversationService,
{
    pub fn new(service: Arc<S>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S> EventHandler for PostbackHandler<S>
where
    S: ConversationService + 'static,
{
    fn event_type(&self) -> GatewayEventType {
        GatewayEventType::Postback
    }

    async fn handle(
        &self,
        envelope: &GatewayEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let GatewayEvent::Postback(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        self.service.handle_text(&event.as_text_message(), ctx).await?;
        Ok(HandlerResult::Processed)
    }
}
