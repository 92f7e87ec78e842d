use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::{commands::CommandRouter, web::WebApiError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlackEnvelope {
    pub envelope_id: String,
    pub event: SlackEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlackEvent {
    Message(MessageEvent),
    Unsupported { event_type: String },
}

impl SlackEvent {
    pub fn event_type(&self) -> SlackEventType {
        match self {
            Self::Message(_) => SlackEventType::Message,
            Self::Unsupported { .. } => SlackEventType::Unsupported,
        }
    }

    /// Decodes the `payload` of an `events_api` envelope. Anything that is
    /// not a plain user message (edits, joins, bot posts, empty text) comes
    /// back as `Unsupported`.
    pub fn from_events_api_payload(payload: &Value) -> Self {
        let Some(event) = payload.get("event") else {
            return Self::Unsupported { event_type: "missing_event".to_owned() };
        };
        let raw = match RawMessageEvent::deserialize(event) {
            Ok(raw) => raw,
            Err(_) => return Self::Unsupported { event_type: "malformed_event".to_owned() },
        };

        if raw.event_type != "message" {
            return Self::Unsupported { event_type: raw.event_type };
        }
        if let Some(subtype) = raw.subtype {
            return Self::Unsupported { event_type: format!("message.{subtype}") };
        }
        match (raw.channel, raw.user, raw.text, raw.ts) {
            (Some(channel_id), Some(user_id), Some(text), Some(ts)) if !text.trim().is_empty() => {
                Self::Message(MessageEvent {
                    channel_id,
                    user_id,
                    text,
                    ts,
                    thread_ts: raw.thread_ts,
                })
            }
            _ => Self::Unsupported { event_type: "message.incomplete".to_owned() },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SlackEventType {
    Message,
    Unsupported,
}

#[derive(Deserialize)]
struct RawMessageEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    subtype: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    ts: Option<String>,
    #[serde(default)]
    thread_ts: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageEvent {
    pub channel_id: String,
    pub user_id: String,
    pub text: String,
    pub ts: String,
    pub thread_ts: Option<String>,
}

impl MessageEvent {
    pub fn conversation_kind(&self) -> ConversationKind {
        ConversationKind::from_channel_id(&self.channel_id)
    }
}

/// Slack encodes the conversation kind in the first character of its id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConversationKind {
    Channel,
    Direct,
    Other,
}

impl ConversationKind {
    pub fn from_channel_id(channel_id: &str) -> Self {
        match channel_id.chars().next() {
            Some('C') => Self::Channel,
            Some('D') => Self::Direct,
            _ => Self::Other,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Channel => "channel",
            Self::Direct => "direct",
            Self::Other => "other",
        }
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

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    /// The bot posted this many messages.
    Responded { posted: usize },
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error("reply delivery failed: {0}")]
    Delivery(#[from] WebApiError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> SlackEventType;
    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<SlackEventType, Arc<dyn EventHandler>>,
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
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Hands chat messages to the command router.
pub struct MessageHandler {
    router: CommandRouter,
}

impl MessageHandler {
    pub fn new(router: CommandRouter) -> Self {
        Self { router }
    }
}

#[async_trait]
impl EventHandler for MessageHandler {
    fn event_type(&self) -> SlackEventType {
        SlackEventType::Message
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::Message(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        self.router.route(event, ctx).await
    }
}

pub fn bot_dispatcher(router: CommandRouter) -> EventDispatcher {
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(MessageHandler::new(router));
    dispatcher
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        ConversationKind, EventContext, EventDispatcher, HandlerResult, SlackEnvelope, SlackEvent,
        SlackEventType,
    };

    #[test]
    fn plain_user_messages_are_decoded() {
        let payload = json!({
            "type": "event_callback",
            "event": {
                "type": "message",
                "channel": "C024BE91L",
                "user": "U2147483697",
                "text": "han tell me a joke",
                "ts": "1355517523.000005"
            }
        });

        let SlackEvent::Message(event) = SlackEvent::from_events_api_payload(&payload) else {
            panic!("expected a message event");
        };
        assert_eq!(event.channel_id, "C024BE91L");
        assert_eq!(event.user_id, "U2147483697");
        assert_eq!(event.text, "han tell me a joke");
        assert_eq!(event.ts, "1355517523.000005");
        assert_eq!(event.thread_ts, None);
        assert_eq!(event.conversation_kind(), ConversationKind::Channel);
    }

    #[test]
    fn subtyped_messages_are_not_chat() {
        let payload = json!({
            "event": {
                "type": "message",
                "subtype": "message_changed",
                "channel": "C1",
                "ts": "1.2"
            }
        });

        assert_eq!(
            SlackEvent::from_events_api_payload(&payload),
            SlackEvent::Unsupported { event_type: "message.message_changed".to_owned() }
        );
    }

    #[test]
    fn blank_text_and_other_event_types_are_unsupported() {
        let blank = json!({
            "event": {"type": "message", "channel": "D1", "user": "U1", "text": "  ", "ts": "1.2"}
        });
        let reaction = json!({"event": {"type": "reaction_added", "user": "U1"}});

        assert_eq!(SlackEvent::from_events_api_payload(&blank).event_type(), SlackEventType::Unsupported);
        assert_eq!(
            SlackEvent::from_events_api_payload(&reaction),
            SlackEvent::Unsupported { event_type: "reaction_added".to_owned() }
        );
    }

    #[test]
    fn channel_ids_encode_conversation_kind() {
        assert_eq!(ConversationKind::from_channel_id("C0123"), ConversationKind::Channel);
        assert_eq!(ConversationKind::from_channel_id("D0123"), ConversationKind::Direct);
        assert_eq!(ConversationKind::from_channel_id("G0123"), ConversationKind::Other);
        assert_eq!(ConversationKind::from_channel_id(""), ConversationKind::Other);
    }

    #[tokio::test]
    async fn dispatcher_ignores_events_without_a_handler() {
        let dispatcher = EventDispatcher::new();
        let envelope = SlackEnvelope {
            envelope_id: "env-1".to_owned(),
            event: SlackEvent::Unsupported { event_type: "app_home_opened".to_owned() },
        };

        let result = dispatcher.dispatch(&envelope, &EventContext::default()).await;

        assert_eq!(result, Ok(HandlerResult::Ignored));
        assert_eq!(dispatcher.handler_count(), 0);
    }
}
