//! Inbound frame dispatch: parse, classify by `type`, route to one store action.

use serde_json::Value;
use tracing::{debug, instrument, trace, warn};

use crate::models::{Channel, InboundEvent};
use crate::store::Store;

/// Server group-send envelopes whose real event sits under `data`.
const ENVELOPE_TYPES: &[&str] = &["send_notification"];

/// What happened to one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A store action ran.
    Applied(&'static str),
    /// Recognized, no state change needed (acks, connect notices, server errors).
    Informational(&'static str),
    /// Recognized, but not meaningful on this channel.
    Ignored(&'static str),
    /// Unrecognized discriminator; dropped for forward compatibility.
    Unknown(String),
    /// Not JSON, no discriminator, or a payload that does not fit its type.
    Malformed,
}

/// Routes frames from every channel into the shared store.
#[derive(Clone)]
pub struct Dispatcher {
    store: Store,
}

impl Dispatcher {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Handle one raw frame. Never fails; problems become log lines.
    #[instrument(skip(self, channel, raw), fields(channel = %channel))]
    pub async fn dispatch(&self, channel: &Channel, raw: &str) -> DispatchOutcome {
        let value: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "discarding unparsable frame");
                return DispatchOutcome::Malformed;
            }
        };
        let value = unwrap_envelope(value);
        let Some(kind) = value.get("type").and_then(Value::as_str).map(str::to_string) else {
            warn!("discarding frame without type");
            return DispatchOutcome::Malformed;
        };

        let event = match serde_json::from_value::<InboundEvent>(value) {
            Ok(InboundEvent::Unknown) => {
                debug!(kind = %kind, "unknown event type dropped");
                return DispatchOutcome::Unknown(kind);
            }
            Ok(event) => event,
            Err(e) => {
                warn!(kind = %kind, error = %e, "discarding malformed payload");
                return DispatchOutcome::Malformed;
            }
        };
        self.apply(channel, event).await
    }

    async fn apply(&self, channel: &Channel, event: InboundEvent) -> DispatchOutcome {
        let kind = event.kind();
        match (event, channel) {
            (InboundEvent::UnreadCountUpdate { unread_count }, _) => {
                self.store.set_unread_count(unread_count).await;
            }
            (InboundEvent::NewNotification { notification }, _) => {
                if let Some(notification) = notification {
                    self.store.add_notification(notification).await;
                }
                self.store.increment_unread_count().await;
            }
            (InboundEvent::Message { message }, Channel::Chat { username }) => {
                if !self.store.add_realtime_message(username, message).await {
                    debug!("message for inactive conversation dropped");
                    return DispatchOutcome::Ignored(kind);
                }
            }
            (InboundEvent::ChatMessage(chat), Channel::Chat { username }) => {
                if !self
                    .store
                    .add_realtime_message(username, chat.into_message())
                    .await
                {
                    debug!("message for inactive conversation dropped");
                    return DispatchOutcome::Ignored(kind);
                }
            }
            (InboundEvent::ChatMessage(chat), Channel::Stream { stream_id }) => {
                self.store
                    .add_stream_chat(*stream_id, chat.into_stream_entry())
                    .await;
            }
            (InboundEvent::ViewerCountUpdate { viewer_count }, Channel::Stream { stream_id }) => {
                self.store.set_viewer_count(*stream_id, viewer_count).await;
            }
            (InboundEvent::StreamStatusUpdate(status), Channel::Stream { stream_id }) => {
                let target = status.stream_id.unwrap_or(*stream_id);
                self.store.update_stream_status(target, status).await;
            }
            (InboundEvent::TypingStart { user }, Channel::Chat { .. }) => {
                self.store.set_typing(Some(user)).await;
            }
            (InboundEvent::TypingStop, Channel::Chat { .. }) => {
                self.store.set_typing(None).await;
            }
            (InboundEvent::HeartbeatAck, _) | (InboundEvent::StreamConnected { .. }, _) => {
                trace!(kind, "informational frame");
                return DispatchOutcome::Informational(kind);
            }
            (InboundEvent::Error { message }, _) => {
                warn!(message = %message, "server reported error");
                return DispatchOutcome::Informational(kind);
            }
            (InboundEvent::Unknown, _) => {
                return DispatchOutcome::Unknown(kind.to_string());
            }
            _ => {
                debug!(kind, "event not applicable to channel");
                return DispatchOutcome::Ignored(kind);
            }
        }
        DispatchOutcome::Applied(kind)
    }
}

fn unwrap_envelope(value: Value) -> Value {
    let is_envelope = value
        .get("type")
        .and_then(Value::as_str)
        .map(|t| ENVELOPE_TYPES.contains(&t))
        .unwrap_or(false);
    if !is_envelope {
        return value;
    }
    match value.get("data") {
        Some(inner) if inner.get("type").and_then(Value::as_str).is_some() => inner.clone(),
        _ => value,
    }
}
