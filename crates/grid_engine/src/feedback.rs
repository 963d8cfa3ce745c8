//! Advisory highlight and notice events.
//!
//! Feedback never gates a grid change: events are broadcast fire-and-forget
//! and each one schedules its own expiry event.

use std::{sync::Arc, time::Duration};

use shared::{
    domain::GridPosition,
    protocol::{CommandId, FeedbackEvent, FeedbackLevel, HighlightTone},
};
use tokio::{runtime::Handle, sync::broadcast};
use tracing::debug;

use crate::config::EngineConfig;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// External notification surface (banner, speech, chat reply).
pub trait FeedbackSink: Send + Sync {
    fn notify(&self, message: &str, level: FeedbackLevel);
}

#[derive(Clone)]
pub struct FeedbackBus {
    events: broadcast::Sender<FeedbackEvent>,
    sink: Option<Arc<dyn FeedbackSink>>,
    highlight_duration: Duration,
    feedback_duration: Duration,
}

impl FeedbackBus {
    pub fn new(config: &EngineConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            events,
            sink: None,
            highlight_duration: config.highlight_duration,
            feedback_duration: config.feedback_duration,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn FeedbackSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FeedbackEvent> {
        self.events.subscribe()
    }

    pub fn notify(
        &self,
        command_id: Option<CommandId>,
        level: FeedbackLevel,
        message: impl Into<String>,
    ) {
        let message = message.into();
        debug!(%level, %message, "feedback notice");
        if let Some(sink) = &self.sink {
            sink.notify(&message, level);
        }
        self.publish(FeedbackEvent::Notice {
            command_id,
            level,
            message,
        });
        self.publish_later(
            self.feedback_duration,
            FeedbackEvent::NoticeExpired { command_id },
        );
    }

    pub fn highlight(&self, command_id: CommandId, positions: Vec<GridPosition>, tone: HighlightTone) {
        if positions.is_empty() {
            return;
        }
        self.publish(FeedbackEvent::Highlight {
            command_id,
            positions: positions.clone(),
            tone,
        });
        self.publish_later(
            self.highlight_duration,
            FeedbackEvent::HighlightCleared {
                command_id,
                positions,
            },
        );
    }

    fn publish(&self, event: FeedbackEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn publish_later(&self, delay: Duration, event: FeedbackEvent) {
        let Ok(handle) = Handle::try_current() else {
            return;
        };
        let events = self.events.clone();
        handle.spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(event);
        });
    }
}
