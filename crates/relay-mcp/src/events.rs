//! Event callback shared by clients and servers
//!
//! Failures that are swallowed (a listing that could not be loaded, a
//! registration that was rejected, a transport that failed to close) are
//! always logged through `tracing` and additionally handed to the callback
//! installed with `on_event`, when there is one.

use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

/// Kind of event reported to the callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Info,
    Error,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => f.write_str("info"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// Event handed to the callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McpEvent {
    pub event_type: EventType,
    /// Area the event belongs to (`tools`, `close`, `start`, ...)
    pub name: String,
    pub message: String,
    pub details: String,
}

/// Event callback: `(event_type, name, message, details)` packed in an [`McpEvent`]
pub type EventCallback = Arc<dyn Fn(&McpEvent) + Send + Sync>;

/// Holder for the optional callback
#[derive(Clone, Default)]
pub struct EventSink {
    callback: Arc<RwLock<Option<EventCallback>>>,
}

impl fmt::Debug for EventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSink")
            .field("subscribed", &self.is_subscribed())
            .finish()
    }
}

impl EventSink {
    /// Replace the callback
    pub fn subscribe(&self, callback: EventCallback) {
        if let Ok(mut slot) = self.callback.write() {
            *slot = Some(callback);
        }
    }

    /// Drop the callback
    pub fn clear(&self) {
        if let Ok(mut slot) = self.callback.write() {
            *slot = None;
        }
    }

    /// Whether a callback is installed
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.callback.read().map(|slot| slot.is_some()).unwrap_or(false)
    }

    /// Log an error and forward it to the callback
    pub fn error(&self, name: &str, message: &str, details: impl fmt::Display) {
        warn!(area = name, "{}: {}", message, details);
        self.emit(EventType::Error, name, message, details.to_string());
    }

    /// Log an informational event and forward it to the callback
    pub fn info(&self, name: &str, message: &str, details: impl fmt::Display) {
        info!(area = name, "{}: {}", message, details);
        self.emit(EventType::Info, name, message, details.to_string());
    }

    fn emit(&self, event_type: EventType, name: &str, message: &str, details: String) {
        let callback = match self.callback.read() {
            Ok(slot) => slot.clone(),
            Err(_) => None,
        };
        if let Some(callback) = callback {
            callback(&McpEvent {
                event_type,
                name: name.to_string(),
                message: message.to_string(),
                details,
            });
        }
    }
}
