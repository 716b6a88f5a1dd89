//! In-process notification bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`NotificationBus`] is shared via `Arc<NotificationBus>` between the
//! controllers that raise notifications and the views that render them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use hrdesk_core::ports::Notifier;
use hrdesk_core::types::DbId;

// ---------------------------------------------------------------------------
// Notification
// ---------------------------------------------------------------------------

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Success,
    Error,
}

/// A message shown to the user, typically as a toast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Unique id so views can dismiss a specific toast.
    pub id: uuid::Uuid,

    pub level: NotificationLevel,

    pub message: String,

    /// Draft namespace of the screen that raised it, if known.
    pub screen: Option<String>,

    /// Entity the notification concerns, if known.
    pub entity_id: Option<DbId>,

    /// When the notification was raised (UTC).
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            level,
            message: message.into(),
            screen: None,
            entity_id: None,
            timestamp: Utc::now(),
        }
    }

    /// Attach the originating screen and entity.
    pub fn with_source(mut self, screen: impl Into<String>, entity_id: Option<DbId>) -> Self {
        self.screen = Some(screen.into());
        self.entity_id = entity_id;
        self
    }
}

// ---------------------------------------------------------------------------
// NotificationBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

/// In-process fan-out of [`Notification`]s.
///
/// # Usage
///
/// ```rust
/// use hrdesk_events::{NotificationBus, Notification, NotificationLevel};
///
/// let bus = NotificationBus::default();
/// let _rx = bus.subscribe();
///
/// bus.publish(Notification::new(NotificationLevel::Success, "Saved"));
/// ```
pub struct NotificationBus {
    sender: broadcast::Sender<Notification>,
    screen: Option<String>,
    entity_id: Option<DbId>,
}

impl NotificationBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed notifications are
    /// dropped and slow receivers observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            screen: None,
            entity_id: None,
        }
    }

    /// A handle on the same channel that tags notifications with the
    /// screen namespace and the entity it has open (`None` for a new one).
    pub fn scoped(&self, screen: impl Into<String>, entity_id: Option<DbId>) -> Self {
        Self {
            sender: self.sender.clone(),
            screen: Some(screen.into()),
            entity_id,
        }
    }

    /// Publish a notification to all current subscribers.
    ///
    /// With no subscribers the notification is only logged.
    pub fn publish(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Error => {
                tracing::warn!(message = %notification.message, "Error notification");
            }
            NotificationLevel::Success => {
                tracing::info!(message = %notification.message, "Success notification");
            }
        }
        // A SendError only means there are zero receivers.
        let _ = self.sender.send(notification);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    fn raise(&self, level: NotificationLevel, message: &str) {
        let notification = match &self.screen {
            Some(screen) => {
                Notification::new(level, message).with_source(screen.clone(), self.entity_id)
            }
            None => Notification::new(level, message),
        };
        self.publish(notification);
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Notifier for NotificationBus {
    fn error(&self, message: &str) {
        self.raise(NotificationLevel::Error, message);
    }

    fn success(&self, message: &str) {
        self.raise(NotificationLevel::Success, message);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
