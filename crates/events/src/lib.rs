//! hrdesk notification fan-out.
//!
//! [`NotificationBus`] is the user-facing feedback sink for the details
//! screens: it implements the core [`Notifier`](hrdesk_core::ports::Notifier)
//! port and broadcasts every [`Notification`] to whoever renders toasts.

pub mod bus;

pub use bus::{Notification, NotificationBus, NotificationLevel};
