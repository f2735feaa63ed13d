//! Callback subscriptions for game notifications.
//!
//! Callers register with [`NotificationBus::on`]; the engine emits turn and
//! lifecycle notifications itself and one notification per logged event
//! whose kind maps to a [`NotificationKind`].

use std::collections::BTreeMap;

use realpolitik_types::{CivId, GameEvent, NotificationKind};
use serde::Serialize;

/// A notification handed to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    /// What happened.
    pub kind: NotificationKind,
    /// Turn it happened on.
    pub turn: u64,
    /// The underlying event, for event-driven notifications.
    pub event: Option<GameEvent>,
    /// Winner, on game end.
    pub winner: Option<CivId>,
}

impl Notification {
    /// A notification with no payload.
    pub const fn bare(kind: NotificationKind, turn: u64) -> Self {
        Self {
            kind,
            turn,
            event: None,
            winner: None,
        }
    }
}

/// Subscriber callback.
pub type Callback = Box<dyn Fn(&Notification) + Send + Sync>;

/// Subscriptions keyed by notification kind.
#[derive(Default)]
pub struct NotificationBus {
    subscribers: BTreeMap<NotificationKind, Vec<Callback>>,
}

impl std::fmt::Debug for NotificationBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: BTreeMap<&NotificationKind, usize> =
            self.subscribers.iter().map(|(k, v)| (k, v.len())).collect();
        f.debug_struct("NotificationBus")
            .field("subscribers", &counts)
            .finish()
    }
}

impl NotificationBus {
    /// Empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `callback` to `kind`.
    pub fn on(&mut self, kind: NotificationKind, callback: Callback) {
        self.subscribers.entry(kind).or_default().push(callback);
    }

    /// Deliver `notification` to every subscriber of its kind.
    pub fn emit(&self, notification: &Notification) {
        if let Some(callbacks) = self.subscribers.get(&notification.kind) {
            for callback in callbacks {
                callback(notification);
            }
        }
    }

    /// Emit one notification per event that maps to a kind.
    pub fn emit_events(&self, events: &[GameEvent]) {
        for event in events {
            if let Some(kind) = event.kind.notification() {
                self.emit(&Notification {
                    kind,
                    turn: event.turn,
                    event: Some(event.clone()),
                    winner: None,
                });
            }
        }
    }
}
