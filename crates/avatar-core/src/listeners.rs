//! Ordered listener registry.
//!
//! Listeners are plain closures keyed by [`NotificationKind`]. Delivery is
//! synchronous and follows registration order across all kinds, so a
//! listener registered for every kind and one registered for a single
//! kind interleave exactly as they were added.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use avatar_types::{Notification, NotificationKind};
use parking_lot::RwLock;

/// Callback invoked with each matching notification.
///
/// Listeners run inside the state machine's critical section. They may
/// call `get_state` but must not call mutating operations or
/// `has_pending_reset`, which take the same lock.
pub type Listener = Arc<dyn Fn(&Notification) + Send + Sync>;

/// Handle returned by a subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

/// Which notifications a registration receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Filter {
    Only(NotificationKind),
    All,
}

impl Filter {
    fn matches(self, kind: NotificationKind) -> bool {
        match self {
            Self::Only(k) => k == kind,
            Self::All => true,
        }
    }
}

struct Registration {
    id: ListenerId,
    filter: Filter,
    listener: Listener,
}

/// Registry of notification listeners.
#[derive(Default)]
pub struct ListenerRegistry {
    entries: RwLock<Vec<Registration>>,
    next_id: AtomicU64,
}

impl ListenerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for notifications of `kind`.
    pub fn subscribe(&self, kind: NotificationKind, listener: Listener) -> ListenerId {
        self.push(Filter::Only(kind), listener)
    }

    /// Register `listener` for every notification kind.
    pub fn subscribe_all(&self, listener: Listener) -> ListenerId {
        self.push(Filter::All, listener)
    }

    /// Remove a registration. Returns `false` if `id` was not registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|r| r.id != id);
        entries.len() != before
    }

    /// Number of registrations.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Deliver `notification` to every matching listener in registration
    /// order.
    ///
    /// The matching set is captured before delivery so a listener may
    /// subscribe or unsubscribe without deadlocking; changes apply from the
    /// next emission.
    pub fn emit(&self, notification: &Notification) {
        let kind = notification.kind();
        let targets: Vec<Listener> = self
            .entries
            .read()
            .iter()
            .filter(|r| r.filter.matches(kind))
            .map(|r| Arc::clone(&r.listener))
            .collect();

        for listener in targets {
            listener(notification);
        }
    }

    fn push(&self, filter: Filter, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries.write().push(Registration {
            id,
            filter,
            listener,
        });
        id
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avatar_types::{Animation, Emotion};
    use parking_lot::Mutex;

    fn recorder(log: &Arc<Mutex<Vec<String>>>, tag: &'static str) -> Listener {
        let log = Arc::clone(log);
        Arc::new(move |n: &Notification| {
            log.lock().push(format!("{tag}:{}", n.kind().as_str()));
        })
    }

    #[test]
    fn delivers_only_matching_kinds() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ListenerRegistry::new();
        registry.subscribe(NotificationKind::EmotionChange, recorder(&log, "emo"));

        registry.emit(&Notification::AnimationChange {
            animation: Animation::Dancing,
        });
        registry.emit(&Notification::EmotionChange {
            emotion: Emotion::Sad,
        });

        assert_eq!(*log.lock(), vec![String::from("emo:emotion_change")]);
    }

    #[test]
    fn delivers_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ListenerRegistry::new();
        registry.subscribe(NotificationKind::StateReset, recorder(&log, "a"));
        registry.subscribe_all(recorder(&log, "b"));
        registry.subscribe(NotificationKind::StateReset, recorder(&log, "c"));

        registry.emit(&Notification::StateReset {
            emotion: Emotion::Neutral,
            animation: Animation::None,
        });

        assert_eq!(
            *log.lock(),
            vec![
                String::from("a:state_reset"),
                String::from("b:state_reset"),
                String::from("c:state_reset"),
            ]
        );
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ListenerRegistry::new();
        let id = registry.subscribe_all(recorder(&log, "x"));

        assert!(registry.unsubscribe(id));
        assert!(!registry.unsubscribe(id));
        assert!(registry.is_empty());

        registry.emit(&Notification::AudioChange { audio_cue: None });
        assert!(log.lock().is_empty());
    }

    #[test]
    fn listener_may_subscribe_during_emit() {
        let registry = Arc::new(ListenerRegistry::new());
        let inner = Arc::clone(&registry);
        registry.subscribe_all(Arc::new(move |_n: &Notification| {
            inner.subscribe_all(Arc::new(|_n: &Notification| {}));
        }));

        registry.emit(&Notification::AudioChange { audio_cue: None });
        assert_eq!(registry.len(), 2);
    }
}
