//! The avatar state machine and its inactivity timer.
//!
//! # Critical section
//!
//! Every mutating call (the three setters and [`reset_to_neutral`]) runs
//! under one mutex that also guards the timer slot. Inside it the call
//! cancels any pending reset, commits the new state, emits the
//! notification, and (setters only) arms a fresh reset. Two mutations can
//! therefore never interleave, and at most one reset is pending at any
//! instant.
//!
//! # Stale fires
//!
//! Each armed reset captures the slot's generation number. Cancelling bumps
//! the generation and aborts the task, but a task that already woke up may
//! be blocked on the mutex at that moment. When it gets the lock it
//! compares its generation with the current one and does nothing if they
//! differ.
//!
//! Reads ([`get_state`]) take a separate read lock on the state record, so
//! a listener may read the freshly committed state from inside its
//! callback.
//!
//! [`reset_to_neutral`]: AvatarStateMachine::reset_to_neutral
//! [`get_state`]: AvatarStateMachine::get_state

use std::sync::{Arc, Weak};
use std::time::Duration;

use avatar_types::{Animation, AvatarState, Emotion, Notification, NotificationKind};
use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::error::StateError;
use crate::listeners::{Listener, ListenerId, ListenerRegistry};

/// Idle period after which the avatar reverts to its resting state.
pub const DEFAULT_ACTIVITY_TIMEOUT: Duration = Duration::from_secs(30);

/// The single outstanding-reset slot.
#[derive(Debug, Default)]
struct TimerSlot {
    /// Bumped on every cancel; a reset task only acts if its captured
    /// value still matches.
    generation: u64,
    /// The currently armed reset task, if any.
    pending: Option<JoinHandle<()>>,
}

impl TimerSlot {
    /// Invalidate the armed reset, if any. Cancelling after the reset
    /// already fired is a no-op.
    fn cancel(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

struct Inner {
    state: RwLock<AvatarState>,
    timer: Mutex<TimerSlot>,
    listeners: ListenerRegistry,
    activity_timeout: Duration,
    runtime: Handle,
}

/// Owner of the avatar state.
///
/// Cheap to clone; all clones share the same state, listeners, and timer.
#[derive(Clone)]
pub struct AvatarStateMachine {
    inner: Arc<Inner>,
}

impl AvatarStateMachine {
    /// Create a state machine at the resting state, scheduling resets on
    /// the current Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::NoRuntime`] when called outside a Tokio
    /// runtime.
    pub fn new(activity_timeout: Duration) -> Result<Self, StateError> {
        let runtime = Handle::try_current().map_err(|_e| StateError::NoRuntime)?;
        Ok(Self::with_handle(activity_timeout, runtime))
    }

    /// Create a state machine that schedules resets on `runtime`.
    pub fn with_handle(activity_timeout: Duration, runtime: Handle) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(AvatarState::default()),
                timer: Mutex::new(TimerSlot::default()),
                listeners: ListenerRegistry::new(),
                activity_timeout,
                runtime,
            }),
        }
    }

    /// The configured idle period.
    pub fn activity_timeout(&self) -> Duration {
        self.inner.activity_timeout
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Validate `value` against the emotion domain and apply it.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::InvalidDomainValue`] if `value` is not an
    /// emotion. The state, the timer, and the listeners are untouched.
    pub fn set_emotion(&self, value: &str) -> Result<(), StateError> {
        let emotion: Emotion = value.parse()?;
        self.apply_emotion(emotion);
        Ok(())
    }

    /// Apply an already-typed emotion.
    pub fn apply_emotion(&self, emotion: Emotion) {
        self.mutate(|state| {
            state.emotion = emotion;
            Notification::EmotionChange { emotion }
        });
    }

    /// Validate `value` against the animation domain and apply it.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::InvalidDomainValue`] if `value` is not an
    /// animation. The state, the timer, and the listeners are untouched.
    pub fn set_animation(&self, value: &str) -> Result<(), StateError> {
        let animation: Animation = value.parse()?;
        self.apply_animation(animation);
        Ok(())
    }

    /// Apply an already-typed animation.
    pub fn apply_animation(&self, animation: Animation) {
        self.mutate(|state| {
            state.animation = animation;
            Notification::AnimationChange { animation }
        });
    }

    /// Set or clear the audio cue.
    ///
    /// `None`, an empty string, or a whitespace-only string clears the cue.
    pub fn set_audio_cue(&self, value: Option<&str>) {
        let audio_cue = value
            .filter(|v| !v.trim().is_empty())
            .map(ToOwned::to_owned);
        self.mutate(|state| {
            state.audio_cue.clone_from(&audio_cue);
            Notification::AudioChange { audio_cue }
        });
    }

    /// Return to the resting state and emit `state_reset`.
    ///
    /// Idempotent. Cancels any pending reset and does not arm a new one.
    pub fn reset_to_neutral(&self) {
        let mut slot = self.inner.timer.lock();
        slot.cancel();
        self.commit_reset();
    }

    /// Cancel any pending reset without touching the state.
    pub fn shutdown(&self) {
        self.inner.timer.lock().cancel();
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Consistent snapshot of the current state.
    pub fn get_state(&self) -> AvatarState {
        self.inner.state.read().clone()
    }

    /// Whether an inactivity reset is currently armed.
    pub fn has_pending_reset(&self) -> bool {
        self.inner.timer.lock().pending.is_some()
    }

    // -----------------------------------------------------------------------
    // Listeners
    // -----------------------------------------------------------------------

    /// Register `listener` for notifications of `kind`.
    pub fn subscribe<F>(&self, kind: NotificationKind, listener: F) -> ListenerId
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        let listener: Listener = Arc::new(listener);
        self.inner.listeners.subscribe(kind, listener)
    }

    /// Register `listener` for every notification kind.
    pub fn subscribe_all<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        let listener: Listener = Arc::new(listener);
        self.inner.listeners.subscribe_all(listener)
    }

    /// Remove a registration. Returns `false` if `id` was not registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.inner.listeners.unsubscribe(id)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Cancel, commit, emit, rearm -- all under the mutation lock.
    fn mutate<F>(&self, apply: F)
    where
        F: FnOnce(&mut AvatarState) -> Notification,
    {
        let mut slot = self.inner.timer.lock();
        slot.cancel();

        let notification = {
            let mut state = self.inner.state.write();
            apply(&mut state)
        };
        self.inner.listeners.emit(&notification);

        self.arm(&mut slot);
    }

    /// Arm a reset for the slot's current generation. Caller holds the lock.
    fn arm(&self, slot: &mut TimerSlot) {
        let generation = slot.generation;
        let timeout = self.inner.activity_timeout;
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);

        let handle = self.inner.runtime.spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(inner) = weak.upgrade() {
                Self { inner }.fire(generation);
            }
        });
        slot.pending = Some(handle);
        trace!(generation, timeout_ms = timeout.as_millis(), "inactivity reset armed");
    }

    /// Timer callback. Acts only if no mutation happened since arming.
    fn fire(&self, generation: u64) {
        let mut slot = self.inner.timer.lock();
        if slot.generation != generation || slot.pending.is_none() {
            trace!(generation, current = slot.generation, "stale inactivity reset ignored");
            return;
        }
        // This task is the pending one; drop its handle instead of aborting
        // ourselves, then invalidate the generation.
        slot.pending = None;
        slot.cancel();
        debug!("inactivity timeout elapsed, resetting to neutral");
        self.commit_reset();
    }

    /// Write the resting state and emit `state_reset`. Caller holds the lock.
    fn commit_reset(&self) {
        let notification = {
            let mut state = self.inner.state.write();
            *state = AvatarState::default();
            Notification::StateReset {
                emotion: state.emotion,
                animation: state.animation,
            }
        };
        self.inner.listeners.emit(&notification);
    }
}

impl std::fmt::Debug for AvatarStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvatarStateMachine")
            .field("state", &*self.inner.state.read())
            .field("activity_timeout", &self.inner.activity_timeout)
            .field("listeners", &self.inner.listeners)
            .finish_non_exhaustive()
    }
}
