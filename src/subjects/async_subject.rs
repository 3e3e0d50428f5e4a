use std::{
    fmt,
    sync::{Arc, Mutex},
};

use crate::{
    lock,
    observer::Observer,
    subscription::subscribe::{IntoSubscriber, Subscribeable, Subscriber, Subscription},
    Observable, SharedError,
};

use super::subject_core::{self, SubjectCore, SubjectState, SubjectStatus};

struct AsyncState<T> {
    core: SubjectCore<T>,
    value: Option<T>,
}

impl<T: Send + 'static> SubjectState for AsyncState<T> {
    type Item = T;

    fn core(&mut self) -> &mut SubjectCore<T> {
        &mut self.core
    }
}

/// Subject variant that only emits its last value, and only on completion.
///
/// `next` stores the value without notifying anyone. `complete` sends the last
/// stored value, if there is one, to every subscriber followed by the
/// completion. Subscribers arriving after completion receive the same value
/// and completion right away.
///
/// `error` discards the stored value: current and later subscribers only see
/// the error.
///
/// # Example
///
///```no_run
/// use rxcore::{AsyncSubject, Observer, Subscribeable};
///
/// let mut subject = AsyncSubject::new();
///
/// subject.subscribe(|v: i32| println!("Subscriber 1: {}", v));
///
/// subject.next(1); // Stored, nothing is emitted.
/// subject.next(2); // Replaces 1, nothing is emitted.
///
/// subject.complete(); // Subscriber 1 receives 2, then completes.
///
/// // Receives 2 and completes immediately.
/// subject.subscribe(|v: i32| println!("Subscriber 2: {}", v));
///```
pub struct AsyncSubject<T> {
    shared: Arc<Mutex<AsyncState<T>>>,
}

impl<T> AsyncSubject<T> {
    /// Creates a new `AsyncSubject` with no stored value.
    #[must_use]
    pub fn new() -> Self {
        AsyncSubject {
            shared: Arc::new(Mutex::new(AsyncState {
                core: SubjectCore::new(),
                value: None,
            })),
        }
    }

    /// Returns the number of registered observers.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.shared).core.len()
    }

    /// Returns `true` if no observers are registered, `false` otherwise.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the current state of the subject.
    #[must_use]
    pub fn status(&self) -> SubjectStatus {
        lock(&self.shared).core.status().clone()
    }
}

impl<T> Default for AsyncSubject<T> {
    fn default() -> Self {
        AsyncSubject::new()
    }
}

impl<T> Clone for AsyncSubject<T> {
    fn clone(&self) -> Self {
        AsyncSubject {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for AsyncSubject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.shared);
        f.debug_struct("AsyncSubject")
            .field("has_value", &state.value.is_some())
            .field("observers", &state.core.len())
            .field("status", state.core.status())
            .finish()
    }
}

impl<T: Clone + Send + 'static> Subscribeable for AsyncSubject<T> {
    type ObsType = T;

    fn subscribe(&mut self, s: impl IntoSubscriber<Self::ObsType>) -> Subscription {
        let mut subscriber = s.into_subscriber().rebind();

        let key = {
            let mut state = lock(&self.shared);
            if !state.core.is_active() {
                let status = state.core.status().clone();
                let value = state.value.clone();
                drop(state);
                if let (SubjectStatus::Completed, Some(v)) = (&status, value) {
                    subscriber.next(v);
                }
                status.notify(&mut subscriber);
                return subscriber.subscription().clone();
            }
            state.core.insert(subscriber.clone())
        };
        subject_core::track_removal(&self.shared, &subscriber, key)
    }
}

impl<T: Clone> Observer for AsyncSubject<T> {
    type NextFnType = T;

    fn next(&mut self, v: Self::NextFnType) {
        let mut state = lock(&self.shared);
        if state.core.is_active() {
            state.value = Some(v);
        }
    }

    fn error(&mut self, e: SharedError) {
        let status = SubjectStatus::Errored(e);
        let observers = {
            let mut state = lock(&self.shared);
            let observers = state.core.terminate(status.clone());
            if observers.is_some() {
                state.value = None;
            }
            observers
        };
        if let Some(observers) = observers {
            subject_core::notify_all(observers, &status);
        }
    }

    fn complete(&mut self) {
        let (observers, value) = {
            let mut state = lock(&self.shared);
            let observers = state.core.terminate(SubjectStatus::Completed);
            (observers, state.value.clone())
        };
        let Some(observers) = observers else {
            return;
        };
        for mut o in observers {
            if let Some(v) = &value {
                o.next(v.clone());
            }
            o.complete();
        }
    }
}

impl<T: Clone + Send + 'static> IntoSubscriber<T> for AsyncSubject<T> {
    fn into_subscriber(self) -> Subscriber<T> {
        subject_core::forwarding_subscriber(self)
    }
}

impl<T: Clone + Send + 'static> From<AsyncSubject<T>> for Observable<T> {
    fn from(mut value: AsyncSubject<T>) -> Self {
        Observable::new(move |subscriber| value.subscribe(subscriber))
    }
}
