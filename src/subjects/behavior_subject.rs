use std::{
    collections::VecDeque,
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

struct BehaviorState<T> {
    core: SubjectCore<T>,
    value: T,
}

impl<T: Send + 'static> SubjectState for BehaviorState<T> {
    type Item = T;

    fn core(&mut self) -> &mut SubjectCore<T> {
        &mut self.core
    }
}

/// Subject variant that always holds a current value.
///
/// A `BehaviorSubject` is created with an initial value. Every new subscriber
/// immediately receives the latest value, then the values emitted after it
/// subscribed. `next` stores the value before notifying current subscribers.
///
/// Once completed or errored, new subscribers only receive the terminal
/// notification.
///
/// # Example
///
///```no_run
/// use rxcore::{BehaviorSubject, Observer, Subscribeable};
///
/// let mut subject = BehaviorSubject::new(9);
///
/// subject.subscribe(|v: i32| println!("Subscriber 1: {}", v)); // Receives 9.
///
/// subject.next(10); // Subscriber 1 receives 10.
///
/// subject.subscribe(|v: i32| println!("Subscriber 2: {}", v)); // Receives 10.
///
/// subject.next(11); // Both receive 11.
/// assert_eq!(subject.value(), 11);
///```
pub struct BehaviorSubject<T> {
    shared: Arc<Mutex<BehaviorState<T>>>,
}

impl<T> BehaviorSubject<T> {
    /// Creates a new `BehaviorSubject` holding `value`.
    pub fn new(value: T) -> Self {
        BehaviorSubject {
            shared: Arc::new(Mutex::new(BehaviorState {
                core: SubjectCore::new(),
                value,
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

impl<T: Clone> BehaviorSubject<T> {
    /// Returns the latest value.
    #[must_use]
    pub fn value(&self) -> T {
        lock(&self.shared).value.clone()
    }
}

impl<T> Clone for BehaviorSubject<T> {
    fn clone(&self) -> Self {
        BehaviorSubject {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for BehaviorSubject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.shared);
        f.debug_struct("BehaviorSubject")
            .field("value", &state.value)
            .field("observers", &state.core.len())
            .field("status", state.core.status())
            .finish()
    }
}

impl<T: Clone + Send + 'static> Subscribeable for BehaviorSubject<T> {
    type ObsType = T;

    fn subscribe(&mut self, s: impl IntoSubscriber<Self::ObsType>) -> Subscription {
        let mut subscriber = s.into_subscriber().rebind();

        let key = {
            let mut state = lock(&self.shared);
            if !state.core.is_active() {
                let status = state.core.status().clone();
                drop(state);
                status.notify(&mut subscriber);
                return subscriber.subscription().clone();
            }
            let current = state.value.clone();
            state
                .core
                .insert_with_backlog(subscriber.clone(), VecDeque::from([current]))
        };
        let subscription = subject_core::track_removal(&self.shared, &subscriber, key);

        // Values emitted before the current value went out, from any thread or
        // from inside this handler, follow it in order.
        subject_core::catch_up(&self.shared, &mut subscriber, key);
        subscription
    }
}

impl<T: Clone> Observer for BehaviorSubject<T> {
    type NextFnType = T;

    fn next(&mut self, v: Self::NextFnType) {
        let observers = {
            let mut state = lock(&self.shared);
            if !state.core.is_active() {
                return;
            }
            state.value = v.clone();
            state.core.dispatch(&v)
        };
        for mut o in observers {
            o.next(v.clone());
        }
    }

    fn error(&mut self, e: SharedError) {
        let status = SubjectStatus::Errored(e);
        let observers = lock(&self.shared).core.terminate(status.clone());
        if let Some(observers) = observers {
            subject_core::notify_all(observers, &status);
        }
    }

    fn complete(&mut self) {
        let observers = lock(&self.shared).core.terminate(SubjectStatus::Completed);
        if let Some(observers) = observers {
            subject_core::notify_all(observers, &SubjectStatus::Completed);
        }
    }
}

impl<T: Clone + Send + 'static> IntoSubscriber<T> for BehaviorSubject<T> {
    fn into_subscriber(self) -> Subscriber<T> {
        subject_core::forwarding_subscriber(self)
    }
}

impl<T: Clone + Send + 'static> From<BehaviorSubject<T>> for Observable<T> {
    fn from(mut value: BehaviorSubject<T>) -> Self {
        Observable::new(move |subscriber| value.subscribe(subscriber))
    }
}
