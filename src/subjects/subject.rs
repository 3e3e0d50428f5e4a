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

use super::subject_core::{self, SubjectCore, SubjectStatus};

/// A `Subject` represents a unique variant of an `Observable` that enables
/// multicasting values to multiple `Observers`.
///
/// Unlike regular `Observables`, which are unicast (each subscribed `Observer` has
/// its independent execution of the `Observable`), `Subjects` are multicast. A
/// value passed to `next` reaches exactly the subscribers registered at that
/// moment, in the order they subscribed.
///
/// A `Subject` is both an [`Observer`] and [`Subscribeable`]. Clones are
/// shallow: every clone drives and observes the same subject.
///
/// If an error is encountered, `Subject` will not emit any items to future
/// subscriptions. Instead, it will just pass along the error notification to
/// these new subscriptions. The same goes for completion.
///
/// # Examples
///
/// Subject completion
///
///```no_run
/// use rxcore::{subscribe::Subscriber, Observer, Subject, Subscribeable};
///
/// pub fn create_subscriber(subscriber_id: i32) -> Subscriber<i32> {
///     Subscriber::new(
///         move |v| println!("Subscriber #{} emitted: {}", subscriber_id, v),
///         |_| eprintln!("Error"),
///         move || println!("Completed {}", subscriber_id),
///     )
/// }
///
/// let mut subject = Subject::new();
///
/// // Registers `Subscriber` 1.
/// subject.subscribe(create_subscriber(1));
///
/// subject.next(101); // Emits 101 to registered `Subscriber` 1.
/// subject.next(102); // Emits 102 to registered `Subscriber` 1.
///
/// // Registers `Subscriber` 2.
/// subject.subscribe(create_subscriber(2));
///
/// subject.next(103); // Emits 103 to registered `Subscriber`'s 1 and 2.
///
/// subject.complete(); // Calls `complete` on registered `Subscriber`'s 1 and 2.
///
/// // Subscriber 3: post-completion subscribe, completes immediately.
/// subject.subscribe(create_subscriber(3));
///
/// subject.next(104); // Called post-completion, does not emit.
///```
///
/// Utilizing a Subject as an Observer. This can be done with any variant of Subject.
///
///```no_run
/// use rxcore::{
///     subscribe::{Subscriber, Subscription},
///     Observable, Observer, Subject, Subscribeable,
/// };
///
/// let mut observable = Observable::new(|mut o: Subscriber<_>| {
///     for i in 0..=10 {
///         o.next(i);
///     }
///     o.complete();
///     Subscription::default()
/// });
///
/// let mut subject = Subject::new();
/// subject.subscribe(|v: i32| println!("Subscriber 1: {}", v));
/// subject.subscribe(|v: i32| println!("Subscriber 2: {}", v));
///
/// // Every value of the observable is multicast to both subscribers.
/// observable.subscribe(subject);
///```
pub struct Subject<T> {
    shared: Arc<Mutex<SubjectCore<T>>>,
}

impl<T> Subject<T> {
    /// Creates a new, active `Subject` without subscribers.
    #[must_use]
    pub fn new() -> Self {
        Subject {
            shared: Arc::new(Mutex::new(SubjectCore::new())),
        }
    }

    /// Returns the number of registered observers.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.shared).len()
    }

    /// Returns `true` if no observers are registered, `false` otherwise.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the current state of the subject.
    #[must_use]
    pub fn status(&self) -> SubjectStatus {
        lock(&self.shared).status().clone()
    }
}

impl<T> Default for Subject<T> {
    fn default() -> Self {
        Subject::new()
    }
}

impl<T> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Subject {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for Subject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.shared);
        f.debug_struct("Subject")
            .field("observers", &state.len())
            .field("status", state.status())
            .finish()
    }
}

impl<T: Send + 'static> Subscribeable for Subject<T> {
    type ObsType = T;

    fn subscribe(&mut self, s: impl IntoSubscriber<Self::ObsType>) -> Subscription {
        let mut subscriber = s.into_subscriber().rebind();

        let key = {
            let mut state = lock(&self.shared);
            if !state.is_active() {
                let status = state.status().clone();
                drop(state);
                status.notify(&mut subscriber);
                return subscriber.subscription().clone();
            }
            state.insert(subscriber.clone())
        };
        subject_core::track_removal(&self.shared, &subscriber, key)
    }
}

impl<T: Clone> Observer for Subject<T> {
    type NextFnType = T;

    fn next(&mut self, v: Self::NextFnType) {
        let observers = {
            let mut state = lock(&self.shared);
            if !state.is_active() {
                return;
            }
            state.dispatch(&v)
        };
        for mut o in observers {
            o.next(v.clone());
        }
    }

    fn error(&mut self, e: SharedError) {
        let status = SubjectStatus::Errored(e);
        let observers = lock(&self.shared).terminate(status.clone());
        if let Some(observers) = observers {
            subject_core::notify_all(observers, &status);
        }
    }

    fn complete(&mut self) {
        let observers = lock(&self.shared).terminate(SubjectStatus::Completed);
        if let Some(observers) = observers {
            subject_core::notify_all(observers, &SubjectStatus::Completed);
        }
    }
}

impl<T: Clone + Send + 'static> IntoSubscriber<T> for Subject<T> {
    fn into_subscriber(self) -> Subscriber<T> {
        subject_core::forwarding_subscriber(self)
    }
}

impl<T: Send + 'static> From<Subject<T>> for Observable<T> {
    fn from(mut value: Subject<T>) -> Self {
        Observable::new(move |subscriber| value.subscribe(subscriber))
    }
}
