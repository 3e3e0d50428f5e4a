use std::{
    collections::VecDeque,
    fmt,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use crate::{
    lock,
    observer::Observer,
    subscription::subscribe::{IntoSubscriber, Subscribeable, Subscriber, Subscription},
    Observable, SharedError,
};

use super::subject_core::{self, SubjectCore, SubjectState, SubjectStatus};

struct EmittedValueEntry<T>(T, Instant);

impl<T> EmittedValueEntry<T> {
    fn new(v: T) -> Self {
        EmittedValueEntry(v, Instant::now())
    }

    fn is_fresh(&self, window: Duration) -> bool {
        self.1.elapsed() <= window
    }
}

/// Specifies the buffer size for replaying previous emissions in `ReplaySubject`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BufSize {
    /// Specifies an infinite buffer size, allowing all emitted values to be replayed.
    #[default]
    Unbounded,

    /// Specifies a limited buffer size with the maximum number of values to be replayed.
    /// `Bounded(0)` keeps nothing.
    Bounded(usize),
}

struct ReplayState<T> {
    core: SubjectCore<T>,
    buf_size: BufSize,
    window: Option<Duration>,
    values: VecDeque<EmittedValueEntry<T>>,
}

impl<T> ReplayState<T> {
    fn push(&mut self, v: T) {
        self.drop_stale();
        if let BufSize::Bounded(buf_size) = self.buf_size {
            if buf_size == 0 {
                return;
            }
            while self.values.len() >= buf_size {
                self.values.pop_front();
            }
        }
        self.values.push_back(EmittedValueEntry::new(v));
    }

    fn drop_stale(&mut self) {
        if let Some(window) = self.window {
            self.values.retain(|e| e.is_fresh(window));
        }
    }
}

impl<T: Send + 'static> SubjectState for ReplayState<T> {
    type Item = T;

    fn core(&mut self) -> &mut SubjectCore<T> {
        &mut self.core
    }
}

/// Replaying old values to new subscribers, this variant of `Subject` emits these
/// values upon subscription.
///
/// This specialized variant of a `Subject` maintains a buffer of previous values
/// and transmits them, in emission order, to new subscribers upon subscription.
/// After that the subscriber receives values live, like with a plain `Subject`.
/// When the buffer is full the oldest value is evicted.
///
/// Even when in a stopped state due to completion or an error, `ReplaySubject`
/// replays buffered values before notifying new subscribers of completion or an
/// error.
///
/// When creating a `ReplaySubject`, you have the option to set the buffer size and
/// the duration to retain a value in the buffer.
///
/// # Example
///
///```no_run
/// use rxcore::{BufSize, Observer, ReplaySubject, Subscribeable};
///
/// let mut subject = ReplaySubject::new(BufSize::Bounded(2));
///
/// subject.next(1);
/// subject.next(2);
/// subject.next(3);
///
/// // Receives 2 and 3 right away, then 4.
/// subject.subscribe(|v: i32| println!("Subscriber: {}", v));
/// subject.next(4);
///```
pub struct ReplaySubject<T> {
    shared: Arc<Mutex<ReplayState<T>>>,
}

impl<T> ReplaySubject<T> {
    /// Creates a `ReplaySubject` with a specified buffer size.
    ///
    /// A buffer size of `BufSize::Unbounded` means an infinite buffer, retaining
    /// all past values for replay.
    #[must_use]
    pub fn new(buf_size: BufSize) -> Self {
        ReplaySubject::create(buf_size, None)
    }

    /// Creates a `ReplaySubject` with a buffer and a time window controlling
    /// how long values stay in the buffer.
    ///
    /// Values older than `window` are dropped whenever a value is buffered and
    /// before the buffer is replayed to a new subscriber.
    #[must_use]
    pub fn with_window(buf_size: BufSize, window: Duration) -> Self {
        ReplaySubject::create(buf_size, Some(window))
    }

    fn create(buf_size: BufSize, window: Option<Duration>) -> Self {
        let values = match buf_size {
            BufSize::Unbounded => VecDeque::with_capacity(16),
            BufSize::Bounded(size) => VecDeque::with_capacity(size),
        };
        ReplaySubject {
            shared: Arc::new(Mutex::new(ReplayState {
                core: SubjectCore::new(),
                buf_size,
                window,
                values,
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

impl<T> Default for ReplaySubject<T> {
    fn default() -> Self {
        ReplaySubject::new(BufSize::Unbounded)
    }
}

impl<T> Clone for ReplaySubject<T> {
    fn clone(&self) -> Self {
        ReplaySubject {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for ReplaySubject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.shared);
        f.debug_struct("ReplaySubject")
            .field("buf_size", &state.buf_size)
            .field("window", &state.window)
            .field("buffered", &state.values.len())
            .field("observers", &state.core.len())
            .field("status", state.core.status())
            .finish()
    }
}

impl<T: Clone + Send + 'static> Subscribeable for ReplaySubject<T> {
    type ObsType = T;

    fn subscribe(&mut self, s: impl IntoSubscriber<Self::ObsType>) -> Subscription {
        let mut subscriber = s.into_subscriber().rebind();

        let (buffered, status) = {
            let mut state = lock(&self.shared);
            state.drop_stale();
            let buffered: VecDeque<T> = state.values.iter().map(|e| e.0.clone()).collect();
            if state.core.is_active() {
                let key = state.core.insert_with_backlog(subscriber.clone(), buffered);
                drop(state);
                let subscription = subject_core::track_removal(&self.shared, &subscriber, key);
                subject_core::catch_up(&self.shared, &mut subscriber, key);
                return subscription;
            }
            (buffered, state.core.status().clone())
        };

        // Buffered values are replayed even after the subject terminated.
        for v in buffered {
            subscriber.next(v);
        }
        status.notify(&mut subscriber);
        subscriber.subscription().clone()
    }
}

impl<T: Clone> Observer for ReplaySubject<T> {
    type NextFnType = T;

    fn next(&mut self, v: Self::NextFnType) {
        let observers = {
            let mut state = lock(&self.shared);
            if !state.core.is_active() {
                return;
            }
            state.push(v.clone());
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

impl<T: Clone + Send + 'static> IntoSubscriber<T> for ReplaySubject<T> {
    fn into_subscriber(self) -> Subscriber<T> {
        subject_core::forwarding_subscriber(self)
    }
}

impl<T: Clone + Send + 'static> From<ReplaySubject<T>> for Observable<T> {
    fn from(mut value: ReplaySubject<T>) -> Self {
        Observable::new(move |subscriber| value.subscribe(subscriber))
    }
}
