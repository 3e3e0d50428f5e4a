use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use tracing::trace;

use crate::{
    lock,
    observer::Observer,
    subscription::subscribe::{Subscriber, Subscription, UnsubscribeLogic},
    SharedError,
};

/// Lifecycle state of a subject.
///
/// A subject starts `Active` and moves at most once to `Completed` or
/// `Errored`. There is no way back.
#[derive(Clone, Debug, Default)]
pub enum SubjectStatus {
    /// Values are multicast to the registered subscribers.
    #[default]
    Active,

    /// `complete` was called. Late subscribers are completed immediately.
    Completed,

    /// `error` was called. Late subscribers receive the stored error.
    Errored(SharedError),
}

impl SubjectStatus {
    /// Returns `true` while the subject still accepts values.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, SubjectStatus::Active)
    }

    /// Returns `true` once the subject completed or errored.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        !self.is_active()
    }

    /// Delivers the stored terminal outcome to `subscriber`. Does nothing
    /// while active.
    pub(super) fn notify<T>(&self, subscriber: &mut Subscriber<T>) {
        match self {
            SubjectStatus::Active => (),
            SubjectStatus::Completed => subscriber.complete(),
            SubjectStatus::Errored(e) => subscriber.error(Arc::clone(e)),
        }
    }
}

struct Registered<T> {
    key: u64,
    subscriber: Subscriber<T>,
    // Values still owed to a subscriber that is catching up. While present,
    // `next` queues here instead of delivering.
    backlog: Option<VecDeque<T>>,
}

/// Next step for a subscriber draining its backlog.
enum CatchUp<T> {
    Value(T),
    Terminal(SubjectStatus),
    Live,
}

/// Subscriber set and status shared by every subject variant.
pub(super) struct SubjectCore<T> {
    observers: Vec<Registered<T>>,
    status: SubjectStatus,
    next_key: u64,
}

impl<T> SubjectCore<T> {
    pub(super) fn new() -> Self {
        SubjectCore {
            observers: Vec::with_capacity(16),
            status: SubjectStatus::Active,
            next_key: 0,
        }
    }

    pub(super) fn status(&self) -> &SubjectStatus {
        &self.status
    }

    pub(super) fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub(super) fn len(&self) -> usize {
        self.observers.len()
    }

    /// Adds a subscriber and returns its removal key. Pair with
    /// [`track_removal`] once the lock is released.
    pub(super) fn insert(&mut self, subscriber: Subscriber<T>) -> u64 {
        self.register(subscriber, None)
    }

    /// Adds a subscriber that first has to receive `backlog`. Values emitted
    /// until [`catch_up`] drained it are queued behind the backlog.
    pub(super) fn insert_with_backlog(
        &mut self,
        subscriber: Subscriber<T>,
        backlog: VecDeque<T>,
    ) -> u64 {
        self.register(subscriber, Some(backlog))
    }

    fn register(&mut self, subscriber: Subscriber<T>, backlog: Option<VecDeque<T>>) -> u64 {
        let key = self.next_key;
        self.next_key += 1;
        self.observers.push(Registered {
            key,
            subscriber,
            backlog,
        });
        key
    }

    fn remove(&mut self, key: u64) {
        self.observers.retain(|r| r.key != key);
    }

    /// Queues `v` for subscribers still catching up and returns the live ones
    /// in subscription order. Delivery works on the returned copy so handlers
    /// can subscribe, unsubscribe or emit re-entrantly.
    pub(super) fn dispatch(&mut self, v: &T) -> Vec<Subscriber<T>>
    where
        T: Clone,
    {
        let mut live = Vec::with_capacity(self.observers.len());
        for r in &mut self.observers {
            match &mut r.backlog {
                Some(backlog) => backlog.push_back(v.clone()),
                None => live.push(r.subscriber.clone()),
            }
        }
        live
    }

    /// Moves to `status` and hands back the live subscribers that have to be
    /// notified. Subscribers still catching up stay registered and get the
    /// terminal notification after their backlog. Returns `None` if the
    /// subject already terminated.
    pub(super) fn terminate(&mut self, status: SubjectStatus) -> Option<Vec<Subscriber<T>>> {
        if !self.is_active() {
            return None;
        }
        trace!(
            observers = self.observers.len(),
            errored = matches!(status, SubjectStatus::Errored(_)),
            "subject terminated"
        );
        self.status = status;
        let (catching_up, live): (Vec<_>, Vec<_>) = std::mem::take(&mut self.observers)
            .into_iter()
            .partition(|r| r.backlog.is_some());
        self.observers = catching_up;
        Some(live.into_iter().map(|r| r.subscriber).collect())
    }

    fn catch_up_step(&mut self, key: u64) -> CatchUp<T> {
        let Some(pos) = self.observers.iter().position(|r| r.key == key) else {
            return CatchUp::Live;
        };
        let entry = &mut self.observers[pos];
        if let Some(v) = entry.backlog.as_mut().and_then(VecDeque::pop_front) {
            return CatchUp::Value(v);
        }
        if self.status.is_active() {
            entry.backlog = None;
            return CatchUp::Live;
        }
        self.observers.remove(pos);
        CatchUp::Terminal(self.status.clone())
    }
}

/// Gives the generic subscribe helpers access to the core of a variant's state.
pub(super) trait SubjectState: Send + 'static {
    type Item;

    fn core(&mut self) -> &mut SubjectCore<Self::Item>;
}

impl<T: Send + 'static> SubjectState for SubjectCore<T> {
    type Item = T;

    fn core(&mut self) -> &mut SubjectCore<T> {
        self
    }
}

/// Ties removal of the subscriber stored under `key` to its subscription and
/// returns that subscription.
///
/// The lock must not be held when calling this; if the subscription is
/// already closed the removal logic runs right away and needs the lock.
pub(super) fn track_removal<S: SubjectState>(
    shared: &Arc<Mutex<S>>,
    subscriber: &Subscriber<S::Item>,
    key: u64,
) -> Subscription {
    let subscription = subscriber.subscription().clone();
    let weak = Arc::downgrade(shared);
    subscription.add(UnsubscribeLogic::Logic(Box::new(move || {
        if let Some(shared) = weak.upgrade() {
            lock(&shared).core().remove(key);
        }
    })));
    subscription
}

/// Delivers the backlog of the subscriber stored under `key`, one value at a
/// time with the lock released, then switches it to live delivery.
///
/// Values emitted meanwhile, from other threads or from the subscriber's own
/// handler, are queued behind the backlog, so the subscriber sees everything
/// in emission order. A subject terminated meanwhile is reported once the
/// backlog is empty.
pub(super) fn catch_up<S: SubjectState>(
    shared: &Arc<Mutex<S>>,
    subscriber: &mut Subscriber<S::Item>,
    key: u64,
) {
    loop {
        let step = lock(shared).core().catch_up_step(key);
        match step {
            CatchUp::Value(v) => subscriber.next(v),
            CatchUp::Terminal(status) => {
                status.notify(subscriber);
                return;
            }
            CatchUp::Live => return,
        }
    }
}

/// Delivers a terminal notification to subscribers taken out by
/// [`SubjectCore::terminate`].
pub(super) fn notify_all<T>(observers: Vec<Subscriber<T>>, status: &SubjectStatus) {
    for mut o in observers {
        status.notify(&mut o);
    }
}

/// Builds a `Subscriber` forwarding every notification to `observer`. Used to
/// feed a subject from another stream.
pub(super) fn forwarding_subscriber<O>(observer: O) -> Subscriber<O::NextFnType>
where
    O: Observer + Clone + Send + Sync + 'static,
{
    let on_next = observer.clone();
    let on_error = observer.clone();
    Subscriber::new(
        move |v| on_next.clone().next(v),
        move |e| on_error.clone().error(e),
        move || observer.clone().complete(),
    )
}
