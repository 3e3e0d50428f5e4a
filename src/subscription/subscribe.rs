use std::{
    any::Any,
    fmt,
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    thread::JoinHandle as ThreadJoinHandle,
};

use tokio::runtime;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::{lock, observer::Observer, SharedError};

/// A trait for types that can be subscribed to, allowing consumers to receive
/// values emitted by an observable stream.
pub trait Subscribeable {
    /// The type of items emitted by the observable stream.
    type ObsType;

    /// Subscribes to the observable stream and specifies how to handle emitted values.
    ///
    /// Accepts a full [`Subscriber`] or a plain closure, which is used as the
    /// `next` handler. The returned [`Subscription`] cancels the subscription
    /// and, for asynchronous producers, can be used to await their completion.
    fn subscribe(&mut self, s: impl IntoSubscriber<Self::ObsType>) -> Subscription;
}

/// A trait for types that can be unsubscribed, allowing the clean release of resources
/// associated with a subscription.
pub trait Unsubscribeable {
    /// Unsubscribes and releases associated resources.
    ///
    /// Calling this more than once has no additional effect.
    fn unsubscribe(&self);
}

/// Conversion into a [`Subscriber`].
///
/// Implemented for `Subscriber` itself, for closures taking the emitted value
/// (used as the `next` handler, `error` and `complete` are ignored) and for
/// every subject type, so a subject can observe another stream.
pub trait IntoSubscriber<T> {
    fn into_subscriber(self) -> Subscriber<T>;
}

impl<T> IntoSubscriber<T> for Subscriber<T> {
    fn into_subscriber(self) -> Subscriber<T> {
        self
    }
}

impl<T, F> IntoSubscriber<T> for F
where
    F: Fn(T) + Send + Sync + 'static,
{
    fn into_subscriber(self) -> Subscriber<T> {
        Subscriber::on_next(self)
    }
}

type NextFn<T> = Arc<dyn Fn(T) + Send + Sync>;
type CompleteFn = Arc<dyn Fn() + Send + Sync>;
type ErrorFn = Arc<dyn Fn(SharedError) + Send + Sync>;

/// A type that acts as an observer, allowing users to handle emitted values, errors,
/// and completion when subscribing to an `Observable` or `Subject`.
///
/// Users can create a `Subscriber` instance using the `new` method and provide
/// custom functions to handle the `next`, `error`, and `complete` events. Missing
/// handlers are no-ops.
///
/// A `Subscriber` guards its handlers: once `error` or `complete` has been
/// delivered, or its subscription was unsubscribed, every further call is
/// dropped. Clones share that guard, so a producer may hand clones to timers or
/// threads freely.
///
/// Every `subscribe` call binds the handlers to a new guard, so the same
/// `Subscriber` (or its clones) can be subscribed several times and each
/// subscription stays independent.
pub struct Subscriber<NextFnType> {
    next_fn: Option<NextFn<NextFnType>>,
    complete_fn: Option<CompleteFn>,
    error_fn: Option<ErrorFn>,
    subscription: Subscription,
    bound: bool,
}

impl<NextFnType> Subscriber<NextFnType> {
    /// Creates a new `Subscriber` instance with custom handling functions for emitted
    /// values, errors, and completion.
    pub fn new(
        next_fn: impl Fn(NextFnType) + 'static + Send + Sync,
        error_fn: impl Fn(SharedError) + 'static + Send + Sync,
        complete_fn: impl Fn() + 'static + Send + Sync,
    ) -> Self {
        Subscriber {
            next_fn: Some(Arc::new(next_fn)),
            complete_fn: Some(Arc::new(complete_fn)),
            error_fn: Some(Arc::new(error_fn)),
            subscription: Subscription::default(),
            bound: false,
        }
    }

    /// Create a new Subscriber with the provided `next` function.
    ///
    /// The `next` closure is called when the observable emits a new item.
    pub fn on_next(next_fn: impl Fn(NextFnType) + 'static + Send + Sync) -> Self {
        Subscriber {
            next_fn: Some(Arc::new(next_fn)),
            complete_fn: None,
            error_fn: None,
            subscription: Subscription::default(),
            bound: false,
        }
    }

    /// Set the completion function for the Subscriber.
    pub fn on_complete(&mut self, complete_fn: impl Fn() + 'static + Send + Sync) {
        self.complete_fn = Some(Arc::new(complete_fn));
    }

    /// Set the error-handling function for the Subscriber.
    ///
    /// Without one, errors are swallowed and only logged.
    pub fn on_error(&mut self, error_fn: impl Fn(SharedError) + 'static + Send + Sync) {
        self.error_fn = Some(Arc::new(error_fn));
    }

    /// Returns `true` once the subscriber received a terminal notification or
    /// its subscription was unsubscribed. Long running producers should check
    /// this and stop emitting.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.subscription.is_closed()
    }

    pub(crate) fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    /// Returns a subscriber for one `subscribe` call, guarded by a fresh
    /// subscription.
    ///
    /// A subscriber that was never subscribed only lends its handlers. One that
    /// a producer received from an earlier `subscribe` is forwarded to instead,
    /// so its own guard and teardown still apply.
    pub(crate) fn rebind(&self) -> Subscriber<NextFnType>
    where
        NextFnType: 'static,
    {
        if !self.bound {
            return Subscriber {
                next_fn: self.next_fn.clone(),
                complete_fn: self.complete_fn.clone(),
                error_fn: self.error_fn.clone(),
                subscription: Subscription::default(),
                bound: true,
            };
        }
        let (on_next, on_error, on_complete) = (self.clone(), self.clone(), self.clone());
        let mut forwarding = Subscriber::new(
            move |v| on_next.clone().next(v),
            move |e| on_error.clone().error(e),
            move || on_complete.clone().complete(),
        );
        forwarding.bound = true;
        forwarding
    }
}

impl<T> Default for Subscriber<T> {
    fn default() -> Self {
        Subscriber {
            next_fn: None,
            complete_fn: None,
            error_fn: None,
            subscription: Subscription::default(),
            bound: false,
        }
    }
}

impl<T> Clone for Subscriber<T> {
    fn clone(&self) -> Self {
        Subscriber {
            next_fn: self.next_fn.clone(),
            complete_fn: self.complete_fn.clone(),
            error_fn: self.error_fn.clone(),
            subscription: self.subscription.clone(),
            bound: self.bound,
        }
    }
}

impl<T> fmt::Debug for Subscriber<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("closed", &self.is_closed())
            .field("has_error_fn", &self.error_fn.is_some())
            .field("has_complete_fn", &self.complete_fn.is_some())
            .finish()
    }
}

impl<T> Observer for Subscriber<T> {
    type NextFnType = T;

    fn next(&mut self, v: Self::NextFnType) {
        if self.subscription.is_closed() {
            return;
        }
        if let Some(nfn) = &self.next_fn {
            (nfn)(v);
        }
    }

    fn complete(&mut self) {
        let Some(teardown) = self.subscription.close() else {
            return;
        };
        if let Some(cfn) = &self.complete_fn {
            (cfn)();
        }
        teardown.run();
    }

    fn error(&mut self, observable_error: SharedError) {
        let Some(teardown) = self.subscription.close() else {
            return;
        };
        match &self.error_fn {
            Some(efn) => (efn)(observable_error),
            None => warn!(error = %observable_error, "unhandled observable error"),
        }
        teardown.run();
    }
}

/// Enumeration representing different types of handles used to await
/// asynchronous producers.
#[derive(Default)]
pub enum SubscriptionHandle {
    /// No specific handle for task or thread awaiting.
    #[default]
    Nil,

    /// Holds a join handle for awaiting an asynchronous observable using Tokio task.
    JoinTask(JoinHandle<()>),

    /// Holds a join handle for awaiting an asynchronous observable using OS thread.
    JoinThread(ThreadJoinHandle<()>),
}

/// Enumerates various unsubscribe logic options for a subscription.
pub enum UnsubscribeLogic {
    /// No specific unsubscribe logic.
    Nil,

    /// If one subscription depends on another. Wrapped subscription's unsubscribe
    /// will be called upon unsubscribing.
    Wrapped(Box<Subscription>),

    /// Unsubscribe logic defined by a function.
    Logic(Box<dyn FnOnce() + Send>),

    /// Asynchronous unsubscribe logic represented by a future. Use if you need to
    /// spawn `Tokio` tasks or `.await` as a part of the unsubscribe logic.
    Future(Pin<Box<dyn Future<Output = ()> + Send>>),
}

impl UnsubscribeLogic {
    fn run(self, runtime_handle: Option<&runtime::Handle>) {
        match self {
            UnsubscribeLogic::Nil => (),
            UnsubscribeLogic::Logic(fnc) => fnc(),
            UnsubscribeLogic::Wrapped(subscription) => subscription.unsubscribe(),
            UnsubscribeLogic::Future(future) => {
                let handle = runtime::Handle::try_current()
                    .ok()
                    .or_else(|| runtime_handle.cloned());
                match handle {
                    Some(handle) => drop(handle.spawn(future)),
                    None => debug!("no Tokio runtime available, asynchronous unsubscribe logic dropped"),
                }
            }
        }
    }
}

impl fmt::Debug for UnsubscribeLogic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UnsubscribeLogic::Nil => "Nil",
            UnsubscribeLogic::Wrapped(_) => "Wrapped",
            UnsubscribeLogic::Logic(_) => "Logic",
            UnsubscribeLogic::Future(_) => "Future",
        };
        f.write_str(name)
    }
}

#[derive(Default)]
struct SubscriptionState {
    teardown: Vec<UnsubscribeLogic>,
    handle: SubscriptionHandle,
    runtime_handle: Option<runtime::Handle>,
}

#[derive(Default)]
struct SubscriptionInner {
    closed: AtomicBool,
    state: Mutex<SubscriptionState>,
}

/// Teardown taken out of a subscription by the call that closed it.
pub(crate) struct Teardown {
    logic: Vec<UnsubscribeLogic>,
    runtime_handle: Option<runtime::Handle>,
}

impl Teardown {
    pub(crate) fn run(self) {
        if !self.logic.is_empty() {
            trace!(count = self.logic.len(), "running unsubscribe logic");
        }
        for logic in self.logic {
            logic.run(self.runtime_handle.as_ref());
        }
    }
}

/// Represents a subscription to an observable or a subject, allowing control over
/// the subscription.
///
/// `Subscription` is a shared handle: clones refer to the same subscription.
/// Unsubscribing runs the stored unsubscribe logic exactly once, no matter how
/// many times or from how many clones it is called. Unsubscribe logic added
/// after the subscription closed runs immediately.
#[derive(Clone, Default)]
pub struct Subscription {
    inner: Arc<SubscriptionInner>,
}

impl Subscription {
    /// Creates a new Subscription instance with the specified unsubscribe logic and
    /// subscription handle.
    ///
    /// The `unsubscribe_logic` parameter defines the logic to execute upon
    /// unsubscribing from the observable. See [`UnsubscribeLogic`] for more details
    /// on available unsubscribe strategies.
    ///
    /// The `subscription_future` parameter holds a handle for awaiting asynchronous
    /// tasks or threads associated with the subscription. See [`SubscriptionHandle`]
    /// for details on the types of handles.
    #[must_use]
    pub fn new(
        unsubscribe_logic: UnsubscribeLogic,
        subscription_future: SubscriptionHandle,
    ) -> Self {
        let subscription = Subscription::default();
        lock(&subscription.inner.state).handle = subscription_future;
        subscription.add(unsubscribe_logic);
        subscription
    }

    /// Returns `true` if the subscription was unsubscribed or its subscriber
    /// received a terminal notification.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Adds unsubscribe logic to this subscription. If the subscription is
    /// already closed the logic runs right away.
    pub fn add(&self, unsubscribe_logic: UnsubscribeLogic) {
        if let UnsubscribeLogic::Nil = unsubscribe_logic {
            return;
        }
        if let UnsubscribeLogic::Wrapped(other) = &unsubscribe_logic {
            if Arc::ptr_eq(&self.inner, &other.inner) {
                return;
            }
        }

        let mut state = lock(&self.inner.state);
        if self.is_closed() {
            let runtime_handle = state.runtime_handle.clone();
            drop(state);
            unsubscribe_logic.run(runtime_handle.as_ref());
            return;
        }
        if let UnsubscribeLogic::Future(_) = unsubscribe_logic {
            if state.runtime_handle.is_none() {
                state.runtime_handle = runtime::Handle::try_current().ok();
            }
        }
        state.teardown.push(unsubscribe_logic);
    }

    /// Takes over the subscription returned by a producer: its join handle
    /// moves here and unsubscribing this subscription unsubscribes it.
    pub(crate) fn adopt(&self, other: Subscription) {
        if Arc::ptr_eq(&self.inner, &other.inner) {
            return;
        }
        let handle = std::mem::take(&mut lock(&other.inner.state).handle);
        if !matches!(handle, SubscriptionHandle::Nil) {
            lock(&self.inner.state).handle = handle;
        }
        self.add(UnsubscribeLogic::Wrapped(Box::new(other)));
    }

    /// Marks the subscription closed. Only the first caller gets the teardown.
    pub(crate) fn close(&self) -> Option<Teardown> {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return None;
        }
        let mut state = lock(&self.inner.state);
        Some(Teardown {
            logic: std::mem::take(&mut state.teardown),
            runtime_handle: state.runtime_handle.clone(),
        })
    }

    fn take_handle(&self) -> SubscriptionHandle {
        std::mem::take(&mut lock(&self.inner.state).handle)
    }

    /// Awaits the completion of the asynchronous task or thread associated with
    /// this subscription.
    ///
    /// # Errors
    ///
    /// Returns an error if joining a thread or awaiting a task used by the
    /// observable fails.
    pub async fn join_concurrent(self) -> Result<(), Box<dyn Any + Send>> {
        let handle = self.take_handle();
        match handle {
            SubscriptionHandle::JoinTask(task_handle) => task_handle
                .await
                .map_err(|e| Box::new(e) as Box<dyn Any + Send>),
            SubscriptionHandle::JoinThread(thread_handle) => thread_handle.join(),
            SubscriptionHandle::Nil => Ok(()),
        }
    }

    /// Blocks until the OS thread associated with this subscription finishes.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread panicked, or if the subscription holds a
    /// `Tokio` task handle, which has to be awaited with `join_concurrent`
    /// instead. In that case the handle stays in place.
    pub fn join(self) -> Result<(), Box<dyn Any + Send>> {
        match self.take_handle() {
            SubscriptionHandle::JoinThread(thread_handle) => thread_handle.join(),
            SubscriptionHandle::Nil => Ok(()),
            task @ SubscriptionHandle::JoinTask(_) => {
                lock(&self.inner.state).handle = task;
                Err(Box::new(
                    "subscription holds a Tokio task handle, use `join_concurrent().await`",
                ))
            }
        }
    }
}

impl Unsubscribeable for Subscription {
    fn unsubscribe(&self) {
        if let Some(teardown) = self.close() {
            trace!("subscription unsubscribed");
            teardown.run();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("closed", &self.is_closed())
            .finish()
    }
}
