//! The `observable` module provides [`Observable`], the cold, unicast building
//! block of `rxcore`.

use std::{
    error::Error,
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use tracing::error;

use crate::subscription::subscribe::{
    IntoSubscriber, Subscribeable, Subscriber, Subscription,
};
use crate::{observer::Observer, ObservableError, SharedError};

type SubscribeFn<T> =
    Box<dyn FnMut(Subscriber<T>) -> Result<Subscription, SharedError> + Send + Sync>;

/// The `Observable` struct represents a lazy source of values.
///
/// An `Observable` wraps a producer function. Nothing happens until
/// [`subscribe`](Subscribeable::subscribe) is called; every call runs the
/// producer again with a fresh [`Subscriber`], so two subscriptions never see
/// each other's emissions.
///
/// The producer receives a guarded `Subscriber`: once it delivered `error` or
/// `complete`, or the consumer unsubscribed, further calls are silently
/// dropped. The producer returns a [`Subscription`] describing how to stop it.
///
/// # Example: synchronous `Observable`
///
/// ```no_run
/// use rxcore::subscribe::{Subscriber, Subscription, SubscriptionHandle, UnsubscribeLogic};
/// use rxcore::{Observable, Observer, Subscribeable};
///
/// // Create a custom observable that emits values from 1 to 10.
/// let mut emit_10_observable = Observable::new(|mut subscriber| {
///     let mut i = 1;
///
///     while i <= 10 {
///         subscriber.next(i);
///         i += 1;
///     }
///     subscriber.complete();
///
///     Subscription::new(UnsubscribeLogic::Nil, SubscriptionHandle::Nil)
/// });
///
/// let observer = Subscriber::new(
///     |v| println!("Emitted {}", v),
///     |e| eprintln!("Error {}", e),
///     || println!("Completed"),
/// );
///
/// // Observables are cold, nothing is emitted before this call.
/// emit_10_observable.subscribe(observer);
/// ```
///
/// # Example: asynchronous `Observable` with `Tokio`
///
/// ```no_run
/// use rxcore::subscribe::{Subscription, SubscriptionHandle, UnsubscribeLogic, Unsubscribeable};
/// use rxcore::{Observable, Observer, Subscribeable};
/// use tokio::time::{interval, Duration};
///
/// #[tokio::main]
/// async fn main() {
///     let mut ticks = Observable::new(|mut o| {
///         let task = tokio::spawn(async move {
///             let mut timer = interval(Duration::from_millis(100));
///             for i in 0..u64::MAX {
///                 timer.tick().await;
///                 o.next(i);
///             }
///         });
///         let abort = task.abort_handle();
///
///         Subscription::new(
///             // Stop the timer task when unsubscribed.
///             UnsubscribeLogic::Logic(Box::new(move || abort.abort())),
///             SubscriptionHandle::JoinTask(task),
///         )
///     });
///
///     let subscription = ticks.subscribe(|v: u64| println!("tick {}", v));
///     tokio::time::sleep(Duration::from_millis(550)).await;
///     subscription.unsubscribe();
/// }
/// ```
pub struct Observable<T> {
    subscribe_fn: SubscribeFn<T>,
}

impl<T: 'static> Observable<T> {
    /// Creates a new `Observable` with the provided subscribe function.
    ///
    /// When the `Observable` is subscribed to, `sf` is invoked with a guarded
    /// `Subscriber`. It should return a `Subscription` that enables
    /// unsubscribing, and that can be used for awaiting `Tokio` tasks or joining
    /// OS threads when the `Observable` is asynchronous. Return
    /// `Subscription::new(UnsubscribeLogic::Nil, SubscriptionHandle::Nil)` if
    /// there is nothing to clean up.
    ///
    /// If `sf` panics, the panic is caught and delivered to the subscriber as
    /// [`ObservableError::ProducerPanicked`]. A synchronous producer runs the
    /// subscriber's handlers on its own stack, so a panic raised by the `next`
    /// handler while `sf` is running is reported the same way, to that
    /// subscriber's `error` handler.
    pub fn new(mut sf: impl FnMut(Subscriber<T>) -> Subscription + Send + Sync + 'static) -> Self {
        Observable {
            subscribe_fn: Box::new(move |s| Ok(sf(s))),
        }
    }

    /// Creates a new `Observable` from a fallible subscribe function.
    ///
    /// An `Err` returned by `sf` is delivered to the subscriber's `error`
    /// handler instead of leaving `subscribe`.
    pub fn try_new<E>(
        mut sf: impl FnMut(Subscriber<T>) -> Result<Subscription, E> + Send + Sync + 'static,
    ) -> Self
    where
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        Observable {
            subscribe_fn: Box::new(move |s| {
                sf(s).map_err(|e| {
                    let e: Box<dyn Error + Send + Sync> = e.into();
                    SharedError::from(e)
                })
            }),
        }
    }

    /// Creates an `Observable` that completes as soon as it is subscribed.
    pub fn empty() -> Self {
        Observable::new(|mut o| {
            o.complete();
            Subscription::default()
        })
    }

    /// Creates an `Observable` that signals `err` as soon as it is subscribed.
    pub fn throw_error(err: SharedError) -> Self {
        Observable::new(move |mut o| {
            o.error(Arc::clone(&err));
            Subscription::default()
        })
    }
}

impl<T: Clone + Send + Sync + 'static> Observable<T> {
    /// Creates an `Observable` that emits every value of `values` in order and
    /// then completes.
    pub fn of(values: impl IntoIterator<Item = T>) -> Self {
        let values: Vec<T> = values.into_iter().collect();
        Observable::new(move |mut o| {
            for v in &values {
                if o.is_closed() {
                    break;
                }
                o.next(v.clone());
            }
            o.complete();
            Subscription::default()
        })
    }
}

impl<T: 'static> Subscribeable for Observable<T> {
    type ObsType = T;

    fn subscribe(&mut self, s: impl IntoSubscriber<Self::ObsType>) -> Subscription {
        let mut subscriber = s.into_subscriber().rebind();
        let subscription = subscriber.subscription().clone();

        let producer_side = subscriber.clone();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (self.subscribe_fn)(producer_side)));

        match outcome {
            Ok(Ok(producer_subscription)) => subscription.adopt(producer_subscription),
            Ok(Err(e)) => subscriber.error(e),
            Err(payload) => {
                let e = ObservableError::from_panic(payload);
                error!(error = %e, "panic while running observable producer or its synchronous handlers");
                subscriber.error(Arc::new(e));
            }
        }
        subscription
    }
}

impl<T> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
