//! `rxcore` is a small push-based reactive core: observables, subscriptions and
//! subjects.
//!
//! An [`Observable`] is cold and unicast. It wraps a producer function that runs
//! once per [`subscribe`](Subscribeable::subscribe) call and pushes values to a
//! [`Subscriber`](subscribe::Subscriber) until it completes, errors or the
//! consumer unsubscribes through the returned
//! [`Subscription`](subscribe::Subscription).
//!
//! Subjects are hot and multicast. [`Subject`], [`BehaviorSubject`],
//! [`ReplaySubject`] and [`AsyncSubject`] are at the same time an [`Observer`]
//! and [`Subscribeable`], and differ in what late subscribers receive.
//!
//! Every subscriber observes at most one terminal notification, `error` or
//! `complete`, and nothing after it. Errors are values of type
//! [`SharedError`]; they never unwind out of `subscribe`, `next` or
//! `unsubscribe`.
//!
//! Producers may be synchronous, or spawn OS threads or `Tokio` tasks and keep
//! emitting from there. The join handle placed in the producer's
//! `Subscription` lets the consumer wait for it.
//!
//! The crate logs through `tracing` and never installs a subscriber itself.
//!
//! # Example
//!
//! ```no_run
//! use rxcore::subscribe::{Subscriber, Subscription};
//! use rxcore::{Observable, Observer, Subject, Subscribeable};
//!
//! let mut numbers = Observable::new(|mut o: Subscriber<i32>| {
//!     for i in 1..=3 {
//!         o.next(i);
//!     }
//!     o.complete();
//!     Subscription::default()
//! });
//!
//! let mut subject = Subject::new();
//! subject.subscribe(|v: i32| println!("A got {}", v));
//! subject.subscribe(Subscriber::new(
//!     |v: i32| println!("B got {}", v),
//!     |e| eprintln!("B failed: {}", e),
//!     || println!("B completed"),
//! ));
//!
//! // Both A and B receive 1, 2 and 3.
//! numbers.subscribe(subject);
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};

mod errors;
pub mod observable;
pub mod observer;
pub mod subjects;
mod subscription;

pub use errors::*;
pub use observable::Observable;
pub use observer::Observer;
pub use subjects::{AsyncSubject, BehaviorSubject, BufSize, ReplaySubject, Subject, SubjectStatus};
pub use subscription::subscribe;
pub use subscription::subscribe::{IntoSubscriber, Subscribeable, Unsubscribeable};

/// Locks `m`, recovering the guard if a panicking handler poisoned it.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
