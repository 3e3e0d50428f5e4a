//! The `subjects` module provides various types of subjects for handling and observing
//! data streams. Subjects serve both as observers and observables, allowing multiple
//! observers to subscribe to a single source and receive updates.
//!
//! A subject is a cheap, cloneable handle. As an `Observer` it accepts `next()`,
//! `error()` and `complete()` calls, which also allows passing it to the
//! `subscribe` method of another `Observable`. As a `Subscribeable` it registers
//! new subscribers; unsubscribing removes the subscriber again.
//!
//! There are four varieties of `Subject`, each tailored for particular use
//! cases: `ReplaySubject`, `BehaviorSubject`, `AsyncSubject` and the basic `Subject`.
//! They differ only in what a late subscriber receives: nothing, the current
//! value, a buffer of recent values, or the final value on completion.
//!
//! Every subject moves at most once from active to completed or errored, see
//! [`SubjectStatus`].

mod async_subject;
mod behavior_subject;
mod replay_subject;
mod subject;
mod subject_core;

pub use subject_core::SubjectStatus;
pub use async_subject::*;
pub use behavior_subject::*;
pub use replay_subject::*;
pub use subject::*;
