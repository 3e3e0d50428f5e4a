//! Provides structures and traits related to subscription management.
//!
//! This module includes types such as `Subscriber` for handling observed values,
//! errors, and completions, as well as `Subscription` for controlling subscriptions
//! to observables and subjects.
//!
//! Additionally, it defines enums for unsubscribe logic and for awaiting
//! asynchronous producers.
pub mod subscribe;
