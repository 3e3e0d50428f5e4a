use std::error::Error;
use std::sync::Arc;

use thiserror::Error;

/// Error value delivered through `error` notifications.
///
/// Subjects multicast a single error to many observers, so errors travel as a
/// reference counted trait object. Use [`ObservableError`] or any type
/// implementing `Error + Send + Sync` wrapped in an `Arc`.
pub type SharedError = Arc<dyn Error + Send + Sync>;

/// Errors raised by `rxcore` itself rather than by user producers.
#[derive(Debug, Error)]
pub enum ObservableError {
    /// The producer function of an `Observable` panicked while it was being
    /// subscribed. The panic is contained and delivered as this error.
    ///
    /// This includes panics raised by the subscriber's own handlers when the
    /// producer calls them synchronously.
    #[error("observable producer panicked: {message}")]
    ProducerPanicked { message: String },

    /// Free-form error, mostly useful for `Observable::throw_error`.
    #[error("{0}")]
    Message(String),
}

impl ObservableError {
    /// Wraps a message into a [`SharedError`].
    pub fn msg(message: impl Into<String>) -> SharedError {
        Arc::new(ObservableError::Message(message.into()))
    }

    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            String::from("unknown panic payload")
        };
        ObservableError::ProducerPanicked { message }
    }
}
