//! Error types shared by observables, subscribers and subjects.
mod observable_errors;

pub use observable_errors::*;
