use crate::SharedError;

/// Consumer side of a stream.
///
/// Implemented by [`Subscriber`](crate::subscribe::Subscriber), which is what
/// producers receive, and by every subject type, which lets a subject be fed
/// by another observable.
pub trait Observer {
    type NextFnType;

    fn next(&mut self, _: Self::NextFnType);
    fn error(&mut self, _: SharedError);
    fn complete(&mut self);
}
