/// A module for providing error context

/// An error (E), and some context describing what was attempted.
pub struct ErrorContext<E>(pub String, pub E);

/// Extends `Result` with a `context` method, turning the error into an `ErrorContext`.
pub trait ErrorContextExt<T, E> {
    fn context<C: AsRef<str>>(self, c: C) -> Result<T, ErrorContext<E>>;
}

impl<T, E> ErrorContextExt<T, E> for Result<T, E> {
    fn context<C: AsRef<str>>(self, c: C) -> Result<T, ErrorContext<E>> {
        self.map_err(|e| ErrorContext(c.as_ref().into(), e))
    }
}
