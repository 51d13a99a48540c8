use super::{HandlerOutcome, Interceptor, Receiver, dispatch};
use crate::category::{Category, ERROR};
use crate::error::{Exception, Result};

/// One call's trip through its registrations.
///
/// Registrations are applied innermost first: each `catch` sees the failure
/// only if every earlier one let it through. Once a failure is absorbed the
/// remaining registrations have nothing to do.
///
/// This is what `#[catch]` expands to, but it reads fine by hand too:
///
/// ```
/// use snare::prelude::*;
///
/// struct Cache;
///
/// let outcome: Result<Option<u32>, Exception> =
///     Attempt::new(Err(Exception::new(&TYPE_ERROR, "stale")), Receiver::Instance(&Cache))
///         .catch(&REFERENCE_ERROR, |_, _| println!("not this one"))
///         .catch(&TYPE_ERROR, |e, _| println!("absorbed {e}"))
///         .catch_all(|_, _| println!("nothing left to absorb"))
///         .finish();
///
/// assert!(outcome.unwrap().is_none());
/// ```
#[must_use = "an attempt does nothing until `finish` is called"]
pub struct Attempt<'r, T: ?Sized, R> {
    outcome: Result<Option<R>>,
    receiver: Receiver<'r, T>,
}

impl<'r, T: ?Sized, R> Attempt<'r, T, R> {
    pub fn new<E: Into<Exception>>(result: std::result::Result<R, E>, receiver: Receiver<'r, T>) -> Self {
        Self {
            outcome: result.map(Some).map_err(Into::into),
            receiver,
        }
    }

    pub fn catch<H, O>(self, category: &Category, handler: H) -> Self
    where
        H: FnOnce(&Exception, Receiver<'r, T>) -> O,
        O: HandlerOutcome,
    {
        self.settle(|exception, receiver| dispatch(category, handler, exception, receiver))
    }

    pub fn catch_all<H, O>(self, handler: H) -> Self
    where
        H: FnOnce(&Exception, Receiver<'r, T>) -> O,
        O: HandlerOutcome,
    {
        self.catch(&ERROR, handler)
    }

    /// Offer a pending failure to an [`Interceptor`].
    pub fn through<I>(self, interceptor: &I) -> Self
    where
        I: Interceptor<T> + ?Sized,
    {
        self.settle(|exception, receiver| interceptor.intercept(exception, receiver))
    }

    pub fn is_failed(&self) -> bool {
        self.outcome.is_err()
    }

    pub fn finish(self) -> Result<Option<R>> {
        self.outcome
    }

    fn settle<F>(self, intercept: F) -> Self
    where
        F: FnOnce(Exception, Receiver<'r, T>) -> Result<()>,
    {
        let Self { outcome, receiver } = self;
        let outcome = match outcome {
            Err(exception) => intercept(exception, receiver).map(|()| None),
            settled => settled,
        };
        Self { outcome, receiver }
    }
}
