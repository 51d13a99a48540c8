use super::{Attempt, Catcher, HandlerOutcome, Interceptor, Receiver};
use crate::category::Category;
use crate::error::{Exception, Result};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// An ordered stack of interceptors guarding one method.
///
/// The order is explicit: the first layer added is the innermost and is
/// offered a failure first. A layer that lets the failure through hands it to
/// the next one; the first layer that absorbs it ends the walk.
///
/// ```
/// use snare::prelude::*;
///
/// struct Importer;
///
/// let chain = CatchChain::<Importer>::new()
///     .catch(&SYNTAX_ERROR, |e, _| println!("skipping malformed row: {e}"))
///     .catch_all(|e, _| println!("import failed: {e}"));
///
/// let outcome = chain.call(Receiver::Instance(&Importer), || -> Result<u32, Exception> {
///     Err(Exception::new(&RANGE_ERROR, "row 12 out of range"))
/// });
/// assert!(outcome.unwrap().is_none());
/// ```
pub struct CatchChain<T: ?Sized> {
    layers: Vec<Arc<dyn Interceptor<T>>>,
}

impl<T: ?Sized> Default for CatchChain<T> {
    fn default() -> Self {
        Self { layers: Vec::new() }
    }
}

impl<T: ?Sized> Clone for CatchChain<T> {
    fn clone(&self) -> Self {
        Self {
            layers: self.layers.clone(),
        }
    }
}

impl<T: ?Sized> fmt::Debug for CatchChain<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatchChain")
            .field("layers", &self.layers.len())
            .finish()
    }
}

impl<T: ?Sized + 'static> CatchChain<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a registration outside every layer added so far.
    pub fn catch<H, O>(self, category: &'static Category, handler: H) -> Self
    where
        H: Fn(&Exception, Receiver<'_, T>) -> O + Send + Sync + 'static,
        O: HandlerOutcome,
    {
        self.with(Catcher::new(category, handler))
    }

    pub fn catch_all<H, O>(self, handler: H) -> Self
    where
        H: Fn(&Exception, Receiver<'_, T>) -> O + Send + Sync + 'static,
        O: HandlerOutcome,
    {
        self.with(Catcher::all(handler))
    }

    /// Add any interceptor, including another chain, as the new outermost layer.
    pub fn with<I>(mut self, interceptor: I) -> Self
    where
        I: Interceptor<T> + 'static,
    {
        self.layers.push(Arc::new(interceptor));
        self
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn call<R, E, F>(&self, receiver: Receiver<'_, T>, f: F) -> Result<Option<R>>
    where
        F: FnOnce() -> std::result::Result<R, E>,
        E: Into<Exception>,
    {
        Attempt::new(f(), receiver).through(self).finish()
    }

    pub async fn call_async<R, E, F>(&self, receiver: Receiver<'_, T>, future: F) -> Result<Option<R>>
    where
        F: Future<Output = std::result::Result<R, E>>,
        E: Into<Exception>,
    {
        let result = future.await;
        Attempt::new(result, receiver).through(self).finish()
    }

    pub fn wrap<A, R, E, F>(self, method: F) -> impl Fn(&T, A) -> Result<Option<R>>
    where
        F: Fn(&T, A) -> std::result::Result<R, E>,
        E: Into<Exception>,
    {
        move |receiver: &T, args: A| self.call(Receiver::Instance(receiver), || method(receiver, args))
    }

    pub fn wrap_static<A, R, E, F>(self, function: F) -> impl Fn(A) -> Result<Option<R>>
    where
        F: Fn(A) -> std::result::Result<R, E>,
        E: Into<Exception>,
    {
        move |args: A| self.call(Receiver::of_type(), || function(args))
    }
}

impl<T: ?Sized + 'static> Interceptor<T> for CatchChain<T> {
    fn intercept(&self, exception: Exception, receiver: Receiver<'_, T>) -> Result<()> {
        let mut pending = exception;
        for layer in &self.layers {
            match layer.intercept(pending, receiver) {
                Ok(()) => return Ok(()),
                Err(exception) => pending = exception,
            }
        }
        Err(pending)
    }
}
