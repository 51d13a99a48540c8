use crate::category::{Category, ERROR};
use crate::error::{Exception, Result};
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

pub mod attempt;
pub mod chain;

pub use attempt::Attempt;
pub use chain::CatchChain;

/// The object a wrapped call was made on.
///
/// Methods see `Instance`; associated functions see `Type`, which stands for
/// the type itself.
pub enum Receiver<'a, T: ?Sized> {
    Instance(&'a T),
    Type(PhantomData<&'a T>),
}

impl<'a, T: ?Sized> Receiver<'a, T> {
    /// The receiver for an associated function of `T`.
    pub fn of_type() -> Self {
        Receiver::Type(PhantomData)
    }

    pub fn instance(&self) -> Option<&'a T> {
        match *self {
            Receiver::Instance(instance) => Some(instance),
            Receiver::Type(_) => None,
        }
    }

    pub fn is_type(&self) -> bool {
        matches!(self, Receiver::Type(_))
    }

    pub fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

impl<T: ?Sized> Clone for Receiver<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for Receiver<'_, T> {}

impl<T: ?Sized> fmt::Debug for Receiver<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Receiver::Instance(_) => write!(f, "Instance({})", self.type_name()),
            Receiver::Type(_) => write!(f, "Type({})", self.type_name()),
        }
    }
}

/// What a handler may return.
///
/// `()` absorbs the exception. `Err` replaces it with a new failure that
/// leaves the wrapper and can be caught further out.
pub trait HandlerOutcome {
    fn into_outcome(self) -> Result<()>;
}

impl HandlerOutcome for () {
    fn into_outcome(self) -> Result<()> {
        Ok(())
    }
}

impl<E: Into<Exception>> HandlerOutcome for std::result::Result<(), E> {
    fn into_outcome(self) -> Result<()> {
        self.map_err(Into::into)
    }
}

/// The Interceptor trait
///
/// An interceptor is offered each failure of a wrapped call exactly once.
/// `Ok(())` means the failure was absorbed; `Err` hands a failure on to the
/// next interceptor out, or to the caller.
///
/// # Example
/// ```
/// use snare::prelude::*;
///
/// struct Quiet;
///
/// impl<T: ?Sized> Interceptor<T> for Quiet {
///     fn intercept(&self, exception: Exception, _receiver: Receiver<'_, T>) -> Result<(), Exception> {
///         if exception.is(&TYPE_ERROR) { Ok(()) } else { Err(exception) }
///     }
/// }
/// ```
pub trait Interceptor<T: ?Sized>: Send + Sync {
    fn intercept(&self, exception: Exception, receiver: Receiver<'_, T>) -> Result<()>;
}

/// Match `exception` against `category` and run `handler` on a match.
pub(crate) fn dispatch<'r, T, H, O>(
    category: &Category,
    handler: H,
    exception: Exception,
    receiver: Receiver<'r, T>,
) -> Result<()>
where
    T: ?Sized,
    H: FnOnce(&Exception, Receiver<'r, T>) -> O,
    O: HandlerOutcome,
{
    if !exception.is(category) {
        tracing::trace!(
            exception = %exception.category(),
            registered = %category,
            receiver = receiver.type_name(),
            "exception propagated"
        );
        return Err(exception);
    }

    tracing::trace!(
        exception = %exception.category(),
        registered = %category,
        receiver = receiver.type_name(),
        "exception absorbed"
    );
    handler(&exception, receiver).into_outcome()
}

type Handler<T> = Arc<dyn Fn(&Exception, Receiver<'_, T>) -> Result<()> + Send + Sync>;

fn erase<T, F>(handler: F) -> Handler<T>
where
    T: ?Sized + 'static,
    F: Fn(&Exception, Receiver<'_, T>) -> Result<()> + Send + Sync + 'static,
{
    Arc::new(handler)
}

/// A registration: one category, one handler.
///
/// Immutable once built and cheap to clone, so one `Catcher` can serve every
/// concurrent call of the method it guards.
///
/// ```
/// use snare::prelude::*;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// struct Parser {
///     failures: AtomicUsize,
/// }
///
/// impl Parser {
///     fn parse(&self, input: &str) -> Result<i64, Exception> {
///         input.trim().parse::<i64>().categorize(&SYNTAX_ERROR)
///     }
/// }
///
/// let catcher = Catcher::new(&SYNTAX_ERROR, |_e: &Exception, parser: Receiver<'_, Parser>| {
///     if let Some(parser) = parser.instance() {
///         parser.failures.fetch_add(1, Ordering::SeqCst);
///     }
/// });
/// let parse = catcher.wrap(Parser::parse);
///
/// let parser = Parser { failures: AtomicUsize::new(0) };
/// assert_eq!(parse(&parser, "42").unwrap(), Some(42));
/// assert_eq!(parse(&parser, "forty-two").unwrap(), None);
/// assert_eq!(parser.failures.load(Ordering::SeqCst), 1);
/// ```
pub struct Catcher<T: ?Sized> {
    category: &'static Category,
    handler: Handler<T>,
}

impl<T: ?Sized> Clone for Catcher<T> {
    fn clone(&self) -> Self {
        Self {
            category: self.category,
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<T: ?Sized> fmt::Debug for Catcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Catcher")
            .field("category", &self.category.name())
            .finish_non_exhaustive()
    }
}

impl<T: ?Sized + 'static> Catcher<T> {
    pub fn new<H, O>(category: &'static Category, handler: H) -> Self
    where
        H: Fn(&Exception, Receiver<'_, T>) -> O + Send + Sync + 'static,
        O: HandlerOutcome,
    {
        Self {
            category,
            handler: erase(move |exception, receiver| handler(exception, receiver).into_outcome()),
        }
    }

    /// Catch every exception.
    pub fn all<H, O>(handler: H) -> Self
    where
        H: Fn(&Exception, Receiver<'_, T>) -> O + Send + Sync + 'static,
        O: HandlerOutcome,
    {
        Self::new(&ERROR, handler)
    }

    pub fn category(&self) -> &'static Category {
        self.category
    }

    pub fn matches(&self, exception: &Exception) -> bool {
        exception.is(self.category)
    }

    /// Run `f` under this registration.
    ///
    /// Success gives `Ok(Some(value))`, an absorbed failure `Ok(None)`, and
    /// anything else the original exception.
    pub fn call<R, E, F>(&self, receiver: Receiver<'_, T>, f: F) -> Result<Option<R>>
    where
        F: FnOnce() -> std::result::Result<R, E>,
        E: Into<Exception>,
    {
        Attempt::new(f(), receiver).through(self).finish()
    }

    /// Await `future` under this registration.
    ///
    /// The handler runs before the returned future completes.
    pub async fn call_async<R, E, F>(&self, receiver: Receiver<'_, T>, future: F) -> Result<Option<R>>
    where
        F: Future<Output = std::result::Result<R, E>>,
        E: Into<Exception>,
    {
        let result = future.await;
        Attempt::new(result, receiver).through(self).finish()
    }

    /// Turn a method into its guarded form.
    pub fn wrap<A, R, E, F>(self, method: F) -> impl Fn(&T, A) -> Result<Option<R>>
    where
        F: Fn(&T, A) -> std::result::Result<R, E>,
        E: Into<Exception>,
    {
        move |receiver: &T, args: A| self.call(Receiver::Instance(receiver), || method(receiver, args))
    }

    /// Turn an associated function into its guarded form.
    pub fn wrap_static<A, R, E, F>(self, function: F) -> impl Fn(A) -> Result<Option<R>>
    where
        F: Fn(A) -> std::result::Result<R, E>,
        E: Into<Exception>,
    {
        move |args: A| self.call(Receiver::of_type(), || function(args))
    }
}

impl<T: ?Sized + 'static> Interceptor<T> for Catcher<T> {
    fn intercept(&self, exception: Exception, receiver: Receiver<'_, T>) -> Result<()> {
        dispatch(
            self.category,
            |exception, receiver| (self.handler)(exception, receiver),
            exception,
            receiver,
        )
    }
}
