use crate::category::{self, Category, ERROR, RegistryError};
use dashmap::DashMap;
use std::any::TypeId;
use std::error::Error as StdError;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

pub type Result<T, E = Exception> = std::result::Result<T, E>;

type BoxError = Box<dyn StdError + Send + Sync>;

/// An error type that knows its place in the taxonomy.
///
/// ```
/// use snare::{Categorized, Exception};
/// use snare::category::{Category, RANGE_ERROR};
///
/// #[derive(Debug, thiserror::Error)]
/// #[error("page {0} is out of range")]
/// struct PageOutOfRange(u32);
///
/// impl Categorized for PageOutOfRange {
///     fn category(&self) -> &'static Category {
///         &RANGE_ERROR
///     }
/// }
///
/// let exception = Exception::from(PageOutOfRange(7));
/// assert!(exception.is(&RANGE_ERROR));
/// assert_eq!(exception.downcast_ref::<PageOutOfRange>().map(|e| e.0), Some(7));
/// ```
///
/// Once an error is boxed into an `anyhow::Error` its type is erased. Call
/// [`register_categorized`] for types that travel through `anyhow` so the
/// conversion back into an [`Exception`] finds their category again.
pub trait Categorized: StdError + Send + Sync + 'static {
    fn category(&self) -> &'static Category;
}

/// The default concrete error behind [`Exception::new`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{category}: {message}")]
pub struct Thrown {
    category: &'static Category,
    message: String,
}

impl Thrown {
    pub fn new(category: &'static Category, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Categorized for Thrown {
    fn category(&self) -> &'static Category {
        self.category
    }
}

/// A failure in flight: a category plus the error that was raised.
///
/// An `Exception` is moved, never cloned, through the wrappers that inspect
/// it, so the value a caller receives after an unmatched failure is the very
/// value the method produced.
pub struct Exception {
    category: &'static Category,
    error: BoxError,
}

impl Exception {
    pub fn new(category: &'static Category, message: impl Into<String>) -> Self {
        Self::from(Thrown::new(category, message))
    }

    /// Tag an arbitrary error with a category.
    pub fn from_error<E>(category: &'static Category, error: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self {
            category,
            error: error.into(),
        }
    }

    /// Build an exception for a category known only by name.
    pub fn named(name: &str, message: impl Into<String>) -> Result<Self, RegistryError> {
        category::lookup(name)
            .map(|category| Self::new(category, message))
            .ok_or_else(|| RegistryError::unknown(name))
    }

    pub fn category(&self) -> &'static Category {
        self.category
    }

    /// Exact-or-ancestor match against `category`.
    pub fn is(&self, category: &Category) -> bool {
        self.category.is_a(category)
    }

    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.error.downcast_ref::<E>()
    }

    pub fn into_inner(self) -> BoxError {
        self.error
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl fmt::Debug for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exception")
            .field("category", &self.category.name())
            .field("error", &self.error)
            .finish()
    }
}

impl StdError for Exception {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.error.source()
    }
}

impl<E: Categorized> From<E> for Exception {
    fn from(error: E) -> Self {
        Self {
            category: error.category(),
            error: Box::new(error),
        }
    }
}

type Recovery = fn(anyhow::Error) -> std::result::Result<Exception, anyhow::Error>;

fn recoveries() -> &'static DashMap<TypeId, Recovery> {
    static RECOVERIES: OnceLock<DashMap<TypeId, Recovery>> = OnceLock::new();
    RECOVERIES.get_or_init(DashMap::new)
}

fn recover<E: Categorized>(error: anyhow::Error) -> std::result::Result<Exception, anyhow::Error> {
    error.downcast::<E>().map(Exception::from)
}

/// Let `E` keep its category when it comes back out of an `anyhow::Error`.
///
/// ```
/// use snare::{Categorized, Exception, register_categorized};
/// use snare::category::{Category, RANGE_ERROR};
///
/// #[derive(Debug, thiserror::Error)]
/// #[error("page {0} is out of range")]
/// struct PageOutOfRange(u32);
///
/// impl Categorized for PageOutOfRange {
///     fn category(&self) -> &'static Category {
///         &RANGE_ERROR
///     }
/// }
///
/// register_categorized::<PageOutOfRange>();
/// let exception = Exception::from(anyhow::Error::new(PageOutOfRange(3)));
/// assert!(exception.is(&RANGE_ERROR));
/// ```
pub fn register_categorized<E: Categorized>() {
    if recoveries().insert(TypeId::of::<E>(), recover::<E>).is_none() {
        tracing::trace!(error_type = std::any::type_name::<E>(), "categorized error registered");
    }
}

impl From<anyhow::Error> for Exception {
    fn from(error: anyhow::Error) -> Self {
        let mut error = match error.downcast::<Exception>() {
            Ok(exception) => return exception,
            Err(error) => error,
        };
        error = match error.downcast::<Thrown>() {
            Ok(thrown) => return Self::from(thrown),
            Err(error) => error,
        };

        let hooks: Vec<Recovery> = recoveries().iter().map(|entry| *entry.value()).collect();
        for hook in hooks {
            error = match hook(error) {
                Ok(exception) => return exception,
                Err(error) => error,
            };
        }
        Self::from_error(&ERROR, error)
    }
}

/// Tag the failure of a `Result` with a category.
pub trait ResultExt<T> {
    fn categorize(self, category: &'static Category) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: StdError + Send + Sync + 'static,
{
    fn categorize(self, category: &'static Category) -> Result<T> {
        self.map_err(|error| Exception::from_error(category, error))
    }
}

/// Return early with a new [`Exception`].
///
/// ```
/// use snare::{raise, Exception};
/// use snare::category::REFERENCE_ERROR;
///
/// fn lookup(key: &str) -> Result<u32, Exception> {
///     if key.is_empty() {
///         raise!(REFERENCE_ERROR, "empty key");
///     }
///     raise!(REFERENCE_ERROR, "{key} is not defined")
/// }
///
/// assert_eq!(lookup("x").unwrap_err().to_string(), "ReferenceError: x is not defined");
/// ```
#[macro_export]
macro_rules! raise {
    ($category:expr, $($arg:tt)+) => {
        return ::core::result::Result::Err(
            $crate::Exception::new(&$category, ::std::format!($($arg)+)).into(),
        )
    };
}
