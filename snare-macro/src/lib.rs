use proc_macro::TokenStream;

mod catch;

use catch::Registration;

/// Guard a method, an associated function, or every function of an impl block.
///
/// The first argument names a category (a `static` from `snare::category` or
/// your own), the second is the handler, called with the exception and the
/// receiver when the category matches.
///
/// The guarded function returns `Result<Option<T>, snare::Exception>`:
/// `Some` on success, `None` when a handler absorbed the failure, and the
/// original exception when nothing matched.
///
/// # Example
/// ```rust,ignore
/// use snare::{catch, catch_all, Exception, Receiver};
/// use snare::category::{REFERENCE_ERROR, TYPE_ERROR};
///
/// pub struct Session;
///
/// fn report(e: &Exception, _: Receiver<'_, Session>) {
///     eprintln!("session: {e}");
/// }
///
/// impl Session {
///     // `TYPE_ERROR` is innermost and sees failures first.
///     #[catch_all(report)]
///     #[catch(TYPE_ERROR, |_, _| ())]
///     fn resume(&self, token: &str) -> Result<u64, Exception> {
///         token.parse().map_err(|_| Exception::new(&REFERENCE_ERROR, "unknown token"))
///     }
/// }
///
/// assert_eq!(Session.resume("7").unwrap(), Some(7));
/// assert_eq!(Session.resume("x").unwrap(), None);
/// ```
///
/// On an inherent impl block, every function returning `Result` is guarded
/// except the constructor `new`. Attributes on the functions themselves stay
/// innermost.
///
/// The handler receives `Receiver::Type` for associated functions, so the
/// attribute needs an enclosing `Self` and cannot be used on free functions.
/// A `&mut self` method whose success value borrows from `self` (for example
/// `Result<&mut u8, _>`) is rejected, and skipped on an impl block, because
/// the handlers are lent `&self` while that borrow would still be alive.
///
/// Errors converted from `anyhow::Error` keep their category only when they
/// wrap an `Exception`, a `Thrown`, or a type registered with
/// `snare::register_categorized`; anything else is tagged `ERROR`.
#[proc_macro_attribute]
pub fn catch(attr: TokenStream, item: TokenStream) -> TokenStream {
    catch::catch_attribute(Registration::parse_typed, attr, item)
}

/// `#[catch]` for every category.
///
/// # Example
/// ```rust,ignore
/// use snare::{catch_all, Exception, Receiver};
/// use snare::category::RANGE_ERROR;
///
/// pub struct Meter;
///
/// #[catch_all(|e, _| eprintln!("meter: {e}"))]
/// impl Meter {
///     pub fn new() -> Self {
///         Meter
///     }
///
///     pub fn read(&self, channel: u8) -> Result<u32, Exception> {
///         if channel > 3 {
///             return Err(Exception::new(&RANGE_ERROR, "no such channel"));
///         }
///         Ok(u32::from(channel) * 10)
///     }
/// }
///
/// assert_eq!(Meter::new().read(9).unwrap(), None);
/// ```
#[proc_macro_attribute]
pub fn catch_all(attr: TokenStream, item: TokenStream) -> TokenStream {
    catch::catch_attribute(Registration::parse_all, attr, item)
}
