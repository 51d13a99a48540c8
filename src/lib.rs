//! # Snare
//!
//! Declarative, type-matched exception interception for methods.
//!
//! A registration pairs an exception [`Category`](category::Category) with a
//! handler. When a guarded method fails, the failure's category is checked
//! against the registration: on a match the handler is called with the
//! exception and the receiver and the failure stops there; otherwise the
//! exception leaves the wrapper untouched, to be matched further out or seen by
//! the caller.
//!
//! ## Features
//!
//! - **Category matching**: exact-or-ancestor matching over a single-rooted taxonomy
//! - **Chains**: stack registrations; the innermost sees a failure first
//! - **Async parity**: async methods behave like their synchronous twins
//! - **Bulk registration**: guard every method of an impl block at once
//! - **Runtime API**: [`Catcher`], [`CatchChain`] and [`Attempt`] when attributes don't fit
//!
//! ## Quick Start
//!
//! ```rust
//! use snare::prelude::*;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! #[derive(Default)]
//! pub struct Inventory {
//!     misses: AtomicUsize,
//! }
//!
//! fn count_miss(_: &Exception, inventory: Receiver<'_, Inventory>) {
//!     if let Some(inventory) = inventory.instance() {
//!         inventory.misses.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! #[catch(REFERENCE_ERROR, count_miss)]
//! impl Inventory {
//!     pub fn new() -> Self {
//!         Self::default()
//!     }
//!
//!     pub fn reserve(&self, sku: &str) -> Result<u32, Exception> {
//!         match sku {
//!             "apple" => Ok(12),
//!             "" => raise!(TYPE_ERROR, "empty sku"),
//!             other => raise!(REFERENCE_ERROR, "unknown sku {other}"),
//!         }
//!     }
//! }
//!
//! let inventory = Inventory::new();
//! assert_eq!(inventory.reserve("apple").unwrap(), Some(12));
//! assert_eq!(inventory.reserve("pear").unwrap(), None);
//! assert!(inventory.reserve("").unwrap_err().is(&TYPE_ERROR));
//! assert_eq!(inventory.misses.load(Ordering::SeqCst), 1);
//! ```

extern crate self as snare;

pub mod category;
pub mod error;
pub mod interceptor;

// Re-export core types
pub use category::Category;
pub use error::{Categorized, Exception, Result, ResultExt, Thrown, register_categorized};
pub use interceptor::{Attempt, CatchChain, Catcher, HandlerOutcome, Interceptor, Receiver};

// Re-export macros
pub use snare_macro::{catch, catch_all};

/// Prelude module for convenient imports
///
/// ```
/// use snare::prelude::*;
/// ```
pub mod prelude {
    pub use crate::category::{
        AGGREGATE_ERROR, Category, ERROR, EVAL_ERROR, RANGE_ERROR, REFERENCE_ERROR, SYNTAX_ERROR,
        TYPE_ERROR, URI_ERROR,
    };
    pub use crate::error::{Categorized, Exception, ResultExt, Thrown, register_categorized};
    pub use crate::interceptor::{
        Attempt, CatchChain, Catcher, HandlerOutcome, Interceptor, Receiver,
    };
    pub use crate::raise;
    pub use crate::{catch, catch_all};
}

#[doc(hidden)]
pub mod __private {
    use std::future::Future;

    /// Pins the output type of an async body so `?` inside it resolves.
    pub fn pending<R, F>(future: F) -> F
    where
        F: Future<Output = R>,
    {
        future
    }
}
