//! Exception taxonomy
//!
//! Every exception carries a [`Category`]. Categories form a single-rooted
//! tree under [`ERROR`], and matching is exact-or-ancestor: an exception
//! tagged [`REFERENCE_ERROR`] is caught by a registration for
//! `REFERENCE_ERROR` and by one for `ERROR`, but not by one for
//! [`TYPE_ERROR`].
//!
//! Declare your own categories as `static` items, because identity is the
//! address of the static:
//!
//! ```
//! use snare::category::{Category, ERROR};
//!
//! pub static STORAGE_ERROR: Category = Category::new("StorageError", &ERROR);
//! pub static QUOTA_EXCEEDED: Category = Category::new("QuotaExceeded", &STORAGE_ERROR);
//!
//! assert!(QUOTA_EXCEEDED.is_a(&STORAGE_ERROR));
//! assert!(QUOTA_EXCEEDED.is_a(&ERROR));
//! assert!(!STORAGE_ERROR.is_a(&QUOTA_EXCEEDED));
//! ```

use std::fmt;

pub mod registry;

pub use registry::{RegistryError, lookup, register, registered};

/// A node in the exception taxonomy.
pub struct Category {
    name: &'static str,
    parent: Option<&'static Category>,
}

impl Category {
    /// Create a category below `parent`.
    pub const fn new(name: &'static str, parent: &'static Category) -> Self {
        Self {
            name,
            parent: Some(parent),
        }
    }

    const fn root(name: &'static str) -> Self {
        Self { name, parent: None }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn parent(&self) -> Option<&'static Category> {
        self.parent
    }

    /// Distance from the root; `ERROR` is 0.
    pub fn depth(&self) -> usize {
        self.ancestors().count()
    }

    /// Walks from the parent up to the root, excluding `self`.
    pub fn ancestors(&self) -> Ancestors {
        Ancestors { next: self.parent }
    }

    /// True when `self` is `other` or descends from it.
    pub fn is_a(&self, other: &Category) -> bool {
        if self == other {
            return true;
        }
        self.ancestors().any(|ancestor| ancestor == other)
    }
}

impl PartialEq for Category {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl Eq for Category {}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Debug for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut path = vec![self.name];
        path.extend(self.ancestors().map(Category::name));
        path.reverse();
        write!(f, "Category({})", path.join(" > "))
    }
}

/// Iterator returned by [`Category::ancestors`].
pub struct Ancestors {
    next: Option<&'static Category>,
}

impl Iterator for Ancestors {
    type Item = &'static Category;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent;
        Some(current)
    }
}

/// The root category. A registration for `ERROR` matches every exception.
pub static ERROR: Category = Category::root("Error");

pub static EVAL_ERROR: Category = Category::new("EvalError", &ERROR);
pub static RANGE_ERROR: Category = Category::new("RangeError", &ERROR);
pub static REFERENCE_ERROR: Category = Category::new("ReferenceError", &ERROR);
pub static SYNTAX_ERROR: Category = Category::new("SyntaxError", &ERROR);
pub static TYPE_ERROR: Category = Category::new("TypeError", &ERROR);
pub static URI_ERROR: Category = Category::new("URIError", &ERROR);
pub static AGGREGATE_ERROR: Category = Category::new("AggregateError", &ERROR);

pub(crate) static BUILTINS: [&Category; 8] = [
    &ERROR,
    &EVAL_ERROR,
    &RANGE_ERROR,
    &REFERENCE_ERROR,
    &SYNTAX_ERROR,
    &TYPE_ERROR,
    &URI_ERROR,
    &AGGREGATE_ERROR,
];
