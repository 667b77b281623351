//! Positional arguments of the wrapped operation.

use std::any::{type_name, Any};
use strata_core::{StrataError, StrataResult};

/// Ordered, type-erased arguments of one invocation.
///
/// Filters read (and may rewrite) the arguments before the terminal handler
/// sees them. Access is by position and checked against the stored type.
///
/// # Example
///
/// ```
/// use strata_filter::Arguments;
///
/// let args = Arguments::new().with(42_u32).with("alice".to_string());
/// assert_eq!(args.len(), 2);
/// assert_eq!(args.get::<u32>(0), Some(&42));
/// assert!(args.get::<u32>(1).is_none());
/// ```
#[derive(Default)]
pub struct Arguments {
    values: Vec<Box<dyn Any + Send + Sync>>,
}

impl Arguments {
    /// Creates an empty argument list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an argument and returns the list.
    #[must_use]
    pub fn with<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.push(value);
        self
    }

    /// Appends an argument.
    pub fn push<T: Send + Sync + 'static>(&mut self, value: T) {
        self.values.push(Box::new(value));
    }

    /// Returns the number of arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if there are no arguments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the argument at `index` if it exists and has type `T`.
    #[must_use]
    pub fn get<T: Send + Sync + 'static>(&self, index: usize) -> Option<&T> {
        self.values.get(index).and_then(|v| v.downcast_ref())
    }

    /// Returns a mutable reference to the argument at `index`.
    pub fn get_mut<T: Send + Sync + 'static>(&mut self, index: usize) -> Option<&mut T> {
        self.values.get_mut(index).and_then(|v| v.downcast_mut())
    }

    /// Like [`get`](Self::get), with a descriptive error on failure.
    pub fn try_get<T: Send + Sync + 'static>(&self, index: usize) -> StrataResult<&T> {
        let value = self
            .values
            .get(index)
            .ok_or_else(|| StrataError::argument_missing(index, self.len()))?;
        value
            .downcast_ref()
            .ok_or_else(|| StrataError::argument_type(index, type_name::<T>()))
    }

    /// Replaces the argument at `index`, which may change its type.
    pub fn replace<T: Send + Sync + 'static>(&mut self, index: usize, value: T) -> StrataResult<()> {
        let len = self.len();
        let slot = self
            .values
            .get_mut(index)
            .ok_or_else(|| StrataError::argument_missing(index, len))?;
        *slot = Box::new(value);
        Ok(())
    }
}

impl std::fmt::Debug for Arguments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arguments")
            .field("len", &self.values.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::ErrorCategory;

    #[test]
    fn test_typed_access() {
        let args = Arguments::new().with(7_i64).with(String::from("x"));
        assert_eq!(args.get::<i64>(0), Some(&7));
        assert_eq!(args.get::<String>(1).map(String::as_str), Some("x"));
        assert!(args.get::<String>(0).is_none());
        assert!(args.get::<i64>(5).is_none());
    }

    #[test]
    fn test_try_get_reports_position_and_type() {
        let args = Arguments::new().with(1_u8);

        let err = args.try_get::<u8>(2).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Argument);
        assert!(err.to_string().contains("only 1 argument"));

        let err = args.try_get::<String>(0).unwrap_err();
        assert!(err.to_string().contains("String"));
    }

    #[test]
    fn test_get_mut_and_replace() {
        let mut args = Arguments::new().with(10_u32);
        *args.get_mut::<u32>(0).unwrap() += 1;
        assert_eq!(args.get::<u32>(0), Some(&11));

        args.replace(0, "eleven").unwrap();
        assert_eq!(args.get::<&str>(0), Some(&"eleven"));
        assert!(args.replace(3, 0_u8).is_err());
    }

    #[test]
    fn test_debug_shows_length() {
        let args = Arguments::new().with(1).with(2);
        assert_eq!(format!("{args:?}"), "Arguments { len: 2 }");
        assert!(!args.is_empty());
        assert!(Arguments::new().is_empty());
    }
}
