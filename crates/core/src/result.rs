//! Result type definition and its extension trait.

use crate::error::Error;

/// The standard Result type for tickq operations.
///
/// # Examples
///
/// ```ignore
/// fn load() -> Result<Vec<serde_json::Value>> {
///     let text = std::fs::read_to_string("save.json")
///         .map_err(|e| Error::file_read_failed("save.json", e.to_string()))?;
///     serde_json::from_str(&text).map_err(|e| Error::json_parse_failed(e.to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for tickq Results.
pub trait ResultExt<T> {
    /// Inspect the error without consuming the Result.
    fn inspect_error<F: FnOnce(&Error)>(self, f: F) -> Self;
}

impl<T> ResultExt<T> for Result<T> {
    fn inspect_error<F: FnOnce(&Error)>(self, f: F) -> Self {
        if let Err(ref e) = self {
            f(e);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_inspect_error() {
        let result: Result<i32> = Err(Error::unknown_callback_type("test"));
        let mut called = false;
        let _ = result.inspect_error(|_| {
            called = true;
        });
        assert!(called);
    }

    #[test]
    fn test_result_inspect_error_skips_ok() {
        let result: Result<i32> = Ok(1);
        let mut called = false;
        let result = result.inspect_error(|_| called = true);
        assert!(!called);
        assert!(matches!(result, Ok(1)));
    }
}
