//! The three callback kinds and the slots that hold them.
//!
//! Each slot is emptied once fired, cleared or cancelled, so a callback that
//! captures its own connection never outlives the lifecycle.

use super::Connection;
use crate::base::error::ConnectionError;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Opaque result of a parse step.
pub type ParseResult = Arc<dyn Any + Send + Sync>;

/// Runs on the primary executor for every upload or download progress event.
pub type ProgressCallback = Arc<dyn Fn(&Connection) + Send + Sync + 'static>;

/// Runs once on the worker executor after a successful transport finish.
pub type ParseCallback = Box<dyn FnOnce(&Connection) -> Parsed + Send + 'static>;

/// Runs once on the primary executor as the last callback of a connection.
pub type CompletionCallback = Box<dyn FnOnce(&Connection) + Send + 'static>;

/// What a parse step produced. Both halves are optional and independent: a
/// step may return a partial result together with an error.
#[derive(Default)]
pub struct Parsed {
    pub result: Option<ParseResult>,
    pub error: Option<ConnectionError>,
}

impl Parsed {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn ok<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            result: Some(Arc::new(value)),
            error: None,
        }
    }

    pub fn failed(error: ConnectionError) -> Self {
        Self {
            result: None,
            error: Some(error),
        }
    }

    /// Attach an error to an existing outcome.
    pub fn with_error(mut self, error: ConnectionError) -> Self {
        self.error = Some(error);
        self
    }
}

impl<T: Any + Send + Sync> From<Result<T, ConnectionError>> for Parsed {
    fn from(result: Result<T, ConnectionError>) -> Self {
        match result {
            Ok(value) => Parsed::ok(value),
            Err(e) => Parsed::failed(e),
        }
    }
}

impl fmt::Debug for Parsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parsed")
            .field("has_result", &self.result.is_some())
            .field("error", &self.error)
            .finish()
    }
}

#[derive(Default)]
pub(crate) struct Callbacks {
    pub progress: Option<ProgressCallback>,
    pub parse: Option<ParseCallback>,
    pub completion: Option<CompletionCallback>,
}

impl Callbacks {
    /// Empty every slot, handing the contents back so they can be dropped
    /// outside the connection lock.
    pub fn take(&mut self) -> Callbacks {
        std::mem::take(self)
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.progress.is_none() && self.parse.is_none() && self.completion.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::error::ConnectionErrorCode;

    #[test]
    fn test_parsed_from_result() {
        let ok: Parsed = Ok::<_, ConnectionError>(5u32).into();
        assert!(ok.error.is_none());
        assert_eq!(*ok.result.unwrap().downcast::<u32>().unwrap(), 5);

        let err: Parsed = Err::<u32, _>(ConnectionError::json_result_type("object")).into();
        assert!(err.result.is_none());
        assert!(err.error.unwrap().is(ConnectionErrorCode::JsonResultType));
    }

    #[test]
    fn test_partial_result_keeps_both() {
        let parsed = Parsed::ok("partial").with_error(ConnectionError::custom("app", 7, "bad row"));
        assert!(parsed.result.is_some());
        assert_eq!(parsed.error.unwrap().code(), 7);
    }

    #[test]
    fn test_take_empties_slots() {
        let mut callbacks = Callbacks {
            completion: Some(Box::new(|_| {})),
            ..Default::default()
        };
        assert!(!callbacks.is_empty());
        let taken = callbacks.take();
        assert!(callbacks.is_empty());
        assert!(taken.completion.is_some());
    }
}
