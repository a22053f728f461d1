//! Array-computation backends.
//!
//! The numerical work itself is delegated to whichever dense-array
//! backend is configured; the orchestration core only needs to know the
//! backend's name and to ask it to flush deferred work once per step.

use crate::error::BackendError;

/// A registered array-computation backend.
pub trait Backend: Send {
    /// Registry name (e.g. `"ndarray"`).
    fn name(&self) -> &str;

    /// Complete any deferred or queued array work.
    ///
    /// Backends that evaluate eagerly return
    /// [`BackendError::Unsupported`]; the engine absorbs exactly that
    /// condition at its flush call site.
    fn flush(&self) -> Result<(), BackendError>;
}

/// Eager, single-process backend over `ndarray`. Has nothing to flush.
#[derive(Clone, Copy, Debug, Default)]
pub struct NdarrayBackend;

impl Backend for NdarrayBackend {
    fn name(&self) -> &str {
        "ndarray"
    }

    fn flush(&self) -> Result<(), BackendError> {
        Err(BackendError::Unsupported {
            backend: self.name().to_string(),
            operation: "flush",
        })
    }
}

/// Names of the built-in backends, in preference order.
pub const BACKENDS: &[&str] = &["ndarray"];

/// Construct a built-in backend by name.
pub fn backend_by_name(name: &str) -> Result<Box<dyn Backend>, BackendError> {
    match name {
        "ndarray" => Ok(Box::new(NdarrayBackend)),
        _ => Err(BackendError::UnknownBackend {
            name: name.to_string(),
            available: BACKENDS.join(", "),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_backend_resolves() {
        for name in BACKENDS {
            let backend = backend_by_name(name).unwrap();
            assert_eq!(backend.name(), *name);
        }
    }

    #[test]
    fn unknown_backend_lists_alternatives() {
        let err = backend_by_name("bohrium").err().unwrap();
        assert_eq!(
            err,
            BackendError::UnknownBackend {
                name: "bohrium".to_string(),
                available: "ndarray".to_string(),
            }
        );
    }

    #[test]
    fn ndarray_flush_is_unsupported() {
        assert!(matches!(
            NdarrayBackend.flush(),
            Err(BackendError::Unsupported { operation: "flush", .. })
        ));
    }
}
