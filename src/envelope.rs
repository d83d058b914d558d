//! Success/failure carrier returned by every public operation
//!
//! An envelope is never thrown. On failure it may still carry a value: the
//! pagination controller uses this to hand back whatever it accumulated before
//! the failing page.

use crate::error::{Error, ErrorInfo};

/// Result of a public operation
#[derive(Debug, Clone)]
pub struct ResultEnvelope<T> {
    succeeded: bool,
    value: Option<T>,
    info: Option<ErrorInfo>,
}

impl<T> ResultEnvelope<T> {
    /// Successful result
    pub fn success(value: T) -> Self {
        Self {
            succeeded: true,
            value: Some(value),
            info: None,
        }
    }

    /// Failed result with no value
    pub fn fail(info: impl Into<ErrorInfo>) -> Self {
        Self {
            succeeded: false,
            value: None,
            info: Some(info.into()),
        }
    }

    /// Failed result that keeps the value built so far
    pub fn fail_with_partial(info: impl Into<ErrorInfo>, partial: T) -> Self {
        Self {
            succeeded: false,
            value: Some(partial),
            info: Some(info.into()),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    pub fn failed(&self) -> bool {
        !self.succeeded
    }

    /// The value, present on success and on partial failure
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn into_value(self) -> Option<T> {
        self.value
    }

    /// Error details, present exactly when the envelope failed
    pub fn error(&self) -> Option<&ErrorInfo> {
        self.info.as_ref()
    }

    /// Split into value and error
    pub fn into_parts(self) -> (Option<T>, Option<ErrorInfo>) {
        (self.value, self.info)
    }

    /// Convert into a plain `Result`, dropping any partial value on failure
    pub fn into_result(self) -> std::result::Result<T, ErrorInfo> {
        match (self.succeeded, self.value, self.info) {
            (true, Some(value), _) => Ok(value),
            (_, _, Some(info)) => Err(info),
            // constructors rule this out
            (_, _, None) => Err(ErrorInfo::new(
                crate::error::ErrorKind::Unknown,
                "envelope carried neither value nor error",
            )),
        }
    }

    /// Map the carried value, keeping success state and error
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> ResultEnvelope<U> {
        ResultEnvelope {
            succeeded: self.succeeded,
            value: self.value.map(f),
            info: self.info,
        }
    }
}

impl<T> ResultEnvelope<Vec<T>> {
    /// Failed, but with at least one item gathered before the failure
    pub fn is_partial_failure(&self) -> bool {
        !self.succeeded && self.value.as_ref().is_some_and(|v| !v.is_empty())
    }
}

impl<T> From<crate::error::Result<T>> for ResultEnvelope<T> {
    fn from(result: crate::error::Result<T>) -> Self {
        match result {
            Ok(value) => Self::success(value),
            Err(e) => Self::fail(e),
        }
    }
}

impl<T> From<Error> for ResultEnvelope<T> {
    fn from(error: Error) -> Self {
        Self::fail(error)
    }
}
