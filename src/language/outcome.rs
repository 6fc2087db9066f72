//! Tagged outcomes for text analytics calls and the policies that produce them.

use crate::language::types::{DocumentResult, LanguageError};

/// How a failed text analytics call is treated by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Per-document error flags fall back to the default; transport and service failures abort.
    DefaultOnDocumentError,
    /// Every failure falls back to the default.
    DefaultOnAnyError,
}

/// Result of one external call after applying a [`FailurePolicy`].
#[derive(Debug)]
pub enum CallOutcome<T> {
    /// The call produced a value.
    Success(T),
    /// The call failed in a way the policy tolerates; the default value is used.
    SoftError {
        /// Why the default is used.
        reason: String,
    },
    /// The call failed in a way the policy does not tolerate.
    HardError(LanguageError),
}

impl<T> CallOutcome<T> {
    /// Classify a batch call that reports per-document errors inline.
    pub fn from_document_call(
        result: Result<DocumentResult<T>, LanguageError>,
        policy: FailurePolicy,
    ) -> Self {
        match result {
            Ok(DocumentResult::Ok(value)) => Self::Success(value),
            Ok(DocumentResult::Failed(detail)) => Self::SoftError {
                reason: format!("{} - {}", detail.code, detail.message),
            },
            Err(error) => Self::from_error(error, policy),
        }
    }

    /// Classify a call that raises document errors as [`LanguageError::Document`].
    pub fn from_call(result: Result<T, LanguageError>, policy: FailurePolicy) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(error) => Self::from_error(error, policy),
        }
    }

    fn from_error(error: LanguageError, policy: FailurePolicy) -> Self {
        let tolerated = matches!(error, LanguageError::Document(_))
            || policy == FailurePolicy::DefaultOnAnyError;
        if tolerated {
            Self::SoftError {
                reason: error.to_string(),
            }
        } else {
            Self::HardError(error)
        }
    }

    /// Whether the outcome fell back to a default.
    pub fn is_soft_error(&self) -> bool {
        matches!(self, Self::SoftError { .. })
    }
}

impl<T: Default> CallOutcome<T> {
    /// Unwrap into the value, the default (logged), or the propagated error.
    pub fn resolve(self, operation: &'static str) -> Result<T, LanguageError> {
        match self {
            Self::Success(value) => Ok(value),
            Self::SoftError { reason } => {
                tracing::warn!(operation, reason = %reason, "Using default after service error");
                Ok(T::default())
            }
            Self::HardError(error) => Err(error),
        }
    }
}
