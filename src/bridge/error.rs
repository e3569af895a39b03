//! Failure types that cross the invocation boundary.
//!
//! A hook reports failure as a [`HookError`]. The bridge never re-raises it;
//! it wraps it in a [`ServiceExecutionError`] and hands that back to the
//! caller as the `Err` side of [`InvocationResult`].

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::service::HookKind;

/// Fixed prefix of every [`ServiceExecutionError`] message.
pub const INVOCATION_FAILED: &str = "service method invocation failed";

/// Outcome of one hook invocation.
pub type InvocationResult = Result<Value, ServiceExecutionError>;

// ── HookError ─────────────────────────────────────────────────────────────────

/// Why a hook invocation did not produce a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HookErrorKind {
    /// The hook ran and returned an error.
    Raised,
    /// The service does not declare the requested hook.
    NotSupported,
    /// The hook panicked on its worker.
    Panicked,
    /// The invocation ended without reporting success or failure.
    Abandoned,
}

/// Error raised by (or on behalf of) a hook.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct HookError {
    kind: HookErrorKind,
    message: String,
    detail: Option<Value>,
}

impl HookError {
    /// A failure raised by hook code.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            kind: HookErrorKind::Raised,
            message: message.into(),
            detail: None,
        }
    }

    /// Attach structured detail for diagnostics (e.g. a hub error record).
    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }

    pub fn not_supported(kind: HookKind, service: &str) -> Self {
        Self {
            kind: HookErrorKind::NotSupported,
            message: format!(
                "remote method '{}' is not defined on service '{service}'",
                kind.method_name()
            ),
            detail: None,
        }
    }

    pub fn panicked(kind: HookKind, reason: &str) -> Self {
        Self {
            kind: HookErrorKind::Panicked,
            message: format!("remote method '{}' panicked: {reason}", kind.method_name()),
            detail: None,
        }
    }

    pub fn abandoned(operation: &str) -> Self {
        Self {
            kind: HookErrorKind::Abandoned,
            message: format!("{operation} completed without a result"),
            detail: None,
        }
    }

    pub fn kind(&self) -> HookErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn detail(&self) -> Option<&Value> {
        self.detail.as_ref()
    }
}

// ── ServiceExecutionError ─────────────────────────────────────────────────────

/// Structured failure delivered to the caller of the bridge.
///
/// The message is always `"service method invocation failed: <cause>"`; the
/// original [`HookError`] is kept as the error source.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ServiceExecutionError {
    message: String,
    #[source]
    cause: HookError,
}

impl ServiceExecutionError {
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> &HookError {
        &self.cause
    }

    pub fn kind(&self) -> HookErrorKind {
        self.cause.kind
    }
}

impl From<HookError> for ServiceExecutionError {
    fn from(cause: HookError) -> Self {
        Self {
            message: format!("{INVOCATION_FAILED}: {}", cause.message),
            cause,
        }
    }
}

// ── CompletionError ───────────────────────────────────────────────────────────

/// Protocol violation on a completion handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompletionError {
    /// A second resolution was attempted; the first one stands.
    #[error("{operation}: completion already resolved, {attempted} outcome rejected")]
    AlreadyResolved {
        operation: &'static str,
        attempted: &'static str,
    },
}
