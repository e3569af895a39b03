//! Single-resolution completion handle.
//!
//! [`channel`] returns a [`Resolver`] (write side, cloneable) and a
//! [`CompletionHandle`] (read side, cloneable). The first call to
//! [`Resolver::succeed`] or [`Resolver::fail`] fixes the outcome; later calls
//! are rejected with [`CompletionError::AlreadyResolved`] and logged. If the
//! last `Resolver` clone is dropped unresolved, the handle resolves to an
//! [`HookErrorKind::Abandoned`](super::error::HookErrorKind::Abandoned)
//! failure so waiters never hang on a lost callback.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, error};

use super::error::{CompletionError, HookError, InvocationResult, ServiceExecutionError};

type Slot = Option<InvocationResult>;

/// Create a linked resolver / handle pair for one invocation.
///
/// `operation` names the dispatch operation in violation reports.
pub fn channel(operation: &'static str) -> (Resolver, CompletionHandle) {
    let (tx, rx) = watch::channel(None);
    (
        Resolver {
            inner: Arc::new(ResolverInner { tx, operation }),
        },
        CompletionHandle { rx, operation },
    )
}

// ── Resolver ──────────────────────────────────────────────────────────────────

/// Write side of a completion handle.
#[derive(Clone)]
pub struct Resolver {
    inner: Arc<ResolverInner>,
}

struct ResolverInner {
    tx: watch::Sender<Slot>,
    operation: &'static str,
}

impl Resolver {
    /// Resolve with the hook's return value.
    pub fn succeed(&self, value: Value) -> Result<(), CompletionError> {
        self.inner.resolve(Ok(value), "success")
    }

    /// Resolve with a structured failure.
    pub fn fail(&self, error: ServiceExecutionError) -> Result<(), CompletionError> {
        self.inner.resolve(Err(error), "failure")
    }

    pub fn is_resolved(&self) -> bool {
        self.inner.tx.borrow().is_some()
    }
}

impl ResolverInner {
    fn resolve(&self, outcome: InvocationResult, attempted: &'static str) -> Result<(), CompletionError> {
        let accepted = self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(outcome);
            true
        });

        if accepted {
            debug!(operation = self.operation, outcome = attempted, "completion resolved");
            Ok(())
        } else {
            error!(
                operation = self.operation,
                attempted, "protocol violation: completion resolved more than once"
            );
            Err(CompletionError::AlreadyResolved {
                operation: self.operation,
                attempted,
            })
        }
    }
}

impl Drop for ResolverInner {
    fn drop(&mut self) {
        let unresolved = self.tx.borrow().is_none();
        if unresolved {
            error!(
                operation = self.operation,
                "protocol violation: invocation finished without resolving its completion"
            );
            let failure = ServiceExecutionError::from(HookError::abandoned(self.operation));
            let _ = self.resolve(Err(failure), "abandoned");
        }
    }
}

// ── CompletionHandle ──────────────────────────────────────────────────────────

/// Read side of a completion handle. Clone it freely; every clone observes
/// the same, immutable outcome.
#[derive(Clone)]
pub struct CompletionHandle {
    rx: watch::Receiver<Slot>,
    operation: &'static str,
}

impl CompletionHandle {
    /// Suspend until the invocation resolves, then return its outcome.
    pub async fn wait(&self) -> InvocationResult {
        let mut rx = self.rx.clone();
        let resolved = rx.wait_for(Option::is_some).await.map(|slot| slot.clone());
        let outcome = match resolved {
            Ok(slot) => slot,
            // Sender gone; the resolver's drop guard has already stored a
            // value unless the process is tearing down.
            Err(_) => rx.borrow().clone(),
        };
        outcome.unwrap_or_else(|| Err(HookError::abandoned(self.operation).into()))
    }

    /// The outcome if already resolved, without waiting.
    pub fn try_get(&self) -> Option<InvocationResult> {
        self.rx.borrow().clone()
    }

    pub fn is_resolved(&self) -> bool {
        self.rx.borrow().is_some()
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }
}
