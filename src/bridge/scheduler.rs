//! Scheduler: runs hook invocations on Tokio workers.
//!
//! [`Scheduler::submit`] is the only entry point: it looks the hook up on
//! the service, spawns it inside a span built from [`DispatchMetadata`], and
//! reports the result through exactly one [`InvocationCallback`] method.
//! Missing hooks and panicking hooks are reported as failures, never
//! propagated to the submitting task.
//!
//! Every submitted task is tracked so [`Scheduler::drain`] can wait for
//! in-flight invocations at shutdown.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tokio::runtime::Handle;
use tokio::task::JoinError;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, Span, debug, info_span};
use uuid::Uuid;

use super::error::HookError;
use crate::error::AppError;
use crate::service::{HookKind, HubService, InvocationArgs};

// ── DispatchMetadata ──────────────────────────────────────────────────────────

/// Diagnostic tag attached to a submitted invocation.
#[derive(Debug, Clone)]
pub struct DispatchMetadata {
    /// Organisation owning the module (e.g. `"ballerina"`).
    pub org: String,
    /// Module the dispatch belongs to (e.g. `"websubhub"`).
    pub module: String,
    pub version: String,
    /// Hub-side operation name, see [`HookKind::operation_name`].
    pub operation: &'static str,
    pub kind: HookKind,
    /// Unique per invocation (UUID v7, so ids sort by submission time).
    pub invocation_id: Uuid,
}

impl DispatchMetadata {
    pub fn new(org: &str, module: &str, version: &str, kind: HookKind) -> Self {
        Self {
            org: org.to_string(),
            module: module.to_string(),
            version: version.to_string(),
            operation: kind.operation_name(),
            kind,
            invocation_id: Uuid::now_v7(),
        }
    }

    /// Span the invocation runs in.
    pub fn span(&self, service: &str) -> Span {
        info_span!(
            "hook_invocation",
            org = %self.org,
            module = %self.module,
            version = %self.version,
            operation = self.operation,
            method = self.kind.method_name(),
            service,
            invocation_id = %self.invocation_id,
        )
    }
}

// ── InvocationCallback ────────────────────────────────────────────────────────

/// Receives the result of one submitted invocation.
///
/// Both methods consume the callback, so at most one of them can ever run.
pub trait InvocationCallback: Send + 'static {
    fn notify_success(self, result: Value);
    fn notify_failure(self, error: HookError);
}

// ── Scheduler ─────────────────────────────────────────────────────────────────

/// Cloneable handle to the worker pool hooks run on.
#[derive(Clone)]
pub struct Scheduler {
    runtime: Handle,
    tracker: TaskTracker,
}

impl Scheduler {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            tracker: TaskTracker::new(),
        }
    }

    /// Bind to the Tokio runtime the caller is running in.
    pub fn try_current() -> Result<Self, AppError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| AppError::Runtime(format!("no tokio runtime available: {e}")))
    }

    /// Invoke `metadata.kind` on `service` with `args` on a worker.
    ///
    /// Returns immediately. `callback` is notified exactly once, from the
    /// worker, when the hook finishes.
    pub fn submit<C>(
        &self,
        metadata: DispatchMetadata,
        service: Arc<HubService>,
        args: InvocationArgs,
        callback: C,
    ) where
        C: InvocationCallback,
    {
        let kind = metadata.kind;
        let span = metadata.span(service.name());
        let runtime = self.runtime.clone();
        let tracker = self.tracker.clone();

        span.in_scope(|| debug!("invocation submitted"));

        let task = async move {
            let outcome = match service.hook(kind) {
                None => Err(HookError::not_supported(kind, service.name())),
                Some(hook) => {
                    debug!("invocation running");
                    // The hook gets its own tracked task so a panic surfaces as
                    // a JoinError here instead of unwinding through the callback.
                    match tracker.spawn_on(hook.call(args).in_current_span(), &runtime).await {
                        Ok(result) => result,
                        Err(join_err) => Err(join_failure(kind, join_err)),
                    }
                }
            };

            match outcome {
                Ok(value) => callback.notify_success(value),
                Err(error) => callback.notify_failure(error),
            }
        };

        self.tracker.spawn_on(task.instrument(span), &self.runtime);
    }

    /// Run an auxiliary task (e.g. a failure watcher) under the same tracker.
    pub(crate) fn spawn_tracked<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tracker.spawn_on(task, &self.runtime);
    }

    /// Number of tracked tasks still running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Stop accepting new work for drain purposes and wait for every
    /// tracked task to finish.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        debug!("scheduler drained");
    }
}

fn join_failure(kind: HookKind, err: JoinError) -> HookError {
    if err.is_panic() {
        HookError::panicked(kind, &panic_reason(err.into_panic()))
    } else {
        HookError::abandoned(kind.operation_name())
    }
}

fn panic_reason(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
