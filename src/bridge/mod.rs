//! Async invocation bridge: the hub's entry point for calling service hooks.
//!
//! # Flow
//!
//! Each hub operation builds the fixed [`InvocationArgs`] tuple and calls
//! [`HubBridge::submit`], which:
//!
//! 1. allocates a single-resolution [`CompletionHandle`],
//! 2. tags the work with [`DispatchMetadata`] derived from the hook,
//! 3. submits it to the [`Scheduler`] with a callback that resolves the
//!    handle with the hook's value, or with a [`ServiceExecutionError`]
//!    wrapping the hook's [`HookError`].
//!
//! Request-style hooks await the handle and return the outcome as an
//! ordinary [`InvocationResult`]. The intent-verified hooks are
//! fire-and-forget: the caller gets control back immediately and the
//! eventual failure (if any) goes through the configured
//! [`NotificationFailurePolicy`].
//!
//! The bridge imposes no timeout, ordering or locking. A service that is
//! not safe for concurrent entry must be serialized by the caller.

pub mod completion;
pub mod error;
pub mod scheduler;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

pub use completion::CompletionHandle;
pub use error::{HookError, HookErrorKind, InvocationResult, ServiceExecutionError};
pub use scheduler::{DispatchMetadata, InvocationCallback, Scheduler};

use crate::config::BridgeConfig;
use crate::service::{Headers, HookKind, HubService, InvocationArgs, Message, inventory};
use completion::Resolver;

// ── NotificationFailurePolicy ─────────────────────────────────────────────────

/// What happens to a failed fire-and-forget hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationFailurePolicy {
    /// Discard the failure.
    Drop,
    /// Log the failure at `warn`.
    #[default]
    Log,
    /// Send the failure to the receiver from
    /// [`HubBridge::take_failure_receiver`].
    Propagate,
}

impl NotificationFailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationFailurePolicy::Drop => "drop",
            NotificationFailurePolicy::Log => "log",
            NotificationFailurePolicy::Propagate => "propagate",
        }
    }
}

impl fmt::Display for NotificationFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop" => Ok(NotificationFailurePolicy::Drop),
            "log" => Ok(NotificationFailurePolicy::Log),
            "propagate" => Ok(NotificationFailurePolicy::Propagate),
            other => Err(format!(
                "unknown notification failure policy '{other}' (expected drop, log or propagate)"
            )),
        }
    }
}

/// A fire-and-forget hook failure, as delivered under
/// [`NotificationFailurePolicy::Propagate`].
#[derive(Debug, Clone)]
pub struct NotificationFailure {
    pub kind: HookKind,
    pub service: String,
    pub invocation_id: Uuid,
    pub error: ServiceExecutionError,
}

// ── Callback ──────────────────────────────────────────────────────────────────

/// Scheduler callback that feeds a completion handle.
///
/// Failures of fire-and-forget hooks are left to the notification policy,
/// so only request-style failures are logged here.
struct ResolveCompletion {
    resolver: Resolver,
    notification: bool,
}

impl InvocationCallback for ResolveCompletion {
    fn notify_success(self, result: Value) {
        debug!("hook returned");
        // A rejected resolution is reported by the resolver itself.
        let _ = self.resolver.succeed(result);
    }

    fn notify_failure(self, error: HookError) {
        let failure = ServiceExecutionError::from(error);
        if self.notification {
            debug!(error = %failure, kind = ?failure.kind(), "notification hook failed");
        } else {
            warn!(error = %failure, kind = ?failure.kind(), "hook failed");
        }
        let _ = self.resolver.fail(failure);
    }
}

// ── HubBridge ─────────────────────────────────────────────────────────────────

/// Dispatches hub lifecycle events to a [`HubService`].
pub struct HubBridge {
    scheduler: Scheduler,
    org: String,
    module: String,
    version: String,
    policy: NotificationFailurePolicy,
    failures_tx: Option<mpsc::Sender<NotificationFailure>>,
    failures_rx: Option<mpsc::Receiver<NotificationFailure>>,
}

impl HubBridge {
    pub fn new(scheduler: Scheduler, config: &BridgeConfig) -> Self {
        let (failures_tx, failures_rx) = match config.notification_failures {
            NotificationFailurePolicy::Propagate => {
                let (tx, rx) = mpsc::channel(config.failure_buffer.max(1));
                (Some(tx), Some(rx))
            }
            _ => (None, None),
        };

        Self {
            scheduler,
            org: config.org.clone(),
            module: config.module.clone(),
            version: config.version.clone(),
            policy: config.notification_failures,
            failures_tx,
            failures_rx,
        }
    }

    pub fn policy(&self) -> NotificationFailurePolicy {
        self.policy
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Take the receiving end of the notification failure channel.
    ///
    /// `Some` exactly once, and only under
    /// [`NotificationFailurePolicy::Propagate`].
    pub fn take_failure_receiver(&mut self) -> Option<mpsc::Receiver<NotificationFailure>> {
        self.failures_rx.take()
    }

    /// Names of the hooks `service` declares. See [`inventory::list_methods`].
    pub fn service_method_names(&self, service: &HubService) -> Vec<String> {
        inventory::list_methods(service)
    }

    // ── core ─────────────────────────────────────────────────────────────────

    /// Submit `kind` for invocation and return its completion handle
    /// without waiting.
    pub fn submit(
        &self,
        service: &Arc<HubService>,
        kind: HookKind,
        args: InvocationArgs,
    ) -> CompletionHandle {
        self.dispatch(service, kind, args).1
    }

    fn dispatch(
        &self,
        service: &Arc<HubService>,
        kind: HookKind,
        args: InvocationArgs,
    ) -> (Uuid, CompletionHandle) {
        let metadata = DispatchMetadata::new(&self.org, &self.module, &self.version, kind);
        let invocation_id = metadata.invocation_id;
        let (resolver, handle) = completion::channel(metadata.operation);
        self.scheduler.submit(
            metadata,
            Arc::clone(service),
            args,
            ResolveCompletion {
                resolver,
                notification: kind.is_notification(),
            },
        );
        (invocation_id, handle)
    }

    /// Invoke `kind` and suspend until it resolves.
    pub async fn invoke(
        &self,
        service: &Arc<HubService>,
        kind: HookKind,
        args: InvocationArgs,
    ) -> InvocationResult {
        self.submit(service, kind, args).wait().await
    }

    /// Invoke `kind` without waiting; failures go to the configured policy.
    pub fn notify(&self, service: &Arc<HubService>, kind: HookKind, args: InvocationArgs) {
        let (invocation_id, handle) = self.dispatch(service, kind, args);

        match self.policy {
            NotificationFailurePolicy::Drop => {}
            NotificationFailurePolicy::Log => {
                let service = service.name().to_string();
                self.scheduler.spawn_tracked(async move {
                    if let Err(error) = handle.wait().await {
                        warn!(%service, method = kind.method_name(), %error, "notification hook failed");
                    }
                });
            }
            NotificationFailurePolicy::Propagate => {
                let service = service.name().to_string();
                let tx = self.failures_tx.clone();
                self.scheduler.spawn_tracked(async move {
                    let Err(error) = handle.wait().await else {
                        return;
                    };
                    let failure = NotificationFailure {
                        kind,
                        service,
                        invocation_id,
                        error,
                    };
                    forward_failure(tx, failure);
                });
            }
        }
    }

    // ── hub operations ───────────────────────────────────────────────────────

    pub async fn register_topic(
        &self,
        service: &Arc<HubService>,
        message: Message,
        headers: Headers,
    ) -> InvocationResult {
        self.invoke(service, HookKind::RegisterTopic, InvocationArgs::new(message, headers))
            .await
    }

    pub async fn deregister_topic(
        &self,
        service: &Arc<HubService>,
        message: Message,
        headers: Headers,
    ) -> InvocationResult {
        self.invoke(service, HookKind::DeregisterTopic, InvocationArgs::new(message, headers))
            .await
    }

    pub async fn update_message(
        &self,
        service: &Arc<HubService>,
        message: Message,
        headers: Headers,
    ) -> InvocationResult {
        self.invoke(service, HookKind::UpdateMessage, InvocationArgs::new(message, headers))
            .await
    }

    pub async fn subscription(
        &self,
        service: &Arc<HubService>,
        message: Message,
        headers: Headers,
    ) -> InvocationResult {
        self.invoke(service, HookKind::Subscription, InvocationArgs::new(message, headers))
            .await
    }

    pub async fn subscription_validation(
        &self,
        service: &Arc<HubService>,
        message: Message,
        headers: Headers,
    ) -> InvocationResult {
        self.invoke(
            service,
            HookKind::SubscriptionValidation,
            InvocationArgs::new(message, headers),
        )
        .await
    }

    /// Fire-and-forget: returns as soon as the hook is submitted.
    pub fn subscription_intent_verified(
        &self,
        service: &Arc<HubService>,
        message: Message,
        headers: Headers,
    ) {
        self.notify(
            service,
            HookKind::SubscriptionIntentVerified,
            InvocationArgs::new(message, headers),
        );
    }

    pub async fn unsubscription(
        &self,
        service: &Arc<HubService>,
        message: Message,
        headers: Headers,
    ) -> InvocationResult {
        self.invoke(service, HookKind::Unsubscription, InvocationArgs::new(message, headers))
            .await
    }

    pub async fn unsubscription_validation(
        &self,
        service: &Arc<HubService>,
        message: Message,
        headers: Headers,
    ) -> InvocationResult {
        self.invoke(
            service,
            HookKind::UnsubscriptionValidation,
            InvocationArgs::new(message, headers),
        )
        .await
    }

    /// Fire-and-forget: returns as soon as the hook is submitted.
    pub fn unsubscription_intent_verified(
        &self,
        service: &Arc<HubService>,
        message: Message,
        headers: Headers,
    ) {
        self.notify(
            service,
            HookKind::UnsubscriptionIntentVerified,
            InvocationArgs::new(message, headers),
        );
    }

    /// Wait for every submitted invocation and failure watcher to finish.
    pub async fn drain(&self) {
        self.scheduler.drain().await;
    }
}

fn forward_failure(tx: Option<mpsc::Sender<NotificationFailure>>, failure: NotificationFailure) {
    let Some(tx) = tx else {
        warn!(error = %failure.error, "notification failure dropped: no failure channel");
        return;
    };
    if let Err(e) = tx.try_send(failure) {
        let failure = match e {
            mpsc::error::TrySendError::Full(f) | mpsc::error::TrySendError::Closed(f) => f,
        };
        warn!(
            service = %failure.service,
            method = failure.kind.method_name(),
            error = %failure.error,
            "notification failure channel unavailable, logging instead"
        );
    }
}
