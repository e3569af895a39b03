//! Hub services: the pluggable objects whose hooks the bridge invokes.
//!
//! A [`HubService`] is a name plus a registry of [`Hook`]s, one per
//! [`HookKind`] the service chooses to implement. The registry *is* the
//! service's declared capability set: [`inventory::list_methods`] reads it,
//! and the bridge looks hooks up in it at dispatch time.
//!
//! ```ignore
//! let service = HubService::builder("my-hub")
//!     .on_update_message(|args: InvocationArgs| async move {
//!         Ok(json!({ "status": "ack" }))
//!     })
//!     .build();
//! ```

pub mod args;
pub mod hooks;
pub mod inventory;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

pub use args::{HEADERS_ARG_FLAG, Headers, InvocationArgs, MESSAGE_ARG_FLAG, Message};
pub use hooks::HookKind;

use crate::bridge::error::HookError;

// ── Hook ──────────────────────────────────────────────────────────────────────

/// A boxed, owned future returned by [`Hook::call`].
pub type HookFuture = Pin<Box<dyn Future<Output = Result<Value, HookError>> + Send + 'static>>;

/// One hook implementation.
///
/// Any `Fn(InvocationArgs) -> impl Future<Output = Result<Value, HookError>>`
/// closure is a `Hook`. Hooks with nothing to return resolve to
/// `Value::Null`.
///
/// Hooks may be entered concurrently; the bridge does no locking.
pub trait Hook: Send + Sync + 'static {
    fn call(&self, args: InvocationArgs) -> HookFuture;
}

impl<F, Fut> Hook for F
where
    F: Fn(InvocationArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, HookError>> + Send + 'static,
{
    fn call(&self, args: InvocationArgs) -> HookFuture {
        Box::pin(self(args))
    }
}

// ── HubService ────────────────────────────────────────────────────────────────

/// A pluggable hub service with zero or more hooks.
///
/// Construct with [`HubService::builder`]. Immutable once built; share it
/// as `Arc<HubService>`.
pub struct HubService {
    name: String,
    /// Declaration order is preserved; at most one entry per kind.
    hooks: Vec<(HookKind, Arc<dyn Hook>)>,
}

impl HubService {
    pub fn builder(name: impl Into<String>) -> HubServiceBuilder {
        HubServiceBuilder {
            name: name.into(),
            hooks: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The hook registered for `kind`, if the service implements it.
    pub fn hook(&self, kind: HookKind) -> Option<Arc<dyn Hook>> {
        self.hooks
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, h)| Arc::clone(h))
    }

    /// Declared hook kinds, in declaration order.
    pub fn declared(&self) -> impl Iterator<Item = HookKind> + '_ {
        self.hooks.iter().map(|(k, _)| *k)
    }
}

impl fmt::Debug for HubService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubService")
            .field("name", &self.name)
            .field("hooks", &self.declared().collect::<Vec<_>>())
            .finish()
    }
}

// ── HubServiceBuilder ─────────────────────────────────────────────────────────

/// Collects hooks for a [`HubService`].
///
/// Registering the same kind twice replaces the earlier hook but keeps its
/// original position in the declaration order.
pub struct HubServiceBuilder {
    name: String,
    hooks: Vec<(HookKind, Arc<dyn Hook>)>,
}

impl HubServiceBuilder {
    pub fn hook(mut self, kind: HookKind, hook: impl Hook) -> Self {
        let hook: Arc<dyn Hook> = Arc::new(hook);
        match self.hooks.iter_mut().find(|(k, _)| *k == kind) {
            Some(slot) => slot.1 = hook,
            None => self.hooks.push((kind, hook)),
        }
        self
    }

    pub fn on_register_topic(self, hook: impl Hook) -> Self {
        self.hook(HookKind::RegisterTopic, hook)
    }

    pub fn on_deregister_topic(self, hook: impl Hook) -> Self {
        self.hook(HookKind::DeregisterTopic, hook)
    }

    pub fn on_update_message(self, hook: impl Hook) -> Self {
        self.hook(HookKind::UpdateMessage, hook)
    }

    pub fn on_subscription(self, hook: impl Hook) -> Self {
        self.hook(HookKind::Subscription, hook)
    }

    pub fn on_subscription_validation(self, hook: impl Hook) -> Self {
        self.hook(HookKind::SubscriptionValidation, hook)
    }

    pub fn on_subscription_intent_verified(self, hook: impl Hook) -> Self {
        self.hook(HookKind::SubscriptionIntentVerified, hook)
    }

    pub fn on_unsubscription(self, hook: impl Hook) -> Self {
        self.hook(HookKind::Unsubscription, hook)
    }

    pub fn on_unsubscription_validation(self, hook: impl Hook) -> Self {
        self.hook(HookKind::UnsubscriptionValidation, hook)
    }

    pub fn on_unsubscription_intent_verified(self, hook: impl Hook) -> Self {
        self.hook(HookKind::UnsubscriptionIntentVerified, hook)
    }

    pub fn build(self) -> HubService {
        HubService {
            name: self.name,
            hooks: self.hooks,
        }
    }
}
