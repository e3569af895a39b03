//! Hub bridge: dispatches WebSub hub lifecycle events to pluggable service
//! hooks.
//!
//! - [`service`]: the [`HubService`] hook registry and method inventory.
//! - [`bridge`]: [`HubBridge`], which runs hooks on a [`Scheduler`] and
//!   returns their outcome (or a structured failure) to the caller.
//! - [`config`], [`logger`], [`error`]: process bootstrap.

pub mod bridge;
pub mod config;
pub mod error;
pub mod logger;
pub mod service;

pub use bridge::{
    HookError, HookErrorKind, HubBridge, InvocationResult, NotificationFailure,
    NotificationFailurePolicy, Scheduler, ServiceExecutionError,
};
pub use service::{Headers, HookKind, HubService, InvocationArgs, Message};
