//! The closed set of lifecycle hooks a hub service may implement.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies one of the optional hook methods on a [`super::HubService`].
///
/// Each variant carries two names: the service-side method name
/// (`onUpdateMessage`) and the hub-side operation that dispatches it
/// (`callOnUpdateMethod`), which is what shows up in dispatch metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookKind {
    RegisterTopic,
    DeregisterTopic,
    UpdateMessage,
    Subscription,
    SubscriptionValidation,
    SubscriptionIntentVerified,
    Unsubscription,
    UnsubscriptionValidation,
    UnsubscriptionIntentVerified,
}

impl HookKind {
    /// Every hook, in canonical order.
    pub const ALL: [HookKind; 9] = [
        HookKind::RegisterTopic,
        HookKind::DeregisterTopic,
        HookKind::UpdateMessage,
        HookKind::Subscription,
        HookKind::SubscriptionValidation,
        HookKind::SubscriptionIntentVerified,
        HookKind::Unsubscription,
        HookKind::UnsubscriptionValidation,
        HookKind::UnsubscriptionIntentVerified,
    ];

    /// Method name the service declares for this hook.
    pub fn method_name(self) -> &'static str {
        match self {
            HookKind::RegisterTopic => "onRegisterTopic",
            HookKind::DeregisterTopic => "onDeregisterTopic",
            HookKind::UpdateMessage => "onUpdateMessage",
            HookKind::Subscription => "onSubscription",
            HookKind::SubscriptionValidation => "onSubscriptionValidation",
            HookKind::SubscriptionIntentVerified => "onSubscriptionIntentVerified",
            HookKind::Unsubscription => "onUnsubscription",
            HookKind::UnsubscriptionValidation => "onUnsubscriptionValidation",
            HookKind::UnsubscriptionIntentVerified => "onUnsubscriptionIntentVerified",
        }
    }

    /// Hub-side operation name, used to tag the dispatched task.
    pub fn operation_name(self) -> &'static str {
        match self {
            HookKind::RegisterTopic => "callRegisterMethod",
            HookKind::DeregisterTopic => "callDeregisterMethod",
            HookKind::UpdateMessage => "callOnUpdateMethod",
            HookKind::Subscription => "callOnSubscriptionMethod",
            HookKind::SubscriptionValidation => "callOnSubscriptionValidationMethod",
            HookKind::SubscriptionIntentVerified => "callOnSubscriptionIntentVerifiedMethod",
            HookKind::Unsubscription => "callOnUnsubscriptionMethod",
            HookKind::UnsubscriptionValidation => "callOnUnsubscriptionValidationMethod",
            HookKind::UnsubscriptionIntentVerified => "callOnUnsubscriptionIntentVerifiedMethod",
        }
    }

    /// `true` for the intent-verified hooks, whose result nobody waits on.
    pub fn is_notification(self) -> bool {
        matches!(
            self,
            HookKind::SubscriptionIntentVerified | HookKind::UnsubscriptionIntentVerified
        )
    }

    /// Reverse lookup from a service method name.
    pub fn from_method_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.method_name() == name)
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method_name())
    }
}
