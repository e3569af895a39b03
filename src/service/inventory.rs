//! Method inventory: which hooks does a service expose?
//!
//! The hub calls this before dispatch to skip hooks a service does not
//! implement.

use super::{HookKind, HubService};

/// Method names declared by `service`, in declaration order.
///
/// Repeated calls on the same service return the same sequence.
pub fn list_methods(service: &HubService) -> Vec<String> {
    service
        .declared()
        .map(|kind| kind.method_name().to_string())
        .collect()
}

/// Returns `true` if `service` declares a hook for `kind`.
pub fn supports(service: &HubService, kind: HookKind) -> bool {
    service.declared().any(|k| k == kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::error::HookError;
    use crate::service::InvocationArgs;
    use serde_json::{Value, json};

    async fn ack(_args: InvocationArgs) -> Result<Value, HookError> {
        Ok(json!({ "status": "ack" }))
    }

    #[test]
    fn lists_single_declared_hook() {
        let service = HubService::builder("svc").on_update_message(ack).build();
        assert_eq!(list_methods(&service), vec!["onUpdateMessage"]);
        assert!(supports(&service, HookKind::UpdateMessage));
        assert!(!supports(&service, HookKind::RegisterTopic));
    }

    #[test]
    fn listing_is_stable_across_calls() {
        let service = HubService::builder("svc")
            .on_unsubscription_validation(ack)
            .on_register_topic(ack)
            .on_subscription_intent_verified(ack)
            .build();
        let first = list_methods(&service);
        let second = list_methods(&service);
        assert_eq!(first, second);
        assert_eq!(
            first,
            vec![
                "onUnsubscriptionValidation",
                "onRegisterTopic",
                "onSubscriptionIntentVerified"
            ]
        );
    }

    #[test]
    fn empty_service_lists_nothing() {
        let service = HubService::builder("svc").build();
        assert!(list_methods(&service).is_empty());
    }
}
