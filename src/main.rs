//! Hub bridge: demo entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config
//!   3. Init logger at configured level
//!   4. Dispatch a few hub events to a sample service
//!   5. Drain in-flight invocations and exit

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::info;

use hub_bridge::error::AppError;
use hub_bridge::{
    Headers, HookError, HubBridge, HubService, InvocationArgs, InvocationResult, Message,
    Scheduler, config, logger,
};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Load .env if present; the file is optional.
    let _ = dotenvy::dotenv();

    let config = config::load()?;
    logger::init(&config.logging, true)?;

    info!(
        module = %config.bridge.module,
        version = %config.bridge.version,
        notification_failures = %config.bridge.notification_failures,
        "config loaded"
    );

    let bridge = HubBridge::new(Scheduler::try_current()?, &config.bridge);
    let service = Arc::new(
        HubService::builder("demo")
            .on_update_message(on_update_message)
            .on_subscription_intent_verified(on_intent_verified)
            .build(),
    );

    println!("✓ service methods: {:?}", bridge.service_method_names(&service));

    let mut message = Message::new();
    message.insert("topic".into(), json!("t1"));

    report(
        "onUpdateMessage",
        bridge.update_message(&service, message.clone(), Headers::new()).await,
    );
    report(
        "onRegisterTopic",
        bridge.register_topic(&service, message.clone(), Headers::new()).await,
    );
    bridge.subscription_intent_verified(&service, message, Headers::new());

    bridge.drain().await;
    info!("bridge drained");
    Ok(())
}

async fn on_update_message(args: InvocationArgs) -> Result<Value, HookError> {
    let topic = args.message().get("topic").cloned().unwrap_or(Value::Null);
    Ok(json!({ "status": "ack", "topic": topic }))
}

async fn on_intent_verified(_args: InvocationArgs) -> Result<Value, HookError> {
    Err(HookError::new("subscriber callback unreachable"))
}

fn report(method: &str, outcome: InvocationResult) {
    match outcome {
        Ok(value) => println!("✓ {method} -> {value}"),
        Err(e) => println!("✗ {method} -> {e}"),
    }
}
