//! Example: a host page serving two embedded frames.
//!
//! The host boots a dispatcher with a seed registry, a plugin extends it after
//! boot, an embedded app calls in, and the host asks the app a yes/no question
//! with a bounded wait.

use std::sync::Arc;
use std::time::Duration;

use framecall::prelude::*;
use serde_json::{json, Value};

// =============================================================================
// Collaborators
// =============================================================================

/// The embedded app, reachable in-process for this demo
struct InProcessFrame {
    app: Dispatcher,
}

#[async_trait]
impl FrameTransport for InProcessFrame {
    async fn send_request(&self, envelope: RequestEnvelope) -> Result<ResponseEnvelope, TransportError> {
        Ok(self.app.handle_request(envelope, None).await)
    }
}

#[derive(Debug)]
struct AppFrame;

impl FrameHandle for AppFrame {
    fn frame_id(&self) -> &str {
        "app-1"
    }

    fn write_back(&self, body: Value) -> Result<(), TransportError> {
        println!("   write-back to app-1: {}", body);
        Ok(())
    }
}

// =============================================================================
// Host setup
// =============================================================================

async fn navigate(ctx: CallContext) -> HandlerResult {
    let target = ctx
        .body()
        .get("target")
        .and_then(Value::as_str)
        .ok_or_else(|| HandlerError::InvalidBody("missing target".into()))?
        .to_string();
    if let Some(source) = ctx.source() {
        source
            .write_back(json!({ "location": target }))
            .map_err(|e| HandlerError::Capability(e.to_string()))?;
    }
    Ok(json!({ "navigated": target }))
}

fn seed_registry() -> Registry {
    RegistryBuilder::new()
        .with(
            NamespaceRegistration::new("root.demo")
                .call("ping", handler_fn(|_ctx| async { Ok(json!({ "pong": true })) }))
                .notification("themeChanged", NotificationDescriptor::broadcast()),
        )
        .with(NamespaceRegistration::new("root.nav").call(
            "navigate",
            handler_fn(navigate),
        ))
        .build()
        .expect("seed registry is well-formed")
}

// =============================================================================
// MAIN - Usage demonstration
// =============================================================================

#[tokio::main]
async fn main() {
    use futures::StreamExt;

    println!("=== Framecall Host Example ===\n");

    let config = RpcConfig::new()
        .with_name("host")
        .with_correlation_timeout(Duration::from_millis(500));
    let host = Dispatcher::boot(seed_registry(), config.clone());

    // A plugin adds a namespace after boot.
    host.register([NamespaceRegistration::new("root.bookmarks").call(
        "add",
        handler_fn(|ctx| async move { Ok(json!({ "added": ctx.body().clone() })) }),
    )])
    .expect("plugin registration");

    // Inbound calls from the embedded app.
    let frame: Arc<dyn FrameHandle> = Arc::new(AppFrame);
    let requests = vec![
        RequestEnvelope::new("root.demo", "ping", json!({})),
        RequestEnvelope::new("root.nav", "navigate", json!({ "target": "#Orders" })),
        RequestEnvelope::new("root.bookmarks", "add", json!({ "title": "Orders" })),
        RequestEnvelope::new("root.demo", "missing", json!({})),
    ];
    for request in requests {
        println!("-> {}.{}", request.target_namespace, request.method);
        let response = host.handle_request(request, Some(Arc::clone(&frame))).await;
        match (&response.body.result, &response.body.error) {
            (_, Some(error)) => println!("   rejected [{}]: {}", error.kind, error.message),
            (Some(result), None) => println!("   ok: {}", result),
            (None, None) => println!("   ok"),
        }
    }

    // Notifications fan out to subscribed frames.
    let mut app_events = host.notifications().subscribe("app-1", ["URL"]);
    let delivered = host
        .notifications()
        .publish("root.demo", "themeChanged", json!({ "theme": "dark" }));
    println!("\nthemeChanged delivered to {} frame(s)", delivered);
    if let Some(note) = app_events.next().await {
        println!("   app-1 received {}.{} ({:?})", note.namespace, note.method, note.distribution_tag);
    }

    // Outbound yes/no question with a safe default.
    let app = Dispatcher::boot(Registry::new(), RpcConfig::default());
    app.register([NamespaceRegistration::new("root.ui").call(
        "confirmLeave",
        handler_fn(|_ctx| async { Ok(json!(true)) }),
    )])
    .expect("app registration");

    let correlator = Correlator::new(Arc::new(InProcessFrame { app }), &config);
    let leave = correlator
        .confirm("root.ui", "confirmLeave", json!({}), false)
        .await;
    println!("\nconfirmLeave answered: {}", leave);

    let unanswered = correlator
        .confirm("root.ui", "notImplemented", json!({}), false)
        .await;
    println!("notImplemented fell back to: {}", unanswered);
}
