//! Namespace registry with additive merge.
//!
//! The `Registry` maps namespace keys to their call handlers and notification
//! descriptors. It only ever grows: merging a registration overwrites single
//! methods but never drops a method or replaces a whole namespace.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::{RegistryError, RegistryResult};
use crate::handler::{CallHandler, NotificationDescriptor};

/// One namespace and the handlers it owns.
#[derive(Clone, Default)]
pub struct NamespaceEntry {
    name: String,
    call_handlers: HashMap<String, Arc<dyn CallHandler>>,
    notification_handlers: HashMap<String, NotificationDescriptor>,
}

impl NamespaceEntry {
    fn new(name: String) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call_handler(&self, method: &str) -> Option<&Arc<dyn CallHandler>> {
        self.call_handlers.get(method)
    }

    pub fn notification(&self, method: &str) -> Option<&NotificationDescriptor> {
        self.notification_handlers.get(method)
    }

    /// Call method names, sorted.
    pub fn call_methods(&self) -> Vec<&str> {
        let mut methods: Vec<&str> = self.call_handlers.keys().map(String::as_str).collect();
        methods.sort_unstable();
        methods
    }

    /// Notification method names, sorted.
    pub fn notification_methods(&self) -> Vec<&str> {
        let mut methods: Vec<&str> = self
            .notification_handlers
            .keys()
            .map(String::as_str)
            .collect();
        methods.sort_unstable();
        methods
    }

    fn overlay(&mut self, registration: NamespaceRegistration) {
        self.call_handlers.extend(registration.call_handlers);
        self.notification_handlers
            .extend(registration.notification_handlers);
    }
}

impl fmt::Debug for NamespaceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamespaceEntry")
            .field("name", &self.name)
            .field("call_handlers", &self.call_methods())
            .field("notification_handlers", &self.notification_handlers)
            .finish()
    }
}

/// A request to add methods to a namespace.
///
/// Consumed by [`Registry::register`].
///
/// # Example
///
/// ```rust
/// use framecall::{handler_fn, NamespaceRegistration, NotificationDescriptor};
/// use serde_json::json;
///
/// let registration = NamespaceRegistration::new("root.demo")
///     .call("ping", handler_fn(|_ctx| async { Ok(json!({ "pong": true })) }))
///     .notification("changed", NotificationDescriptor::broadcast());
///
/// assert_eq!(registration.namespace(), "root.demo");
/// ```
#[derive(Clone)]
pub struct NamespaceRegistration {
    namespace: String,
    call_handlers: HashMap<String, Arc<dyn CallHandler>>,
    notification_handlers: HashMap<String, NotificationDescriptor>,
}

impl NamespaceRegistration {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            call_handlers: HashMap::new(),
            notification_handlers: HashMap::new(),
        }
    }

    /// Add a call handler.
    pub fn call(mut self, method: impl Into<String>, handler: Arc<dyn CallHandler>) -> Self {
        self.call_handlers.insert(method.into(), handler);
        self
    }

    /// Add a notification descriptor.
    pub fn notification(
        mut self,
        method: impl Into<String>,
        descriptor: NotificationDescriptor,
    ) -> Self {
        self.notification_handlers.insert(method.into(), descriptor);
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn check_names(&self) -> RegistryResult<()> {
        if self.namespace.is_empty() {
            return Err(RegistryError::InvalidName("empty namespace".to_string()));
        }
        let empty_method = self
            .call_handlers
            .keys()
            .chain(self.notification_handlers.keys())
            .any(|m| m.is_empty());
        if empty_method {
            return Err(RegistryError::InvalidName(format!(
                "empty method name in '{}'",
                self.namespace
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for NamespaceRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut calls: Vec<&String> = self.call_handlers.keys().collect();
        calls.sort_unstable();
        f.debug_struct("NamespaceRegistration")
            .field("namespace", &self.namespace)
            .field("call_handlers", &calls)
            .field("notification_handlers", &self.notification_handlers)
            .finish()
    }
}

/// Authoritative namespace → handlers map.
///
/// Namespaces iterate in key order so validation and introspection are
/// deterministic.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    namespaces: BTreeMap<String, NamespaceEntry>,
}

impl Registry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge registrations into the registry.
    ///
    /// Existing namespaces get the new methods overlaid by name; unknown
    /// namespaces are created. All registrations are checked before any is
    /// applied, so a malformed batch leaves the registry untouched.
    pub fn register<I>(&mut self, registrations: I) -> RegistryResult<()>
    where
        I: IntoIterator<Item = NamespaceRegistration>,
    {
        let registrations: Vec<NamespaceRegistration> = registrations.into_iter().collect();
        for registration in &registrations {
            registration.check_names()?;
        }
        for registration in registrations {
            self.merge(registration);
        }
        Ok(())
    }

    fn merge(&mut self, registration: NamespaceRegistration) {
        debug!(
            namespace = %registration.namespace,
            calls = registration.call_handlers.len(),
            notifications = registration.notification_handlers.len(),
            "merging namespace registration"
        );
        self.namespaces
            .entry(registration.namespace.clone())
            .or_insert_with(|| NamespaceEntry::new(registration.namespace.clone()))
            .overlay(registration);
    }

    /// Get a namespace entry.
    pub fn get(&self, namespace: &str) -> Option<&NamespaceEntry> {
        self.namespaces.get(namespace)
    }

    /// Look up the call handler for `namespace.method`.
    pub fn lookup_call_handler(&self, namespace: &str, method: &str) -> Option<Arc<dyn CallHandler>> {
        self.get(namespace)
            .and_then(|entry| entry.call_handler(method))
            .cloned()
    }

    /// Look up the notification descriptor for `namespace.method`.
    pub fn lookup_notification(&self, namespace: &str, method: &str) -> Option<&NotificationDescriptor> {
        self.get(namespace).and_then(|entry| entry.notification(method))
    }

    /// Check if a namespace is registered.
    pub fn contains(&self, namespace: &str) -> bool {
        self.namespaces.contains_key(namespace)
    }

    /// Names of all registered namespaces, sorted.
    pub fn namespaces(&self) -> Vec<&str> {
        self.namespaces.keys().map(String::as_str).collect()
    }

    /// Call method names registered under `namespace`.
    pub fn methods(&self, namespace: &str) -> Vec<&str> {
        self.get(namespace)
            .map(NamespaceEntry::call_methods)
            .unwrap_or_default()
    }

    /// Get the number of registered namespaces.
    pub fn len(&self) -> usize {
        self.namespaces.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }

    /// Iterate over all namespace entries.
    pub fn iter(&self) -> impl Iterator<Item = &NamespaceEntry> {
        self.namespaces.values()
    }
}

/// Builder for seeding a registry at init.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    registrations: Vec<NamespaceRegistration>,
}

impl RegistryBuilder {
    /// Create a new registry builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a registration to the seed set.
    pub fn with(mut self, registration: NamespaceRegistration) -> Self {
        self.registrations.push(registration);
        self
    }

    /// Build the registry.
    pub fn build(self) -> RegistryResult<Registry> {
        let mut registry = Registry::new();
        registry.register(self.registrations)?;
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{handler_fn, CallContext};
    use serde_json::json;

    fn constant(value: serde_json::Value) -> Arc<dyn CallHandler> {
        handler_fn(move |_ctx| {
            let value = value.clone();
            async move { Ok(value) }
        })
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = Registry::new();
        registry
            .register([NamespaceRegistration::new("root.demo").call("ping", constant(json!(1)))])
            .unwrap();

        assert!(registry.contains("root.demo"));
        assert!(registry.lookup_call_handler("root.demo", "ping").is_some());
        assert!(registry.lookup_call_handler("root.demo", "pong").is_none());
        assert!(registry.lookup_call_handler("root.other", "ping").is_none());
    }

    #[tokio::test]
    async fn test_second_registration_wins_per_method() {
        let mut registry = Registry::new();
        registry
            .register([NamespaceRegistration::new("root.demo")
                .call("ping", constant(json!("first")))
                .call("echo", constant(json!("echo")))])
            .unwrap();
        registry
            .register([NamespaceRegistration::new("root.demo").call("ping", constant(json!("second")))])
            .unwrap();

        let ping = registry.lookup_call_handler("root.demo", "ping").unwrap();
        assert_eq!(ping.execute(CallContext::default()).await, Ok(json!("second")));

        let echo = registry.lookup_call_handler("root.demo", "echo").unwrap();
        assert_eq!(echo.execute(CallContext::default()).await, Ok(json!("echo")));
        assert_eq!(registry.methods("root.demo"), vec!["echo", "ping"]);
    }

    #[test]
    fn test_merge_keeps_notifications_when_adding_calls() {
        let mut registry = Registry::new();
        registry
            .register([NamespaceRegistration::new("root.demo")
                .notification("changed", NotificationDescriptor::broadcast())])
            .unwrap();
        registry
            .register([NamespaceRegistration::new("root.demo").call("ping", constant(json!(1)))])
            .unwrap();

        assert!(registry.lookup_notification("root.demo", "changed").is_some());
        assert!(registry.lookup_call_handler("root.demo", "ping").is_some());
    }

    #[test]
    fn test_malformed_batch_is_rejected_whole() {
        let mut registry = Registry::new();
        let result = registry.register([
            NamespaceRegistration::new("root.good").call("ping", constant(json!(1))),
            NamespaceRegistration::new("root.bad").call("", constant(json!(1))),
        ]);

        assert!(matches!(result, Err(RegistryError::InvalidName(_))));
        assert!(registry.is_empty());

        let result = registry.register([NamespaceRegistration::new("")]);
        assert!(matches!(result, Err(RegistryError::InvalidName(_))));
    }

    #[test]
    fn test_registry_builder() {
        let registry = RegistryBuilder::new()
            .with(NamespaceRegistration::new("root.b"))
            .with(NamespaceRegistration::new("root.a"))
            .build()
            .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.namespaces(), vec!["root.a", "root.b"]);
        assert_eq!(registry.iter().count(), 2);
    }
}
