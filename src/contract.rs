//! Namespace naming contract.
//!
//! Every namespace key must start with the configured root prefix. The check
//! runs once at boot, before the dispatcher is handed to a transport, and again
//! on every post-boot registration.

use crate::error::ContractViolation;
use crate::registry::{NamespaceRegistration, Registry};

/// Check a single namespace key against `prefix`.
pub fn check_namespace(namespace: &str, prefix: &str) -> Result<(), ContractViolation> {
    if namespace.starts_with(prefix) {
        Ok(())
    } else {
        Err(ContractViolation {
            namespace: namespace.to_string(),
            prefix: prefix.to_string(),
        })
    }
}

/// Validate every namespace in `registry`.
///
/// Reports the first offending key in namespace order.
pub fn validate_namespaces(registry: &Registry, prefix: &str) -> Result<(), ContractViolation> {
    registry
        .namespaces()
        .into_iter()
        .try_for_each(|namespace| check_namespace(namespace, prefix))
}

/// Validate a batch of registrations before it is merged.
pub fn validate_registrations<'a, I>(registrations: I, prefix: &str) -> Result<(), ContractViolation>
where
    I: IntoIterator<Item = &'a NamespaceRegistration>,
{
    registrations
        .into_iter()
        .try_for_each(|registration| check_namespace(registration.namespace(), prefix))
}
