use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeSet;

/// The two questions graph construction asks about a source package.
///
/// Implemented by the repository metadata query layer; tests use an in-memory
/// table. Implementations must fail (rather than return an empty set) for a
/// package they do not know.
#[async_trait]
pub trait CapabilityIndex: Send + Sync {
    /// Capability names declared as build requirements of source package `pkg`.
    async fn build_requirements(&self, pkg: &str) -> Result<BTreeSet<String>>;

    /// Capability names provided by every binary subpackage of source package `pkg`.
    async fn capabilities_provided_by(&self, pkg: &str) -> Result<BTreeSet<String>>;
}
