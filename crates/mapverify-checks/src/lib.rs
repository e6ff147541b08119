//! Verifiers that check a rename mapping against a resolved class hierarchy, and the
//! [`MappingVerifier`] that loads inputs and runs them.
//!
//! Every verifier is a read-only pass over a [`VerifyContext`] returning typed [`Finding`]s.
//! Verifiers do not depend on each other and may run in any order.

#![forbid(unsafe_code)]

mod access;
mod constructors;
mod findings;
mod naming;
mod overrides;
mod union_find;
mod unique_ids;
mod verifier;

use mapverify_config::{NamingConfig, OverrideStrategy};
use mapverify_hierarchy::{ClassDirectory, MethodId};
use mapverify_mappings::{ConstructorTable, Mappings, SuffixTable};

pub use crate::access::AccessLevelChecker;
pub use crate::constructors::ConstructorChecker;
pub use crate::findings::{AccessLevel, DuplicateIdReason, Finding, MappedGroup};
pub use crate::naming::{ClassNameChecker, UnnamedClassChecker};
pub use crate::overrides::OverrideNameChecker;
pub use crate::unique_ids::UniqueIdChecker;
pub use crate::verifier::{MappingVerifier, Task, TaskReport, VerifyError, VerifyReport};

/// Everything a verifier may read. The directory must already be resolved.
#[derive(Clone, Copy)]
pub struct VerifyContext<'a> {
    pub directory: &'a ClassDirectory,
    pub mappings: &'a Mappings,
    /// `mappings.reverse()`, built once per run.
    pub reverse: &'a Mappings,
    pub constructors: Option<&'a ConstructorTable>,
    pub suffixes: Option<&'a SuffixTable>,
    pub naming: &'a NamingConfig,
    pub override_strategy: OverrideStrategy,
}

impl VerifyContext<'_> {
    pub(crate) fn mapped_method(&self, method: MethodId) -> &str {
        let record = self.directory.method(method);
        let owner = self.directory.class(record.owner()).name();
        self.mappings
            .remap_method(owner, record.name(), record.descriptor())
    }
}

pub trait Verifier {
    /// Task name, as accepted on the command line.
    fn name(&self) -> &'static str;

    /// Runs the check. An empty result means the check passed.
    fn verify(&self, ctx: &VerifyContext<'_>) -> Vec<Finding>;
}
