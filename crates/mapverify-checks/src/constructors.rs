use crate::findings::Finding;
use crate::{Verifier, VerifyContext};

/// Non-default constructors of owned classes must appear in the constructor id table, and no
/// table key may carry more than one id. Passes when no table was loaded.
pub struct ConstructorChecker;

impl Verifier for ConstructorChecker {
    fn name(&self) -> &'static str {
        "constructors"
    }

    fn verify(&self, ctx: &VerifyContext<'_>) -> Vec<Finding> {
        let Some(table) = ctx.constructors else {
            tracing::debug!("no constructor table loaded; skipping");
            return Vec::new();
        };

        let dir = ctx.directory;
        let mut findings = Vec::new();
        for class in dir.owned() {
            let record = dir.class(class);
            let mapped_class = ctx.mappings.remap_class(record.name());
            for method in record.methods() {
                let m = dir.method(method);
                if m.name() != "<init>" || m.descriptor() == "()V" {
                    continue;
                }
                let descriptor = ctx.mappings.remap_descriptor(m.descriptor());
                if !table.contains(&mapped_class, &descriptor) {
                    findings.push(Finding::MissingConstructor {
                        class: mapped_class.clone(),
                        descriptor,
                    });
                }
            }
        }
        findings.extend(
            table
                .duplicates()
                .map(|(key, ids)| Finding::DuplicateConstructor {
                    key: key.to_owned(),
                    ids: ids.to_vec(),
                }),
        );
        findings.sort();
        findings
    }
}
