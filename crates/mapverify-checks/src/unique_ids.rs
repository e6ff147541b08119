use std::collections::{BTreeMap, BTreeSet};

use mapverify_hierarchy::{FieldId, MethodId};

use crate::findings::{DuplicateIdReason, Finding};
use crate::union_find::UnionFind;
use crate::{Verifier, VerifyContext};

/// Every placeholder id (`func_123_a`, `field_123_b`, ...) must name a single entity: one
/// field, or methods that all belong to one override group.
pub struct UniqueIdChecker;

#[derive(Default)]
struct Claim<'a> {
    names: BTreeSet<&'a str>,
    fields: Vec<FieldId>,
    methods: Vec<MethodId>,
}

impl Verifier for UniqueIdChecker {
    fn name(&self) -> &'static str {
        "uniqueids"
    }

    fn verify(&self, ctx: &VerifyContext<'_>) -> Vec<Finding> {
        let dir = ctx.directory;
        let mut claims: BTreeMap<u64, Claim<'_>> = BTreeMap::new();
        for class in dir.owned() {
            let record = dir.class(class);
            for field in record.fields() {
                let mapped = ctx.mappings.remap_field(record.name(), dir.field(field).name());
                if let Some(id) = ctx.naming.field_id(mapped) {
                    let claim = claims.entry(id).or_default();
                    claim.names.insert(mapped);
                    claim.fields.push(field);
                }
            }
            for method in record.methods() {
                let mapped = ctx.mapped_method(method);
                if let Some(id) = ctx.naming.method_id(mapped) {
                    let claim = claims.entry(id).or_default();
                    claim.names.insert(mapped);
                    claim.methods.push(method);
                }
            }
        }

        // A method overriding several roots ties them into one group.
        let mut roots = UnionFind::new();
        for class in dir.owned() {
            for method in dir.class(class).methods() {
                if let [first, rest @ ..] = dir.root_closure(method) {
                    for &other in rest {
                        roots.union(*first, other);
                    }
                }
            }
        }

        let mut findings = Vec::new();
        for (id, claim) in claims {
            let reason = if claim.names.len() > 1 {
                Some(DuplicateIdReason::DistinctNames)
            } else if !claim.fields.is_empty() && !claim.methods.is_empty() {
                Some(DuplicateIdReason::FieldAndMethod)
            } else if claim.fields.len() > 1 {
                Some(DuplicateIdReason::MultipleFields)
            } else {
                let groups: BTreeSet<MethodId> = claim
                    .methods
                    .iter()
                    .flat_map(|&m| dir.root_closure(m).iter().copied())
                    .map(|root| roots.find(root))
                    .collect();
                (groups.len() > 1).then_some(DuplicateIdReason::UnrelatedMethods)
            };
            let Some(reason) = reason else {
                continue;
            };

            let mut members: Vec<String> = claim
                .fields
                .iter()
                .map(|&f| {
                    let field = dir.field(f);
                    format!("{}.{}", dir.class(field.owner()).name(), field.name())
                })
                .chain(claim.methods.iter().map(|&m| dir.describe_method(m)))
                .collect();
            members.sort();
            findings.push(Finding::DuplicateId {
                id,
                reason,
                names: claim.names.into_iter().map(str::to_owned).collect(),
                members,
            });
        }
        findings
    }
}
