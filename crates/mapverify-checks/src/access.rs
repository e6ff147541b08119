use std::collections::HashSet;

use mapverify_classfile::access::Visibility;
use mapverify_classfile::Insn;
use mapverify_hierarchy::{ClassDirectory, ClassId};

use crate::findings::{AccessLevel, Finding};
use crate::{Verifier, VerifyContext};

/// Flags field, method and type references that the renamed code could no longer make:
/// package-private or protected members whose declaring class moved to another package, and
/// private members reached from another class.
pub struct AccessLevelChecker;

/// A referenced member or class, resolved to where it is declared.
struct Target {
    declaring: ClassId,
    /// Mapped `owner/member` (methods append the mapped descriptor), or the mapped class name.
    display: String,
    access: u16,
}

impl Verifier for AccessLevelChecker {
    fn name(&self) -> &'static str {
        "accesslevels"
    }

    fn verify(&self, ctx: &VerifyContext<'_>) -> Vec<Finding> {
        let dir = ctx.directory;
        let mut findings = Vec::new();
        for class in dir.owned() {
            let record = dir.class(class);
            let accessor = ctx.mappings.remap_class(record.name());
            let package = package_of(&accessor).to_owned();
            tracing::trace!(class = %accessor, "checking access levels");

            let mut warned = HashSet::new();
            for method in record.methods() {
                let Some(code) = dir.method(method).code() else {
                    continue;
                };
                for insn in code {
                    let Some(target) = resolve_target(ctx, class, insn) else {
                        continue;
                    };
                    let same_package = package == package_of(&ctx.mappings.remap_class(
                        dir.class(target.declaring).name(),
                    ));
                    let subclass = dir.stack(class).contains(&target.declaring);
                    let is_self = target.declaring == class;

                    let level = match Visibility::from_flags(target.access) {
                        Visibility::Public => None,
                        Visibility::Protected => {
                            (!same_package && !subclass).then_some(AccessLevel::Protected)
                        }
                        Visibility::Private => (!is_self).then_some(AccessLevel::Private),
                        Visibility::Package => {
                            (!is_self && !same_package).then_some(AccessLevel::Default)
                        }
                    };
                    if let Some(level) = level {
                        if warned.insert(target.display.clone()) {
                            findings.push(Finding::InvalidAccess {
                                accessor: accessor.clone(),
                                target: target.display,
                                level,
                            });
                        }
                    }
                }
            }
        }
        findings.sort();
        findings
    }
}

fn resolve_target(ctx: &VerifyContext<'_>, class: ClassId, insn: &Insn) -> Option<Target> {
    let dir = ctx.directory;
    let self_name = dir.class(class).name();
    match insn {
        Insn::Field { owner, name, .. } => {
            let owner = readable_owner(dir, self_name, owner)?;
            let field = search(dir, owner, |c| dir.find_field(c, name))?;
            let field = dir.field(field);
            let declaring = dir.class(field.owner()).name();
            Some(Target {
                declaring: field.owner(),
                display: format!(
                    "{}/{}",
                    ctx.mappings.remap_class(declaring),
                    ctx.mappings.remap_field(declaring, name)
                ),
                access: field.access(),
            })
        }
        Insn::Method {
            owner,
            name,
            descriptor,
            ..
        } => {
            let owner = readable_owner(dir, self_name, owner)?;
            let method = search(dir, owner, |c| dir.find_method(c, name, descriptor))?;
            let method = dir.method(method);
            let declaring = dir.class(method.owner()).name();
            Some(Target {
                declaring: method.owner(),
                display: format!(
                    "{}/{}{}",
                    ctx.mappings.remap_class(declaring),
                    ctx.mappings.remap_method(declaring, name, descriptor),
                    ctx.mappings.remap_descriptor(descriptor)
                ),
                access: method.access(),
            })
        }
        Insn::Type { class: type_name, .. } => {
            let element = element_class(type_name)?;
            let owner = readable_owner(dir, self_name, element)?;
            Some(Target {
                declaring: owner,
                display: ctx.mappings.remap_class(element),
                access: dir.class(owner).access(),
            })
        }
        _ => None,
    }
}

/// The referenced owner, unless it is the accessing class itself or was never read (its
/// access flags are unknown, so it is assumed correct).
fn readable_owner(dir: &ClassDirectory, self_name: &str, owner: &str) -> Option<ClassId> {
    if owner == self_name {
        return None;
    }
    dir.lookup(owner).filter(|&id| dir.class(id).was_read())
}

/// First hit walking `start` and then its ancestor stack.
fn search<T>(
    dir: &ClassDirectory,
    start: ClassId,
    find: impl FnMut(ClassId) -> Option<T>,
) -> Option<T> {
    std::iter::once(start)
        .chain(dir.stack(start).iter().copied())
        .find_map(find)
}

/// `[[La/B;` → `a/B`; primitive arrays have no class.
fn element_class(type_name: &str) -> Option<&str> {
    if !type_name.starts_with('[') {
        return Some(type_name);
    }
    type_name
        .trim_start_matches('[')
        .strip_prefix('L')?
        .strip_suffix(';')
}

fn package_of(class: &str) -> &str {
    class.rfind('/').map_or("", |idx| &class[..idx])
}
