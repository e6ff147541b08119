//! Naming conventions for mapped class names.

use std::collections::HashSet;

use mapverify_classfile::access::{ACC_ANNOTATION, ACC_ENUM, ACC_INTERFACE};

use crate::findings::Finding;
use crate::{Verifier, VerifyContext};

/// Checks each renamed owned class against the class naming standard:
///
/// - `Inner`: the nesting depth (`$` count) changed;
/// - `Parent: <name>`: an inner class moved to a different outer class;
/// - `Interface`: interfaces (not annotations) start with `I`;
/// - `Fake Interface`: non-interfaces do not look like one (`I` + uppercase);
/// - `Enum`: enums do not start with `Enum`;
/// - `Underscore`: no `_` outside exempt packages, and no unnamed marker;
/// - `Suffix: <suffix>`: subclasses of a listed type end with its suffix (first match wins).
///
/// Anonymous classes (numeric simple names) and classes left unrenamed only get the structural
/// checks.
pub struct ClassNameChecker;

impl Verifier for ClassNameChecker {
    fn name(&self) -> &'static str {
        "classnames"
    }

    fn verify(&self, ctx: &VerifyContext<'_>) -> Vec<Finding> {
        let dir = ctx.directory;
        let naming = ctx.naming;
        let mut findings = Vec::new();
        for class in dir.owned() {
            let record = dir.class(class);
            let obf = record.name();
            let mapped = ctx.mappings.remap_class(obf);
            let mut problems = Vec::new();

            match (obf.rsplit_once('$'), mapped.rsplit_once('$')) {
                _ if obf.matches('$').count() != mapped.matches('$').count() => {
                    problems.push("Inner".to_owned());
                }
                (Some((obf_outer, _)), Some((outer, _))) => {
                    let expected = ctx.mappings.remap_class(obf_outer);
                    if outer != expected {
                        problems.push(format!("Parent: {expected}"));
                    }
                }
                _ => {}
            }

            let simple = simple_name(&mapped);
            if !is_number(simple) && obf != mapped {
                let access = record.access();
                let interface = access & ACC_INTERFACE != 0;
                let annotation = access & ACC_ANNOTATION != 0;
                let is_enum = access & ACC_ENUM != 0;

                if interface && !annotation && !simple.starts_with('I') {
                    problems.push("Interface".to_owned());
                }
                if !interface
                    && looks_like_interface(simple)
                    && !naming.fake_interface_allowlist.iter().any(|n| n == simple)
                {
                    problems.push("Fake Interface".to_owned());
                }
                if is_enum && simple.starts_with("Enum") {
                    problems.push("Enum".to_owned());
                }
                let exempt = naming
                    .underscore_exempt
                    .iter()
                    .any(|prefix| mapped.starts_with(prefix.as_str()));
                if (simple.contains('_') && !exempt)
                    || (!naming.unnamed_marker.is_empty()
                        && simple.contains(naming.unnamed_marker.as_str()))
                {
                    problems.push("Underscore".to_owned());
                }

                if let Some(suffixes) = ctx.suffixes {
                    let ancestors: HashSet<String> = dir
                        .stack(class)
                        .iter()
                        .map(|&a| ctx.mappings.remap_class(dir.class(a).name()))
                        .collect();
                    if let Some((_, suffix)) =
                        suffixes.iter().find(|(ty, _)| ancestors.contains(*ty))
                    {
                        if !simple.ends_with(suffix) {
                            problems.push(format!("Suffix: {suffix}"));
                        }
                    }
                }
            }

            if !problems.is_empty() {
                findings.push(Finding::ClassName {
                    class: mapped,
                    problems,
                });
            }
        }
        findings.sort();
        findings
    }
}

/// Mapped class names that still carry the unnamed marker, straight from the mapping table.
pub struct UnnamedClassChecker;

impl Verifier for UnnamedClassChecker {
    fn name(&self) -> &'static str {
        "unnamedclasses"
    }

    fn verify(&self, ctx: &VerifyContext<'_>) -> Vec<Finding> {
        let marker = ctx.naming.unnamed_marker.as_str();
        if marker.is_empty() {
            return Vec::new();
        }
        let mut findings: Vec<Finding> = ctx
            .mappings
            .classes()
            .filter(|(_, mapped)| mapped.contains(marker))
            .map(|(_, mapped)| Finding::UnnamedClass {
                class: mapped.to_owned(),
            })
            .collect();
        findings.sort();
        findings.dedup();
        findings
    }
}

/// `a/b/Outer$Inner` → `Inner`.
fn simple_name(class: &str) -> &str {
    let name = class.rsplit_once('/').map_or(class, |(_, n)| n);
    name.rsplit_once('$').map_or(name, |(_, n)| n)
}

fn is_number(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit())
}

fn looks_like_interface(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next() == Some('I') && chars.next().is_some_and(char::is_uppercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_names() {
        assert_eq!(simple_name("net/a/Outer$Inner"), "Inner");
        assert_eq!(simple_name("net/a/Outer$1"), "1");
        assert_eq!(simple_name("Top"), "Top");
        assert!(is_number("12"));
        assert!(!is_number("C12"));
    }

    #[test]
    fn interface_lookalikes() {
        assert!(looks_like_interface("ITickable"));
        assert!(!looks_like_interface("Item"));
        assert!(!looks_like_interface("I"));
    }
}
