use std::fmt;

use serde::Serialize;

/// Visibility that made a reference illegal after renaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessLevel {
    Protected,
    Private,
    Default,
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AccessLevel::Protected => "PROTECTED",
            AccessLevel::Private => "PRIVATE",
            AccessLevel::Default => "DEFAULT",
        })
    }
}

/// Methods of one override group that share a mapped name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MappedGroup {
    pub mapped: String,
    /// `Owner.name(desc)ret` in original names, sorted.
    pub methods: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateIdReason {
    /// The id is used by more than one mapped name.
    DistinctNames,
    FieldAndMethod,
    MultipleFields,
    /// The methods do not share an override root.
    UnrelatedMethods,
}

impl fmt::Display for DuplicateIdReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DuplicateIdReason::DistinctNames => "distinct names",
            DuplicateIdReason::FieldAndMethod => "field and method",
            DuplicateIdReason::MultipleFields => "multiple fields",
            DuplicateIdReason::UnrelatedMethods => "unrelated methods",
        })
    }
}

/// One problem reported by a verifier.
///
/// Class and member names are the original (obfuscated) names unless the field says `mapped`,
/// except for access and naming findings which speak in mapped names.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    InvalidAccess {
        accessor: String,
        target: String,
        level: AccessLevel,
    },
    FieldShade {
        class: String,
        field: String,
        parent: String,
        parent_field: String,
        mapped: String,
    },
    MethodShade {
        class: String,
        method: String,
        descriptor: String,
        parent: String,
        parent_method: String,
        mapped: String,
    },
    /// A method reuses the placeholder name of a private ancestor method.
    BadOverride {
        class: String,
        method: String,
        descriptor: String,
        parent: String,
        parent_method: String,
        mapped: String,
    },
    OverrideMismatch {
        groups: Vec<MappedGroup>,
    },
    DuplicateId {
        id: u64,
        reason: DuplicateIdReason,
        names: Vec<String>,
        members: Vec<String>,
    },
    MissingConstructor {
        class: String,
        descriptor: String,
    },
    DuplicateConstructor {
        key: String,
        ids: Vec<u32>,
    },
    ClassName {
        class: String,
        problems: Vec<String>,
    },
    UnnamedClass {
        class: String,
    },
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::InvalidAccess {
                accessor,
                target,
                level,
            } => write!(f, "Invalid Access: {accessor} -> {target} {level}"),
            Finding::FieldShade {
                class,
                field,
                parent,
                parent_field,
                mapped,
            } => write!(f, "Shade: {class}/{field} {parent}/{parent_field} {mapped}"),
            Finding::MethodShade {
                class,
                method,
                descriptor,
                parent,
                parent_method,
                mapped,
            } => write!(
                f,
                "Shade: {class}/{method} {parent}/{parent_method} {descriptor} {mapped}"
            ),
            Finding::BadOverride {
                class,
                method,
                descriptor,
                parent,
                parent_method,
                mapped,
            } => write!(
                f,
                "BadOverride: {class}/{method} {descriptor} -> {parent}/{parent_method} {descriptor} -- {mapped}"
            ),
            Finding::OverrideMismatch { groups } => {
                f.write_str("Invalid Override:")?;
                for (i, group) in groups.iter().enumerate() {
                    let sep = if i == 0 { " " } else { "; " };
                    write!(f, "{sep}{}: {}", group.mapped, group.methods.join(", "))?;
                }
                Ok(())
            }
            Finding::DuplicateId {
                id,
                reason,
                names,
                members,
            } => write!(
                f,
                "Duplicate ID: {id} ({}) {reason}: {}",
                names.join(", "),
                members.join(", ")
            ),
            Finding::MissingConstructor { class, descriptor } => {
                write!(f, "Missing Ctr: {class} {descriptor}")
            }
            Finding::DuplicateConstructor { key, ids } => {
                let ids: Vec<String> = ids.iter().map(u32::to_string).collect();
                write!(f, "Duplicate Ctr: {key} {}", ids.join(", "))
            }
            Finding::ClassName { class, problems } => {
                write!(f, "{class} {}", problems.join(" "))
            }
            Finding::UnnamedClass { class } => write!(f, "Unnamed Class: {class}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_report_lines() {
        let access = Finding::InvalidAccess {
            accessor: "net/a/Foo".into(),
            target: "net/b/Bar/count".into(),
            level: AccessLevel::Protected,
        };
        assert_eq!(
            access.to_string(),
            "Invalid Access: net/a/Foo -> net/b/Bar/count PROTECTED"
        );

        let mismatch = Finding::OverrideMismatch {
            groups: vec![
                MappedGroup {
                    mapped: "bar".into(),
                    methods: vec!["A.foo()V".into()],
                },
                MappedGroup {
                    mapped: "baz".into(),
                    methods: vec!["B.foo()V".into()],
                },
            ],
        };
        assert_eq!(
            mismatch.to_string(),
            "Invalid Override: bar: A.foo()V; baz: B.foo()V"
        );

        let ctr = Finding::DuplicateConstructor {
            key: "net/Foo(I)V".into(),
            ids: vec![3, 7],
        };
        assert_eq!(ctr.to_string(), "Duplicate Ctr: net/Foo(I)V 3, 7");
    }

    #[test]
    fn serializes_with_kind_tag() {
        let finding = Finding::UnnamedClass {
            class: "net/C_12_".into(),
        };
        let json = serde_json::to_value(&finding).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "kind": "unnamed_class", "class": "net/C_12_" })
        );
    }
}
