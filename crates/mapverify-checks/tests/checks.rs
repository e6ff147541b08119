use std::collections::BTreeSet;

use mapverify_checks::{
    AccessLevel, DuplicateIdReason, Finding, MappedGroup, MappingVerifier, Task,
};
use mapverify_classfile::access::*;
use mapverify_classfile::opcodes::*;
use mapverify_classfile::ClassFile;
use mapverify_config::OverrideStrategy;
use mapverify_mappings::{ConstructorTable, Mappings, SuffixTable};
use mapverify_test_utils::{ClassBuilder, CodeBuilder};
use pretty_assertions::assert_eq;

fn verifier(classes: Vec<ClassFile>, mappings: Mappings) -> MappingVerifier {
    let mut verifier = MappingVerifier::new(mappings);
    for class in classes {
        assert!(verifier.ingest(class, true));
    }
    verifier
}

fn run(mut verifier: MappingVerifier, task: Task) -> Vec<Finding> {
    verifier.push_task(task);
    let report = verifier.verify();
    let task_report = report.task(task).unwrap();
    assert_eq!(task_report.passed, task_report.findings.is_empty());
    assert_eq!(report.passed(), task_report.passed);
    task_report.findings.clone()
}

fn group(mapped: &str, methods: &[&str]) -> MappedGroup {
    MappedGroup {
        mapped: mapped.to_owned(),
        methods: methods.iter().map(|m| m.to_string()).collect(),
    }
}

fn body() -> CodeBuilder {
    CodeBuilder::new().aload(0)
}

#[test]
fn renamed_override_is_one_mismatch() {
    let classes = vec![
        ClassBuilder::new("A").method(ACC_PUBLIC, "foo", "()V").build(),
        ClassBuilder::new("B").extends("A").method(ACC_PUBLIC, "foo", "()V").build(),
    ];
    let mut mappings = Mappings::new();
    mappings.add_method("A", "foo", "()V", "bar");
    mappings.add_method("B", "foo", "()V", "baz");

    let expected = vec![Finding::OverrideMismatch {
        groups: vec![group("bar", &["A.foo()V"]), group("baz", &["B.foo()V"])],
    }];
    assert_eq!(
        run(verifier(classes.clone(), mappings.clone()), Task::OverrideNames),
        expected
    );

    let mut quick = verifier(classes, mappings);
    quick.set_override_strategy(OverrideStrategy::Quick);
    assert_eq!(run(quick, Task::OverrideNames), expected);
}

#[test]
fn shades_and_private_placeholder_reuse() {
    let classes = vec![
        ClassBuilder::new("A")
            .field(ACC_PUBLIC, "a", "I")
            .field(ACC_PRIVATE, "p", "I")
            .method(ACC_PUBLIC, "c", "()V")
            .method(ACC_PRIVATE, "e", "()V")
            .build(),
        ClassBuilder::new("B")
            .extends("A")
            .field(ACC_PUBLIC, "b", "I")
            .field(ACC_PUBLIC, "q", "I")
            .method(ACC_PUBLIC, "d", "()V")
            .method(ACC_PUBLIC, "f", "()V")
            .build(),
    ];
    let mut mappings = Mappings::new();
    mappings.add_field("A", "a", "value");
    mappings.add_field("B", "b", "value");
    mappings.add_field("A", "p", "hidden");
    mappings.add_field("B", "q", "hidden");
    mappings.add_method("A", "c", "()V", "tick");
    mappings.add_method("B", "d", "()V", "tick");
    mappings.add_method("A", "e", "()V", "func_9_e");
    mappings.add_method("B", "f", "()V", "func_9_e");

    assert_eq!(
        run(verifier(classes, mappings), Task::OverrideNames),
        vec![
            Finding::FieldShade {
                class: "B".into(),
                field: "b".into(),
                parent: "A".into(),
                parent_field: "a".into(),
                mapped: "value".into(),
            },
            Finding::MethodShade {
                class: "B".into(),
                method: "d".into(),
                descriptor: "()V".into(),
                parent: "A".into(),
                parent_method: "c".into(),
                mapped: "tick".into(),
            },
            Finding::BadOverride {
                class: "B".into(),
                method: "f".into(),
                descriptor: "()V".into(),
                parent: "A".into(),
                parent_method: "e".into(),
                mapped: "func_9_e".into(),
            },
        ]
    );
}

/// Renamed override (A/B), a superclass method satisfying an interface (Foo/ICountable/Bar)
/// and a generic bridge whose target was renamed (Supplier/Box).
fn override_fixture() -> (Vec<ClassFile>, Mappings) {
    let classes = vec![
        ClassBuilder::new("A").method(ACC_PUBLIC, "foo", "()V").build(),
        ClassBuilder::new("B").extends("A").method(ACC_PUBLIC, "foo", "()V").build(),
        ClassBuilder::new("Foo").method(ACC_PUBLIC, "getCount", "()I").build(),
        ClassBuilder::interface("ICountable")
            .method(ACC_PUBLIC | ACC_ABSTRACT, "getCount", "()I")
            .build(),
        ClassBuilder::new("Bar").extends("Foo").implements("ICountable").build(),
        ClassBuilder::interface("Supplier")
            .method(ACC_PUBLIC | ACC_ABSTRACT, "get", "()Ljava/lang/Object;")
            .build(),
        ClassBuilder::new("Box")
            .implements("Supplier")
            .method(ACC_PUBLIC, "get", "()Ljava/lang/String;")
            .method_with_code(
                ACC_PUBLIC | ACC_SYNTHETIC | ACC_BRIDGE,
                "get",
                "()Ljava/lang/Object;",
                body()
                    .invoke(INVOKEVIRTUAL, "Box", "get", "()Ljava/lang/String;")
                    .ret(ARETURN),
            )
            .build(),
    ];
    let mut mappings = Mappings::new();
    mappings.add_method("A", "foo", "()V", "bar");
    mappings.add_method("B", "foo", "()V", "baz");
    mappings.add_method("Foo", "getCount", "()I", "count");
    mappings.add_method("Box", "get", "()Ljava/lang/String;", "fetch");
    (classes, mappings)
}

fn mismatch_pairs(findings: &[Finding]) -> BTreeSet<(String, String)> {
    let mut pairs = BTreeSet::new();
    for finding in findings {
        let Finding::OverrideMismatch { groups } = finding else {
            continue;
        };
        for (i, left) in groups.iter().enumerate() {
            for right in &groups[i + 1..] {
                for a in &left.methods {
                    for b in &right.methods {
                        let pair = if a < b { (a, b) } else { (b, a) };
                        pairs.insert((pair.0.clone(), pair.1.clone()));
                    }
                }
            }
        }
    }
    pairs
}

#[test]
fn closure_follows_diamonds_and_bridges() {
    let (classes, mappings) = override_fixture();
    assert_eq!(
        run(verifier(classes, mappings), Task::OverrideNames),
        vec![
            Finding::OverrideMismatch {
                groups: vec![group("bar", &["A.foo()V"]), group("baz", &["B.foo()V"])],
            },
            Finding::OverrideMismatch {
                groups: vec![
                    group("count", &["Foo.getCount()I"]),
                    group("getCount", &["ICountable.getCount()I"]),
                ],
            },
            Finding::OverrideMismatch {
                groups: vec![
                    group("fetch", &["Box.get()Ljava/lang/String;"]),
                    group(
                        "get",
                        &["Box.get()Ljava/lang/Object;", "Supplier.get()Ljava/lang/Object;"],
                    ),
                ],
            },
        ]
    );
}

#[test]
fn quick_findings_are_a_subset_of_the_closure() {
    let (classes, mappings) = override_fixture();
    let closure = run(
        verifier(classes.clone(), mappings.clone()),
        Task::OverrideNames,
    );
    let mut quick = verifier(classes, mappings);
    quick.set_override_strategy(OverrideStrategy::Quick);
    let quick = run(quick, Task::OverrideNames);

    let closure_pairs = mismatch_pairs(&closure);
    let quick_pairs = mismatch_pairs(&quick);
    assert_eq!(quick_pairs.len(), 2, "{quick:#?}");
    assert!(
        quick_pairs.is_subset(&closure_pairs),
        "quick: {quick_pairs:#?}\nclosure: {closure_pairs:#?}"
    );
    assert!(closure_pairs.contains(&(
        "Box.get()Ljava/lang/String;".to_owned(),
        "Supplier.get()Ljava/lang/Object;".to_owned()
    )));
}

#[test]
fn access_rules_follow_visibility() {
    let touch = |owner: &str, names: &[&str]| {
        let mut code = CodeBuilder::new();
        for name in names {
            code = code.aload(1).field_insn(GETFIELD, owner, name, "I");
        }
        code.ret(RETURN)
    };
    let classes = vec![
        ClassBuilder::new("p/X")
            .field(ACC_PRIVATE, "secret", "I")
            .field(ACC_PROTECTED, "shared", "I")
            .field(0, "local", "I")
            .field(ACC_PUBLIC, "open", "I")
            .build(),
        ClassBuilder::new("q/Y")
            .method_with_code(
                ACC_PUBLIC,
                "touch",
                "(Lp/X;)V",
                touch("p/X", &["secret", "shared", "local", "open", "secret"]),
            )
            .build(),
        ClassBuilder::new("q/Z")
            .extends("p/X")
            .method_with_code(ACC_PUBLIC, "touch", "(Lp/X;)V", touch("p/X", &["shared"]))
            .method_with_code(ACC_PUBLIC, "own", "(Lq/Z;)V", touch("q/Z", &["shared", "open"]))
            .build(),
        ClassBuilder::new("p/W")
            .method_with_code(
                ACC_PUBLIC,
                "touch",
                "(Lp/X;)V",
                touch("p/X", &["local", "shared", "secret"]),
            )
            .build(),
    ];

    let access = |accessor: &str, target: &str, level| Finding::InvalidAccess {
        accessor: accessor.to_owned(),
        target: target.to_owned(),
        level,
    };
    assert_eq!(
        run(verifier(classes, Mappings::new()), Task::AccessLevels),
        vec![
            access("p/W", "p/X/secret", AccessLevel::Private),
            access("q/Y", "p/X/local", AccessLevel::Default),
            access("q/Y", "p/X/secret", AccessLevel::Private),
            access("q/Y", "p/X/shared", AccessLevel::Protected),
        ]
    );
}

#[test]
fn renaming_across_packages_breaks_package_access() {
    let classes = || {
        vec![
            ClassBuilder::new("a/Helper").method(0, "run", "()V").build(),
            ClassBuilder::new("a/Hidden").access(ACC_SUPER).build(),
            ClassBuilder::new("a/User")
                .method_with_code(
                    ACC_PUBLIC,
                    "go",
                    "(La/Helper;)V",
                    CodeBuilder::new()
                        .type_insn(NEW, "a/Hidden")
                        .aload(1)
                        .invoke(INVOKEVIRTUAL, "a/Helper", "run", "()V")
                        .aload(1)
                        .invoke(INVOKEVIRTUAL, "a/Helper", "run", "()V")
                        .checkcast("[La/Hidden;")
                        .invoke(INVOKESPECIAL, "java/lang/Object", "<init>", "()V")
                        .ret(RETURN),
                )
                .build(),
        ]
    };
    assert_eq!(run(verifier(classes(), Mappings::new()), Task::AccessLevels), vec![]);

    let mut mappings = Mappings::new();
    mappings.add_class("a/Helper", "net/one/Helper");
    mappings.add_class("a/Hidden", "net/one/Hidden");
    mappings.add_class("a/User", "net/two/User");
    assert_eq!(
        run(verifier(classes(), mappings), Task::AccessLevels),
        vec![
            Finding::InvalidAccess {
                accessor: "net/two/User".into(),
                target: "net/one/Helper/run()V".into(),
                level: AccessLevel::Default,
            },
            Finding::InvalidAccess {
                accessor: "net/two/User".into(),
                target: "net/one/Hidden".into(),
                level: AccessLevel::Default,
            },
        ]
    );
}

#[test]
fn placeholder_ids_name_one_entity() {
    let classes = vec![
        ClassBuilder::new("Left").field(ACC_PUBLIC, "a", "I").build(),
        ClassBuilder::new("Right").field(ACC_PUBLIC, "b", "I").build(),
        ClassBuilder::new("Foo").method(ACC_PUBLIC, "getCount", "()I").build(),
        ClassBuilder::interface("ICountable")
            .method(ACC_PUBLIC | ACC_ABSTRACT, "getCount", "()I")
            .build(),
        ClassBuilder::new("Bar").extends("Foo").implements("ICountable").build(),
        ClassBuilder::new("X").method(ACC_PUBLIC, "a", "()V").build(),
        ClassBuilder::new("Y")
            .method(ACC_PUBLIC, "b", "()V")
            .method(ACC_PUBLIC, "c", "()V")
            .field(ACC_PUBLIC, "d", "I")
            .build(),
    ];
    let mut mappings = Mappings::new();
    mappings.add_field("Left", "a", "field_123_x");
    mappings.add_field("Right", "b", "field_123_x");
    mappings.add_method("Foo", "getCount", "()I", "func_5_a");
    mappings.add_method("ICountable", "getCount", "()I", "func_5_a");
    mappings.add_method("X", "a", "()V", "func_7_a");
    mappings.add_method("Y", "b", "()V", "func_7_a");
    mappings.add_method("Y", "c", "()V", "m_8_");
    mappings.add_field("Y", "d", "f_8_");

    assert_eq!(
        run(verifier(classes, mappings), Task::UniqueIds),
        vec![
            Finding::DuplicateId {
                id: 7,
                reason: DuplicateIdReason::UnrelatedMethods,
                names: vec!["func_7_a".into()],
                members: vec!["X.a()V".into(), "Y.b()V".into()],
            },
            Finding::DuplicateId {
                id: 8,
                reason: DuplicateIdReason::DistinctNames,
                names: vec!["f_8_".into(), "m_8_".into()],
                members: vec!["Y.c()V".into(), "Y.d".into()],
            },
            Finding::DuplicateId {
                id: 123,
                reason: DuplicateIdReason::MultipleFields,
                names: vec!["field_123_x".into()],
                members: vec!["Left.a".into(), "Right.b".into()],
            },
        ]
    );
}

#[test]
fn interface_diamond_shares_one_id() {
    let classes = vec![
        ClassBuilder::interface("I")
            .method(ACC_PUBLIC | ACC_ABSTRACT, "m", "()V")
            .build(),
        ClassBuilder::interface("J").implements("I").build(),
        ClassBuilder::interface("K").implements("I").build(),
        ClassBuilder::new("C")
            .implements("J")
            .implements("K")
            .method(ACC_PUBLIC, "m", "()V")
            .build(),
    ];
    let mut mappings = Mappings::new();
    mappings.add_method("I", "m", "()V", "func_1_m");
    mappings.add_method("C", "m", "()V", "func_1_m");

    assert_eq!(run(verifier(classes, mappings), Task::UniqueIds), vec![]);
}

#[test]
fn colliding_interface_declarations_share_one_id() {
    let mut classes: Vec<ClassFile> = ["J", "K", "L"]
        .into_iter()
        .map(|name| {
            ClassBuilder::interface(name)
                .method(ACC_PUBLIC | ACC_ABSTRACT, "m", "()V")
                .build()
        })
        .collect();
    classes.push(
        ClassBuilder::new("C")
            .implements("J")
            .implements("K")
            .implements("L")
            .method(ACC_PUBLIC, "m", "()V")
            .build(),
    );
    let mut mappings = Mappings::new();
    for owner in ["J", "K", "L", "C"] {
        mappings.add_method(owner, "m", "()V", "func_1_m");
    }

    assert_eq!(run(verifier(classes, mappings), Task::UniqueIds), vec![]);
}

#[test]
fn constructors_must_be_registered() {
    let classes = || {
        vec![ClassBuilder::new("a")
            .method(ACC_PUBLIC, "<init>", "()V")
            .method(ACC_PUBLIC, "<init>", "(La;)V")
            .method(ACC_PUBLIC, "<init>", "(J)V")
            .build()]
    };
    let mappings = || {
        let mut mappings = Mappings::new();
        mappings.add_class("a", "net/Foo");
        mappings
    };
    assert_eq!(run(verifier(classes(), mappings()), Task::Constructors), vec![]);

    let mut with_table = verifier(classes(), mappings());
    with_table.set_constructors(
        ConstructorTable::parse("1 net/Foo (Lnet/Foo;)V\n2 net/Bar (I)V\n3 net/Bar (I)V\n")
            .unwrap(),
    );
    assert_eq!(
        run(with_table, Task::Constructors),
        vec![
            Finding::MissingConstructor {
                class: "net/Foo".into(),
                descriptor: "(J)V".into(),
            },
            Finding::DuplicateConstructor {
                key: "net/Bar(I)V".into(),
                ids: vec![2, 3],
            },
        ]
    );
}

#[test]
fn class_naming_standard() {
    let classes = vec![
        ClassBuilder::interface("a").build(),
        ClassBuilder::new("b").build(),
        ClassBuilder::new("c").build(),
        ClassBuilder::new("d")
            .access(ACC_PUBLIC | ACC_FINAL | ACC_SUPER | ACC_ENUM)
            .extends("java/lang/Enum")
            .build(),
        ClassBuilder::new("e").build(),
        ClassBuilder::new("f").build(),
        ClassBuilder::new("f$1").build(),
        ClassBuilder::new("g").build(),
        ClassBuilder::new("g$h").build(),
        ClassBuilder::new("i$j").build(),
        ClassBuilder::new("l").build(),
        ClassBuilder::new("k").extends("l").build(),
        ClassBuilder::new("m").extends("l").build(),
        ClassBuilder::new("n").build(),
    ];
    let mut mappings = Mappings::new();
    for (obf, mapped) in [
        ("a", "net/x/Tickable"),
        ("b", "net/x/IThing"),
        ("c", "net/x/IPBanList"),
        ("d", "net/x/EnumColor"),
        ("e", "net/x/Some_Name"),
        ("f", "net/x/Outer2"),
        ("g", "net/x/Outer"),
        ("g$h", "net/x/Other$Inner"),
        ("i$j", "net/x/Flat"),
        ("l", "net/x/Entity"),
        ("k", "net/x/Pig"),
        ("m", "net/x/CowEntity"),
        ("n", "net/x/C_42_"),
    ] {
        mappings.add_class(obf, mapped);
    }
    let mut verifier = verifier(classes, mappings);
    verifier.set_suffixes(SuffixTable::parse("net/x/Entity Entity\n").unwrap());

    let named = |class: &str, problems: &[&str]| Finding::ClassName {
        class: class.to_owned(),
        problems: problems.iter().map(|p| p.to_string()).collect(),
    };
    assert_eq!(
        run(verifier, Task::ClassNames),
        vec![
            named("net/x/C_42_", &["Underscore"]),
            named("net/x/EnumColor", &["Enum"]),
            named("net/x/Flat", &["Inner"]),
            named("net/x/IThing", &["Fake Interface"]),
            named("net/x/Other$Inner", &["Parent: net/x/Outer"]),
            named("net/x/Pig", &["Suffix: Entity"]),
            named("net/x/Some_Name", &["Underscore"]),
            named("net/x/Tickable", &["Interface"]),
        ]
    );
}

#[test]
fn unnamed_classes_come_from_the_mapping_table() {
    let mut mappings = Mappings::new();
    mappings.add_class("a", "net/x/C_1234_");
    mappings.add_class("b", "net/x/Named");
    mappings.add_class("c", "net/x/Outer$C_77_");
    assert_eq!(
        run(verifier(vec![], mappings), Task::UnnamedClasses),
        vec![
            Finding::UnnamedClass {
                class: "net/x/C_1234_".into(),
            },
            Finding::UnnamedClass {
                class: "net/x/Outer$C_77_".into(),
            },
        ]
    );
}
