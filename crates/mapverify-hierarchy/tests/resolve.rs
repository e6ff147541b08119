use mapverify_classfile::access::*;
use mapverify_classfile::opcodes::*;
use mapverify_classfile::ClassFile;
use mapverify_hierarchy::{ClassDirectory, ClassState, MethodId, StructuralFault};
use mapverify_test_utils::{ClassBuilder, CodeBuilder};
use pretty_assertions::assert_eq;

fn directory(owned: Vec<ClassFile>) -> ClassDirectory {
    let mut dir = ClassDirectory::new();
    for class in owned {
        dir.ingest(class, true).unwrap();
    }
    dir.resolve_all();
    dir
}

fn method(dir: &ClassDirectory, class: &str, name: &str, desc: &str) -> MethodId {
    let class = dir.lookup(class).unwrap();
    dir.find_method(class, name, desc).unwrap()
}

fn roots(dir: &ClassDirectory, id: MethodId) -> Vec<String> {
    dir.root_closure(id)
        .iter()
        .map(|&m| dir.describe_method(m))
        .collect()
}

fn assert_fixpoint(dir: &ClassDirectory) {
    for class in dir.classes() {
        for m in dir.class(class).methods() {
            for &root in dir.root_closure(m) {
                assert_eq!(dir.overrides(root).count(), 0, "{}", dir.describe_method(root));
                assert_eq!(dir.root_closure(root), &[root]);
            }
        }
    }
}

#[test]
fn stack_is_breadth_first_and_deduplicated() {
    let dir = directory(vec![
        ClassBuilder::interface("I0").build(),
        ClassBuilder::interface("I1").implements("I0").build(),
        ClassBuilder::interface("I2").implements("I0").build(),
        ClassBuilder::new("A").build(),
        ClassBuilder::new("B").extends("A").build(),
        ClassBuilder::new("C")
            .extends("B")
            .implements("I1")
            .implements("I2")
            .build(),
    ]);
    let c = dir.lookup("C").unwrap();
    let names: Vec<&str> = dir.stack(c).iter().map(|&id| dir.class(id).name()).collect();
    assert_eq!(names, vec!["B", "I1", "I2", "A", "java/lang/Object", "I0"]);
    assert!(!dir.stack(c).contains(&c));
    assert_eq!(dir.class(c).state(), ClassState::Resolved);
    assert!(!dir.class(dir.lookup("java/lang/Object").unwrap()).was_read());
}

#[test]
fn multi_level_overrides_collapse_to_the_root() {
    let dir = directory(vec![
        ClassBuilder::new("A").method(ACC_PUBLIC, "foo", "()V").build(),
        ClassBuilder::new("B").extends("A").method(ACC_PUBLIC, "foo", "()V").build(),
        ClassBuilder::new("C").extends("B").method(ACC_PUBLIC, "foo", "()V").build(),
    ]);
    assert_eq!(roots(&dir, method(&dir, "C", "foo", "()V")), vec!["A.foo()V"]);
    assert_eq!(roots(&dir, method(&dir, "A", "foo", "()V")), vec!["A.foo()V"]);
    assert_fixpoint(&dir);
}

#[test]
fn private_static_and_final_members_are_not_overridden() {
    let dir = directory(vec![
        ClassBuilder::new("A")
            .method(ACC_PRIVATE, "p", "()V")
            .method(ACC_PUBLIC | ACC_STATIC, "s", "()V")
            .method(ACC_PUBLIC | ACC_FINAL, "f", "()V")
            .build(),
        ClassBuilder::new("B")
            .extends("A")
            .method(ACC_PUBLIC, "p", "()V")
            .method(ACC_PUBLIC | ACC_STATIC, "s", "()V")
            .method(ACC_PUBLIC, "f", "()V")
            .build(),
    ]);
    for name in ["p", "s", "f"] {
        let b = method(&dir, "B", name, "()V");
        assert_eq!(dir.root_closure(b), &[b], "{name}");
    }
}

#[test]
fn superclass_method_satisfies_interface_through_a_diamond() {
    let dir = directory(vec![
        ClassBuilder::new("Foo").method(ACC_PUBLIC, "getCount", "()I").build(),
        ClassBuilder::interface("ICountable")
            .method(ACC_PUBLIC | ACC_ABSTRACT, "getCount", "()I")
            .build(),
        ClassBuilder::new("Bar")
            .extends("Foo")
            .implements("ICountable")
            .build(),
    ]);
    assert_eq!(
        roots(&dir, method(&dir, "Foo", "getCount", "()I")),
        vec!["ICountable.getCount()I"]
    );
    assert_fixpoint(&dir);
}

#[test]
fn one_method_satisfies_every_colliding_interface() {
    let dir = directory(vec![
        ClassBuilder::interface("J")
            .method(ACC_PUBLIC | ACC_ABSTRACT, "m", "()V")
            .build(),
        ClassBuilder::interface("K")
            .method(ACC_PUBLIC | ACC_ABSTRACT, "m", "()V")
            .build(),
        ClassBuilder::interface("L")
            .method(ACC_PUBLIC | ACC_ABSTRACT, "m", "()V")
            .build(),
        ClassBuilder::new("C")
            .implements("J")
            .implements("K")
            .implements("L")
            .method(ACC_PUBLIC, "m", "()V")
            .build(),
    ]);
    assert_eq!(
        roots(&dir, method(&dir, "C", "m", "()V")),
        vec!["J.m()V", "K.m()V", "L.m()V"]
    );
    assert_fixpoint(&dir);
}

fn bridge_body(
    owner: &str,
    name: &str,
    target_desc: &str,
    args: &[(u8, u16, Option<&str>)],
    ret: u8,
) -> CodeBuilder {
    let mut code = CodeBuilder::new().aload(0);
    for &(opcode, slot, cast) in args {
        code = code.load(opcode, slot);
        if let Some(cast) = cast {
            code = code.checkcast(cast);
        }
    }
    code.invoke(INVOKEVIRTUAL, owner, name, target_desc).ret(ret)
}

#[test]
fn bridges_carry_their_roots_to_the_target() {
    let dir = directory(vec![
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
                bridge_body("Box", "get", "()Ljava/lang/String;", &[], ARETURN),
            )
            .build(),
    ]);
    let bridge = method(&dir, "Box", "get", "()Ljava/lang/Object;");
    let target = method(&dir, "Box", "get", "()Ljava/lang/String;");
    assert_eq!(dir.bridge_target(bridge), Some(target));
    assert_eq!(dir.bridges_to(target), &[bridge]);
    assert_eq!(roots(&dir, target), vec!["Supplier.get()Ljava/lang/Object;"]);
    assert_fixpoint(&dir);
}

#[test]
fn bridge_in_unresolved_subclass_is_merged_later() {
    let dir = directory(vec![
        ClassBuilder::new("Base")
            .method(ACC_PUBLIC, "process", "(Ljava/lang/String;)V")
            .build(),
        ClassBuilder::interface("Handler")
            .method(ACC_PUBLIC | ACC_ABSTRACT, "process", "(Ljava/lang/Object;)V")
            .build(),
        ClassBuilder::new("Sub")
            .extends("Base")
            .implements("Handler")
            .method_with_code(
                ACC_PUBLIC | ACC_SYNTHETIC | ACC_BRIDGE,
                "process",
                "(Ljava/lang/Object;)V",
                bridge_body(
                    "Base",
                    "process",
                    "(Ljava/lang/String;)V",
                    &[(ALOAD, 1, Some("java/lang/String"))],
                    RETURN,
                ),
            )
            .build(),
    ]);
    let base = method(&dir, "Base", "process", "(Ljava/lang/String;)V");
    assert_eq!(roots(&dir, base), vec!["Handler.process(Ljava/lang/Object;)V"]);
    assert_fixpoint(&dir);
}

#[test]
fn lambda_bodies_are_never_bouncers() {
    let dir = directory(vec![ClassBuilder::new("L")
        .method(ACC_PUBLIC, "run", "()V")
        .method_with_code(
            ACC_PRIVATE | ACC_SYNTHETIC,
            "lambda$go$0",
            "()V",
            CodeBuilder::new()
                .aload(0)
                .invoke(INVOKEVIRTUAL, "L", "run", "()V")
                .ret(RETURN),
        )
        .method_with_code(
            ACC_PUBLIC,
            "go",
            "()V",
            CodeBuilder::new().lambda("L", "lambda$go$0", "()V").ret(RETURN),
        )
        .build()]);
    let lambda = dir.method(method(&dir, "L", "lambda$go$0", "()V"));
    assert!(lambda.is_lambda());
    assert!(lambda.bounce().is_none());
}

#[test]
fn inheritance_cycles_terminate() {
    let dir = directory(vec![
        ClassBuilder::new("A").extends("B").method(ACC_PUBLIC, "x", "()V").build(),
        ClassBuilder::new("B").extends("A").method(ACC_PUBLIC, "x", "()V").build(),
    ]);
    let a = dir.lookup("A").unwrap();
    let b = dir.lookup("B").unwrap();
    assert_eq!(dir.stack(a), &[b]);
    assert_eq!(dir.class(a).state(), ClassState::Resolved);
    assert_eq!(dir.class(b).state(), ClassState::Resolved);
}

#[test]
fn ingest_fails_closed() {
    let mut dir = ClassDirectory::new();
    assert_eq!(
        dir.ingest(ClassBuilder::new("X").extends("X").build(), true),
        Err(StructuralFault::SelfInheritance("X".into()))
    );
    assert!(dir.lookup("X").is_none());

    let bad = ClassBuilder::new("Y").field(0, "f", "Q").build();
    assert!(matches!(
        dir.ingest(bad, true),
        Err(StructuralFault::InvalidDescriptor { .. })
    ));
    assert!(dir.lookup("Y").is_none());

    let first = ClassBuilder::new("Z").method(ACC_PUBLIC, "a", "()V").build();
    let second = ClassBuilder::new("Z").method(ACC_PUBLIC, "b", "()V").build();
    let z = dir.ingest(first, false).unwrap();
    assert_eq!(
        dir.ingest(second, true),
        Err(StructuralFault::DuplicateClass("Z".into()))
    );
    assert!(dir.find_method(z, "a", "()V").is_some());
    assert!(dir.find_method(z, "b", "()V").is_none());
    assert!(!dir.class(z).is_owned());
}

#[test]
fn method_bodies_are_kept_for_owned_classes_only() {
    let class = |name: &str| {
        ClassBuilder::new(name)
            .method_with_code(ACC_PUBLIC, "m", "()V", CodeBuilder::new().ret(RETURN))
            .build()
    };
    let mut dir = ClassDirectory::new();
    let lib = dir.ingest(class("Lib"), false).unwrap();
    let own = dir.ingest(class("Own"), true).unwrap();
    let m = |c| dir.method(dir.find_method(c, "m", "()V").unwrap()).code().is_some();
    assert!(!m(lib));
    assert!(m(own));
    assert_eq!(dir.owned().collect::<Vec<_>>(), vec![own]);
}
