use mapverify_classfile::access::{ACC_BRIDGE, ACC_PRIVATE, ACC_PUBLIC, ACC_STATIC, ACC_SYNTHETIC};
use mapverify_classfile::opcodes::*;
use mapverify_classfile::{BootstrapArgument, ClassFile, Error, Insn};
use mapverify_test_utils::{write_class, ClassBuilder, CodeBuilder};
use pretty_assertions::assert_eq;

fn fixture() -> ClassFile {
    ClassBuilder::new("a/Box")
        .implements("java/util/function/Supplier")
        .field(ACC_PRIVATE, "value", "Ljava/lang/String;")
        .field(ACC_STATIC, "COUNT", "J")
        .method_with_code(
            ACC_PUBLIC,
            "get",
            "()Ljava/lang/String;",
            CodeBuilder::new()
                .aload(0)
                .field_insn(GETFIELD, "a/Box", "value", "Ljava/lang/String;")
                .ret(ARETURN),
        )
        .method_with_code(
            ACC_PUBLIC | ACC_SYNTHETIC | ACC_BRIDGE,
            "get",
            "()Ljava/lang/Object;",
            CodeBuilder::new()
                .aload(0)
                .invoke(INVOKEVIRTUAL, "a/Box", "get", "()Ljava/lang/String;")
                .ret(ARETURN),
        )
        .method_with_code(
            ACC_PUBLIC,
            "run",
            "(Ljava/util/List;)V",
            CodeBuilder::new()
                .aload(1)
                .checkcast("java/util/ArrayList")
                .invoke(INVOKEINTERFACE, "java/util/List", "size", "()I")
                .other(0x57) // pop
                .lambda("a/Box", "lambda$run$0", "()V")
                .other(0x57)
                .ret(RETURN),
        )
        .method_with_code(
            ACC_PRIVATE | ACC_STATIC | ACC_SYNTHETIC,
            "lambda$run$0",
            "()V",
            CodeBuilder::new().ret(RETURN),
        )
        .build()
}

#[test]
fn parses_written_class() {
    let class = fixture();
    let parsed = ClassFile::parse(&write_class(&class)).unwrap();
    assert_eq!(parsed, class);
}

#[test]
fn decodes_lambda_bootstrap_arguments() {
    let parsed = ClassFile::parse(&write_class(&fixture())).unwrap();
    let run = parsed.methods.iter().find(|m| m.name == "run").unwrap();
    let indy = run
        .code
        .as_ref()
        .unwrap()
        .instructions
        .iter()
        .find_map(|insn| match insn {
            Insn::InvokeDynamic(indy) => Some(indy),
            _ => None,
        })
        .unwrap();
    assert_eq!(indy.bootstrap.handle.owner, "java/lang/invoke/LambdaMetafactory");
    assert_eq!(indy.bootstrap.handle.name, "metafactory");
    match &indy.bootstrap.arguments[1] {
        BootstrapArgument::MethodHandle(handle) => {
            assert_eq!(handle.kind, H_INVOKESTATIC);
            assert_eq!(handle.name, "lambda$run$0");
        }
        other => panic!("unexpected bootstrap argument {other:?}"),
    }
}

#[test]
fn abstract_methods_have_no_code() {
    let class = ClassBuilder::interface("a/Api")
        .method(ACC_PUBLIC | mapverify_classfile::access::ACC_ABSTRACT, "call", "()V")
        .build();
    let parsed = ClassFile::parse(&write_class(&class)).unwrap();
    assert!(parsed.methods[0].code.is_none());
    assert_eq!(parsed.super_class.as_deref(), Some("java/lang/Object"));
}

#[test]
fn rejects_bad_magic_and_truncation() {
    assert_eq!(
        ClassFile::parse(&[0xDE, 0xAD, 0xBE, 0xEF]).unwrap_err(),
        Error::InvalidMagic(0xDEADBEEF)
    );

    let bytes = write_class(&fixture());
    assert_eq!(
        ClassFile::parse(&bytes[..bytes.len() - 3]).unwrap_err(),
        Error::UnexpectedEof
    );
}
