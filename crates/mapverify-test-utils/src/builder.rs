use mapverify_classfile::access::{ACC_ABSTRACT, ACC_INTERFACE, ACC_PUBLIC, ACC_SUPER};
use mapverify_classfile::opcodes::*;
use mapverify_classfile::{
    BootstrapArgument, BootstrapMethod, ClassFile, ClassMember, Code, Insn, InvokeDynamic,
    MethodHandle,
};

const LAMBDA_METAFACTORY: &str = "java/lang/invoke/LambdaMetafactory";
const METAFACTORY_DESC: &str = "(Ljava/lang/invoke/MethodHandles$Lookup;Ljava/lang/String;Ljava/lang/invoke/MethodType;Ljava/lang/invoke/MethodType;Ljava/lang/invoke/MethodHandle;Ljava/lang/invoke/MethodType;)Ljava/lang/invoke/CallSite;";

/// Fluent builder for [`ClassFile`] fixtures.
///
/// ```
/// use mapverify_classfile::access::ACC_PUBLIC;
/// use mapverify_test_utils::ClassBuilder;
///
/// let class = ClassBuilder::new("a/Foo")
///     .method(ACC_PUBLIC, "run", "()V")
///     .build();
/// assert_eq!(class.super_class.as_deref(), Some("java/lang/Object"));
/// ```
#[derive(Debug, Clone)]
pub struct ClassBuilder {
    class: ClassFile,
}

impl ClassBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            class: ClassFile {
                minor_version: 0,
                major_version: 52,
                access_flags: ACC_PUBLIC | ACC_SUPER,
                this_class: name.to_string(),
                super_class: Some("java/lang/Object".to_string()),
                interfaces: Vec::new(),
                fields: Vec::new(),
                methods: Vec::new(),
            },
        }
    }

    /// Starts an interface (`public abstract interface`).
    pub fn interface(name: &str) -> Self {
        Self::new(name).access(ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT)
    }

    pub fn access(mut self, flags: u16) -> Self {
        self.class.access_flags = flags;
        self
    }

    pub fn extends(mut self, super_class: &str) -> Self {
        self.class.super_class = Some(super_class.to_string());
        self
    }

    /// Root classes such as `java/lang/Object` have no superclass.
    pub fn no_super(mut self) -> Self {
        self.class.super_class = None;
        self
    }

    pub fn implements(mut self, interface: &str) -> Self {
        self.class.interfaces.push(interface.to_string());
        self
    }

    pub fn field(mut self, access: u16, name: &str, descriptor: &str) -> Self {
        self.class.fields.push(member(access, name, descriptor, None));
        self
    }

    pub fn method(mut self, access: u16, name: &str, descriptor: &str) -> Self {
        self.class.methods.push(member(access, name, descriptor, None));
        self
    }

    pub fn method_with_code(
        mut self,
        access: u16,
        name: &str,
        descriptor: &str,
        code: CodeBuilder,
    ) -> Self {
        self.class
            .methods
            .push(member(access, name, descriptor, Some(code.build())));
        self
    }

    pub fn build(self) -> ClassFile {
        self.class
    }
}

fn member(access: u16, name: &str, descriptor: &str, code: Option<Code>) -> ClassMember {
    ClassMember {
        access_flags: access,
        name: name.to_string(),
        descriptor: descriptor.to_string(),
        code,
    }
}

/// Builds a method body out of decoded instructions.
#[derive(Debug, Clone, Default)]
pub struct CodeBuilder {
    instructions: Vec<Insn>,
}

impl CodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insn(mut self, insn: Insn) -> Self {
        self.instructions.push(insn);
        self
    }

    pub fn load(self, opcode: u8, slot: u16) -> Self {
        self.insn(Insn::Var { opcode, slot })
    }

    pub fn aload(self, slot: u16) -> Self {
        self.load(ALOAD, slot)
    }

    pub fn type_insn(self, opcode: u8, class: &str) -> Self {
        self.insn(Insn::Type {
            opcode,
            class: class.to_string(),
        })
    }

    pub fn checkcast(self, class: &str) -> Self {
        self.type_insn(CHECKCAST, class)
    }

    pub fn field_insn(self, opcode: u8, owner: &str, name: &str, descriptor: &str) -> Self {
        self.insn(Insn::Field {
            opcode,
            owner: owner.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        })
    }

    pub fn invoke(self, opcode: u8, owner: &str, name: &str, descriptor: &str) -> Self {
        self.insn(Insn::Method {
            opcode,
            owner: owner.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            interface: opcode == INVOKEINTERFACE,
        })
    }

    /// Appends an `invokedynamic` bootstrapped by `LambdaMetafactory.metafactory` whose
    /// implementation handle points at `owner.name descriptor`.
    pub fn lambda(self, owner: &str, name: &str, descriptor: &str) -> Self {
        let implementation = MethodHandle {
            kind: H_INVOKESTATIC,
            owner: owner.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            interface: false,
        };
        self.insn(Insn::InvokeDynamic(InvokeDynamic {
            name: "run".to_string(),
            descriptor: "()Ljava/lang/Runnable;".to_string(),
            bootstrap: BootstrapMethod {
                handle: MethodHandle {
                    kind: H_INVOKESTATIC,
                    owner: LAMBDA_METAFACTORY.to_string(),
                    name: "metafactory".to_string(),
                    descriptor: METAFACTORY_DESC.to_string(),
                    interface: false,
                },
                arguments: vec![
                    BootstrapArgument::MethodType("()V".to_string()),
                    BootstrapArgument::MethodHandle(implementation),
                    BootstrapArgument::MethodType("()V".to_string()),
                ],
            },
        }))
    }

    pub fn ret(self, opcode: u8) -> Self {
        self.insn(Insn::Return { opcode })
    }

    pub fn other(self, opcode: u8) -> Self {
        self.insn(Insn::Other { opcode })
    }

    pub fn build(self) -> Code {
        Code {
            max_stack: 8,
            max_locals: 8,
            instructions: self.instructions,
        }
    }
}
