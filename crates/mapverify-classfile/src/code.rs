use crate::constant_pool::{BootstrapArgument, ConstantPool, MethodHandle};
use crate::error::{Error, Result};
use crate::opcodes::*;
use crate::reader::Reader;

/// A bootstrap method entry from the `BootstrapMethods` class attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapMethod {
    pub handle: MethodHandle,
    pub arguments: Vec<BootstrapArgument>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvokeDynamic {
    pub name: String,
    pub descriptor: String,
    pub bootstrap: BootstrapMethod,
}

/// Simplified per-instruction summary of a method body.
///
/// Only the instruction shapes that matter for hierarchy analysis keep their operands; every
/// other opcode is reported as [`Insn::Other`].
#[derive(Debug, Clone, PartialEq)]
pub enum Insn {
    /// Local variable load/store or `ret`. Short forms are normalized: `aload_0` becomes
    /// `Var { opcode: ALOAD, slot: 0 }`.
    Var { opcode: u8, slot: u16 },
    /// `new`, `anewarray`, `checkcast`, `instanceof` or `multianewarray`. `class` is an internal
    /// name or, for array types, an array descriptor.
    Type { opcode: u8, class: String },
    Field {
        opcode: u8,
        owner: String,
        name: String,
        descriptor: String,
    },
    Method {
        opcode: u8,
        owner: String,
        name: String,
        descriptor: String,
        interface: bool,
    },
    InvokeDynamic(InvokeDynamic),
    Return { opcode: u8 },
    Other { opcode: u8 },
}

impl Insn {
    pub fn opcode(&self) -> u8 {
        match self {
            Insn::Var { opcode, .. }
            | Insn::Type { opcode, .. }
            | Insn::Field { opcode, .. }
            | Insn::Method { opcode, .. }
            | Insn::Return { opcode }
            | Insn::Other { opcode } => *opcode,
            Insn::InvokeDynamic(_) => INVOKEDYNAMIC,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Code {
    pub max_stack: u16,
    pub max_locals: u16,
    pub instructions: Vec<Insn>,
}

pub(crate) fn parse_bootstrap_methods(
    reader: &mut Reader<'_>,
    cp: &ConstantPool,
) -> Result<Vec<BootstrapMethod>> {
    let count = reader.read_u2()? as usize;
    let mut methods = Vec::with_capacity(count);
    for _ in 0..count {
        let handle = cp.get_method_handle(reader.read_u2()?)?;
        let argc = reader.read_u2()? as usize;
        let mut arguments = Vec::with_capacity(argc);
        for _ in 0..argc {
            arguments.push(cp.get_bootstrap_argument(reader.read_u2()?)?);
        }
        methods.push(BootstrapMethod { handle, arguments });
    }
    Ok(methods)
}

/// Decodes the body of a `Code` attribute (everything after `attribute_length`).
pub(crate) fn parse_code(
    info: &[u8],
    cp: &ConstantPool,
    bootstrap_methods: &[BootstrapMethod],
) -> Result<Code> {
    let mut reader = Reader::new(info);
    let max_stack = reader.read_u2()?;
    let max_locals = reader.read_u2()?;
    let code_length = reader.read_u4()? as usize;
    let bytecode = reader.read_bytes(code_length)?;

    let exception_table_length = reader.read_u2()? as usize;
    reader.skip(exception_table_length * 8)?;
    let attributes_count = reader.read_u2()? as usize;
    for _ in 0..attributes_count {
        reader.skip(2)?;
        let length = reader.read_u4()? as usize;
        reader.skip(length)?;
    }
    reader.ensure_empty("Code attribute")?;

    Ok(Code {
        max_stack,
        max_locals,
        instructions: decode_instructions(bytecode, cp, bootstrap_methods)?,
    })
}

fn decode_instructions(
    bytecode: &[u8],
    cp: &ConstantPool,
    bootstrap_methods: &[BootstrapMethod],
) -> Result<Vec<Insn>> {
    let mut r = Reader::new(bytecode);
    let mut out = Vec::new();

    while r.remaining() > 0 {
        let offset = r.position();
        let opcode = r.read_u1()?;
        let insn = match opcode {
            ILOAD..=ALOAD | ISTORE..=ASTORE | 0xa9 => Insn::Var {
                opcode,
                slot: r.read_u1()? as u16,
            },
            0x1a..=0x2d => {
                let k = opcode - 0x1a;
                Insn::Var {
                    opcode: ILOAD + k / 4,
                    slot: (k % 4) as u16,
                }
            }
            0x3b..=0x4e => {
                let k = opcode - 0x3b;
                Insn::Var {
                    opcode: ISTORE + k / 4,
                    slot: (k % 4) as u16,
                }
            }
            // bipush, ldc, newarray
            0x10 | 0x12 | 0xbc => {
                r.skip(1)?;
                Insn::Other { opcode }
            }
            // sipush, ldc_w, ldc2_w, iinc, branches, ifnull/ifnonnull
            0x11 | 0x13 | 0x14 | IINC | 0x99..=0xa8 | 0xc6 | 0xc7 => {
                r.skip(2)?;
                Insn::Other { opcode }
            }
            // goto_w, jsr_w
            0xc8 | 0xc9 => {
                r.skip(4)?;
                Insn::Other { opcode }
            }
            TABLESWITCH => {
                skip_padding(&mut r)?;
                r.skip(4)?;
                let low = r.read_i4()?;
                let high = r.read_i4()?;
                if high < low {
                    return Err(Error::MalformedAttribute("Code"));
                }
                let entries = (high as i64 - low as i64 + 1) as usize;
                r.skip(entries * 4)?;
                Insn::Other { opcode }
            }
            LOOKUPSWITCH => {
                skip_padding(&mut r)?;
                r.skip(4)?;
                let pairs = r.read_i4()?;
                if pairs < 0 {
                    return Err(Error::MalformedAttribute("Code"));
                }
                r.skip(pairs as usize * 8)?;
                Insn::Other { opcode }
            }
            IRETURN..=RETURN => Insn::Return { opcode },
            GETSTATIC..=PUTFIELD => {
                let field = cp.get_member_ref(r.read_u2()?)?;
                Insn::Field {
                    opcode,
                    owner: field.owner,
                    name: field.name,
                    descriptor: field.descriptor,
                }
            }
            INVOKEVIRTUAL..=INVOKEINTERFACE => {
                let method = cp.get_member_ref(r.read_u2()?)?;
                if opcode == INVOKEINTERFACE {
                    r.skip(2)?;
                }
                Insn::Method {
                    opcode,
                    owner: method.owner,
                    name: method.name,
                    descriptor: method.descriptor,
                    interface: method.interface,
                }
            }
            INVOKEDYNAMIC => {
                let (bootstrap, name, descriptor) = cp.get_invoke_dynamic(r.read_u2()?)?;
                r.skip(2)?;
                let bootstrap = bootstrap_methods
                    .get(bootstrap as usize)
                    .cloned()
                    .ok_or(Error::InvalidBootstrapIndex(bootstrap))?;
                Insn::InvokeDynamic(InvokeDynamic {
                    name,
                    descriptor,
                    bootstrap,
                })
            }
            NEW | ANEWARRAY | CHECKCAST | INSTANCEOF => Insn::Type {
                opcode,
                class: cp.get_class_name(r.read_u2()?)?,
            },
            MULTIANEWARRAY => {
                let class = cp.get_class_name(r.read_u2()?)?;
                r.skip(1)?;
                Insn::Type { opcode, class }
            }
            WIDE => {
                let inner = r.read_u1()?;
                match inner {
                    ILOAD..=ALOAD | ISTORE..=ASTORE | 0xa9 => Insn::Var {
                        opcode: inner,
                        slot: r.read_u2()?,
                    },
                    IINC => {
                        r.skip(4)?;
                        Insn::Other { opcode: IINC }
                    }
                    _ => {
                        return Err(Error::InvalidOpcode {
                            opcode: inner,
                            offset: offset + 1,
                        })
                    }
                }
            }
            0x00..=0x0f | 0x2e..=0x35 | 0x4f..=0x83 | 0x85..=0x98 | 0xbe | 0xbf | 0xc2 | 0xc3 => {
                Insn::Other { opcode }
            }
            _ => return Err(Error::InvalidOpcode { opcode, offset }),
        };
        out.push(insn);
    }

    Ok(out)
}

/// Switch operands start at the next 4-byte boundary relative to the start of the bytecode.
fn skip_padding(r: &mut Reader<'_>) -> Result<()> {
    let pad = (4 - r.position() % 4) % 4;
    r.skip(pad)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_pool() -> ConstantPool {
        ConstantPool::parse(&mut Reader::new(&[0x00, 0x01])).unwrap()
    }

    #[test]
    fn switch_padding_and_wide_loads() {
        let bytecode = [
            0x2a, // aload_0
            TABLESWITCH,
            0x00, 0x00, // padding
            0x00, 0x00, 0x00, 0x10, // default
            0x00, 0x00, 0x00, 0x00, // low
            0x00, 0x00, 0x00, 0x01, // high
            0x00, 0x00, 0x00, 0x10,
            0x00, 0x00, 0x00, 0x10,
            WIDE, ILOAD, 0x01, 0x00,
            0x4c, // astore_1
            RETURN,
        ];
        let insns = decode_instructions(&bytecode, &empty_pool(), &[]).unwrap();
        assert_eq!(
            insns,
            vec![
                var(ALOAD, 0),
                Insn::Other { opcode: TABLESWITCH },
                var(ILOAD, 256),
                var(ASTORE, 1),
                Insn::Return { opcode: RETURN },
            ]
        );
    }

    fn var(opcode: u8, slot: u16) -> Insn {
        Insn::Var { opcode, slot }
    }

    #[test]
    fn rejects_unknown_opcodes() {
        let err = decode_instructions(&[0x00, 0xcb], &empty_pool(), &[]).unwrap_err();
        assert_eq!(
            err,
            Error::InvalidOpcode {
                opcode: 0xcb,
                offset: 1
            }
        );
    }
}
