use std::collections::HashMap;

use mapverify_classfile::opcodes::*;
use mapverify_classfile::{
    parse_method_descriptor, BootstrapArgument, BootstrapMethod, ClassFile, ClassMember, Code,
    Insn, MethodHandle,
};

/// Serializes `class` into class file bytes that [`ClassFile::parse`] decodes back into an equal
/// value.
///
/// Panics on instructions that cannot be re-encoded (an [`Insn::Other`] whose opcode carries
/// operands) and on dynamically-computed bootstrap arguments; fixtures never need them.
pub fn write_class(class: &ClassFile) -> Vec<u8> {
    let mut pool = PoolWriter::default();
    let mut bootstraps: Vec<BootstrapMethod> = Vec::new();

    let this_class = pool.class(&class.this_class);
    let super_class = class.super_class.as_deref().map_or(0, |s| pool.class(s));
    let interfaces: Vec<u16> = class.interfaces.iter().map(|i| pool.class(i)).collect();

    let mut body = Vec::new();
    put_u2(&mut body, class.access_flags);
    put_u2(&mut body, this_class);
    put_u2(&mut body, super_class);
    put_u2(&mut body, interfaces.len() as u16);
    for i in interfaces {
        put_u2(&mut body, i);
    }
    for members in [&class.fields, &class.methods] {
        put_u2(&mut body, members.len() as u16);
        for m in members.iter() {
            write_member(&mut body, m, &mut pool, &mut bootstraps);
        }
    }

    if bootstraps.is_empty() {
        put_u2(&mut body, 0);
    } else {
        let mut info = Vec::new();
        put_u2(&mut info, bootstraps.len() as u16);
        for bsm in &bootstraps {
            put_u2(&mut info, pool.method_handle(&bsm.handle));
            put_u2(&mut info, bsm.arguments.len() as u16);
            for arg in &bsm.arguments {
                put_u2(&mut info, pool.argument(arg));
            }
        }
        put_u2(&mut body, 1);
        put_u2(&mut body, pool.utf8("BootstrapMethods"));
        put_u4(&mut body, info.len() as u32);
        body.extend_from_slice(&info);
    }

    let mut out = Vec::new();
    put_u4(&mut out, 0xCAFEBABE);
    put_u2(&mut out, class.minor_version);
    put_u2(&mut out, class.major_version);
    put_u2(&mut out, pool.next);
    out.extend_from_slice(&pool.bytes);
    out.extend_from_slice(&body);
    out
}

fn write_member(
    out: &mut Vec<u8>,
    member: &ClassMember,
    pool: &mut PoolWriter,
    bootstraps: &mut Vec<BootstrapMethod>,
) {
    put_u2(out, member.access_flags);
    put_u2(out, pool.utf8(&member.name));
    put_u2(out, pool.utf8(&member.descriptor));
    match &member.code {
        None => put_u2(out, 0),
        Some(code) => {
            let info = write_code(code, pool, bootstraps);
            put_u2(out, 1);
            put_u2(out, pool.utf8("Code"));
            put_u4(out, info.len() as u32);
            out.extend_from_slice(&info);
        }
    }
}

fn write_code(
    code: &Code,
    pool: &mut PoolWriter,
    bootstraps: &mut Vec<BootstrapMethod>,
) -> Vec<u8> {
    let mut bc = Vec::new();
    for insn in &code.instructions {
        match insn {
            Insn::Var { opcode, slot } => {
                if *slot > u8::MAX as u16 {
                    bc.push(WIDE);
                    bc.push(*opcode);
                    put_u2(&mut bc, *slot);
                } else {
                    bc.push(*opcode);
                    bc.push(*slot as u8);
                }
            }
            Insn::Type { opcode, class } => {
                bc.push(*opcode);
                put_u2(&mut bc, pool.class(class));
                if *opcode == MULTIANEWARRAY {
                    bc.push(1);
                }
            }
            Insn::Field {
                opcode,
                owner,
                name,
                descriptor,
            } => {
                bc.push(*opcode);
                put_u2(&mut bc, pool.member(CONSTANT_FIELDREF, owner, name, descriptor));
            }
            Insn::Method {
                opcode,
                owner,
                name,
                descriptor,
                interface,
            } => {
                let tag = if *interface {
                    CONSTANT_INTERFACE_METHODREF
                } else {
                    CONSTANT_METHODREF
                };
                bc.push(*opcode);
                put_u2(&mut bc, pool.member(tag, owner, name, descriptor));
                if *opcode == INVOKEINTERFACE {
                    let count = parse_method_descriptor(descriptor)
                        .map(|d| d.param_slots() + 1)
                        .unwrap_or(1);
                    bc.push(count as u8);
                    bc.push(0);
                }
            }
            Insn::InvokeDynamic(indy) => {
                let index = match bootstraps.iter().position(|b| *b == indy.bootstrap) {
                    Some(i) => i,
                    None => {
                        bootstraps.push(indy.bootstrap.clone());
                        bootstraps.len() - 1
                    }
                };
                let nat = pool.name_and_type(&indy.name, &indy.descriptor);
                let mut entry = vec![CONSTANT_INVOKE_DYNAMIC];
                put_u2(&mut entry, index as u16);
                put_u2(&mut entry, nat);
                bc.push(INVOKEDYNAMIC);
                put_u2(&mut bc, pool.add(entry, false));
                put_u2(&mut bc, 0);
            }
            Insn::Return { opcode } => bc.push(*opcode),
            Insn::Other { opcode } => {
                assert!(
                    has_no_operands(*opcode),
                    "opcode {opcode:#04x} carries operands and cannot be written from Insn::Other"
                );
                bc.push(*opcode);
            }
        }
    }

    let mut info = Vec::new();
    put_u2(&mut info, code.max_stack);
    put_u2(&mut info, code.max_locals);
    put_u4(&mut info, bc.len() as u32);
    info.extend_from_slice(&bc);
    put_u2(&mut info, 0);
    put_u2(&mut info, 0);
    info
}

fn has_no_operands(opcode: u8) -> bool {
    matches!(
        opcode,
        0x00..=0x0f | 0x2e..=0x35 | 0x4f..=0x83 | 0x85..=0x98 | 0xbe | 0xbf | 0xc2 | 0xc3
    )
}

const CONSTANT_UTF8: u8 = 1;
const CONSTANT_INTEGER: u8 = 3;
const CONSTANT_FLOAT: u8 = 4;
const CONSTANT_LONG: u8 = 5;
const CONSTANT_DOUBLE: u8 = 6;
const CONSTANT_CLASS: u8 = 7;
const CONSTANT_STRING: u8 = 8;
const CONSTANT_FIELDREF: u8 = 9;
const CONSTANT_METHODREF: u8 = 10;
const CONSTANT_INTERFACE_METHODREF: u8 = 11;
const CONSTANT_NAME_AND_TYPE: u8 = 12;
const CONSTANT_METHOD_HANDLE: u8 = 15;
const CONSTANT_METHOD_TYPE: u8 = 16;
const CONSTANT_INVOKE_DYNAMIC: u8 = 18;

struct PoolWriter {
    bytes: Vec<u8>,
    next: u16,
    seen: HashMap<Vec<u8>, u16>,
}

impl Default for PoolWriter {
    fn default() -> Self {
        Self {
            bytes: Vec::new(),
            next: 1,
            seen: HashMap::new(),
        }
    }
}

impl PoolWriter {
    fn add(&mut self, entry: Vec<u8>, wide: bool) -> u16 {
        if let Some(&index) = self.seen.get(&entry) {
            return index;
        }
        let index = self.next;
        self.next += if wide { 2 } else { 1 };
        self.bytes.extend_from_slice(&entry);
        self.seen.insert(entry, index);
        index
    }

    fn utf8(&mut self, s: &str) -> u16 {
        let encoded = encode_modified_utf8(s);
        let mut entry = vec![CONSTANT_UTF8];
        put_u2(&mut entry, encoded.len() as u16);
        entry.extend_from_slice(&encoded);
        self.add(entry, false)
    }

    fn indexed(&mut self, tag: u8, utf8: &str) -> u16 {
        let index = self.utf8(utf8);
        let mut entry = vec![tag];
        put_u2(&mut entry, index);
        self.add(entry, false)
    }

    fn class(&mut self, name: &str) -> u16 {
        self.indexed(CONSTANT_CLASS, name)
    }

    fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name = self.utf8(name);
        let descriptor = self.utf8(descriptor);
        let mut entry = vec![CONSTANT_NAME_AND_TYPE];
        put_u2(&mut entry, name);
        put_u2(&mut entry, descriptor);
        self.add(entry, false)
    }

    fn member(&mut self, tag: u8, owner: &str, name: &str, descriptor: &str) -> u16 {
        let class = self.class(owner);
        let nat = self.name_and_type(name, descriptor);
        let mut entry = vec![tag];
        put_u2(&mut entry, class);
        put_u2(&mut entry, nat);
        self.add(entry, false)
    }

    fn method_handle(&mut self, handle: &MethodHandle) -> u16 {
        let tag = match handle.kind {
            1..=4 => CONSTANT_FIELDREF,
            _ if handle.interface => CONSTANT_INTERFACE_METHODREF,
            _ => CONSTANT_METHODREF,
        };
        let reference = self.member(tag, &handle.owner, &handle.name, &handle.descriptor);
        let mut entry = vec![CONSTANT_METHOD_HANDLE, handle.kind];
        put_u2(&mut entry, reference);
        self.add(entry, false)
    }

    fn argument(&mut self, arg: &BootstrapArgument) -> u16 {
        match arg {
            BootstrapArgument::Int(v) => {
                let mut entry = vec![CONSTANT_INTEGER];
                entry.extend_from_slice(&v.to_be_bytes());
                self.add(entry, false)
            }
            BootstrapArgument::Float(v) => {
                let mut entry = vec![CONSTANT_FLOAT];
                entry.extend_from_slice(&v.to_bits().to_be_bytes());
                self.add(entry, false)
            }
            BootstrapArgument::Long(v) => {
                let mut entry = vec![CONSTANT_LONG];
                entry.extend_from_slice(&v.to_be_bytes());
                self.add(entry, true)
            }
            BootstrapArgument::Double(v) => {
                let mut entry = vec![CONSTANT_DOUBLE];
                entry.extend_from_slice(&v.to_bits().to_be_bytes());
                self.add(entry, true)
            }
            BootstrapArgument::Class(name) => self.class(name),
            BootstrapArgument::String(s) => self.indexed(CONSTANT_STRING, s),
            BootstrapArgument::MethodHandle(handle) => self.method_handle(handle),
            BootstrapArgument::MethodType(desc) => self.indexed(CONSTANT_METHOD_TYPE, desc),
            BootstrapArgument::Dynamic { .. } => {
                panic!("dynamically-computed constants are not supported in fixtures")
            }
        }
    }
}

fn encode_modified_utf8(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    for unit in s.encode_utf16() {
        match unit {
            0x0001..=0x007f => out.push(unit as u8),
            0x0000 | 0x0080..=0x07ff => {
                out.push(0xc0 | (unit >> 6) as u8);
                out.push(0x80 | (unit & 0x3f) as u8);
            }
            _ => {
                out.push(0xe0 | (unit >> 12) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3f) as u8);
                out.push(0x80 | (unit & 0x3f) as u8);
            }
        }
    }
    out
}

fn put_u2(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn put_u4(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_be_bytes());
}
