use crate::error::{Error, Result};
use crate::reader::Reader;

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
const CONSTANT_DYNAMIC: u8 = 17;
const CONSTANT_INVOKE_DYNAMIC: u8 = 18;
const CONSTANT_MODULE: u8 = 19;
const CONSTANT_PACKAGE: u8 = 20;

#[derive(Debug, Clone)]
enum Entry {
    /// Slot 0 and the upper half of long/double constants.
    Unusable,
    Utf8(String),
    Integer(i32),
    Float(u32),
    Long(i64),
    Double(u64),
    Class(u16),
    String(u16),
    FieldRef { class: u16, name_and_type: u16 },
    MethodRef { class: u16, name_and_type: u16 },
    InterfaceMethodRef { class: u16, name_and_type: u16 },
    NameAndType { name: u16, descriptor: u16 },
    MethodHandle { kind: u8, reference: u16 },
    MethodType(u16),
    Dynamic { bootstrap: u16, name_and_type: u16 },
    InvokeDynamic { bootstrap: u16, name_and_type: u16 },
    /// Module and package names are never looked up, so only the tag is kept.
    Module,
    Package,
}

impl Entry {
    fn kind(&self) -> &'static str {
        match self {
            Entry::Unusable => "unusable",
            Entry::Utf8(_) => "Utf8",
            Entry::Integer(_) => "Integer",
            Entry::Float(_) => "Float",
            Entry::Long(_) => "Long",
            Entry::Double(_) => "Double",
            Entry::Class(_) => "Class",
            Entry::String(_) => "String",
            Entry::FieldRef { .. } => "Fieldref",
            Entry::MethodRef { .. } => "Methodref",
            Entry::InterfaceMethodRef { .. } => "InterfaceMethodref",
            Entry::NameAndType { .. } => "NameAndType",
            Entry::MethodHandle { .. } => "MethodHandle",
            Entry::MethodType(_) => "MethodType",
            Entry::Dynamic { .. } => "Dynamic",
            Entry::InvokeDynamic { .. } => "InvokeDynamic",
            Entry::Module => "Module",
            Entry::Package => "Package",
        }
    }
}

/// A resolved `Fieldref`/`Methodref`/`InterfaceMethodref` constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MemberRef {
    pub owner: String,
    pub name: String,
    pub descriptor: String,
    pub interface: bool,
}

/// A method handle constant (`CONSTANT_MethodHandle_info`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodHandle {
    /// One of the `REF_*` kinds (1..=9).
    pub kind: u8,
    pub owner: String,
    pub name: String,
    pub descriptor: String,
    pub interface: bool,
}

/// A static argument of a bootstrap method.
#[derive(Debug, Clone, PartialEq)]
pub enum BootstrapArgument {
    Int(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class(String),
    String(String),
    MethodHandle(MethodHandle),
    MethodType(String),
    /// Dynamically-computed constants are kept opaque.
    Dynamic { name: String, descriptor: String },
}

#[derive(Debug)]
pub(crate) struct ConstantPool {
    entries: Vec<Entry>,
}

impl ConstantPool {
    pub(crate) fn parse(reader: &mut Reader<'_>) -> Result<Self> {
        let count = reader.read_u2()? as usize;
        let mut entries = Vec::with_capacity(count);
        entries.push(Entry::Unusable);

        while entries.len() < count {
            let tag = reader.read_u1()?;
            let entry = match tag {
                CONSTANT_UTF8 => {
                    let len = reader.read_u2()? as usize;
                    Entry::Utf8(decode_modified_utf8(reader.read_bytes(len)?)?)
                }
                CONSTANT_INTEGER => Entry::Integer(reader.read_i4()?),
                CONSTANT_FLOAT => Entry::Float(reader.read_u4()?),
                CONSTANT_LONG => {
                    let high = reader.read_u4()? as u64;
                    let low = reader.read_u4()? as u64;
                    Entry::Long(((high << 32) | low) as i64)
                }
                CONSTANT_DOUBLE => {
                    let high = reader.read_u4()? as u64;
                    let low = reader.read_u4()? as u64;
                    Entry::Double((high << 32) | low)
                }
                CONSTANT_CLASS => Entry::Class(reader.read_u2()?),
                CONSTANT_STRING => Entry::String(reader.read_u2()?),
                CONSTANT_FIELDREF => Entry::FieldRef {
                    class: reader.read_u2()?,
                    name_and_type: reader.read_u2()?,
                },
                CONSTANT_METHODREF => Entry::MethodRef {
                    class: reader.read_u2()?,
                    name_and_type: reader.read_u2()?,
                },
                CONSTANT_INTERFACE_METHODREF => Entry::InterfaceMethodRef {
                    class: reader.read_u2()?,
                    name_and_type: reader.read_u2()?,
                },
                CONSTANT_NAME_AND_TYPE => Entry::NameAndType {
                    name: reader.read_u2()?,
                    descriptor: reader.read_u2()?,
                },
                CONSTANT_METHOD_HANDLE => Entry::MethodHandle {
                    kind: reader.read_u1()?,
                    reference: reader.read_u2()?,
                },
                CONSTANT_METHOD_TYPE => Entry::MethodType(reader.read_u2()?),
                CONSTANT_DYNAMIC => Entry::Dynamic {
                    bootstrap: reader.read_u2()?,
                    name_and_type: reader.read_u2()?,
                },
                CONSTANT_INVOKE_DYNAMIC => Entry::InvokeDynamic {
                    bootstrap: reader.read_u2()?,
                    name_and_type: reader.read_u2()?,
                },
                CONSTANT_MODULE => {
                    reader.skip(2)?;
                    Entry::Module
                }
                CONSTANT_PACKAGE => {
                    reader.skip(2)?;
                    Entry::Package
                }
                other => return Err(Error::InvalidConstantPoolTag(other)),
            };

            let wide = matches!(entry, Entry::Long(_) | Entry::Double(_));
            entries.push(entry);
            if wide {
                entries.push(Entry::Unusable);
            }
        }

        Ok(Self { entries })
    }

    fn entry(&self, index: u16) -> Result<&Entry> {
        match self.entries.get(index as usize) {
            None | Some(Entry::Unusable) => Err(Error::InvalidConstantPoolIndex(index)),
            Some(entry) => Ok(entry),
        }
    }

    fn mismatch(&self, index: u16, expected: &'static str) -> Error {
        let found = self
            .entries
            .get(index as usize)
            .map(Entry::kind)
            .unwrap_or("missing");
        Error::ConstantPoolTypeMismatch {
            index,
            expected,
            found,
        }
    }

    pub(crate) fn get_utf8(&self, index: u16) -> Result<&str> {
        match self.entry(index)? {
            Entry::Utf8(s) => Ok(s),
            _ => Err(self.mismatch(index, "Utf8")),
        }
    }

    pub(crate) fn get_class_name(&self, index: u16) -> Result<String> {
        match self.entry(index)? {
            Entry::Class(name) => Ok(self.get_utf8(*name)?.to_string()),
            _ => Err(self.mismatch(index, "Class")),
        }
    }

    pub(crate) fn get_name_and_type(&self, index: u16) -> Result<(String, String)> {
        match self.entry(index)? {
            Entry::NameAndType { name, descriptor } => Ok((
                self.get_utf8(*name)?.to_string(),
                self.get_utf8(*descriptor)?.to_string(),
            )),
            _ => Err(self.mismatch(index, "NameAndType")),
        }
    }

    pub(crate) fn get_member_ref(&self, index: u16) -> Result<MemberRef> {
        let (class, name_and_type, interface) = match self.entry(index)? {
            Entry::FieldRef {
                class,
                name_and_type,
            }
            | Entry::MethodRef {
                class,
                name_and_type,
            } => (*class, *name_and_type, false),
            Entry::InterfaceMethodRef {
                class,
                name_and_type,
            } => (*class, *name_and_type, true),
            _ => return Err(self.mismatch(index, "member reference")),
        };
        let owner = self.get_class_name(class)?;
        let (name, descriptor) = self.get_name_and_type(name_and_type)?;
        Ok(MemberRef {
            owner,
            name,
            descriptor,
            interface,
        })
    }

    pub(crate) fn get_method_handle(&self, index: u16) -> Result<MethodHandle> {
        match self.entry(index)? {
            Entry::MethodHandle { kind, reference } => {
                let target = self.get_member_ref(*reference)?;
                Ok(MethodHandle {
                    kind: *kind,
                    owner: target.owner,
                    name: target.name,
                    descriptor: target.descriptor,
                    interface: target.interface,
                })
            }
            _ => Err(self.mismatch(index, "MethodHandle")),
        }
    }

    /// Returns `(bootstrap_method_attr_index, name, descriptor)`.
    pub(crate) fn get_invoke_dynamic(&self, index: u16) -> Result<(u16, String, String)> {
        match self.entry(index)? {
            Entry::InvokeDynamic {
                bootstrap,
                name_and_type,
            } => {
                let (name, descriptor) = self.get_name_and_type(*name_and_type)?;
                Ok((*bootstrap, name, descriptor))
            }
            _ => Err(self.mismatch(index, "InvokeDynamic")),
        }
    }

    pub(crate) fn get_bootstrap_argument(&self, index: u16) -> Result<BootstrapArgument> {
        Ok(match self.entry(index)? {
            Entry::Integer(v) => BootstrapArgument::Int(*v),
            Entry::Float(bits) => BootstrapArgument::Float(f32::from_bits(*bits)),
            Entry::Long(v) => BootstrapArgument::Long(*v),
            Entry::Double(bits) => BootstrapArgument::Double(f64::from_bits(*bits)),
            Entry::Class(_) => BootstrapArgument::Class(self.get_class_name(index)?),
            Entry::String(s) => BootstrapArgument::String(self.get_utf8(*s)?.to_string()),
            Entry::MethodHandle { .. } => {
                BootstrapArgument::MethodHandle(self.get_method_handle(index)?)
            }
            Entry::MethodType(desc) => {
                BootstrapArgument::MethodType(self.get_utf8(*desc)?.to_string())
            }
            Entry::Dynamic { name_and_type, .. } => {
                let (name, descriptor) = self.get_name_and_type(*name_and_type)?;
                BootstrapArgument::Dynamic { name, descriptor }
            }
            _ => return Err(self.mismatch(index, "loadable constant")),
        })
    }
}

/// Decodes the JVM's "modified UTF-8" (`0xC0 0x80` for NUL, surrogate pairs encoded as two
/// 3-byte sequences).
fn decode_modified_utf8(bytes: &[u8]) -> Result<String> {
    if bytes.iter().all(|b| (1..0x80).contains(b)) {
        // Pure ASCII is by far the common case.
        return std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| Error::InvalidModifiedUtf8);
    }

    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b0 = bytes[i] as u16;
        match bytes[i] {
            0x01..=0x7F => {
                units.push(b0);
                i += 1;
            }
            0xC0..=0xDF => {
                let b1 = continuation(bytes, i + 1)?;
                units.push(((b0 & 0x1F) << 6) | b1);
                i += 2;
            }
            0xE0..=0xEF => {
                let b1 = continuation(bytes, i + 1)?;
                let b2 = continuation(bytes, i + 2)?;
                units.push(((b0 & 0x0F) << 12) | (b1 << 6) | b2);
                i += 3;
            }
            _ => return Err(Error::InvalidModifiedUtf8),
        }
    }

    String::from_utf16(&units).map_err(|_| Error::InvalidModifiedUtf8)
}

fn continuation(bytes: &[u8], idx: usize) -> Result<u16> {
    match bytes.get(idx) {
        Some(b) if b & 0xC0 == 0x80 => Ok((b & 0x3F) as u16),
        _ => Err(Error::InvalidModifiedUtf8),
    }
}
