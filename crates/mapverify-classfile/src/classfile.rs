use crate::code::{parse_bootstrap_methods, parse_code, Code};
use crate::constant_pool::ConstantPool;
use crate::error::{Error, Result};
use crate::reader::Reader;

const MAGIC: u32 = 0xCAFE_BABE;

/// A decoded `.class` file, reduced to what hierarchy and reference analysis need.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassFile {
    pub minor_version: u16,
    pub major_version: u16,
    pub access_flags: u16,
    pub this_class: String,
    pub super_class: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<ClassMember>,
    pub methods: Vec<ClassMember>,
}

/// A field or method. `code` is only ever populated for methods with a body.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassMember {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
    pub code: Option<Code>,
}

/// A member whose `Code` attribute is still undecoded.
struct PendingMember<'a> {
    access_flags: u16,
    name: String,
    descriptor: String,
    code: Option<&'a [u8]>,
}

impl ClassFile {
    /// Decodes a class file. Trailing bytes and malformed attributes are errors.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut r = Reader::new(bytes);
        match r.read_u4()? {
            MAGIC => {}
            magic => return Err(Error::InvalidMagic(magic)),
        }
        let minor_version = r.read_u2()?;
        let major_version = r.read_u2()?;
        let pool = ConstantPool::parse(&mut r)?;

        let access_flags = r.read_u2()?;
        let this_class = pool.get_class_name(r.read_u2()?)?;
        let super_class = match r.read_u2()? {
            0 => None,
            index => Some(pool.get_class_name(index)?),
        };
        let interfaces = read_table(&mut r, |r| pool.get_class_name(r.read_u2()?))?;
        let fields = read_table(&mut r, |r| read_member(r, &pool))?;
        let methods = read_table(&mut r, |r| read_member(r, &pool))?;

        // BootstrapMethods trails the member tables, so bodies are decoded last.
        let mut bootstrap = Vec::new();
        for (name, info) in read_attributes(&mut r, &pool)? {
            if name == "BootstrapMethods" {
                let mut sub = Reader::new(info);
                bootstrap = parse_bootstrap_methods(&mut sub, &pool)?;
                sub.ensure_empty("BootstrapMethods attribute")?;
            }
        }
        r.ensure_empty("class file")?;

        let decode = |member: PendingMember<'_>| -> Result<ClassMember> {
            Ok(ClassMember {
                code: member
                    .code
                    .map(|info| parse_code(info, &pool, &bootstrap))
                    .transpose()?,
                access_flags: member.access_flags,
                name: member.name,
                descriptor: member.descriptor,
            })
        };
        Ok(Self {
            minor_version,
            major_version,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields: fields.into_iter().map(decode).collect::<Result<_>>()?,
            methods: methods.into_iter().map(decode).collect::<Result<_>>()?,
        })
    }
}

/// A `u2` count followed by that many items.
fn read_table<'a, T>(
    r: &mut Reader<'a>,
    mut item: impl FnMut(&mut Reader<'a>) -> Result<T>,
) -> Result<Vec<T>> {
    let count = usize::from(r.read_u2()?);
    let mut items = Vec::with_capacity(count);
    for _ in 0..count {
        items.push(item(r)?);
    }
    Ok(items)
}

/// `(name, info)` pairs of an attribute table.
fn read_attributes<'a, 'p>(
    r: &mut Reader<'a>,
    pool: &'p ConstantPool,
) -> Result<Vec<(&'p str, &'a [u8])>> {
    read_table(r, |r| {
        let name = pool.get_utf8(r.read_u2()?)?;
        let length = r.read_u4()? as usize;
        Ok((name, r.read_bytes(length)?))
    })
}

fn read_member<'a>(r: &mut Reader<'a>, pool: &ConstantPool) -> Result<PendingMember<'a>> {
    let access_flags = r.read_u2()?;
    let name = pool.get_utf8(r.read_u2()?)?.to_owned();
    let descriptor = pool.get_utf8(r.read_u2()?)?.to_owned();

    let mut code = None;
    for (attribute, info) in read_attributes(r, pool)? {
        if attribute != "Code" {
            continue;
        }
        if code.replace(info).is_some() {
            return Err(Error::MalformedAttribute("duplicate Code"));
        }
    }
    Ok(PendingMember {
        access_flags,
        name,
        descriptor,
        code,
    })
}
