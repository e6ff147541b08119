use std::fmt;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
}

impl BaseType {
    fn code(self) -> char {
        match self {
            BaseType::Byte => 'B',
            BaseType::Char => 'C',
            BaseType::Double => 'D',
            BaseType::Float => 'F',
            BaseType::Int => 'I',
            BaseType::Long => 'J',
            BaseType::Short => 'S',
            BaseType::Boolean => 'Z',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Base(BaseType),
    Object(String),
    Array(Box<FieldType>),
}

impl FieldType {
    /// Number of local-variable / operand-stack slots a value of this type occupies.
    pub fn slot_size(&self) -> u32 {
        match self {
            FieldType::Base(BaseType::Long | BaseType::Double) => 2,
            _ => 1,
        }
    }

    /// Rewrites every class name referenced by this type.
    pub fn map_classes(&self, f: &mut impl FnMut(&str) -> String) -> FieldType {
        match self {
            FieldType::Base(base) => FieldType::Base(*base),
            FieldType::Object(name) => FieldType::Object(f(name)),
            FieldType::Array(component) => {
                FieldType::Array(Box::new(component.map_classes(&mut *f)))
            }
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Base(base) => write!(f, "{}", base.code()),
            FieldType::Object(name) => write!(f, "L{name};"),
            FieldType::Array(component) => write!(f, "[{component}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnType {
    Void,
    Type(FieldType),
}

impl ReturnType {
    pub fn slot_size(&self) -> u32 {
        match self {
            ReturnType::Void => 0,
            ReturnType::Type(ty) => ty.slot_size(),
        }
    }
}

impl fmt::Display for ReturnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnType::Void => f.write_str("V"),
            ReturnType::Type(ty) => ty.fmt(f),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub params: Vec<FieldType>,
    pub return_type: ReturnType,
}

impl MethodDescriptor {
    /// Slots taken by the declared parameters (the receiver is not included).
    pub fn param_slots(&self) -> u32 {
        self.params.iter().map(FieldType::slot_size).sum()
    }

    /// Combined argument and return footprint, encoded as
    /// `(param_slots + 1) << 2 | return_slots`.
    ///
    /// The `+ 1` accounts for an implicit receiver so two descriptors can be compared without
    /// knowing whether the call is static.
    pub fn arguments_and_return_sizes(&self) -> u32 {
        ((self.param_slots() + 1) << 2) | self.return_type.slot_size()
    }

    pub fn map_classes(&self, f: &mut impl FnMut(&str) -> String) -> MethodDescriptor {
        MethodDescriptor {
            params: self.params.iter().map(|p| p.map_classes(&mut *f)).collect(),
            return_type: match &self.return_type {
                ReturnType::Void => ReturnType::Void,
                ReturnType::Type(ty) => ReturnType::Type(ty.map_classes(&mut *f)),
            },
        }
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for param in &self.params {
            param.fmt(f)?;
        }
        f.write_str(")")?;
        self.return_type.fmt(f)
    }
}

pub fn parse_field_descriptor(desc: &str) -> Result<FieldType> {
    let (ty, rest) = parse_field_type(desc)?;
    if !rest.is_empty() {
        return Err(Error::InvalidDescriptor(desc.to_string()));
    }
    Ok(ty)
}

pub fn parse_method_descriptor(desc: &str) -> Result<MethodDescriptor> {
    let Some(mut rest) = desc.strip_prefix('(') else {
        return Err(Error::InvalidDescriptor(desc.to_string()));
    };

    let mut params = Vec::new();
    loop {
        if let Some(after) = rest.strip_prefix(')') {
            rest = after;
            break;
        }
        if rest.is_empty() {
            return Err(Error::InvalidDescriptor(desc.to_string()));
        }
        let (param, after) = parse_field_type(rest)
            .map_err(|_| Error::InvalidDescriptor(desc.to_string()))?;
        params.push(param);
        rest = after;
    }

    let (return_type, rest) = if let Some(after) = rest.strip_prefix('V') {
        (ReturnType::Void, after)
    } else {
        let (ty, after) = parse_field_type(rest)
            .map_err(|_| Error::InvalidDescriptor(desc.to_string()))?;
        (ReturnType::Type(ty), after)
    };

    if !rest.is_empty() {
        return Err(Error::InvalidDescriptor(desc.to_string()));
    }

    Ok(MethodDescriptor {
        params,
        return_type,
    })
}

fn parse_field_type(input: &str) -> Result<(FieldType, &str)> {
    let Some(first) = input.chars().next() else {
        return Err(Error::InvalidDescriptor(input.to_string()));
    };
    let rest = &input[first.len_utf8()..];
    match first {
        'B' => Ok((FieldType::Base(BaseType::Byte), rest)),
        'C' => Ok((FieldType::Base(BaseType::Char), rest)),
        'D' => Ok((FieldType::Base(BaseType::Double), rest)),
        'F' => Ok((FieldType::Base(BaseType::Float), rest)),
        'I' => Ok((FieldType::Base(BaseType::Int), rest)),
        'J' => Ok((FieldType::Base(BaseType::Long), rest)),
        'S' => Ok((FieldType::Base(BaseType::Short), rest)),
        'Z' => Ok((FieldType::Base(BaseType::Boolean), rest)),
        'L' => match rest.find(';') {
            Some(end) if end > 0 => Ok((
                FieldType::Object(rest[..end].to_string()),
                &rest[end + 1..],
            )),
            _ => Err(Error::InvalidDescriptor(input.to_string())),
        },
        '[' => {
            let (component, rest) = parse_field_type(rest)?;
            Ok((FieldType::Array(Box::new(component)), rest))
        }
        _ => Err(Error::InvalidDescriptor(input.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_field_descriptor_primitives_and_arrays() {
        assert_eq!(parse_field_descriptor("I").unwrap(), FieldType::Base(BaseType::Int));
        assert_eq!(
            parse_field_descriptor("[[Ljava/lang/String;").unwrap(),
            FieldType::Array(Box::new(FieldType::Array(Box::new(FieldType::Object(
                "java/lang/String".to_string()
            )))))
        );
        assert!(parse_field_descriptor("L;").is_err());
        assert!(parse_field_descriptor("II").is_err());
    }

    #[test]
    fn parse_method_descriptor_basic() {
        let desc = parse_method_descriptor("(ILjava/lang/String;)[I").unwrap();
        assert_eq!(
            desc.params,
            vec![
                FieldType::Base(BaseType::Int),
                FieldType::Object("java/lang/String".to_string())
            ]
        );
        assert_eq!(
            desc.return_type,
            ReturnType::Type(FieldType::Array(Box::new(FieldType::Base(BaseType::Int))))
        );
        assert_eq!(desc.to_string(), "(ILjava/lang/String;)[I");
    }

    #[test]
    fn rejects_truncated_method_descriptors() {
        assert!(parse_method_descriptor("(I").is_err());
        assert!(parse_method_descriptor("()").is_err());
        assert!(parse_method_descriptor("I)V").is_err());
        assert!(parse_method_descriptor("()VV").is_err());
    }

    #[test]
    fn footprint_counts_wide_types_twice() {
        let desc = parse_method_descriptor("(JLa;D)J").unwrap();
        assert_eq!(desc.param_slots(), 5);
        assert_eq!(desc.arguments_and_return_sizes(), (6 << 2) | 2);
        let void = parse_method_descriptor("()V").unwrap();
        assert_eq!(void.arguments_and_return_sizes(), 1 << 2);
    }

    #[test]
    fn map_classes_rewrites_nested_object_types() {
        let desc = parse_method_descriptor("([La;Lb;)Lc;").unwrap();
        let mapped = desc.map_classes(&mut |name: &str| format!("pkg/{}", name.to_uppercase()));
        assert_eq!(mapped.to_string(), "([Lpkg/A;Lpkg/B;)Lpkg/C;");
    }
}
