//! Minimal JVM class file reader.
//!
//! Decodes just enough of a `.class` file for hierarchy and reference analysis: the class
//! header, member tables, and a summary of each method body (field/method/type references,
//! local slot loads, returns and `invokedynamic` call sites with their bootstrap methods).

#![forbid(unsafe_code)]

pub mod access;
mod classfile;
mod code;
mod constant_pool;
mod descriptor;
mod error;
pub mod opcodes;
mod reader;

pub use crate::classfile::{ClassFile, ClassMember};
pub use crate::code::{BootstrapMethod, Code, Insn, InvokeDynamic};
pub use crate::constant_pool::{BootstrapArgument, MethodHandle};
pub use crate::descriptor::{parse_field_descriptor, parse_method_descriptor};
pub use crate::descriptor::{BaseType, FieldType, MethodDescriptor, ReturnType};
pub use crate::error::{Error, Result};
