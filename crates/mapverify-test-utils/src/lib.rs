//! Utilities shared by mapverify tests.
//!
//! [`ClassBuilder`] produces in-memory [`ClassFile`](mapverify_classfile::ClassFile) values for
//! hierarchy and verifier tests. [`write_class`] serializes one back into real class file bytes
//! so parser, archive and CLI tests can run against genuine inputs.

mod builder;
mod writer;

#[cfg(feature = "jar")]
mod jar;

pub use builder::{ClassBuilder, CodeBuilder};
pub use writer::write_class;

#[cfg(feature = "jar")]
pub use jar::{write_class_dir, write_jar, TempJar};
