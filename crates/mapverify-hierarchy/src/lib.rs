//! Class hierarchy model and override resolution.
//!
//! [`ClassDirectory`] owns every ingested class in an arena addressed by dense ids. After all
//! classes are ingested, a single [`ClassDirectory::resolve_all`] pass links each method to the
//! root declarations it overrides, following JVM virtual dispatch: superclass chains, interface
//! satisfaction (including diamonds), and compiler-generated bridge methods.

#![forbid(unsafe_code)]

mod bridge;
mod directory;
mod resolve;

pub use crate::bridge::{lambda_target, match_bouncer, BounceTarget};
pub use crate::directory::{
    ClassDirectory, ClassId, ClassRecord, ClassState, FieldId, FieldRecord, MethodId,
    MethodRecord, StructuralFault,
};
