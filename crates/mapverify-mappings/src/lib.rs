//! Rename tables: the obfuscated → readable mapping oracle plus the side tables some checks
//! consume (constructor ids and class-name suffixes).

mod error;
mod format;
mod mappings;
mod tables;

pub use crate::error::MappingError;
pub use crate::format::MappingFormat;
pub use crate::mappings::Mappings;
pub use crate::tables::{ConstructorTable, SuffixTable};
