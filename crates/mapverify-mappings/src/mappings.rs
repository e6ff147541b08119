use std::collections::HashMap;
use std::path::Path;

use mapverify_classfile::{parse_field_descriptor, parse_method_descriptor};

use crate::error::MappingError;
use crate::format::{self, MappingFormat};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct MemberTable {
    fields: HashMap<String, String>,
    /// name → descriptor → mapped name
    methods: HashMap<String, HashMap<String, String>>,
}

/// A one-directional rename table (obfuscated → mapped, or the reverse).
///
/// Lookups never fail: anything without an explicit entry keeps its name, with two fallbacks
/// for classes. An unknown inner class is renamed through its outer class (`a$b` becomes
/// `remap(a) + "$b"`), and an unknown top-level class through its package entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mappings {
    /// Package prefixes including the trailing `/`; the default package is `""`.
    packages: HashMap<String, String>,
    classes: HashMap<String, String>,
    members: HashMap<String, MemberTable>,
}

impl Mappings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads and parses a mapping file, detecting its format from the content.
    pub fn load(path: &Path) -> Result<Self, MappingError> {
        let text = std::fs::read_to_string(path).map_err(|source| MappingError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mappings = Self::parse(&text)?;
        tracing::info!(
            path = %path.display(),
            classes = mappings.classes.len(),
            "loaded mappings"
        );
        Ok(mappings)
    }

    pub fn parse(text: &str) -> Result<Self, MappingError> {
        let format = MappingFormat::detect(text).ok_or(MappingError::UnknownFormat)?;
        Self::parse_as(text, format)
    }

    pub fn parse_as(text: &str, format: MappingFormat) -> Result<Self, MappingError> {
        format::parse(text, format)
    }

    /// `.` stands for the default package. A trailing `/` is added when missing.
    pub fn add_package(&mut self, original: &str, mapped: &str) {
        self.packages
            .insert(normalize_package(original), normalize_package(mapped));
    }

    pub fn add_class(&mut self, original: &str, mapped: &str) {
        self.classes.insert(original.to_string(), mapped.to_string());
    }

    pub fn add_field(&mut self, owner: &str, original: &str, mapped: &str) {
        self.members
            .entry(owner.to_string())
            .or_default()
            .fields
            .insert(original.to_string(), mapped.to_string());
    }

    pub fn add_method(&mut self, owner: &str, original: &str, descriptor: &str, mapped: &str) {
        self.members
            .entry(owner.to_string())
            .or_default()
            .methods
            .entry(original.to_string())
            .or_default()
            .insert(descriptor.to_string(), mapped.to_string());
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Explicit class entries, in no particular order.
    pub fn classes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.classes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn remap_package(&self, package: &str) -> String {
        self.packages
            .get(package)
            .cloned()
            .unwrap_or_else(|| package.to_string())
    }

    pub fn remap_class(&self, name: &str) -> String {
        if let Some(mapped) = self.classes.get(name) {
            return mapped.clone();
        }
        if let Some((outer, inner)) = name.rsplit_once('$') {
            return format!("{}${}", self.remap_class(outer), inner);
        }
        match name.rfind('/') {
            Some(idx) => {
                let (package, simple) = name.split_at(idx + 1);
                format!("{}{}", self.remap_package(package), simple)
            }
            None => match self.packages.get("") {
                Some(package) => format!("{package}{name}"),
                None => name.to_string(),
            },
        }
    }

    pub fn remap_field<'a>(&'a self, owner: &str, name: &'a str) -> &'a str {
        self.members
            .get(owner)
            .and_then(|m| m.fields.get(name))
            .map_or(name, String::as_str)
    }

    pub fn remap_method<'a>(&'a self, owner: &str, name: &'a str, descriptor: &str) -> &'a str {
        self.members
            .get(owner)
            .and_then(|m| m.methods.get(name))
            .and_then(|by_desc| by_desc.get(descriptor))
            .map_or(name, String::as_str)
    }

    /// Renames every class referenced by a field or method descriptor. Malformed descriptors
    /// are returned unchanged.
    pub fn remap_descriptor(&self, descriptor: &str) -> String {
        let mut remap = |name: &str| self.remap_class(name);
        if descriptor.starts_with('(') {
            match parse_method_descriptor(descriptor) {
                Ok(desc) => desc.map_classes(&mut remap).to_string(),
                Err(_) => descriptor.to_string(),
            }
        } else {
            match parse_field_descriptor(descriptor) {
                Ok(ty) => ty.map_classes(&mut remap).to_string(),
                Err(_) => descriptor.to_string(),
            }
        }
    }

    /// Builds the mapped → original table. Member keys are re-expressed in mapped names.
    pub fn reverse(&self) -> Mappings {
        let mut out = Mappings::new();
        for (original, mapped) in &self.packages {
            out.packages.insert(mapped.clone(), original.clone());
        }
        for (original, mapped) in &self.classes {
            out.classes.insert(mapped.clone(), original.clone());
        }
        for (owner, table) in &self.members {
            let mapped_owner = self.remap_class(owner);
            for (original, mapped) in &table.fields {
                out.add_field(&mapped_owner, mapped, original);
            }
            for (original, by_desc) in &table.methods {
                for (descriptor, mapped) in by_desc {
                    let descriptor = self.remap_descriptor(descriptor);
                    out.add_method(&mapped_owner, mapped, &descriptor, original);
                }
            }
        }
        out
    }
}

fn normalize_package(package: &str) -> String {
    if package == "." || package.is_empty() {
        String::new()
    } else if package.ends_with('/') {
        package.to_string()
    } else {
        format!("{package}/")
    }
}
