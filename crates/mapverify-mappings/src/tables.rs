use std::collections::BTreeMap;
use std::path::Path;

use crate::error::MappingError;

fn read(path: &Path) -> Result<String, MappingError> {
    std::fs::read_to_string(path).map_err(|source| MappingError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn records(text: &str) -> impl Iterator<Item = (usize, Vec<&str>)> {
    text.lines().enumerate().filter_map(|(idx, line)| {
        let line = line.split('#').next().unwrap_or_default();
        let tokens: Vec<&str> = line.split_whitespace().collect();
        (!tokens.is_empty()).then_some((idx + 1, tokens))
    })
}

/// Registry of constructor ids, keyed by mapped class name + mapped descriptor.
///
/// Lines read `<id> <class> <descriptor>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstructorTable {
    entries: BTreeMap<String, Vec<u32>>,
}

impl ConstructorTable {
    pub fn load(path: &Path) -> Result<Self, MappingError> {
        Self::parse(&read(path)?)
    }

    pub fn parse(text: &str) -> Result<Self, MappingError> {
        let mut table = Self::default();
        for (line, tokens) in records(text) {
            let [id, class, descriptor] = tokens.as_slice() else {
                return Err(MappingError::parse(line, "expected `<id> <class> <descriptor>`"));
            };
            let id: u32 = id
                .parse()
                .map_err(|_| MappingError::parse(line, format!("invalid constructor id `{id}`")))?;
            table.insert(id, class, descriptor);
        }
        Ok(table)
    }

    pub fn insert(&mut self, id: u32, class: &str, descriptor: &str) {
        self.entries
            .entry(format!("{class}{descriptor}"))
            .or_default()
            .push(id);
    }

    pub fn contains(&self, class: &str, descriptor: &str) -> bool {
        self.entries.contains_key(&format!("{class}{descriptor}"))
    }

    /// Keys registered under more than one id, in key order.
    pub fn duplicates(&self) -> impl Iterator<Item = (&str, &[u32])> {
        self.entries
            .iter()
            .filter(|(_, ids)| ids.len() > 1)
            .map(|(key, ids)| (key.as_str(), ids.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Required class-name suffixes by ancestor type, in file order.
///
/// Lines read `<ancestor internal name> <Suffix>`. The first entry whose type is an ancestor of
/// a class wins, so more specific types belong earlier in the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuffixTable {
    entries: Vec<(String, String)>,
}

impl SuffixTable {
    pub fn load(path: &Path) -> Result<Self, MappingError> {
        Self::parse(&read(path)?)
    }

    pub fn parse(text: &str) -> Result<Self, MappingError> {
        let mut entries = Vec::new();
        for (line, tokens) in records(text) {
            let [ancestor, suffix] = tokens.as_slice() else {
                return Err(MappingError::parse(line, "expected `<type> <suffix>`"));
            };
            entries.push((ancestor.to_string(), suffix.to_string()));
        }
        Ok(Self { entries })
    }

    pub fn push(&mut self, ancestor: &str, suffix: &str) {
        self.entries.push((ancestor.to_string(), suffix.to_string()));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(a, s)| (a.as_str(), s.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
