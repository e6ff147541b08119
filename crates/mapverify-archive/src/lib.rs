//! Enumerates the `.class` entries of a jar (or zip) file or an exploded class directory.
//!
//! Entries under `META-INF/` are skipped, which also drops multi-release variants.

use std::ffi::OsStr;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use zip::ZipArchive;

/// One class file read from an archive, keyed by its entry path without the `.class` suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassEntry {
    pub name: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone, Debug)]
pub struct ClassArchive {
    path: PathBuf,
}

impl ClassArchive {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every class entry, sorted by name.
    pub fn read_classes(&self) -> anyhow::Result<Vec<ClassEntry>> {
        let mut entries = if self.path.is_dir() {
            self.read_dir()?
        } else {
            self.read_zip()?
        };
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        tracing::debug!(
            path = %self.path.display(),
            classes = entries.len(),
            "enumerated class entries"
        );
        Ok(entries)
    }

    fn read_dir(&self) -> anyhow::Result<Vec<ClassEntry>> {
        let mut out = Vec::new();
        for entry in walkdir::WalkDir::new(&self.path).follow_links(false) {
            let entry = entry
                .with_context(|| format!("failed to walk {}", self.path.display()))?;
            if !entry.file_type().is_file() || entry.path().extension() != Some(OsStr::new("class"))
            {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&self.path)
                .with_context(|| {
                    format!("{} escapes {}", entry.path().display(), self.path.display())
                })?;
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let Some(name) = class_name(&name) else {
                continue;
            };
            let bytes = std::fs::read(entry.path())
                .with_context(|| format!("failed to read {}", entry.path().display()))?;
            out.push(ClassEntry { name, bytes });
        }
        Ok(out)
    }

    fn read_zip(&self) -> anyhow::Result<Vec<ClassEntry>> {
        let file = File::open(&self.path)
            .with_context(|| format!("failed to open archive {}", self.path.display()))?;
        let mut zip = ZipArchive::new(file)
            .with_context(|| format!("failed to read zip {}", self.path.display()))?;

        let mut out = Vec::new();
        for index in 0..zip.len() {
            let mut entry = zip.by_index(index).with_context(|| {
                format!("failed to read entry {index} of {}", self.path.display())
            })?;
            if !entry.is_file() {
                continue;
            }
            let Some(name) = class_name(entry.name()) else {
                continue;
            };
            let mut bytes = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut bytes).with_context(|| {
                format!("failed to read {} from {}", entry.name(), self.path.display())
            })?;
            out.push(ClassEntry { name, bytes });
        }
        Ok(out)
    }
}

/// `a/b/C.class` → `a/b/C`; `None` for non-class entries and anything under `META-INF/`.
fn class_name(entry: &str) -> Option<String> {
    if entry.starts_with("META-INF/") {
        return None;
    }
    entry.strip_suffix(".class").map(str::to_owned)
}
